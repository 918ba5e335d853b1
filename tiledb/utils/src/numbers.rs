pub trait AnyNumCmp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering;
}

macro_rules! derive_primitive_anynumcmp {
    ($($T:ty),+) => {
        $(
            impl AnyNumCmp for $T {
                fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                    std::cmp::Ord::cmp(self, other)
                }
            }
        )+
    };
}

macro_rules! derive_float_anynumcmp {
    ($($T:ty),+) => {
        $(
            impl AnyNumCmp for $T {
                fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                    self.total_cmp(other)
                }
            }
        )+
    };
}

derive_primitive_anynumcmp!(u8, u16, u32, u64, usize);
derive_primitive_anynumcmp!(i8, i16, i32, i64, isize);
derive_float_anynumcmp!(f32, f64);

/// Direction of travel for [NextNumericValue].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NextDirection {
    Up,
    Down,
}

/// Returns the representable value adjacent to `self` in the requested
/// direction. For integers this is a saturating +/- 1; for floats it walks
/// to the next representable bit pattern (so it behaves sanely near the
/// edges of the mantissa where `x + 1.0 == x`).
pub trait NextNumericValue: Sized {
    fn next_numeric_value(&self, direction: NextDirection) -> Self;
}

macro_rules! derive_integer_next_numeric_value {
    ($($T:ty),+) => {
        $(
            impl NextNumericValue for $T {
                fn next_numeric_value(&self, direction: NextDirection) -> Self {
                    match direction {
                        NextDirection::Up => self.saturating_add(1),
                        NextDirection::Down => self.saturating_sub(1),
                    }
                }
            }
        )+
    };
}

derive_integer_next_numeric_value!(u8, u16, u32, u64, usize);
derive_integer_next_numeric_value!(i8, i16, i32, i64, isize);

macro_rules! derive_float_next_numeric_value {
    ($($T:ty),+) => {
        $(
            impl NextNumericValue for $T {
                fn next_numeric_value(&self, direction: NextDirection) -> Self {
                    use float_next_after::NextAfter;
                    match direction {
                        NextDirection::Up => self.next_after(<$T>::INFINITY),
                        NextDirection::Down => self.next_after(<$T>::NEG_INFINITY),
                    }
                }
            }
        )+
    };
}

derive_float_next_numeric_value!(f32, f64);

/// The smallest value greater than zero which this type can represent;
/// used as the minimum valid tile extent.
pub trait SmallestPositiveValue {
    fn smallest_positive_value() -> Self;
}

macro_rules! derive_integer_smallest_positive_value {
    ($($T:ty),+) => {
        $(
            impl SmallestPositiveValue for $T {
                fn smallest_positive_value() -> Self {
                    1
                }
            }
        )+
    };
}

derive_integer_smallest_positive_value!(u8, u16, u32, u64, usize);
derive_integer_smallest_positive_value!(i8, i16, i32, i64, isize);

macro_rules! derive_float_smallest_positive_value {
    ($($T:ty),+) => {
        $(
            impl SmallestPositiveValue for $T {
                fn smallest_positive_value() -> Self {
                    <$T>::MIN_POSITIVE
                }
            }
        )+
    };
}

derive_float_smallest_positive_value!(f32, f64);
