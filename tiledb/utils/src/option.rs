/// Trait for comparing types which can express optional data.
/// The `option_subset` method should return true if it finds that all required data
/// of two objects are equal, and the non-required data are either equal or not set
/// for the method receiver.  For objects which only have required data, this should be
/// the same as `eq`.
///
/// The target usage of this trait is data with optional fields
/// which could be filled in with arbitrary values across some logical boundary.
/// If we were to compare representations of the same object before and after the boundary,
/// then it would not be "equal" to itself because of values which may have been filled in.
///
/// ## Derivable
///
/// This trait can be used with `#[derive]`.
/// When `derived` on structs, one instance of the struct is an `option_subset` of another instance
/// if all fields are `option_subsets` of the corresponding fields of the other instance.
pub trait OptionSubset {
    fn option_subset(&self, other: &Self) -> bool;
}

#[macro_export]
macro_rules! assert_option_subset {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(left_val.option_subset(right_val)) {
                    panic!(
                        r#"assertion `(left).option_subset(right)` failed
 left: {left_val:?}
right: {right_val:?}"#
                    )
                }
            }
        }
    };
}

#[macro_export]
macro_rules! assert_not_option_subset {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if left_val.option_subset(right_val) {
                    panic!(
                        r#"assertion `!(left).option_subset(right)` failed
 left: {left_val:?}
right: {right_val:?}"#
                    )
                }
            }
        }
    };
}

impl<T> OptionSubset for Option<T>
where
    T: OptionSubset,
{
    fn option_subset(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => mine.option_subset(theirs),
        }
    }
}

impl<T> OptionSubset for [T]
where
    T: OptionSubset,
{
    fn option_subset(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(mine, theirs)| mine.option_subset(theirs))
    }
}

impl<T, const K: usize> OptionSubset for [T; K]
where
    T: OptionSubset,
{
    fn option_subset(&self, other: &Self) -> bool {
        self.as_slice().option_subset(other.as_slice())
    }
}

impl<T> OptionSubset for Vec<T>
where
    T: OptionSubset,
{
    fn option_subset(&self, other: &Self) -> bool {
        self.as_slice().option_subset(other.as_slice())
    }
}

macro_rules! option_subset_partialeq {
    ($($T:ty),+) => {
        $(
            impl $crate::option::OptionSubset for $T {
                fn option_subset(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )+
    };
}

option_subset_partialeq!(u8, u16, u32, u64, usize);
option_subset_partialeq!(i8, i16, i32, i64, isize);
option_subset_partialeq!(bool, f32, f64, String);

#[cfg(feature = "serde_json")]
option_subset_partialeq!(serde_json::value::Value);
