//! Coordinate values and tuples.
//!
//! The dense/sparse read engines dispatch on coordinate type once per query
//! plan, not once per cell (design notes, "template specialization on
//! coord type"): a [Coord] is a tuple of [CoordValue], a sum type over the
//! numeric physical types plus a `Bytes` variant for string dimensions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tiledb_common::datatype::physical::BitsOrd;
use tiledb_common::datatype::Datatype;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CoordValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
}

macro_rules! coord_value_from {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$t> for CoordValue {
                fn from(v: $t) -> Self {
                    CoordValue::$variant(v)
                }
            }
        )+
    };
}

coord_value_from!(
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64,
);

impl From<Vec<u8>> for CoordValue {
    fn from(v: Vec<u8>) -> Self {
        CoordValue::Bytes(v)
    }
}

impl From<&str> for CoordValue {
    fn from(v: &str) -> Self {
        CoordValue::Bytes(v.as_bytes().to_vec())
    }
}

impl CoordValue {
    pub fn datatype(&self) -> Datatype {
        match self {
            CoordValue::Int8(_) => Datatype::Int8,
            CoordValue::Int16(_) => Datatype::Int16,
            CoordValue::Int32(_) => Datatype::Int32,
            CoordValue::Int64(_) => Datatype::Int64,
            CoordValue::UInt8(_) => Datatype::UInt8,
            CoordValue::UInt16(_) => Datatype::UInt16,
            CoordValue::UInt32(_) => Datatype::UInt32,
            CoordValue::UInt64(_) => Datatype::UInt64,
            CoordValue::Float32(_) => Datatype::Float32,
            CoordValue::Float64(_) => Datatype::Float64,
            CoordValue::Bytes(_) => Datatype::StringAscii,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, CoordValue::Bytes(_))
    }

    /// Total order: numeric types compare via [BitsOrd] (so NaN sorts
    /// consistently instead of always-false), byte strings compare
    /// lexicographically.
    ///
    /// # Panics
    /// Panics if `self` and `other` are not the same variant.
    pub fn cmp_total(&self, other: &Self) -> Ordering {
        use CoordValue::*;
        match (self, other) {
            (Int8(a), Int8(b)) => a.bits_cmp(b),
            (Int16(a), Int16(b)) => a.bits_cmp(b),
            (Int32(a), Int32(b)) => a.bits_cmp(b),
            (Int64(a), Int64(b)) => a.bits_cmp(b),
            (UInt8(a), UInt8(b)) => a.bits_cmp(b),
            (UInt16(a), UInt16(b)) => a.bits_cmp(b),
            (UInt32(a), UInt32(b)) => a.bits_cmp(b),
            (UInt64(a), UInt64(b)) => a.bits_cmp(b),
            (Float32(a), Float32(b)) => a.bits_cmp(b),
            (Float64(a), Float64(b)) => a.bits_cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            _ => panic!(
                "CoordValue::cmp_total on mismatched variants: {:?} vs {:?}",
                self, other
            ),
        }
    }

    /// Projects this value to `[0, 2^bits)` for the Hilbert mapper, given
    /// the dimension's domain (ignored for string dims, which use their
    /// own prefix projection in the hilbert module).
    pub fn as_f64(&self) -> f64 {
        match self {
            CoordValue::Int8(v) => *v as f64,
            CoordValue::Int16(v) => *v as f64,
            CoordValue::Int32(v) => *v as f64,
            CoordValue::Int64(v) => *v as f64,
            CoordValue::UInt8(v) => *v as f64,
            CoordValue::UInt16(v) => *v as f64,
            CoordValue::UInt32(v) => *v as f64,
            CoordValue::UInt64(v) => *v as f64,
            CoordValue::Float32(v) => *v as f64,
            CoordValue::Float64(v) => *v,
            CoordValue::Bytes(_) => 0.0,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            CoordValue::Int8(v) => Some(*v as i128),
            CoordValue::Int16(v) => Some(*v as i128),
            CoordValue::Int32(v) => Some(*v as i128),
            CoordValue::Int64(v) => Some(*v as i128),
            CoordValue::UInt8(v) => Some(*v as i128),
            CoordValue::UInt16(v) => Some(*v as i128),
            CoordValue::UInt32(v) => Some(*v as i128),
            CoordValue::UInt64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Saturating successor, used by `get_next_cell_coords`.
    pub fn succ(&self) -> Self {
        use CoordValue::*;
        match self {
            Int8(v) => Int8(v.saturating_add(1)),
            Int16(v) => Int16(v.saturating_add(1)),
            Int32(v) => Int32(v.saturating_add(1)),
            Int64(v) => Int64(v.saturating_add(1)),
            UInt8(v) => UInt8(v.saturating_add(1)),
            UInt16(v) => UInt16(v.saturating_add(1)),
            UInt32(v) => UInt32(v.saturating_add(1)),
            UInt64(v) => UInt64(v.saturating_add(1)),
            Float32(v) => Float32(*v + 1.0),
            Float64(v) => Float64(*v + 1.0),
            Bytes(v) => {
                let mut v = v.clone();
                v.push(0);
                Bytes(v)
            }
        }
    }

    pub fn pred(&self) -> Self {
        use CoordValue::*;
        match self {
            Int8(v) => Int8(v.saturating_sub(1)),
            Int16(v) => Int16(v.saturating_sub(1)),
            Int32(v) => Int32(v.saturating_sub(1)),
            Int64(v) => Int64(v.saturating_sub(1)),
            UInt8(v) => UInt8(v.saturating_sub(1)),
            UInt16(v) => UInt16(v.saturating_sub(1)),
            UInt32(v) => UInt32(v.saturating_sub(1)),
            UInt64(v) => UInt64(v.saturating_sub(1)),
            Float32(v) => Float32(*v - 1.0),
            Float64(v) => Float64(*v - 1.0),
            Bytes(v) => {
                let mut v = v.clone();
                v.pop();
                Bytes(v)
            }
        }
    }
}

/// A tuple of one value per dimension, in domain order.
pub type Coord = Vec<CoordValue>;

/// Decodes one fixed-width scalar from its native-endian physical bytes.
/// Shared by the sparse read path (recovering written coordinates) and the
/// write path (computing tile MBRs from caller-supplied coordinate buffers).
pub(crate) fn coord_value_from_bytes(dt: Datatype, b: &[u8]) -> CoordValue {
    use Datatype::*;
    match dt {
        Int8 => CoordValue::Int8(i8::from_ne_bytes(b.try_into().unwrap())),
        Int16 => CoordValue::Int16(i16::from_ne_bytes(b.try_into().unwrap())),
        Int32 => CoordValue::Int32(i32::from_ne_bytes(b.try_into().unwrap())),
        Int64 => CoordValue::Int64(i64::from_ne_bytes(b.try_into().unwrap())),
        UInt8 => CoordValue::UInt8(u8::from_ne_bytes(b.try_into().unwrap())),
        UInt16 => CoordValue::UInt16(u16::from_ne_bytes(b.try_into().unwrap())),
        UInt32 => CoordValue::UInt32(u32::from_ne_bytes(b.try_into().unwrap())),
        UInt64 => CoordValue::UInt64(u64::from_ne_bytes(b.try_into().unwrap())),
        Float32 => CoordValue::Float32(f32::from_ne_bytes(b.try_into().unwrap())),
        Float64 => CoordValue::Float64(f64::from_ne_bytes(b.try_into().unwrap())),
        Boolean => CoordValue::UInt8(b[0]),
        Blob | StringAscii => CoordValue::Bytes(b.to_vec()),
    }
}

/// Inverse of [coord_value_from_bytes]: the scalar's native-endian physical
/// representation, for a dimension value the writer packs into a tile.
pub(crate) fn coord_value_to_bytes(v: &CoordValue) -> Vec<u8> {
    use CoordValue::*;
    match v {
        Int8(x) => x.to_ne_bytes().to_vec(),
        Int16(x) => x.to_ne_bytes().to_vec(),
        Int32(x) => x.to_ne_bytes().to_vec(),
        Int64(x) => x.to_ne_bytes().to_vec(),
        UInt8(x) => x.to_ne_bytes().to_vec(),
        UInt16(x) => x.to_ne_bytes().to_vec(),
        UInt32(x) => x.to_ne_bytes().to_vec(),
        UInt64(x) => x.to_ne_bytes().to_vec(),
        Float32(x) => x.to_ne_bytes().to_vec(),
        Float64(x) => x.to_ne_bytes().to_vec(),
        Bytes(b) => b.clone(),
    }
}

pub fn coord_cmp_row_major(a: &Coord, b: &Coord) -> Ordering {
    for (l, r) in a.iter().zip(b.iter()) {
        match l.cmp_total(r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

pub fn coord_cmp_col_major(a: &Coord, b: &Coord) -> Ordering {
    for (l, r) in a.iter().zip(b.iter()).rev() {
        match l.cmp_total(r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_lexicographic() {
        let a: Coord = vec![CoordValue::Int32(1), CoordValue::Int32(5)];
        let b: Coord = vec![CoordValue::Int32(1), CoordValue::Int32(6)];
        assert_eq!(coord_cmp_row_major(&a, &b), Ordering::Less);
    }

    #[test]
    fn col_major_compares_last_dim_first() {
        let a: Coord = vec![CoordValue::Int32(5), CoordValue::Int32(1)];
        let b: Coord = vec![CoordValue::Int32(1), CoordValue::Int32(2)];
        assert_eq!(coord_cmp_col_major(&a, &b), Ordering::Less);
    }

    #[test]
    fn float_nan_has_total_order() {
        let a = CoordValue::Float64(f64::NAN);
        let b = CoordValue::Float64(1.0);
        // doesn't panic, and is self-consistent
        assert_eq!(a.cmp_total(&a), Ordering::Equal);
        let _ = a.cmp_total(&b);
    }
}
