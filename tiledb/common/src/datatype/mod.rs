pub mod physical;

pub use physical::{BitsEq, BitsHash, BitsOrd, PhysicalType, PhysicalValue};

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "option-subset")]
use tiledb_utils::option::OptionSubset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::wire;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Physical type mismatch: expected {actual_type}, found {requested_type}")]
    PhysicalTypeMismatch {
        requested_type: &'static str,
        actual_type: &'static str,
    },
    #[error("Physical type '{physical_type}' is not compatible with logical type '{logical_type}'")]
    PhysicalTypeIncompatible {
        physical_type: &'static str,
        logical_type: Datatype,
    },
}

impl Error {
    pub fn physical_type_mismatch<T, U>() -> Self {
        Self::PhysicalTypeMismatch {
            requested_type: std::any::type_name::<T>(),
            actual_type: std::any::type_name::<U>(),
        }
    }

    pub fn physical_type_incompatible<T>(logical_type: Datatype) -> Self {
        Self::PhysicalTypeIncompatible {
            physical_type: std::any::type_name::<T>(),
            logical_type,
        }
    }
}

/// The scalar types a dimension or attribute can carry.
///
/// This is deliberately narrower than the full TileDB datatype zoo: the
/// engine core only needs to dispatch on physical representation, not on
/// every logical alias (datetimes, multiple string encodings, ...) those
/// concerns belong to the filter/codec layer, which is out of scope here.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Datatype {
    Int8,
    Int16,
    Int32,
    #[default]
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// ASCII-encoded string; always carries `CellValNum::Var`.
    StringAscii,
    Boolean,
    /// Opaque byte sequence.
    Blob,
}

const DATATYPES: [Datatype; 13] = [
    Datatype::Int8,
    Datatype::Int16,
    Datatype::Int32,
    Datatype::Int64,
    Datatype::UInt8,
    Datatype::UInt16,
    Datatype::UInt32,
    Datatype::UInt64,
    Datatype::Float32,
    Datatype::Float64,
    Datatype::StringAscii,
    Datatype::Boolean,
    Datatype::Blob,
];

/// Apply a generic expression `$then` with a static type binding in the
/// identifier `$typename` for the physical type corresponding to the
/// dynamic `$datatype`. Dispatch happens once per query plan, not per cell
/// (see the "template specialization on coord type" design note).
///
/// ```
/// use tiledb_common::physical_type_go;
/// use tiledb_common::datatype::Datatype;
///
/// fn physical_type_to_str(datatype: Datatype) -> String {
///     physical_type_go!(datatype, DT, std::any::type_name::<DT>().to_owned())
/// }
///
/// assert_eq!("u8", physical_type_to_str(Datatype::UInt8));
/// assert_eq!("u8", physical_type_to_str(Datatype::StringAscii));
/// assert_eq!("u64", physical_type_to_str(Datatype::UInt64));
/// ```
#[macro_export]
macro_rules! physical_type_go {
    ($datatype:expr, $typename:ident, $then:expr) => {{
        use $crate::datatype::Datatype;
        match $datatype {
            Datatype::Int8 => {
                type $typename = i8;
                $then
            }
            Datatype::Int16 => {
                type $typename = i16;
                $then
            }
            Datatype::Int32 => {
                type $typename = i32;
                $then
            }
            Datatype::Int64 => {
                type $typename = i64;
                $then
            }
            Datatype::UInt8 | Datatype::StringAscii | Datatype::Boolean | Datatype::Blob => {
                type $typename = u8;
                $then
            }
            Datatype::UInt16 => {
                type $typename = u16;
                $then
            }
            Datatype::UInt32 => {
                type $typename = u32;
                $then
            }
            Datatype::UInt64 => {
                type $typename = u64;
                $then
            }
            Datatype::Float32 => {
                type $typename = f32;
                $then
            }
            Datatype::Float64 => {
                type $typename = f64;
                $then
            }
        }
    }};
}

impl Datatype {
    pub fn size(&self) -> usize {
        crate::physical_type_go!(self, DT, std::mem::size_of::<DT>())
    }

    pub fn is_compatible_type<T: 'static>(&self) -> bool {
        use std::any::TypeId;

        let tid = TypeId::of::<T>();
        if tid == TypeId::of::<f32>() {
            matches!(*self, Datatype::Float32)
        } else if tid == TypeId::of::<f64>() {
            matches!(*self, Datatype::Float64)
        } else if tid == TypeId::of::<i8>() {
            matches!(*self, Datatype::Int8)
        } else if tid == TypeId::of::<u8>() {
            matches!(
                *self,
                Datatype::UInt8
                    | Datatype::StringAscii
                    | Datatype::Boolean
                    | Datatype::Blob
            )
        } else if tid == TypeId::of::<i16>() {
            matches!(*self, Datatype::Int16)
        } else if tid == TypeId::of::<u16>() {
            matches!(*self, Datatype::UInt16)
        } else if tid == TypeId::of::<i32>() {
            matches!(*self, Datatype::Int32)
        } else if tid == TypeId::of::<u32>() {
            matches!(*self, Datatype::UInt32)
        } else if tid == TypeId::of::<i64>() {
            matches!(*self, Datatype::Int64)
        } else if tid == TypeId::of::<u64>() {
            matches!(*self, Datatype::UInt64)
        } else {
            false
        }
    }

    /// Returns whether this type is an integral type (i.e. integer)
    pub fn is_integral_type(&self) -> bool {
        matches!(
            *self,
            Datatype::Boolean
                | Datatype::Int8
                | Datatype::Int16
                | Datatype::Int32
                | Datatype::Int64
                | Datatype::UInt8
                | Datatype::UInt16
                | Datatype::UInt32
                | Datatype::UInt64
        )
    }

    /// Returns whether this type is a real number (i.e. floating point)
    pub fn is_real_type(&self) -> bool {
        matches!(*self, Datatype::Float32 | Datatype::Float64)
    }

    /// Returns whether this type is a variable-length string type
    pub fn is_string_type(&self) -> bool {
        matches!(*self, Datatype::StringAscii)
    }

    /// Returns whether this type is a byte
    pub fn is_byte_type(&self) -> bool {
        matches!(*self, Datatype::Blob)
    }

    /// Returns whether this type can be used as a dimension type (§3 Dimension).
    /// Sparse arrays additionally allow floating point and string-ascii dims;
    /// dense arrays require a discrete, tileable domain.
    pub fn is_allowed_dimension_type_sparse(&self) -> bool {
        self.is_integral_type()
            && !matches!(self, Datatype::Boolean)
            || matches!(*self, Datatype::Float32 | Datatype::Float64 | Datatype::StringAscii)
    }

    pub fn is_allowed_dimension_type_dense(&self) -> bool {
        self.is_integral_type() && !matches!(self, Datatype::Boolean)
    }

    pub fn same_physical_type(&self, other: &Datatype) -> bool {
        crate::physical_type_go!(self, MyPhysicalType, {
            crate::physical_type_go!(other, TheirPhysicalType, {
                std::any::TypeId::of::<MyPhysicalType>()
                    == std::any::TypeId::of::<TheirPhysicalType>()
            })
        })
    }

    /// Returns an `Iterator` which yields each variant of `Datatype`
    /// exactly once in an unspecified order.
    pub fn iter() -> impl Iterator<Item = Datatype> {
        DATATYPES.iter().copied()
    }
}

impl Display for Datatype {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        Debug::fmt(self, f)
    }
}

impl FromStr for Datatype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        match s.as_ref() {
            "int8" => Ok(Datatype::Int8),
            "int16" => Ok(Datatype::Int16),
            "int32" => Ok(Datatype::Int32),
            "int64" => Ok(Datatype::Int64),
            "uint8" => Ok(Datatype::UInt8),
            "uint16" => Ok(Datatype::UInt16),
            "uint32" => Ok(Datatype::UInt32),
            "uint64" => Ok(Datatype::UInt64),
            "float32" => Ok(Datatype::Float32),
            "float64" => Ok(Datatype::Float64),
            "stringascii" => Ok(Datatype::StringAscii),
            "boolean" => Ok(Datatype::Boolean),
            "blob" => Ok(Datatype::Blob),
            _ => Err(s),
        }
    }
}

#[cfg(feature = "option-subset")]
impl OptionSubset for Datatype {
    fn option_subset(&self, other: &Self) -> bool {
        self == other
    }
}

impl From<Datatype> for wire::tiledb_datatype_t {
    fn from(value: Datatype) -> Self {
        match value {
            Datatype::Int8 => wire::tiledb_datatype_t_TILEDB_INT8,
            Datatype::Int16 => wire::tiledb_datatype_t_TILEDB_INT16,
            Datatype::Int32 => wire::tiledb_datatype_t_TILEDB_INT32,
            Datatype::Int64 => wire::tiledb_datatype_t_TILEDB_INT64,
            Datatype::UInt8 => wire::tiledb_datatype_t_TILEDB_UINT8,
            Datatype::UInt16 => wire::tiledb_datatype_t_TILEDB_UINT16,
            Datatype::UInt32 => wire::tiledb_datatype_t_TILEDB_UINT32,
            Datatype::UInt64 => wire::tiledb_datatype_t_TILEDB_UINT64,
            Datatype::Float32 => wire::tiledb_datatype_t_TILEDB_FLOAT32,
            Datatype::Float64 => wire::tiledb_datatype_t_TILEDB_FLOAT64,
            Datatype::StringAscii => wire::tiledb_datatype_t_TILEDB_STRING_ASCII,
            Datatype::Boolean => wire::tiledb_datatype_t_TILEDB_BOOL,
            Datatype::Blob => wire::tiledb_datatype_t_TILEDB_BLOB,
        }
    }
}

#[derive(Clone, Debug, Error)]
pub enum TryFromWireError {
    #[error("Invalid discriminant for {}: {0}", std::any::type_name::<Datatype>())]
    InvalidDiscriminant(u64),
}

impl TryFrom<wire::tiledb_datatype_t> for Datatype {
    type Error = TryFromWireError;

    fn try_from(value: wire::tiledb_datatype_t) -> Result<Self, Self::Error> {
        Ok(match value {
            wire::tiledb_datatype_t_TILEDB_INT8 => Datatype::Int8,
            wire::tiledb_datatype_t_TILEDB_INT16 => Datatype::Int16,
            wire::tiledb_datatype_t_TILEDB_INT32 => Datatype::Int32,
            wire::tiledb_datatype_t_TILEDB_INT64 => Datatype::Int64,
            wire::tiledb_datatype_t_TILEDB_UINT8 => Datatype::UInt8,
            wire::tiledb_datatype_t_TILEDB_UINT16 => Datatype::UInt16,
            wire::tiledb_datatype_t_TILEDB_UINT32 => Datatype::UInt32,
            wire::tiledb_datatype_t_TILEDB_UINT64 => Datatype::UInt64,
            wire::tiledb_datatype_t_TILEDB_FLOAT32 => Datatype::Float32,
            wire::tiledb_datatype_t_TILEDB_FLOAT64 => Datatype::Float64,
            wire::tiledb_datatype_t_TILEDB_STRING_ASCII => Datatype::StringAscii,
            wire::tiledb_datatype_t_TILEDB_BOOL => Datatype::Boolean,
            wire::tiledb_datatype_t_TILEDB_BLOB => Datatype::Blob,
            _ => return Err(TryFromWireError::InvalidDiscriminant(value as u64)),
        })
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
pub mod strategy {
    use proptest::prelude::*;

    use super::Datatype;

    impl Arbitrary for Datatype {
        type Parameters = ();
        type Strategy = BoxedStrategy<Datatype>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop_oneof![
                Just(Datatype::Int8),
                Just(Datatype::Int16),
                Just(Datatype::Int32),
                Just(Datatype::Int64),
                Just(Datatype::UInt8),
                Just(Datatype::UInt16),
                Just(Datatype::UInt32),
                Just(Datatype::UInt64),
                Just(Datatype::Float32),
                Just(Datatype::Float64),
                Just(Datatype::StringAscii),
                Just(Datatype::Boolean),
                Just(Datatype::Blob),
            ]
            .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip() {
        for dt in Datatype::iter() {
            let w = wire::tiledb_datatype_t::from(dt);
            assert_eq!(dt, Datatype::try_from(w).unwrap());
        }
    }

    #[test]
    fn iter_unique() {
        use std::collections::HashSet;
        let mut yielded = HashSet::new();
        for dt in Datatype::iter() {
            assert!(yielded.insert(dt));
        }
    }

    #[test]
    fn from_str_roundtrip() {
        for dt in Datatype::iter() {
            let s = dt.to_string();
            assert_eq!(Ok(dt), Datatype::from_str(&s));
        }
    }

    #[test]
    fn size_matches_physical() {
        assert_eq!(1, Datatype::Int8.size());
        assert_eq!(8, Datatype::Int64.size());
        assert_eq!(4, Datatype::Float32.size());
        assert_eq!(1, Datatype::StringAscii.size());
    }
}
