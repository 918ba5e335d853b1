#[cfg(any(test, feature = "proptest-strategies"))]
pub mod strategy;

#[cfg(feature = "option-subset")]
use tiledb_utils::option::OptionSubset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tiledb_common::array::CellValNum;
use tiledb_common::datatype::Datatype;
use tiledb_common::filter::FilterData;

#[derive(Clone, Default, Debug, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct AttributeData {
    pub name: String,
    pub datatype: Datatype,
    pub nullability: Option<bool>,
    pub cell_val_num: Option<CellValNum>,
    pub fill: Option<FillData>,
    pub filters: Vec<FilterData>,
}

/// Encapsulation of data needed to construct an Attribute's fill value.
///
/// `data` holds the raw bytes of the fill value in the attribute's physical
/// representation: for a `CellValNum::Fixed(k)` attribute this is exactly
/// `k * datatype.size()` bytes; for `CellValNum::Var` it is the single
/// variable-length instance written into every unwritten cell.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct FillData {
    pub data: Vec<u8>,
    pub nullability: Option<bool>,
}

impl FillData {
    /// Packs a value implementing [tiledb_common::array::attribute::IntoFillValue]
    /// into its raw byte representation.
    pub fn new<T>(value: T, nullability: Option<bool>) -> Self
    where
        T: tiledb_common::array::attribute::IntoFillValue,
    {
        let raw = value.to_raw();
        let elem_size = std::mem::size_of::<T::PhysicalType>();
        let mut data = Vec::with_capacity(raw.len() * elem_size);
        for v in raw {
            let ptr = v as *const T::PhysicalType as *const u8;
            // SAFETY: `ptr` is valid for `elem_size` bytes, it comes from a
            // live reference to a `Copy` scalar of that exact size.
            let bytes = unsafe { std::slice::from_raw_parts(ptr, elem_size) };
            data.extend_from_slice(bytes);
        }
        FillData { data, nullability }
    }
}
