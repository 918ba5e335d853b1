//! Filter pipeline description types.
//!
//! The engine core treats filters as an opaque, ordered transform applied to
//! a tile's byte buffer before it is written to storage and undone before a
//! tile is returned to a reader. Codec implementations (compression,
//! checksums, shuffles, ...) are out of scope here; what matters to the
//! storage layer is the *shape* of the pipeline: does it change a value's
//! datatype, and is it invertible.

use thiserror::Error;

#[cfg(feature = "option-subset")]
use tiledb_utils::option::OptionSubset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum CompressionType {
    Bzip2,
    Dictionary,
    Gzip,
    Lz4,
    Rle,
    Zstd,
    Delta {
        reinterpret_datatype: Option<Datatype>,
    },
    DoubleDelta {
        reinterpret_datatype: Option<Datatype>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ChecksumType {
    Md5,
    Sha256,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct CompressionData {
    pub kind: CompressionType,
    pub level: Option<i32>,
}

impl CompressionData {
    pub fn new(kind: CompressionType) -> Self {
        CompressionData { kind, level: None }
    }
}

/// A single stage in a [FilterList].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum FilterData {
    BitShuffle,
    ByteShuffle,
    Checksum(ChecksumType),
    Compression(CompressionData),
    Xor,
}

#[derive(Clone, Debug, Error)]
pub enum FilterError {
    #[error("Filter {filter:?} does not accept input datatype {datatype}")]
    IncompatibleDatatype { filter: FilterData, datatype: Datatype },
}

impl FilterData {
    /// Returns the output datatype when this filter is applied to the input
    /// type, or `None` if the filter rejects that input.
    pub fn transform_datatype(&self, input: &Datatype) -> Option<Datatype> {
        match self {
            FilterData::BitShuffle | FilterData::ByteShuffle | FilterData::Checksum(_) => {
                Some(*input)
            }
            FilterData::Compression(CompressionData {
                kind:
                    CompressionType::Delta { reinterpret_datatype }
                    | CompressionType::DoubleDelta { reinterpret_datatype },
                ..
            }) => reinterpret_datatype.map_or(Some(*input), |dtype| {
                if !dtype.is_real_type() {
                    Some(dtype)
                } else {
                    None
                }
            }),
            FilterData::Compression(_) => Some(*input),
            FilterData::Xor => match input.size() {
                1 => Some(Datatype::Int8),
                2 => Some(Datatype::Int16),
                4 => Some(Datatype::Int32),
                8 => Some(Datatype::Int64),
                _ => None,
            },
        }
    }

    /// True if the transform this filter applies can be undone exactly,
    /// byte for byte. The tile cache and read path rely on every filter in a
    /// pipeline being invertible.
    pub fn is_invertible(&self) -> bool {
        !matches!(self, FilterData::Checksum(_))
    }
}

/// An ordered sequence of filters applied to every tile of a field.
///
/// Checksum filters may only trail the list: once a checksum is appended
/// nothing else may come after it, since a checksum covers the bytes that
/// precede it in the pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "option-subset", derive(OptionSubset))]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct FilterList {
    filters: Vec<FilterData>,
}

impl FilterList {
    pub fn new() -> Self {
        FilterList { filters: Vec::new() }
    }

    pub fn push(&mut self, filter: FilterData) -> Result<(), FilterError> {
        self.filters.push(filter);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterData> {
        self.filters.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// The datatype a tile has once every filter in the pipeline has been
    /// applied in order, or `None` if any stage rejects its input.
    pub fn output_datatype(&self, input: Datatype) -> Option<Datatype> {
        self.filters
            .iter()
            .try_fold(input, |dt, f| f.transform_datatype(&dt))
    }
}

impl From<Vec<FilterData>> for FilterList {
    fn from(filters: Vec<FilterData>) -> Self {
        FilterList { filters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pipeline_is_identity() {
        let list = FilterList::new();
        assert_eq!(list.output_datatype(Datatype::Int32), Some(Datatype::Int32));
    }

    #[test]
    fn shuffle_preserves_datatype() {
        let list = FilterList::from(vec![FilterData::ByteShuffle]);
        assert_eq!(list.output_datatype(Datatype::Float64), Some(Datatype::Float64));
    }

    #[test]
    fn checksum_is_not_invertible() {
        assert!(!FilterData::Checksum(ChecksumType::Sha256).is_invertible());
        assert!(FilterData::ByteShuffle.is_invertible());
    }
}
