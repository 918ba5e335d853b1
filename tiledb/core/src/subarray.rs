//! `Subarray`: the set of ranges a query reads or writes,
//! one or more per dimension, plus the result layout and the
//! out-of-bounds policy applied when a range extends past the domain.

use tiledb_common::range::{Range, SingleValueRange, VarValueRange};
use tiledb_common::array::CellOrder;

use crate::coord::CoordValue;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// What happens when `add_range` is given a range that extends outside a
/// dimension's domain. `Error` matches the C API default; `Clamp` is the
/// behavior enabled by `sm.read_range_oob = "warn"`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OobPolicy {
    Error,
    Clamp,
}

impl Default for OobPolicy {
    fn default() -> Self {
        OobPolicy::Error
    }
}

#[derive(Clone, Debug, Default)]
pub struct Subarray {
    /// Per-dimension list of ranges, in `add_range` call order. A
    /// dimension with no explicit range covers its whole domain.
    ranges: Vec<Vec<Range>>,
    layout: Option<CellOrder>,
    oob: OobPolicy,
}

impl Subarray {
    pub fn new(num_dimensions: usize) -> Self {
        Subarray {
            ranges: vec![Vec::new(); num_dimensions],
            layout: None,
            oob: OobPolicy::default(),
        }
    }

    pub fn set_layout(&mut self, layout: CellOrder) {
        self.layout = Some(layout);
    }

    pub fn layout(&self, schema: &Schema) -> CellOrder {
        self.layout.unwrap_or_else(|| schema.cell_order())
    }

    pub fn set_oob_policy(&mut self, policy: OobPolicy) {
        self.oob = policy;
    }

    /// Adds a range on dimension `dim`, validating (and, per [OobPolicy],
    /// clamping) it against the schema's domain first.
    pub fn add_range(
        &mut self,
        schema: &Schema,
        dim: usize,
        range: SingleValueRange,
    ) -> Result<()> {
        let name = schema.dimension_name(dim).to_string();
        let (lo, hi) = range_bounds(&range);
        if !lo.as_f64().is_finite() || !hi.as_f64().is_finite() {
            return Err(Error::InvalidRange {
                dimension: name,
                reason: "range bound is NaN or infinite".to_string(),
            });
        }
        if lo.cmp_total(&hi) == std::cmp::Ordering::Greater {
            return Err(Error::InvalidRange {
                dimension: name,
                reason: "lower bound exceeds upper bound".to_string(),
            });
        }
        let domain = schema_domain_bounds(schema, dim)?;
        let clamped = match self.oob {
            OobPolicy::Error => {
                if lo.cmp_total(&domain.0) == std::cmp::Ordering::Less
                    || hi.cmp_total(&domain.1) == std::cmp::Ordering::Greater
                {
                    return Err(Error::OOBError {
                        dimension: name,
                        lo: format!("{:?}", lo),
                        hi: format!("{:?}", hi),
                    });
                }
                range
            }
            OobPolicy::Clamp => clamp_range(range, &domain),
        };
        self.ranges[dim].push(clamped);
        Ok(())
    }

    /// Adds a byte-string range on dimension `dim`. String dimensions have
    /// no fixed numeric domain (see [Schema::dim_domain_pub]), so there's
    /// no out-of-bounds check here -- only that `lo <= hi` lexicographically.
    pub fn add_range_var(
        &mut self,
        schema: &Schema,
        dim: usize,
        lo: Vec<u8>,
        hi: Vec<u8>,
    ) -> Result<()> {
        let name = schema.dimension_name(dim).to_string();
        if lo > hi {
            return Err(Error::InvalidRange {
                dimension: name,
                reason: "lower bound exceeds upper bound".to_string(),
            });
        }
        self.ranges[dim].push(Range::Var(VarValueRange::UInt8(
            lo.into_boxed_slice(),
            hi.into_boxed_slice(),
        )));
        Ok(())
    }

    pub fn ranges(&self, dim: usize) -> &[Range] {
        &self.ranges[dim]
    }

    pub fn num_dimensions(&self) -> usize {
        self.ranges.len()
    }

    /// Effective range list per dimension: the dimension's whole domain if
    /// nothing was added, otherwise the user's ranges as given (`add_range`
    /// calls need not be pre-merged; overlapping ranges are the caller's
    /// problem).
    pub fn effective_ranges(&self, schema: &Schema) -> Result<Vec<Vec<(CoordValue, CoordValue)>>> {
        let mut out = Vec::with_capacity(self.ranges.len());
        for dim in 0..self.ranges.len() {
            if self.ranges[dim].is_empty() {
                out.push(vec![schema_domain_bounds(schema, dim)?]);
            } else {
                out.push(
                    self.ranges[dim]
                        .iter()
                        .map(|r| match r {
                            Range::Single(s) => range_bounds(s),
                            Range::Var(VarValueRange::UInt8(lo, hi)) => {
                                (CoordValue::Bytes(lo.to_vec()), CoordValue::Bytes(hi.to_vec()))
                            }
                            _ => unreachable!(
                                "dense/sparse dims only use Range::Single or a byte-string Range::Var"
                            ),
                        })
                        .collect(),
                );
            }
        }
        Ok(out)
    }

    /// True if every dimension has exactly one range: the case the dense
    /// tile-domain walk requires.
    pub fn is_single_range(&self) -> bool {
        self.ranges.iter().all(|r| r.len() <= 1)
    }
}

fn schema_domain_bounds(schema: &Schema, dim: usize) -> Result<(CoordValue, CoordValue)> {
    schema
        .dim_domain_pub(dim)
        .ok_or_else(|| Error::InvalidRange {
            dimension: schema.dimension_name(dim).to_string(),
            reason: "dimension has no bounded numeric domain".to_string(),
        })
}

fn range_bounds(r: &SingleValueRange) -> (CoordValue, CoordValue) {
    match *r {
        SingleValueRange::UInt8(a, b) => (CoordValue::UInt8(a), CoordValue::UInt8(b)),
        SingleValueRange::UInt16(a, b) => (CoordValue::UInt16(a), CoordValue::UInt16(b)),
        SingleValueRange::UInt32(a, b) => (CoordValue::UInt32(a), CoordValue::UInt32(b)),
        SingleValueRange::UInt64(a, b) => (CoordValue::UInt64(a), CoordValue::UInt64(b)),
        SingleValueRange::Int8(a, b) => (CoordValue::Int8(a), CoordValue::Int8(b)),
        SingleValueRange::Int16(a, b) => (CoordValue::Int16(a), CoordValue::Int16(b)),
        SingleValueRange::Int32(a, b) => (CoordValue::Int32(a), CoordValue::Int32(b)),
        SingleValueRange::Int64(a, b) => (CoordValue::Int64(a), CoordValue::Int64(b)),
        SingleValueRange::Float32(a, b) => (CoordValue::Float32(a), CoordValue::Float32(b)),
        SingleValueRange::Float64(a, b) => (CoordValue::Float64(a), CoordValue::Float64(b)),
    }
}

fn clamp_range(
    r: SingleValueRange,
    domain: &(CoordValue, CoordValue),
) -> SingleValueRange {
    let (lo, hi) = range_bounds(&r);
    let clo = if lo.cmp_total(&domain.0) == std::cmp::Ordering::Less {
        domain.0.clone()
    } else {
        lo
    };
    let chi = if hi.cmp_total(&domain.1) == std::cmp::Ordering::Greater {
        domain.1.clone()
    } else {
        hi
    };
    coord_pair_to_range(&clo, &chi)
}

fn coord_pair_to_range(lo: &CoordValue, hi: &CoordValue) -> SingleValueRange {
    use CoordValue::*;
    match (lo, hi) {
        (UInt8(a), UInt8(b)) => SingleValueRange::UInt8(*a, *b),
        (UInt16(a), UInt16(b)) => SingleValueRange::UInt16(*a, *b),
        (UInt32(a), UInt32(b)) => SingleValueRange::UInt32(*a, *b),
        (UInt64(a), UInt64(b)) => SingleValueRange::UInt64(*a, *b),
        (Int8(a), Int8(b)) => SingleValueRange::Int8(*a, *b),
        (Int16(a), Int16(b)) => SingleValueRange::Int16(*a, *b),
        (Int32(a), Int32(b)) => SingleValueRange::Int32(*a, *b),
        (Int64(a), Int64(b)) => SingleValueRange::Int64(*a, *b),
        (Float32(a), Float32(b)) => SingleValueRange::Float32(*a, *b),
        (Float64(a), Float64(b)) => SingleValueRange::Float64(*a, *b),
        _ => panic!("clamp_range on a non-numeric or mismatched coordinate pair"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::ArrayType;
    use tiledb_common::datatype::Datatype;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

    fn schema_1d() -> Schema {
        Schema::new(SchemaData {
            array_type: ArrayType::Dense,
            domain: DomainData {
                dimension: vec![DimensionData {
                    name: "d".to_string(),
                    datatype: Datatype::Int32,
                    constraints: DimensionConstraints::Int32([1, 100], Some(10)),
                    filters: None,
                }],
            },
            ..Default::default()
        })
    }

    #[test]
    fn add_range_rejects_out_of_bounds_by_default() {
        let schema = schema_1d();
        let mut sub = Subarray::new(1);
        let err = sub
            .add_range(&schema, 0, SingleValueRange::Int32(0, 50))
            .unwrap_err();
        assert!(matches!(err, Error::OOBError { .. }));
    }

    #[test]
    fn add_range_clamps_when_policy_is_clamp() {
        let schema = schema_1d();
        let mut sub = Subarray::new(1);
        sub.set_oob_policy(OobPolicy::Clamp);
        sub.add_range(&schema, 0, SingleValueRange::Int32(0, 50)).unwrap();
        let bounds = sub.effective_ranges(&schema).unwrap();
        assert_eq!(bounds[0][0], (CoordValue::Int32(1), CoordValue::Int32(50)));
    }

    #[test]
    fn add_range_rejects_nan_and_infinite_bounds() {
        let schema = Schema::new(SchemaData {
            array_type: ArrayType::Dense,
            domain: DomainData {
                dimension: vec![DimensionData {
                    name: "d".to_string(),
                    datatype: Datatype::Float64,
                    constraints: DimensionConstraints::Float64(
                        [0.0, 100.0],
                        Some(10.0),
                    ),
                    filters: None,
                }],
            },
            ..Default::default()
        });
        let mut sub = Subarray::new(1);
        let err = sub
            .add_range(&schema, 0, SingleValueRange::Float64(f64::NAN, 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
        let err = sub
            .add_range(&schema, 0, SingleValueRange::Float64(0.0, f64::INFINITY))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn empty_subarray_covers_whole_domain() {
        let schema = schema_1d();
        let sub = Subarray::new(1);
        let bounds = sub.effective_ranges(&schema).unwrap();
        assert_eq!(bounds[0][0], (CoordValue::Int32(1), CoordValue::Int32(100)));
    }

    fn schema_string_1d() -> Schema {
        Schema::new(SchemaData {
            array_type: ArrayType::Sparse,
            domain: DomainData {
                dimension: vec![DimensionData {
                    name: "d".to_string(),
                    datatype: Datatype::StringAscii,
                    constraints: DimensionConstraints::StringAscii,
                    filters: None,
                }],
            },
            ..Default::default()
        })
    }

    #[test]
    fn add_range_var_accepts_a_byte_string_range_on_a_string_dimension() {
        let schema = schema_string_1d();
        let mut sub = Subarray::new(1);
        sub.add_range_var(&schema, 0, b"alpha".to_vec(), b"omega".to_vec()).unwrap();
        let bounds = sub.effective_ranges(&schema).unwrap();
        assert_eq!(
            bounds[0][0],
            (CoordValue::Bytes(b"alpha".to_vec()), CoordValue::Bytes(b"omega".to_vec()))
        );
    }

    #[test]
    fn add_range_var_rejects_lower_bound_past_upper_bound() {
        let schema = schema_string_1d();
        let mut sub = Subarray::new(1);
        let err = sub
            .add_range_var(&schema, 0, b"z".to_vec(), b"a".to_vec())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }
}
