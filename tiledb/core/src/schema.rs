//! `Schema`: the behavioral wrapper around [tiledb_pod::array::schema::SchemaData].
//!
//! `SchemaData` (from the `tiledb-pod` crate) is pure description — it
//! knows what a schema *is* but not how to compare cells or find a tile.
//! This module adds the behavioral operations:
//! `cell_order_cmp`, `tile_order_cmp`, `get_cell_pos`,
//! `get_next_cell_coords`, `get_previous_cell_coords`, `tile_id`, plus the
//! `tile_domain`/`tile_subarray` helpers the read engines need.

use std::cmp::Ordering;
use std::num::NonZeroU32;

use tiledb_common::array::dimension::DimensionConstraints;
use tiledb_common::array::{ArrayType, CellOrder, CellValNum, TileOrder};
use tiledb_common::datatype::Datatype;
use tiledb_common::key::LookupKey;
use tiledb_pod::array::schema::{FieldData, SchemaData};

use crate::coord::{Coord, CoordValue};
use crate::error::{Error, Result};

/// A half-open-on-the-right tile rectangle, one `(lo, hi)` pair per
/// dimension, in domain order. `hi` is inclusive, matching dimension
/// domains elsewhere in the engine.
pub type TileDomain = Vec<(CoordValue, CoordValue)>;

#[derive(Clone, Debug)]
pub struct Schema {
    pub data: SchemaData,
}

impl Schema {
    pub fn new(data: SchemaData) -> Self {
        Schema { data }
    }

    pub fn array_type(&self) -> ArrayType {
        self.data.array_type
    }

    pub fn num_dimensions(&self) -> usize {
        self.data.domain.dimension.len()
    }

    pub fn dimension_name(&self, idx: usize) -> &str {
        &self.data.domain.dimension[idx].name
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.data.domain.dimension.iter().map(|d| d.name.clone()).collect()
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.data.attributes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn cell_order(&self) -> CellOrder {
        self.data.cell_order.unwrap_or(CellOrder::RowMajor)
    }

    pub fn tile_order(&self) -> TileOrder {
        self.data.tile_order.unwrap_or(TileOrder::RowMajor)
    }

    pub fn allows_dups(&self) -> bool {
        self.data.allow_duplicates.unwrap_or(false)
    }

    pub fn field<K: Into<LookupKey>>(&self, key: K) -> Result<FieldData> {
        let key = key.into();
        self.data.field(key.clone()).ok_or_else(|| {
            Error::UnknownName(match key {
                LookupKey::Name(n) => n,
                LookupKey::Index(i) => i.to_string(),
            })
        })
    }

    pub fn datatype<K: Into<LookupKey>>(&self, key: K) -> Result<Datatype> {
        Ok(self.field(key)?.datatype())
    }

    /// Size in bytes of one fixed-size cell, or `None` for variable-length
    /// fields.
    pub fn cell_size<K: Into<LookupKey> + Clone>(
        &self,
        key: K,
    ) -> Result<Option<usize>> {
        let field = self.field(key)?;
        let cvn = field.cell_val_num().unwrap_or(CellValNum::single());
        Ok(match cvn {
            CellValNum::Var => None,
            CellValNum::Fixed(n) => {
                Some(field.datatype().size() * n.get() as usize)
            }
        })
    }

    pub fn var_size<K: Into<LookupKey> + Clone>(&self, key: K) -> Result<bool> {
        Ok(self.cell_size(key)?.is_none())
    }

    /// Total size in bytes of one coordinate tuple, or `None` if any
    /// dimension is variable-length (string dimensions).
    pub fn coords_size(&self) -> Option<usize> {
        let mut total = 0usize;
        for dim in self.data.domain.dimension.iter() {
            match dim.constraints.cell_val_num() {
                CellValNum::Var => return None,
                CellValNum::Fixed(_) => {
                    total += dim.datatype.size();
                }
            }
        }
        Some(total)
    }

    fn dim_domain(&self, idx: usize) -> Option<(CoordValue, CoordValue)> {
        let dim = &self.data.domain.dimension[idx];
        dimension_domain_bounds(&dim.constraints)
    }

    /// Public view of a dimension's inclusive domain bounds, `None` for
    /// string dimensions (which have no fixed bounds).
    pub fn dim_domain_pub(&self, idx: usize) -> Option<(CoordValue, CoordValue)> {
        self.dim_domain(idx)
    }

    fn dim_extent(&self, idx: usize) -> Option<f64> {
        let dim = &self.data.domain.dimension[idx];
        dim.constraints.num_cells_per_tile().map(|n| n as f64)
    }

    /// Total order consistent with the declared cell order.
    pub fn cell_order_cmp(&self, a: &Coord, b: &Coord) -> Ordering {
        order_cmp(self.cell_order_as_major(), a, b)
    }

    pub fn tile_order_cmp(&self, a: &[i128], b: &[i128]) -> Ordering {
        match self.tile_order() {
            TileOrder::RowMajor => {
                for (l, r) in a.iter().zip(b.iter()) {
                    match l.cmp(r) {
                        Ordering::Equal => continue,
                        o => return o,
                    }
                }
                Ordering::Equal
            }
            TileOrder::ColumnMajor => {
                for (l, r) in a.iter().zip(b.iter()).rev() {
                    match l.cmp(r) {
                        Ordering::Equal => continue,
                        o => return o,
                    }
                }
                Ordering::Equal
            }
        }
    }

    /// Hilbert cell order is handled by the `hilbert` module; for the
    /// strictly-geometric orders this returns whether the order is
    /// column-major (false means row-major).
    fn cell_order_as_major(&self) -> CellMajor {
        match self.cell_order() {
            CellOrder::ColumnMajor => CellMajor::Column,
            _ => CellMajor::Row,
        }
    }

    /// The global tile coordinate containing `value` along dimension `dim`.
    pub fn tile_coord_of(&self, dim: usize, value: &CoordValue) -> i128 {
        let (lo, _) = self
            .dim_domain(dim)
            .expect("tile_coord_of requires a bounded numeric dimension");
        let extent = self
            .dim_extent(dim)
            .expect("tile_coord_of requires a tile extent");
        let delta = value.as_f64() - lo.as_f64();
        (delta / extent).floor() as i128
    }

    /// Global tile id for the tile containing `coords`, O(k) in the number
    /// of dimensions.
    pub fn tile_id(&self, coords: &Coord) -> u64 {
        let tile_coords: Vec<i128> = (0..self.num_dimensions())
            .map(|i| self.tile_coord_of(i, &coords[i]))
            .collect();
        self.linear_tile_id(&tile_coords)
    }

    /// Linearizes a tile-coordinate tuple into a single id, honoring the
    /// declared tile order and each dimension's tile count.
    pub fn linear_tile_id(&self, tile_coords: &[i128]) -> u64 {
        let counts: Vec<u64> = (0..self.num_dimensions())
            .map(|i| self.num_tiles_along(i))
            .collect();
        let order: Vec<usize> = match self.tile_order() {
            TileOrder::RowMajor => (0..self.num_dimensions()).collect(),
            TileOrder::ColumnMajor => {
                (0..self.num_dimensions()).rev().collect()
            }
        };
        let mut id: u64 = 0;
        for &dim in order.iter() {
            id = id
                .saturating_mul(counts[dim])
                .saturating_add(tile_coords[dim] as u64);
        }
        id
    }

    pub fn num_tiles_along(&self, dim: usize) -> u64 {
        let (lo, hi) = self
            .dim_domain(dim)
            .expect("num_tiles_along requires a bounded dimension");
        let extent = self
            .dim_extent(dim)
            .expect("num_tiles_along requires a tile extent");
        let span = hi.as_f64() - lo.as_f64() + 1.0;
        (span / extent).ceil() as u64
    }

    /// The rectangle of global tile coordinates overlapping `ranges`
    /// (one inclusive `(lo, hi)` range per dimension). Returns `None` if any dimension's range does not
    /// intersect the domain (empty intersection).
    pub fn tile_domain_of(
        &self,
        ranges: &[(CoordValue, CoordValue)],
    ) -> Option<Vec<(i128, i128)>> {
        let mut out = Vec::with_capacity(ranges.len());
        for (i, (lo, hi)) in ranges.iter().enumerate() {
            let dom = self.dim_domain(i)?;
            if hi.cmp_total(&dom.0) == Ordering::Less
                || lo.cmp_total(&dom.1) == Ordering::Greater
            {
                return None;
            }
            let t_lo = self.tile_coord_of(i, lo);
            let t_hi = self.tile_coord_of(i, hi);
            out.push((t_lo, t_hi));
        }
        Some(out)
    }

    /// The tile's own coordinate rectangle (inclusive), clipped to the
    /// dimension's domain -- the last tile along a dimension may extend
    /// past `hi` and is clipped here.
    pub fn tile_subarray(&self, tile_coords: &[i128]) -> TileDomain {
        (0..self.num_dimensions())
            .map(|i| {
                let (lo, hi) = self.dim_domain(i).expect("bounded dimension");
                let extent = self.dim_extent(i).expect("tile extent");
                let t = tile_coords[i];
                let start = lo.as_f64() + (t as f64) * extent;
                let end = (start + extent - 1.0).min(hi.as_f64());
                (
                    coord_from_f64(&lo, start),
                    coord_from_f64(&lo, end),
                )
            })
            .collect()
    }

    /// Linear position of `coords` within the tile bounded by
    /// `tile_domain`, honoring cell order.
    pub fn get_cell_pos(
        &self,
        tile_domain: &[(CoordValue, CoordValue)],
        coords: &Coord,
    ) -> usize {
        let extents: Vec<i128> = tile_domain
            .iter()
            .map(|(lo, hi)| {
                (hi.as_f64() - lo.as_f64()).round() as i128 + 1
            })
            .collect();
        let local: Vec<i128> = tile_domain
            .iter()
            .zip(coords.iter())
            .map(|((lo, _), c)| (c.as_f64() - lo.as_f64()).round() as i128)
            .collect();

        let order: Vec<usize> = match self.cell_order_as_major() {
            CellMajor::Row => (0..local.len()).rev().collect(),
            CellMajor::Column => (0..local.len()).collect(),
        };

        let mut pos: i128 = 0;
        for &dim in order.iter() {
            pos = pos * extents[dim] + local[dim];
        }
        pos as usize
    }

    /// Successor of `coords` within `tile_domain` in cell order, wrapping
    /// at the tile edge. Returns
    /// `None` if `coords` is the last cell in the tile.
    pub fn get_next_cell_coords(
        &self,
        tile_domain: &[(CoordValue, CoordValue)],
        coords: &Coord,
    ) -> Option<Coord> {
        let mut out = coords.clone();
        let fastest_first: Vec<usize> = match self.cell_order_as_major() {
            CellMajor::Row => (0..out.len()).rev().collect(),
            CellMajor::Column => (0..out.len()).collect(),
        };
        for dim in fastest_first {
            let (lo, hi) = &tile_domain[dim];
            if out[dim].cmp_total(hi) == Ordering::Less {
                out[dim] = out[dim].succ();
                return Some(out);
            } else {
                out[dim] = lo.clone();
            }
        }
        None
    }

    /// Predecessor of `coords` within `tile_domain`, mirroring
    /// `get_next_cell_coords`.
    pub fn get_previous_cell_coords(
        &self,
        tile_domain: &[(CoordValue, CoordValue)],
        coords: &Coord,
    ) -> Option<Coord> {
        let mut out = coords.clone();
        let fastest_first: Vec<usize> = match self.cell_order_as_major() {
            CellMajor::Row => (0..out.len()).rev().collect(),
            CellMajor::Column => (0..out.len()).collect(),
        };
        for dim in fastest_first {
            let (lo, hi) = &tile_domain[dim];
            if out[dim].cmp_total(lo) == Ordering::Greater {
                out[dim] = out[dim].pred();
                return Some(out);
            } else {
                out[dim] = hi.clone();
            }
        }
        None
    }

    /// Fill bytes for `field` when no fragment covers a cell: the
    /// attribute's declared `FillData` override if it has one, otherwise
    /// [default_fill_bytes].
    pub fn fill_bytes<K: Into<LookupKey>>(&self, key: K) -> Result<Vec<u8>> {
        let field = self.field(key)?;
        if let FieldData::Attribute(attr) = &field {
            if let Some(fill) = &attr.fill {
                return Ok(fill.data.clone());
            }
        }
        Ok(default_fill_bytes(
            field.datatype(),
            field.cell_val_num().unwrap_or(CellValNum::single()),
        ))
    }

    /// Nullability to report for a filled-in cell: the fill override's own
    /// nullability flag if set, otherwise not-null (`0`).
    pub fn fill_validity<K: Into<LookupKey>>(&self, key: K) -> Result<u8> {
        let field = self.field(key)?;
        if let FieldData::Attribute(attr) = &field {
            if let Some(fill) = &attr.fill {
                return Ok(fill.nullability.unwrap_or(false) as u8);
            }
        }
        Ok(0)
    }

    /// Persists this schema as `<array_uri>/__schema/<uuid>.tdb`, the
    /// immutable blob under the array's schema directory. Returns the
    /// uuid so callers (namely [crate::array::Array::create]) can record
    /// which schema version an array was created with.
    pub fn persist(&self, vfs: &dyn crate::vfs::Vfs, array_uri: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let uri = crate::vfs::join(&crate::vfs::join(array_uri, "__schema"), &format!("{id}.tdb"));
        let bytes = serde_json::to_vec(&self.data)
            .map_err(|e| Error::Other(format!("failed to serialize schema: {e}")))?;
        vfs.write(&uri, &bytes)?;
        Ok(id)
    }

    /// Loads the newest schema blob under `<array_uri>/__schema/`. Schemas
    /// are immutable once written; "newest" only
    /// matters in the unusual case of a directory left over from a
    /// superseded create.
    pub fn open(vfs: &dyn crate::vfs::Vfs, array_uri: &str) -> Result<Self> {
        let dir = crate::vfs::join(array_uri, "__schema");
        let mut uris = vfs.ls(&dir).map_err(|_| Error::FormatError(format!(
            "array `{array_uri}` has no __schema directory"
        )))?;
        uris.sort();
        let uri = uris.pop().ok_or_else(|| {
            Error::FormatError(format!("array `{array_uri}` has no schema blob"))
        })?;
        let size = vfs.file_size(&uri)?;
        let bytes = vfs.read(&uri, crate::vfs::ByteRange::new(0, size))?;
        let data: SchemaData = serde_json::from_slice(&bytes)
            .map_err(|e| Error::FormatError(format!("corrupt schema blob `{uri}`: {e}")))?;
        Ok(Schema::new(data))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CellMajor {
    Row,
    Column,
}

fn order_cmp(major: CellMajor, a: &Coord, b: &Coord) -> Ordering {
    match major {
        CellMajor::Row => crate::coord::coord_cmp_row_major(a, b),
        CellMajor::Column => crate::coord::coord_cmp_col_major(a, b),
    }
}

fn dimension_domain_bounds(
    c: &DimensionConstraints,
) -> Option<(CoordValue, CoordValue)> {
    macro_rules! bounds {
        ($lo:expr, $hi:expr) => {
            Some((CoordValue::from(*$lo), CoordValue::from(*$hi)))
        };
    }
    match c {
        DimensionConstraints::Int8([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::Int16([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::Int32([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::Int64([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::UInt8([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::UInt16([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::UInt32([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::UInt64([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::Float32([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::Float64([lo, hi], _) => bounds!(lo, hi),
        DimensionConstraints::StringAscii => None,
    }
}

fn coord_from_f64(like: &CoordValue, v: f64) -> CoordValue {
    match like {
        CoordValue::Int8(_) => CoordValue::Int8(v as i8),
        CoordValue::Int16(_) => CoordValue::Int16(v as i16),
        CoordValue::Int32(_) => CoordValue::Int32(v as i32),
        CoordValue::Int64(_) => CoordValue::Int64(v as i64),
        CoordValue::UInt8(_) => CoordValue::UInt8(v as u8),
        CoordValue::UInt16(_) => CoordValue::UInt16(v as u16),
        CoordValue::UInt32(_) => CoordValue::UInt32(v as u32),
        CoordValue::UInt64(_) => CoordValue::UInt64(v as u64),
        CoordValue::Float32(_) => CoordValue::Float32(v as f32),
        CoordValue::Float64(_) => CoordValue::Float64(v),
        CoordValue::Bytes(b) => CoordValue::Bytes(b.clone()),
    }
}

/// Fill value for a dense cell with no writer coverage: integer types use the minimum
/// representable value, floats use NaN, and byte/char types use `0x00`,
/// unless the schema's attribute carries an explicit `FillData` override.
pub fn default_fill_bytes(datatype: Datatype, cell_val_num: CellValNum) -> Vec<u8> {
    let n = match cell_val_num {
        CellValNum::Fixed(n) => n.get() as usize,
        CellValNum::Var => 1,
    };
    let mut out = Vec::with_capacity(datatype.size() * n);
    for _ in 0..n {
        out.extend_from_slice(&default_fill_scalar(datatype));
    }
    out
}

fn default_fill_scalar(datatype: Datatype) -> Vec<u8> {
    use Datatype::*;
    match datatype {
        Int8 => i8::MIN.to_ne_bytes().to_vec(),
        Int16 => i16::MIN.to_ne_bytes().to_vec(),
        Int32 => i32::MIN.to_ne_bytes().to_vec(),
        Int64 => i64::MIN.to_ne_bytes().to_vec(),
        UInt8 => u8::MAX.to_ne_bytes().to_vec(),
        UInt16 => u16::MAX.to_ne_bytes().to_vec(),
        UInt32 => u32::MAX.to_ne_bytes().to_vec(),
        UInt64 => u64::MAX.to_ne_bytes().to_vec(),
        Float32 => f32::NAN.to_ne_bytes().to_vec(),
        Float64 => f64::NAN.to_ne_bytes().to_vec(),
        StringAscii | Blob => vec![0u8],
        Boolean => vec![0u8],
    }
}

pub fn single_nonzero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("cell_val_num cannot be zero")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiledb_common::array::dimension::DimensionData;
    use tiledb_common::array::CellOrder as CO;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;

    fn schema_1d(extent: i32, lo: i32, hi: i32) -> Schema {
        Schema::new(SchemaData {
            array_type: ArrayType::Dense,
            domain: DomainData {
                dimension: vec![DimensionData {
                    name: "d".to_string(),
                    datatype: Datatype::Int32,
                    constraints: DimensionConstraints::Int32(
                        [lo, hi],
                        Some(extent),
                    ),
                    filters: None,
                }],
            },
            cell_order: Some(CO::RowMajor),
            ..Default::default()
        })
    }

    #[test]
    fn tile_id_basic() {
        let schema = schema_1d(5, 1, 10);
        assert_eq!(schema.tile_coord_of(0, &CoordValue::Int32(1)), 0);
        assert_eq!(schema.tile_coord_of(0, &CoordValue::Int32(5)), 0);
        assert_eq!(schema.tile_coord_of(0, &CoordValue::Int32(6)), 1);
        assert_eq!(schema.num_tiles_along(0), 2);
    }

    #[test]
    fn cell_pos_row_major_2d() {
        let schema = Schema::new(SchemaData {
            array_type: ArrayType::Dense,
            domain: DomainData {
                dimension: vec![
                    DimensionData {
                        name: "d1".to_string(),
                        datatype: Datatype::Int32,
                        constraints: DimensionConstraints::Int32(
                            [1, 10],
                            Some(5),
                        ),
                        filters: None,
                    },
                    DimensionData {
                        name: "d2".to_string(),
                        datatype: Datatype::Int32,
                        constraints: DimensionConstraints::Int32(
                            [1, 30],
                            Some(10),
                        ),
                        filters: None,
                    },
                ],
            },
            cell_order: Some(CO::RowMajor),
            attributes: vec![AttributeData {
                name: "a".to_string(),
                datatype: Datatype::Int32,
                ..Default::default()
            }],
            ..Default::default()
        });
        let tile_domain: TileDomain = vec![
            (CoordValue::Int32(1), CoordValue::Int32(5)),
            (CoordValue::Int32(1), CoordValue::Int32(10)),
        ];
        let coords: Coord = vec![CoordValue::Int32(1), CoordValue::Int32(1)];
        assert_eq!(schema.get_cell_pos(&tile_domain, &coords), 0);
        let coords: Coord = vec![CoordValue::Int32(1), CoordValue::Int32(2)];
        assert_eq!(schema.get_cell_pos(&tile_domain, &coords), 1);
        let coords: Coord = vec![CoordValue::Int32(2), CoordValue::Int32(1)];
        assert_eq!(schema.get_cell_pos(&tile_domain, &coords), 10);
    }

    #[test]
    fn next_cell_wraps() {
        let schema = schema_1d(5, 1, 10);
        let tile_domain: TileDomain =
            vec![(CoordValue::Int32(1), CoordValue::Int32(5))];
        let coords: Coord = vec![CoordValue::Int32(5)];
        assert!(schema.get_next_cell_coords(&tile_domain, &coords).is_none());
        let coords: Coord = vec![CoordValue::Int32(3)];
        let next = schema.get_next_cell_coords(&tile_domain, &coords).unwrap();
        assert_eq!(next, vec![CoordValue::Int32(4)]);
    }

    #[test]
    fn persist_and_open_roundtrip() {
        let vfs = crate::vfs::MemoryVfs::new();
        let schema = schema_1d(5, 1, 10);
        let id = schema.persist(&vfs, "arr").unwrap();
        assert!(vfs.exists(&format!("arr/__schema/{id}.tdb")));

        let reopened = Schema::open(&vfs, "arr").unwrap();
        assert_eq!(reopened.array_type(), schema.array_type());
        assert_eq!(reopened.dimension_names(), schema.dimension_names());
    }
}
