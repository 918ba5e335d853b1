//! Write-side tiling: turns caller buffers into on-disk
//! tiles. [dense_tiler] builds tiles from a subarray the caller's buffers
//! are implicitly laid out over; [sparse_writer] builds tiles from
//! explicit coordinates, sorted by Hilbert or geometric order.
//!
//! Both share [AttributeBuffer] (the write-path counterpart of
//! [crate::tile::Tile]) and the dense tiler's [CopyRun] plan, which reuses
//! [crate::schema::Schema::get_cell_pos] against both a tile's own domain
//! and the caller's write rectangle to linearize positions consistently.

pub mod dense_tiler;
pub mod sparse_writer;

use itertools::Itertools;

use crate::config::Config;
use crate::coord::CoordValue;
use crate::schema::Schema;

/// One attribute's input buffer for a write, mirroring the shape a
/// `set_buffer`/`set_buffer_var`/`set_buffer_validity` call would hand the
/// engine.
#[derive(Clone, Debug, Default)]
pub struct AttributeBuffer {
    pub data: Vec<u8>,
    pub offsets: Option<Vec<u64>>,
    pub validity: Option<Vec<u8>>,
}

impl AttributeBuffer {
    pub fn fixed(data: Vec<u8>) -> Self {
        AttributeBuffer { data, offsets: None, validity: None }
    }

    pub fn var(data: Vec<u8>, offsets: Vec<u64>) -> Self {
        AttributeBuffer { data, offsets: Some(offsets), validity: None }
    }

    pub fn with_validity(mut self, validity: Vec<u8>) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn is_var(&self) -> bool {
        self.offsets.is_some()
    }

    /// Number of cells a var buffer claims to hold, honoring
    /// [Config::var_offsets_extra_element]: with the extra element the
    /// offsets array carries one more entry than there are cells (the
    /// trailing entry is the total byte length, not a cell start).
    pub fn var_num_cells(&self, config: &Config) -> usize {
        let offsets = self.offsets.as_deref().unwrap_or(&[]);
        if config.var_offsets_extra_element {
            offsets.len().saturating_sub(1)
        } else {
            offsets.len()
        }
    }

    /// Byte range of var cell `i`, reading straight through to the next
    /// offset (or the end of `data` for the last real cell) -- this works
    /// unchanged under either extra-element convention, since the extra
    /// entry (when present) is itself a valid "next offset".
    pub fn var_cell_bytes(&self, i: usize) -> &[u8] {
        let offsets = self.offsets.as_deref().expect("var_cell_bytes on a fixed-size buffer");
        let start = offsets[i] as usize;
        let end = offsets.get(i + 1).map(|&o| o as usize).unwrap_or(self.data.len());
        &self.data[start..end]
    }
}

/// One contiguous run of cell positions to copy from a write buffer (laid
/// out over a write rectangle in the schema's cell order) into a tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CopyRun {
    pub tile_pos: usize,
    pub buf_pos: usize,
    pub len: usize,
}

/// Spec.md §4.9's "copy plan": the contiguous runs covering the overlap of
/// `tile_domain` and `rect`, each run's length measured along the
/// schema's fastest-varying dimension (last for row-major, first for
/// column-major). Empty if the two rectangles don't overlap.
pub fn plan_copy_runs(
    schema: &Schema,
    tile_domain: &[(CoordValue, CoordValue)],
    rect: &[(CoordValue, CoordValue)],
) -> Vec<CopyRun> {
    let k = tile_domain.len();
    let mut overlap = Vec::with_capacity(k);
    for i in 0..k {
        let lo = max_coord(&tile_domain[i].0, &rect[i].0);
        let hi = min_coord(&tile_domain[i].1, &rect[i].1);
        if lo.cmp_total(&hi) == std::cmp::Ordering::Greater {
            return vec![];
        }
        overlap.push((lo, hi));
    }

    let fastest = match schema.cell_order() {
        tiledb_common::array::CellOrder::ColumnMajor => 0,
        _ => k.saturating_sub(1),
    };
    let (flo, fhi) = overlap[fastest].clone();
    let len = (fhi.as_i128().expect("dense write requires an integral dimension")
        - flo.as_i128().expect("dense write requires an integral dimension")
        + 1) as usize;

    let outer_dims: Vec<usize> = (0..k).filter(|&d| d != fastest).collect();
    let mut runs = Vec::new();

    if outer_dims.is_empty() {
        let mut start: Vec<CoordValue> = overlap.iter().map(|(lo, _)| lo.clone()).collect();
        start[fastest] = flo;
        runs.push(CopyRun {
            tile_pos: schema.get_cell_pos(tile_domain, &start),
            buf_pos: schema.get_cell_pos(rect, &start),
            len,
        });
        return runs;
    }

    let outer_axes: Vec<Vec<CoordValue>> =
        outer_dims.iter().map(|&d| axis_values(&overlap[d])).collect();
    for combo in outer_axes.into_iter().multi_cartesian_product() {
        let mut start: Vec<CoordValue> = overlap.iter().map(|(lo, _)| lo.clone()).collect();
        for (dim, val) in outer_dims.iter().zip(combo.into_iter()) {
            start[*dim] = val;
        }
        start[fastest] = flo.clone();
        runs.push(CopyRun {
            tile_pos: schema.get_cell_pos(tile_domain, &start),
            buf_pos: schema.get_cell_pos(rect, &start),
            len,
        });
    }
    runs
}

fn max_coord(a: &CoordValue, b: &CoordValue) -> CoordValue {
    if a.cmp_total(b) == std::cmp::Ordering::Greater { a.clone() } else { b.clone() }
}

fn min_coord(a: &CoordValue, b: &CoordValue) -> CoordValue {
    if a.cmp_total(b) == std::cmp::Ordering::Less { a.clone() } else { b.clone() }
}

fn axis_values(range: &(CoordValue, CoordValue)) -> Vec<CoordValue> {
    let lo = range.0.as_i128().expect("dense write requires an integral dimension");
    let hi = range.1.as_i128().expect("dense write requires an integral dimension");
    (lo..=hi).map(|v| coord_from_i128(&range.0, v)).collect()
}

fn coord_from_i128(like: &CoordValue, v: i128) -> CoordValue {
    match like {
        CoordValue::Int8(_) => CoordValue::Int8(v as i8),
        CoordValue::Int16(_) => CoordValue::Int16(v as i16),
        CoordValue::Int32(_) => CoordValue::Int32(v as i32),
        CoordValue::Int64(_) => CoordValue::Int64(v as i64),
        CoordValue::UInt8(_) => CoordValue::UInt8(v as u8),
        CoordValue::UInt16(_) => CoordValue::UInt16(v as u16),
        CoordValue::UInt32(_) => CoordValue::UInt32(v as u32),
        CoordValue::UInt64(_) => CoordValue::UInt64(v as u64),
        other => other.clone(),
    }
}
