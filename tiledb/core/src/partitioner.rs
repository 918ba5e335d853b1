//! `Partitioner`: splits a subarray's effective range
//! rectangle into pieces that fit a per-submission memory budget,
//! halving along the widest dimension until every piece fits. Integral
//! dimensions bisect exactly; float dimensions bisect to within one ULP;
//! string/byte dimensions split at the median bounding-coord prefix. Only
//! once every dimension is down to a single, still-overflowing value does
//! the query make no further progress and fail with
//! [Error::UnsplittableOverflow].

use crate::coord::CoordValue;
use crate::error::{Error, Result};

pub type Rect = Vec<(CoordValue, CoordValue)>;

pub struct Partitioner {
    /// Pending rectangles, processed in LIFO order so splits of an
    /// oversized partition are handed out before later (unrelated)
    /// partitions, matching the incremental "give me the next piece"
    /// contract queries submit against.
    stack: Vec<Rect>,
}

impl Partitioner {
    pub fn new(initial: Rect) -> Self {
        Partitioner { stack: vec![initial] }
    }

    pub fn is_done(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns the next rectangle whose estimated result size (number of
    /// cells times `bytes_per_cell`) fits within `budget_bytes`, splitting
    /// along the widest splittable dimension as many times as needed.
    pub fn next(&mut self, budget_bytes: usize, bytes_per_cell: usize) -> Result<Option<Rect>> {
        while let Some(rect) = self.stack.pop() {
            let cells = num_cells(&rect);
            let needed = cells.saturating_mul(bytes_per_cell as u128);
            if needed <= budget_bytes as u128 {
                return Ok(Some(rect));
            }
            match split_widest(&rect) {
                Some((lo_half, hi_half)) => {
                    // push in reverse so lo_half pops first
                    self.stack.push(hi_half);
                    self.stack.push(lo_half);
                }
                None => {
                    return Err(Error::UnsplittableOverflow {
                        field: "<subarray>".to_string(),
                    });
                }
            }
        }
        Ok(None)
    }
}

fn span_cells(lo: &CoordValue, hi: &CoordValue) -> Option<u128> {
    match (lo.as_i128(), hi.as_i128()) {
        (Some(l), Some(h)) if h >= l => Some((h - l + 1) as u128),
        _ => None,
    }
}

fn num_cells(rect: &Rect) -> u128 {
    rect.iter()
        .map(|(lo, hi)| span_cells(lo, hi).unwrap_or(1))
        .product()
}

/// Picks a splittable dimension and bisects it. Tries the widest integral
/// dimension first, then falls back to any float dimension that isn't
/// already down to two adjacent representable values, then to any
/// string/byte dimension that isn't already down to a single value.
/// Returns `None` only when every dimension is pinned to a single,
/// unsplittable value.
fn split_widest(rect: &Rect) -> Option<(Rect, Rect)> {
    if let Some((dim, _)) = rect
        .iter()
        .enumerate()
        .filter_map(|(i, (lo, hi))| span_cells(lo, hi).map(|s| (i, s)))
        .filter(|(_, s)| *s > 1)
        .max_by_key(|(_, s)| *s)
    {
        let (lo, hi) = &rect[dim];
        let lo_i = lo.as_i128().unwrap();
        let hi_i = hi.as_i128().unwrap();
        let mid = lo_i + (hi_i - lo_i) / 2;

        let mut lo_half = rect.clone();
        let mut hi_half = rect.clone();
        lo_half[dim] = (lo.clone(), coord_from_i128(lo, mid));
        hi_half[dim] = (coord_from_i128(lo, mid + 1), hi.clone());
        return Some((lo_half, hi_half));
    }

    for (dim, (lo, hi)) in rect.iter().enumerate() {
        if let Some((mid, next)) = split_float(lo, hi) {
            let mut lo_half = rect.clone();
            let mut hi_half = rect.clone();
            lo_half[dim] = (lo.clone(), mid);
            hi_half[dim] = (next, hi.clone());
            return Some((lo_half, hi_half));
        }
    }

    for (dim, (lo, hi)) in rect.iter().enumerate() {
        if let (CoordValue::Bytes(l), CoordValue::Bytes(h)) = (lo, hi) {
            if l >= h {
                continue;
            }
            let mid = CoordValue::Bytes(split_bytes(l, h));
            let next = mid.succ();
            let mut lo_half = rect.clone();
            let mut hi_half = rect.clone();
            lo_half[dim] = (lo.clone(), mid);
            hi_half[dim] = (next, hi.clone());
            return Some((lo_half, hi_half));
        }
    }

    None
}

/// Bisects a float range to within one ULP: `mid` is the largest
/// representable value `<= (lo+hi)/2`, `next` is the representable value
/// immediately above it. Returns `None` once `lo` and `hi` are already
/// adjacent, since there's nothing strictly between them to split off.
fn split_float(lo: &CoordValue, hi: &CoordValue) -> Option<(CoordValue, CoordValue)> {
    match (lo, hi) {
        (CoordValue::Float64(l), CoordValue::Float64(h)) => {
            let (mid, next) = split_f64(*l, *h)?;
            Some((CoordValue::Float64(mid), CoordValue::Float64(next)))
        }
        (CoordValue::Float32(l), CoordValue::Float32(h)) => {
            let (mid, next) = split_f32(*l, *h)?;
            Some((CoordValue::Float32(mid), CoordValue::Float32(next)))
        }
        _ => None,
    }
}

fn split_f64(lo: f64, hi: f64) -> Option<(f64, f64)> {
    if !(lo < hi) {
        return None;
    }
    let mid = (lo + (hi - lo) / 2.0).clamp(lo, hi);
    let next = next_up_f64(mid);
    if mid < lo || mid >= hi || next > hi {
        return None;
    }
    Some((mid, next))
}

fn split_f32(lo: f32, hi: f32) -> Option<(f32, f32)> {
    if !(lo < hi) {
        return None;
    }
    let mid = (lo + (hi - lo) / 2.0).clamp(lo, hi);
    let next = next_up_f32(mid);
    if mid < lo || mid >= hi || next > hi {
        return None;
    }
    Some((mid, next))
}

fn next_up_f64(v: f64) -> f64 {
    if v.is_nan() || v == f64::INFINITY {
        return v;
    }
    if v == 0.0 {
        return f64::from_bits(1);
    }
    let bits = v.to_bits();
    f64::from_bits(if v > 0.0 { bits + 1 } else { bits - 1 })
}

fn next_up_f32(v: f32) -> f32 {
    if v.is_nan() || v == f32::INFINITY {
        return v;
    }
    if v == 0.0 {
        return f32::from_bits(1);
    }
    let bits = v.to_bits();
    f32::from_bits(if v > 0.0 { bits + 1 } else { bits - 1 })
}

/// Splits a byte-string range at its median bounding-coord prefix: a
/// big-endian average of `lo` and `hi` computed with one extra trailing
/// byte of precision. Falls back to peeling off the single value `lo`
/// when the average collapses onto an endpoint, which happens when `lo`
/// is a byte-prefix of `hi` (e.g. `"a"` and `"a\0"` have no string
/// between them, so the finest possible split is `{"a"}` / `{"a\0"}`).
fn split_bytes(lo: &[u8], hi: &[u8]) -> Vec<u8> {
    let mid = bytes_midpoint(lo, hi);
    if mid.as_slice() <= lo || mid.as_slice() >= hi {
        lo.to_vec()
    } else {
        mid
    }
}

fn bytes_midpoint(lo: &[u8], hi: &[u8]) -> Vec<u8> {
    let len = lo.len().max(hi.len()) + 1;
    let mut a = vec![0u8; len];
    let mut b = vec![0u8; len];
    a[..lo.len()].copy_from_slice(lo);
    b[..hi.len()].copy_from_slice(hi);

    let mut sum = vec![0u8; len + 1];
    let mut carry = 0u16;
    for i in (0..len).rev() {
        let s = a[i] as u16 + b[i] as u16 + carry;
        sum[i + 1] = (s & 0xFF) as u8;
        carry = s >> 8;
    }
    sum[0] = carry as u8;

    let mut mid = vec![0u8; len + 1];
    let mut rem = 0u16;
    for (i, byte) in sum.iter().enumerate() {
        let cur = rem * 256 + *byte as u16;
        mid[i] = (cur / 2) as u8;
        rem = cur % 2;
    }
    mid.remove(0);
    mid
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
