//! Read-side cell planning: dense tile-domain walks and sparse tile pruning.
//!
//! Both engines answer the same question -- "for every cell a subarray
//! covers, which fragment (if any) supplies it, and where does that
//! fragment keep it" -- and differ only in how they discover the set of
//! covered cells: the dense engine walks the tile domain and fills every
//! position (real data or synthetic fill), the sparse engine unions
//! whatever fragments actually wrote.
//!
//! Both materialize the full plan for one partition up front rather than
//! streaming tile-by-tile. [crate::query::coordinator::Coordinator] is
//! what turns a plan into the caller-visible, back-pressured submit()
//! loop the design notes describe; the simplification here is that the
//! plan itself is an eagerly built `Vec`, not a lazy cursor (see
//! `DESIGN.md`).

pub mod dense;
pub mod sparse;

use crate::coord::Coord;

/// Where one planned cell's data comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CellSource {
    /// `fragment` indexes into the slice of fragments the plan was built
    /// from; `tile_idx` is that fragment's local tile index; `pos` is the
    /// cell's linear position within that tile.
    Fragment { fragment: usize, tile_idx: usize, pos: usize },
    /// No fragment covers this cell (dense reads only): the coordinator
    /// fills it with the attribute's fill value.
    Fill,
}

#[derive(Clone, Debug)]
pub struct PlannedCell {
    pub coords: Coord,
    pub source: CellSource,
}

/// Which shape of overlap a tile-aligned fragment's MBR takes against its
/// tile's domain. [dense::plan_dense] uses [OverlapKind::Full] to skip the
/// per-cell containment check for every cell in that tile -- see
/// [dense::classify_overlap].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OverlapKind {
    /// The requested rectangle covers the tile's entire domain.
    Full,
    /// Partial, but the covered cells form one contiguous run in cell
    /// order (every dimension but the fastest-varying one is fully
    /// covered).
    PartialContiguous,
    /// Partial and not contiguous: more than one dimension besides the
    /// fastest-varying one is clipped.
    PartialNonContiguous,
}
