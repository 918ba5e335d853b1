//! `FragmentMetadata`: per-fragment summary -- non-empty
//! domain, tile MBRs, tile offsets/sizes, timestamp range -- plus the
//! R-tree built once at open.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::coord::CoordValue;
use crate::error::{Error, Result};
use crate::fragment::rtree::{Mbr, RTree};
use crate::vfs::{ByteRange, Vfs};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMbr {
    pub lo: Vec<CoordValue>,
    pub hi: Vec<CoordValue>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileLocation {
    pub offset: u64,
    pub size: u64,
}

/// The on-disk, serializable contents of a `__fragment_metadata.tdb` blob.
/// `FragmentMetadata` (below) adds the R-tree built from this on open.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FragmentMetadataData {
    pub uri: String,
    pub non_empty_domain: Vec<(CoordValue, CoordValue)>,
    pub tile_mbrs: Vec<TileMbr>,
    /// Per-component (attribute/dimension physical file name) tile
    /// locations, indexed by tile index.
    pub tile_locations: HashMap<String, Vec<TileLocation>>,
    pub timestamp_range: (u64, u64),
    pub format_version: u32,
    /// True for a fragment written as explicit, unordered coordinates
    /// rather than dense, tile-aligned cells -- e.g. an unordered write
    /// into a dense array. Its tile MBRs bound the coordinates each tile
    /// actually holds rather than a full tile domain, so a dense read must
    /// resolve it by decoding written coordinates instead of assuming
    /// every cell inside the MBR belongs to the fragment.
    #[serde(default)]
    pub sparse_tiles: bool,
}

pub struct FragmentMetadata {
    pub data: FragmentMetadataData,
    rtree: RTree,
}

impl FragmentMetadata {
    pub fn new(data: FragmentMetadataData) -> Self {
        let mbrs: Vec<Mbr> = data
            .tile_mbrs
            .iter()
            .map(|m| Mbr { lo: m.lo.clone(), hi: m.hi.clone() })
            .collect();
        let rtree = RTree::bulk_load(mbrs);
        FragmentMetadata { data, rtree }
    }

    pub fn uri(&self) -> &str {
        &self.data.uri
    }

    pub fn non_empty_domain(&self) -> &[(CoordValue, CoordValue)] {
        &self.data.non_empty_domain
    }

    pub fn tile_mbrs(&self) -> &[TileMbr] {
        &self.data.tile_mbrs
    }

    pub fn sparse_tiles(&self) -> bool {
        self.data.sparse_tiles
    }

    pub fn num_tiles(&self) -> usize {
        self.data.tile_mbrs.len()
    }

    pub fn tile_offset(&self, tile_idx: usize, component: &str) -> Result<u64> {
        self.location(tile_idx, component).map(|loc| loc.offset)
    }

    pub fn tile_size(&self, tile_idx: usize, component: &str) -> Result<u64> {
        self.location(tile_idx, component).map(|loc| loc.size)
    }

    fn location(&self, tile_idx: usize, component: &str) -> Result<TileLocation> {
        self.data
            .tile_locations
            .get(component)
            .and_then(|v| v.get(tile_idx))
            .cloned()
            .ok_or_else(|| Error::MetadataError {
                uri: self.data.uri.clone(),
                reason: format!(
                    "no tile location for component `{component}` tile {tile_idx}"
                ),
            })
    }

    /// Tile indices whose MBR intersects `range`, via full scan. Prefer
    /// [Self::rtree_query] for larger fragments.
    pub fn overlaps(
        &self,
        range: &[(CoordValue, CoordValue)],
    ) -> Vec<usize> {
        self.data
            .tile_mbrs
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                Mbr { lo: m.lo.clone(), hi: m.hi.clone() }.intersects(range)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn rtree_query(
        &self,
        range: &[(CoordValue, CoordValue)],
    ) -> Vec<usize> {
        self.rtree.query(range)
    }

    pub fn timestamp_range(&self) -> (u64, u64) {
        self.data.timestamp_range
    }

    /// Opens fragment metadata from `<fragment_uri>/__fragment_metadata.tdb`.
    /// A missing or unparsable blob is a [Error::MetadataError]: reads
    /// never continue against a fragment whose index can't be trusted.
    pub fn open(vfs: &dyn Vfs, fragment_uri: &str) -> Result<Self> {
        let meta_uri = crate::vfs::join(fragment_uri, "__fragment_metadata.tdb");
        let size = vfs.file_size(&meta_uri).map_err(|_| Error::MetadataError {
            uri: fragment_uri.to_string(),
            reason: "missing __fragment_metadata.tdb".to_string(),
        })?;
        let bytes = vfs
            .read(&meta_uri, ByteRange::new(0, size))
            .map_err(|e| Error::MetadataError {
                uri: fragment_uri.to_string(),
                reason: e.to_string(),
            })?;
        let data: FragmentMetadataData =
            serde_json::from_slice(&bytes).map_err(|e| Error::MetadataError {
                uri: fragment_uri.to_string(),
                reason: format!("corrupt fragment metadata: {e}"),
            })?;
        Ok(FragmentMetadata::new(data))
    }

    pub fn persist(&self, vfs: &dyn Vfs) -> Result<()> {
        let meta_uri = crate::vfs::join(&self.data.uri, "__fragment_metadata.tdb");
        let bytes = serde_json::to_vec(&self.data).map_err(|e| {
            Error::FormatError(format!("failed to serialize fragment metadata: {e}"))
        })?;
        vfs.write(&meta_uri, &bytes)
    }
}

/// Reconciliation tie-break: later `t_end` wins; on equal `t_end`, later
/// `t_start` wins; on full equality the URI suffix lexicographically
/// breaks ties deterministically.
pub fn fragment_priority_cmp(a: &FragmentMetadata, b: &FragmentMetadata) -> std::cmp::Ordering {
    let (a_start, a_end) = a.timestamp_range();
    let (b_start, b_end) = b.timestamp_range();
    a_end
        .cmp(&b_end)
        .then_with(|| a_start.cmp(&b_start))
        .then_with(|| a.uri().cmp(b.uri()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryVfs;

    fn sample(uri: &str, t0: u64, t1: u64) -> FragmentMetadataData {
        FragmentMetadataData {
            uri: uri.to_string(),
            non_empty_domain: vec![(CoordValue::Int32(1), CoordValue::Int32(10))],
            tile_mbrs: vec![TileMbr {
                lo: vec![CoordValue::Int32(1)],
                hi: vec![CoordValue::Int32(5)],
            }],
            tile_locations: HashMap::from([(
                "a".to_string(),
                vec![TileLocation { offset: 0, size: 20 }],
            )]),
            timestamp_range: (t0, t1),
            format_version: 1,
            sparse_tiles: false,
        }
    }

    #[test]
    fn persist_and_reopen_roundtrip() {
        let vfs = MemoryVfs::new();
        let meta = FragmentMetadata::new(sample("frag_a", 1, 2));
        meta.persist(&vfs).unwrap();
        let reopened = FragmentMetadata::open(&vfs, "frag_a").unwrap();
        assert_eq!(reopened.timestamp_range(), (1, 2));
        assert_eq!(reopened.tile_offset(0, "a").unwrap(), 0);
    }

    #[test]
    fn open_fails_on_missing_metadata() {
        let vfs = MemoryVfs::new();
        let err = FragmentMetadata::open(&vfs, "nonexistent").unwrap_err();
        assert!(matches!(err, Error::MetadataError { .. }));
    }

    #[test]
    fn priority_orders_by_end_then_start_then_uri() {
        let a = FragmentMetadata::new(sample("a", 0, 5));
        let b = FragmentMetadata::new(sample("b", 0, 10));
        assert_eq!(fragment_priority_cmp(&a, &b), std::cmp::Ordering::Less);

        let c = FragmentMetadata::new(sample("c", 2, 10));
        let d = FragmentMetadata::new(sample("d", 1, 10));
        assert_eq!(fragment_priority_cmp(&d, &c), std::cmp::Ordering::Less);
    }
}
