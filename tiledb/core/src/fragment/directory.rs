//! `FragmentDirectory`: lists an array's fragments, filters
//! them by timestamp range, and tracks which have been superseded by
//! consolidation so vacuum can clean them up.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fragment::metadata::FragmentMetadata;
use crate::vfs::{ByteRange, Vfs};

const FRAGMENTS_DIR: &str = "__fragments";
const COMMITS_DIR: &str = "__commits";
const FRAGMENT_META_DIR: &str = "__fragment_meta";

/// A consolidated-fragment record: the new fragment URI plus the URIs of
/// the fragments it subsumes, loaded from `__commits/<uri>.vac`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VacuumLog {
    pub consolidated_uri: String,
    pub subsumed_uris: Vec<String>,
}

pub struct FragmentDirectory<'a> {
    vfs: &'a dyn Vfs,
    array_uri: String,
}

impl<'a> FragmentDirectory<'a> {
    pub fn new(vfs: &'a dyn Vfs, array_uri: impl Into<String>) -> Self {
        FragmentDirectory { vfs, array_uri: array_uri.into() }
    }

    fn fragments_root(&self) -> String {
        crate::vfs::join(&self.array_uri, FRAGMENTS_DIR)
    }

    fn commits_root(&self) -> String {
        crate::vfs::join(&self.array_uri, COMMITS_DIR)
    }

    fn fragment_meta_root(&self) -> String {
        crate::vfs::join(&self.array_uri, FRAGMENT_META_DIR)
    }

    /// Allocates a fresh fragment URI under `__fragments/`, named
    /// `__<uuid>_<t0>_<t1>_<fmt>`. The uuid makes concurrent writers on the
    /// same array produce distinct fragments without any shared counter.
    pub fn new_fragment_uri(&self, t0: u64, t1: u64, fmt: u32) -> String {
        let name = format!("__{}_{t0}_{t1}_{fmt}", uuid::Uuid::new_v4());
        crate::vfs::join(&self.fragments_root(), &name)
    }

    /// Opens every fragment under `__fragments/`, in URI order. A fragment
    /// whose metadata is corrupt propagates its `MetadataError` -- the
    /// directory listing fails rather than silently dropping a fragment a
    /// read would otherwise have needed.
    pub fn list(&self) -> Result<Vec<FragmentMetadata>> {
        let uris = match self.vfs.ls(&self.fragments_root()) {
            Ok(uris) => uris,
            Err(_) => return Ok(vec![]),
        };
        let vacuumed = self.vacuumed_uris()?;
        uris.into_iter()
            .filter(|u| !vacuumed.contains(u))
            .map(|uri| FragmentMetadata::open(self.vfs, &uri))
            .collect()
    }

    /// Fragments whose `[t_start, t_end]` overlaps `[lo, hi]` -- the
    /// "open at timestamp" filter.
    pub fn list_in_range(&self, lo: u64, hi: u64) -> Result<Vec<FragmentMetadata>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|f| {
                let (t0, t1) = f.timestamp_range();
                t0 <= hi && t1 >= lo
            })
            .collect())
    }

    /// Alias of [Self::list_in_range] under the name the directory's
    /// public operation set uses.
    pub fn timestamp_range_filter(&self, t_lo: u64, t_hi: u64) -> Result<Vec<FragmentMetadata>> {
        self.list_in_range(t_lo, t_hi)
    }

    /// Whether a consolidated `__fragment_meta/<uuid>.meta` blob exists
    /// for this array. Consolidated metadata lets a
    /// reader skip opening every individual fragment's metadata blob;
    /// producing one is the consolidation orchestration this crate
    /// doesn't implement, but the directory still reports whether one is
    /// present.
    pub fn consolidated_metadata(&self) -> bool {
        self.vfs.ls(&self.fragment_meta_root()).map(|v| !v.is_empty()).unwrap_or(false)
    }

    /// Writes a consolidated metadata blob under `__fragment_meta/`. The
    /// blob's *shape* (what it contains) is a non-goal-adjacent detail
    /// this crate does define -- see
    /// [crate::consolidate::merge_fragment_metadata] -- but deciding
    /// *when* to produce one is the caller's job.
    pub fn write_consolidated_metadata(&self, data: &FragmentMetadata) -> Result<()> {
        let name = data.uri().rsplit('/').next().unwrap_or(data.uri());
        let uri = crate::vfs::join(&self.fragment_meta_root(), &format!("{name}.meta"));
        let bytes = serde_json::to_vec(&data.data).map_err(|e| {
            crate::error::Error::FormatError(format!(
                "failed to serialize consolidated metadata: {e}"
            ))
        })?;
        self.vfs.write(&uri, &bytes)
    }

    /// The vacuum logs written under `__commits/*.vac`, each naming a
    /// consolidated fragment and the fragment URIs it subsumes.
    pub fn vacuum_logs(&self) -> Result<Vec<VacuumLog>> {
        let entries = match self.vfs.ls(&self.commits_root()) {
            Ok(e) => e,
            Err(_) => return Ok(vec![]),
        };
        let mut logs = vec![];
        for uri in entries.into_iter().filter(|u| u.ends_with(".vac")) {
            let size = self.vfs.file_size(&uri)?;
            let bytes = self.vfs.read(&uri, ByteRange::new(0, size))?;
            logs.push(serde_json::from_slice(&bytes).map_err(|e| {
                crate::error::Error::FormatError(format!("corrupt vacuum log {uri}: {e}"))
            })?);
        }
        Ok(logs)
    }

    fn vacuumed_uris(&self) -> Result<std::collections::HashSet<String>> {
        Ok(self
            .vacuum_logs()?
            .into_iter()
            .flat_map(|log| log.subsumed_uris)
            .collect())
    }

    /// Fragment URIs that consolidation has subsumed and vacuum is free to
    /// delete: every URI named in a `.vac` log's `subsumed_uris`.
    pub fn to_vacuum(&self) -> Result<Vec<String>> {
        let mut uris: Vec<String> = self.vacuumed_uris()?.into_iter().collect();
        uris.sort();
        Ok(uris)
    }

    pub fn write_vacuum_log(&self, log: &VacuumLog) -> Result<()> {
        let name = log.consolidated_uri.rsplit('/').next().unwrap_or(&log.consolidated_uri);
        let uri = crate::vfs::join(&self.commits_root(), &format!("{name}.vac"));
        let bytes = serde_json::to_vec(log).map_err(|e| {
            crate::error::Error::FormatError(format!("failed to serialize vacuum log: {e}"))
        })?;
        self.vfs.write(&uri, &bytes)
    }

    /// Physically removes the fragments a vacuum log says are subsumed,
    /// then removes the log itself. The consolidated fragment that
    /// replaces them is left untouched.
    pub fn apply_vacuum(&self, log: &VacuumLog) -> Result<()> {
        for uri in &log.subsumed_uris {
            self.vfs.remove_dir(uri)?;
        }
        let name = log.consolidated_uri.rsplit('/').next().unwrap_or(&log.consolidated_uri);
        let log_uri = crate::vfs::join(&self.commits_root(), &format!("{name}.vac"));
        self.vfs.remove_file(&log_uri)
    }
}

/// Collapses a list of `(uri, t_start, t_end)` entries by dropping any
/// entry whose timestamp range is strictly contained in a later-listed
/// entry's range -- ties on `t_end` fall out naturally, since the wider
/// `t_start` is what makes the containment strict. Idempotent and
/// order-preserving: surviving entries keep their relative order.
pub fn remove_consolidated_fragment_uris(entries: &mut Vec<(String, u64, u64)>) {
    let mut i = 0;
    while i < entries.len() {
        let (_, lo_i, hi_i) = entries[i].clone();
        let dominated = entries[i + 1..].iter().any(|(_, lo_j, hi_j)| {
            *lo_j <= lo_i && hi_i <= *hi_j && (*lo_j < lo_i || hi_i < *hi_j)
        });
        if dominated {
            entries.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::CoordValue;
    use crate::fragment::metadata::FragmentMetadataData;
    use crate::vfs::MemoryVfs;
    use std::collections::HashMap;

    fn write_fragment(vfs: &dyn Vfs, array: &str, name: &str, t0: u64, t1: u64) {
        let uri = crate::vfs::join(&crate::vfs::join(array, "__fragments"), name);
        let data = FragmentMetadataData {
            uri: uri.clone(),
            non_empty_domain: vec![(CoordValue::Int32(0), CoordValue::Int32(1))],
            tile_mbrs: vec![],
            tile_locations: HashMap::new(),
            timestamp_range: (t0, t1),
            format_version: 1,
            sparse_tiles: false,
        };
        FragmentMetadata::new(data).persist(vfs).unwrap();
    }

    #[test]
    fn list_excludes_vacuumed_fragments() {
        let vfs = MemoryVfs::new();
        write_fragment(&vfs, "arr", "f1", 1, 1);
        write_fragment(&vfs, "arr", "f2", 2, 2);

        let dir = FragmentDirectory::new(&vfs, "arr");
        assert_eq!(dir.list().unwrap().len(), 2);

        let log = VacuumLog {
            consolidated_uri: "arr/__fragments/consolidated".to_string(),
            subsumed_uris: vec!["arr/__fragments/f1".to_string()],
        };
        dir.write_vacuum_log(&log).unwrap();
        let remaining = dir.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].uri(), "arr/__fragments/f2");
    }

    #[test]
    fn remove_consolidated_fragment_uris_drops_strictly_contained_ranges() {
        let mut entries = vec![
            ("a".to_string(), 5, 6),
            ("b".to_string(), 1, 10),
            ("c".to_string(), 1, 10),
        ];
        remove_consolidated_fragment_uris(&mut entries);
        // "a" is strictly inside "b" (and "c"); "b" and "c" are equal
        // ranges, neither strictly contains the other, so both survive.
        assert_eq!(
            entries,
            vec![("b".to_string(), 1, 10), ("c".to_string(), 1, 10)]
        );
    }

    #[test]
    fn remove_consolidated_fragment_uris_is_idempotent() {
        let mut entries = vec![
            ("a".to_string(), 5, 6),
            ("b".to_string(), 1, 10),
        ];
        remove_consolidated_fragment_uris(&mut entries);
        let once = entries.clone();
        remove_consolidated_fragment_uris(&mut entries);
        assert_eq!(entries, once);
    }

    #[test]
    fn new_fragment_uri_is_namespaced_and_unique() {
        let vfs = MemoryVfs::new();
        let dir = FragmentDirectory::new(&vfs, "arr");
        let a = dir.new_fragment_uri(1, 2, 1);
        let b = dir.new_fragment_uri(1, 2, 1);
        assert_ne!(a, b);
        assert!(a.starts_with("arr/__fragments/__"));
        assert!(a.ends_with("_1_2_1"));
    }

    #[test]
    fn apply_vacuum_removes_subsumed_fragments_and_log() {
        let vfs = MemoryVfs::new();
        write_fragment(&vfs, "arr", "f1", 1, 1);
        let dir = FragmentDirectory::new(&vfs, "arr");
        let log = VacuumLog {
            consolidated_uri: "arr/__fragments/c".to_string(),
            subsumed_uris: vec!["arr/__fragments/f1".to_string()],
        };
        dir.write_vacuum_log(&log).unwrap();
        dir.apply_vacuum(&log).unwrap();
        assert!(dir.to_vacuum().unwrap().is_empty());
        assert!(!vfs.exists("arr/__fragments/f1/__fragment_metadata.tdb"));
    }

    #[test]
    fn consolidated_metadata_reports_presence() {
        let vfs = MemoryVfs::new();
        write_fragment(&vfs, "arr", "f1", 1, 1);
        let dir = FragmentDirectory::new(&vfs, "arr");
        assert!(!dir.consolidated_metadata());

        let fragments = dir.list().unwrap();
        dir.write_consolidated_metadata(&fragments[0]).unwrap();
        assert!(dir.consolidated_metadata());
    }

    #[test]
    fn timestamp_range_filter_matches_list_in_range() {
        let vfs = MemoryVfs::new();
        write_fragment(&vfs, "arr", "f1", 1, 1);
        write_fragment(&vfs, "arr", "f2", 5, 5);
        let dir = FragmentDirectory::new(&vfs, "arr");
        let filtered = dir.timestamp_range_filter(0, 2).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].uri(), "arr/__fragments/f1");
    }
}
