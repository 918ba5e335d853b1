//! Consolidation and vacuum: only the *data shapes* these operations
//! produce and consume -- a plan of which fragments a consolidation run
//! would merge, and applying a vacuum log that's already been written.
//! Actually rewriting tile bytes into a new fragment, scheduling when
//! consolidation runs, and distributed locking across concurrent
//! consolidators are orchestration concerns and are not implemented here.

use crate::error::Result;
use crate::fragment::directory::{FragmentDirectory, VacuumLog};
use crate::fragment::metadata::{FragmentMetadata, FragmentMetadataData};

/// A proposed merge: which fragment URIs a consolidation run over
/// `window` would subsume, and the timestamp range the resulting
/// fragment would carry (the union of its inputs').
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsolidationPlan {
    pub window: (u64, u64),
    pub input_uris: Vec<String>,
    pub output_timestamp_range: (u64, u64),
}

/// Plans a consolidation over fragments whose timestamp range falls
/// entirely inside `window`. Returns `None` if fewer than two fragments
/// qualify -- consolidating a single fragment (or none) is a no-op, not
/// a plan.
pub fn plan_consolidation(
    fragments: &[FragmentMetadata],
    window: (u64, u64),
) -> Option<ConsolidationPlan> {
    let candidates: Vec<&FragmentMetadata> = fragments
        .iter()
        .filter(|f| {
            let (t0, t1) = f.timestamp_range();
            t0 >= window.0 && t1 <= window.1
        })
        .collect();
    if candidates.len() < 2 {
        return None;
    }
    let t0 = candidates.iter().map(|f| f.timestamp_range().0).min().unwrap();
    let t1 = candidates.iter().map(|f| f.timestamp_range().1).max().unwrap();
    let mut input_uris: Vec<String> = candidates.iter().map(|f| f.uri().to_string()).collect();
    input_uris.sort();
    Some(ConsolidationPlan { window, input_uris, output_timestamp_range: (t0, t1) })
}

/// Merges the metadata (not the tile bytes -- that's the out-of-scope
/// orchestration part) of a consolidation plan's inputs into the shape a
/// consolidated fragment's `__fragment_metadata.tdb` would carry: the
/// non-empty domain widens to the union, and tile MBRs concatenate in
/// input order. `tile_locations` is left empty since no tile bytes have
/// actually been rewritten; a real consolidator fills it in once it has
/// produced `output_uri`'s tile runs.
pub fn merge_fragment_metadata(
    output_uri: &str,
    inputs: &[&FragmentMetadata],
    output_timestamp_range: (u64, u64),
) -> FragmentMetadataData {
    let non_empty_domain = merge_non_empty_domains(inputs);
    let tile_mbrs = inputs.iter().flat_map(|f| f.tile_mbrs().iter().cloned()).collect();
    let format_version = inputs.iter().map(|f| f.data.format_version).max().unwrap_or(1);
    // A consolidated fragment still needs coordinate resolution if any of
    // its inputs did; merging tile-aligned MBRs with sparse ones doesn't
    // make the sparse ones tile-aligned.
    let sparse_tiles = inputs.iter().any(|f| f.sparse_tiles());
    FragmentMetadataData {
        uri: output_uri.to_string(),
        non_empty_domain,
        tile_mbrs,
        tile_locations: std::collections::HashMap::new(),
        timestamp_range: output_timestamp_range,
        format_version,
        sparse_tiles,
    }
}

fn merge_non_empty_domains(
    inputs: &[&FragmentMetadata],
) -> Vec<(crate::coord::CoordValue, crate::coord::CoordValue)> {
    let mut merged: Option<Vec<(crate::coord::CoordValue, crate::coord::CoordValue)>> = None;
    for f in inputs {
        let domain = f.non_empty_domain();
        merged = Some(match merged {
            None => domain.to_vec(),
            Some(prev) => prev
                .into_iter()
                .zip(domain.iter())
                .map(|((plo, phi), (lo, hi))| {
                    let lo = if lo.cmp_total(&plo) == std::cmp::Ordering::Less { lo.clone() } else { plo };
                    let hi = if hi.cmp_total(&phi) == std::cmp::Ordering::Greater { hi.clone() } else { phi };
                    (lo, hi)
                })
                .collect(),
        });
    }
    merged.unwrap_or_default()
}

/// Applies an already-written vacuum log: deletes the fragments it names
/// as subsumed. `log` is expected to have come from
/// [FragmentDirectory::write_vacuum_log] (or an equivalent external
/// consolidator); this function only consumes the data shape.
pub fn apply_vacuum_log(directory: &FragmentDirectory, log: &VacuumLog) -> Result<()> {
    directory.apply_vacuum(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::CoordValue;
    use crate::vfs::MemoryVfs;
    use std::collections::HashMap;

    fn frag(uri: &str, t0: u64, t1: u64, lo: i32, hi: i32) -> FragmentMetadata {
        FragmentMetadata::new(FragmentMetadataData {
            uri: uri.to_string(),
            non_empty_domain: vec![(CoordValue::Int32(lo), CoordValue::Int32(hi))],
            tile_mbrs: vec![],
            tile_locations: HashMap::new(),
            timestamp_range: (t0, t1),
            format_version: 1,
            sparse_tiles: false,
        })
    }

    #[test]
    fn plan_consolidation_requires_at_least_two_fragments_in_window() {
        let fragments = vec![frag("a", 1, 1, 0, 5)];
        assert!(plan_consolidation(&fragments, (0, 10)).is_none());
    }

    #[test]
    fn plan_consolidation_spans_input_timestamps() {
        let fragments = vec![frag("a", 1, 1, 0, 5), frag("b", 2, 3, 3, 9)];
        let plan = plan_consolidation(&fragments, (0, 10)).unwrap();
        assert_eq!(plan.output_timestamp_range, (1, 3));
        assert_eq!(plan.input_uris, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn plan_consolidation_excludes_fragments_outside_window() {
        let fragments = vec![frag("a", 1, 1, 0, 5), frag("b", 20, 21, 3, 9)];
        assert!(plan_consolidation(&fragments, (0, 10)).is_none());
    }

    #[test]
    fn merge_fragment_metadata_widens_the_non_empty_domain() {
        let a = frag("a", 1, 1, 0, 5);
        let b = frag("b", 2, 3, 3, 9);
        let merged = merge_fragment_metadata("c", &[&a, &b], (1, 3));
        assert_eq!(
            merged.non_empty_domain,
            vec![(CoordValue::Int32(0), CoordValue::Int32(9))]
        );
    }

    #[test]
    fn apply_vacuum_log_deletes_subsumed_fragments() {
        let vfs = MemoryVfs::new();
        let dir = FragmentDirectory::new(&vfs, "arr");
        vfs.write("arr/__fragments/f1/__fragment_metadata.tdb", b"{}").unwrap();
        let log = VacuumLog {
            consolidated_uri: "arr/__fragments/c".to_string(),
            subsumed_uris: vec!["arr/__fragments/f1".to_string()],
        };
        dir.write_vacuum_log(&log).unwrap();
        apply_vacuum_log(&dir, &log).unwrap();
        assert!(!vfs.exists("arr/__fragments/f1/__fragment_metadata.tdb"));
    }
}
