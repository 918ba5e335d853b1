//! Dense read planning: walk the tile domain a subarray
//! overlaps, and for every cell in it decide which fragment (newest
//! first) covers that cell, falling back to the synthetic "empty"
//! fragment (fill) when none do.
//!
//! Most fragments a dense read resolves are tile-aligned: their MBRs are
//! full tile domains and the fast path in [classify_overlap] applies
//! directly. A fragment written as explicit coordinates (an unordered
//! write into a dense array, [crate::fragment::metadata::FragmentMetadataData::sparse_tiles])
//! is resolved differently: its tile MBRs only bound the coordinates it
//! actually holds, so this module reads those coordinates back (the same
//! way [crate::read::sparse] does for a sparse array) and claims
//! individual cells rather than whole tiles.

use std::collections::HashMap;

use itertools::Itertools;
use tiledb_common::array::CellOrder;

use crate::coord::{coord_cmp_col_major, coord_cmp_row_major, Coord, CoordValue};
use crate::error::{Error, Result};
use crate::fragment::metadata::{fragment_priority_cmp, FragmentMetadata};
use crate::read::sparse::{coord_in_rect, read_tile_coords};
use crate::read::{CellSource, OverlapKind, PlannedCell};
use crate::schema::{Schema, TileDomain};
use crate::tile::TileStore;
use crate::vfs::Vfs;

/// Classifies how a tile-aligned fragment's MBR overlaps `tile_domain`
/// under `cell_order`: [OverlapKind::Full] lets [plan_dense] skip the
/// per-cell containment check for every cell in that tile, since full
/// coverage means the MBR can't exclude any of them.
pub fn classify_overlap(
    cell_order: CellOrder,
    tile_domain: &TileDomain,
    req: &[(CoordValue, CoordValue)],
) -> OverlapKind {
    let n = tile_domain.len();
    let fastest = match cell_order {
        CellOrder::ColumnMajor => 0,
        _ => n.saturating_sub(1),
    };
    let mut full = true;
    let mut contiguous = true;
    for i in 0..n {
        let (tlo, thi) = &tile_domain[i];
        let (rlo, rhi) = &req[i];
        let covers = tlo.cmp_total(rlo) == std::cmp::Ordering::Equal
            && thi.cmp_total(rhi) == std::cmp::Ordering::Equal;
        if !covers {
            full = false;
            if i != fastest {
                contiguous = false;
            }
        }
    }
    if full {
        OverlapKind::Full
    } else if contiguous {
        OverlapKind::PartialContiguous
    } else {
        OverlapKind::PartialNonContiguous
    }
}

/// Builds the ordered dense read plan for one partition rectangle.
/// `fragments` is newest-and-oldest mixed in any order; priority is
/// derived internally via [fragment_priority_cmp]. Requires every
/// dimension in `rect` to carry an integral domain -- floating-point
/// dense dimensions can't be enumerated cell by cell and aren't part of
/// any tested scenario.
///
/// A fragment with [FragmentMetadata::sparse_tiles] set is resolved by
/// decoding its written coordinates (via `vfs`/`tile_store`) rather than
/// by tile-domain containment; all its claims are precomputed once,
/// before the per-cell walk, so fragment priority is still honored
/// exactly as it is for tile-aligned fragments.
pub fn plan_dense(
    schema: &Schema,
    vfs: &dyn Vfs,
    tile_store: &TileStore,
    fragments: &[FragmentMetadata],
    rect: &[(CoordValue, CoordValue)],
    layout: CellOrder,
) -> Result<Vec<PlannedCell>> {
    if layout == CellOrder::Hilbert {
        return Err(Error::InvalidLayout(
            "hilbert is not a valid layout for dense reads".to_string(),
        ));
    }
    let k = schema.num_dimensions();

    let mut priority: Vec<usize> = (0..fragments.len()).collect();
    priority.sort_by(|&a, &b| fragment_priority_cmp(&fragments[b], &fragments[a]));

    // Tile-aligned fragments: tile-coordinate -> (tile_idx, MBR/tile-domain
    // overlap), built once. `None` for a `sparse_tiles` fragment, which is
    // resolved through `sparse_claims` instead.
    let tile_maps: Vec<Option<HashMap<Vec<i128>, (usize, OverlapKind)>>> = fragments
        .iter()
        .map(|f| {
            if f.sparse_tiles() {
                return None;
            }
            let mut m = HashMap::new();
            for (idx, mbr) in f.tile_mbrs().iter().enumerate() {
                let tile_coord: Vec<i128> =
                    (0..k).map(|d| schema.tile_coord_of(d, &mbr.lo[d])).collect();
                let tile_dom = schema.tile_subarray(&tile_coord);
                let mbr_range: Vec<(CoordValue, CoordValue)> =
                    mbr.lo.iter().cloned().zip(mbr.hi.iter().cloned()).collect();
                let overlap = classify_overlap(schema.cell_order(), &tile_dom, &mbr_range);
                m.insert(tile_coord, (idx, overlap));
            }
            Some(m)
        })
        .collect();

    // Sparse-tiled fragments: which one (if any) claims a given
    // coordinate, highest-priority fragment first so ties resolve the
    // same way the tile-aligned path's priority loop does.
    let mut sparse_claims: HashMap<Vec<i128>, (usize, usize, usize)> = HashMap::new();
    for &fi in &priority {
        let frag = &fragments[fi];
        if !frag.sparse_tiles() {
            continue;
        }
        for tile_idx in frag.rtree_query(rect) {
            let coords_in_tile = read_tile_coords(schema, vfs, tile_store, frag, tile_idx)?;
            for (pos, c) in coords_in_tile.into_iter().enumerate() {
                if coord_in_rect(&c, rect) {
                    sparse_claims.entry(coord_key(&c)?).or_insert((fi, tile_idx, pos));
                }
            }
        }
    }

    let coords = enumerate_rect(rect)?;
    let mut cells = Vec::with_capacity(coords.len());
    for c in coords {
        let tile_coord: Vec<i128> = (0..k).map(|d| schema.tile_coord_of(d, &c[d])).collect();
        let key = coord_key(&c)?;
        let mut source = CellSource::Fill;
        for &fi in &priority {
            let frag = &fragments[fi];
            if frag.sparse_tiles() {
                if let Some(&(claim_fi, tile_idx, pos)) = sparse_claims.get(&key) {
                    if claim_fi == fi {
                        source = CellSource::Fragment { fragment: fi, tile_idx, pos };
                        break;
                    }
                }
            } else if let Some(&(tile_idx, overlap)) =
                tile_maps[fi].as_ref().and_then(|m| m.get(&tile_coord))
            {
                let mbr = &frag.tile_mbrs()[tile_idx];
                let hit = match overlap {
                    OverlapKind::Full => true,
                    _ => coord_in_mbr(&c, &mbr.lo, &mbr.hi),
                };
                if hit {
                    let tile_dom = schema.tile_subarray(&tile_coord);
                    let pos = schema.get_cell_pos(&tile_dom, &c);
                    source = CellSource::Fragment { fragment: fi, tile_idx, pos };
                    break;
                }
            }
        }
        cells.push(PlannedCell { coords: c, source });
    }

    sort_by_layout(schema, &mut cells, layout);
    Ok(cells)
}

fn coord_in_mbr(c: &Coord, lo: &[CoordValue], hi: &[CoordValue]) -> bool {
    c.iter().zip(lo.iter()).zip(hi.iter()).all(|((v, l), h)| {
        v.cmp_total(l) != std::cmp::Ordering::Less && v.cmp_total(h) != std::cmp::Ordering::Greater
    })
}

fn coord_key(c: &Coord) -> Result<Vec<i128>> {
    c.iter()
        .map(|v| {
            v.as_i128().ok_or_else(|| {
                Error::FormatError("dense read requires an integral dimension".to_string())
            })
        })
        .collect()
}

fn enumerate_rect(rect: &[(CoordValue, CoordValue)]) -> Result<Vec<Coord>> {
    let mut axes: Vec<Vec<CoordValue>> = Vec::with_capacity(rect.len());
    for (lo, hi) in rect {
        let l = lo.as_i128().ok_or_else(|| {
            Error::FormatError("dense read requires an integral dimension".to_string())
        })?;
        let h = hi.as_i128().ok_or_else(|| {
            Error::FormatError("dense read requires an integral dimension".to_string())
        })?;
        let mut vals = Vec::with_capacity((h - l + 1).max(0) as usize);
        let mut v = l;
        while v <= h {
            vals.push(coord_from_i128(lo, v));
            v += 1;
        }
        axes.push(vals);
    }
    Ok(axes.into_iter().multi_cartesian_product().collect())
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

fn global_tile_coord(schema: &Schema, c: &Coord) -> Vec<i128> {
    (0..c.len()).map(|d| schema.tile_coord_of(d, &c[d])).collect()
}

fn sort_by_layout(schema: &Schema, cells: &mut [PlannedCell], layout: CellOrder) {
    match layout {
        CellOrder::ColumnMajor => {
            cells.sort_by(|a, b| coord_cmp_col_major(&a.coords, &b.coords))
        }
        CellOrder::Global => cells.sort_by(|a, b| {
            let ta = global_tile_coord(schema, &a.coords);
            let tb = global_tile_coord(schema, &b.coords);
            schema
                .tile_order_cmp(&ta, &tb)
                .then_with(|| schema.cell_order_cmp(&a.coords, &b.coords))
        }),
        _ => cells.sort_by(|a, b| coord_cmp_row_major(&a.coords, &b.coords)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::ArrayType;
    use tiledb_common::datatype::Datatype;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

    use crate::fragment::metadata::{FragmentMetadataData, TileLocation, TileMbr};
    use crate::vfs::MemoryVfs;

    fn schema_1d(extent: i32, lo: i32, hi: i32) -> Schema {
        Schema::new(SchemaData {
            array_type: ArrayType::Dense,
            domain: DomainData {
                dimension: vec![DimensionData {
                    name: "d".to_string(),
                    datatype: Datatype::Int32,
                    constraints: DimensionConstraints::Int32([lo, hi], Some(extent)),
                    filters: None,
                }],
            },
            attributes: vec![AttributeData {
                name: "a".to_string(),
                datatype: Datatype::Int32,
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    fn frag_1d(uri: &str, lo: i32, hi: i32, t0: u64, t1: u64) -> FragmentMetadata {
        let mut locations = StdHashMap::new();
        locations.insert(
            "a".to_string(),
            vec![TileLocation { offset: 0, size: ((hi - lo + 1) * 4) as u64 }],
        );
        FragmentMetadata::new(FragmentMetadataData {
            uri: uri.to_string(),
            non_empty_domain: vec![(CoordValue::Int32(lo), CoordValue::Int32(hi))],
            tile_mbrs: vec![TileMbr {
                lo: vec![CoordValue::Int32(lo)],
                hi: vec![CoordValue::Int32(hi)],
            }],
            tile_locations: locations,
            timestamp_range: (t0, t1),
            format_version: 1,
            sparse_tiles: false,
        })
    }

    /// A fragment written as explicit coordinates (an unordered write into
    /// a dense array): its tile MBR bounds `coords`, but only the listed
    /// coordinates are actually present, and `d.tdb` on `vfs` carries them.
    fn frag_1d_sparse(
        vfs: &MemoryVfs,
        uri: &str,
        coords: &[i32],
        t0: u64,
        t1: u64,
    ) -> FragmentMetadata {
        let mut bytes = vec![];
        for c in coords {
            bytes.extend_from_slice(&c.to_ne_bytes());
        }
        let data_uri = crate::vfs::join(uri, "d.tdb");
        vfs.write(&data_uri, &bytes).unwrap();
        let mut locations = StdHashMap::new();
        locations.insert("d".to_string(), vec![TileLocation { offset: 0, size: bytes.len() as u64 }]);
        let lo = *coords.iter().min().unwrap();
        let hi = *coords.iter().max().unwrap();
        FragmentMetadata::new(FragmentMetadataData {
            uri: uri.to_string(),
            non_empty_domain: vec![(CoordValue::Int32(lo), CoordValue::Int32(hi))],
            tile_mbrs: vec![TileMbr {
                lo: vec![CoordValue::Int32(lo)],
                hi: vec![CoordValue::Int32(hi)],
            }],
            tile_locations: locations,
            timestamp_range: (t0, t1),
            format_version: 1,
            sparse_tiles: true,
        })
    }

    #[test]
    fn fills_cells_no_fragment_covers() {
        let schema = schema_1d(10, 1, 10);
        let frags = vec![frag_1d("f1", 1, 5, 1, 1)];
        let vfs = MemoryVfs::new();
        let store = TileStore::new(8);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let plan = plan_dense(&schema, &vfs, &store, &frags, &rect, CellOrder::RowMajor).unwrap();
        assert_eq!(plan.len(), 10);
        assert!(matches!(plan[0].source, CellSource::Fragment { fragment: 0, .. }));
        assert!(matches!(plan[9].source, CellSource::Fill));
    }

    #[test]
    fn newer_fragment_wins_on_overlap() {
        let schema = schema_1d(10, 1, 10);
        let older = frag_1d("f1", 1, 10, 1, 1);
        let newer = frag_1d("f2", 1, 10, 2, 2);
        let frags = vec![older, newer];
        let vfs = MemoryVfs::new();
        let store = TileStore::new(8);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let plan = plan_dense(&schema, &vfs, &store, &frags, &rect, CellOrder::RowMajor).unwrap();
        for cell in &plan {
            assert!(matches!(cell.source, CellSource::Fragment { fragment: 1, .. }));
        }
    }

    #[test]
    fn row_major_2d_emission_order() {
        let schema = Schema::new(SchemaData {
            array_type: ArrayType::Dense,
            domain: DomainData {
                dimension: vec![
                    DimensionData {
                        name: "d1".to_string(),
                        datatype: Datatype::Int32,
                        constraints: DimensionConstraints::Int32([1, 2], Some(2)),
                        filters: None,
                    },
                    DimensionData {
                        name: "d2".to_string(),
                        datatype: Datatype::Int32,
                        constraints: DimensionConstraints::Int32([1, 2], Some(2)),
                        filters: None,
                    },
                ],
            },
            attributes: vec![AttributeData {
                name: "a".to_string(),
                datatype: Datatype::Int32,
                ..Default::default()
            }],
            ..Default::default()
        });
        let rect: Vec<(CoordValue, CoordValue)> = vec![
            (CoordValue::Int32(1), CoordValue::Int32(2)),
            (CoordValue::Int32(1), CoordValue::Int32(2)),
        ];
        let vfs = MemoryVfs::new();
        let store = TileStore::new(8);
        let plan = plan_dense(&schema, &vfs, &store, &[], &rect, CellOrder::RowMajor).unwrap();
        let coords: Vec<Coord> = plan.into_iter().map(|c| c.coords).collect();
        assert_eq!(
            coords,
            vec![
                vec![CoordValue::Int32(1), CoordValue::Int32(1)],
                vec![CoordValue::Int32(1), CoordValue::Int32(2)],
                vec![CoordValue::Int32(2), CoordValue::Int32(1)],
                vec![CoordValue::Int32(2), CoordValue::Int32(2)],
            ]
        );
    }

    #[test]
    fn hilbert_layout_is_rejected() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let store = TileStore::new(8);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let err = plan_dense(&schema, &vfs, &store, &[], &rect, CellOrder::Hilbert).unwrap_err();
        assert!(matches!(err, Error::InvalidLayout(_)));
    }

    #[test]
    fn classify_overlap_reports_full_and_partial() {
        let tile_domain: TileDomain =
            vec![(CoordValue::Int32(1), CoordValue::Int32(5)), (CoordValue::Int32(1), CoordValue::Int32(10))];
        let full = tile_domain.clone();
        assert_eq!(
            classify_overlap(CellOrder::RowMajor, &tile_domain, &full),
            OverlapKind::Full
        );
        let partial_contig = vec![
            (CoordValue::Int32(1), CoordValue::Int32(5)),
            (CoordValue::Int32(1), CoordValue::Int32(3)),
        ];
        assert_eq!(
            classify_overlap(CellOrder::RowMajor, &tile_domain, &partial_contig),
            OverlapKind::PartialContiguous
        );
        let partial_noncontig = vec![
            (CoordValue::Int32(1), CoordValue::Int32(3)),
            (CoordValue::Int32(1), CoordValue::Int32(3)),
        ];
        assert_eq!(
            classify_overlap(CellOrder::RowMajor, &tile_domain, &partial_noncontig),
            OverlapKind::PartialNonContiguous
        );
    }

    #[test]
    fn sparse_tiles_fragment_resolves_individual_coordinates() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let store = TileStore::new(8);
        let frag = frag_1d_sparse(&vfs, "unordered", &[3, 7], 1, 1);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let plan =
            plan_dense(&schema, &vfs, &store, &[frag], &rect, CellOrder::RowMajor).unwrap();
        assert!(matches!(plan[2].source, CellSource::Fragment { fragment: 0, .. }));
        assert!(matches!(plan[6].source, CellSource::Fragment { fragment: 0, .. }));
        assert!(matches!(plan[0].source, CellSource::Fill));
        assert!(matches!(plan[9].source, CellSource::Fill));
    }

    #[test]
    fn sparse_tiles_fragment_loses_to_a_newer_dense_tiled_fragment() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let store = TileStore::new(8);
        let older_sparse = frag_1d_sparse(&vfs, "unordered", &[3], 1, 1);
        let newer_dense = frag_1d("f2", 1, 10, 2, 2);
        let frags = vec![older_sparse, newer_dense];
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let plan = plan_dense(&schema, &vfs, &store, &frags, &rect, CellOrder::RowMajor).unwrap();
        assert!(matches!(plan[2].source, CellSource::Fragment { fragment: 1, .. }));
    }
}
