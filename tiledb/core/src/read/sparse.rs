//! Sparse read planning: prune fragments to candidate
//! tiles with the R-tree, read each candidate tile's dimension data to
//! recover the actual written coordinates, then merge across fragments
//! honoring the duplicate policy.

use tiledb_common::array::CellOrder;
use tiledb_common::datatype::Datatype;

use crate::coord::{
    coord_cmp_col_major, coord_cmp_row_major, coord_value_from_bytes, Coord, CoordValue,
};
use crate::error::{Error, Result};
use crate::fragment::metadata::{fragment_priority_cmp, FragmentMetadata};
use crate::read::{CellSource, PlannedCell};
use crate::schema::Schema;
use crate::tile::{Tile, TileStore};
use crate::vfs::Vfs;

/// Builds the ordered sparse read plan for one partition rectangle.
/// Hilbert is rejected as a *read* layout: it only orders cells for
/// tiling on write, a read never re-derives it.
pub fn plan_sparse(
    schema: &Schema,
    vfs: &dyn Vfs,
    tile_store: &TileStore,
    fragments: &[FragmentMetadata],
    rect: &[(CoordValue, CoordValue)],
    layout: CellOrder,
) -> Result<Vec<PlannedCell>> {
    if layout == CellOrder::Hilbert {
        return Err(Error::InvalidLayout(
            "hilbert is not a valid layout for reads".to_string(),
        ));
    }

    let mut priority: Vec<usize> = (0..fragments.len()).collect();
    priority.sort_by(|&a, &b| fragment_priority_cmp(&fragments[b], &fragments[a]));

    // (coord, fragment, tile_idx, pos, seq), newest fragment's hits pushed
    // first; `seq` is push order, i.e. the physical order cells were
    // written in (hilbert-sorted, if the schema says so) -- see
    // `sort_by_layout`'s `Global` case.
    let mut merged: Vec<(Coord, usize, usize, usize, usize)> = vec![];
    let mut seq = 0usize;
    for &fi in &priority {
        let frag = &fragments[fi];
        for tile_idx in frag.rtree_query(rect) {
            let coords_in_tile = read_tile_coords(schema, vfs, tile_store, frag, tile_idx)?;
            for (pos, c) in coords_in_tile.into_iter().enumerate() {
                if coord_in_rect(&c, rect) {
                    merged.push((c, fi, tile_idx, pos, seq));
                    seq += 1;
                }
            }
        }
    }

    let entries = if schema.allows_dups() {
        merged
    } else {
        dedup_newest_wins(merged)
    };

    let mut planned: Vec<(PlannedCell, usize)> = entries
        .into_iter()
        .map(|(coords, fragment, tile_idx, pos, seq)| {
            (PlannedCell { coords, source: CellSource::Fragment { fragment, tile_idx, pos } }, seq)
        })
        .collect();
    sort_by_layout(&mut planned, layout);
    Ok(planned.into_iter().map(|(cell, _)| cell).collect())
}

/// Collapses duplicate coordinates, keeping the entry that arrived first
/// in `entries` for a given coordinate (callers push newest-fragment
/// first, so that's the one that survives). Sorting by coordinate is
/// stable, so ties preserve push order; each survivor keeps its original
/// `seq`.
fn dedup_newest_wins(
    mut entries: Vec<(Coord, usize, usize, usize, usize)>,
) -> Vec<(Coord, usize, usize, usize, usize)> {
    entries.sort_by(|a, b| coord_cmp_row_major(&a.0, &b.0));
    entries.dedup_by(|a, b| a.0 == b.0);
    entries
}

/// `Global` order is the array's physical storage order -- the order
/// cells were packed into tiles at write time, which is hilbert-sorted
/// for a `cell_order = hilbert` schema and `cell_order_cmp`-sorted
/// otherwise (hilbert itself is rejected as a read layout, but reading in
/// global order on a hilbert array legitimately surfaces hilbert order).
/// Any other requested
/// layout re-derives the order from the coordinates directly.
fn sort_by_layout(cells: &mut [(PlannedCell, usize)], layout: CellOrder) {
    match layout {
        CellOrder::ColumnMajor => {
            cells.sort_by(|a, b| coord_cmp_col_major(&a.0.coords, &b.0.coords))
        }
        CellOrder::Global => cells.sort_by_key(|(_, seq)| *seq),
        _ => cells.sort_by(|a, b| coord_cmp_row_major(&a.0.coords, &b.0.coords)),
    }
}

pub(crate) fn coord_in_rect(c: &Coord, rect: &[(CoordValue, CoordValue)]) -> bool {
    c.iter().zip(rect.iter()).all(|(v, (lo, hi))| {
        v.cmp_total(lo) != std::cmp::Ordering::Less && v.cmp_total(hi) != std::cmp::Ordering::Greater
    })
}

pub(crate) fn read_tile_coords(
    schema: &Schema,
    vfs: &dyn Vfs,
    tile_store: &TileStore,
    frag: &FragmentMetadata,
    tile_idx: usize,
) -> Result<Vec<Coord>> {
    let k = schema.num_dimensions();
    let mut per_dim: Vec<Vec<CoordValue>> = Vec::with_capacity(k);
    for d in 0..k {
        let name = schema.dimension_name(d).to_string();
        let dt = schema.datatype(&name[..])?;
        let tile = tile_store.fetch(vfs, schema, frag, tile_idx, &name)?;
        per_dim.push(decode_dim_values(dt, &tile)?);
    }
    let n = per_dim.first().map(|v| v.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        out.push(per_dim.iter().map(|v| v[i].clone()).collect());
    }
    Ok(out)
}

fn decode_dim_values(dt: Datatype, tile: &Tile) -> Result<Vec<CoordValue>> {
    if tile.is_var() {
        Ok(decode_var_bytes(tile)
            .into_iter()
            .map(CoordValue::Bytes)
            .collect())
    } else {
        decode_fixed_values(dt, &tile.data)
    }
}

fn decode_var_bytes(tile: &Tile) -> Vec<Vec<u8>> {
    let offsets = tile.offsets.as_deref().unwrap_or(&[]);
    let mut out = Vec::with_capacity(offsets.len());
    for i in 0..offsets.len() {
        let start = offsets[i] as usize;
        let end = if i + 1 < offsets.len() {
            offsets[i + 1] as usize
        } else {
            tile.data.len()
        };
        out.push(tile.data[start..end].to_vec());
    }
    out
}

fn decode_fixed_values(dt: Datatype, bytes: &[u8]) -> Result<Vec<CoordValue>> {
    let size = dt.size();
    if bytes.len() % size != 0 {
        return Err(Error::FormatError(format!(
            "tile data length {} is not a multiple of element size {size}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(size)
        .map(|chunk| coord_value_from_bytes(dt, chunk))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::ArrayType;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

    use crate::fragment::metadata::{FragmentMetadataData, TileLocation, TileMbr};
    use crate::vfs::MemoryVfs;

    fn schema_1d() -> Schema {
        Schema::new(SchemaData {
            array_type: ArrayType::Sparse,
            domain: DomainData {
                dimension: vec![DimensionData {
                    name: "d".to_string(),
                    datatype: Datatype::Int32,
                    constraints: DimensionConstraints::Int32([1, 100], None),
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

    fn write_coord_tile(vfs: &MemoryVfs, frag_uri: &str, coords: &[i32]) -> FragmentMetadata {
        let mut bytes = vec![];
        for c in coords {
            bytes.extend_from_slice(&c.to_ne_bytes());
        }
        let uri = crate::vfs::join(frag_uri, "d.tdb");
        vfs.write(&uri, &bytes).unwrap();
        let mut locations = HashMap::new();
        locations.insert("d".to_string(), vec![TileLocation { offset: 0, size: bytes.len() as u64 }]);
        FragmentMetadata::new(FragmentMetadataData {
            uri: frag_uri.to_string(),
            non_empty_domain: vec![(
                CoordValue::Int32(*coords.iter().min().unwrap()),
                CoordValue::Int32(*coords.iter().max().unwrap()),
            )],
            tile_mbrs: vec![TileMbr {
                lo: vec![CoordValue::Int32(*coords.iter().min().unwrap())],
                hi: vec![CoordValue::Int32(*coords.iter().max().unwrap())],
            }],
            tile_locations: locations,
            timestamp_range: (1, 1),
            format_version: 1,
            sparse_tiles: true,
        })
    }

    #[test]
    fn plans_every_written_coordinate() {
        let vfs = MemoryVfs::new();
        let schema = schema_1d();
        let frag = write_coord_tile(&vfs, "frag", &[3, 1, 7]);
        let store = TileStore::new(8);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(100))];
        let plan =
            plan_sparse(&schema, &vfs, &store, &[frag], &rect, CellOrder::RowMajor).unwrap();
        let coords: Vec<i32> = plan
            .iter()
            .map(|c| match c.coords[0] {
                CoordValue::Int32(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(coords, vec![1, 3, 7]);
    }

    #[test]
    fn dedups_when_duplicates_not_allowed() {
        let vfs = MemoryVfs::new();
        let schema = schema_1d();
        let older = write_coord_tile(&vfs, "f1", &[5]);
        let newer = {
            let mut bytes = vec![];
            bytes.extend_from_slice(&5i32.to_ne_bytes());
            vfs.write("f2/d.tdb", &bytes).unwrap();
            let mut locations = HashMap::new();
            locations.insert("d".to_string(), vec![TileLocation { offset: 0, size: 4 }]);
            FragmentMetadata::new(FragmentMetadataData {
                uri: "f2".to_string(),
                non_empty_domain: vec![(CoordValue::Int32(5), CoordValue::Int32(5))],
                tile_mbrs: vec![TileMbr {
                    lo: vec![CoordValue::Int32(5)],
                    hi: vec![CoordValue::Int32(5)],
                }],
                tile_locations: locations,
                timestamp_range: (2, 2),
                format_version: 1,
                sparse_tiles: true,
            })
        };
        let store = TileStore::new(8);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let plan = plan_sparse(
            &schema,
            &vfs,
            &store,
            &[older, newer],
            &rect,
            CellOrder::RowMajor,
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(matches!(plan[0].source, CellSource::Fragment { fragment: 1, .. }));
    }

    #[test]
    fn hilbert_is_rejected_as_read_layout() {
        let vfs = MemoryVfs::new();
        let schema = schema_1d();
        let store = TileStore::new(8);
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let err =
            plan_sparse(&schema, &vfs, &store, &[], &rect, CellOrder::Hilbert).unwrap_err();
        assert!(matches!(err, Error::InvalidLayout(_)));
    }
}
