//! Sparse fragment writer: packs
//! caller-supplied coordinates and attribute values into tiles of
//! `capacity` cells each, sorted either by the schema's declared cell
//! order or, when the schema says `cell_order = hilbert`, by Hilbert
//! index.
//!
//! Unlike the dense tiler, a sparse tile never needs fill padding: every
//! tile holds exactly the cells assigned to it, nothing more.

use std::cmp::Ordering;
use std::collections::HashMap;

use tiledb_common::array::CellOrder;
use tiledb_pod::array::schema::SchemaData;

use crate::coord::{coord_value_from_bytes, coord_value_to_bytes, Coord, CoordValue};
use crate::error::{Error, Result};
use crate::fragment::directory::FragmentDirectory;
use crate::fragment::metadata::{FragmentMetadata, FragmentMetadataData, TileLocation, TileMbr};
use crate::hilbert::hilbert_key;
use crate::schema::Schema;
use crate::tile::store::encode_offsets;
use crate::vfs::Vfs;
use crate::write::AttributeBuffer;

fn component_data(field: &str) -> String {
    field.to_string()
}

fn component_var(field: &str) -> String {
    format!("{field}_var")
}

fn component_validity(field: &str) -> String {
    format!("{field}_validity")
}

/// Writes one sparse fragment from `dim_buffers` (one entry per dimension,
/// keyed by dimension name) and `attr_buffers` (one per attribute).
/// `write_layout` is the order the caller claims the cells were supplied
/// in; `Global` asserts the caller already produced the schema's packing
/// order (hilbert key, if the schema declares hilbert cell order,
/// otherwise `cell_order_cmp`) and the writer verifies rather than sorts.
/// Anything else is treated as unordered and always sorted.
pub fn write_sparse_fragment(
    schema: &Schema,
    vfs: &dyn Vfs,
    array_uri: &str,
    dim_buffers: &HashMap<String, AttributeBuffer>,
    attr_buffers: &HashMap<String, AttributeBuffer>,
    write_layout: CellOrder,
    timestamp: (u64, u64),
) -> Result<FragmentMetadataData> {
    let num_cells = num_written_cells(schema, dim_buffers)?;
    let coords = decode_coords(schema, dim_buffers, num_cells)?;
    let order = sort_order(schema, &coords, write_layout)?;
    let capacity = tile_capacity(schema);

    let mut component_bytes: HashMap<String, Vec<u8>> = HashMap::new();
    let mut tile_locations: HashMap<String, Vec<TileLocation>> = HashMap::new();
    let mut tile_mbrs = Vec::new();

    for tile_positions in order.chunks(capacity) {
        tile_mbrs.push(tile_mbr(&coords, tile_positions));

        for name in schema.dimension_names() {
            write_field_tile(
                schema,
                &name,
                dim_buffers.get(&name).ok_or_else(|| Error::UnknownName(name.clone()))?,
                tile_positions,
                &mut component_bytes,
                &mut tile_locations,
            )?;
        }
        for name in schema.attribute_names() {
            write_field_tile(
                schema,
                &name,
                attr_buffers.get(&name).ok_or_else(|| Error::UnknownName(name.clone()))?,
                tile_positions,
                &mut component_bytes,
                &mut tile_locations,
            )?;
        }
    }

    let dir = FragmentDirectory::new(vfs, array_uri);
    let fragment_uri = dir.new_fragment_uri(timestamp.0, timestamp.1, 1);

    for (component, bytes) in &component_bytes {
        let uri = crate::vfs::join(&fragment_uri, &format!("{component}.tdb"));
        vfs.write(&uri, bytes)?;
    }

    let data = FragmentMetadataData {
        uri: fragment_uri.clone(),
        non_empty_domain: non_empty_domain(schema, &coords),
        tile_mbrs,
        tile_locations,
        timestamp_range: timestamp,
        format_version: 1,
        // Written as explicit coordinates rather than dense tile-aligned
        // cells -- true even for a dense array's unordered write path, the
        // case `read::dense::plan_dense` resolves by decoding coordinates.
        sparse_tiles: true,
    };
    FragmentMetadata::new(data.clone()).persist(vfs)?;
    vfs.write(&crate::vfs::join(&fragment_uri, "__commit"), b"")?;
    Ok(data)
}

fn tile_capacity(schema: &Schema) -> usize {
    schema.data.capacity.unwrap_or(SchemaData::DEFAULT_SPARSE_TILE_CAPACITY) as usize
}

fn num_written_cells(schema: &Schema, dim_buffers: &HashMap<String, AttributeBuffer>) -> Result<usize> {
    let first = schema.dimension_name(0).to_string();
    let buf = dim_buffers.get(&first).ok_or_else(|| Error::UnknownName(first.clone()))?;
    Ok(if buf.is_var() {
        buf.offsets.as_ref().map(|o| o.len()).unwrap_or(0)
    } else {
        let size = schema
            .cell_size(first.as_str())?
            .expect("dimension cell size");
        buf.data.len() / size
    })
}

fn decode_coords(
    schema: &Schema,
    dim_buffers: &HashMap<String, AttributeBuffer>,
    num_cells: usize,
) -> Result<Vec<Coord>> {
    let k = schema.num_dimensions();
    let mut per_dim: Vec<Vec<CoordValue>> = Vec::with_capacity(k);
    for d in 0..k {
        let name = schema.dimension_name(d).to_string();
        let dt = schema.datatype(name.as_str())?;
        let buf = dim_buffers.get(&name).ok_or_else(|| Error::UnknownName(name.clone()))?;
        let mut values = Vec::with_capacity(num_cells);
        if buf.is_var() {
            for i in 0..num_cells {
                values.push(CoordValue::Bytes(buf.var_cell_bytes(i).to_vec()));
            }
        } else {
            let size = schema.cell_size(name.as_str())?.expect("dimension cell size");
            for i in 0..num_cells {
                values.push(coord_value_from_bytes(dt, &buf.data[i * size..(i + 1) * size]));
            }
        }
        per_dim.push(values);
    }
    Ok((0..num_cells).map(|i| per_dim.iter().map(|v| v[i].clone()).collect()).collect())
}

/// Orders cell positions `0..coords.len()` by the schema's packing order.
/// `Global` asserts the caller already produced that order and fails with
/// [Error::InvalidLayout] if it didn't; anything else sorts unconditionally.
fn sort_order(schema: &Schema, coords: &[Coord], write_layout: CellOrder) -> Result<Vec<usize>> {
    let mut idx: Vec<usize> = (0..coords.len()).collect();
    if schema.cell_order() == CellOrder::Hilbert {
        let domains: Vec<Option<(f64, f64)>> = (0..schema.num_dimensions())
            .map(|d| schema.dim_domain_pub(d).map(|(lo, hi)| (lo.as_f64(), hi.as_f64())))
            .collect();
        let keys: Vec<u128> = coords.iter().map(|c| hilbert_key(c, &domains)).collect();
        if write_layout == CellOrder::Global {
            if !is_sorted_by(&idx, |&a, &b| keys[a].cmp(&keys[b])) {
                return Err(Error::InvalidLayout(
                    "global-order write on a hilbert array requires coordinates pre-sorted by hilbert key".to_string(),
                ));
            }
        } else {
            idx.sort_by_key(|&i| keys[i]);
        }
    } else if write_layout == CellOrder::Global {
        if !is_sorted_by(&idx, |&a, &b| schema.cell_order_cmp(&coords[a], &coords[b])) {
            return Err(Error::InvalidLayout(
                "global-order write requires coordinates pre-sorted by the schema's cell order".to_string(),
            ));
        }
    } else {
        idx.sort_by(|&a, &b| schema.cell_order_cmp(&coords[a], &coords[b]));
    }
    Ok(idx)
}

fn is_sorted_by<T>(items: &[T], cmp: impl Fn(&T, &T) -> Ordering) -> bool {
    items.windows(2).all(|w| cmp(&w[0], &w[1]) != Ordering::Greater)
}

fn tile_mbr(coords: &[Coord], positions: &[usize]) -> TileMbr {
    let k = coords[positions[0]].len();
    let mut lo = coords[positions[0]].clone();
    let mut hi = coords[positions[0]].clone();
    for &p in &positions[1..] {
        for d in 0..k {
            if coords[p][d].cmp_total(&lo[d]) == Ordering::Less {
                lo[d] = coords[p][d].clone();
            }
            if coords[p][d].cmp_total(&hi[d]) == Ordering::Greater {
                hi[d] = coords[p][d].clone();
            }
        }
    }
    TileMbr { lo, hi }
}

fn non_empty_domain(schema: &Schema, coords: &[Coord]) -> Vec<(CoordValue, CoordValue)> {
    let k = schema.num_dimensions();
    (0..k)
        .map(|d| {
            let mut lo = coords[0][d].clone();
            let mut hi = coords[0][d].clone();
            for c in &coords[1..] {
                if c[d].cmp_total(&lo) == Ordering::Less {
                    lo = c[d].clone();
                }
                if c[d].cmp_total(&hi) == Ordering::Greater {
                    hi = c[d].clone();
                }
            }
            (lo, hi)
        })
        .collect()
}

fn write_field_tile(
    schema: &Schema,
    field: &str,
    buf: &AttributeBuffer,
    positions: &[usize],
    component_bytes: &mut HashMap<String, Vec<u8>>,
    tile_locations: &mut HashMap<String, Vec<TileLocation>>,
) -> Result<()> {
    let nullable = schema.field(field)?.nullability().unwrap_or(false);

    if schema.var_size(field)? {
        let (data, offsets) = gather_var(buf, positions);
        append_component(component_bytes, tile_locations, &component_data(field), &encode_offsets(&offsets));
        append_component(component_bytes, tile_locations, &component_var(field), &data);
    } else {
        let cell_size = schema.cell_size(field)?.expect("non-var field has a cell size");
        let data = gather_fixed(buf, cell_size, positions);
        append_component(component_bytes, tile_locations, &component_data(field), &data);
    }

    if nullable {
        let data = gather_validity(buf, positions)?;
        append_component(component_bytes, tile_locations, &component_validity(field), &data);
    }
    Ok(())
}

fn gather_fixed(buf: &AttributeBuffer, cell_size: usize, positions: &[usize]) -> Vec<u8> {
    let mut data = Vec::with_capacity(positions.len() * cell_size);
    for &p in positions {
        data.extend_from_slice(&buf.data[p * cell_size..(p + 1) * cell_size]);
    }
    data
}

fn gather_var(buf: &AttributeBuffer, positions: &[usize]) -> (Vec<u8>, Vec<u64>) {
    let mut data = Vec::new();
    let mut offsets = Vec::with_capacity(positions.len());
    for &p in positions {
        offsets.push(data.len() as u64);
        data.extend_from_slice(buf.var_cell_bytes(p));
    }
    (data, offsets)
}

fn gather_validity(buf: &AttributeBuffer, positions: &[usize]) -> Result<Vec<u8>> {
    let validity = buf.validity.as_ref().ok_or_else(|| {
        Error::FormatError("nullable attribute write is missing its validity buffer".to_string())
    })?;
    Ok(positions.iter().map(|&p| validity[p]).collect())
}

fn append_component(
    bytes: &mut HashMap<String, Vec<u8>>,
    locations: &mut HashMap<String, Vec<TileLocation>>,
    component: &str,
    tile_bytes: &[u8],
) {
    let buf = bytes.entry(component.to_string()).or_default();
    let offset = buf.len() as u64;
    buf.extend_from_slice(tile_bytes);
    locations
        .entry(component.to_string())
        .or_default()
        .push(TileLocation { offset, size: tile_bytes.len() as u64 });
}

/// Encodes one coordinate tuple's dimensions into a `dim_buffers` map
/// suitable for [write_sparse_fragment], the inverse of the read path's
/// coordinate recovery. Exposed for tests and callers building a write
/// from a plain `Vec<Coord>` rather than pre-split physical buffers.
pub fn coords_to_dim_buffers(schema: &Schema, coords: &[Coord]) -> HashMap<String, AttributeBuffer> {
    let mut out = HashMap::new();
    for d in 0..schema.num_dimensions() {
        let name = schema.dimension_name(d).to_string();
        if coords[0][d].is_string() {
            let mut data = Vec::new();
            let mut offsets = Vec::with_capacity(coords.len());
            for c in coords {
                offsets.push(data.len() as u64);
                data.extend_from_slice(&coord_value_to_bytes(&c[d]));
            }
            out.insert(name, AttributeBuffer::var(data, offsets));
        } else {
            let mut data = Vec::new();
            for c in coords {
                data.extend_from_slice(&coord_value_to_bytes(&c[d]));
            }
            out.insert(name, AttributeBuffer::fixed(data));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::ArrayType;
    use tiledb_common::datatype::Datatype;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::DimensionData;

    use crate::vfs::MemoryVfs;

    fn schema_2d(cell_order: CellOrder, capacity: Option<u64>) -> Schema {
        Schema::new(SchemaData {
            array_type: ArrayType::Sparse,
            domain: DomainData {
                dimension: vec![
                    DimensionData {
                        name: "x".to_string(),
                        datatype: Datatype::Int32,
                        constraints: DimensionConstraints::Int32([0, 7], None),
                        filters: None,
                    },
                    DimensionData {
                        name: "y".to_string(),
                        datatype: Datatype::Int32,
                        constraints: DimensionConstraints::Int32([0, 7], None),
                        filters: None,
                    },
                ],
            },
            cell_order: Some(cell_order),
            capacity,
            attributes: vec![AttributeData {
                name: "a".to_string(),
                datatype: Datatype::Int32,
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    fn attr_buffer(values: &[i32]) -> AttributeBuffer {
        let mut data = Vec::new();
        for v in values {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        AttributeBuffer::fixed(data)
    }

    #[test]
    fn unordered_write_is_sorted_and_readable() {
        let schema = schema_2d(CellOrder::RowMajor, Some(2));
        let vfs = MemoryVfs::new();
        let coords: Vec<Coord> = vec![
            vec![CoordValue::Int32(3), CoordValue::Int32(1)],
            vec![CoordValue::Int32(1), CoordValue::Int32(2)],
            vec![CoordValue::Int32(2), CoordValue::Int32(0)],
        ];
        let dims = coords_to_dim_buffers(&schema, &coords);
        let mut attrs = HashMap::new();
        attrs.insert("a".to_string(), attr_buffer(&[30, 10, 20]));

        let meta = write_sparse_fragment(
            &schema,
            &vfs,
            "arr",
            &dims,
            &attrs,
            CellOrder::Unordered,
            (1, 1),
        )
        .unwrap();
        // capacity 2 over 3 cells makes two tiles
        assert_eq!(meta.tile_mbrs.len(), 2);
        assert_eq!(
            meta.non_empty_domain,
            vec![
                (CoordValue::Int32(1), CoordValue::Int32(3)),
                (CoordValue::Int32(0), CoordValue::Int32(2)),
            ]
        );
    }

    #[test]
    fn hilbert_schema_sorts_by_hilbert_key_when_unordered() {
        let schema = schema_2d(CellOrder::Hilbert, None);
        let vfs = MemoryVfs::new();
        let coords: Vec<Coord> = vec![
            vec![CoordValue::Int32(7), CoordValue::Int32(7)],
            vec![CoordValue::Int32(0), CoordValue::Int32(0)],
            vec![CoordValue::Int32(0), CoordValue::Int32(1)],
        ];
        let dims = coords_to_dim_buffers(&schema, &coords);
        let mut attrs = HashMap::new();
        attrs.insert("a".to_string(), attr_buffer(&[1, 2, 3]));

        let meta = write_sparse_fragment(
            &schema,
            &vfs,
            "arr",
            &dims,
            &attrs,
            CellOrder::Unordered,
            (1, 1),
        )
        .unwrap();
        assert_eq!(meta.tile_mbrs.len(), 1);
    }

    #[test]
    fn global_order_write_rejects_unsorted_hilbert_coords() {
        let schema = schema_2d(CellOrder::Hilbert, None);
        let vfs = MemoryVfs::new();
        let coords: Vec<Coord> = vec![
            vec![CoordValue::Int32(7), CoordValue::Int32(7)],
            vec![CoordValue::Int32(0), CoordValue::Int32(0)],
        ];
        let dims = coords_to_dim_buffers(&schema, &coords);
        let mut attrs = HashMap::new();
        attrs.insert("a".to_string(), attr_buffer(&[1, 2]));

        let err = write_sparse_fragment(&schema, &vfs, "arr", &dims, &attrs, CellOrder::Global, (1, 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLayout(_)));
    }
}
