//! Dense fragment writer: walks the tile domain a write
//! rectangle overlaps, builds one tile per overlapping tile coordinate
//! from the caller's attribute buffers via [plan_copy_runs], and pads any
//! position the rectangle doesn't cover with the attribute's fill value.

use std::collections::HashMap;

use itertools::Itertools;

use crate::coord::CoordValue;
use crate::error::{Error, Result};
use crate::fragment::directory::FragmentDirectory;
use crate::fragment::metadata::{FragmentMetadata, FragmentMetadataData, TileLocation, TileMbr};
use crate::schema::Schema;
use crate::tile::store::encode_offsets;
use crate::vfs::Vfs;
use crate::write::{plan_copy_runs, AttributeBuffer};

fn component_data(field: &str) -> String {
    field.to_string()
}

fn component_var(field: &str) -> String {
    format!("{field}_var")
}

fn component_validity(field: &str) -> String {
    format!("{field}_validity")
}

/// Writes one dense fragment covering `rect`, with `buffers` supplying one
/// [AttributeBuffer] per attribute named in `schema`, laid out in the
/// schema's declared cell order. Returns the persisted fragment's metadata.
pub fn write_dense_fragment(
    schema: &Schema,
    vfs: &dyn Vfs,
    array_uri: &str,
    rect: &[(CoordValue, CoordValue)],
    buffers: &HashMap<String, AttributeBuffer>,
    timestamp: (u64, u64),
) -> Result<FragmentMetadataData> {
    validate_write_rect(schema, rect)?;
    let tile_coords = enumerate_tile_coords(schema, rect)?;

    let mut component_bytes: HashMap<String, Vec<u8>> = HashMap::new();
    let mut tile_locations: HashMap<String, Vec<TileLocation>> = HashMap::new();
    let mut tile_mbrs = Vec::with_capacity(tile_coords.len());

    for tile_coord in &tile_coords {
        let tile_domain = schema.tile_subarray(tile_coord);
        tile_mbrs.push(TileMbr {
            lo: tile_domain.iter().map(|(lo, _)| lo.clone()).collect(),
            hi: tile_domain.iter().map(|(_, hi)| hi.clone()).collect(),
        });
        let num_cells = tile_num_cells(&tile_domain);
        let runs = plan_copy_runs(schema, &tile_domain, rect);

        for field in schema.attribute_names() {
            let buf = buffers
                .get(&field)
                .ok_or_else(|| Error::UnknownName(field.clone()))?;
            let nullable = schema.field(field.as_str())?.nullability().unwrap_or(false);

            if schema.var_size(field.as_str())? {
                let fill = schema.fill_bytes(field.as_str())?;
                let (data, offsets) = build_var_tile(buf, &runs, num_cells, &fill);
                append_component(
                    &mut component_bytes,
                    &mut tile_locations,
                    &component_data(&field),
                    &encode_offsets(&offsets),
                );
                append_component(
                    &mut component_bytes,
                    &mut tile_locations,
                    &component_var(&field),
                    &data,
                );
            } else {
                let cell_size = schema.cell_size(field.as_str())?.expect("non-var field has a cell size");
                let fill = schema.fill_bytes(field.as_str())?;
                let data = build_fixed_tile(buf, &runs, num_cells, cell_size, &fill);
                append_component(
                    &mut component_bytes,
                    &mut tile_locations,
                    &component_data(&field),
                    &data,
                );
            }

            if nullable {
                let fill_validity = schema.fill_validity(field.as_str())?;
                let data = build_validity_tile(buf, &runs, num_cells, fill_validity)?;
                append_component(
                    &mut component_bytes,
                    &mut tile_locations,
                    &component_validity(&field),
                    &data,
                );
            }
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
        non_empty_domain: rect.to_vec(),
        tile_mbrs,
        tile_locations,
        timestamp_range: timestamp,
        format_version: 1,
        sparse_tiles: false,
    };
    FragmentMetadata::new(data.clone()).persist(vfs)?;
    vfs.write(&crate::vfs::join(&fragment_uri, "__commit"), b"")?;
    Ok(data)
}

fn validate_write_rect(schema: &Schema, rect: &[(CoordValue, CoordValue)]) -> Result<()> {
    if rect.len() != schema.num_dimensions() {
        return Err(Error::FormatError(format!(
            "write rect has {} dimensions, schema has {}",
            rect.len(),
            schema.num_dimensions()
        )));
    }
    for (i, (lo, hi)) in rect.iter().enumerate() {
        let name = schema.dimension_name(i).to_string();
        let (dlo, dhi) = schema.dim_domain_pub(i).ok_or_else(|| Error::BoundsError {
            dimension: name.clone(),
            coord: format!("{:?}", lo),
        })?;
        if lo.cmp_total(&dlo) == std::cmp::Ordering::Less
            || hi.cmp_total(&dhi) == std::cmp::Ordering::Greater
        {
            return Err(Error::BoundsError {
                dimension: name,
                coord: format!("[{:?}, {:?}]", lo, hi),
            });
        }
    }
    Ok(())
}

fn enumerate_tile_coords(
    schema: &Schema,
    rect: &[(CoordValue, CoordValue)],
) -> Result<Vec<Vec<i128>>> {
    let tile_range = schema.tile_domain_of(rect).ok_or_else(|| Error::BoundsError {
        dimension: "<rect>".to_string(),
        coord: "write rectangle does not intersect the domain".to_string(),
    })?;
    let axes: Vec<Vec<i128>> =
        tile_range.iter().map(|&(lo, hi)| (lo..=hi).collect()).collect();
    Ok(axes.into_iter().multi_cartesian_product().collect())
}

fn tile_num_cells(tile_domain: &[(CoordValue, CoordValue)]) -> usize {
    tile_domain
        .iter()
        .map(|(lo, hi)| (hi.as_f64() - lo.as_f64()).round() as usize + 1)
        .product()
}

fn build_fixed_tile(
    buf: &AttributeBuffer,
    runs: &[crate::write::CopyRun],
    num_cells: usize,
    cell_size: usize,
    fill: &[u8],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(num_cells * cell_size);
    for _ in 0..num_cells {
        data.extend_from_slice(fill);
    }
    for run in runs {
        let src = &buf.data[run.buf_pos * cell_size..(run.buf_pos + run.len) * cell_size];
        let dst_start = run.tile_pos * cell_size;
        data[dst_start..dst_start + src.len()].copy_from_slice(src);
    }
    data
}

fn build_var_tile(
    buf: &AttributeBuffer,
    runs: &[crate::write::CopyRun],
    num_cells: usize,
    fill: &[u8],
) -> (Vec<u8>, Vec<u64>) {
    let mut covered: HashMap<usize, usize> = HashMap::new();
    for run in runs {
        for i in 0..run.len {
            covered.insert(run.tile_pos + i, run.buf_pos + i);
        }
    }
    let mut data = Vec::new();
    let mut offsets = Vec::with_capacity(num_cells);
    for pos in 0..num_cells {
        offsets.push(data.len() as u64);
        match covered.get(&pos) {
            Some(&buf_idx) => data.extend_from_slice(buf.var_cell_bytes(buf_idx)),
            None => data.extend_from_slice(fill),
        }
    }
    (data, offsets)
}

fn build_validity_tile(
    buf: &AttributeBuffer,
    runs: &[crate::write::CopyRun],
    num_cells: usize,
    fill_validity: u8,
) -> Result<Vec<u8>> {
    let validity = buf.validity.as_ref().ok_or_else(|| {
        Error::FormatError("nullable attribute write is missing its validity buffer".to_string())
    })?;
    let mut data = vec![fill_validity; num_cells];
    for run in runs {
        let src = &validity[run.buf_pos..run.buf_pos + run.len];
        let dst_start = run.tile_pos;
        data[dst_start..dst_start + src.len()].copy_from_slice(src);
    }
    Ok(data)
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

#[cfg(test)]
mod tests {
    use super::*;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::ArrayType;
    use tiledb_common::datatype::Datatype;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

    use crate::fragment::directory::FragmentDirectory;
    use crate::tile::TileStore;
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

    #[test]
    fn partial_write_then_read_recovers_values_and_fill() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();

        let mut buffers = HashMap::new();
        let mut data = Vec::new();
        for v in 1..=5i32 {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        buffers.insert("a".to_string(), AttributeBuffer::fixed(data));

        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(5))];
        let meta = write_dense_fragment(&schema, &vfs, "arr", &rect, &buffers, (1, 1)).unwrap();
        assert_eq!(meta.tile_mbrs.len(), 1);

        let dir = FragmentDirectory::new(&vfs, "arr");
        let frags = dir.list().unwrap();
        assert_eq!(frags.len(), 1);

        let full_rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let store = TileStore::new(8);
        let plan = crate::read::dense::plan_dense(
            &schema,
            &vfs,
            &store,
            &frags,
            &full_rect,
            tiledb_common::array::CellOrder::RowMajor,
        )
        .unwrap();
        let mut coordinator =
            crate::query::coordinator::Coordinator::new(&schema, &vfs, &store, &frags, plan);
        coordinator.set_buffer("a", crate::query::coordinator::BufferSlot::fixed(40));
        let status = coordinator.submit().unwrap();
        assert_eq!(status, crate::query::coordinator::Status::Complete);

        let out = coordinator.buffer("a").unwrap();
        let values: Vec<i32> = out
            .data
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(&values[0..5], &[1, 2, 3, 4, 5]);
        assert_eq!(values[5], i32::MIN, "uncovered cell must read back as the schema fill value");
    }

    #[test]
    fn out_of_domain_rect_is_bounds_error() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let buffers = HashMap::new();
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(20))];
        let err = write_dense_fragment(&schema, &vfs, "arr", &rect, &buffers, (1, 1)).unwrap_err();
        assert!(matches!(err, Error::BoundsError { .. }));
    }
}
