//! Result coordinator: drains a read plan into caller
//! buffers cell by cell, stopping the instant any attribute's buffer
//! can't hold the next cell and reporting INCOMPLETE, or reporting
//! COMPLETE once every cell in the plan has been copied out.
//!
//! Buffers here are owned `Vec<u8>` with a fixed `capacity` standing in
//! for the caller's externally allocated memory -- there's no FFI
//! boundary in this crate, so "the caller's buffer" is just a capacity
//! this type refuses to grow past.

use std::collections::HashMap;

use tiledb_common::array::CellValNum;
use tiledb_common::datatype::Datatype;

use crate::error::{Error, Result};
use crate::fragment::metadata::FragmentMetadata;
use crate::read::{CellSource, PlannedCell};
use crate::schema::Schema;
use crate::tile::TileStore;
use crate::vfs::Vfs;

/// One attribute/dimension's output buffer, sized to the capacity the
/// caller allocated.
#[derive(Clone, Debug, Default)]
pub struct BufferSlot {
    pub data: Vec<u8>,
    pub data_capacity: usize,
    pub offsets: Option<Vec<u64>>,
    pub offsets_capacity: Option<usize>,
    pub validity: Option<Vec<u8>>,
    pub validity_capacity: Option<usize>,
}

impl BufferSlot {
    pub fn fixed(capacity: usize) -> Self {
        BufferSlot { data_capacity: capacity, ..Default::default() }
    }

    pub fn var(data_capacity: usize, offsets_capacity: usize) -> Self {
        BufferSlot {
            data_capacity,
            offsets: Some(Vec::new()),
            offsets_capacity: Some(offsets_capacity),
            ..Default::default()
        }
    }

    pub fn with_validity(mut self, validity_capacity: usize) -> Self {
        self.validity = Some(Vec::new());
        self.validity_capacity = Some(validity_capacity);
        self
    }

    fn fits(&self, value_len: usize) -> bool {
        if self.data.len() + value_len > self.data_capacity {
            return false;
        }
        if let Some(cap) = self.offsets_capacity {
            let next_len = self.offsets.as_ref().map(|o| o.len() + 1).unwrap_or(1);
            if next_len * 8 > cap {
                return false;
            }
        }
        if let Some(cap) = self.validity_capacity {
            let next_len = self.validity.as_ref().map(|v| v.len() + 1).unwrap_or(1);
            if next_len > cap {
                return false;
            }
        }
        true
    }

    fn commit(&mut self, value: &[u8], validity: Option<u8>) {
        if let Some(offsets) = &mut self.offsets {
            offsets.push(self.data.len() as u64);
        }
        self.data.extend_from_slice(value);
        if let Some(v) = validity {
            self.validity.as_mut().expect("buffer has no validity slot").push(v);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Uninitialized,
    InProgress,
    Incomplete,
    Complete,
    Failed,
}

/// Resolves one field's raw bytes for one planned cell. Dense and sparse
/// plans both produce [PlannedCell]s; only the source differs (dense can
/// say [CellSource::Fill], sparse never does).
pub struct Coordinator<'a> {
    schema: &'a Schema,
    vfs: &'a dyn Vfs,
    tile_store: &'a TileStore,
    fragments: &'a [FragmentMetadata],
    plan: Vec<PlannedCell>,
    cursor: usize,
    buffers: HashMap<String, BufferSlot>,
    status: Status,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        schema: &'a Schema,
        vfs: &'a dyn Vfs,
        tile_store: &'a TileStore,
        fragments: &'a [FragmentMetadata],
        plan: Vec<PlannedCell>,
    ) -> Self {
        Coordinator {
            schema,
            vfs,
            tile_store,
            fragments,
            plan,
            cursor: 0,
            buffers: HashMap::new(),
            status: Status::Uninitialized,
        }
    }

    pub fn set_buffer(&mut self, field: impl Into<String>, slot: BufferSlot) {
        self.buffers.insert(field.into(), slot);
        // A fresh buffer invalidates whatever COMPLETE/INCOMPLETE state a
        // previous submit() left behind.
        self.status = Status::Uninitialized;
    }

    pub fn buffer(&self, field: &str) -> Option<&BufferSlot> {
        self.buffers.get(field)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn has_results(&self) -> bool {
        self.cursor > 0
    }

    /// Drains the plan into the registered buffers starting from wherever
    /// the last submit() left off, stopping at the first cell that
    /// wouldn't fit in every active buffer.
    pub fn submit(&mut self) -> Result<Status> {
        if self.buffers.is_empty() {
            return Err(Error::Other("submit() with no buffers registered".to_string()));
        }
        let fields: Vec<String> = self.buffers.keys().cloned().collect();

        while self.cursor < self.plan.len() {
            let cell = &self.plan[self.cursor];
            let mut resolved: Vec<(String, Vec<u8>, Option<u8>)> = Vec::with_capacity(fields.len());
            for field in &fields {
                resolved.push((field.clone(), vec![], None));
            }
            for (slot_idx, field) in fields.iter().enumerate() {
                let (value, validity) = self.resolve(field, cell)?;
                resolved[slot_idx].1 = value;
                resolved[slot_idx].2 = validity;
            }

            let all_fit = fields
                .iter()
                .zip(resolved.iter())
                .all(|(field, (_, value, _))| self.buffers[field].fits(value.len()));

            if !all_fit {
                // spec.md §7: a buffer too small for even the next single
                // cell is still ordinary back-pressure from the caller's
                // point of view, not a fatal error -- report INCOMPLETE and
                // let the caller grow the buffer and resubmit.
                self.status = Status::Incomplete;
                return Ok(self.status);
            }

            for (field, value, validity) in resolved {
                self.buffers.get_mut(&field).unwrap().commit(&value, validity);
            }
            self.cursor += 1;
        }

        self.status = Status::Complete;
        Ok(self.status)
    }

    /// Hands back whatever the plan and buffers look like right now: the
    /// cells not yet drained, and the buffers as filled so far. Lets a
    /// caller that can't hold a borrowed `Coordinator` across calls (the
    /// query façade owns `tile_store`/`fragments` itself) rebuild a fresh
    /// one next time without losing progress.
    pub fn into_remaining(self) -> (Vec<PlannedCell>, HashMap<String, BufferSlot>) {
        (self.plan[self.cursor..].to_vec(), self.buffers)
    }

    fn resolve(&self, field: &str, cell: &PlannedCell) -> Result<(Vec<u8>, Option<u8>)> {
        let field_data = self.schema.field(field)?;
        let nullable = field_data.nullability().unwrap_or(false);
        match cell.source {
            CellSource::Fill => {
                let value = self.schema.fill_bytes(field)?;
                let validity = if nullable {
                    Some(self.schema.fill_validity(field)?)
                } else {
                    None
                };
                Ok((value, validity))
            }
            CellSource::Fragment { fragment, tile_idx, pos } => {
                let frag = &self.fragments[fragment];
                let tile = self.tile_store.fetch(self.vfs, self.schema, frag, tile_idx, field)?;
                let value = if let Some(offsets) = &tile.offsets {
                    let start = offsets[pos] as usize;
                    let end = offsets.get(pos + 1).map(|&o| o as usize).unwrap_or(tile.data.len());
                    tile.data[start..end].to_vec()
                } else {
                    let size = cell_size(field_data.datatype(), field_data.cell_val_num());
                    tile.data[pos * size..(pos + 1) * size].to_vec()
                };
                let validity = tile.validity.as_ref().map(|v| v[pos]);
                Ok((value, validity))
            }
        }
    }
}

fn cell_size(datatype: Datatype, cvn: Option<CellValNum>) -> usize {
    let n = match cvn.unwrap_or(CellValNum::single()) {
        CellValNum::Fixed(n) => n.get() as usize,
        CellValNum::Var => 1,
    };
    datatype.size() * n
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::ArrayType;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

    use crate::coord::CoordValue;
    use crate::fragment::metadata::{FragmentMetadataData, TileLocation, TileMbr};
    use crate::read::dense::plan_dense;
    use crate::vfs::MemoryVfs;
    use tiledb_common::array::CellOrder;

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
    fn submit_fills_buffer_and_reports_complete() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let mut locations = StdHashMap::new();
        let mut data = vec![];
        for v in 1..=10i32 {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        vfs.write("frag/a.tdb", &data).unwrap();
        locations.insert("a".to_string(), vec![TileLocation { offset: 0, size: data.len() as u64 }]);
        let frag = FragmentMetadata::new(FragmentMetadataData {
            uri: "frag".to_string(),
            non_empty_domain: vec![(CoordValue::Int32(1), CoordValue::Int32(10))],
            tile_mbrs: vec![TileMbr {
                lo: vec![CoordValue::Int32(1)],
                hi: vec![CoordValue::Int32(10)],
            }],
            tile_locations: locations,
            timestamp_range: (1, 1),
            format_version: 1,
            sparse_tiles: false,
        });
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let frags = vec![frag];
        let store = TileStore::new(8);
        let plan = plan_dense(&schema, &vfs, &store, &frags, &rect, CellOrder::RowMajor).unwrap();

        let mut coordinator = Coordinator::new(&schema, &vfs, &store, &frags, plan);
        coordinator.set_buffer("a", BufferSlot::fixed(40));
        let status = coordinator.submit().unwrap();
        assert_eq!(status, Status::Complete);
        assert_eq!(coordinator.buffer("a").unwrap().data.len(), 40);
    }

    #[test]
    fn submit_stops_early_and_resumes_on_overflow() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let mut locations = StdHashMap::new();
        let mut data = vec![];
        for v in 1..=10i32 {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        vfs.write("frag/a.tdb", &data).unwrap();
        locations.insert("a".to_string(), vec![TileLocation { offset: 0, size: data.len() as u64 }]);
        let frag = FragmentMetadata::new(FragmentMetadataData {
            uri: "frag".to_string(),
            non_empty_domain: vec![(CoordValue::Int32(1), CoordValue::Int32(10))],
            tile_mbrs: vec![TileMbr {
                lo: vec![CoordValue::Int32(1)],
                hi: vec![CoordValue::Int32(10)],
            }],
            tile_locations: locations,
            timestamp_range: (1, 1),
            format_version: 1,
            sparse_tiles: false,
        });
        let rect: Vec<(CoordValue, CoordValue)> =
            vec![(CoordValue::Int32(1), CoordValue::Int32(10))];
        let frags = vec![frag];
        let store = TileStore::new(8);
        let plan = plan_dense(&schema, &vfs, &store, &frags, &rect, CellOrder::RowMajor).unwrap();

        let mut coordinator = Coordinator::new(&schema, &vfs, &store, &frags, plan);
        // Room for exactly 4 int32 cells.
        coordinator.set_buffer("a", BufferSlot::fixed(16));
        let status = coordinator.submit().unwrap();
        assert_eq!(status, Status::Incomplete);
        assert_eq!(coordinator.buffer("a").unwrap().data.len(), 16);

        coordinator.set_buffer("a", BufferSlot::fixed(24));
        let status = coordinator.submit().unwrap();
        assert_eq!(status, Status::Complete);
        assert_eq!(coordinator.buffer("a").unwrap().data.len(), 24);
    }
}
