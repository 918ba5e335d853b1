//! Query façade: the in-process query API. Ties a [Schema], a
//! [FragmentDirectory] and a [Vfs] together behind a single surface --
//! `set_config`, `set_subarray`, `set_layout`,
//! `set_buffer`/`set_buffer_var`/`set_buffer_validity`, `submit`,
//! `submit_async`, `finalize`, `get_status`, `has_results`,
//! `cancel_tasks` -- without introducing any algorithm beyond what
//! [crate::read], [crate::write] and [coordinator] already implement.
//!
//! There's no FFI boundary here, so "the caller's buffer" is the same
//! capacity-bounded `Vec<u8>` convention [coordinator::BufferSlot]
//! already uses: a read buffer is a `Vec<u8>` whose length is its
//! capacity, replaced by the actual bytes written after `submit()`.

pub mod coordinator;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use itertools::Itertools;
use tiledb_common::array::{ArrayType, CellOrder};

use crate::config::{Config, ConfigError};
use crate::coord::CoordValue;
use crate::error::{Error, Result};
use crate::fragment::directory::FragmentDirectory;
use crate::fragment::metadata::FragmentMetadata;
use crate::partitioner::{Partitioner, Rect};
use crate::query::coordinator::{BufferSlot, Coordinator, Status};
use crate::read::dense::plan_dense;
use crate::read::sparse::plan_sparse;
use crate::read::PlannedCell;
use crate::schema::Schema;
use crate::subarray::Subarray;
use crate::tile::TileStore;
use crate::vfs::Vfs;
use crate::write::dense_tiler::write_dense_fragment;
use crate::write::sparse_writer::write_sparse_fragment;
use crate::write::AttributeBuffer;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryType {
    Read,
    Write,
}

pub struct Query<'a> {
    schema: &'a Schema,
    vfs: &'a dyn Vfs,
    array_uri: String,
    query_type: QueryType,
    timestamp: (u64, u64),
    config: Config,
    subarray: Subarray,
    layout: Option<CellOrder>,

    write_buffers: HashMap<String, AttributeBuffer>,

    tile_store: TileStore,
    fragments: Option<Vec<FragmentMetadata>>,
    rect_queue: Vec<Rect>,
    partitioner: Option<Partitioner>,
    read_plan: Vec<PlannedCell>,
    read_buffers: HashMap<String, BufferSlot>,

    cancel: Arc<AtomicBool>,
    status: Status,
    diagnostic: Option<String>,
    finalized: bool,
}

impl<'a> Query<'a> {
    pub fn new(
        schema: &'a Schema,
        vfs: &'a dyn Vfs,
        array_uri: impl Into<String>,
        query_type: QueryType,
        timestamp: (u64, u64),
    ) -> Self {
        Query {
            schema,
            vfs,
            array_uri: array_uri.into(),
            query_type,
            timestamp,
            config: Config::new(),
            subarray: Subarray::new(schema.num_dimensions()),
            layout: None,
            write_buffers: HashMap::new(),
            tile_store: TileStore::new(64),
            fragments: None,
            rect_queue: Vec::new(),
            partitioner: None,
            read_plan: Vec::new(),
            read_buffers: HashMap::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            status: Status::Uninitialized,
            diagnostic: None,
            finalized: false,
        }
    }

    pub fn set_config(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigError> {
        self.config.set(key, value)
    }

    pub fn set_subarray(&mut self, subarray: Subarray) {
        self.subarray = subarray;
        self.reset_read_state();
    }

    pub fn set_layout(&mut self, layout: CellOrder) {
        self.layout = Some(layout);
        self.subarray.set_layout(layout);
    }

    /// Sets a fixed-size field's buffer. For a write query `data` is the
    /// values to persist; for a read query only `data.len()` matters --
    /// it's the capacity `submit()` refuses to fill past -- and the
    /// content is replaced by whatever was read.
    pub fn set_buffer(&mut self, field: impl Into<String>, data: Vec<u8>) {
        let field = field.into();
        match self.query_type {
            QueryType::Write => {
                self.write_buffers.insert(field, AttributeBuffer::fixed(data));
            }
            QueryType::Read => {
                self.read_buffers.insert(field, BufferSlot::fixed(data.len()));
            }
        }
    }

    pub fn set_buffer_var(&mut self, field: impl Into<String>, data: Vec<u8>, offsets: Vec<u64>) {
        let field = field.into();
        match self.query_type {
            QueryType::Write => {
                self.write_buffers.insert(field, AttributeBuffer::var(data, offsets));
            }
            QueryType::Read => {
                self.read_buffers
                    .insert(field, BufferSlot::var(data.len(), offsets.len() * 8));
            }
        }
    }

    pub fn set_buffer_validity(&mut self, field: impl Into<String>, validity: Vec<u8>) {
        let field = field.into();
        match self.query_type {
            QueryType::Write => {
                let entry = self.write_buffers.entry(field).or_default();
                entry.validity = Some(validity);
            }
            QueryType::Read => {
                let capacity = validity.len();
                self.read_buffers
                    .entry(field)
                    .and_modify(|s| {
                        s.validity = Some(Vec::new());
                        s.validity_capacity = Some(capacity);
                    })
                    .or_insert_with(|| BufferSlot::fixed(0).with_validity(capacity));
            }
        }
    }

    pub fn get_status(&self) -> Status {
        self.status
    }

    /// Set alongside a `Status::Failed` that came from an unrecoverable
    /// planning error (e.g. a subarray that overflows the memory budget
    /// and can't be split any further); `None` otherwise.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// True once at least one read buffer holds data; writes never
    /// report results.
    pub fn has_results(&self) -> bool {
        self.query_type == QueryType::Read
            && self.read_buffers.values().any(|b| !b.data.is_empty())
    }

    /// Requests cancellation at the next suspension point: between
    /// partitions on a read, or before the write commits.
    pub fn cancel_tasks(&self) {
        self.cancel.store(true, AtomicOrdering::Relaxed);
    }

    /// Read-only access to one read buffer's contents after `submit()`.
    pub fn buffer(&self, field: &str) -> Option<&BufferSlot> {
        self.read_buffers.get(field)
    }

    pub fn submit(&mut self) -> Result<Status> {
        if self.finalized {
            return Err(Error::Other("submit() called after finalize()".to_string()));
        }
        if self.cancel.load(AtomicOrdering::Relaxed) {
            self.status = Status::Failed;
            return Ok(self.status);
        }
        self.status = Status::InProgress;
        match self.query_type {
            QueryType::Write => self.submit_write(),
            QueryType::Read => self.submit_read(),
        }
    }

    /// Synchronous stand-in for async submission: this crate has no
    /// async runtime in its ambient stack, so `submit_async` just runs
    /// `submit()` to completion and invokes `callback` with the result,
    /// without faking concurrency that doesn't exist here.
    pub fn submit_async(&mut self, callback: impl FnOnce(Result<Status>)) {
        callback(self.submit());
    }

    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        if self.query_type == QueryType::Write
            && self.layout == Some(CellOrder::Global)
            && self.schema.array_type() == ArrayType::Dense
        {
            self.check_global_write_is_tile_aligned()?;
        }
        self.finalized = true;
        Ok(())
    }

    fn check_global_write_is_tile_aligned(&self) -> Result<()> {
        if !self.subarray.is_single_range() {
            return Ok(());
        }
        let ranges = self.subarray.effective_ranges(self.schema)?;
        let rect: Vec<(CoordValue, CoordValue)> = ranges.into_iter().map(|r| r[0].clone()).collect();
        let written: usize = rect
            .iter()
            .map(|(lo, hi)| (hi.as_f64() - lo.as_f64()).round() as usize + 1)
            .product();
        let tile_size = representative_tile_size(self.schema);
        if tile_size > 0 && written % tile_size != 0 {
            return Err(Error::IncompleteWrite { written, tile_size });
        }
        Ok(())
    }

    fn submit_write(&mut self) -> Result<Status> {
        let ranges = self.subarray.effective_ranges(self.schema)?;
        match self.schema.array_type() {
            ArrayType::Dense if self.layout == Some(CellOrder::Unordered) => {
                // An unordered write into a dense array: no write rectangle,
                // just explicit coordinates -- produce the same kind of
                // fragment a sparse array's unordered write does, and let
                // `read::dense::plan_dense` resolve it by coordinate.
                let dim_names: std::collections::HashSet<String> =
                    self.schema.dimension_names().into_iter().collect();
                let (dim_buffers, attr_buffers): (HashMap<_, _>, HashMap<_, _>) = self
                    .write_buffers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .partition(|(k, _)| dim_names.contains(k));
                write_sparse_fragment(
                    self.schema,
                    self.vfs,
                    &self.array_uri,
                    &dim_buffers,
                    &attr_buffers,
                    CellOrder::Unordered,
                    self.timestamp,
                )?;
            }
            ArrayType::Dense => {
                if !self.subarray.is_single_range() {
                    return Err(Error::InvalidLayout(
                        "dense write requires a single write rectangle".to_string(),
                    ));
                }
                let rect: Vec<(CoordValue, CoordValue)> =
                    ranges.into_iter().map(|r| r[0].clone()).collect();
                write_dense_fragment(
                    self.schema,
                    self.vfs,
                    &self.array_uri,
                    &rect,
                    &self.write_buffers,
                    self.timestamp,
                )?;
            }
            ArrayType::Sparse => {
                let dim_names: std::collections::HashSet<String> =
                    self.schema.dimension_names().into_iter().collect();
                let (dim_buffers, attr_buffers): (HashMap<_, _>, HashMap<_, _>) = self
                    .write_buffers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .partition(|(k, _)| dim_names.contains(k));
                let layout = self.layout.unwrap_or(CellOrder::Unordered);
                write_sparse_fragment(
                    self.schema,
                    self.vfs,
                    &self.array_uri,
                    &dim_buffers,
                    &attr_buffers,
                    layout,
                    self.timestamp,
                )?;
            }
        }
        self.status = Status::Complete;
        Ok(self.status)
    }

    fn submit_read(&mut self) -> Result<Status> {
        if self.fragments.is_none() {
            let dir = FragmentDirectory::new(self.vfs, self.array_uri.clone());
            self.fragments = Some(dir.list_in_range(self.timestamp.0, self.timestamp.1)?);
            let ranges = self.subarray.effective_ranges(self.schema)?;
            self.rect_queue = ranges.into_iter().multi_cartesian_product().collect();
        }

        loop {
            if self.cancel.load(AtomicOrdering::Relaxed) {
                self.status = Status::Failed;
                return Ok(self.status);
            }
            if self.read_plan.is_empty() {
                if self.partitioner.as_ref().map(|p| p.is_done()).unwrap_or(true) {
                    match self.rect_queue.pop() {
                        Some(rect) => self.partitioner = Some(Partitioner::new(rect)),
                        None => {
                            self.status = Status::Complete;
                            return Ok(self.status);
                        }
                    }
                }
                let budget = self.config.memory_budget as usize;
                let bytes_per_cell = self.estimated_bytes_per_cell();
                match self.partitioner.as_mut().unwrap().next(budget, bytes_per_cell) {
                    Ok(Some(rect)) => self.read_plan = self.build_plan(&rect)?,
                    Ok(None) => continue,
                    Err(Error::UnsplittableOverflow { field }) => {
                        self.diagnostic = Some(format!(
                            "subarray overflows memory budget and cannot be split further on {field}"
                        ));
                        self.status = Status::Failed;
                        return Ok(self.status);
                    }
                    Err(err) => return Err(err),
                }
            }

            let plan = std::mem::take(&mut self.read_plan);
            let fragments = self.fragments.as_ref().unwrap();
            let mut coordinator =
                Coordinator::new(self.schema, self.vfs, &self.tile_store, fragments, plan);
            for (name, slot) in self.read_buffers.drain() {
                coordinator.set_buffer(name, slot);
            }
            let status = coordinator.submit()?;
            let (remaining, buffers) = coordinator.into_remaining();
            self.read_plan = remaining;
            self.read_buffers = buffers;

            match status {
                Status::Complete if self.read_plan.is_empty() => continue,
                Status::Complete => unreachable!("coordinator reports Complete with cells left"),
                other => {
                    self.status = other;
                    return Ok(other);
                }
            }
        }
    }

    fn build_plan(&self, rect: &[(CoordValue, CoordValue)]) -> Result<Vec<PlannedCell>> {
        let layout = self.subarray.layout(self.schema);
        let fragments = self.fragments.as_ref().unwrap();
        match self.schema.array_type() {
            ArrayType::Dense => {
                plan_dense(self.schema, self.vfs, &self.tile_store, fragments, rect, layout)
            }
            ArrayType::Sparse => {
                plan_sparse(self.schema, self.vfs, &self.tile_store, fragments, rect, layout)
            }
        }
    }

    fn estimated_bytes_per_cell(&self) -> usize {
        self.read_buffers
            .keys()
            .map(|f| self.schema.cell_size(f.as_str()).ok().flatten().unwrap_or(8))
            .sum::<usize>()
            .max(1)
    }

    fn reset_read_state(&mut self) {
        self.fragments = None;
        self.rect_queue.clear();
        self.partitioner = None;
        self.read_plan.clear();
        self.status = Status::Uninitialized;
        self.diagnostic = None;
    }
}

fn representative_tile_size(schema: &Schema) -> usize {
    let tile_coords = vec![0i128; schema.num_dimensions()];
    let domain = schema.tile_subarray(&tile_coords);
    domain
        .iter()
        .map(|(lo, hi)| (hi.as_f64() - lo.as_f64()).round() as usize + 1)
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::datatype::Datatype;
    use tiledb_common::range::SingleValueRange;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

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
    fn write_then_read_round_trips_through_the_facade() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();

        let mut write_query = Query::new(&schema, &vfs, "arr", QueryType::Write, (1, 1));
        let mut sub = Subarray::new(1);
        sub.add_range(&schema, 0, SingleValueRange::Int32(1, 5)).unwrap();
        write_query.set_subarray(sub);
        let mut data = Vec::new();
        for v in 1..=5i32 {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        write_query.set_buffer("a", data);
        let status = write_query.submit().unwrap();
        assert_eq!(status, Status::Complete);
        write_query.finalize().unwrap();

        let mut read_query = Query::new(&schema, &vfs, "arr", QueryType::Read, (1, 1));
        let mut sub = Subarray::new(1);
        sub.add_range(&schema, 0, SingleValueRange::Int32(1, 10)).unwrap();
        read_query.set_subarray(sub);
        read_query.set_buffer("a", vec![0u8; 40]);
        let status = read_query.submit().unwrap();
        assert_eq!(status, Status::Complete);
        assert!(read_query.has_results());

        let out = read_query.buffer("a").unwrap();
        let values: Vec<i32> = out
            .data
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(&values[0..5], &[1, 2, 3, 4, 5]);
        assert_eq!(values[5], i32::MIN);
    }

    #[test]
    fn cancel_tasks_fails_a_pending_submit() {
        let schema = schema_1d(10, 1, 10);
        let vfs = MemoryVfs::new();
        let mut query = Query::new(&schema, &vfs, "arr", QueryType::Read, (1, 1));
        query.set_buffer("a", vec![0u8; 40]);
        query.cancel_tasks();
        let status = query.submit().unwrap();
        assert_eq!(status, Status::Failed);
    }
}
