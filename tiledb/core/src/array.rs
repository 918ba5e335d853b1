//! `Array`: ties a [Schema] to a [FragmentDirectory] and a [Vfs], and
//! implements `open`/`close`/`reopen`. This is the handle a caller holds
//! before building a [Query] against it -- no new algorithm lives here,
//! just the plumbing that wires the pieces together.

use crate::error::{Error, Result};
use crate::fragment::directory::FragmentDirectory;
use crate::query::{Query, QueryType};
use crate::schema::Schema;
use crate::vfs::Vfs;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    Read,
    Write,
}

pub struct Array<'a> {
    uri: String,
    vfs: &'a dyn Vfs,
    schema: Schema,
    mode: OpenMode,
    timestamp: (u64, u64),
}

impl<'a> Array<'a> {
    /// Creates a new array directory: persists `schema` under
    /// `<uri>/__schema/` and leaves `__fragments`/`__commits` to be
    /// populated by the first write. Fails if a schema already exists at
    /// `uri`, since schemas are immutable once written.
    pub fn create(vfs: &'a dyn Vfs, uri: impl Into<String>, schema: Schema) -> Result<()> {
        let uri = uri.into();
        if !vfs.ls(&crate::vfs::join(&uri, "__schema")).unwrap_or_default().is_empty() {
            return Err(Error::Other(format!("array `{uri}` already exists")));
        }
        schema.persist(vfs, &uri)?;
        Ok(())
    }

    /// Opens an existing array at `uri`, reading the newest schema blob
    /// and defaulting the open timestamp to "all time" (`(0, u64::MAX)`).
    pub fn open(vfs: &'a dyn Vfs, uri: impl Into<String>, mode: OpenMode) -> Result<Self> {
        let uri = uri.into();
        let schema = Schema::open(vfs, &uri)?;
        Ok(Array { uri, vfs, schema, mode, timestamp: (0, u64::MAX) })
    }

    /// Re-reads the schema and re-scopes the open timestamp range,
    /// without dropping the handle. A reader holding stale fragment
    /// listings should call this to observe fragments committed since
    /// `open()`.
    pub fn reopen(&mut self) -> Result<()> {
        self.schema = Schema::open(self.vfs, &self.uri)?;
        Ok(())
    }

    pub fn set_open_timestamp_range(&mut self, lo: u64, hi: u64) {
        self.timestamp = (lo, hi);
    }

    /// A no-op beyond dropping the handle: this engine holds no file
    /// descriptors or locks across queries.
    pub fn close(self) {}

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fragment_directory(&self) -> FragmentDirectory<'_> {
        FragmentDirectory::new(self.vfs, self.uri.clone())
    }

    /// Builds a [Query] of `query_type` against this array's current
    /// schema, vfs and open timestamp range.
    pub fn query(&self, query_type: QueryType) -> Result<Query<'_>> {
        if query_type == QueryType::Write && self.mode != OpenMode::Write {
            return Err(Error::Other(format!(
                "array `{}` was opened for reading, cannot write",
                self.uri
            )));
        }
        Ok(Query::new(&self.schema, self.vfs, self.uri.clone(), query_type, self.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiledb_common::array::dimension::DimensionConstraints;
    use tiledb_common::array::{ArrayType, CellOrder};
    use tiledb_common::datatype::Datatype;
    use tiledb_common::range::SingleValueRange;
    use tiledb_pod::array::attribute::AttributeData;
    use tiledb_pod::array::domain::DomainData;
    use tiledb_pod::array::schema::SchemaData;
    use tiledb_pod::array::DimensionData;

    use crate::query::coordinator::Status;
    use crate::subarray::Subarray;
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
            cell_order: Some(CellOrder::RowMajor),
            attributes: vec![AttributeData {
                name: "a".to_string(),
                datatype: Datatype::Int32,
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn create_then_open_recovers_the_schema() {
        let vfs = MemoryVfs::new();
        Array::create(&vfs, "arr", schema_1d(5, 1, 10)).unwrap();

        let array = Array::open(&vfs, "arr", OpenMode::Read).unwrap();
        assert_eq!(array.schema().array_type(), ArrayType::Dense);
        assert_eq!(array.schema().dimension_names(), vec!["d".to_string()]);
    }

    #[test]
    fn create_twice_fails() {
        let vfs = MemoryVfs::new();
        Array::create(&vfs, "arr", schema_1d(5, 1, 10)).unwrap();
        assert!(Array::create(&vfs, "arr", schema_1d(5, 1, 10)).is_err());
    }

    #[test]
    fn read_query_on_a_write_only_handle_is_rejected() {
        let vfs = MemoryVfs::new();
        Array::create(&vfs, "arr", schema_1d(5, 1, 10)).unwrap();
        let array = Array::open(&vfs, "arr", OpenMode::Read).unwrap();
        assert!(array.query(QueryType::Write).is_err());
    }

    #[test]
    fn write_then_read_through_the_array_handle() {
        let vfs = MemoryVfs::new();
        Array::create(&vfs, "arr", schema_1d(5, 1, 10)).unwrap();

        let mut writer = Array::open(&vfs, "arr", OpenMode::Write).unwrap();
        writer.set_open_timestamp_range(1, 1);
        let mut write_query = writer.query(QueryType::Write).unwrap();
        let mut sub = Subarray::new(1);
        sub.add_range(writer.schema(), 0, SingleValueRange::Int32(3, 6)).unwrap();
        write_query.set_subarray(sub);
        let mut data = Vec::new();
        for v in 1..=4i32 {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        write_query.set_buffer("a", data);
        assert_eq!(write_query.submit().unwrap(), Status::Complete);
        write_query.finalize().unwrap();
        writer.close();

        let mut reader = Array::open(&vfs, "arr", OpenMode::Read).unwrap();
        reader.set_open_timestamp_range(0, u64::MAX);
        let mut read_query = reader.query(QueryType::Read).unwrap();
        let mut sub = Subarray::new(1);
        sub.add_range(reader.schema(), 0, SingleValueRange::Int32(1, 10)).unwrap();
        read_query.set_subarray(sub);
        read_query.set_buffer("a", vec![0u8; 40]);
        assert_eq!(read_query.submit().unwrap(), Status::Complete);

        let values: Vec<i32> = read_query
            .buffer("a")
            .unwrap()
            .data
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(&values[2..6], &[1, 2, 3, 4]);
    }
}
