//! `TileStore`: fetches one field's tile from a fragment,
//! applying the inverse filter pipeline, and caches the result.
//!
//! Filter codec implementations (compression, checksums, ...) are out of
//! scope (see `tiledb_common::filter`'s module doc): the inverse pipeline
//! here is the identity transform, so what's cached is exactly what's on
//! disk. The cache still matters for the offsets/values/validity
//! triple-fetch a single var, nullable field requires.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::error::{Error, Result};
use crate::fragment::metadata::FragmentMetadata;
use crate::schema::Schema;
use crate::tile::Tile;
use crate::vfs::{ByteRange, Vfs};

const OFFSET_WIDTH: usize = 8;

fn component_data(field: &str) -> String {
    format!("{field}")
}

fn component_var(field: &str) -> String {
    format!("{field}_var")
}

fn component_validity(field: &str) -> String {
    format!("{field}_validity")
}

#[derive(Clone, Eq, PartialEq, Hash)]
struct CacheKey {
    fragment_uri: String,
    tile_idx: usize,
    component: String,
}

pub struct TileStore {
    cache: Mutex<LruCache<CacheKey, Vec<u8>>>,
}

impl TileStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        TileStore { cache: Mutex::new(LruCache::new(capacity)) }
    }

    fn fetch_component(
        &self,
        vfs: &dyn Vfs,
        frag: &FragmentMetadata,
        tile_idx: usize,
        component: &str,
    ) -> Result<Vec<u8>> {
        let key = CacheKey {
            fragment_uri: frag.uri().to_string(),
            tile_idx,
            component: component.to_string(),
        };
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }
        let offset = frag.tile_offset(tile_idx, component)?;
        let size = frag.tile_size(tile_idx, component)?;
        let uri = crate::vfs::join(frag.uri(), &format!("{component}.tdb"));
        let bytes = vfs.read(&uri, ByteRange::new(offset, offset + size))?;
        self.cache.lock().unwrap().put(key, bytes.clone());
        Ok(bytes)
    }

    /// Fetches tile `tile_idx` of `field` for the given fragment, assembling
    /// the offsets/values pair for var-length fields and the validity
    /// buffer for nullable ones.
    pub fn fetch(
        &self,
        vfs: &dyn Vfs,
        schema: &Schema,
        frag: &FragmentMetadata,
        tile_idx: usize,
        field: &str,
    ) -> Result<Tile> {
        let field_data = schema.field(field)?;
        let is_var = field_data.cell_val_num().map(|c| c.is_var_sized()).unwrap_or(false);

        let mut tile = if is_var {
            let raw_offsets =
                self.fetch_component(vfs, frag, tile_idx, &component_data(field))?;
            let offsets = decode_offsets(&raw_offsets)?;
            let values =
                self.fetch_component(vfs, frag, tile_idx, &component_var(field))?;
            Tile::var(values, offsets)
        } else {
            let data = self.fetch_component(vfs, frag, tile_idx, &component_data(field))?;
            Tile::fixed(data)
        };

        if field_data.nullability().unwrap_or(false) {
            let validity =
                self.fetch_component(vfs, frag, tile_idx, &component_validity(field))?;
            tile = tile.with_validity(validity);
        }

        Ok(tile)
    }

    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

fn decode_offsets(bytes: &[u8]) -> Result<Vec<u64>> {
    if bytes.len() % OFFSET_WIDTH != 0 {
        return Err(Error::FormatError(format!(
            "offsets buffer length {} is not a multiple of {OFFSET_WIDTH}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(OFFSET_WIDTH)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .collect())
}

pub fn encode_offsets(offsets: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(offsets.len() * OFFSET_WIDTH);
    for o in offsets {
        out.extend_from_slice(&o.to_le_bytes());
    }
    out
}
