//! Tile storage: the on-disk shape of one field's data for
//! one tile, and the cache that fetches it.

pub mod store;

pub use store::TileStore;

/// One field's materialized tile. Var-length fields carry an `offsets`
/// buffer (one element per cell, the "extra element" convention applies
/// only on write -- see the dense tiler); nullable fields carry a
/// `validity` buffer, one byte per cell, nonzero meaning valid.
#[derive(Clone, Debug, Default)]
pub struct Tile {
    pub data: Vec<u8>,
    pub offsets: Option<Vec<u64>>,
    pub validity: Option<Vec<u8>>,
}

impl Tile {
    pub fn fixed(data: Vec<u8>) -> Self {
        Tile { data, offsets: None, validity: None }
    }

    pub fn var(data: Vec<u8>, offsets: Vec<u64>) -> Self {
        Tile { data, offsets: Some(offsets), validity: None }
    }

    pub fn with_validity(mut self, validity: Vec<u8>) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn is_var(&self) -> bool {
        self.offsets.is_some()
    }

    pub fn is_nullable(&self) -> bool {
        self.validity.is_some()
    }
}
