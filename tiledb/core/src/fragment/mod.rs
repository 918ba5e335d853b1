//! Fragment-level types: per-fragment metadata, the
//! R-tree over tile MBRs, and the directory that lists/filters fragments
//! for an array.

pub mod directory;
pub mod metadata;
pub mod rtree;

pub use directory::FragmentDirectory;
pub use metadata::{FragmentMetadata, FragmentMetadataData, TileLocation, TileMbr};
