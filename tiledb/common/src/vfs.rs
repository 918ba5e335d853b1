use crate::wire;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum VFSModeError {
    #[error("Invalid discriminant for {}: {0}", std::any::type_name::<VFSMode>())]
    InvalidDiscriminant(u64),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum VFSMode {
    Read,
    Write,
    Append,
}

impl From<VFSMode> for wire::tiledb_vfs_mode_t {
    fn from(value: VFSMode) -> Self {
        match value {
            VFSMode::Read => wire::tiledb_vfs_mode_t_TILEDB_VFS_READ,
            VFSMode::Write => wire::tiledb_vfs_mode_t_TILEDB_VFS_WRITE,
            VFSMode::Append => wire::tiledb_vfs_mode_t_TILEDB_VFS_APPEND,
        }
    }
}

impl TryFrom<wire::tiledb_vfs_mode_t> for VFSMode {
    type Error = VFSModeError;
    fn try_from(value: wire::tiledb_vfs_mode_t) -> Result<Self, Self::Error> {
        match value {
            wire::tiledb_vfs_mode_t_TILEDB_VFS_READ => Ok(VFSMode::Read),
            wire::tiledb_vfs_mode_t_TILEDB_VFS_WRITE => Ok(VFSMode::Write),
            wire::tiledb_vfs_mode_t_TILEDB_VFS_APPEND => Ok(VFSMode::Append),
            _ => Err(VFSModeError::InvalidDiscriminant(value as u64)),
        }
    }
}
