//! The storage backend capability.
//!
//! Real object-store backends (`vfs.s3.*`, `vfs.azure.*`, ...) are out of
//! scope; this module gives the engine something concrete to run against
//! (an in-memory store for tests, a local-disk store for the CLI) behind
//! the same narrow trait: `ls`, `read(range)`, `write`,
//! `remove_dir`, `is_bucket`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};

/// A half-open byte range `[start, end)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        ByteRange { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

pub trait Vfs: Send + Sync {
    fn ls(&self, dir: &str) -> Result<Vec<String>>;
    fn read(&self, uri: &str, range: ByteRange) -> Result<Vec<u8>>;
    fn write(&self, uri: &str, data: &[u8]) -> Result<()>;
    fn append(&self, uri: &str, data: &[u8]) -> Result<()>;
    fn remove_dir(&self, dir: &str) -> Result<()>;
    fn remove_file(&self, uri: &str) -> Result<()>;
    fn is_bucket(&self, uri: &str) -> bool;
    fn exists(&self, uri: &str) -> bool;
    fn file_size(&self, uri: &str) -> Result<u64>;
}

/// An in-process `Vfs` backed by a map of byte vectors. Used by tests and
/// by any caller that wants an array without touching the local disk.
#[derive(Default)]
pub struct MemoryVfs {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize(uri: &str) -> String {
    uri.trim_end_matches('/').to_string()
}

impl Vfs for MemoryVfs {
    fn ls(&self, dir: &str) -> Result<Vec<String>> {
        let dir = normalize(dir);
        let prefix = format!("{}/", dir);
        let files = self.files.read().unwrap();
        let mut seen = std::collections::BTreeSet::new();
        for key in files.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let top = rest.split('/').next().unwrap();
                seen.insert(format!("{}{}", prefix, top));
            }
        }
        Ok(seen.into_iter().collect())
    }

    fn read(&self, uri: &str, range: ByteRange) -> Result<Vec<u8>> {
        let files = self.files.read().unwrap();
        let data = files.get(uri).ok_or_else(|| Error::IOError {
            uri: uri.to_string(),
            reason: "no such file".to_string(),
        })?;
        let start = range.start as usize;
        let end = (range.end as usize).min(data.len());
        if start > data.len() {
            return Err(Error::IOError {
                uri: uri.to_string(),
                reason: format!(
                    "range start {start} beyond file length {}",
                    data.len()
                ),
            });
        }
        Ok(data[start..end].to_vec())
    }

    fn write(&self, uri: &str, data: &[u8]) -> Result<()> {
        self.files
            .write()
            .unwrap()
            .insert(uri.to_string(), data.to_vec());
        Ok(())
    }

    fn append(&self, uri: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.write().unwrap();
        files.entry(uri.to_string()).or_default().extend_from_slice(data);
        Ok(())
    }

    fn remove_dir(&self, dir: &str) -> Result<()> {
        let prefix = format!("{}/", normalize(dir));
        self.files.write().unwrap().retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    fn remove_file(&self, uri: &str) -> Result<()> {
        self.files.write().unwrap().remove(uri);
        Ok(())
    }

    fn is_bucket(&self, _uri: &str) -> bool {
        false
    }

    fn exists(&self, uri: &str) -> bool {
        self.files.read().unwrap().contains_key(uri)
    }

    fn file_size(&self, uri: &str) -> Result<u64> {
        let files = self.files.read().unwrap();
        files
            .get(uri)
            .map(|d| d.len() as u64)
            .ok_or_else(|| Error::IOError {
                uri: uri.to_string(),
                reason: "no such file".to_string(),
            })
    }
}

/// A `Vfs` backed by the local filesystem, rooted at whatever absolute or
/// relative paths callers pass as `uri`.
#[derive(Default)]
pub struct LocalVfs;

impl LocalVfs {
    pub fn new() -> Self {
        LocalVfs
    }
}

impl Vfs for LocalVfs {
    fn ls(&self, dir: &str) -> Result<Vec<String>> {
        let mut out = vec![];
        let entries = std::fs::read_dir(dir).map_err(|e| Error::IOError {
            uri: dir.to_string(),
            reason: e.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::IOError {
                uri: dir.to_string(),
                reason: e.to_string(),
            })?;
            out.push(entry.path().to_string_lossy().into_owned());
        }
        out.sort();
        Ok(out)
    }

    fn read(&self, uri: &str, range: ByteRange) -> Result<Vec<u8>> {
        use std::io::{Read, Seek, SeekFrom};
        let mut f = std::fs::File::open(uri).map_err(|e| Error::IOError {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        f.seek(SeekFrom::Start(range.start)).map_err(|e| Error::IOError {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        let mut buf = vec![0u8; range.len() as usize];
        f.read_exact(&mut buf).map_err(|e| Error::IOError {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(buf)
    }

    fn write(&self, uri: &str, data: &[u8]) -> Result<()> {
        if let Some(parent) = Path::new(uri).parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::IOError {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(uri, data).map_err(|e| Error::IOError {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
    }

    fn append(&self, uri: &str, data: &[u8]) -> Result<()> {
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(uri)
            .map_err(|e| Error::IOError {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        f.write_all(data).map_err(|e| Error::IOError {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
    }

    fn remove_dir(&self, dir: &str) -> Result<()> {
        if Path::new(dir).exists() {
            std::fs::remove_dir_all(dir).map_err(|e| Error::IOError {
                uri: dir.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn remove_file(&self, uri: &str) -> Result<()> {
        if Path::new(uri).exists() {
            std::fs::remove_file(uri).map_err(|e| Error::IOError {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn is_bucket(&self, _uri: &str) -> bool {
        false
    }

    fn exists(&self, uri: &str) -> bool {
        Path::new(uri).exists()
    }

    fn file_size(&self, uri: &str) -> Result<u64> {
        std::fs::metadata(uri)
            .map(|m| m.len())
            .map_err(|e| Error::IOError {
                uri: uri.to_string(),
                reason: e.to_string(),
            })
    }
}

pub fn join(base: &str, child: &str) -> String {
    let mut p = PathBuf::from(base);
    p.push(child);
    p.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip() {
        let vfs = MemoryVfs::new();
        vfs.write("a/b.tdb", b"hello world").unwrap();
        assert_eq!(
            vfs.read("a/b.tdb", ByteRange::new(0, 5)).unwrap(),
            b"hello"
        );
        assert_eq!(vfs.ls("a").unwrap(), vec!["a/b.tdb".to_string()]);
        vfs.remove_dir("a").unwrap();
        assert!(!vfs.exists("a/b.tdb"));
    }
}
