//! Runtime configuration: the `sm.*` / `vfs.*` key namespace.
//!
//! A flat key/value store with typed accessors for the handful of keys the
//! engine actually reads; everything else is held in `extra` purely for
//! round-tripping and logged once so typos don't silently do nothing.

use std::collections::HashMap;

use tracing::warn;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OobMode {
    Error,
    Warn,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarOffsetsMode {
    Bytes,
    Elements,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarOffsetsBitsize {
    Bits32,
    Bits64,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for config key `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Typed view over the `sm.*`/`vfs.*` config namespace.
///
/// Known keys get a dedicated field and typed accessor; anything else is
/// kept in `extra` and only ever logged once, so repeated unknown keys
/// don't spam.
#[derive(Clone, Debug)]
pub struct Config {
    pub read_range_oob: OobMode,
    pub memory_budget: u64,
    pub memory_budget_var: u64,
    pub var_offsets_mode: VarOffsetsMode,
    pub var_offsets_bitsize: VarOffsetsBitsize,
    pub var_offsets_extra_element: bool,
    extra: HashMap<String, String>,
    warned: std::cell::RefCell<std::collections::HashSet<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            read_range_oob: OobMode::Error,
            memory_budget: 10 * 1024 * 1024,
            memory_budget_var: 10 * 1024 * 1024,
            var_offsets_mode: VarOffsetsMode::Bytes,
            var_offsets_bitsize: VarOffsetsBitsize::Bits64,
            var_offsets_extra_element: false,
            extra: HashMap::new(),
            warned: std::cell::RefCell::new(std::collections::HashSet::new()),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "sm.read_range_oob" => {
                self.read_range_oob = match value {
                    "error" => OobMode::Error,
                    "warn" => OobMode::Warn,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                };
            }
            "sm.memory_budget" => {
                self.memory_budget = value.parse().map_err(|_| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    }
                })?;
            }
            "sm.memory_budget_var" => {
                self.memory_budget_var = value.parse().map_err(|_| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    }
                })?;
            }
            "sm.var_offsets.mode" => {
                self.var_offsets_mode = match value {
                    "bytes" => VarOffsetsMode::Bytes,
                    "elements" => VarOffsetsMode::Elements,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                };
            }
            "sm.var_offsets.bitsize" => {
                self.var_offsets_bitsize = match value {
                    "32" => VarOffsetsBitsize::Bits32,
                    "64" => VarOffsetsBitsize::Bits64,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                };
            }
            "sm.var_offsets.extra_element" => {
                self.var_offsets_extra_element =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
            }
            other => {
                if other.starts_with("sm.") || other.starts_with("vfs.") {
                    if self.warned.borrow_mut().insert(other.to_string()) {
                        warn!(key = other, "ignoring unknown config key");
                    }
                    self.extra.insert(other.to_string(), value.to_string());
                } else {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.extra.get(key).cloned()
    }
}
