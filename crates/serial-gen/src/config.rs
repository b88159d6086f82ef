// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted generator settings.
//!
//! Settings live as one JSON document, `serial-gen.json`, in either an
//! explicit directory (`--config-dir`) or the platform config directory
//! (e.g. `~/.config/serial-gen`). `serial-gen config` edits them; flags on
//! the other subcommands override what is stored for a single run.

use std::fs;
use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key of the generator settings document.
pub const CONFIG_KEY: &str = "serial-gen";

/// Where settings documents are kept, addressed by key.
pub trait ConfigStore {
    /// Bytes stored under `key`, or `None` if nothing is.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError>;

    /// Replace whatever is stored under `key`.
    fn write(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;

    /// Human-readable location of `key`, for messages.
    fn location(&self, key: &str) -> String;
}

/// Why settings could not be read or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no config directory for this user.
    #[error("no config directory for the current user")]
    NoConfigDir,

    /// Reading or writing the backing file failed.
    #[error("{location}: {source}")]
    Io {
        /// File involved.
        location: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// The stored document is not valid settings JSON.
    #[error("{location}: {source}")]
    Parse {
        /// File involved.
        location: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },

    /// The settings could not be encoded.
    #[error("encoding settings: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One `<key>.json` file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Store rooted at `dir`; created on first write.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { base: dir.into() }
    }

    /// Store in the user's platform config directory.
    pub fn user() -> Result<Self, ConfigError> {
        ProjectDirs::from("dev", "flyingrobots", "serial-gen")
            .map(|dirs| Self::at(dirs.config_dir()))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io {
                location: path.display().to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        let io_err = |source| ConfigError::Io {
            location: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.base).map_err(io_err)?;
        fs::write(&path, data).map_err(io_err)
    }

    fn location(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

/// Generator settings. Missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenConfig {
    /// Known-types registry file; defaults to `knownTypes.txt` in the output directory.
    pub known_types_file: Option<PathBuf>,
    /// Extra registry files merged on load and never rewritten.
    pub extra_known_types: Vec<PathBuf>,
    /// Output directory for generated modules.
    pub output_dir: Option<PathBuf>,
    /// Skip known subtypes in write closures.
    pub prune_write_subtypes: bool,
}

impl GenConfig {
    /// Settings stored in `store`, or defaults when there are none. An
    /// empty document counts as none.
    pub fn load(store: &impl ConfigStore) -> Result<Self, ConfigError> {
        match store.read(CONFIG_KEY)? {
            Some(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                    location: store.location(CONFIG_KEY),
                    source,
                })
            }
            _ => Ok(Self::default()),
        }
    }

    /// Write these settings to `store` as pretty JSON.
    pub fn save(&self, store: &impl ConfigStore) -> Result<(), ConfigError> {
        let mut data = serde_json::to_vec_pretty(self).map_err(ConfigError::Encode)?;
        data.push(b'\n');
        store.write(CONFIG_KEY, &data)
    }
}

/// Changes requested by `serial-gen config`; `None` leaves a setting alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    /// New output directory.
    pub output_dir: Option<PathBuf>,
    /// New known-types file.
    pub known_types_file: Option<PathBuf>,
    /// Replacement list of extra registries.
    pub extra_known_types: Option<Vec<PathBuf>>,
    /// New pruning default.
    pub prune_write_subtypes: Option<bool>,
}

impl ConfigUpdate {
    /// Whether nothing would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `config`.
    pub fn apply(self, config: &mut GenConfig) {
        if let Some(dir) = self.output_dir {
            config.output_dir = Some(dir);
        }
        if let Some(file) = self.known_types_file {
            config.known_types_file = Some(file);
        }
        if let Some(extras) = self.extra_known_types {
            config.extra_known_types = extras;
        }
        if let Some(prune) = self.prune_write_subtypes {
            config.prune_write_subtypes = prune;
        }
    }
}
