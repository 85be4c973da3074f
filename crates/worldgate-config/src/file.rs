use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::settings::Config;

const CONFIG_PATH_FLAG: &str = "--config-path";

/// Errors raised while reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file could not be written.
    #[error("failed to write configuration '{path}': {source}")]
    Write {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The layered sources could not be merged into a configuration.
    #[error("failed to load configuration '{path}': {source}")]
    Layers {
        /// File at the base of the layers.
        path: PathBuf,
        /// Merge, parse, or flag error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The document was not valid TOML.
    #[error("failed to parse configuration '{path}': {source}")]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialise configuration: {0}")]
    Serialise(#[from] toml::ser::Error),
    /// A value parsed but violates a constraint.
    #[error("invalid configuration value for '{key}': {reason}")]
    Invalid {
        /// Configuration key.
        key: String,
        /// Constraint that failed.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Handle on the configuration file owned by the daemon.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Creates a handle for `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves the configuration from the file and `WORLDGATE_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or malformed, a variable does not
    /// parse, or the result violates a constraint.
    pub fn load(&self) -> Result<Config, ConfigError> {
        self.load_with_flags(iter::empty())
    }

    /// Resolves the configuration with `flags` layered over the file and
    /// the environment, for example `["--port", "4000"]`.
    ///
    /// # Errors
    ///
    /// As [`ConfigFile::load`], and also when a flag is unknown or its value
    /// does not parse.
    pub fn load_with_flags<I>(&self, flags: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let args = [
            OsString::from("worldgated"),
            OsString::from(CONFIG_PATH_FLAG),
            self.path.clone().into_os_string(),
        ]
        .into_iter()
        .chain(flags);
        let config = Config::load_from_iter(args).map_err(|source| ConfigError::Layers {
            path: self.path.clone(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the defaults when the file does not exist yet.
    ///
    /// Returns whether the file was created.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigFile::save`] failures.
    pub fn ensure_exists(&self) -> Result<bool, ConfigError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&Config::default())?;
        Ok(true)
    }

    /// Resolves the configuration, writing the defaults first when absent.
    ///
    /// Returns the configuration and whether the file was created.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigFile::ensure_exists`] and [`ConfigFile::load`]
    /// failures.
    pub fn load_or_create(&self) -> Result<(Config, bool), ConfigError> {
        let created = self.ensure_exists()?;
        self.load().map(|config| (config, created))
    }

    /// Reads the document exactly as written, without environment or flag
    /// layers, so edits never persist an override.
    fn read_document(&self) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes `config` atomically, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Fails when the parent directory cannot be created or the temporary
    /// file cannot be written or renamed into place.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(config)?;
        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(write_error)?;
        let mut staged = NamedTempFile::new_in(&parent).map_err(write_error)?;
        staged
            .write_all(rendered.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(write_error)?;
        staged
            .persist(&self.path)
            .map_err(|error| write_error(error.error))?;
        Ok(())
    }

    /// Reads the document, applies `edit`, and saves the result.
    ///
    /// # Errors
    ///
    /// Propagates read, parse, validation, and save failures.
    pub fn update<F>(&self, edit: F) -> Result<Config, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.read_document()?;
        edit(&mut config);
        config.validate()?;
        self.save(&config)?;
        Ok(config)
    }
}
