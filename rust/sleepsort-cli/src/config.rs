//! Configuration file parsing for `sleepsort.toml`.
//!
//! Searches the current directory then its ancestors. With no file found the
//! built-in table and defaults are used.

use clap::ValueEnum;
use serde::Deserialize;
use sleepsort_runtime::{entities_from_pairs, Entity, SortError, Variant};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "sleepsort.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Which collectors to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VariantChoice {
    Unbuffered,
    Buffered,
    #[default]
    Both,
}

impl VariantChoice {
    /// Collectors to run, in output order.
    pub fn variants(self) -> Vec<Variant> {
        match self {
            VariantChoice::Unbuffered => vec![Variant::Unbuffered],
            VariantChoice::Buffered => vec![Variant::Buffered],
            VariantChoice::Both => Variant::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SleepSortConfig {
    #[serde(default)]
    pub sort: SortSection,
    /// `[[entity]]` tables. Replaces the built-in table when non-empty.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntitySpec>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SortSection {
    pub unit_ms: Option<u64>,
    pub variant: Option<VariantChoice>,
}

/// Raw entity row; the key is signed so negative input can be reported.
#[derive(Debug, Deserialize, Clone)]
pub struct EntitySpec {
    pub name: String,
    pub key: i64,
}

impl SleepSortConfig {
    /// Find `sleepsort.toml` in the current directory or an ancestor.
    pub fn discover() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let Ok(mut dir) = std::env::current_dir() else {
            return Ok(None);
        };
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let cfg = Self::load_from(&candidate)?;
                return Ok(Some((candidate, cfg)));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse config text; `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Entities to sort: the configured rows, or the built-in table.
    pub fn entities(&self) -> Result<Vec<Entity>, SortError> {
        if self.entities.is_empty() {
            return Ok(default_table());
        }
        entities_from_pairs(self.entities.iter().map(|e| (e.name.clone(), e.key)))
    }
}

/// Bite forces (PSI) of ten animals.
pub fn default_table() -> Vec<Entity> {
    [
        ("Lion", 600),
        ("Crocodile", 3500),
        ("Great White", 4000),
        ("Tiger", 1050),
        ("Hyena", 1100),
        ("Gorilla", 1300),
        ("Kangaroo", 200),
        ("Hippopotamus", 1825),
        ("Polar Bear", 1235),
        ("Wolf", 1200),
    ]
    .into_iter()
    .map(|(name, force)| Entity::new(name, force))
    .collect()
}
