//! Repository configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::store::{InMemoryStore, DEFAULT_BATCH_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Entity property holding the document `_id`
    #[serde(default = "default_id_property")]
    pub id_property: String,

    /// Documents per cursor batch
    #[serde(default = "default_cursor_batch_size")]
    pub cursor_batch_size: usize,

    /// Largest page a caller may request
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Page size used when a paged method is called without a page
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON file of `{collection: [documents]}` seeding the store
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
}

fn default_id_property() -> String {
    "id".to_string()
}
fn default_cursor_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_max_page_size() -> u64 {
    1000
}
fn default_page_size() -> u64 {
    20
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            id_property: default_id_property(),
            cursor_batch_size: default_cursor_batch_size(),
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
            log_level: default_log_level(),
            fixtures: None,
        }
    }
}

impl RepositoryConfig {
    /// Reads and validates a configuration file
    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&content)?;

        let shown = path.display().to_string();
        log_event(
            Event::ConfigLoaded,
            &[("path", shown.as_str()), ("log_level", config.log_level.as_str())],
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> QueryResult<Self> {
        let config: RepositoryConfig = serde_json::from_str(content)
            .map_err(|e| QueryError::configuration(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.id_property.is_empty() {
            return Err(QueryError::configuration("id_property must not be empty"));
        }
        if self.cursor_batch_size == 0 {
            return Err(QueryError::configuration("cursor_batch_size must be > 0"));
        }
        if self.max_page_size == 0 {
            return Err(QueryError::configuration("max_page_size must be > 0"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(QueryError::configuration(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            )));
        }
        self.severity()?;
        Ok(())
    }

    pub fn severity(&self) -> QueryResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(QueryError::configuration)
    }

    /// Applies the configured log level to the process logger
    pub fn init_logging(&self) -> QueryResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }

    /// Builds an in-memory store seeded from the fixtures file, if any
    pub fn open_store(&self) -> QueryResult<InMemoryStore> {
        let store = InMemoryStore::with_batch_size(self.cursor_batch_size);
        let Some(path) = &self.fixtures else {
            return Ok(store);
        };

        let content = fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("failed to read fixtures {}: {}", path.display(), e))
        })?;
        let fixtures: BTreeMap<String, Vec<Value>> = serde_json::from_str(&content)
            .map_err(|e| QueryError::configuration(format!("invalid fixtures JSON: {}", e)))?;

        for (collection, documents) in fixtures {
            store.seed(&collection, documents)?;
        }
        Ok(store)
    }
}
