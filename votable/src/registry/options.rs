use crate::errors::ConfigurationError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use votable_repository::is_identifier;
use votable_shared::types::{CacheColumns, RecordKind};

/// How the cache aggregation engine writes a batch of cache columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheableStrategy {
    /// Full-record save: bumps the timestamp column and honors the lock column.
    #[default]
    Update,
    /// Column-only write that leaves timestamps and lock versions alone.
    UpdateColumns,
}

impl FromStr for CacheableStrategy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "update" | "update_attributes" => Ok(CacheableStrategy::Update),
            "update_columns" => Ok(CacheableStrategy::UpdateColumns),
            other => Err(ConfigurationError::UnknownCacheableStrategy(other.to_owned())),
        }
    }
}

impl fmt::Display for CacheableStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheableStrategy::Update => f.write_str("update"),
            CacheableStrategy::UpdateColumns => f.write_str("update_columns"),
        }
    }
}

/// What happens to a votable's votes when the votable is destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependentStrategy {
    /// Deletes the votes one record at a time.
    Destroy,
    /// Deletes every vote with a single statement.
    #[default]
    DeleteAll,
}

impl FromStr for DependentStrategy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "destroy" => Ok(DependentStrategy::Destroy),
            "delete_all" => Ok(DependentStrategy::DeleteAll),
            other => Err(ConfigurationError::UnknownDependentStrategy(other.to_owned())),
        }
    }
}

/// Options a votable type is registered with.
///
/// Strategies are kept as strings until registration so options can come
/// straight from a config file:
///
/// ```json
/// { "kind": "Post", "table": "posts", "cacheable_strategy": "update_columns" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VotableOptions {
    pub kind: RecordKind,
    pub table: String,
    #[serde(default)]
    pub cache_columns: CacheColumns,
    #[serde(default)]
    pub cacheable_strategy: Option<String>,
    #[serde(default)]
    pub dependent: Option<String>,
    #[serde(default)]
    pub lock_column: Option<String>,
    #[serde(default)]
    pub timestamp_column: Option<String>,
}

impl VotableOptions {
    pub fn new(kind: impl Into<RecordKind>, table: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            table: table.into(),
            cache_columns: CacheColumns::new(),
            cacheable_strategy: None,
            dependent: None,
            lock_column: None,
            timestamp_column: None,
        }
    }

    pub fn cache_columns(mut self, cache_columns: CacheColumns) -> Self {
        self.cache_columns = cache_columns;
        self
    }

    pub fn cacheable_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.cacheable_strategy = Some(strategy.into());
        self
    }

    pub fn dependent(mut self, strategy: impl Into<String>) -> Self {
        self.dependent = Some(strategy.into());
        self
    }

    pub fn lock_column(mut self, column: impl Into<String>) -> Self {
        self.lock_column = Some(column.into());
        self
    }

    pub fn timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = Some(column.into());
        self
    }
}

/// A registered votable type with every option resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct VotableType {
    pub kind: RecordKind,
    pub table: String,
    pub cache_columns: CacheColumns,
    pub cacheable_strategy: CacheableStrategy,
    pub dependent: DependentStrategy,
    pub lock_column: Option<String>,
    pub timestamp_column: Option<String>,
}

impl TryFrom<VotableOptions> for VotableType {
    type Error = ConfigurationError;

    fn try_from(options: VotableOptions) -> Result<Self, Self::Error> {
        let cacheable_strategy = options
            .cacheable_strategy
            .as_deref()
            .map(CacheableStrategy::from_str)
            .transpose()?
            .unwrap_or_default();
        let dependent = options
            .dependent
            .as_deref()
            .map(DependentStrategy::from_str)
            .transpose()?
            .unwrap_or_default();

        ensure_identifier("table", &options.table, true)?;
        for scope in options.cache_columns.scopes() {
            ensure_identifier("scope", scope, false)?;
        }
        for column in options.lock_column.iter().chain(options.timestamp_column.iter()) {
            ensure_identifier("column", column, false)?;
        }

        Ok(VotableType {
            kind: options.kind,
            table: options.table,
            cache_columns: options.cache_columns,
            cacheable_strategy,
            dependent,
            lock_column: options.lock_column,
            timestamp_column: options.timestamp_column,
        })
    }
}

fn ensure_identifier(field: &'static str, value: &str, qualified: bool) -> Result<(), ConfigurationError> {
    if is_identifier(value) && (qualified || !value.contains('.')) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidIdentifier {
            field,
            value: value.to_owned(),
        })
    }
}
