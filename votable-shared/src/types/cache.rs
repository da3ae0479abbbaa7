//! Descriptors for the optional denormalized vote columns of a votable table.
use crate::types::VotableRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const GLOBAL_PREFIX: &str = "cached_";
const SCOPED_PREFIX: &str = "cached_scoped_";

/// One aggregate that a votable table may mirror in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheField {
    VotesTotal,
    VotesUp,
    VotesDown,
    VotesScore,
    WeightedTotal,
    WeightedScore,
    WeightedAverage,
}

impl CacheField {
    pub const ALL: [CacheField; 7] = [
        CacheField::VotesTotal,
        CacheField::VotesUp,
        CacheField::VotesDown,
        CacheField::VotesScore,
        CacheField::WeightedTotal,
        CacheField::WeightedScore,
        CacheField::WeightedAverage,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            CacheField::VotesTotal => "votes_total",
            CacheField::VotesUp => "votes_up",
            CacheField::VotesDown => "votes_down",
            CacheField::VotesScore => "votes_score",
            CacheField::WeightedTotal => "weighted_total",
            CacheField::WeightedScore => "weighted_score",
            CacheField::WeightedAverage => "weighted_average",
        }
    }

    /// Column name for this field, e.g. `cached_votes_up` or
    /// `cached_scoped_weekly_votes_up`.
    pub fn column(self, scope: Option<&str>) -> String {
        match scope {
            None => format!("{GLOBAL_PREFIX}{}", self.suffix()),
            Some(scope) => format!("{SCOPED_PREFIX}{scope}_{}", self.suffix()),
        }
    }

    /// Recognizes a cache column name. Anything else yields `None`.
    pub fn parse_column(column: &str) -> Option<(CacheField, Option<String>)> {
        if let Some(rest) = column.strip_prefix(SCOPED_PREFIX) {
            for field in Self::ALL {
                if let Some(scope) = rest.strip_suffix(field.suffix()).and_then(|s| s.strip_suffix('_')) {
                    if !scope.is_empty() {
                        return Some((field, Some(scope.to_owned())));
                    }
                }
            }
            return None;
        }
        let rest = column.strip_prefix(GLOBAL_PREFIX)?;
        Self::ALL
            .into_iter()
            .find(|field| field.suffix() == rest)
            .map(|field| (field, None))
    }

    pub fn is_average(self) -> bool {
        matches!(self, CacheField::WeightedAverage)
    }
}

/// The value held by a cache column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Count(i64),
    Average(f64),
}

impl CacheValue {
    pub fn as_i64(self) -> i64 {
        match self {
            CacheValue::Count(n) => n,
            CacheValue::Average(avg) => avg as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            CacheValue::Count(n) => n as f64,
            CacheValue::Average(avg) => avg,
        }
    }
}

/// A field together with the scope it is kept for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub field: CacheField,
    pub scope: Option<String>,
}

impl CacheKey {
    pub fn global(field: CacheField) -> Self {
        Self { field, scope: None }
    }

    pub fn scoped(field: CacheField, scope: impl Into<String>) -> Self {
        Self {
            field,
            scope: Some(scope.into()),
        }
    }

    pub fn column(&self) -> String {
        self.field.column(self.scope.as_deref())
    }
}

/// The set of cache columns a votable type actually has.
///
/// Resolved once when the type is registered; absent columns are neither
/// computed nor read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheColumns {
    global: BTreeSet<CacheField>,
    scoped: BTreeMap<String, BTreeSet<CacheField>>,
}

impl CacheColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// All seven global columns.
    pub fn all_global() -> Self {
        Self {
            global: CacheField::ALL.into_iter().collect(),
            scoped: BTreeMap::new(),
        }
    }

    /// Picks the cache columns out of a table's column list, ignoring the rest.
    pub fn from_column_names<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cache_columns = Self::new();
        for column in columns {
            match CacheField::parse_column(column.as_ref()) {
                Some((field, None)) => cache_columns.insert_global(field),
                Some((field, Some(scope))) => cache_columns.insert_scoped(scope, field),
                None => {}
            }
        }
        cache_columns
    }

    pub fn with_global(mut self, field: CacheField) -> Self {
        self.insert_global(field);
        self
    }

    pub fn with_scoped(mut self, scope: impl Into<String>, field: CacheField) -> Self {
        self.insert_scoped(scope, field);
        self
    }

    /// All seven columns for one scope.
    pub fn with_all_scoped(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        for field in CacheField::ALL {
            self.insert_scoped(scope.clone(), field);
        }
        self
    }

    pub fn insert_global(&mut self, field: CacheField) {
        self.global.insert(field);
    }

    pub fn insert_scoped(&mut self, scope: impl Into<String>, field: CacheField) {
        self.scoped.entry(scope.into()).or_default().insert(field);
    }

    pub fn has(&self, field: CacheField, scope: Option<&str>) -> bool {
        match scope {
            None => self.global.contains(&field),
            Some(scope) => self.scoped.get(scope).is_some_and(|fields| fields.contains(&field)),
        }
    }

    /// Fields present for the given scope, in declaration order.
    pub fn fields_for(&self, scope: Option<&str>) -> Vec<CacheField> {
        CacheField::ALL
            .into_iter()
            .filter(|field| self.has(*field, scope))
            .collect()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scoped.keys().map(String::as_str)
    }

    /// Every column name, global ones first.
    pub fn column_names(&self) -> Vec<String> {
        let global = self.global.iter().map(|field| field.column(None));
        let scoped = self
            .scoped
            .iter()
            .flat_map(|(scope, fields)| fields.iter().map(move |field| field.column(Some(scope))));
        global.chain(scoped).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.scoped.values().all(BTreeSet::is_empty)
    }
}

/// In-memory copy of a votable record's cache column values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    values: BTreeMap<CacheKey, CacheValue>,
}

impl CacheSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CacheField, scope: Option<&str>) -> Option<CacheValue> {
        let key = CacheKey {
            field,
            scope: scope.map(str::to_owned),
        };
        self.values.get(&key).copied()
    }

    pub fn set(&mut self, key: CacheKey, value: CacheValue) {
        self.values.insert(key, value);
    }

    pub fn with(mut self, key: CacheKey, value: CacheValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn apply(&mut self, updates: &[(CacheKey, CacheValue)]) {
        for (key, value) in updates {
            self.set(key.clone(), *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &CacheValue)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Version check guarding a full-record save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticLock {
    pub column: String,
    pub expected: i64,
}

/// One batch of cache column updates for a single votable record.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheWrite {
    pub table: String,
    pub target: VotableRef,
    pub updates: Vec<(CacheKey, CacheValue)>,
    /// Timestamp column bumped alongside the cache columns, if any.
    pub touch_column: Option<String>,
    pub lock: Option<OptimisticLock>,
}
