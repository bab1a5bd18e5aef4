use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::series::{IndicatorKind, SeriesConfig, SeriesResult};

/// Content address of a computed series: same id, family, params and data
/// length means the same values, whichever request produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub series_id: String,
    pub kind: IndicatorKind,
    pub params: String,
    pub data_len: usize,
}

impl CacheKey {
    pub fn new(config: &SeriesConfig, kind: IndicatorKind, data_len: usize) -> Self {
        Self { series_id: config.id.clone(), kind, params: config.params_key(), data_len }
    }
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, Arc<SeriesResult>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<SeriesResult>> {
        self.entries.get(key).cloned()
    }

    /// Keys are content-addressed, so a late response only rewrites an
    /// entry with equal values.
    pub fn insert(&mut self, key: CacheKey, result: Arc<SeriesResult>) {
        self.entries.insert(key, result);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry of one series
    pub fn remove_series(&mut self, series_id: &str) {
        self.entries.retain(|key, _| key.series_id != series_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
