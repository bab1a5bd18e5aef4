use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::IndicatorKind;

/// Computed series, one value (or NaN) per store index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub id: String,
    pub kind: IndicatorKind,
    pub values: Vec<f64>,
    pub auxiliary_lines: BTreeMap<String, Vec<f64>>,
}

impl SeriesResult {
    pub fn new(id: impl Into<String>, kind: IndicatorKind, values: Vec<f64>) -> Self {
        Self { id: id.into(), kind, values, auxiliary_lines: BTreeMap::new() }
    }

    pub fn with_line(mut self, name: &str, values: Vec<f64>) -> Self {
        self.auxiliary_lines.insert(name.to_string(), values);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| v.is_finite())
    }

    /// Main line first, then auxiliary lines by name
    pub fn lines(&self) -> impl Iterator<Item = (&str, &[f64])> {
        std::iter::once(("main", self.values.as_slice()))
            .chain(self.auxiliary_lines.iter().map(|(name, values)| (name.as_str(), values.as_slice())))
    }

    /// Min/max over every line in `[start, end]`, ignoring NaN
    pub fn value_range(&self, start: usize, end: usize) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for (_, line) in self.lines() {
            let end = end.saturating_add(1).min(line.len());
            if start >= end {
                continue;
            }
            for &v in &line[start..end] {
                if v.is_finite() {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
        }
        (min.is_finite() && max.is_finite()).then_some((min, max))
    }
}
