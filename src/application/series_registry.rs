//! Registered indicator series and their latest computed state.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::chart::{Rect, Viewport};
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::layout::MAIN_PANEL_ID;
use crate::domain::series::{DisplayKind, IndicatorSpec, SeriesConfig, SeriesResult, SeriesStyle};
use crate::infrastructure::rendering::DisplayList;
use crate::infrastructure::rendering::renderers::IndicatorStyle;

/// Partial update for a registered series. Absent fields keep their value;
/// `params` entries are merged into the existing ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesUpdate {
    pub enabled: Option<bool>,
    pub display: Option<DisplayKind>,
    pub panel_id: Option<String>,
    pub params: BTreeMap<String, f64>,
    pub style: Option<SeriesStyle>,
}

impl SeriesUpdate {
    pub fn apply(&self, config: &SeriesConfig) -> SeriesConfig {
        let mut next = config.clone();
        if let Some(enabled) = self.enabled {
            next.enabled = enabled;
        }
        if let Some(display) = self.display {
            next.display = Some(display);
        }
        if let Some(panel_id) = &self.panel_id {
            next.panel_id = Some(panel_id.clone());
        }
        next.params.extend(self.params.iter().map(|(k, v)| (k.clone(), *v)));
        if let Some(style) = &self.style {
            next.style = style.clone();
        }
        next
    }

    /// Whether applying the update changes computed values
    pub fn touches_values(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Panel a series is drawn in: overlays share the main panel, auxiliary
/// series use their `panel_id` or get a panel named after themselves.
pub fn target_panel(config: &SeriesConfig) -> ChartResult<String> {
    Ok(match config.resolved_display()? {
        DisplayKind::Overlay => MAIN_PANEL_ID.to_string(),
        DisplayKind::Auxiliary => config.panel_id.clone().unwrap_or_else(|| config.id.clone()),
    })
}

/// Paint commands built off-thread, with the geometry they were built for
#[derive(Debug, Clone)]
pub struct PrePainted {
    pub viewport: Viewport,
    pub bounds: Rect,
    pub commands: DisplayList,
}

#[derive(Debug, Clone)]
pub struct SeriesEntry {
    pub config: SeriesConfig,
    pub spec: IndicatorSpec,
    pub panel_id: String,
    pub style: IndicatorStyle,
    /// Bumped on every change; stale computations compare against it
    pub revision: u64,
    pub result: Option<Arc<SeriesResult>>,
    pub prepainted: Option<PrePainted>,
    /// Last computation error. The series renders as absent while set.
    pub error: Option<String>,
}

impl SeriesEntry {
    pub fn is_visible(&self) -> bool {
        self.config.enabled && self.error.is_none() && self.result.is_some()
    }
}

/// Series in insertion order
#[derive(Debug, Default)]
pub struct SeriesRegistry {
    entries: Vec<SeriesEntry>,
    next_revision: u64,
}

impl SeriesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&SeriesEntry> {
        self.entries.iter().find(|e| e.config.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SeriesEntry> {
        self.entries.iter_mut().find(|e| e.config.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesEntry> {
        self.entries.iter()
    }

    pub fn configs(&self) -> Vec<SeriesConfig> {
        self.entries.iter().map(|e| e.config.clone()).collect()
    }

    /// Enabled series drawn in `panel_id`
    pub fn in_panel<'a>(&'a self, panel_id: &'a str) -> impl Iterator<Item = &'a SeriesEntry> + 'a {
        self.entries.iter().filter(move |e| e.panel_id == panel_id && e.config.enabled)
    }

    pub fn insert(
        &mut self,
        config: SeriesConfig,
        spec: IndicatorSpec,
        panel_id: String,
        style: IndicatorStyle,
    ) -> ChartResult<u64> {
        if self.contains(&config.id) {
            return Err(ChartError::Configuration(format!(
                "series '{}' already exists",
                config.id
            )));
        }
        let revision = self.bump();
        self.entries.push(SeriesEntry {
            config,
            spec,
            panel_id,
            style,
            revision,
            result: None,
            prepainted: None,
            error: None,
        });
        Ok(revision)
    }

    /// Replace a series' configuration, keeping its position. Computed
    /// state is kept unless `reset_values` is set.
    pub fn replace(
        &mut self,
        config: SeriesConfig,
        spec: IndicatorSpec,
        panel_id: String,
        style: IndicatorStyle,
        reset_values: bool,
    ) -> Option<u64> {
        let revision = self.bump();
        let entry = self.get_mut(&config.id)?;
        entry.config = config;
        entry.spec = spec;
        entry.panel_id = panel_id;
        entry.style = style;
        entry.revision = revision;
        entry.prepainted = None;
        if reset_values {
            entry.result = None;
            entry.error = None;
        }
        Some(revision)
    }

    pub fn remove(&mut self, id: &str) -> Option<SeriesEntry> {
        let index = self.entries.iter().position(|e| e.config.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) -> Vec<SeriesEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Forget computed values after the data layout changed
    pub fn reset_results(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.result = None;
            entry.prepainted = None;
        }
    }

    /// Store a computation outcome if `id` still has `revision`. Returns
    /// false for stale outcomes.
    pub fn store(
        &mut self,
        id: &str,
        revision: u64,
        outcome: ChartResult<(Arc<SeriesResult>, Option<PrePainted>)>,
    ) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        if entry.revision != revision {
            return false;
        }
        match outcome {
            Ok((result, prepainted)) => {
                entry.result = Some(result);
                entry.prepainted = prepainted;
                entry.error = None;
            }
            Err(err) => {
                entry.result = None;
                entry.prepainted = None;
                entry.error = Some(err.to_string());
            }
        }
        true
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{Color, Theme};
    use crate::domain::series::IndicatorKind;

    fn style() -> IndicatorStyle {
        IndicatorStyle::resolve(&SeriesStyle::default(), Color::from_hex(0xffffff), &Theme::default())
    }

    fn add(registry: &mut SeriesRegistry, config: SeriesConfig) -> u64 {
        let spec = config.parse().unwrap();
        let panel = target_panel(&config).unwrap();
        registry.insert(config, spec, panel, style()).unwrap()
    }

    #[test]
    fn panels_follow_display_kind() {
        let sma = SeriesConfig::new("sma20", "sma");
        let rsi = SeriesConfig::new("rsi14", "rsi");
        let shared = SeriesConfig::new("macd", "macd").with_panel("momentum");
        assert_eq!(target_panel(&sma).unwrap(), MAIN_PANEL_ID);
        assert_eq!(target_panel(&rsi).unwrap(), "rsi14");
        assert_eq!(target_panel(&shared).unwrap(), "momentum");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = SeriesRegistry::new();
        add(&mut registry, SeriesConfig::new("a", "sma"));
        let config = SeriesConfig::new("a", "ema");
        let spec = config.parse().unwrap();
        assert!(matches!(
            registry.insert(config, spec, MAIN_PANEL_ID.into(), style()),
            Err(ChartError::Configuration(_))
        ));
    }

    #[test]
    fn stale_outcomes_are_dropped() {
        let mut registry = SeriesRegistry::new();
        let first = add(&mut registry, SeriesConfig::new("a", "sma"));
        let config = SeriesUpdate { params: [("period".to_string(), 5.0)].into(), ..Default::default() }
            .apply(&registry.get("a").unwrap().config);
        let spec = config.parse().unwrap();
        registry.replace(config, spec, MAIN_PANEL_ID.into(), style(), true).unwrap();

        let result = Arc::new(SeriesResult::new("a", IndicatorKind::Sma, vec![1.0]));
        assert!(!registry.store("a", first, Ok((Arc::clone(&result), None))));
        assert!(registry.get("a").unwrap().result.is_none());

        let current = registry.get("a").unwrap().revision;
        assert!(registry.store("a", current, Ok((result, None))));
        assert!(registry.get("a").unwrap().is_visible());
    }

    #[test]
    fn failed_series_renders_absent() {
        let mut registry = SeriesRegistry::new();
        let revision = add(&mut registry, SeriesConfig::new("a", "sma"));
        registry.store("a", revision, Err(ChartError::Data("boom".into())));
        let entry = registry.get("a").unwrap();
        assert!(!entry.is_visible());
        assert_eq!(entry.error.as_deref(), Some("Data Error: boom"));
    }

    #[test]
    fn update_merges_params() {
        let config = SeriesConfig::new("m", "macd").with_param("fast", 8.0);
        let update = SeriesUpdate {
            enabled: Some(false),
            params: [("slow".to_string(), 30.0)].into(),
            ..Default::default()
        };
        let next = update.apply(&config);
        assert!(!next.enabled);
        assert_eq!(next.params.get("fast"), Some(&8.0));
        assert_eq!(next.params.get("slow"), Some(&30.0));
        assert!(update.touches_values());
    }
}
