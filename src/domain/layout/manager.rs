use super::panel::{HitTarget, PanelConfig, PanelKind, PanelPosition};
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_warn};

/// Tolerance for the pair rule of divider drags
const DRAG_EPSILON: f64 = 0.5;

type LayoutCallback = Box<dyn FnMut(&[PanelPosition])>;

/// Vertical partitioning of the chart into the main panel and stacked
/// auxiliary panels.
///
/// Invariant: `sum(heights) + dividers * (panels - 1) == total_height`.
/// Changes are pushed to subscribers; the manager never holds a reference
/// back into whoever consumes the layout.
pub struct PanelLayoutManager {
    panels: Vec<PanelConfig>,
    total_height: f64,
    divider_height: f64,
    subscribers: Vec<LayoutCallback>,
}

impl std::fmt::Debug for PanelLayoutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelLayoutManager")
            .field("panels", &self.panels)
            .field("total_height", &self.total_height)
            .field("divider_height", &self.divider_height)
            .finish()
    }
}

impl PanelLayoutManager {
    pub fn new(total_height: f64, divider_height: f64, main_min_height: f64) -> Self {
        let total_height = total_height.max(0.0);
        Self {
            panels: vec![PanelConfig::main(total_height, main_min_height.min(total_height))],
            total_height,
            divider_height: divider_height.max(0.0),
            subscribers: Vec::new(),
        }
    }

    pub fn panels(&self) -> &[PanelConfig] {
        &self.panels
    }

    pub fn panel(&self, id: &str) -> Option<&PanelConfig> {
        self.panels.iter().find(|p| p.id == id)
    }

    pub fn main_panel(&self) -> &PanelConfig {
        &self.panels[0]
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn total_height(&self) -> f64 {
        self.total_height
    }

    pub fn divider_height(&self) -> f64 {
        self.divider_height
    }

    /// Subscribe to layout changes; called with the new positions
    pub fn on_layout_change<F>(&mut self, callback: F)
    where
        F: FnMut(&[PanelPosition]) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    /// Append an auxiliary panel at the bottom. Its height is taken from the
    /// main panel, shrunk if needed so the main panel keeps its minimum.
    pub fn add_panel(&mut self, mut config: PanelConfig) -> ChartResult<()> {
        if config.kind == PanelKind::Main {
            return Err(ChartError::Configuration("only one main panel is allowed".into()));
        }
        if self.panel(&config.id).is_some() {
            return Err(ChartError::Configuration(format!("panel '{}' already exists", config.id)));
        }

        let main = &self.panels[0];
        let available = main.height - main.min_height - self.divider_height;
        let wanted = config.clamp_height(config.height);
        let height = wanted.min(available);
        if height < config.min_height {
            return Err(ChartError::Configuration(format!(
                "no room for panel '{}': {:.1}px available, {:.1}px required",
                config.id, available, config.min_height
            )));
        }

        config.height = height;
        self.panels[0].height -= height + self.divider_height;
        log_debug!(
            LogComponent::Domain("PanelLayout"),
            "added panel '{}' ({:.1}px)",
            config.id,
            height
        );
        self.panels.push(config);
        self.notify();
        Ok(())
    }

    /// Remove an auxiliary panel, returning its height plus one divider to
    /// the main panel. No-op for the main panel or unknown ids.
    pub fn remove_panel(&mut self, id: &str) -> bool {
        let Some(index) = self.panels.iter().position(|p| p.id == id && !p.is_main()) else {
            return false;
        };
        let removed = self.panels.remove(index);
        self.panels[0].height += removed.height + self.divider_height;
        log_debug!(LogComponent::Domain("PanelLayout"), "removed panel '{}'", id);
        self.notify();
        true
    }

    /// Grow or shrink a panel. Auxiliary panels trade height with the main
    /// panel; the main panel trades with the panel below it.
    pub fn resize_panel(&mut self, id: &str, delta: f64) -> bool {
        let Some(index) = self.panels.iter().position(|p| p.id == id) else {
            return false;
        };
        if index == 0 {
            return self.panels.len() > 1 && self.drag_divider(0, delta);
        }

        let panel = &self.panels[index];
        let target = panel.clamp_height(panel.height + delta);
        let applied = target - panel.height;
        let main = &self.panels[0];
        let main_target = main.height - applied;
        if applied == 0.0 || main_target < main.min_height || main_target > main.max_height {
            return false;
        }
        self.panels[index].height = target;
        self.panels[0].height = main_target;
        self.notify();
        true
    }

    pub fn add_series_to(&mut self, panel_id: &str, series_id: &str) -> bool {
        let Some(panel) = self.panels.iter_mut().find(|p| p.id == panel_id) else {
            return false;
        };
        if !panel.has_series(series_id) {
            panel.member_series_ids.push(series_id.to_string());
        }
        true
    }

    /// Detach a series. Returns `true` when this emptied and deleted an
    /// auxiliary panel.
    pub fn remove_series_from(&mut self, panel_id: &str, series_id: &str) -> bool {
        let Some(panel) = self.panels.iter_mut().find(|p| p.id == panel_id) else {
            return false;
        };
        panel.member_series_ids.retain(|s| s != series_id);
        if panel.is_main() || !panel.member_series_ids.is_empty() {
            return false;
        }
        self.remove_panel(panel_id)
    }

    /// Panels top to bottom with a divider between consecutive panels
    pub fn calculate_positions(&self) -> Vec<PanelPosition> {
        let mut y = 0.0;
        let mut positions = Vec::with_capacity(self.panels.len());
        for (i, panel) in self.panels.iter().enumerate() {
            if i > 0 {
                y += self.divider_height;
            }
            positions.push(PanelPosition {
                panel_id: panel.id.clone(),
                kind: panel.kind,
                y,
                height: panel.height,
            });
            y += panel.height;
        }
        positions
    }

    pub fn position_of(&self, id: &str) -> Option<PanelPosition> {
        self.calculate_positions().into_iter().find(|p| p.panel_id == id)
    }

    pub fn hit_test(&self, y: f64) -> Option<HitTarget> {
        let positions = self.calculate_positions();
        for (i, position) in positions.iter().enumerate() {
            if position.contains_y(y) {
                return Some(HitTarget::Panel(position.panel_id.clone()));
            }
            let divider_end = position.bottom() + self.divider_height;
            if i + 1 < positions.len() && y >= position.bottom() && y < divider_end {
                return Some(HitTarget::Divider(i));
            }
        }
        None
    }

    /// Drag the divider between panel `index` and `index + 1` by `delta`
    /// pixels (positive moves it down). Both neighbours are clamped to their
    /// own bounds; if the clamped changes do not cancel out the drag is
    /// rejected and nothing changes.
    pub fn drag_divider(&mut self, index: usize, delta: f64) -> bool {
        if index + 1 >= self.panels.len() || !delta.is_finite() {
            return false;
        }
        let above = &self.panels[index];
        let below = &self.panels[index + 1];
        let above_target = above.clamp_height(above.height + delta);
        let below_target = below.clamp_height(below.height - delta);
        let above_change = above_target - above.height;
        let below_change = below_target - below.height;

        if (above_change + below_change).abs() > DRAG_EPSILON {
            log_warn!(
                LogComponent::Domain("PanelLayout"),
                "divider {} drag by {:.1} rejected ({:+.1} vs {:+.1})",
                index,
                delta,
                above_change,
                below_change
            );
            return false;
        }
        if above_change == 0.0 {
            return false;
        }

        // keep the pair sum exact
        let pair = above.height + below.height;
        self.panels[index].height = above_target;
        self.panels[index + 1].height = pair - above_target;
        self.notify();
        true
    }

    /// Chart resize: the main panel absorbs the change. When it would drop
    /// below its minimum, auxiliary panels shrink toward theirs, bottom up.
    pub fn set_total_height(&mut self, total_height: f64) {
        let total_height = total_height.max(0.0);
        let change = total_height - self.total_height;
        if change == 0.0 {
            return;
        }
        self.total_height = total_height;
        self.panels[0].height += change;

        let mut deficit = self.panels[0].min_height - self.panels[0].height;
        for panel in self.panels.iter_mut().skip(1).rev() {
            if deficit <= 0.0 {
                break;
            }
            let spare = (panel.height - panel.min_height).max(0.0);
            let take = spare.min(deficit);
            panel.height -= take;
            deficit -= take;
        }
        if deficit > 0.0 {
            self.panels[0].height = (self.panels[0].min_height - deficit).max(0.0);
        } else {
            self.panels[0].height = self.panels[0].height.max(self.panels[0].min_height);
        }
        self.notify();
    }

    /// `sum(heights) + dividers` as laid out
    pub fn used_height(&self) -> f64 {
        let dividers = self.panels.len().saturating_sub(1) as f64 * self.divider_height;
        self.panels.iter().map(|p| p.height).sum::<f64>() + dividers
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let positions = self.calculate_positions();
        for callback in self.subscribers.iter_mut() {
            callback(&positions);
        }
    }
}

impl Default for PanelLayoutManager {
    fn default() -> Self {
        Self::new(600.0, crate::domain::chart::DIVIDER_HEIGHT, 120.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layout::panel::MAIN_PANEL_ID;

    #[test]
    fn main_panel_cannot_be_removed() {
        let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
        assert!(!layout.remove_panel(MAIN_PANEL_ID));
        assert_eq!(layout.panel_count(), 1);
    }

    #[test]
    fn add_panel_takes_height_from_main() {
        let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
        assert!(layout.add_panel(PanelConfig::auxiliary("rsi", 120.0, 40.0)).is_ok());
        assert_eq!(layout.main_panel().height, 476.0);
        assert_eq!(layout.used_height(), 600.0);
    }

    #[test]
    fn duplicate_panel_is_rejected() {
        let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
        assert!(layout.add_panel(PanelConfig::auxiliary("a", 100.0, 40.0)).is_ok());
        assert!(layout.add_panel(PanelConfig::auxiliary("a", 100.0, 40.0)).is_err());
    }

    #[test]
    fn shrink_keeps_minimums_when_possible() {
        let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
        assert!(layout.add_panel(PanelConfig::auxiliary("a", 200.0, 40.0)).is_ok());
        layout.set_total_height(300.0);
        assert_eq!(layout.main_panel().height, 100.0);
        assert_eq!(layout.used_height(), 300.0);
    }
}
