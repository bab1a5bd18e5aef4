//! One chart: the store, the compositor (which owns the viewport), the
//! panel layout, the offload manager and the registered series.
//!
//! Series computation is split in two so the host can await it without
//! holding the chart: [`ChartInstance::compute_series`] returns an owned
//! future, [`ChartInstance::apply_computed`] stores whatever is still
//! relevant when it completes.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use super::series_registry::{PrePainted, SeriesEntry, SeriesRegistry, SeriesUpdate, target_panel};
use crate::domain::chart::{
    ChartOptions, OverlayData, PriceScale, Rect, Theme, Viewport, ViewportLimits, ViewportModel,
};
use crate::domain::errors::{ChartError, ChartResult, OffloadError};
use crate::domain::layout::{HitTarget, MAIN_PANEL_ID, PanelConfig, PanelLayoutManager, PanelPosition};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, UpsertKind, UpsertOutcome, WindowedStore};
use crate::domain::series::{DisplayKind, SeriesConfig, SeriesResult, SeriesStyle};
use crate::infrastructure::offload::{OffloadConfig, OffloadManager, PaintRequest};
use crate::infrastructure::rendering::renderers::volume::VOLUME_BAND_RATIO;
use crate::infrastructure::rendering::renderers::{
    BackgroundInput, CrosshairInput, IndicatorRenderInput, IndicatorStyle, OverlayRenderInput,
    PriceRenderInput, RenderFrame, RenderStats, VolumeRenderInput, indicator_scale,
    render_background, render_candles, render_crosshair, render_current_price, render_indicator,
    render_overlay, render_volume,
};
use crate::infrastructure::rendering::{
    Compositor, DrawTarget, FrameScheduler, FrameStats, LayerKind, PaintContext, Surface,
    SurfaceFactory, SurfacePainter,
};
use crate::{log_debug, log_info, log_trace, log_warn};

pub const BACKGROUND_SURFACE: &str = "background";
pub const PRICE_SURFACE: &str = "price";
pub const OVERLAY_SURFACE: &str = "overlay";
pub const INTERACTION_SURFACE: &str = "interaction";
const INDICATOR_SURFACE_PREFIX: &str = "indicators:";

/// Surface holding the indicator lines of one panel
pub fn indicator_surface_name(panel_id: &str) -> String {
    format!("{}{}", INDICATOR_SURFACE_PREFIX, panel_id)
}

/// Computation outcome for one series
#[derive(Debug)]
pub struct ComputedSeries {
    pub series_id: String,
    pub revision: u64,
    pub panel_id: String,
    pub outcome: ChartResult<(Arc<SeriesResult>, Option<PrePainted>)>,
}

/// Everything one [`ChartInstance::compute_series`] call produced
#[derive(Debug)]
pub struct ComputedBatch {
    data_revision: u64,
    items: Vec<ComputedSeries>,
}

impl ComputedBatch {
    pub fn items(&self) -> &[ComputedSeries] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct SeriesTarget {
    config: SeriesConfig,
    revision: u64,
    panel_id: String,
    style: IndicatorStyle,
}

pub struct ChartInstance {
    options: ChartOptions,
    theme: Theme,
    store: WindowedStore,
    /// Bumped on every effective data change
    data_revision: u64,
    compositor: Compositor,
    layout: PanelLayoutManager,
    /// Set by the layout manager's change callback
    layout_changed: Rc<Cell<bool>>,
    registry: SeriesRegistry,
    offload: OffloadManager,
    surfaces: Box<dyn SurfaceFactory>,
    overlays: OverlayData,
    crosshair: Option<(f64, f64)>,
    palette_cursor: usize,
    destroyed: bool,
}

impl std::fmt::Debug for ChartInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartInstance")
            .field("points", &self.store.len())
            .field("series", &self.registry.len())
            .field("compositor", &self.compositor)
            .field("offload", &self.offload)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl ChartInstance {
    /// Build the chart and its base surfaces. Any surface creation failure
    /// is returned and everything created so far is released.
    pub fn new(
        options: ChartOptions,
        theme: Theme,
        surfaces: Box<dyn SurfaceFactory>,
        scheduler: Box<dyn FrameScheduler>,
    ) -> ChartResult<Self> {
        options.validate()?;
        let offload = OffloadManager::new(OffloadConfig::from(&options));
        Self::with_offload(options, theme, surfaces, scheduler, offload)
    }

    /// Like [`ChartInstance::new`] with a caller-built offload manager
    pub fn with_offload(
        options: ChartOptions,
        theme: Theme,
        surfaces: Box<dyn SurfaceFactory>,
        scheduler: Box<dyn FrameScheduler>,
        offload: OffloadManager,
    ) -> ChartResult<Self> {
        options.validate()?;
        let viewport = ViewportModel::new(options.width, options.height, ViewportLimits::from(&options));
        let compositor = Compositor::new(viewport, scheduler);

        let mut layout = PanelLayoutManager::new(
            options.height,
            options.divider_height,
            options.main_panel_min_height,
        );
        let layout_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&layout_changed);
        layout.on_layout_change(move |_| flag.set(true));

        let mut chart = Self {
            store: WindowedStore::new(options.capacity),
            options,
            theme,
            data_revision: 0,
            compositor,
            layout,
            layout_changed,
            registry: SeriesRegistry::new(),
            offload,
            surfaces,
            overlays: OverlayData::default(),
            crosshair: None,
            palette_cursor: 0,
            destroyed: false,
        };

        let base = [
            (BACKGROUND_SURFACE.to_string(), LayerKind::Background),
            (PRICE_SURFACE.to_string(), LayerKind::Price),
            (indicator_surface_name(MAIN_PANEL_ID), LayerKind::Indicators),
            (OVERLAY_SURFACE.to_string(), LayerKind::Overlay),
            (INTERACTION_SURFACE.to_string(), LayerKind::Interaction),
        ];
        for (name, layer) in base {
            if let Err(err) = chart.create_surface(&name, layer) {
                chart.destroy();
                return Err(err);
            }
        }
        log_info!(
            LogComponent::Application("ChartInstance"),
            "created {}x{} chart, offload strategy: {}",
            chart.options.width,
            chart.options.height,
            chart.offload.strategy_name()
        );
        Ok(chart)
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn store(&self) -> &WindowedStore {
        &self.store
    }

    pub fn viewport(&self) -> Viewport {
        self.compositor.viewport().viewport()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn layout(&self) -> &PanelLayoutManager {
        &self.layout
    }

    pub fn offload(&self) -> &OffloadManager {
        &self.offload
    }

    pub fn series(&self, id: &str) -> Option<&SeriesEntry> {
        self.registry.get(id)
    }

    pub fn overlays(&self) -> &OverlayData {
        &self.overlays
    }

    pub fn crosshair(&self) -> Option<(f64, f64)> {
        self.crosshair
    }

    pub fn data_revision(&self) -> u64 {
        self.data_revision
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ---- data ----

    /// Replace all points
    pub fn set_candles(&mut self, candles: &[Candle]) -> ChartResult<UpsertOutcome> {
        self.ensure_alive()?;
        let outcome = self.store.replace(candles);
        self.after_data_change(outcome);
        Ok(outcome)
    }

    /// Merge points by timestamp: new times are inserted, existing ones
    /// overwritten
    pub fn append_candles(&mut self, candles: &[Candle]) -> ChartResult<UpsertOutcome> {
        self.ensure_alive()?;
        let outcome = self.store.upsert(candles);
        self.after_data_change(outcome);
        Ok(outcome)
    }

    fn after_data_change(&mut self, outcome: UpsertOutcome) {
        if outcome.rejected > 0 {
            log_warn!(
                LogComponent::Application("ChartInstance"),
                "skipped {} invalid candles",
                outcome.rejected
            );
        }
        if outcome.kind == UpsertKind::Unchanged {
            return;
        }
        self.data_revision += 1;
        if outcome.invalidates_indices() {
            self.offload.invalidate_for_data();
            self.registry.reset_results();
        }
        let len = self.store.len();
        self.compositor.with_viewport(|viewport| viewport.set_data_length(len));
        self.compositor.mark_all_dirty();
    }

    // ---- series ----

    /// Register a series. Unknown types and bad params are rejected here
    /// and leave the chart untouched.
    pub fn add_series(&mut self, config: SeriesConfig) -> ChartResult<()> {
        self.ensure_alive()?;
        if self.registry.contains(&config.id) {
            return Err(ChartError::Configuration(format!(
                "series '{}' already exists",
                config.id
            )));
        }
        let spec = config.parse()?;
        let panel_id = target_panel(&config)?;
        self.ensure_panel(&panel_id)?;

        let fallback = self.theme.palette_color(self.palette_cursor);
        self.palette_cursor += 1;
        let style = IndicatorStyle::resolve(&config.style, fallback, &self.theme);
        let id = config.id.clone();
        self.registry.insert(config, spec, panel_id.clone(), style)?;
        self.layout.add_series_to(&panel_id, &id);
        self.compositor.mark_layer_dirty(&indicator_surface_name(&panel_id), None);
        self.sync_layout();
        log_debug!(
            LogComponent::Application("ChartInstance"),
            "series '{}' added to panel '{}'",
            id,
            panel_id
        );
        Ok(())
    }

    /// Unregister a series. Its auxiliary panel goes away with its last
    /// member. Returns false for unknown ids.
    pub fn remove_series(&mut self, id: &str) -> bool {
        if self.destroyed {
            return false;
        }
        let Some(entry) = self.registry.remove(id) else {
            return false;
        };
        self.offload.forget_series(id);
        self.detach_from_panel(&entry.panel_id, id);
        self.sync_layout();
        true
    }

    pub fn update_series(&mut self, id: &str, update: SeriesUpdate) -> ChartResult<()> {
        self.ensure_alive()?;
        let entry = self
            .registry
            .get(id)
            .ok_or_else(|| ChartError::Configuration(format!("unknown series '{}'", id)))?;
        let next = update.apply(&entry.config);
        let spec = next.parse()?;
        let panel_id = target_panel(&next)?;
        let old_panel = entry.panel_id.clone();
        let fallback = entry.style.color;

        if panel_id != old_panel {
            self.ensure_panel(&panel_id)?;
            self.layout.add_series_to(&panel_id, id);
            self.detach_from_panel(&old_panel, id);
        }
        let style = IndicatorStyle::resolve(&next.style, fallback, &self.theme);
        let reset = update.touches_values();
        self.registry.replace(next, spec, panel_id.clone(), style, reset);
        if reset {
            self.offload.forget_series(id);
        }
        self.compositor.mark_layer_dirty(&indicator_surface_name(&panel_id), None);
        self.sync_layout();
        Ok(())
    }

    pub fn list_series(&self) -> Vec<SeriesConfig> {
        self.registry.configs()
    }

    pub fn clear_series(&mut self) {
        let ids: Vec<String> = self.registry.iter().map(|e| e.config.id.clone()).collect();
        for id in ids {
            self.remove_series(&id);
        }
    }

    /// Colour fallback and line width come from the theme when the style
    /// leaves them out
    pub fn set_series_style(&mut self, id: &str, style: SeriesStyle) -> ChartResult<()> {
        self.update_series(id, SeriesUpdate { style: Some(style), ..SeriesUpdate::default() })
    }

    /// Snapshot the data and every enabled series into an owned future.
    /// The future never borrows the chart.
    pub fn compute_series(&self) -> LocalBoxFuture<'static, ComputedBatch> {
        let data_revision = self.data_revision;
        if self.destroyed {
            return future::ready(ComputedBatch { data_revision, items: Vec::new() }).boxed_local();
        }
        let candles = self.store.snapshot();
        let targets: Vec<SeriesTarget> = self
            .registry
            .iter()
            .filter(|entry| entry.config.enabled)
            .map(|entry| SeriesTarget {
                config: entry.config.clone(),
                revision: entry.revision,
                panel_id: entry.panel_id.clone(),
                style: entry.style.clone(),
            })
            .collect();

        if !self.options.offload_paint {
            let configs: Vec<SeriesConfig> = targets.iter().map(|t| t.config.clone()).collect();
            let pending = self.offload.calculate_many(&configs, candles);
            return async move {
                let items = targets
                    .into_iter()
                    .zip(pending.await)
                    .map(|(target, outcome)| ComputedSeries {
                        series_id: target.config.id,
                        revision: target.revision,
                        panel_id: target.panel_id,
                        outcome: outcome.map(|result| (result, None)),
                    })
                    .collect();
                ComputedBatch { data_revision, items }
            }
            .boxed_local();
        }

        let viewport = self.viewport();
        let positions = self.layout.calculate_positions();
        let main_scale = main_position(&positions)
            .and_then(|main| main_price_scale(&self.store, &viewport, price_area(main, viewport.width)));
        let jobs: Vec<_> = targets
            .into_iter()
            .filter_map(|target| {
                let position = positions.iter().find(|p| p.panel_id == target.panel_id)?;
                let is_main = target.panel_id == MAIN_PANEL_ID;
                let bounds = if is_main {
                    price_area(position, viewport.width)
                } else {
                    panel_rect(position, viewport.width)
                };
                let request = PaintRequest {
                    viewport,
                    bounds,
                    style: target.style.clone(),
                    scale: if is_main { main_scale } else { None },
                };
                let pending = self.offload.compute_and_paint(&target.config, Arc::clone(&candles), request);
                Some(async move {
                    let outcome = pending.await.map(|(result, list)| {
                        let prepainted = list.map(|commands| PrePainted { viewport, bounds, commands });
                        (result, prepainted)
                    });
                    ComputedSeries {
                        series_id: target.config.id,
                        revision: target.revision,
                        panel_id: target.panel_id,
                        outcome,
                    }
                })
            })
            .collect();
        future::join_all(jobs)
            .map(move |items| ComputedBatch { data_revision, items })
            .boxed_local()
    }

    /// Store the outcomes that still apply: the chart is alive, the data is
    /// unchanged, the series still exists with the same revision and its
    /// panel is still there. Returns how many were stored.
    pub fn apply_computed(&mut self, batch: ComputedBatch) -> usize {
        if self.destroyed {
            return 0;
        }
        if batch.data_revision != self.data_revision {
            log_debug!(
                LogComponent::Application("ChartInstance"),
                "dropping {} results computed for stale data",
                batch.items.len()
            );
            return 0;
        }
        let mut applied = 0;
        for item in batch.items {
            if self.layout.panel(&item.panel_id).is_none() {
                continue;
            }
            if self.registry.get(&item.series_id).is_none_or(|e| e.panel_id != item.panel_id) {
                continue;
            }
            if let Err(err) = &item.outcome {
                log_warn!(
                    LogComponent::Application("ChartInstance"),
                    "series '{}' not shown: {}",
                    item.series_id,
                    err
                );
            }
            if self.registry.store(&item.series_id, item.revision, item.outcome) {
                applied += 1;
                self.compositor.mark_layer_dirty(&indicator_surface_name(&item.panel_id), None);
            }
        }
        applied
    }

    // ---- navigation ----

    /// Zoom by `1 + delta` around `anchor_x`, or the window midpoint
    pub fn zoom(&mut self, delta: f64, anchor_x: Option<f64>) {
        if self.destroyed {
            return;
        }
        self.compositor.with_viewport(|viewport| viewport.zoom(delta, anchor_x));
    }

    pub fn zoom_in(&mut self) {
        self.zoom(-self.options.zoom_step, None);
    }

    /// Exact inverse of [`ChartInstance::zoom_in`]
    pub fn zoom_out(&mut self) {
        self.zoom(ViewportModel::inverse_zoom_delta(-self.options.zoom_step), None);
    }

    pub fn reset_zoom_to_latest(&mut self) {
        if self.destroyed {
            return;
        }
        self.compositor.with_viewport(|viewport| viewport.reset_to_latest());
    }

    pub fn pan(&mut self, delta_indices: i64) {
        if self.destroyed {
            return;
        }
        self.compositor.with_viewport(|viewport| viewport.pan(delta_indices));
    }

    pub fn set_visible_range(&mut self, start: usize, end: usize) {
        if self.destroyed {
            return;
        }
        self.compositor.with_viewport(|viewport| viewport.set_visible_range(start, end));
    }

    // ---- interaction and overlays ----

    /// Move the crosshair. Only the interaction surface is damaged.
    pub fn set_crosshair(&mut self, x: f64, y: f64) {
        if self.destroyed || self.crosshair == Some((x, y)) {
            return;
        }
        self.crosshair = Some((x, y));
        self.compositor.mark_layer_dirty(INTERACTION_SURFACE, None);
    }

    pub fn clear_crosshair(&mut self) {
        if self.destroyed || self.crosshair.take().is_none() {
            return;
        }
        self.compositor.mark_layer_dirty(INTERACTION_SURFACE, None);
    }

    pub fn set_overlays(&mut self, overlays: OverlayData) {
        if self.destroyed || self.overlays == overlays {
            return;
        }
        self.overlays = overlays;
        self.compositor.mark_layer_dirty(OVERLAY_SURFACE, None);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.destroyed {
            return;
        }
        self.theme = theme;
        self.compositor.mark_all_dirty();
    }

    pub fn hit_test(&self, y: f64) -> Option<HitTarget> {
        self.layout.hit_test(y)
    }

    /// Move divider `index` by `delta` pixels. Rejected drags change
    /// nothing.
    pub fn drag_divider(&mut self, index: usize, delta: f64) -> bool {
        if self.destroyed {
            return false;
        }
        let moved = self.layout.drag_divider(index, delta);
        self.sync_layout();
        moved
    }

    // ---- lifecycle ----

    pub fn resize(&mut self, width: f64, height: f64) {
        if self.destroyed || !(width > 0.0 && height > 0.0) {
            return;
        }
        self.options.width = width;
        self.options.height = height;
        self.compositor.resize(width, height);
        self.layout.set_total_height(height);
        self.layout_changed.set(false);
    }

    /// Paint every dirty surface once
    pub fn run_frame(&mut self) -> FrameStats {
        if self.destroyed {
            return FrameStats::default();
        }
        let positions = self.layout.calculate_positions();
        let mut painter = ChartPainter {
            store: &self.store,
            registry: &self.registry,
            positions: &positions,
            theme: &self.theme,
            overlays: &self.overlays,
            crosshair: self.crosshair,
            divider_height: self.options.divider_height,
        };
        self.compositor.run_frame(&mut painter)
    }

    pub fn frame_pending(&self) -> bool {
        self.compositor.frame_pending()
    }

    /// One-time notice when the offload path gives up on its worker
    pub fn on_offload_fallback<F>(&self, callback: F)
    where
        F: FnOnce(&OffloadError) + 'static,
    {
        if self.destroyed {
            return;
        }
        self.offload.on_fallback(callback);
    }

    /// Release all surfaces, stop the worker and drop every listener.
    /// Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for name in self.compositor.destroy() {
            self.surfaces.release(&name);
        }
        self.offload.shutdown();
        self.layout.clear_subscribers();
        self.registry.clear();
        self.crosshair = None;
        log_info!(LogComponent::Application("ChartInstance"), "destroyed");
    }

    fn ensure_alive(&self) -> ChartResult<()> {
        if self.destroyed { Err(ChartError::Destroyed) } else { Ok(()) }
    }

    fn create_surface(&mut self, name: &str, layer: LayerKind) -> ChartResult<()> {
        let target = self.surfaces.create(name, layer, self.options.width, self.options.height)?;
        if let Err(err) = self.compositor.add_surface(Surface::new(name, layer, target)) {
            self.surfaces.release(name);
            return Err(err);
        }
        Ok(())
    }

    /// Create an auxiliary panel and its surface unless it exists
    fn ensure_panel(&mut self, panel_id: &str) -> ChartResult<()> {
        if self.layout.panel(panel_id).is_some() {
            return Ok(());
        }
        self.layout.add_panel(PanelConfig::auxiliary(
            panel_id,
            self.options.aux_panel_height,
            self.options.aux_panel_min_height,
        ))?;
        if let Err(err) = self.create_surface(&indicator_surface_name(panel_id), LayerKind::Indicators) {
            self.layout.remove_panel(panel_id);
            return Err(err);
        }
        Ok(())
    }

    fn detach_from_panel(&mut self, panel_id: &str, series_id: &str) {
        let surface = indicator_surface_name(panel_id);
        if self.layout.remove_series_from(panel_id, series_id) {
            self.compositor.remove_surface(&surface);
            self.surfaces.release(&surface);
        } else {
            self.compositor.mark_layer_dirty(&surface, None);
        }
    }

    /// Layout changes move every panel boundary
    fn sync_layout(&mut self) {
        if self.layout_changed.replace(false) {
            self.compositor.mark_all_dirty();
        }
    }
}

impl Drop for ChartInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn main_position(positions: &[PanelPosition]) -> Option<&PanelPosition> {
    positions.iter().find(|p| p.panel_id == MAIN_PANEL_ID)
}

fn panel_rect(position: &PanelPosition, width: f64) -> Rect {
    Rect::new(0.0, position.y, width, position.height)
}

/// Main panel minus the volume band
fn price_area(main: &PanelPosition, width: f64) -> Rect {
    Rect::new(0.0, main.y, width, main.height * (1.0 - VOLUME_BAND_RATIO))
}

fn main_price_scale(store: &WindowedStore, viewport: &Viewport, area: Rect) -> Option<PriceScale> {
    store
        .price_range_for(viewport.start_index, viewport.end_index)
        .map(|range| PriceScale::new(range, area.y, area.height))
}

/// Dispatches each surface to its renderers
struct ChartPainter<'a> {
    store: &'a WindowedStore,
    registry: &'a SeriesRegistry,
    positions: &'a [PanelPosition],
    theme: &'a Theme,
    overlays: &'a OverlayData,
    crosshair: Option<(f64, f64)>,
    divider_height: f64,
}

impl ChartPainter<'_> {
    fn main(&self) -> ChartResult<&PanelPosition> {
        main_position(self.positions).ok_or_else(|| ChartError::Configuration("main panel missing".into()))
    }

    fn paint_background(&self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<RenderStats> {
        let main = self.main()?;
        let input = BackgroundInput {
            frame: RenderFrame::new(&ctx.viewport, ctx.bounds, ctx.region),
            panels: self.positions,
            divider_height: self.divider_height,
            price_scale: main_price_scale(self.store, &ctx.viewport, price_area(main, ctx.bounds.width)),
            theme: self.theme,
        };
        Ok(render_background(target, &input))
    }

    fn paint_price(&self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<RenderStats> {
        let main = self.main()?;
        let viewport = &ctx.viewport;
        let area = price_area(main, ctx.bounds.width);
        let candles = self.store.slice(viewport.start_index, viewport.end_index + 1);
        let mut stats = RenderStats::default();
        if candles.is_empty() {
            return Ok(stats);
        }

        stats += render_volume(
            target,
            &VolumeRenderInput {
                candles,
                first_index: viewport.start_index,
                frame: RenderFrame::new(viewport, panel_rect(main, ctx.bounds.width), ctx.region),
                theme: self.theme,
            },
        );
        let Some(scale) = main_price_scale(self.store, viewport, area) else {
            return Ok(stats);
        };
        let frame = RenderFrame::new(viewport, area, ctx.region);
        stats += render_candles(
            target,
            &PriceRenderInput { candles, first_index: viewport.start_index, frame, scale, theme: self.theme },
        );
        stats += render_current_price(target, self.store.latest(), &frame, &scale, self.theme);
        Ok(stats)
    }

    fn paint_indicators(&self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<RenderStats> {
        let panel_id = ctx
            .name
            .strip_prefix(INDICATOR_SURFACE_PREFIX)
            .ok_or_else(|| ChartError::Configuration(format!("'{}' is not an indicator surface", ctx.name)))?;
        let position = self
            .positions
            .iter()
            .find(|p| p.panel_id == panel_id)
            .ok_or_else(|| ChartError::Configuration(format!("panel '{}' not in layout", panel_id)))?;
        let is_main = panel_id == MAIN_PANEL_ID;
        let bounds = if is_main {
            price_area(position, ctx.bounds.width)
        } else {
            panel_rect(position, ctx.bounds.width)
        };
        let main_scale = if is_main { main_price_scale(self.store, &ctx.viewport, bounds) } else { None };

        let mut stats = RenderStats::default();
        for entry in self.registry.in_panel(panel_id) {
            let Some(result) = entry.result.as_deref().filter(|_| entry.is_visible()) else {
                continue;
            };
            if let Some(pre) = &entry.prepainted
                && ctx.region.is_none()
                && pre.viewport == ctx.viewport
                && pre.bounds == bounds
            {
                pre.commands.replay(target);
                stats.draw_calls += pre.commands.draw_calls();
                continue;
            }
            let scale = match (is_main, entry.config.resolved_display()) {
                (true, Ok(DisplayKind::Overlay)) => main_scale,
                _ => indicator_scale(result, &ctx.viewport, bounds),
            };
            let Some(scale) = scale else {
                continue;
            };
            let input = IndicatorRenderInput {
                result,
                frame: RenderFrame::new(&ctx.viewport, bounds, ctx.region),
                scale,
                style: &entry.style,
            };
            stats += render_indicator(target, &input);
        }
        Ok(stats)
    }

    fn paint_overlay(&self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<RenderStats> {
        if self.overlays.is_empty() {
            return Ok(RenderStats::default());
        }
        let area = price_area(self.main()?, ctx.bounds.width);
        let Some(scale) = main_price_scale(self.store, &ctx.viewport, area) else {
            return Ok(RenderStats::default());
        };
        let input = OverlayRenderInput {
            overlays: self.overlays,
            frame: RenderFrame::new(&ctx.viewport, area, ctx.region),
            scale,
            theme: self.theme,
        };
        Ok(render_overlay(target, &input))
    }

    fn paint_crosshair(&self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<RenderStats> {
        let area = price_area(self.main()?, ctx.bounds.width);
        let label = match (self.crosshair, main_price_scale(self.store, &ctx.viewport, area)) {
            (Some((x, y)), Some(scale)) if area.contains_point(x, y) => {
                Some(format!("{:.2}", scale.y_to_price(y)))
            }
            _ => None,
        };
        let input = CrosshairInput {
            position: self.crosshair,
            frame: RenderFrame::new(&ctx.viewport, ctx.bounds, ctx.region),
            label,
            theme: self.theme,
        };
        Ok(render_crosshair(target, &input))
    }
}

impl SurfacePainter for ChartPainter<'_> {
    fn paint(&mut self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<()> {
        let stats = match ctx.layer {
            LayerKind::Background => self.paint_background(ctx, target)?,
            LayerKind::Price => self.paint_price(ctx, target)?,
            LayerKind::Indicators => self.paint_indicators(ctx, target)?,
            LayerKind::Overlay => self.paint_overlay(ctx, target)?,
            LayerKind::Interaction => self.paint_crosshair(ctx, target)?,
        };
        log_trace!(
            LogComponent::Application("ChartPainter"),
            "{}: drawn={} culled={} calls={}",
            ctx.name,
            stats.drawn,
            stats.culled,
            stats.draw_calls
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rendering::{DisplayListFactory, ManualScheduler};

    fn chart() -> ChartInstance {
        let options = ChartOptions { offload_enabled: false, ..ChartOptions::default() };
        ChartInstance::new(
            options,
            Theme::default(),
            Box::new(DisplayListFactory::default()),
            Box::new(ManualScheduler::new()),
        )
        .unwrap()
    }

    #[test]
    fn base_surfaces_in_paint_order() {
        let chart = chart();
        assert_eq!(
            chart.compositor().surface_names(),
            vec!["background", "price", "indicators:main", "overlay", "interaction"]
        );
    }

    #[test]
    fn auxiliary_series_gets_panel_and_surface() {
        let mut chart = chart();
        chart.add_series(SeriesConfig::new("rsi", "rsi")).unwrap();
        assert!(chart.layout().panel("rsi").is_some());
        assert!(chart.compositor().surface("indicators:rsi").is_some());

        assert!(chart.remove_series("rsi"));
        assert!(chart.layout().panel("rsi").is_none());
        assert!(chart.compositor().surface("indicators:rsi").is_none());
    }

    #[test]
    fn zoom_out_undoes_zoom_in() {
        let mut chart = chart();
        let candles: Vec<Candle> = (0..1000)
            .map(|i| Candle::from_values(i, 100.0, 101.0, 99.0, 100.5, 10.0))
            .collect();
        chart.set_candles(&candles).unwrap();
        let before = chart.viewport();
        chart.zoom_in();
        assert!(chart.viewport().visible_count() < before.visible_count());
        chart.zoom_out();
        let after = chart.viewport();
        assert!(after.start_index.abs_diff(before.start_index) <= 1);
        assert!(after.end_index.abs_diff(before.end_index) <= 1);
    }
}
