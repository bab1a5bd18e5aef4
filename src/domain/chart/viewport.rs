//! Viewport model: visible index window, zoom scale and pixel mapping.
//!
//! Every mutator funnels through [`ViewportModel::apply_and_validate`], which
//! clamps the window, enforces the minimum window, derives the point width
//! and notifies listeners only when the resulting viewport differs from the
//! last one they saw.

use super::options::{ChartOptions, MAX_POINT_WIDTH, MIN_POINT_WIDTH, MIN_VISIBLE};
use super::value_objects::Viewport;
use crate::domain::logging::LogComponent;
use crate::log_trace;

/// Largest zoom-in step accepted in one call
const MAX_ZOOM_IN_DELTA: f64 = -0.9;

pub type ListenerId = u64;
type ViewportListener = Box<dyn FnMut(&Viewport)>;

/// Bounds enforced on every viewport update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportLimits {
    pub min_visible: usize,
    pub min_point_width: f64,
    pub max_point_width: f64,
    /// Window shown when data first arrives
    pub initial_visible: usize,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self {
            min_visible: MIN_VISIBLE,
            min_point_width: MIN_POINT_WIDTH,
            max_point_width: MAX_POINT_WIDTH,
            initial_visible: 120,
        }
    }
}

impl From<&ChartOptions> for ViewportLimits {
    fn from(options: &ChartOptions) -> Self {
        Self {
            min_visible: options.min_visible,
            min_point_width: options.min_point_width,
            max_point_width: options.max_point_width,
            initial_visible: options.initial_visible,
        }
    }
}

pub struct ViewportModel {
    viewport: Viewport,
    data_length: usize,
    limits: ViewportLimits,
    // unrounded window kept between zoom steps so inverse zooms line up
    precise_start: f64,
    precise_end: f64,
    listeners: Vec<(ListenerId, ViewportListener)>,
    next_listener_id: ListenerId,
    last_notified: Option<Viewport>,
    revision: u64,
}

impl std::fmt::Debug for ViewportModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportModel")
            .field("viewport", &self.viewport)
            .field("data_length", &self.data_length)
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl ViewportModel {
    pub fn new(width: f64, height: f64, limits: ViewportLimits) -> Self {
        let viewport = Viewport { width, height, ..Viewport::default() };
        Self {
            viewport,
            data_length: 0,
            limits,
            precise_start: 0.0,
            precise_end: 0.0,
            listeners: Vec::new(),
            next_listener_id: 1,
            last_notified: None,
            revision: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn data_length(&self) -> usize {
        self.data_length
    }

    pub fn limits(&self) -> ViewportLimits {
        self.limits
    }

    /// Bumped once per delivered change notification
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The delta that exactly undoes `zoom(delta)`
    pub fn inverse_zoom_delta(delta: f64) -> f64 {
        -delta / (1.0 + delta)
    }

    /// Register a listener; it is called once right away with the current
    /// viewport and then after every effective change.
    pub fn add_listener<F>(&mut self, mut listener: F) -> ListenerId
    where
        F: FnMut(&Viewport) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        listener(&self.viewport);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Update the number of stored points. A window showing the latest point
    /// keeps following new data.
    pub fn set_data_length(&mut self, length: usize) {
        let old_length = self.data_length;
        self.data_length = length;

        if length == 0 {
            self.apply_and_validate(0.0, 0.0);
            return;
        }

        if old_length == 0 {
            let end = (length - 1) as f64;
            let span = self.limits.initial_visible.max(1) as f64 - 1.0;
            self.apply_and_validate(end - span, end);
            return;
        }

        let was_at_latest = self.viewport.end_index + 1 >= old_length;
        if was_at_latest && length > old_length {
            let shift = (length - old_length) as f64;
            self.apply_and_validate(self.precise_start + shift, self.precise_end + shift);
        } else {
            self.apply_and_validate(self.precise_start, self.precise_end);
        }
    }

    /// Zoom by `factor = 1 + delta` (negative zooms in). With an anchor pixel
    /// the index under that pixel stays put; otherwise the window scales
    /// around its midpoint.
    pub fn zoom(&mut self, delta: f64, pixel_center: Option<f64>) {
        if self.data_length == 0 || !delta.is_finite() {
            return;
        }
        let factor = 1.0 + delta.max(MAX_ZOOM_IN_DELTA);
        let start = self.precise_start;
        let end = self.precise_end;

        let (new_start, new_end) = match pixel_center {
            None => {
                let center = (start + end) / 2.0;
                let new_span = (end - start) * factor;
                (center - new_span / 2.0, center + new_span / 2.0)
            }
            Some(px) => {
                // anchor on the painted mapping, which uses the rounded window and clamped scale
                let px = px.clamp(0.0, self.viewport.width);
                let anchor = self.viewport.x_to_fractional_index(px);
                let new_count = (end - start + 1.0) * factor;
                let new_scale = (self.viewport.width / new_count)
                    .clamp(self.limits.min_point_width, self.limits.max_point_width);
                let new_start = anchor - px / new_scale;
                (new_start, new_start + new_count - 1.0)
            }
        };

        log_trace!(
            LogComponent::Domain("Viewport"),
            "zoom delta={:.3} anchor={:?} -> [{:.2}, {:.2}]",
            delta,
            pixel_center,
            new_start,
            new_end
        );
        self.apply_and_validate(new_start, new_end);
    }

    /// Shift the window by whole points, keeping its width
    pub fn pan(&mut self, delta_indices: i64) {
        let delta = delta_indices as f64;
        self.apply_and_validate(self.precise_start + delta, self.precise_end + delta);
    }

    pub fn go_to_latest(&mut self) {
        if self.data_length == 0 {
            return;
        }
        let span = self.precise_end - self.precise_start;
        let end = (self.data_length - 1) as f64;
        self.apply_and_validate(end - span, end);
    }

    /// Initial zoom level, anchored on the latest point
    pub fn reset_to_latest(&mut self) {
        if self.data_length == 0 {
            return;
        }
        let end = (self.data_length - 1) as f64;
        let span = self.limits.initial_visible.max(1) as f64 - 1.0;
        self.apply_and_validate(end - span, end);
    }

    pub fn go_to_start(&mut self) {
        let span = self.precise_end - self.precise_start;
        self.apply_and_validate(0.0, span);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width.max(1.0);
        self.viewport.height = height.max(1.0);
        self.apply_and_validate(self.precise_start, self.precise_end);
    }

    pub fn set_visible_range(&mut self, start: usize, end: usize) {
        let (a, b) = if start <= end { (start, end) } else { (end, start) };
        self.apply_and_validate(a as f64, b as f64);
    }

    pub fn index_to_x(&self, index: usize) -> f64 {
        self.viewport.index_to_x(index as f64)
    }

    /// Point under pixel `x`, clamped to the visible window
    pub fn x_to_index(&self, x: f64) -> usize {
        let raw = self.viewport.x_to_fractional_index(x).floor();
        let lo = self.viewport.start_index as f64;
        let hi = self.viewport.end_index as f64;
        raw.clamp(lo, hi) as usize
    }

    /// The single validation step behind every mutator.
    fn apply_and_validate(&mut self, start: f64, end: f64) {
        let width = self.viewport.width;
        let next = if self.data_length == 0 {
            self.precise_start = 0.0;
            self.precise_end = 0.0;
            Viewport {
                start_index: 0,
                end_index: 0,
                scale: self.limits.max_point_width,
                offset: 0.0,
                width,
                height: self.viewport.height,
            }
        } else {
            let (s, e) = self.clamp_window(start, end);
            self.precise_start = s;
            self.precise_end = e;

            let max_index = self.data_length - 1;
            let min_span = self.limits.min_visible.min(max_index);
            let mut start_index = s.round().max(0.0) as usize;
            let mut end_index = (e.round().max(0.0) as usize).min(max_index);
            if end_index < start_index + min_span {
                end_index = (start_index + min_span).min(max_index);
                start_index = end_index - min_span;
            }

            let count = (end_index - start_index + 1) as f64;
            let scale =
                (width / count).clamp(self.limits.min_point_width, self.limits.max_point_width);
            Viewport {
                start_index,
                end_index,
                scale,
                offset: -(start_index as f64) * scale,
                width,
                height: self.viewport.height,
            }
        };

        self.viewport = next;
        if self.last_notified != Some(next) {
            self.last_notified = Some(next);
            self.revision += 1;
            for (_, listener) in self.listeners.iter_mut() {
                listener(&next);
            }
        }
    }

    /// Clamp a fractional window into the data range, enforcing the minimum
    /// window and the widest window that still fits at minimum point width.
    fn clamp_window(&self, start: f64, end: f64) -> (f64, f64) {
        let max_index = (self.data_length - 1) as f64;
        let min_span = (self.limits.min_visible as f64).min(max_index);
        let fit_count = (self.viewport.width / self.limits.min_point_width)
            .floor()
            .max(self.limits.min_visible as f64 + 1.0);
        let max_span = max_index.min(fit_count - 1.0);

        let (mut s, mut e) = if start.is_finite() && end.is_finite() {
            (start.min(end), start.max(end))
        } else {
            (self.precise_start, self.precise_end)
        };

        let span = e - s;
        if span < min_span || span > max_span {
            let center = (s + e) / 2.0;
            let clamped = span.clamp(min_span, max_span);
            s = center - clamped / 2.0;
            e = s + clamped;
        }

        let span = e - s;
        if s < 0.0 {
            s = 0.0;
            e = span;
        }
        if e > max_index {
            e = max_index;
            s = (e - span).max(0.0);
        }
        (s, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn model(len: usize) -> ViewportModel {
        let mut model = ViewportModel::new(800.0, 600.0, ViewportLimits::default());
        model.set_data_length(len);
        model
    }

    #[test]
    fn initial_window_shows_latest_points() {
        let model = model(1000);
        let vp = model.viewport();
        assert_eq!(vp.end_index, 999);
        assert_eq!(vp.visible_count(), 120);
    }

    #[test]
    fn listener_receives_replay_on_registration() {
        let mut model = model(50);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        model.add_listener(move |vp| sink.borrow_mut().push(vp.end_index));
        assert_eq!(*seen.borrow(), vec![49]);
    }

    #[test]
    fn short_data_shows_everything() {
        let model = model(4);
        let vp = model.viewport();
        assert_eq!((vp.start_index, vp.end_index), (0, 3));
        assert!(vp.scale <= MAX_POINT_WIDTH);
    }

    #[test]
    fn live_data_is_followed_only_at_latest() {
        let mut model = model(200);
        model.set_visible_range(0, 99);
        model.set_data_length(210);
        assert_eq!(model.viewport().end_index, 99);

        model.go_to_latest();
        model.set_data_length(220);
        assert_eq!(model.viewport().end_index, 219);
        assert_eq!(model.viewport().visible_count(), 100);
    }

    #[test]
    fn zoom_out_is_limited_by_min_point_width() {
        let mut model = model(10_000);
        model.set_visible_range(0, 9_999);
        let vp = model.viewport();
        assert_eq!(vp.visible_count(), 400);
        assert!((vp.scale - MIN_POINT_WIDTH).abs() < 1e-9);
    }
}
