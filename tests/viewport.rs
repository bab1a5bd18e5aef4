use std::cell::RefCell;
use std::rc::Rc;

use price_chart_compositor::domain::chart::{ViewportLimits, ViewportModel};
use quickcheck_macros::quickcheck;

const WIDTH: f64 = 800.0;

fn model(len: usize) -> ViewportModel {
    let mut model = ViewportModel::new(WIDTH, 600.0, ViewportLimits::default());
    model.set_data_length(len);
    model
}

fn holds_invariants(model: &ViewportModel) -> bool {
    let vp = model.viewport();
    let len = model.data_length();
    let min_span = 10.min(len.saturating_sub(1));
    vp.start_index <= vp.end_index
        && vp.end_index < len
        && vp.end_index - vp.start_index >= min_span
        && vp.scale >= 2.0
        && vp.scale <= 50.0
}

#[quickcheck]
fn window_stays_valid_under_any_navigation(len: u16, ops: Vec<(u8, i16)>) -> bool {
    let len = len as usize % 5_000 + 1;
    let mut model = model(len);
    for (op, arg) in ops {
        match op % 5 {
            0 => model.pan(arg as i64),
            1 => model.zoom(arg as f64 / 1_000.0, None),
            2 => model.zoom(arg as f64 / 1_000.0, Some((arg as f64).abs() % WIDTH)),
            3 => model.set_data_length(len + arg.unsigned_abs() as usize),
            _ => model.go_to_latest(),
        }
        if !holds_invariants(&model) {
            return false;
        }
    }
    true
}

#[quickcheck]
fn inverse_zoom_restores_window(start: u16, span: u8, delta: i8, anchor: u16) -> bool {
    let start = 200 + start as usize % 400;
    let span = 40 + span as usize % 160;
    let delta = delta as f64 / 127.0 * 0.5;
    let anchor = anchor as f64 % WIDTH;

    let mut model = model(1_000);
    model.set_visible_range(start, start + span);
    let before = model.viewport();

    model.zoom(delta, Some(anchor));
    model.zoom(ViewportModel::inverse_zoom_delta(delta), Some(anchor));
    let after = model.viewport();

    after.start_index.abs_diff(before.start_index) <= 1
        && after.end_index.abs_diff(before.end_index) <= 1
}

#[test]
fn zoom_in_halves_window_around_midpoint() {
    let mut model = model(1_000);
    model.set_visible_range(0, 99);
    model.zoom(-0.5, None);

    let vp = model.viewport();
    assert_eq!((vp.start_index, vp.end_index), (25, 74));
    assert_eq!(vp.visible_count(), 50);
}

#[test]
fn window_never_narrower_than_minimum() {
    let mut model = model(1_000);
    for _ in 0..20 {
        model.zoom(-0.9, None);
    }
    let vp = model.viewport();
    assert_eq!(vp.end_index - vp.start_index, 10);
}

#[test]
fn anchored_zoom_keeps_point_under_cursor() {
    let mut model = model(1_000);
    model.set_visible_range(300, 499);
    let anchor_x = 600.0;
    let before = model.x_to_index(anchor_x);
    model.zoom(-0.5, Some(anchor_x));
    assert!(model.x_to_index(anchor_x).abs_diff(before) <= 1);
}

#[test]
fn anchored_zoom_holds_at_widest_points() {
    let mut model = model(1_000);
    model.set_visible_range(100, 119);
    let anchor_x = 300.0;
    let before = model.x_to_index(anchor_x);
    assert_eq!(before, 107);

    // ten points would be 80 px wide, so the scale pins at 50 px
    model.zoom(-0.5, Some(anchor_x));
    let vp = model.viewport();
    assert!((vp.scale - 50.0).abs() < 1e-9);
    assert_eq!(model.x_to_index(anchor_x), before);
}

#[test]
fn listeners_get_current_state_then_changes_only() {
    let mut model = model(1_000);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = model.add_listener(move |vp| sink.borrow_mut().push(vp.start_index));
    assert_eq!(seen.borrow().len(), 1);

    model.pan(0);
    model.set_data_length(1_000);
    assert_eq!(seen.borrow().len(), 1);

    model.pan(-5);
    assert_eq!(seen.borrow().len(), 2);

    assert!(model.remove_listener(id));
    model.pan(-5);
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn pixel_mapping_round_trips_visible_indices() {
    let mut model = model(1_000);
    model.set_visible_range(100, 199);
    for index in [100, 150, 199] {
        assert_eq!(model.x_to_index(model.index_to_x(index)), index);
    }
    assert_eq!(model.x_to_index(-50.0), 100);
    assert_eq!(model.x_to_index(WIDTH * 2.0), 199);
}

#[test]
fn empty_data_collapses_window() {
    let mut model = model(50);
    model.set_data_length(0);
    let vp = model.viewport();
    assert_eq!((vp.start_index, vp.end_index), (0, 0));
}
