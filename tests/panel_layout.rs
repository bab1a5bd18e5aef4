use std::cell::Cell;
use std::rc::Rc;

use price_chart_compositor::domain::layout::{HitTarget, MAIN_PANEL_ID, PanelConfig, PanelLayoutManager};
use quickcheck_macros::quickcheck;

fn layout_with_two_panels() -> PanelLayoutManager {
    let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
    layout.add_panel(PanelConfig::auxiliary("rsi", 120.0, 40.0)).unwrap();
    layout.add_panel(PanelConfig::auxiliary("macd", 100.0, 40.0)).unwrap();
    layout
}

fn describe(layout: &PanelLayoutManager) -> String {
    layout
        .calculate_positions()
        .iter()
        .map(|p| format!("{} {}+{}", p.panel_id, p.y, p.height))
        .collect::<Vec<_>>()
        .join("; ")
}

#[test]
fn panels_stack_with_dividers() {
    let layout = layout_with_two_panels();
    insta::assert_snapshot!(describe(&layout), @"main 0+372; rsi 376+120; macd 500+100");
    assert_eq!(layout.used_height(), 600.0);
}

#[test]
fn removal_returns_height_to_main() {
    let mut layout = layout_with_two_panels();
    assert!(layout.remove_panel("rsi"));

    insta::assert_snapshot!(describe(&layout), @"main 0+496; macd 500+100");
    assert_eq!(layout.used_height(), layout.total_height());
    assert!(!layout.remove_panel("rsi"));
}

#[test]
fn panel_without_room_is_rejected() {
    let mut layout = layout_with_two_panels();
    let before = describe(&layout);
    assert!(layout.add_panel(PanelConfig::auxiliary("atr", 300.0, 300.0)).is_err());
    assert_eq!(describe(&layout), before);
}

#[test]
fn drag_rejected_when_neighbour_hits_its_minimum() {
    let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
    layout.add_panel(PanelConfig::auxiliary("macd", 100.0, 40.0)).unwrap();
    let before = describe(&layout);

    // macd would need to shrink to 30px
    assert!(!layout.drag_divider(0, 70.0));
    assert_eq!(describe(&layout), before);

    assert!(layout.drag_divider(0, 50.0));
    assert_eq!(layout.panel("macd").map(|p| p.height), Some(50.0));
    assert_eq!(layout.used_height(), 600.0);
}

#[test]
fn hit_test_finds_panels_and_dividers() {
    let layout = layout_with_two_panels();
    assert_eq!(layout.hit_test(10.0), Some(HitTarget::Panel(MAIN_PANEL_ID.to_string())));
    assert_eq!(layout.hit_test(373.0), Some(HitTarget::Divider(0)));
    assert_eq!(layout.hit_test(400.0), Some(HitTarget::Panel("rsi".to_string())));
    assert_eq!(layout.hit_test(498.0), Some(HitTarget::Divider(1)));
    assert_eq!(layout.hit_test(650.0), None);
}

#[test]
fn subscribers_hear_every_change() {
    let mut layout = PanelLayoutManager::new(600.0, 4.0, 100.0);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    layout.on_layout_change(move |positions| {
        assert!(!positions.is_empty());
        counter.set(counter.get() + 1);
    });

    layout.add_panel(PanelConfig::auxiliary("rsi", 120.0, 40.0)).unwrap();
    layout.drag_divider(0, -20.0);
    layout.set_total_height(700.0);
    layout.remove_panel("rsi");
    assert_eq!(calls.get(), 4);

    layout.clear_subscribers();
    layout.set_total_height(600.0);
    assert_eq!(calls.get(), 4);
}

#[test]
fn empty_panel_is_dropped_with_its_last_series() {
    let mut layout = layout_with_two_panels();
    assert!(layout.add_series_to("rsi", "rsi-14"));
    assert!(layout.add_series_to("rsi", "rsi-28"));

    assert!(!layout.remove_series_from("rsi", "rsi-14"));
    assert!(layout.remove_series_from("rsi", "rsi-28"));
    assert!(layout.panel("rsi").is_none());
}

#[quickcheck]
fn drags_and_resizes_preserve_total_height(ops: Vec<(bool, u8, i16)>) -> bool {
    let mut layout = layout_with_two_panels();
    for (resize, index, delta) in ops {
        if resize {
            layout.set_total_height(400.0 + (delta as f64).abs() % 600.0);
        } else {
            layout.drag_divider(index as usize % 2, delta as f64 / 4.0);
        }
        if (layout.used_height() - layout.total_height()).abs() > 1e-6 {
            return false;
        }
    }
    true
}
