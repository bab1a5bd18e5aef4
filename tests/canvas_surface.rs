#![cfg(target_arch = "wasm32")]

use price_chart_compositor::application::ChartInstance;
use price_chart_compositor::domain::chart::{ChartOptions, Theme};
use price_chart_compositor::domain::market_data::Candle;
use price_chart_compositor::infrastructure::rendering::{CanvasSurfaceFactory, ManualScheduler};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn container(id: &str) -> web_sys::Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let div = document.create_element("div").unwrap();
    div.set_id(id);
    document.body().unwrap().append_child(&div).unwrap();
    div
}

fn chart_in(id: &str) -> ChartInstance {
    let factory = CanvasSurfaceFactory::for_container(id).unwrap();
    let options = ChartOptions { offload_enabled: false, ..ChartOptions::default() };
    ChartInstance::new(options, Theme::default(), Box::new(factory), Box::new(ManualScheduler::new())).unwrap()
}

#[wasm_bindgen_test]
fn one_stacked_canvas_per_surface() {
    let host = container("canvas-stack");
    let _chart = chart_in("canvas-stack");

    let canvases = host.query_selector_all("canvas").unwrap();
    assert_eq!(canvases.length(), 5);
    let interaction = host.query_selector("canvas[data-surface=interaction]").unwrap().unwrap();
    let style = interaction.get_attribute("style").unwrap();
    assert!(style.contains("pointer-events:auto"));
}

#[wasm_bindgen_test]
fn destroy_removes_canvases() {
    let host = container("canvas-destroy");
    let mut chart = chart_in("canvas-destroy");
    chart.set_candles(&[Candle::from_values(0, 1.0, 2.0, 0.5, 1.5, 10.0)]).unwrap();
    assert_eq!(chart.run_frame().failed, 0);

    chart.destroy();
    assert_eq!(host.query_selector_all("canvas").unwrap().length(), 0);
}

#[wasm_bindgen_test]
fn missing_container_is_a_resource_error() {
    assert!(CanvasSurfaceFactory::for_container("no-such-element").is_err());
}
