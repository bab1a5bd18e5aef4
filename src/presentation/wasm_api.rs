//! JavaScript facade. A thin bridge: JSON in, plain values out, everything
//! else delegated to [`ChartInstance`].

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::application::{ChartInstance, SeriesUpdate};
use crate::domain::chart::{ChartOptions, OverlayData, Theme};
use crate::domain::errors::ChartError;
use crate::domain::logging::{LogComponent, LogLevel, set_max_level};
use crate::domain::market_data::{Candle, CandleDto};
use crate::domain::series::SeriesConfig;
use crate::infrastructure::rendering::{CallbackScheduler, CanvasSurfaceFactory, FrameScheduler, ManualScheduler};
use crate::log_warn;

fn to_js(err: ChartError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json)
        .map_err(|e| to_js(ChartError::Configuration(format!("invalid {}: {}", what, e))))
}

fn parse_candles(json: &str) -> Result<Vec<Candle>, JsValue> {
    let dtos: Vec<CandleDto> = parse(json, "candles")?;
    Ok(dtos.into_iter().map(Candle::from).collect())
}

/// Change the console verbosity: trace, debug, info, warn or error
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level: LogLevel = level
        .parse()
        .map_err(|_| to_js(ChartError::Configuration(format!("unknown log level '{}'", level))))?;
    set_max_level(level);
    Ok(())
}

#[wasm_bindgen]
pub struct WasmChart {
    chart: Rc<RefCell<ChartInstance>>,
}

#[wasm_bindgen]
impl WasmChart {
    /// Create the chart inside the element `container_id`. `on_frame` is
    /// called whenever a redraw is wanted; the host answers with
    /// `runFrame()` on its next animation frame.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container_id: &str,
        options_json: Option<String>,
        on_frame: Option<Function>,
    ) -> Result<WasmChart, JsValue> {
        let options = match options_json {
            Some(json) => ChartOptions::from_json(&json).map_err(to_js)?,
            None => ChartOptions::default(),
        };
        let factory = CanvasSurfaceFactory::for_container(container_id).map_err(to_js)?;
        let scheduler: Box<dyn FrameScheduler> = match on_frame {
            Some(callback) => Box::new(CallbackScheduler::new(move || {
                if let Err(err) = callback.call0(&JsValue::NULL) {
                    log_warn!(LogComponent::Presentation("WasmChart"), "frame callback threw: {:?}", err);
                }
            })),
            None => Box::new(ManualScheduler::new()),
        };
        let chart = ChartInstance::new(options, Theme::default(), Box::new(factory), scheduler)
            .map_err(to_js)?;
        Ok(Self { chart: Rc::new(RefCell::new(chart)) })
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&self, theme_json: &str) -> Result<(), JsValue> {
        let theme: Theme = parse(theme_json, "theme")?;
        self.chart.borrow_mut().set_theme(theme);
        Ok(())
    }

    /// Replace all candles. Returns the stored point count.
    #[wasm_bindgen(js_name = setCandles)]
    pub fn set_candles(&self, candles_json: &str) -> Result<usize, JsValue> {
        let candles = parse_candles(candles_json)?;
        let mut chart = self.chart.borrow_mut();
        chart.set_candles(&candles).map_err(to_js)?;
        Ok(chart.store().len())
    }

    #[wasm_bindgen(js_name = appendCandles)]
    pub fn append_candles(&self, candles_json: &str) -> Result<usize, JsValue> {
        let candles = parse_candles(candles_json)?;
        let mut chart = self.chart.borrow_mut();
        chart.append_candles(&candles).map_err(to_js)?;
        Ok(chart.store().len())
    }

    #[wasm_bindgen(js_name = addSeries)]
    pub fn add_series(&self, config_json: &str) -> Result<(), JsValue> {
        let config: SeriesConfig = parse(config_json, "series config")?;
        self.chart.borrow_mut().add_series(config).map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeSeries)]
    pub fn remove_series(&self, id: &str) -> bool {
        self.chart.borrow_mut().remove_series(id)
    }

    #[wasm_bindgen(js_name = updateSeries)]
    pub fn update_series(&self, id: &str, update_json: &str) -> Result<(), JsValue> {
        let update: SeriesUpdate = parse(update_json, "series update")?;
        self.chart.borrow_mut().update_series(id, update).map_err(to_js)
    }

    /// Registered series configs as a JSON array
    #[wasm_bindgen(js_name = listSeries)]
    pub fn list_series(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.chart.borrow().list_series())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = clearSeries)]
    pub fn clear_series(&self) {
        self.chart.borrow_mut().clear_series();
    }

    /// Compute every enabled series and store the results. Resolves to the
    /// number of series updated.
    #[wasm_bindgen(js_name = refreshSeries)]
    pub fn refresh_series(&self) -> Promise {
        let pending = self.chart.borrow().compute_series();
        let chart = Rc::clone(&self.chart);
        future_to_promise(async move {
            let batch = pending.await;
            let applied = chart.borrow_mut().apply_computed(batch);
            Ok(JsValue::from(applied as u32))
        })
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) {
        self.chart.borrow_mut().zoom_in();
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) {
        self.chart.borrow_mut().zoom_out();
    }

    /// Wheel zoom around the pointer
    pub fn zoom(&self, delta: f64, anchor_x: Option<f64>) {
        self.chart.borrow_mut().zoom(delta, anchor_x);
    }

    #[wasm_bindgen(js_name = resetZoomToLatest)]
    pub fn reset_zoom_to_latest(&self) {
        self.chart.borrow_mut().reset_zoom_to_latest();
    }

    pub fn pan(&self, delta_indices: i32) {
        self.chart.borrow_mut().pan(i64::from(delta_indices));
    }

    /// Current viewport as JSON
    #[wasm_bindgen(js_name = viewport)]
    pub fn viewport(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.chart.borrow().viewport()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = setCrosshair)]
    pub fn set_crosshair(&self, x: f64, y: f64) {
        self.chart.borrow_mut().set_crosshair(x, y);
    }

    #[wasm_bindgen(js_name = clearCrosshair)]
    pub fn clear_crosshair(&self) {
        self.chart.borrow_mut().clear_crosshair();
    }

    #[wasm_bindgen(js_name = setOverlays)]
    pub fn set_overlays(&self, overlays_json: &str) -> Result<(), JsValue> {
        let overlays: OverlayData = parse(overlays_json, "overlays")?;
        self.chart.borrow_mut().set_overlays(overlays);
        Ok(())
    }

    #[wasm_bindgen(js_name = dragDivider)]
    pub fn drag_divider(&self, index: usize, delta: f64) -> bool {
        self.chart.borrow_mut().drag_divider(index, delta)
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.chart.borrow_mut().resize(width, height);
    }

    /// Paint dirty surfaces. Returns how many were painted.
    #[wasm_bindgen(js_name = runFrame)]
    pub fn run_frame(&self) -> usize {
        self.chart.borrow_mut().run_frame().painted
    }

    /// Called once if the worker path is abandoned, with the reason
    #[wasm_bindgen(js_name = onOffloadFallback)]
    pub fn on_offload_fallback(&self, callback: Function) {
        self.chart.borrow().on_offload_fallback(move |reason| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(&reason.to_string()));
        });
    }

    pub fn destroy(&self) {
        self.chart.borrow_mut().destroy();
    }
}
