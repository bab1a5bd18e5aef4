//! The job interface shared by every execution strategy.

use std::sync::Arc;

use futures::channel::oneshot;

use crate::domain::chart::{PriceScale, Rect, Viewport};
use crate::domain::errors::OffloadError;
use crate::domain::market_data::Candle;
use crate::domain::series::{IndicatorSpec, SeriesResult, indicators};
use crate::infrastructure::rendering::DisplayList;
use crate::infrastructure::rendering::renderers::{
    IndicatorRenderInput, IndicatorStyle, RenderFrame, indicator_scale, render_indicator,
};

/// Ask a job to also build the series' paint commands
#[derive(Debug, Clone, PartialEq)]
pub struct PaintRequest {
    pub viewport: Viewport,
    pub bounds: Rect,
    pub style: IndicatorStyle,
    /// Fixed mapping (overlay series use the price panel's); auto when `None`
    pub scale: Option<PriceScale>,
}

#[derive(Debug, Clone)]
pub struct ComputeJob {
    pub series_id: String,
    pub spec: IndicatorSpec,
    pub candles: Arc<Vec<Candle>>,
    pub paint: Option<PaintRequest>,
}

#[derive(Debug, Clone)]
pub struct JobOutput {
    pub result: SeriesResult,
    pub paint: Option<DisplayList>,
}

/// Compute the series and, when asked, record its paint commands. Runs
/// unchanged on the worker thread and inline.
pub fn compute_and_paint(job: &ComputeJob) -> JobOutput {
    let result = indicators::compute(&job.series_id, &job.spec, &job.candles);
    let paint = job.paint.as_ref().map(|request| {
        let mut list = DisplayList::new(request.viewport.width, request.viewport.height);
        let scale = request
            .scale
            .or_else(|| indicator_scale(&result, &request.viewport, request.bounds));
        if let Some(scale) = scale {
            let input = IndicatorRenderInput {
                result: &result,
                frame: RenderFrame::new(&request.viewport, request.bounds, None),
                scale,
                style: &request.style,
            };
            render_indicator(&mut list, &input);
        }
        list
    });
    JobOutput { result, paint }
}

/// Pending reply for one submitted job. A dropped sender means the
/// execution context died.
pub type JobReply = oneshot::Receiver<JobOutput>;

/// An execution strategy for compute jobs
pub trait ComputeBackend {
    fn name(&self) -> &'static str;

    /// Queue a batch; one reply per job, in order
    fn submit(&mut self, jobs: Vec<ComputeJob>) -> Result<Vec<JobReply>, OffloadError>;

    fn shutdown(&mut self) {}
}
