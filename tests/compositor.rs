use price_chart_compositor::domain::chart::{Color, Rect, Theme, Viewport, ViewportLimits, ViewportModel};
use price_chart_compositor::domain::errors::{ChartError, ChartResult};
use price_chart_compositor::domain::market_data::Candle;
use price_chart_compositor::infrastructure::rendering::renderers::{
    RenderFrame, VolumeRenderInput, render_volume,
};
use price_chart_compositor::infrastructure::rendering::{
    Compositor, DrawTarget, LayerKind, ManualScheduler, PaintContext, PixelSurface, Surface,
    SurfacePainter,
};

const BLOCK: f64 = 100.0;

/// Paints an 8x6 grid of opaque blocks, culled against the damage region
struct BlockPainter {
    colors: Vec<Color>,
    painted: Vec<String>,
    fail_on: Option<&'static str>,
}

impl BlockPainter {
    fn new() -> Self {
        Self { colors: vec![Color::from_hex(0x204060); 48], painted: Vec::new(), fail_on: None }
    }
}

impl SurfacePainter for BlockPainter {
    fn paint(&mut self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<()> {
        self.painted.push(ctx.name.to_string());
        if self.fail_on == Some(ctx.name) {
            return Err(ChartError::Data("broken surface".into()));
        }
        let frame = RenderFrame::new(&ctx.viewport, ctx.bounds, ctx.region);
        for (i, color) in self.colors.iter().enumerate() {
            let block = Rect::new((i % 8) as f64 * BLOCK, (i / 8) as f64 * BLOCK, BLOCK, BLOCK);
            if frame.admits(&block) {
                target.fill_rects(&[block], *color);
            }
        }
        Ok(())
    }
}

/// Real volume bars in the theme's translucent colours, ten slots wide
struct VolumePainter {
    candles: Vec<Candle>,
    theme: Theme,
}

impl SurfacePainter for VolumePainter {
    fn paint(&mut self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<()> {
        let viewport =
            Viewport { start_index: 0, end_index: 9, scale: 80.0, offset: 0.0, width: 800.0, height: 600.0 };
        let input = VolumeRenderInput {
            candles: &self.candles,
            first_index: 0,
            frame: RenderFrame::new(&viewport, ctx.bounds, ctx.region),
            theme: &self.theme,
        };
        render_volume(target, &input);
        Ok(())
    }
}

fn compositor(scheduler: &ManualScheduler) -> Compositor {
    let mut viewport = ViewportModel::new(800.0, 600.0, ViewportLimits::default());
    viewport.set_data_length(1_000);
    let mut compositor = Compositor::new(viewport, Box::new(scheduler.clone()));
    for (name, layer) in [("price", LayerKind::Price), ("interaction", LayerKind::Interaction)] {
        compositor
            .add_surface(Surface::new(name, layer, Box::new(PixelSurface::new(800, 600))))
            .unwrap();
    }
    compositor
}

fn pixels(compositor: &Compositor, name: &str) -> Vec<u8> {
    let surface = compositor.surface(name).unwrap();
    let pixels = surface.target().as_any().downcast_ref::<PixelSurface>().unwrap();
    pixels.as_bytes().to_vec()
}

#[test]
fn damage_within_one_tick_requests_one_frame() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    assert_eq!(scheduler.requests(), 1);

    compositor.mark_layer_dirty("price", Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    compositor.mark_all_dirty();
    compositor.with_viewport(|vp| vp.pan(-10));
    assert_eq!(scheduler.requests(), 1);

    compositor.run_frame(&mut BlockPainter::new());
    assert!(!compositor.frame_pending());

    compositor.mark_layer_dirty("interaction", None);
    compositor.mark_layer_dirty("interaction", None);
    assert_eq!(scheduler.requests(), 2);
}

#[test]
fn clean_surfaces_are_skipped() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    compositor.run_frame(&mut BlockPainter::new());

    compositor.mark_layer_dirty("interaction", None);
    let mut painter = BlockPainter::new();
    let stats = compositor.run_frame(&mut painter);

    assert_eq!(painter.painted, vec!["interaction".to_string()]);
    assert_eq!((stats.painted, stats.skipped), (1, 1));
}

#[test]
fn full_damage_repaints_every_surface() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    compositor.run_frame(&mut BlockPainter::new());

    compositor.mark_all_dirty();
    let mut painter = BlockPainter::new();
    let stats = compositor.run_frame(&mut painter);
    assert_eq!(stats.painted, 2);
    assert_eq!(painter.painted, vec!["price".to_string(), "interaction".to_string()]);
}

#[test]
fn region_repaint_leaves_outside_pixels_untouched() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    let mut painter = BlockPainter::new();
    compositor.run_frame(&mut painter);
    let before = pixels(&compositor, "price");

    // recolour block 3 and damage exactly its area
    painter.colors[3] = Color::from_hex(0xff8800);
    let region = Rect::new(300.0, 0.0, 100.0, 100.0);
    compositor.mark_layer_dirty("price", Some(region));
    compositor.run_frame(&mut painter);
    let after = pixels(&compositor, "price");

    let mut changed_inside = 0;
    for y in 0..600usize {
        for x in 0..800usize {
            let offset = (y * 800 + x) * 4;
            let inside = region.contains_point(x as f64 + 0.5, y as f64 + 0.5);
            let same = before[offset..offset + 4] == after[offset..offset + 4];
            if inside {
                changed_inside += usize::from(!same);
            } else {
                assert!(same, "pixel ({}, {}) outside the damage changed", x, y);
            }
        }
    }
    assert_eq!(changed_inside, 100 * 100);
}

#[test]
fn one_failing_surface_does_not_stop_the_frame() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    let mut painter = BlockPainter::new();
    painter.fail_on = Some("price");

    let stats = compositor.run_frame(&mut painter);
    assert_eq!((stats.painted, stats.failed), (1, 1));
    assert!(compositor.surfaces().iter().all(|s| !s.is_dirty()));
}

#[test]
fn surfaces_are_kept_in_layer_order() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    compositor
        .add_surface(Surface::new("grid", LayerKind::Background, Box::new(PixelSurface::new(800, 600))))
        .unwrap();
    assert_eq!(compositor.surface_names(), vec!["grid", "price", "interaction"]);
    assert_eq!(compositor.input_surface().map(Surface::name), Some("interaction"));

    let duplicate = Surface::new("price", LayerKind::Price, Box::new(PixelSurface::new(1, 1)));
    assert!(matches!(compositor.add_surface(duplicate), Err(ChartError::Configuration(_))));
}

#[test]
fn destroyed_compositor_ignores_damage() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    compositor.run_frame(&mut BlockPainter::new());
    let requests = scheduler.requests();

    assert_eq!(compositor.destroy().len(), 2);
    assert!(!compositor.mark_layer_dirty("price", None));
    compositor.mark_all_dirty();
    assert_eq!(scheduler.requests(), requests);
    assert_eq!(compositor.run_frame(&mut BlockPainter::new()).painted, 0);
}

#[test]
fn region_repaint_clips_bars_straddling_the_damage() {
    let scheduler = ManualScheduler::new();
    let mut compositor = compositor(&scheduler);
    let candles = (0..10)
        .map(|i| Candle::from_values(i, 100.0, 110.0, 90.0, if i % 2 == 0 { 105.0 } else { 95.0 }, 50.0 + i as f64))
        .collect();
    let mut painter = VolumePainter { candles, theme: Theme::default() };
    assert!(painter.theme.volume_up.a < 1.0);

    compositor.run_frame(&mut painter);
    let before = pixels(&compositor, "price");

    // cuts through the middle of the first bar only
    compositor.mark_layer_dirty("price", Some(Rect::new(20.0, 560.0, 40.0, 40.0)));
    compositor.run_frame(&mut painter);
    let after = pixels(&compositor, "price");

    let changed = before.chunks(4).zip(after.chunks(4)).filter(|(a, b)| a != b).count();
    assert_eq!(changed, 0);
}
