use crate::noise::NoiseField;
use crate::palette::{Palette, Rgb};
use crate::params::{DistributionMode, Params, MAX_DIVISION};
use crate::surface::{Surface, SurfaceError};
use clap::ValueEnum;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Noise coordinates are `cell index × NOISE_ZOOM × noise_scale`.
pub(crate) const NOISE_ZOOM: f32 = 4.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum CellSizing {
    /// Each axis divides its own extent; the grid always covers the canvas.
    #[default]
    Fit,
    /// Height equals width, both derived from the canvas width.
    Square,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum RenderError {
    #[error("division must be positive")]
    ZeroDivision,
    #[error("division {0} is above the limit of {max}", max = MAX_DIVISION)]
    DivisionTooLarge(u32),
    #[error("palette has no colors")]
    EmptyPalette,
    #[error("canvas has no area ({0}x{1})")]
    EmptySurface(u32, u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GridLayout {
    pub(crate) cols: u32,
    pub(crate) rows: u32,
    pub(crate) cell_w: f32,
    pub(crate) cell_h: f32,
}

impl GridLayout {
    /// Sequential modes use a `division × 2·division` grid: horizontal lays
    /// the long side along y, vertical along x.
    pub(crate) fn new(mode: DistributionMode, division: u32, size: (u32, u32), sizing: CellSizing) -> Self {
        let (cols, rows) = match mode {
            DistributionMode::Horizontal => (division, division.saturating_mul(2)),
            DistributionMode::Vertical => (division.saturating_mul(2), division),
            DistributionMode::Noise => (division, division),
        };
        let cell_w = size.0 as f32 / cols as f32;
        let cell_h = match sizing {
            CellSizing::Fit => size.1 as f32 / rows as f32,
            CellSizing::Square => cell_w,
        };
        Self {
            cols,
            rows,
            cell_w,
            cell_h,
        }
    }

    pub(crate) fn cell_count(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScanOrder {
    /// Inner loop walks x: horizontal bands.
    Rows,
    /// Inner loop walks y: vertical bands.
    Columns,
}

/// Walks `2·division × division` cells, painting each with the running
/// color, then switching to a random palette entry with probability
/// `threshold`. Returns the color the scan ended on.
pub(crate) fn scan_sequential<R, F>(
    order: ScanOrder,
    division: u32,
    palette: &Palette,
    threshold: f32,
    mut current: Rgb,
    rng: &mut R,
    mut paint: F,
) -> Rgb
where
    R: Rng + ?Sized,
    F: FnMut(u32, u32, Rgb),
{
    let larger = division * 2;
    let smaller = division;
    for i in 0..larger {
        for j in 0..smaller {
            let (x, y) = match order {
                ScanOrder::Rows => (j, i),
                ScanOrder::Columns => (i, j),
            };
            paint(x, y, current);
            if rng.gen::<f32>() < threshold {
                current = palette.pick(rng);
            }
        }
    }
    current
}

/// Maps a noise value to a palette slot. Values at or above 1.0 land on the
/// last slot; NaN and negatives land on the first.
pub(crate) fn noise_index(value: f32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    ((v * len as f32).floor() as usize).min(len - 1)
}

/// Each cell's color is a pure function of its position.
pub(crate) fn scan_noise<N, F>(division: u32, palette: &Palette, noise_scale: f32, noise: &N, mut paint: F)
where
    N: NoiseField + ?Sized,
    F: FnMut(u32, u32, Rgb),
{
    let k = NOISE_ZOOM * noise_scale;
    let swatches = palette.swatches();
    for y in 0..division {
        for x in 0..division {
            let v = noise.sample(x as f32 * k, y as f32 * k);
            paint(x, y, swatches[noise_index(v, swatches.len())].color);
        }
    }
}

/// The regenerate control is pointless when the image is a pure function of
/// the parameters.
pub(crate) fn shuffle_enabled(mode: DistributionMode) -> bool {
    mode != DistributionMode::Noise
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RenderPhase {
    Idle,
    Computing,
    Drawn,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RenderReport {
    pub(crate) cycle: u64,
    pub(crate) mode: DistributionMode,
    pub(crate) layout: GridLayout,
    pub(crate) cells: u64,
}

pub(crate) struct GridRenderer<S, N> {
    surface: S,
    noise: N,
    rng: StdRng,
    background: Rgb,
    sizing: CellSizing,
    phase: RenderPhase,
    cycles: u64,
}

impl<S: Surface, N: NoiseField> GridRenderer<S, N> {
    pub(crate) fn new(surface: S, noise: N, rng: StdRng, background: Rgb, sizing: CellSizing) -> Self {
        Self {
            surface,
            noise,
            rng,
            background,
            sizing,
            phase: RenderPhase::Idle,
            cycles: 0,
        }
    }

    pub(crate) fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.cycles
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        log::debug!("canvas resized to {width}x{height}");
        self.surface.resize(width, height);
        self.phase = RenderPhase::Idle;
    }

    /// Clears the canvas and recomputes every cell from `params`.
    pub(crate) fn redraw(&mut self, params: &Params) -> Result<RenderReport, RenderError> {
        if params.division == 0 {
            self.phase = RenderPhase::Idle;
            return Err(RenderError::ZeroDivision);
        }
        if params.division > MAX_DIVISION {
            self.phase = RenderPhase::Idle;
            return Err(RenderError::DivisionTooLarge(params.division));
        }
        if params.palette.is_empty() {
            self.phase = RenderPhase::Idle;
            return Err(RenderError::EmptyPalette);
        }
        let size = self.surface.size();
        if size.0 == 0 || size.1 == 0 {
            self.phase = RenderPhase::Idle;
            return Err(RenderError::EmptySurface(size.0, size.1));
        }

        self.phase = RenderPhase::Computing;
        self.surface.clear(self.background);

        let layout = GridLayout::new(params.mode, params.division, size, self.sizing);
        let surface = &mut self.surface;
        let rng = &mut self.rng;
        let mut cells = 0u64;
        let paint = |x: u32, y: u32, color: Rgb| {
            surface.fill_rect(
                x as f32 * layout.cell_w,
                y as f32 * layout.cell_h,
                layout.cell_w,
                layout.cell_h,
                color,
            );
            cells += 1;
        };

        match params.mode {
            DistributionMode::Horizontal | DistributionMode::Vertical => {
                let order = if params.mode == DistributionMode::Horizontal {
                    ScanOrder::Rows
                } else {
                    ScanOrder::Columns
                };
                let start = params.palette.pick(rng);
                scan_sequential(order, params.division, &params.palette, params.threshold, start, rng, paint);
            }
            DistributionMode::Noise => {
                scan_noise(params.division, &params.palette, params.noise_scale, &self.noise, paint);
            }
        }

        debug_assert_eq!(cells, layout.cell_count());
        self.cycles += 1;
        self.phase = RenderPhase::Drawn;
        let report = RenderReport {
            cycle: self.cycles,
            mode: params.mode,
            layout,
            cells,
        };
        log::debug!(
            "cycle {} drew {} cells ({}, division {})",
            report.cycle,
            report.cells,
            params.mode.label(),
            params.division
        );
        Ok(report)
    }

    /// Writes the last completed cycle to `path`.
    pub(crate) fn export(&self, path: &Path) -> Result<(), SurfaceError> {
        if self.phase != RenderPhase::Drawn {
            return Err(SurfaceError::NothingDrawn);
        }
        self.surface.export(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::ValueNoise;
    use crate::surface::PixelSurface;
    use rand::SeedableRng;

    const A: Rgb = Rgb::new(255, 0, 0);
    const B: Rgb = Rgb::new(0, 0, 255);

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Fill {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    }

    struct Recorder {
        size: (u32, u32),
        fills: Vec<Fill>,
    }

    impl Recorder {
        fn new(w: u32, h: u32) -> Self {
            Self {
                size: (w, h),
                fills: Vec::new(),
            }
        }
    }

    impl Surface for Recorder {
        fn size(&self) -> (u32, u32) {
            self.size
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.fills.clear();
        }
        fn clear(&mut self, _color: Rgb) {
            self.fills.clear();
        }
        fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
            self.fills.push(Fill { x, y, w, h, color });
        }
        fn export(&self, _path: &Path) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    struct Constant(f32);

    impl NoiseField for Constant {
        fn sample(&self, _x: f32, _y: f32) -> f32 {
            self.0
        }
    }

    fn params(mode: DistributionMode, division: u32) -> Params {
        Params {
            mode,
            division,
            ..Params::default()
        }
    }

    fn renderer(w: u32, h: u32, seed: u64) -> GridRenderer<Recorder, ValueNoise> {
        GridRenderer::new(
            Recorder::new(w, h),
            ValueNoise::new(7),
            StdRng::seed_from_u64(seed),
            Rgb::new(170, 170, 170),
            CellSizing::Fit,
        )
    }

    #[test]
    fn fill_count_and_tiling_per_mode() {
        for mode in DistributionMode::ALL {
            for division in [1, 2, 7, 30] {
                let mut r = renderer(300, 480, 1);
                let report = r.redraw(&params(mode, division)).unwrap();
                let fills = &r.surface().fills;
                let expected = match mode {
                    DistributionMode::Noise => division as usize * division as usize,
                    _ => 2 * division as usize * division as usize,
                };
                assert_eq!(fills.len(), expected, "{mode:?} d={division}");
                assert_eq!(report.cells, expected as u64);
                assert!(fills.iter().all(|f| f.w > 0.0 && f.h > 0.0));

                let area: f32 = fills.iter().map(|f| f.w * f.h).sum();
                let total = 300.0 * 480.0;
                assert!((area - total).abs() / total < 1e-3, "{mode:?} area {area}");

                let max_x = fills.iter().map(|f| f.x + f.w).fold(0.0, f32::max);
                let max_y = fills.iter().map(|f| f.y + f.h).fold(0.0, f32::max);
                assert!((max_x - 300.0).abs() < 1e-2 && (max_y - 480.0).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn cells_do_not_overlap() {
        let mut r = renderer(90, 60, 3);
        r.redraw(&params(DistributionMode::Vertical, 5)).unwrap();
        let mut origins: Vec<(i64, i64)> = r
            .surface()
            .fills
            .iter()
            .map(|f| ((f.x * 100.0).round() as i64, (f.y * 100.0).round() as i64))
            .collect();
        origins.sort_unstable();
        origins.dedup();
        assert_eq!(origins.len(), 50);
    }

    #[test]
    fn layout_dimensions_follow_mode() {
        let h = GridLayout::new(DistributionMode::Horizontal, 10, (100, 200), CellSizing::Fit);
        assert_eq!((h.cols, h.rows), (10, 20));
        let v = GridLayout::new(DistributionMode::Vertical, 10, (200, 100), CellSizing::Fit);
        assert_eq!((v.cols, v.rows), (20, 10));
        let n = GridLayout::new(DistributionMode::Noise, 10, (100, 100), CellSizing::Fit);
        assert_eq!((n.cols, n.rows, n.cell_count()), (10, 10, 100));
    }

    #[test]
    fn square_sizing_derives_height_from_width() {
        let l = GridLayout::new(DistributionMode::Horizontal, 4, (100, 900), CellSizing::Square);
        assert_eq!(l.cell_w, 25.0);
        assert_eq!(l.cell_h, 25.0);
    }

    #[test]
    fn horizontal_scans_rows_and_vertical_scans_columns() {
        let palette = Palette::from_colors(&[A]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let mut rows = Vec::new();
        scan_sequential(ScanOrder::Rows, 3, &palette, 0.5, A, &mut rng, |x, y, _| rows.push((x, y)));
        assert_eq!(&rows[..4], &[(0, 0), (1, 0), (2, 0), (0, 1)]);
        assert_eq!(rows.last(), Some(&(2, 5)));

        let mut cols = Vec::new();
        scan_sequential(ScanOrder::Columns, 3, &palette, 0.5, A, &mut rng, |x, y, _| cols.push((x, y)));
        assert_eq!(&cols[..4], &[(0, 0), (0, 1), (0, 2), (1, 0)]);
        assert_eq!(cols.last(), Some(&(5, 2)));
    }

    #[test]
    fn zero_threshold_keeps_the_initial_color() {
        let palette = Palette::from_colors(&[A, B]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = Vec::new();
        let end = scan_sequential(ScanOrder::Rows, 10, &palette, 0.0, B, &mut rng, |_, _, c| seen.push(c));
        assert_eq!(seen.len(), 200);
        assert!(seen.iter().all(|&c| c == B));
        assert_eq!(end, B);
    }

    #[test]
    fn full_threshold_repicks_after_every_cell() {
        let palette = Palette::from_colors(&[A, B]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut replay = rng.clone();

        let mut seen = Vec::new();
        scan_sequential(ScanOrder::Rows, 10, &palette, 1.0, A, &mut rng, |_, _, c| seen.push(c));

        let mut expected = vec![A];
        for _ in 1..seen.len() {
            let roll: f32 = replay.gen();
            assert!(roll < 1.0);
            expected.push(palette.pick(&mut replay));
        }
        assert_eq!(seen, expected);
        // Both entries show up once a new pick happens at every step.
        assert!(seen.contains(&A) && seen.contains(&B));
    }

    #[test]
    fn step_rng_at_zero_always_triggers_a_change() {
        let palette = Palette::from_colors(&[A, B]).unwrap();
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);
        let mut seen = Vec::new();
        scan_sequential(ScanOrder::Columns, 2, &palette, 0.01, B, &mut rng, |_, _, c| seen.push(c));
        // gen_range over a zero stream picks slot 0 every time.
        assert_eq!(seen[0], B);
        assert!(seen[1..].iter().all(|&c| c == A));
    }

    #[test]
    fn zero_threshold_renders_one_solid_color() {
        let mut r = renderer(100, 200, 21);
        let p = Params {
            threshold: 0.0,
            ..params(DistributionMode::Horizontal, 10)
        };
        r.redraw(&p).unwrap();
        let first = r.surface().fills[0].color;
        assert!(p.palette.contains(first));
        assert!(r.surface().fills.iter().all(|f| f.color == first));
    }

    #[test]
    fn sequential_colors_come_from_the_current_palette() {
        let mut r = renderer(60, 60, 4);
        let mut p = Params {
            threshold: 0.7,
            ..params(DistributionMode::Vertical, 6)
        };
        r.redraw(&p).unwrap();

        p.palette = Palette::from_colors(&[Rgb::new(1, 1, 1), Rgb::new(2, 2, 2)]).unwrap();
        r.redraw(&p).unwrap();
        assert!(r.surface().fills.iter().all(|f| p.palette.contains(f.color)));
    }

    #[test]
    fn noise_mode_is_deterministic() {
        let p = Params {
            noise_scale: 0.3,
            ..params(DistributionMode::Noise, 12)
        };
        let mut a = renderer(120, 120, 1);
        let mut b = renderer(120, 120, 999);
        a.redraw(&p).unwrap();
        b.redraw(&p).unwrap();
        assert_eq!(a.surface().fills, b.surface().fills);

        let first = a.surface().fills.clone();
        a.redraw(&p).unwrap();
        assert_eq!(a.surface().fills, first);
    }

    #[test]
    fn noise_mode_on_pixels_is_bit_identical() {
        let p = Params {
            noise_scale: 0.2,
            ..params(DistributionMode::Noise, 8)
        };
        let draw = || {
            let mut r = GridRenderer::new(
                PixelSurface::new(40, 40, 1),
                ValueNoise::new(3),
                StdRng::seed_from_u64(0),
                Rgb::new(0, 0, 0),
                CellSizing::Fit,
            );
            r.redraw(&p).unwrap();
            let pixels: Vec<Rgb> = (0..40)
                .flat_map(|y| (0..40).map(move |x| (x, y)))
                .map(|(x, y)| r.surface().sample(x, y).unwrap())
                .collect();
            pixels
        };
        assert_eq!(draw(), draw());
    }

    #[test]
    fn noise_index_never_overflows() {
        assert_eq!(noise_index(0.0, 5), 0);
        assert_eq!(noise_index(0.2, 5), 1);
        assert_eq!(noise_index(0.999_999_9, 5), 4);
        assert_eq!(noise_index(1.0 - f32::EPSILON, 5), 4);
        assert_eq!(noise_index(1.0, 5), 4);
        assert_eq!(noise_index(7.5, 5), 4);
        assert_eq!(noise_index(-0.3, 5), 0);
        assert_eq!(noise_index(f32::NAN, 5), 0);
        assert_eq!(noise_index(0.99, 1), 0);
    }

    #[test]
    fn saturated_noise_paints_the_last_slot() {
        let palette = Palette::from_colors(&[A, B, Rgb::new(0, 255, 0)]).unwrap();
        let mut seen = Vec::new();
        scan_noise(4, &palette, 0.1, &Constant(1.0), |_, _, c| seen.push(c));
        assert_eq!(seen.len(), 16);
        assert!(seen.iter().all(|&c| c == Rgb::new(0, 255, 0)));
    }

    #[test]
    fn noise_samples_scale_with_noise_scale() {
        struct Probe(std::cell::RefCell<Vec<(f32, f32)>>);
        impl NoiseField for Probe {
            fn sample(&self, x: f32, y: f32) -> f32 {
                self.0.borrow_mut().push((x, y));
                0.0
            }
        }
        let probe = Probe(Default::default());
        scan_noise(3, &Palette::default(), 0.5, &probe, |_, _, _| {});
        let coords = probe.0.borrow();
        assert_eq!(coords[0], (0.0, 0.0));
        assert_eq!(coords[1], (NOISE_ZOOM * 0.5, 0.0));
        assert_eq!(coords[3], (0.0, NOISE_ZOOM * 0.5));
    }

    #[test]
    fn shuffle_is_disabled_only_in_noise_mode() {
        assert!(shuffle_enabled(DistributionMode::Horizontal));
        assert!(shuffle_enabled(DistributionMode::Vertical));
        assert!(!shuffle_enabled(DistributionMode::Noise));
    }

    #[test]
    fn each_redraw_is_one_cycle() {
        let mut r = renderer(50, 50, 2);
        assert_eq!(r.phase(), RenderPhase::Idle);
        assert_eq!(r.cycles(), 0);
        r.redraw(&params(DistributionMode::Noise, 5)).unwrap();
        assert_eq!(r.phase(), RenderPhase::Drawn);
        let report = r.redraw(&params(DistributionMode::Horizontal, 5)).unwrap();
        assert_eq!(r.cycles(), 2);
        assert_eq!(report.cycle, 2);
    }

    #[test]
    fn redraw_rejects_degenerate_input() {
        let mut r = renderer(50, 50, 2);
        assert_eq!(
            r.redraw(&params(DistributionMode::Noise, 0)),
            Err(RenderError::ZeroDivision)
        );
        r.resize(0, 10);
        assert_eq!(
            r.redraw(&params(DistributionMode::Noise, 4)),
            Err(RenderError::EmptySurface(0, 10))
        );
        assert_eq!(r.cycles(), 0);
        assert_eq!(r.phase(), RenderPhase::Idle);
        assert!(matches!(
            r.export(Path::new("unused.png")),
            Err(SurfaceError::NothingDrawn)
        ));
    }

    #[test]
    fn oversized_division_is_refused_before_painting() {
        let mut r = renderer(50, 50, 2);
        for mode in DistributionMode::ALL {
            assert_eq!(
                r.redraw(&params(mode, 3_000_000_000)),
                Err(RenderError::DivisionTooLarge(3_000_000_000))
            );
        }
        assert!(r.surface().fills.is_empty());
        assert_eq!(r.cycles(), 0);

        let layout = GridLayout::new(DistributionMode::Vertical, u32::MAX, (10, 10), CellSizing::Fit);
        assert_eq!((layout.cols, layout.rows), (u32::MAX, u32::MAX));
    }

    #[test]
    fn resize_is_picked_up_by_the_next_cycle() {
        let mut r = renderer(100, 100, 8);
        r.redraw(&params(DistributionMode::Noise, 4)).unwrap();
        r.resize(40, 80);
        let report = r.redraw(&params(DistributionMode::Noise, 4)).unwrap();
        assert_eq!(report.layout.cell_w, 10.0);
        assert_eq!(report.layout.cell_h, 20.0);
        let area: f32 = r.surface().fills.iter().map(|f| f.w * f.h).sum();
        assert!((area - 3200.0).abs() < 1e-2);
    }
}
