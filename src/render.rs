//! # HR diagram rendering
//!
//! [`Renderer`] is the seam between the pipeline and image output; [`PlotRenderer`] draws
//! PNG files with `plotters` into one output directory:
//!
//! | file                              | content                                          |
//! |-----------------------------------|--------------------------------------------------|
//! | `{slug}_hr_diagram.png`           | scatter of `BP−RP` against `M_G`                 |
//! | `{slug}_hr_diagram_density.png`   | 2-D histogram, 100 colour bins, empty bins blank |
//! | `all_hr_diagrams.png`             | scatter panels (up to 16 regions), shared `M_G`  |
//!
//! The magnitude axis is inverted (bright stars at the top): points are drawn at `−M_G` and
//! the axis labels are negated back.
//!
//! Records whose colour or absolute magnitude is undefined are skipped explicitly (see
//! [`AnalysisRecord::is_plottable`]); a set without any plottable point still yields an
//! image with empty axes.
use std::fmt;
use std::fs;
use std::ops::Range;

use camino::{Utf8Path, Utf8PathBuf};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{info, warn};

use crate::derived_fields::AnalysisRecord;
use crate::hr_errors::HrError;
use crate::pipeline::PipelineResult;
use crate::region::{name_slug, SearchRadius};

const COLOR_FALLBACK: Range<f64> = -0.5..3.5;
const ABS_MAG_FALLBACK: Range<f64> = -5.0..15.0;
const COMBINED_FILE: &str = "all_hr_diagrams.png";
const PANEL_PX: u32 = 500;
const MAX_PANEL_COLUMNS: usize = 4;
/// Regions drawn in the combined figure; the rest are left out with a warning.
const MAX_PANELS: usize = 16;

/// Region metadata printed on a diagram and used to name its file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderMeta {
    pub region_name: String,
    pub search_radius: SearchRadius,
}

impl RenderMeta {
    pub fn new(region_name: impl Into<String>, search_radius: SearchRadius) -> Self {
        RenderMeta {
            region_name: region_name.into(),
            search_radius,
        }
    }

    pub fn slug(&self) -> String {
        name_slug(&self.region_name)
    }

    pub fn title(&self) -> String {
        format!(
            "Gaia HR Diagram for {} (Radius: {:.2} deg)",
            self.region_name,
            self.search_radius.degrees()
        )
    }
}

impl From<&PipelineResult> for RenderMeta {
    fn from(result: &PipelineResult) -> Self {
        RenderMeta::new(result.region().name.clone(), result.search_radius())
    }
}

/// Consumer of analysis-ready records producing image artifacts.
pub trait Renderer {
    /// Scatter HR diagram of one region, returns the written file.
    fn scatter(&self, records: &[AnalysisRecord], meta: &RenderMeta) -> Result<Utf8PathBuf, HrError>;

    /// Density HR diagram of one region, returns the written file.
    fn density(&self, records: &[AnalysisRecord], meta: &RenderMeta) -> Result<Utf8PathBuf, HrError>;

    /// One scatter panel per region on a grid at most four wide, sharing the magnitude axis.
    fn panels(&self, panels: &[(RenderMeta, &[AnalysisRecord])]) -> Result<Utf8PathBuf, HrError>;
}

fn render_err<E: fmt::Display>(e: E) -> HrError {
    HrError::RenderError(e.to_string())
}

/// `(BP−RP, M_G)` of every plottable record, in input order.
pub fn plottable_points(records: &[AnalysisRecord]) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter(|a| a.is_plottable())
        .map(|a| (a.bp_rp_color, a.abs_g_mag))
        .collect()
}

/// Data range with a 5 % margin on each side, or `fallback` when there is no value.
fn padded_range(values: impl Iterator<Item = f64>, fallback: Range<f64>) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return fallback;
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
    (lo - pad)..(hi + pad)
}

/// `(rows, columns)` of the combined figure: one row up to four regions, then a grid
/// four columns wide.
fn panel_grid(n: usize) -> (usize, usize) {
    let cols = n.clamp(1, MAX_PANEL_COLUMNS);
    (n.div_ceil(cols).max(1), cols)
}

/// Star counts on a regular `nx × ny` grid over `x × y`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    nx: usize,
    ny: usize,
    x: Range<f64>,
    y: Range<f64>,
    counts: Vec<u32>,
}

impl DensityGrid {
    /// Bin `points`; points outside the ranges are ignored. `nx` and `ny` are raised to 1.
    pub fn build(points: &[(f64, f64)], nx: usize, ny: usize, x: Range<f64>, y: Range<f64>) -> Self {
        let (nx, ny) = (nx.max(1), ny.max(1));
        let mut counts = vec![0u32; nx * ny];
        for &(px, py) in points {
            if let (Some(ix), Some(iy)) = (bin_index(px, &x, nx), bin_index(py, &y, ny)) {
                counts[iy * nx + ix] += 1;
            }
        }
        DensityGrid {
            nx,
            ny,
            x,
            y,
            counts,
        }
    }

    pub fn count(&self, ix: usize, iy: usize) -> u32 {
        self.counts[iy * self.nx + ix]
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// `(x span, y span, count)` of each non-empty cell.
    pub fn nonempty_cells(&self) -> impl Iterator<Item = (Range<f64>, Range<f64>, u32)> + '_ {
        let dx = (self.x.end - self.x.start) / self.nx as f64;
        let dy = (self.y.end - self.y.start) / self.ny as f64;
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(move |(i, &c)| {
                let (ix, iy) = (i % self.nx, i / self.nx);
                let x0 = self.x.start + ix as f64 * dx;
                let y0 = self.y.start + iy as f64 * dy;
                (x0..x0 + dx, y0..y0 + dy, c)
            })
    }
}

fn bin_index(v: f64, range: &Range<f64>, n: usize) -> Option<usize> {
    let span = range.end - range.start;
    if !(span > 0.0) || v < range.start || v > range.end {
        return None;
    }
    let i = ((v - range.start) / span * n as f64) as usize;
    Some(i.min(n - 1))
}

/// Colour of a density cell: dark blue for a single star to yellow for the densest cell,
/// on a logarithmic scale.
fn density_color(count: u32, max: u32) -> HSLColor {
    let t = if max > 1 {
        (count as f64).ln() / (max as f64).ln()
    } else {
        1.0
    };
    HSLColor(0.70 - 0.55 * t, 0.85, 0.25 + 0.35 * t)
}

/// PNG renderer writing into a fixed directory.
#[derive(Debug, Clone)]
pub struct PlotRenderer {
    output_dir: Utf8PathBuf,
    size: (u32, u32),
    density_bins: usize,
}

impl PlotRenderer {
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        PlotRenderer {
            output_dir: output_dir.into(),
            size: (1000, 800),
            density_bins: 100,
        }
    }

    /// Image size in pixels of the single-region diagrams.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width.max(100), height.max(100));
        self
    }

    /// Number of bins along the colour axis of the density diagram.
    pub fn with_density_bins(mut self, bins: usize) -> Self {
        self.density_bins = bins.max(1);
        self
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    pub fn scatter_path(&self, meta: &RenderMeta) -> Utf8PathBuf {
        self.output_dir.join(format!("{}_hr_diagram.png", meta.slug()))
    }

    pub fn density_path(&self, meta: &RenderMeta) -> Utf8PathBuf {
        self.output_dir
            .join(format!("{}_hr_diagram_density.png", meta.slug()))
    }

    pub fn panels_path(&self) -> Utf8PathBuf {
        self.output_dir.join(COMBINED_FILE)
    }

    fn prepare_dir(&self) -> Result<(), HrError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}

/// Draw one scatter chart into `area`.
fn draw_scatter(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    points: &[(f64, f64)],
    caption: &str,
    x_range: Range<f64>,
    mag_range: &Range<f64>,
    caption_size: u32,
) -> Result<(), HrError> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", caption_size))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, -mag_range.end..-mag_range.start)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("G_BP - G_RP (mag)")
        .y_desc("Absolute G Magnitude (M_G)")
        .y_label_formatter(&|y| format!("{:.1}", 0.0 - *y))
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|&(c, m)| Circle::new((c, -m), 2, BLUE.mix(0.5).filled())),
        )
        .map_err(render_err)?;

    Ok(())
}

impl Renderer for PlotRenderer {
    fn scatter(&self, records: &[AnalysisRecord], meta: &RenderMeta) -> Result<Utf8PathBuf, HrError> {
        self.prepare_dir()?;
        let path = self.scatter_path(meta);
        let points = plottable_points(records);
        let x_range = padded_range(points.iter().map(|p| p.0), COLOR_FALLBACK);
        let mag_range = padded_range(points.iter().map(|p| p.1), ABS_MAG_FALLBACK);

        {
            let root = BitMapBackend::new(&path, self.size).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            draw_scatter(&root, &points, &meta.title(), x_range, &mag_range, 24)?;
            root.present().map_err(render_err)?;
        }

        info!(
            region = meta.region_name.as_str(),
            points = points.len(),
            skipped = records.len() - points.len(),
            "HR diagram saved as {path}"
        );
        Ok(path)
    }

    fn density(&self, records: &[AnalysisRecord], meta: &RenderMeta) -> Result<Utf8PathBuf, HrError> {
        self.prepare_dir()?;
        let path = self.density_path(meta);
        let points = plottable_points(records);
        let x_range = padded_range(points.iter().map(|p| p.0), COLOR_FALLBACK);
        let mag_range = padded_range(points.iter().map(|p| p.1), ABS_MAG_FALLBACK);

        // square cells in pixel space
        let nx = self.density_bins;
        let ny = ((nx as f64) * f64::from(self.size.1) / f64::from(self.size.0)).round() as usize;
        let grid = DensityGrid::build(&points, nx, ny, x_range.clone(), mag_range.clone());
        let max = grid.max_count();

        {
            let root = BitMapBackend::new(&path, self.size).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let caption = format!(
                "Gaia HR Diagram Density for {} (Radius: {:.2} deg)",
                meta.region_name,
                meta.search_radius.degrees()
            );
            let mut chart = ChartBuilder::on(&root)
                .caption(caption, ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(50)
                .build_cartesian_2d(x_range, -mag_range.end..-mag_range.start)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("G_BP - G_RP (mag)")
                .y_desc("Absolute G Magnitude (M_G)")
                .y_label_formatter(&|y| format!("{:.1}", 0.0 - *y))
                .light_line_style(BLACK.mix(0.05))
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(grid.nonempty_cells().map(|(xs, ys, count)| {
                    Rectangle::new(
                        [(xs.start, -ys.start), (xs.end, -ys.end)],
                        density_color(count, max).filled(),
                    )
                }))
                .map_err(render_err)?
                .label(format!("stars per bin (max {max}, log colour scale)"))
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], density_color(max, max).filled())
                });

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }

        info!(
            region = meta.region_name.as_str(),
            cells = grid.nonempty_cells().count(),
            "HR diagram density saved as {path}"
        );
        Ok(path)
    }

    fn panels(&self, panels: &[(RenderMeta, &[AnalysisRecord])]) -> Result<Utf8PathBuf, HrError> {
        if panels.is_empty() {
            return Err(HrError::RenderError("no region to draw".into()));
        }
        self.prepare_dir()?;
        let path = self.panels_path();

        if panels.len() > MAX_PANELS {
            warn!(
                regions = panels.len(),
                "Combined figure limited to the first {MAX_PANELS} regions."
            );
        }
        let panels = &panels[..panels.len().min(MAX_PANELS)];

        let per_panel: Vec<Vec<(f64, f64)>> =
            panels.iter().map(|(_, records)| plottable_points(records)).collect();
        let mag_range = padded_range(
            per_panel.iter().flatten().map(|p| p.1),
            ABS_MAG_FALLBACK,
        );

        let (rows, cols) = panel_grid(panels.len());
        let size = (PANEL_PX * cols as u32, PANEL_PX * rows as u32);
        {
            let root = BitMapBackend::new(&path, size).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let areas = root.split_evenly((rows, cols));
            for ((area, (meta, _)), points) in areas.iter().zip(panels).zip(&per_panel) {
                let x_range = padded_range(points.iter().map(|p| p.0), COLOR_FALLBACK);
                draw_scatter(area, points, &meta.region_name, x_range, &mag_range, 18)?;
            }
            root.present().map_err(render_err)?;
        }

        info!(panels = panels.len(), "Combined HR diagrams saved as {path}");
        Ok(path)
    }
}

/// Files written and failures collected by [`render_results`].
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub written: Vec<Utf8PathBuf>,
    pub failed: Vec<(String, HrError)>,
}

/// Render every result, then the combined panel.
///
/// A failing diagram is logged and recorded; it never stops the remaining ones.
pub fn render_results<'a, R, I>(renderer: &R, results: I, with_density: bool) -> RenderSummary
where
    R: Renderer + ?Sized,
    I: IntoIterator<Item = &'a PipelineResult>,
{
    let mut summary = RenderSummary::default();
    let mut panels = Vec::new();

    let mut record = |name: &str, outcome: Result<Utf8PathBuf, HrError>| match outcome {
        Ok(path) => summary.written.push(path),
        Err(err) => {
            warn!(region = name, "Rendering failed: {err}");
            summary.failed.push((name.to_string(), err));
        }
    };

    for result in results {
        let meta = RenderMeta::from(result);
        record(&meta.region_name, renderer.scatter(result.records(), &meta));
        if with_density {
            record(&meta.region_name, renderer.density(result.records(), &meta));
        }
        panels.push((meta, result.records()));
    }

    if !panels.is_empty() {
        record("all regions", renderer.panels(&panels));
    }
    summary
}
