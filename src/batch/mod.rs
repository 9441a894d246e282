//! # Batch processing of target regions
//!
//! Load a CSV table of regions and feed every enabled row into a [`RetrievalPipeline`].
//!
//! Target table
//! -----------------
//! ```text
//! name,ra,dec,radius_arcmin,row_limit,process
//! Omega Centauri,13h26m47.2s,-47d28m46s,30,300000,1
//! 47 Tucanae,00h24m05.5s,-72d04m53.2s,,,1
//! ```
//!
//! * `name`, `ra`, `dec`, `process` are mandatory columns; `radius_arcmin` and `row_limit`
//!   are optional columns whose empty cells fall back to [`BatchDefaults`].
//! * `ra`/`dec` accept decimal degrees or sexagesimal notation.
//! * `process` is `0` (skip the region) or `1`.
//! * Unknown columns, missing mandatory columns, malformed cells and duplicated region
//!   names reject the whole file with [`HrError::InvalidBatchFile`].
//!
//! Runs
//! -----------------
//! * [`BatchRunner::run`] – sequential, in table order.
//! * [`BatchRunner::run_with_cancel`] – sequential, polling a cancellation closure before
//!   each region; regions not started are reported as [`BatchOutcome::Cancelled`].
//! * [`BatchRunner::run_parallel`] – regions dispatched on the `rayon` pool, report kept in
//!   table order.
//!
//! A failing region never aborts the batch: its error is logged and stored in the
//! [`BatchReport`].
//!
//! With the `progress` feature, sequential runs draw an `indicatif` progress bar.
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io;

use ahash::RandomState;
use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress")]
use std::time::Duration;

use crate::catalog::CatalogClient;
use crate::constants::DEFAULT_ROW_LIMIT;
use crate::hr_errors::HrError;
use crate::pipeline::{PipelineResult, RetrievalPipeline};
use crate::region::{name_slug, Region, SearchRadius, SkyPosition};

#[cfg(feature = "progress")]
pub(crate) mod progress_bar;

const KNOWN_COLUMNS: [&str; 6] = ["name", "ra", "dec", "radius_arcmin", "row_limit", "process"];
const MANDATORY_COLUMNS: [&str; 4] = ["name", "ra", "dec", "process"];

/// One row of the target table, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTarget {
    pub region: Region,
    /// `None` when the cell was empty; resolved against [`BatchDefaults`] at run time.
    pub search_radius: Option<SearchRadius>,
    pub row_limit: Option<usize>,
    pub process: bool,
}

impl BatchTarget {
    pub fn new(region: Region) -> Self {
        BatchTarget {
            region,
            search_radius: None,
            row_limit: None,
            process: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.region.name
    }
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    name: String,
    ra: String,
    dec: String,
    #[serde(default)]
    radius_arcmin: Option<f64>,
    #[serde(default)]
    row_limit: Option<usize>,
    process: u8,
}

impl TargetRow {
    fn validate(self) -> Result<BatchTarget, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("empty region name".into());
        }
        let position = SkyPosition::parse(&self.ra, &self.dec).map_err(|e| e.to_string())?;
        let search_radius = self
            .radius_arcmin
            .map(SearchRadius::from_arcmin)
            .transpose()
            .map_err(|e| e.to_string())?;
        if self.row_limit == Some(0) {
            return Err("row_limit must be >= 1".into());
        }
        let process = match self.process {
            0 => false,
            1 => true,
            other => return Err(format!("process must be 0 or 1 (got {other})")),
        };

        Ok(BatchTarget {
            region: Region::new(name, position),
            search_radius,
            row_limit: self.row_limit,
            process,
        })
    }
}

/// Parse a target table from any reader.
///
/// Return
/// ----------
/// * The targets in file order, or [`HrError::InvalidBatchFile`] naming the first problem.
pub fn parse_targets<R: io::Read>(reader: R) -> Result<Vec<BatchTarget>, HrError> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| HrError::InvalidBatchFile(e.to_string()))?
        .clone();
    if let Some(unknown) = headers.iter().find(|h| !KNOWN_COLUMNS.contains(h)) {
        return Err(HrError::InvalidBatchFile(format!(
            "unknown column '{unknown}' (expected a subset of: {})",
            KNOWN_COLUMNS.iter().join(", ")
        )));
    }
    if let Some(missing) = MANDATORY_COLUMNS
        .iter()
        .find(|c| !headers.iter().any(|h| h == **c))
    {
        return Err(HrError::InvalidBatchFile(format!(
            "missing column '{missing}'"
        )));
    }

    let mut targets = Vec::new();
    let mut slugs: HashSet<String, RandomState> = HashSet::default();
    for (i, row) in csv_reader.deserialize::<TargetRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|e| HrError::InvalidBatchFile(format!("line {line}: {e}")))?;
        let target = row
            .validate()
            .map_err(|msg| HrError::InvalidBatchFile(format!("line {line}: {msg}")))?;
        if !slugs.insert(name_slug(target.name())) {
            return Err(HrError::InvalidBatchFile(format!(
                "line {line}: region '{}' is listed twice",
                target.name()
            )));
        }
        targets.push(target);
    }

    Ok(targets)
}

/// Load a target table from disk (see [`parse_targets`]).
pub fn load_targets(path: &Utf8Path) -> Result<Vec<BatchTarget>, HrError> {
    let file = File::open(path)?;
    parse_targets(file)
}

/// Values used when a target leaves a cell empty, and the filter switch of the batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchDefaults {
    pub search_radius: SearchRadius,
    pub row_limit: usize,
    pub apply_filters: bool,
}

impl BatchDefaults {
    /// Return
    /// ----------
    /// * `Err` with a configuration error if `radius_arcmin` is not a valid cone radius or
    ///   `row_limit == 0`.
    pub fn new(radius_arcmin: f64, row_limit: usize, apply_filters: bool) -> Result<Self, HrError> {
        if row_limit == 0 {
            return Err(HrError::InvalidPipelineParameter(
                "row_limit must be >= 1".into(),
            ));
        }
        Ok(BatchDefaults {
            search_radius: SearchRadius::from_arcmin(radius_arcmin)?,
            row_limit,
            apply_filters,
        })
    }
}

impl Default for BatchDefaults {
    fn default() -> Self {
        BatchDefaults {
            search_radius: SearchRadius::default(),
            row_limit: DEFAULT_ROW_LIMIT,
            apply_filters: true,
        }
    }
}

/// What happened to one target.
#[derive(Debug, PartialEq)]
pub enum BatchOutcome {
    Completed(PipelineResult),
    Failed(HrError),
    /// `process = 0` in the target table.
    Skipped,
    /// Not started because the batch was cancelled.
    Cancelled,
}

impl BatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            BatchOutcome::Completed(_) => "completed",
            BatchOutcome::Failed(_) => "failed",
            BatchOutcome::Skipped => "skipped",
            BatchOutcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct BatchEntry {
    pub target: BatchTarget,
    pub outcome: BatchOutcome,
}

/// Outcomes of a batch, in target-table order.
#[derive(Debug, Default, PartialEq)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Results of the regions that completed, in table order.
    pub fn completed(&self) -> impl Iterator<Item = &PipelineResult> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            BatchOutcome::Completed(r) => Some(r),
            _ => None,
        })
    }

    /// Regions that failed, with their error.
    pub fn failures(&self) -> impl Iterator<Item = (&BatchTarget, &HrError)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            BatchOutcome::Failed(err) => Some((&e.target, err)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&BatchOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn completed_count(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Completed(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Skipped))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, BatchOutcome::Cancelled))
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Batch summary")?;
            writeln!(f, "-------------")?;
            for e in &self.entries {
                match &e.outcome {
                    BatchOutcome::Completed(r) => {
                        writeln!(f, "{:<24} completed  {}", e.target.name(), r.stats())?
                    }
                    BatchOutcome::Failed(err) => {
                        writeln!(f, "{:<24} failed     {err}", e.target.name())?
                    }
                    other => writeln!(f, "{:<24} {}", e.target.name(), other.label())?,
                }
            }
        }
        write!(
            f,
            "{} regions: {} completed, {} failed, {} skipped, {} cancelled",
            self.entries.len(),
            self.completed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.cancelled_count()
        )
    }
}

/// Drives a [`RetrievalPipeline`] over a list of targets.
#[derive(Debug, Clone)]
pub struct BatchRunner<C> {
    pipeline: RetrievalPipeline<C>,
    defaults: BatchDefaults,
}

impl<C: CatalogClient> BatchRunner<C> {
    pub fn new(pipeline: RetrievalPipeline<C>, defaults: BatchDefaults) -> Self {
        BatchRunner { pipeline, defaults }
    }

    pub fn pipeline(&self) -> &RetrievalPipeline<C> {
        &self.pipeline
    }

    pub fn defaults(&self) -> &BatchDefaults {
        &self.defaults
    }

    fn process_one(&self, target: &BatchTarget) -> BatchOutcome {
        let name = target.name();
        if !target.process {
            info!(region = name, "Skipping {name} (process = 0).");
            return BatchOutcome::Skipped;
        }

        let radius = target.search_radius.unwrap_or(self.defaults.search_radius);
        let row_limit = target.row_limit.unwrap_or(self.defaults.row_limit);
        match self
            .pipeline
            .run(&target.region, radius, row_limit, self.defaults.apply_filters)
        {
            Ok(result) => BatchOutcome::Completed(result),
            Err(err) => {
                warn!(region = name, kind = ?err.kind(), "Processing {name} failed: {err}");
                BatchOutcome::Failed(err)
            }
        }
    }

    /// Process every target in order.
    pub fn run(&self, targets: &[BatchTarget]) -> BatchReport {
        self.run_with_cancel(targets, || false)
    }

    /// Process targets in order, calling `should_cancel` before each enabled region.
    ///
    /// Once `should_cancel` returns `true`, no further pipeline run is started: the remaining
    /// enabled targets are reported as [`BatchOutcome::Cancelled`] and disabled ones keep
    /// their [`BatchOutcome::Skipped`] outcome.
    pub fn run_with_cancel<F>(&self, targets: &[BatchTarget], mut should_cancel: F) -> BatchReport
    where
        F: FnMut() -> bool,
    {
        #[cfg(feature = "progress")]
        let pb = {
            let pb = ProgressBar::new((targets.len() as u64).max(1));
            pb.set_style(
                ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | ETA {eta_precise} | {msg}",
                )
                .expect("indicatif template"),
            );
            pb.enable_steady_tick(Duration::from_millis(200));
            pb
        };
        #[cfg(feature = "progress")]
        let mut it_timer = progress_bar::IterTimer::new(0.2);

        let mut cancelled = false;
        let mut entries = Vec::with_capacity(targets.len());

        for target in targets {
            if target.process && !cancelled && should_cancel() {
                info!("Batch cancelled, remaining regions are not started.");
                cancelled = true;
            }

            #[cfg(feature = "progress")]
            {
                use progress_bar::fmt_dur;
                let last = it_timer.tick();
                let avg = it_timer.avg();
                pb.set_message(format!(
                    "{} | last: {}, avg: {}",
                    target.name(),
                    fmt_dur(last),
                    fmt_dur(avg)
                ));
            }

            let outcome = if cancelled && target.process {
                BatchOutcome::Cancelled
            } else {
                self.process_one(target)
            };
            entries.push(BatchEntry {
                target: target.clone(),
                outcome,
            });

            #[cfg(feature = "progress")]
            pb.inc(1);
        }

        #[cfg(feature = "progress")]
        {
            pb.disable_steady_tick();
            pb.finish_and_clear();
        }

        BatchReport { entries }
    }
}

impl<C: CatalogClient + Sync> BatchRunner<C> {
    /// Process targets concurrently on the global `rayon` pool.
    ///
    /// Each region runs its own pipeline invocation; the report is in target-table order.
    pub fn run_parallel(&self, targets: &[BatchTarget]) -> BatchReport {
        let entries = targets
            .par_iter()
            .map(|target| BatchEntry {
                target: target.clone(),
                outcome: self.process_one(target),
            })
            .collect();
        BatchReport { entries }
    }
}
