//! # Tabular preview of processed records
//!
//! [`AnalysisDisplay`] borrows a slice of [`AnalysisRecord`]s and renders the first rows as a
//! table when used with Rust formatting (`{}`), without cloning the records.
//!
//! Columns: `source_id | G | BP−RP | M_G | parallax | ruwe`. Undefined values (a missing
//! catalog field or a `NaN` derived value) are printed as `—`.
//!
//! ```rust,ignore
//! use gaia_hr::display::AnalysisDisplayExt;
//!
//! println!("{}", result.records().show().head(5));
//! ```
//!
//! The table itself is built with [`comfy-table`](https://crates.io/crates/comfy-table).
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::derived_fields::AnalysisRecord;

const UNDEFINED: &str = "—";

/// Display adaptor over a borrowed slice of analysis records.
pub struct AnalysisDisplay<'a> {
    records: &'a [AnalysisRecord],
    /// Number of leading rows printed; `None` prints everything.
    head: Option<usize>,
    /// Fractional digits for magnitudes and parallaxes (default = 3).
    prec: usize,
}

impl<'a> AnalysisDisplay<'a> {
    pub fn new(records: &'a [AnalysisRecord]) -> Self {
        Self {
            records,
            head: None,
            prec: 3,
        }
    }

    /// Print only the first `n` rows.
    pub fn head(mut self, n: usize) -> Self {
        self.head = Some(n);
        self
    }

    pub fn with_precision(mut self, prec: usize) -> Self {
        self.prec = prec;
        self
    }

    fn shown(&self) -> &'a [AnalysisRecord] {
        match self.head {
            Some(n) => &self.records[..n.min(self.records.len())],
            None => self.records,
        }
    }

    fn num_cell(&self, v: Option<f64>) -> Cell {
        let text = match v {
            Some(x) if x.is_finite() => format!("{:.*}", self.prec, x),
            _ => UNDEFINED.to_string(),
        };
        Cell::new(text).set_alignment(CellAlignment::Right)
    }

    fn render_comfy(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("source_id"),
            Cell::new("G"),
            Cell::new("BP−RP"),
            Cell::new("M_G"),
            Cell::new("parallax [mas]"),
            Cell::new("ruwe"),
        ]);

        for a in self.shown() {
            let r = &a.record;
            table.add_row(Row::from(vec![
                Cell::new(r.source_id).set_alignment(CellAlignment::Right),
                self.num_cell(r.g_mag),
                self.num_cell(Some(a.bp_rp_color)),
                self.num_cell(Some(a.abs_g_mag)),
                self.num_cell(r.parallax),
                self.num_cell(r.ruwe),
            ]));
        }

        table.to_string()
    }
}

impl fmt::Display for AnalysisDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processed records (showing {} of {})",
            self.shown().len(),
            self.records.len()
        )?;
        f.write_str(&self.render_comfy())
    }
}

/// Ergonomic builder of [`AnalysisDisplay`] adaptors.
pub trait AnalysisDisplayExt {
    fn show(&self) -> AnalysisDisplay<'_>;

    fn show_string(&self) -> String {
        format!("{}", self.show())
    }
}

impl AnalysisDisplayExt for [AnalysisRecord] {
    fn show(&self) -> AnalysisDisplay<'_> {
        AnalysisDisplay::new(self)
    }
}

impl AnalysisDisplayExt for Vec<AnalysisRecord> {
    fn show(&self) -> AnalysisDisplay<'_> {
        AnalysisDisplay::new(self)
    }
}
