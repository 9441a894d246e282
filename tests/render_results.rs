mod common;

use std::sync::Mutex;

use camino::Utf8PathBuf;
use common::{arcmin, good_star, region, MockCatalogClient};
use gaia_hr::prelude::*;

/// Records what it was asked to draw; refuses regions named "broken".
#[derive(Default)]
struct RecordingRenderer {
    drawn: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    fn draw(&self, kind: &str, meta: &RenderMeta) -> Result<Utf8PathBuf, HrError> {
        if meta.region_name == "broken" {
            return Err(HrError::RenderError("backend refused".into()));
        }
        self.drawn
            .lock()
            .unwrap()
            .push(format!("{kind}:{}", meta.slug()));
        Ok(Utf8PathBuf::from(format!("{}_{kind}.png", meta.slug())))
    }
}

impl Renderer for RecordingRenderer {
    fn scatter(&self, _: &[AnalysisRecord], meta: &RenderMeta) -> Result<Utf8PathBuf, HrError> {
        self.draw("scatter", meta)
    }

    fn density(&self, _: &[AnalysisRecord], meta: &RenderMeta) -> Result<Utf8PathBuf, HrError> {
        self.draw("density", meta)
    }

    fn panels(&self, panels: &[(RenderMeta, &[AnalysisRecord])]) -> Result<Utf8PathBuf, HrError> {
        self.drawn
            .lock()
            .unwrap()
            .push(format!("panels:{}", panels.len()));
        Ok(Utf8PathBuf::from("all_hr_diagrams.png"))
    }
}

fn results(names: &[&str]) -> Vec<PipelineResult> {
    let pipeline = RetrievalPipeline::new(
        MockCatalogClient::fixed(vec![good_star(1, 2.0, 15.0)]),
        PipelineConfig::default(),
    );
    names
        .iter()
        .map(|name| {
            pipeline
                .run(&region(name, 100.0, 20.0), arcmin(5.0), 10, true)
                .unwrap()
        })
        .collect()
}

#[test]
fn every_result_is_drawn_then_combined() {
    let results = results(&["Omega Centauri", "47 Tucanae"]);
    let renderer = RecordingRenderer::default();
    let summary = render_results(&renderer, &results, true);

    assert!(summary.failed.is_empty());
    assert_eq!(summary.written.len(), 5);
    assert_eq!(
        *renderer.drawn.lock().unwrap(),
        [
            "scatter:omega_centauri",
            "density:omega_centauri",
            "scatter:47_tucanae",
            "density:47_tucanae",
            "panels:2",
        ]
    );
}

#[test]
fn render_failure_is_isolated() {
    let results = results(&["broken", "M4"]);
    let renderer = RecordingRenderer::default();
    let summary = render_results(&renderer, &results, false);

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "broken");
    assert_eq!(summary.written.len(), 2);
}

#[test]
fn nothing_to_draw() {
    let renderer = RecordingRenderer::default();
    let summary = render_results(&renderer, &Vec::<PipelineResult>::new(), true);
    assert!(summary.written.is_empty());
    assert!(renderer.drawn.lock().unwrap().is_empty());
}

#[test]
fn meta_from_result() {
    let results = results(&["NGC 6397"]);
    let meta = RenderMeta::from(&results[0]);
    assert_eq!(meta.slug(), "ngc_6397");
    assert_eq!(meta.title(), "Gaia HR Diagram for NGC 6397 (Radius: 0.08 deg)");
}
