mod common;

use approx::assert_relative_eq;
use common::{arcmin, good_star, omega_centauri, MockCatalogClient};
use gaia_hr::prelude::*;

fn pipeline(client: MockCatalogClient) -> RetrievalPipeline<MockCatalogClient> {
    RetrievalPipeline::new(client, PipelineConfig::default())
}

#[test]
fn quality_cut_and_absolute_magnitude() {
    let mut no_ruwe = good_star(1, 2.0, 15.0);
    no_ruwe.ruwe = None;
    let mut noisy = good_star(2, 2.0, 15.0);
    noisy.parallax_error = Some(6.0);
    let valid = good_star(3, 2.0, 15.0);

    let pipeline = pipeline(MockCatalogClient::fixed(vec![no_ruwe, noisy, valid]));
    let result = pipeline
        .run(&omega_centauri(), arcmin(30.0), 1000, true)
        .unwrap();

    assert_eq!(pipeline.client().calls(), 1);
    assert_eq!(result.stats().raw_count(), 3);
    assert_eq!(result.stats().filtered_count(), 1);
    assert_eq!(result.stats().removed_count(), 2);

    let kept = &result.records()[0];
    assert_eq!(kept.record.source_id, 3);
    assert_relative_eq!(kept.abs_g_mag, 6.505149978319906, epsilon = 1e-12);
    assert_relative_eq!(kept.bp_rp_color, 0.9, epsilon = 1e-12);
}

#[test]
fn negative_parallax_is_kept_with_undefined_magnitude() {
    let odd = good_star(7, -1.0, 15.0);
    let pipeline = pipeline(MockCatalogClient::fixed(vec![odd, good_star(8, 1.0, 12.0)]));
    let result = pipeline
        .run(&omega_centauri(), arcmin(10.0), 1000, true)
        .unwrap();

    assert_eq!(result.records().len(), 2);
    assert!(result.records()[0].abs_g_mag.is_nan());
    assert!(!result.records()[0].is_plottable());
    assert_eq!(result.plottable_count(), 1);
    assert_eq!(result.stats().undefined_abs_mag_count(), 1);
}

#[test]
fn empty_answer() {
    let pipeline = pipeline(MockCatalogClient::fixed(vec![]));
    let result = pipeline
        .run(&omega_centauri(), arcmin(30.0), 1000, true)
        .unwrap();

    assert!(result.records().is_empty());
    let stats = result.stats();
    assert_eq!(
        (stats.raw_count(), stats.filtered_count(), stats.removed_count()),
        (0, 0, 0)
    );
}

#[test]
fn disabled_filters_keep_everything() {
    let mut no_ruwe = good_star(1, 2.0, 15.0);
    no_ruwe.ruwe = None;
    let mut bad_fit = good_star(2, 2.0, 15.0);
    bad_fit.ruwe = Some(3.2);
    let raw = vec![no_ruwe, bad_fit, good_star(3, 0.5, 18.0)];

    let pipeline = pipeline(MockCatalogClient::fixed(raw.clone()));
    let result = pipeline
        .run(&omega_centauri(), arcmin(30.0), 1000, false)
        .unwrap();

    let kept: Vec<_> = result.records().iter().map(|a| a.record.clone()).collect();
    assert_eq!(kept, raw);
    assert_eq!(result.stats().removed_count(), 0);
    assert!(!result.stats().filters_applied());
    assert_eq!(result.stats().thresholds(), None);
}

#[test]
fn zero_row_limit_fails_before_the_query() {
    let pipeline = pipeline(MockCatalogClient::fixed(vec![good_star(1, 2.0, 15.0)]));
    let err = pipeline
        .run(&omega_centauri(), arcmin(30.0), 0, true)
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(pipeline.client().calls(), 0);
}

#[test]
fn retrieval_failure_is_fatal() {
    let pipeline = pipeline(MockCatalogClient::failing());
    let err = pipeline
        .run(&omega_centauri(), arcmin(30.0), 1000, true)
        .unwrap_err();

    assert!(err.is_retrieval());
    assert_eq!(err.kind(), ErrorKind::Retrieval);
}

#[test]
fn answers_breaking_the_contract_are_rejected() {
    let too_many = pipeline(MockCatalogClient::fixed(
        (0..5).map(|i| good_star(i, 1.0, 14.0)).collect(),
    ));
    assert!(matches!(
        too_many.run(&omega_centauri(), arcmin(30.0), 4, true),
        Err(HrError::RowLimitExceeded {
            returned: 5,
            row_limit: 4
        })
    ));

    let duplicated = pipeline(MockCatalogClient::fixed(vec![
        good_star(9, 1.0, 14.0),
        good_star(9, 1.2, 14.5),
    ]));
    assert!(matches!(
        duplicated.run(&omega_centauri(), arcmin(30.0), 10, true),
        Err(HrError::DuplicateSourceId(9))
    ));
}

#[test]
fn query_parameters_reach_the_client() {
    let client = MockCatalogClient::new(|position, radius, row_limit, fields| {
        assert_relative_eq!(position.ra(), 201.697);
        assert_relative_eq!(radius.degrees(), 0.25);
        assert_eq!(row_limit, 42);
        assert_eq!(fields[0], CatalogField::SourceId);
        assert!(fields.contains(&CatalogField::Ruwe));
        Ok(RawResultSet::default())
    });
    pipeline(client)
        .run(&omega_centauri(), arcmin(15.0), 42, true)
        .unwrap();
}

#[test]
fn custom_thresholds() {
    let filter = FilterParams::builder()
        .parallax_error_max(0.05)
        .ruwe_max(2.0)
        .build()
        .unwrap();
    let config = PipelineConfig::builder().filter(filter).build().unwrap();
    let pipeline = RetrievalPipeline::new(
        MockCatalogClient::fixed(vec![good_star(1, 2.0, 15.0)]),
        config,
    );

    let result = pipeline
        .run(&omega_centauri(), arcmin(30.0), 10, true)
        .unwrap();
    assert!(result.records().is_empty());
    assert_eq!(result.stats().thresholds(), Some((0.05, 2.0)));
}

#[test]
fn non_finite_magnitudes_from_a_client_are_filtered_out() {
    let mut nan_bp = good_star(1, 2.0, 15.0);
    nan_bp.bp_mag = Some(f64::NAN);
    let mut nan_g = good_star(2, 2.0, 15.0);
    nan_g.g_mag = Some(f64::NAN);

    let pipeline = pipeline(MockCatalogClient::fixed(vec![
        nan_bp,
        nan_g,
        good_star(3, 2.0, 15.0),
    ]));
    let result = pipeline
        .run(&omega_centauri(), arcmin(30.0), 10, true)
        .unwrap();

    assert_eq!(result.stats().filtered_count(), 1);
    assert_eq!(result.records()[0].record.source_id, 3);
    assert!(result.records().iter().all(|a| a.is_plottable()));
}

#[test]
fn invalid_thresholds_never_reach_the_client() {
    for (parallax_error_max, ruwe_max) in [(f64::NAN, 1.4), (5.0, -1.0), (0.0, 1.4)] {
        let err = FilterParams::builder()
            .parallax_error_max(parallax_error_max)
            .ruwe_max(ruwe_max)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
