//! Integration test: Full analysis (load → profile → split → train → explain → scenario)

use carestar::prelude::*;
use carestar::scenario::FLU_SHOT_COLUMN;
use std::io::Write;
use std::path::Path;

const TARGET: &str = "Quality of Patient Care Star Rating";
const LEAK: &str = "Star Rating (1-5) Percentage of HHAs with 5 stars";
const WALK: &str = "How often patients got better at walking or moving around";

/// 40 states, rating linear in the flu-shot rate; row 0 has flu = 95
fn write_quality_csv(path: &Path, missing_walk_rows: &[usize]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "State,{},{},{},{}", TARGET, LEAK, FLU_SHOT_COLUMN, WALK).unwrap();

    for i in 0..40usize {
        let flu = if i == 0 { 95.0 } else { 55.0 + i as f64 };
        let walk = 60.0 + ((i * 13) % 17) as f64;
        let rating = 1.0 + (flu - 55.0) / 12.0;
        let leak = rating * 20.0;
        let walk_cell = if missing_walk_rows.contains(&i) {
            String::new()
        } else {
            format!("{:.1}", walk)
        };
        writeln!(file, "S{:02},{:.4},{:.2},{:.1},{}", i, rating, leak, flu, walk_cell).unwrap();
    }
}

fn small_config() -> AnalysisConfig {
    AnalysisConfig::new().with_training(TrainingConfig::new().with_n_estimators(30))
}

#[test]
fn test_full_analysis_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);

    let pipeline = Pipeline::new(small_config()).unwrap();
    let report = pipeline.run(&csv).unwrap();

    assert_eq!(report.dataset.n_rows, 40);
    assert_eq!(report.dataset.n_cols, 5);
    assert_eq!(report.dataset.total_missing(), 0);
    assert_eq!(report.histograms.len(), 4);

    // target and leakage never reach the model
    assert_eq!(report.features.leakage, vec![LEAK]);
    assert!(!report.features.contains_feature(TARGET));
    assert!(!report.features.contains_feature(LEAK));
    assert_eq!(report.features.features.len(), 2);

    assert_eq!(report.split_sizes, (32, 8));
    assert!(report.metrics.r2 > 0.0, "R² = {}", report.metrics.r2);
    assert!(report.metrics.mse >= 0.0);

    assert!((report.ranking.total() - 1.0).abs() < 1e-9);
    assert_eq!(report.top_features()[0].feature, FLU_SHOT_COLUMN);
}

#[test]
fn test_scenario_clips_at_cap() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);

    let report = Pipeline::new(small_config()).unwrap().run(&csv).unwrap();
    let outcome = report.scenario.outcome().expect("scenario should run");

    assert_eq!(outcome.original[0], 95.0);
    assert_eq!(outcome.adjusted[0], 100.0);
    assert_eq!(outcome.original[1], 56.0);
    assert_eq!(outcome.adjusted[1], 66.0);

    let mean = outcome.deltas.iter().sum::<f64>() / outcome.deltas.len() as f64;
    assert!((outcome.mean_delta - mean).abs() < 1e-12);
    assert!(outcome.mean_delta > 0.0);

    let top = outcome.top_states(5);
    assert_eq!(top.len(), 5);
    assert!(top.windows(2).all(|w| w[0].delta >= w[1].delta));
}

#[test]
fn test_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);

    let pipeline = Pipeline::new(small_config()).unwrap();
    let first = pipeline.run(&csv).unwrap();
    let second = pipeline.run(&csv).unwrap();

    assert_eq!(first.metrics.mse, second.metrics.mse);
    assert_eq!(first.metrics.r2, second.metrics.r2);
    assert_eq!(first.ranking.entries(), second.ranking.entries());
    assert_eq!(
        first.scenario.outcome().map(|o| o.deltas.clone()),
        second.scenario.outcome().map(|o| o.deltas.clone())
    );
}

#[test]
fn test_scenario_skipped_when_column_absent() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);

    let config = small_config().with_scenario(ScenarioConfig::new().with_column("Not a column"));
    let report = Pipeline::new(config).unwrap().run(&csv).unwrap();

    assert!(report.scenario.is_skipped());
    assert!(report.metrics.r2.is_finite());
    assert_eq!(report.ranking.len(), 2);
}

#[test]
fn test_missing_values_policy() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[3, 7]);

    let report = Pipeline::new(small_config()).unwrap().run(&csv).unwrap();
    assert_eq!(report.dropped_rows, 2);
    assert_eq!(report.dataset.total_missing(), 2);
    assert_eq!(report.split_sizes.0 + report.split_sizes.1, 38);
    assert_eq!(report.scenario.outcome().map(|o| o.deltas.len()), Some(38));

    let strict = small_config().with_missing_policy(MissingPolicy::Fail);
    let result = Pipeline::new(strict).unwrap().run(&csv);
    assert!(matches!(result, Err(CarestarError::ValidationError(_))));
}

#[test]
fn test_missing_file_and_target() {
    let pipeline = Pipeline::new(small_config()).unwrap();
    assert!(matches!(
        pipeline.run(Path::new("/definitely/not/here.csv")),
        Err(CarestarError::DataError(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);
    let pipeline = Pipeline::new(small_config().with_target("Overall Rating")).unwrap();
    assert!(matches!(pipeline.run(&csv), Err(CarestarError::FeatureNotFound(_))));
}

#[test]
fn test_leakage_rule_disabled_keeps_column() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);

    let config = small_config().with_leakage(LeakageRule::disabled());
    let report = Pipeline::new(config).unwrap().run(&csv).unwrap();
    assert!(report.features.contains_feature(LEAK));
    assert!(report.features.leakage.is_empty());
}

#[test]
fn test_plot_files() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("quality.csv");
    write_quality_csv(&csv, &[]);
    let plots = dir.path().join("out");

    let report = Pipeline::new(small_config().with_plot_dir(&plots))
        .unwrap()
        .run(&csv)
        .unwrap();

    let svg = std::fs::read_to_string(plots.join("importances.svg")).unwrap();
    assert!(svg.contains("Importance Score"));
    assert!(plots.join("histograms.svg").exists());
    assert!(plots.join("whatif.svg").exists());
    assert_eq!(report.importance_chart().bars.len(), 2);
}
