//! carestar CLI Module
//!
//! Command-line interface for dataset inspection and the full analysis.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::explainability::FeatureRanking;
use crate::pipeline::{AnalysisConfig, Pipeline, DEFAULT_TARGET};
use crate::preprocessing::{LeakageRule, MissingPolicy};
use crate::scenario::{ScenarioOutcome, ScenarioStatus};
use crate::training::TrainedModel;
use crate::utils::DatasetReport;
use crate::visualization::{truncate, Histogram, SvgRenderer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width
const LABEL_W: usize = 44;
const BAR_W: usize = 30;

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = if visible_len < W { W - visible_len } else { 0 };
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = if visible_len < W { W - visible_len } else { 0 };
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn indent(block: &str) {
    for line in block.lines() {
        println!("  {}", line);
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "carestar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Home healthcare quality star-rating analysis")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Profile, train, explain and run the what-if scenario
    Analyze(AnalyzeArgs),

    /// Show shape, schema, missing values and summary statistics
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Field separator
        #[arg(long, default_value = ",")]
        separator: char,
    },

    /// Dataset report plus one histogram per floating-point column
    Profile {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Histogram bins
        #[arg(long, default_value = "15")]
        bins: usize,

        /// Write histograms.svg into this directory
        #[arg(long)]
        plots: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub data: PathBuf,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target column
    #[arg(short, long)]
    pub target: Option<String>,

    /// Row label column for the per-state table
    #[arg(long)]
    pub state_column: Option<String>,

    /// Column raised by the what-if scenario
    #[arg(long)]
    pub scenario_column: Option<String>,

    /// Skip the what-if scenario
    #[arg(long)]
    pub no_scenario: bool,

    /// Points added to the scenario column
    #[arg(long)]
    pub delta: Option<f64>,

    /// Upper bound of the scenario column
    #[arg(long)]
    pub cap: Option<f64>,

    /// Number of trees
    #[arg(long)]
    pub trees: Option<usize>,

    /// Random seed for the split and the forest
    #[arg(long)]
    pub seed: Option<u64>,

    /// Held-out fraction
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Features shown in the importance ranking
    #[arg(long)]
    pub top: Option<usize>,

    /// Keep "Star Rating ... Percentage" columns as features
    #[arg(long)]
    pub keep_leakage: bool,

    /// Fail on missing values instead of dropping incomplete rows
    #[arg(long)]
    pub strict: bool,

    /// Write SVG charts into this directory
    #[arg(long)]
    pub plots: Option<PathBuf>,
}

impl AnalyzeArgs {
    /// Config file (or defaults) with flag overrides applied
    pub fn to_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(target) = &self.target {
            config.target_column = target.clone();
        }
        if let Some(column) = &self.state_column {
            config.scenario.state_column = column.clone();
        }
        if let Some(column) = &self.scenario_column {
            config.scenario.column = column.clone();
        }
        if self.no_scenario {
            config.scenario.enabled = false;
        }
        if let Some(delta) = self.delta {
            config.scenario.delta = delta;
        }
        if let Some(cap) = self.cap {
            config.scenario.cap = cap;
        }
        if let Some(trees) = self.trees {
            config.training.n_estimators = trees;
        }
        if let Some(seed) = self.seed {
            config.training.random_seed = seed;
        }
        if let Some(test_size) = self.test_size {
            config.training.test_size = test_size;
        }
        if let Some(top) = self.top {
            config.top_features = top;
        }
        if self.keep_leakage {
            config.leakage = LeakageRule::disabled();
        }
        if self.strict {
            config.missing = MissingPolicy::Fail;
        }
        if let Some(dir) = &self.plots {
            config.plot_dir = Some(dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Output blocks ─────────────────────────────────────────────────────────────

fn print_dataset(path: &Path, report: &DatasetReport) {
    println!("  {:<12} {}", muted("File"), path.display());
    println!("  {:<12} ({}, {})", muted("Shape"), report.n_rows, report.n_cols);
    println!("  {:<12} {}", muted("Missing"), report.total_missing());
    println!();

    println!("  {:<46} {:<10} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(64)));
    for col in &report.columns {
        println!(
            "  {:<46} {:<10} {:>6}",
            truncate(&col.name, 46),
            col.dtype.truecolor(140, 140, 140),
            col.null_count
        );
    }

    if report.summaries.is_empty() {
        return;
    }

    section("Summary Statistics");
    println!(
        "  {:<32} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
        muted("Column"), muted("count"), muted("mean"), muted("std"), muted("min"),
        muted("25%"), muted("50%"), muted("75%"), muted("max")
    );
    println!("  {}", dim(&"─".repeat(108)));
    for s in &report.summaries {
        println!(
            "  {:<32} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            truncate(&s.name, 32),
            s.count,
            opt(s.mean),
            opt(s.std),
            opt(s.min),
            opt(s.q25),
            opt(s.median),
            opt(s.q75),
            opt(s.max)
        );
    }
}

fn print_histograms(hists: &[Histogram]) {
    for hist in hists {
        println!();
        for line in hist.title.lines() {
            println!("  {}", line.white());
        }
        indent(&hist.render_text(BAR_W));
    }
}

fn print_model(model: &TrainedModel) {
    let m = model.metrics();
    let (train, test) = model.split_sizes();
    println!();
    println!("  {:<16} {}", muted("Rows"), format!("{} train / {} test", train, test).white());
    println!("  {:<16} {}", muted("Features"), m.n_features.to_string().white());
    println!("  {:<16} {}", muted("MSE"), format!("{:.4}", m.mse).white().bold());
    println!("  {:<16} {}", muted("RMSE"), format!("{:.4}", m.rmse).white());
    println!("  {:<16} {}", muted("MAE"), format!("{:.4}", m.mae).white());
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", m.r2).white().bold());
    println!("  {:<16} {}", muted("Time"), format!("{:.3}s", m.training_time_secs).white());
}

fn print_ranking(ranking: &FeatureRanking, k: usize) {
    println!();
    println!("  {:>4}  {:<60} {:>10}", muted("#"), muted("Feature"), muted("Importance"));
    println!("  {}", dim(&"─".repeat(76)));
    for (i, entry) in ranking.top(k).iter().enumerate() {
        println!(
            "  {:>4}  {:<60} {:>10.4}",
            i + 1,
            truncate(&entry.feature, 60),
            entry.importance
        );
    }
}

fn print_scenario(outcome: &ScenarioOutcome, top: usize) {
    println!();
    line_box_top();
    line_box_center(&format!("{}", "What-if Scenario".white().bold()));
    line_box_sep();
    line_box(&kv("Column  ", &truncate(&outcome.column, 46)));
    line_box(&kv("Change  ", &format!("{:+} points, capped at {}", outcome.delta, outcome.cap)));
    line_box(&kv(
        "Result  ",
        &format!("Average predicted rating change: {:+.2} stars", outcome.mean_delta),
    ));
    line_box(&kv(
        "Improved",
        &format!("{} of {} rows", outcome.n_improved(), outcome.deltas.len()),
    ));
    line_box_bottom();

    let states = outcome.top_states(top);
    if states.is_empty() {
        return;
    }

    println!();
    println!("  Top {} states by improvement:", states.len());
    println!(
        "  {:<10} {:>16} {:>16} {:>10}",
        muted("State"), muted("Baseline Rating"), muted("What-if Rating"), muted("Change")
    );
    println!("  {}", dim(&"─".repeat(56)));
    for s in states {
        println!(
            "  {:<10} {:>16.4} {:>16.4} {:>10}",
            s.state,
            s.baseline,
            s.whatif,
            format!("{:+.4}", s.delta).truecolor(100, 210, 120)
        );
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let pipeline = Pipeline::new(config)?;
    let top_k = pipeline.config().top_features;
    let top_states = pipeline.config().scenario.top_states;

    section("Dataset");
    step_run("Loading data");
    let start = Instant::now();
    let loaded = pipeline.load(&args.data)?;
    step_done(&format!("{} rows × {} cols in {:?}", loaded.frame.height(), loaded.frame.width(), start.elapsed()));
    print_dataset(&args.data, &loaded.report);

    section("Histograms of Numeric Features");
    let histograms = pipeline.profile(&loaded.frame)?;
    print_histograms(&histograms);

    section("Model");
    let prepared = pipeline.split(&loaded.frame)?;
    step_ok(&format!(
        "{} features, {} leakage column(s) excluded",
        prepared.features.features.len(),
        prepared.features.leakage.len()
    ));
    if prepared.dropped_rows > 0 {
        println!("  {} {} incomplete row(s) dropped", "!".yellow(), prepared.dropped_rows);
    }

    step_run(&format!("Training random forest ({} trees)", pipeline.config().training.n_estimators));
    let start = Instant::now();
    let model = pipeline.train(&prepared)?;
    step_done(&format!("{:?}", start.elapsed()));
    print_model(&model);

    section(&format!("Top {} Features Influencing {}", top_k, pipeline.config().target_column));
    let ranking = pipeline.explain(&model)?;
    print_ranking(&ranking, top_k);

    let scenario = pipeline.scenario(&prepared, &model)?;
    let report = pipeline.report(loaded, histograms, prepared, &model, ranking, scenario);

    println!();
    indent(&report.importance_chart().render_text(LABEL_W, BAR_W));

    section("What-if");
    match &report.scenario {
        ScenarioStatus::Completed(outcome) => {
            print_scenario(outcome, top_states);
            if let Some(chart) = report.scenario_chart() {
                println!();
                indent(&chart.render_text(BAR_W));
            }
        }
        ScenarioStatus::Skipped { reason } => {
            println!("  {} {}", muted("skipped:"), reason);
        }
    }

    let written = pipeline.render(&report)?;
    if !written.is_empty() {
        section("Plots");
        for path in &written {
            step_ok(&path.display().to_string());
        }
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path, separator: char) -> anyhow::Result<()> {
    section("Data Info");

    let mut config = AnalysisConfig::default();
    config.separator = separator;
    let pipeline = Pipeline::new(config)?;
    let loaded = pipeline.load(data_path)?;

    print_dataset(data_path, &loaded.report);
    if loaded.report.summary(DEFAULT_TARGET).is_none() {
        println!();
        println!("  {} {}", muted("note:"), format!("no numeric '{}' column", DEFAULT_TARGET).yellow());
    }

    println!();
    Ok(())
}

pub fn cmd_profile(data_path: &Path, bins: usize, plots: Option<&Path>) -> anyhow::Result<()> {
    let mut config = AnalysisConfig::default();
    config.profile.bins = bins;
    let pipeline = Pipeline::new(config)?;

    section("Data Info");
    let loaded = pipeline.load(data_path)?;
    print_dataset(data_path, &loaded.report);

    section("Histograms of Numeric Features");
    let histograms = pipeline.profile(&loaded.frame)?;
    print_histograms(&histograms);

    if let Some(dir) = plots {
        let renderer = SvgRenderer::new(dir)?;
        let path = renderer.histogram_grid("histograms.svg", "Histograms of Numeric Features", &histograms)?;
        println!();
        step_ok(&path.display().to_string());
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_analyze_flags_override_defaults() {
        let cli = parse(&[
            "carestar", "analyze", "-d", "data.csv", "--trees", "25", "--seed", "7",
            "--delta", "5", "--no-scenario", "--strict", "--keep-leakage",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let config = args.to_config().unwrap();
        assert_eq!(config.training.n_estimators, 25);
        assert_eq!(config.training.random_seed, 7);
        assert_eq!(config.scenario.delta, 5.0);
        assert!(!config.scenario.enabled);
        assert_eq!(config.missing, MissingPolicy::Fail);
        assert!(!config.leakage.enabled);
        assert!(config.plot_dir.is_none());
    }

    #[test]
    fn test_analyze_invalid_flag_value() {
        let cli = parse(&["carestar", "analyze", "-d", "data.csv", "--test-size", "1.5"]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }
}
