use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use spectral_rocks::config::ExperimentConfig;
use spectral_rocks::data::split::SplitKind;
use spectral_rocks::harness;
use spectral_rocks::model::ALL_MODELS;
use spectral_rocks::pre::ALL_PRE;

#[derive(Parser)]
#[command(name = "spectral-rocks")]
#[command(about = "Classify minerals from optical emission spectra")]
#[command(version)]
struct Cli {
    /// Dataset directory, or a single .parquet / .json dataset file
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// JSON experiment config; flags given here override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to train
    #[arg(short, long)]
    model: Option<String>,

    /// Directory levels folded into each label
    #[arg(long)]
    depth: Option<usize>,

    /// Preprocessing step, repeat for several; applied in the given order
    #[arg(short, long = "pre")]
    pre: Vec<String>,

    /// Train/test split policy
    #[arg(long, value_enum)]
    split: Option<SplitArg>,

    /// Fraction of spectra sent to training (stratified split)
    #[arg(long)]
    ratio: Option<f64>,

    /// Seed of the stratified split
    #[arg(long)]
    seed: Option<u64>,

    /// Output size of the pca and lda reducers
    #[arg(long)]
    components: Option<usize>,

    /// Rank training spectra by |r| in the correlation model
    #[arg(long)]
    abs_correlation: bool,

    /// Predict on all cores
    #[arg(long)]
    parallel: bool,

    /// Write the report as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// List available models and preprocessing steps, then exit
    #[arg(long)]
    list: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SplitArg {
    LeaveOneOut,
    Stratified,
}

impl From<SplitArg> for SplitKind {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::LeaveOneOut => SplitKind::LeaveOneOut,
            SplitArg::Stratified => SplitKind::Stratified,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list {
        println!("models:        {}", ALL_MODELS.join(", "));
        println!("preprocessing: {}", ALL_PRE.join(", "));
        return;
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let report = harness::run(&config)?;
    print!("{report}");

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&report).context("serialising report")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_json_file(path)
            .with_context(|| format!("config: {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    if let Some(data) = &cli.data {
        config.data_dir = data.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(depth) = cli.depth {
        config.labels_depth = depth;
    }
    if !cli.pre.is_empty() {
        config.preprocessing = cli.pre.clone();
    }
    if let Some(split) = cli.split {
        config.split = split.into();
    }
    if let Some(ratio) = cli.ratio {
        config.train_ratio = ratio;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(components) = cli.components {
        config.components = components;
    }
    config.abs_correlation |= cli.abs_correlation;
    config.parallel |= cli.parallel;

    log::debug!("Experiment: {config:?}");
    Ok(config)
}
