//! qsar-ablate entry point.
//!
//! Loads a pretrained graph-convolution model from a settings file, then
//! evaluates it once per feature-channel group with that group replaced by
//! its corpus average.

use anyhow::{Context, Result};
use clap::Parser;
use qsar_ablation::{AblationDriver, AblationSummary};
use qsar_core::{
    read_config, AblationSettings, ModelBuilder, QsarError, WeightLoader, ATTRIBUTE_VECTOR_SIZE,
};
use qsar_gnn::{GraphConvBuilder, JsonWeightLoader, RegressionEvaluator};
use qsar_io::JsonDatasetLoader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "qsar-ablate")]
#[command(version = VERSION)]
#[command(about = "Feature ablation of a pretrained molecular graph-convolution model", long_about = None)]
struct Args {
    /// Settings file with [IO], [ARCHITECTURE], [TRAINING] and [DATA] sections
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Ctrl-C handling: cancels model construction while it runs, otherwise
/// ends the process.
#[derive(Debug, Clone, Default)]
struct BuildInterrupt {
    building: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl BuildInterrupt {
    fn install() -> Result<Self> {
        let interrupt = Self::default();
        let handler = interrupt.clone();
        ctrlc::set_handler(move || handler.on_interrupt())
            .context("Failed to install Ctrl-C handler")?;
        Ok(interrupt)
    }

    fn on_interrupt(&self) {
        if self.building.load(Ordering::SeqCst) {
            self.cancel.store(true, Ordering::SeqCst);
        } else {
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    }

    fn builder(&self) -> GraphConvBuilder {
        GraphConvBuilder::new(ATTRIBUTE_VECTOR_SIZE).with_cancel_flag(self.cancel.clone())
    }
}

fn run(config_path: &Path, interrupt: &BuildInterrupt) -> Result<()> {
    let config = read_config(config_path)?;
    let settings = AblationSettings::resolve(&config)
        .with_context(|| format!("Invalid settings in {}", config_path.display()))?;
    log::debug!("Resolved settings: {:?}", settings);

    interrupt.building.store(true, Ordering::SeqCst);
    let built = interrupt.builder().build(&settings.architecture);
    interrupt.building.store(false, Ordering::SeqCst);
    let mut model = built?;

    if !settings.io.use_existing_weights {
        return Err(QsarError::WeightsLoadRefused.into());
    }
    JsonWeightLoader.load_weights(&mut model, &settings.io.weights_fpath)?;

    let mut driver = AblationDriver::new(JsonDatasetLoader::new(), RegressionEvaluator::new());
    let results = driver.run(&model, &settings)?;

    let summary = AblationSummary::from_results(settings.fpath(), &results)?;
    summary.log_table();
    summary.save(AblationSummary::default_path(settings.fpath()))?;

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let Some(config_path) = args.config else {
        println!("Usage: qsar-ablate \"settings.cfg\"");
        std::process::exit(1);
    };

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    log::info!("qsar-ablate {} - Starting", VERSION);

    let interrupt = BuildInterrupt::install()?;

    if let Err(err) = run(&config_path, &interrupt) {
        if let Some(qsar) = err.downcast_ref::<QsarError>() {
            log::error!("{}", qsar.user_message());
        }
        return Err(err);
    }

    log::info!("Ablation complete");
    Ok(())
}
