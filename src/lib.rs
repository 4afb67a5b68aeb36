pub mod config;
pub mod error;
pub mod models;
pub mod services;

use clap::Parser;
use config::{Cli, Settings};
use services::cancel::{self, CancelToken};
use services::classifier::labeller::LabellerRegistry;
use services::classifier::OnnxClassifier;
use services::predict_loop::PredictLoop;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_cli(&cli)?;
    info!("Starting ring-predict {}", env!("CARGO_PKG_VERSION"));

    let registry = LabellerRegistry::with_defaults();
    let classifier = OnnxClassifier::load(
        &settings.model,
        &settings.model_config,
        settings.use_gpu,
        &registry,
    )?;

    let token = CancelToken::new();
    cancel::cancel_on_shutdown_signal(token.clone())?;

    let mut predict_loop = PredictLoop::new(settings, classifier, token);
    predict_loop.run()?;
    Ok(())
}
