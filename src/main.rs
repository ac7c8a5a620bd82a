use amr_predict::config::{ServeConfig, StoreConfig};
use amr_predict::evaluate::{evaluate_store, write_report, Outcome};
use amr_predict::logging::{init_logging, LogConfig, LogFormat};
use amr_predict::parsing::mapping::EncoderMapping;
use amr_predict::parsing::store::load_model_store;
use amr_predict::predict::Dispatcher;
use amr_predict::server::{router, AppState, ModelsResponse};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve predictions over HTTP
    Serve(ServeConfig),

    /// Load the model store and list what was loaded and what failed
    Models(StoreConfig),

    /// Check every model against its stored feature matrix and label vector
    Evaluate {
        #[command(flatten)]
        store: StoreConfig,

        /// Write the results as JSON to this path
        #[arg(short, long, default_value = None)]
        report_path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = LogConfig::from_verbosity(args.verbose)
        .with_format(args.log_format)
        .with_ansi(std::io::stderr().is_terminal());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = match args.command {
        Command::Serve(config) => serve(&config).map(|_| true),
        Command::Models(store) => list_models(&store),
        Command::Evaluate { store, report_path } => evaluate(&store, report_path.as_deref()),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load everything once, then serve until Ctrl-C
fn serve(config: &ServeConfig) -> anyhow::Result<()> {
    let (registry, report) = load_model_store(&config.store.model_dir)
        .with_context(|| format!("loading model store {}", config.store.model_dir.display()))?;
    let mapping = EncoderMapping::load(&config.encoder_mapping)
        .with_context(|| format!("loading encoder mapping {}", config.encoder_mapping.display()))?;

    if registry.is_empty() {
        warn!(dir = %config.store.model_dir.display(), "no models loaded, predictions will be empty");
    }

    let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(mapping));
    let app = router(AppState::new(dispatcher, &report));
    let addr = config.socket_addr();

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        info!(%addr, "listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving requests")
    })?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Print the registry and the load failures. Returns false if anything failed to load
fn list_models(store: &StoreConfig) -> anyhow::Result<bool> {
    let (registry, report) = load_model_store(&store.model_dir)
        .with_context(|| format!("loading model store {}", store.model_dir.display()))?;
    let summary = ModelsResponse::new(&registry, &report);

    for model in &summary.models {
        println!(
            "{:<30} {:<4} {:>4} features {:>4} columns  labels: {}",
            model.id,
            model.kind,
            model.n_features,
            model.n_columns,
            model.labels.join(", ")
        );
    }
    for failure in &summary.failures {
        println!("{:<30} FAILED {}", failure.antibiotic, failure.error);
    }
    println!(
        "{} loaded, {} failed",
        summary.models.len(),
        summary.failures.len()
    );

    Ok(!report.has_failures())
}

/// Print per-antibiotic mistakes and accuracy, optionally writing a JSON report
fn evaluate(store: &StoreConfig, report_path: Option<&std::path::Path>) -> anyhow::Result<bool> {
    let (registry, _) = load_model_store(&store.model_dir)
        .with_context(|| format!("loading model store {}", store.model_dir.display()))?;
    let evaluations = evaluate_store(&store.model_dir, &registry);

    let mut all_scored = true;
    for evaluation in &evaluations {
        match &evaluation.outcome {
            Outcome::Scored(score) => println!(
                "{:<30} {:>6} samples {:>6} mistakes  accuracy {:.4}",
                evaluation.antibiotic,
                score.samples,
                score.mistakes,
                score.accuracy()
            ),
            Outcome::Skipped(e) => println!("{:<30} skipped: {}", evaluation.antibiotic, e),
            Outcome::Failed(e) => {
                all_scored = false;
                println!("{:<30} failed: {}", evaluation.antibiotic, e);
            }
        }
    }

    if let Some(path) = report_path {
        write_report(path, &evaluations)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(all_scored)
}
