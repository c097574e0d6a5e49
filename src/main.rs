use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use freezewatch::driver::simulate::{run_scripted, PlaybackScript};
use freezewatch::driver::trace;
use freezewatch::error::TraceError;
use freezewatch::kernel::frame::StreamId;
use freezewatch::kernel::scheduler::FreezeReport;
use freezewatch::{Reactor, ReactorConfig, VisibilityGate};

#[derive(Debug, Parser)]
#[command(name = "freezewatch", about = "Detects video render freezes from frame timing")]
struct Cli {
    /// JSON reactor config; defaults apply when omitted.
    #[arg(long, global = true, env = "FREEZEWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a JSON-lines frame trace (stdin when no file is given).
    Replay {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run a scripted playback with periodic stalls.
    Simulate {
        #[arg(long, default_value_t = 3)]
        cycles: usize,
        #[arg(long, default_value_t = 300)]
        steady_frames: usize,
        #[arg(long, default_value_t = 66.0)]
        interval_ms: f64,
        #[arg(long, default_value_t = 3_000.0)]
        stall_ms: f64,
        /// Play this cycle's stall on a hidden surface.
        #[arg(long)]
        hidden_cycle: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReactorConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?,
        None => ReactorConfig::default(),
    };

    let filter = match (&config.log_filter, std::env::var("RUST_LOG")) {
        (_, Ok(env)) => EnvFilter::new(env),
        (Some(directive), Err(_)) => EnvFilter::new(directive),
        (None, Err(_)) => EnvFilter::new("info"),
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    match cli.command {
        Command::Replay { input } => replay(config, input).await,
        Command::Simulate {
            cycles,
            steady_frames,
            interval_ms,
            stall_ms,
            hidden_cycle,
        } => {
            let script = PlaybackScript {
                cycles,
                steady_frames,
                interval_ms,
                stall_ms,
                hidden_cycle,
            };
            simulate(config, script)
        }
    }
}

async fn replay(config: ReactorConfig, input: Option<PathBuf>) -> anyhow::Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let (tx, rx) = mpsc::channel(1024);
    let (report_tx, mut report_rx) = mpsc::channel::<FreezeReport>(64);
    let cancel = CancellationToken::new();

    let mut reactor = Reactor::new(rx, config, Arc::new(VisibilityGate::new()));
    let reactor_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { reactor.run(cancel, report_tx).await }
    });

    let printer = tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            print_report(&report);
        }
    });

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, flushing reports");
                cancel.cancel();
            }
        })
    };

    match trace::pump(reader, tx).await {
        Ok(sent) => tracing::info!("Trace replayed: {} records", sent),
        Err(TraceError::ChannelClosed) if cancel.is_cancelled() => {}
        Err(e) => return Err(e.into()),
    }

    reactor_task.await.context("reactor task failed")?;
    printer.await.context("report printer failed")?;
    ctrl_c.abort();
    Ok(())
}

fn simulate(config: ReactorConfig, script: PlaybackScript) -> anyhow::Result<()> {
    // The receiver is never fed: the script is stepped synchronously.
    let (_tx, rx) = mpsc::channel(1);
    let mut reactor = Reactor::new(rx, config, Arc::new(VisibilityGate::new()));

    let stream = StreamId::new();
    let reports = run_scripted(&mut reactor, script.events(stream));
    for report in &reports {
        print_report(report);
    }

    let snapshot = reactor.telemetry.snapshot();
    tracing::info!(
        "Simulation done: {} freezes detected, {} counted, {:.0}ms frozen",
        snapshot.freeze_stats.detected,
        snapshot.freeze_stats.counted,
        snapshot.freeze_stats.total_counted_ms
    );
    Ok(())
}

fn print_report(report: &FreezeReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::error!("Failed to encode report: {}", e),
    }
}
