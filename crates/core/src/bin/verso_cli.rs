//! Command-line client for the GA service.
//!
//! Examples:
//!   verso-cli health
//!   verso-cli run --target "to be or not to be"
//!   verso-cli run --preset 2 --population-size 400 --chart run.svg
//!   verso-cli status
//!   verso-cli population --count 5
//!   verso-cli history --chart history.svg
//!   verso-cli reset
//!
//! Settings come from `<config dir>/verso/config.json`, then `VERSO_API_URL` /
//! `VERSO_POLL_INTERVAL_MS`, then flags. Log verbosity follows `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tokio::task::LocalSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use verso::chart::{self, ChartLayout};
use verso::config::{find_preset, CliConfig, TARGET_PRESETS};
use verso::prelude::*;
use verso::svg;

#[derive(Debug, Parser)]
#[command(name = "verso-cli", version, about = "Drive a remote string-evolving GA")]
struct Cli {
    /// Base URL of the GA service.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file to read instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the service answers.
    Health,
    /// Start a session and poll it until it completes or is interrupted.
    Run(RunArgs),
    /// Statistics and best individual of the remote run.
    Status,
    /// The fittest individuals of the current generation.
    Population {
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    /// Per-generation fitness history, optionally exported as SVG.
    History {
        #[arg(long)]
        chart: Option<PathBuf>,
    },
    /// Discard the remote run.
    Reset,
    /// Print the config path and effective settings.
    Paths,
    /// List the built-in target phrases.
    Presets,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Phrase to evolve toward.
    #[arg(long, conflicts_with = "preset")]
    target: Option<String>,

    /// Built-in phrase by number or text (see `presets`).
    #[arg(long)]
    preset: Option<String>,

    #[arg(long)]
    population_size: Option<u32>,
    #[arg(long)]
    mutation_rate: Option<f64>,
    #[arg(long)]
    crossover_rate: Option<f64>,
    #[arg(long)]
    elitism_count: Option<u32>,

    /// Milliseconds between ticks.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// `skip` or `allow`: whether a tick may start while one is in flight.
    #[arg(long, value_parser = parse_overlap)]
    tick_overlap: Option<TickOverlap>,

    /// Stop once this many generations have been reached.
    #[arg(long)]
    max_generations: Option<u64>,

    /// Write the final fitness chart here.
    #[arg(long)]
    chart: Option<PathBuf>,
}

fn parse_overlap(s: &str) -> Result<TickOverlap, String> {
    TickOverlap::parse(s).ok_or_else(|| format!("expected `skip` or `allow`, got {s:?}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("verso=info,verso_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<(CliConfig, PathBuf)> {
    let path = match &cli.config {
        Some(p) => p.clone(),
        None => CliConfig::default_path()?,
    };
    let mut config = CliConfig::load(&path)?.apply_env(|k| std::env::var(k).ok())?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    Ok((config, path))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let (config, path) = load_config(&cli)?;
    let client = HttpGaClient::with_timeout(&config.api_url, Some(config.request_timeout()));

    // The controller is single-threaded; its poll loop needs a LocalSet.
    LocalSet::new()
        .run_until(dispatch(cli.command, client, config, path))
        .await
}

async fn dispatch(
    command: Command,
    client: HttpGaClient,
    config: CliConfig,
    path: PathBuf,
) -> Result<()> {
    match command {
        Command::Health => health(&client).await,
        Command::Run(args) => run(client, &config, args).await,
        Command::Status => status(&client).await,
        Command::Population { count } => population(&client, count).await,
        Command::History { chart } => history(&client, chart.as_deref()).await,
        Command::Reset => {
            client.reset().await.context("reset failed")?;
            println!("reset");
            Ok(())
        }
        Command::Paths => {
            println!("config: {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Presets => {
            for (i, phrase) in TARGET_PRESETS.iter().enumerate() {
                println!("{:>2}  {phrase}", i + 1);
            }
            Ok(())
        }
    }
}

async fn health(client: &HttpGaClient) -> Result<()> {
    client
        .health()
        .await
        .with_context(|| format!("GA service at {} is not reachable", client.base_url()))?;
    match client.info().await {
        Ok(info) => println!("ok: {} {} at {}", info.message, info.version, client.base_url()),
        Err(_) => println!("ok: {}", client.base_url()),
    }
    Ok(())
}

async fn run(client: HttpGaClient, config: &CliConfig, args: RunArgs) -> Result<()> {
    let target = match (&args.target, &args.preset) {
        (Some(t), _) => t.clone(),
        (None, Some(p)) => find_preset(p)
            .with_context(|| format!("unknown preset {p:?}; see `verso-cli presets`"))?
            .to_string(),
        (None, None) => TARGET_PRESETS[0].to_string(),
    };

    let ga = GaConfig {
        population_size: args.population_size,
        mutation_rate: args.mutation_rate,
        crossover_rate: args.crossover_rate,
        elitism_count: args.elitism_count,
    }
    .or(&config.ga);

    let mut options = config.controller_options();
    if let Some(ms) = args.interval_ms {
        options = options.with_poll_interval(Duration::from_millis(ms));
    }
    if let Some(overlap) = args.tick_overlap {
        options = options.with_overlap(overlap);
    }

    let controller = SessionController::new(client, TokioRuntime, options);
    let (tx, mut rx) = watch::channel(controller.snapshot());
    controller.subscribe(move |state| {
        tx.send_replace(state.clone());
    });

    controller
        .check_health()
        .await
        .with_context(|| format!("GA service at {} is not reachable", controller.service().base_url()))?;
    controller
        .start(&target, ga)
        .await
        .context("failed to start session")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut last_printed = None;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if state.phase.is_running() && last_printed != Some(state.generation) {
                    last_printed = Some(state.generation);
                    print_progress(&state);
                }
                if let Some(max) = args.max_generations {
                    if state.phase.is_running() && state.generation >= max {
                        info!(generation = state.generation, "generation limit reached");
                        controller.stop();
                    }
                }
                if !state.phase.is_running() {
                    break;
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                warn!("interrupted; stopping session");
                controller.stop();
            }
        }
    }

    let state = controller.snapshot();
    print_summary(&state);
    if let Some(path) = &args.chart {
        write_chart(path, &state.history, state.generation)?;
    }

    match (state.phase, state.error) {
        (Phase::Stopped, Some(error)) => Err(anyhow!(error)),
        _ => Ok(()),
    }
}

fn print_progress(state: &SessionState) {
    let best = state
        .best_ever
        .as_ref()
        .map(|b| b.genes.as_str())
        .unwrap_or("");
    println!(
        "gen {:>5}  best {:.3}  avg {:.3}  {best}",
        state.generation,
        state.best_fitness(),
        state.average_fitness
    );
}

fn print_summary(state: &SessionState) {
    println!();
    println!("phase:      {}", state.phase.label());
    println!("target:     {}", state.target);
    println!("generation: {}", state.generation);
    if let Some(best) = &state.best_ever {
        println!("best:       {} ({:.1}%)", best.genes, best.fitness * 100.0);
    }
    if let Some(error) = &state.error {
        println!("error:      {error}");
    }
}

async fn status(client: &HttpGaClient) -> Result<()> {
    let stats = client.statistics().await.context("statistics unavailable")?;
    let completion = client.completion().await.context("completion unavailable")?;
    println!("generation: {}", stats.generation);
    println!(
        "fitness:    best {:.3}  avg {:.3}  worst {:.3}",
        stats.best_fitness, stats.avg_fitness, stats.worst_fitness
    );
    println!(
        "complete:   {} (as of generation {})",
        completion.is_complete, completion.generation
    );
    if let Some(best) = client.best().await.context("best unavailable")? {
        println!("best:       {} ({:.1}%)", best.genes, best.fitness * 100.0);
    }
    Ok(())
}

async fn population(client: &HttpGaClient, count: u32) -> Result<()> {
    let resp = client
        .population(count)
        .await
        .context("population unavailable")?;
    println!("generation {}", resp.generation);
    for (i, individual) in resp.population.iter().enumerate() {
        println!(
            "{:>3}. {}  {:.1}%",
            i + 1,
            individual.genes,
            individual.fitness * 100.0
        );
    }
    Ok(())
}

async fn history(client: &HttpGaClient, chart: Option<&Path>) -> Result<()> {
    let entries = client.history().await.context("history unavailable")?;
    for e in &entries {
        println!(
            "{:>5}  best {:.3}  avg {:.3}",
            e.generation, e.best_fitness, e.avg_fitness
        );
    }
    if let Some(path) = chart {
        let generation = entries.iter().map(|e| e.generation).max().unwrap_or(0);
        write_chart(path, &entries, generation)?;
    }
    Ok(())
}

fn write_chart(path: &Path, history: &[HistoryEntry], generation: u64) -> Result<()> {
    if path.is_dir() {
        bail!("{} is a directory", path.display());
    }
    let scene = chart::layout(history, generation, ChartLayout::default());
    std::fs::write(path, svg::render(&scene))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), points = history.len(), "chart written");
    Ok(())
}
