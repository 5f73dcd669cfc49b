//! Play command - Run matches between policies

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    app::{AppContext, Backend, PolicySpec, ShutdownReport, SimulationConfig},
    cli::output::{print_kv, print_match_result, print_section},
    engine::{CancelToken, MatchResult},
    observers::{BoardPrinter, JsonlObserver, ProgressObserver},
    q_learning::SuccessorValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuccessorArg {
    /// Maximum over every action of the next state
    Table,
    /// Maximum over the lines still open in the next state
    Legal,
}

impl From<SuccessorArg> for SuccessorValue {
    fn from(arg: SuccessorArg) -> Self {
        match arg {
            SuccessorArg::Table => SuccessorValue::TableMax,
            SuccessorArg::Legal => SuccessorValue::LegalMax,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run matches between policies")]
pub struct PlayArgs {
    /// Policy spec, given once per policy; consecutive pairs play a match
    /// (e.g. QLearningAgent:true:q1.dat:0.5:0.8:0.1, SimpleAgent, RandomAgent)
    #[arg(long = "agent", short = 'a')]
    pub agents: Vec<PolicySpec>,

    /// Rounds per match
    #[arg(long, short = 'r')]
    pub rounds: Option<usize>,

    /// Dots per row
    #[arg(long)]
    pub width: Option<usize>,

    /// Dots per column
    #[arg(long)]
    pub height: Option<usize>,

    /// Log standings every this many rounds
    #[arg(long)]
    pub results_interval: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Value table backend (dense or mapped)
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Directory holding value tables
    #[arg(long)]
    pub table_dir: Option<PathBuf>,

    /// Reward per completed box
    #[arg(long)]
    pub box_reward: Option<f32>,

    /// Successor value used by learning policies
    #[arg(long, value_enum)]
    pub successor: Option<SuccessorArg>,

    /// Draw the board after every line
    #[arg(long)]
    pub show_board: bool,

    /// Write match events as JSON Lines to this file
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Show a progress bar per match
    #[arg(long)]
    pub progress: bool,

    /// Write a JSON summary of all matches to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Read the simulation from a JSON config; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl PlayArgs {
    /// Merge the config file (if any) with the command-line flags.
    pub fn to_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if !self.agents.is_empty() {
            config.policies = self.agents.clone();
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(interval) = self.results_interval {
            config.report_interval = Some(interval).filter(|&i| i > 0);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(dir) = &self.table_dir {
            config.table_dir = Some(dir.clone());
        }
        if let Some(box_reward) = self.box_reward {
            config.box_reward = box_reward;
        }
        if let Some(successor) = self.successor {
            config.successor = successor.into();
        }

        Ok(config)
    }
}

#[derive(Serialize)]
struct MatchSummary {
    index: usize,
    policies: Vec<String>,
    result: Option<MatchResult>,
    error: Option<String>,
}

#[derive(Serialize)]
struct Summary<'a> {
    config: &'a SimulationConfig,
    matches: Vec<MatchSummary>,
    shutdown: &'a ShutdownReport,
}

/// `events.jsonl` becomes `events-2.jsonl` for the second of several matches.
fn indexed_path(path: &Path, index: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{}.{}", index + 1, ext.to_string_lossy()),
        None => format!("{stem}-{}", index + 1),
    };
    path.with_file_name(name)
}

/// React to an interrupt: the first cancels the matches so tables get
/// saved, a second one asks for an immediate exit (returns `true`).
fn on_interrupt(cancel: &CancelToken) -> bool {
    if cancel.is_cancelled() {
        return true;
    }
    warn!("interrupted, stopping matches after the current turn");
    cancel.cancel();
    false
}

/// Cancel running matches on Ctrl-C instead of dying with unsaved tables.
pub fn install_interrupt_handler(cancel: CancelToken) -> Result<()> {
    ctrlc::set_handler(move || {
        if on_interrupt(&cancel) {
            eprintln!("\nInterrupted twice, exiting without saving value tables");
            std::process::exit(130);
        }
    })
    .context("Failed to set Ctrl-C handler")
}

pub fn execute(args: PlayArgs) -> Result<()> {
    let config = args.to_config()?;
    config.validate().context("Invalid simulation configuration")?;

    let app = AppContext::from_config(&config);
    let num_matches = config.policies.len() / 2;

    print_section("Dots and boxes");
    print_kv("Grid", &format!("{}x{}", config.width, config.height));
    print_kv("Rounds", &config.rounds.to_string());
    print_kv("Matches", &num_matches.to_string());
    print_kv("Backend", app.store().kind());
    if let Some(seed) = config.seed {
        print_kv("Seed", &seed.to_string());
    }

    let mut matches = Vec::with_capacity(num_matches);
    for index in 0..num_matches {
        let mut game = match app.build_match(&config, index) {
            Ok(game) => game,
            Err(err) => {
                error!(%err, "could not set up match {}", index + 1);
                return Err(err).with_context(|| format!("Failed to set up match {}", index + 1));
            }
        };

        if args.show_board {
            game = game.with_observer(Box::new(BoardPrinter::new(io::stdout())));
        }
        if let Some(path) = &args.events {
            let path = indexed_path(path, index, num_matches);
            let observer = JsonlObserver::create(&path)
                .with_context(|| format!("Failed to create event log {}", path.display()))?;
            game = game.with_observer(Box::new(observer));
        }
        if args.progress {
            let label = game.label().to_string();
            game = game.with_observer(Box::new(ProgressObserver::new(label)));
        }
        matches.push(game);
    }

    let labels: Vec<Vec<String>> = config
        .pairings()
        .map(|pair| pair.iter().map(ToString::to_string).collect())
        .collect();

    install_interrupt_handler(app.cancel_token())?;
    info!(matches = num_matches, rounds = config.rounds, "starting simulation");
    let results = app.run_matches(matches);
    let report = app.shutdown();

    print_section("Results");
    let mut summaries = Vec::with_capacity(results.len());
    let mut failures = 0;
    for (index, (result, policies)) in results.into_iter().zip(labels).enumerate() {
        let summary = match result {
            Ok(result) => {
                print_match_result(index, &result);
                MatchSummary {
                    index,
                    policies,
                    result: Some(result),
                    error: None,
                }
            }
            Err(err) => {
                failures += 1;
                error!(%err, "match {} failed", index + 1);
                MatchSummary {
                    index,
                    policies,
                    result: None,
                    error: Some(err.to_string()),
                }
            }
        };
        summaries.push(summary);
    }

    for (table, err) in &report.failed {
        eprintln!("Could not save value table {table}: {err}");
    }

    if let Some(path) = &args.summary {
        let summary = Summary {
            config: &config,
            matches: summaries,
            shutdown: &report,
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary {}", path.display()))?;
        serde_json::to_writer_pretty(file, &summary).context("Failed to write summary")?;
        println!("\nSummary written to {}", path.display());
    }

    if failures > 0 {
        bail!("{failures} of {num_matches} matches failed");
    }
    Ok(())
}
