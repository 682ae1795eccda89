//! DebateBench CLI
//!
//! Runs mirrored model-vs-model debates, collects repeated judgments of them
//! and ranks judge configurations by verdict stability.

mod console;
mod store;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use debatebench_core::config::{Config, default_config};
use debatebench_core::stability::configs_in;
use debatebench_core::{
    CollectorSettings, DebatePairGenerator, JudgeConfig, JudgmentCollector, OpenAiGateway,
    PairRequest, PromptStyle, PublicForumFormat, RunLedger, SharedGateway, SpeechSequencer,
    StabilityAnalyzer,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::store::JsonStore;

#[derive(Parser)]
#[command(
    name = "debatebench",
    version,
    about = "DebateBench - measure how stable LLM debate judges are",
    long_about = "Runs mirrored Public Forum debates between models, judges them repeatedly \
                  with several judge configurations, and ranks those configurations by \
                  verdict stability."
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding debates and judgments
    #[arg(long, global = true, default_value = "debatebench-data", value_name = "DIR")]
    data_dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the debate protocol
    Protocol,

    /// Run a mirrored debate pair
    Debate {
        /// The resolution to debate
        #[arg(value_name = "RESOLUTION")]
        resolution: String,

        /// First model (PRO in the original debate)
        #[arg(short = 'a', long, value_name = "MODEL")]
        model_a: String,

        /// Second model (CON in the original debate)
        #[arg(short = 'b', long, value_name = "MODEL")]
        model_b: String,

        /// Prompt style: standard, structured or freeform
        #[arg(long, value_name = "STYLE")]
        style: Option<String>,

        /// Sampling temperature for debaters
        #[arg(short, long, value_name = "TEMP")]
        temperature: Option<f32>,

        /// Print speech text as it arrives
        #[arg(long)]
        show_speeches: bool,
    },

    /// Judge every complete stored debate
    Judge {
        /// Judge model (repeatable, defaults to the configured list)
        #[arg(long = "judge-model", action = ArgAction::Append, value_name = "MODEL")]
        judge_model: Vec<String>,

        /// Judge prompt variant id (repeatable, defaults to the configured list)
        #[arg(short, long = "prompt", action = ArgAction::Append, value_name = "ID")]
        prompt: Vec<String>,

        /// Runs per debate and judge config
        #[arg(short, long, value_name = "N")]
        runs: Option<u32>,

        /// Maximum judge calls in flight
        #[arg(long, value_name = "K")]
        concurrency: Option<usize>,

        /// Judge sampling temperature
        #[arg(short, long, value_name = "TEMP")]
        temperature: Option<f32>,
    },

    /// Rank judge configurations by stability
    Analyze {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored debate
    Show {
        /// Debate id or unique prefix
        #[arg(value_name = "DEBATE_ID")]
        debate_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    let format = PublicForumFormat::new(config.debate.word_limits);

    match cli.command {
        Command::Protocol => {
            println!("{}", format.protocol_summary());
            Ok(())
        }
        Command::Debate {
            resolution,
            model_a,
            model_b,
            style,
            temperature,
            show_speeches,
        } => {
            let style = match style {
                Some(s) => s.parse::<PromptStyle>()?,
                None => config.debate.prompt_style,
            };
            let temperature = temperature.unwrap_or(config.debate.temperature);
            let request = PairRequest::new(resolution, model_a, model_b)
                .with_temperature(temperature)
                .with_prompt_style(style);
            run_debate(&config, format, &cli.data_dir, request, show_speeches).await
        }
        Command::Judge {
            judge_model,
            prompt,
            runs,
            concurrency,
            temperature,
        } => {
            let mut judging = config.judging.clone();
            if let Some(runs) = runs {
                judging.runs_per_debate = runs;
            }
            if let Some(concurrency) = concurrency {
                judging.concurrency = concurrency;
            }
            if let Some(temperature) = temperature {
                judging.temperature = temperature;
            }
            let mut selection = judging.clone();
            if !judge_model.is_empty() {
                selection.judge_models = judge_model;
            }
            if !prompt.is_empty() {
                selection.judge_prompts = prompt;
            }
            let configs = selection.judge_configs();

            let mut checked = config.clone();
            checked.judging = judging;
            checked.validate()?;
            run_judging(&checked, format, &cli.data_dir, &configs).await
        }
        Command::Analyze { json } => run_analysis(&config, &cli.data_dir, json),
        Command::Show { debate_id } => {
            let store = JsonStore::open(&cli.data_dir)?;
            let debate = store.find_debate(&debate_id)?;
            console::print_debate(&debate, &format);
            Ok(())
        }
    }
}

fn build_gateway(config: &Config) -> Result<SharedGateway, Box<dyn std::error::Error>> {
    let api_key = env::var(&config.gateway.api_key_env).unwrap_or_else(|_| {
        eprintln!(
            "{}",
            format!(
                "Warning: {} not set. API calls may fail.",
                config.gateway.api_key_env
            )
            .yellow()
        );
        String::new()
    });
    Ok(Arc::new(OpenAiGateway::new(&config.gateway, &api_key)?))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "\nInterrupted, stopping after the current call...".yellow());
            token.cancel();
        }
    });
}

async fn run_debate(
    config: &Config,
    format: PublicForumFormat,
    data_dir: &Path,
    request: PairRequest,
    show_speeches: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonStore::open(data_dir)?;
    let gateway = build_gateway(config)?;

    console::banner(&format!("DebateBench - {}", format.display_name()));
    println!("{} {}", "Resolution:".bold(), request.resolution.bright_white());
    println!(
        "{} {} vs {}  {} {}  {} {}",
        "Models:".bold(),
        request.models.model_a.bright_cyan(),
        request.models.model_b.bright_cyan(),
        "Style:".bold(),
        request.prompt_style,
        "Temperature:".bold(),
        request.temperature
    );
    println!("{}", console::rule("─").dimmed());

    let sequencer = SpeechSequencer::new(gateway, format, config.debate.call_timeout())
        .with_callback(console::create_console_callback(show_speeches));
    let generator = DebatePairGenerator::new(sequencer);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let pair = generator.create_pair(&request);
    let pair = generator.run_pair(pair, &cancel).await;

    println!();
    println!("{} {}", "Pair:".bold(), pair.pair_id);
    for debate in pair.instances() {
        let path = store.save_debate(debate)?;
        info!(debate_id = %debate.id, path = %path.display(), "Saved debate");
        console::print_debate_summary(debate);
    }
    println!("{} {}", "Saved to".dimmed(), store.root().display());
    Ok(())
}

async fn run_judging(
    config: &Config,
    format: PublicForumFormat,
    data_dir: &Path,
    configs: &[JudgeConfig],
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonStore::open(data_dir)?;
    let debates = store.list_debates()?;
    if debates.is_empty() {
        println!("{}", "No stored debates. Run `debatebench debate` first.".yellow());
        return Ok(());
    }

    let settings = CollectorSettings::from(&config.judging);
    let collector = JudgmentCollector::new(build_gateway(config)?, format, settings);

    let ledger = RunLedger::from_history(&store.load_judgments()?, &store.load_exclusions()?);
    println!(
        "{} {} debates x {} judge configs x {} runs",
        "Judging:".bold(),
        debates.iter().filter(|d| d.is_complete()).count(),
        configs.len(),
        config.judging.runs_per_debate
    );

    let report = collector.collect(&debates, configs, &ledger).await?;
    store.append_judgments(&report.records)?;
    store.append_failures(&report.failures)?;
    store.append_exclusions(&report.exclusions)?;
    if report.excluded_count() > 0 {
        warn!(excluded = report.excluded_count(), "Some judge runs were excluded");
    }

    console::print_collection_report(&report);
    Ok(())
}

fn run_analysis(
    config: &Config,
    data_dir: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonStore::open(data_dir)?;
    let records = store.load_judgments()?;
    let exclusions = store.load_exclusions()?;
    let failures = store.load_failures()?;
    info!(
        judgments = records.len(),
        exclusions = exclusions.len(),
        failed_attempts = failures.len(),
        "Loaded judging history"
    );

    let analyzer = StabilityAnalyzer::new(config.analysis.weights);
    let report = analyzer.analyze(&configs_in(&records, &exclusions), &records, &exclusions);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        console::print_stability_report(&report);
    }
    Ok(())
}
