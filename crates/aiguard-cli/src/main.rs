//! AI Guard CLI - run gateway processing phases against stored envelopes.

use std::fs;
use std::path::{Path, PathBuf};

use aiguard_core::{classify, EvaluationVerdict, Metadata, ProcessorParameters, RequestContext};
use aiguard_runtime::{AiGuardProcessor, GuardConfig, Processor};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// AI Guard CLI - inspect prompts and completions
#[derive(Parser, Debug)]
#[command(name = "aiguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the input phase on a request envelope
    Input(PhaseArgs),

    /// Run the output phase on a response envelope
    Output(PhaseArgs),

    /// Print the tags for a stored verdict (no network)
    Classify {
        /// Path to the verdict `result` object
        verdict: PathBuf,
    },
}

#[derive(Args, Debug)]
struct PhaseArgs {
    /// Path to the envelope JSON
    envelope: PathBuf,

    /// Processor parameters JSON
    #[arg(long)]
    params: Option<PathBuf>,

    /// Processor config file (JSON or YAML)
    #[arg(short, long, env = "PANGEA_CONFIG_PATH")]
    config: PathBuf,

    /// Attach tags describing the verdict
    #[arg(long)]
    annotate: bool,

    /// Apply rewritten content
    #[arg(long)]
    modify: bool,

    /// Reject blocked content
    #[arg(long)]
    reject: bool,

    /// Recipe for the input phase
    #[arg(long)]
    request_recipe: Option<String>,

    /// Recipe for the output phase
    #[arg(long)]
    response_recipe: Option<String>,
}

impl PhaseArgs {
    /// Parameters from `--params`, with flags layered on top.
    fn parameters(&self) -> anyhow::Result<ProcessorParameters> {
        let mut parameters: ProcessorParameters = match &self.params {
            Some(path) => read_json(path)?,
            None => ProcessorParameters::default(),
        };

        parameters.annotate |= self.annotate;
        parameters.modify |= self.modify;
        parameters.reject |= self.reject;
        if let Some(recipe) = &self.request_recipe {
            parameters.request_recipe = Some(recipe.clone());
        }
        if let Some(recipe) = &self.response_recipe {
            parameters.response_recipe = Some(recipe.clone());
        }

        Ok(parameters)
    }

    fn processor(&self) -> anyhow::Result<AiGuardProcessor> {
        let config = GuardConfig::from_file(&self.config)
            .with_context(|| format!("loading config {}", self.config.display()))?;
        Ok(AiGuardProcessor::from_config(config)?)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("aiguard_core=trace,aiguard_runtime=debug,aiguard_cli=debug")
    } else {
        EnvFilter::new("aiguard_core=warn,aiguard_runtime=warn,aiguard_cli=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let metadata = Metadata::new();
    let request = RequestContext::default();

    match cli.command {
        Command::Input(args) => {
            let parameters = args.parameters()?;
            let processor = args.processor()?;
            let prompt = read_json(&args.envelope)?;

            let decision = processor
                .process_input(prompt, &metadata, &parameters, &request)
                .await?;
            tracing::info!(decision = decision.kind(), "Input phase complete");
            print_json(&decision)?;
        }
        Command::Output(args) => {
            let parameters = args.parameters()?;
            let processor = args.processor()?;
            let response = read_json(&args.envelope)?;

            let decision = processor
                .process_output(None, response, &metadata, &parameters, &request)
                .await?;
            tracing::info!(decision = decision.kind(), "Output phase complete");
            print_json(&decision)?;
        }
        Command::Classify { verdict } => {
            let verdict: EvaluationVerdict = read_json(&verdict)?;
            print_json(&classify(&verdict))?;
        }
    }

    Ok(())
}
