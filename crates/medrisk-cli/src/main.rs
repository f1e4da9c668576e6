mod display;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use medrisk_ai::RiskEngine;
use medrisk_core::RiskInput;
use medrisk_store::ArtifactSet;

#[derive(Parser)]
#[command(name = "medrisk", version, about = "Workforce health risk triage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the risk ensemble from a historical CSV and persist the
    /// artifact pair.
    Train {
        /// Historical training table (CSV).
        #[arg(long, env = "MEDRISK_TRAINING_DATA")]
        data: PathBuf,

        /// Directory for the trained artifact pair.
        #[arg(long, env = "MEDRISK_ARTIFACT_DIR", default_value = "artifacts")]
        artifacts: PathBuf,
    },
    /// Score one employee input and print the prediction as JSON.
    Predict {
        /// Directory holding the trained artifact pair.
        #[arg(long, env = "MEDRISK_ARTIFACT_DIR", default_value = "artifacts")]
        artifacts: PathBuf,

        /// Employee input as a JSON document.
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the persisted feature-column schema of a trained pair.
    Schema {
        /// Directory holding the trained artifact pair.
        #[arg(long, env = "MEDRISK_ARTIFACT_DIR", default_value = "artifacts")]
        artifacts: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("medrisk v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();

    match cli.command {
        Command::Train { data, artifacts } => {
            let report = medrisk_ai::train(&data, &ArtifactSet::new(artifacts))
                .context("training risk ensemble")?;
            display::print_report(&report);
        }
        Command::Predict { artifacts, input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("reading input {}", input.display()))?;
            let risk_input: RiskInput =
                serde_json::from_str(&raw).context("parsing employee input JSON")?;

            let engine = RiskEngine::load(&ArtifactSet::new(artifacts));
            let prediction = engine.predict(&risk_input);
            display::print_prediction(&risk_input, &prediction)?;
        }
        Command::Schema { artifacts } => {
            let schema = ArtifactSet::new(artifacts)
                .read_schema()
                .context("reading feature schema")?;
            display::print_schema(&schema);
        }
    }

    Ok(())
}
