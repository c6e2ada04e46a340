//! `bimids` command-line entry point.
//!
//! ```text
//! bimids fix input/ --output output/ [--dump-dir json/]
//! bimids bsdd requirements.xlsx [--output bsdd_output.json]
//! bimids profile export doc.xml [--output profile.json]
//! bimids profile apply doc.xml --profile profile.json --output doc_curated.xml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use bimids::{BatchRunner, InheritanceProfile, Pipeline, PipelineConfig};

#[derive(Debug, Parser)]
#[command(name = "bimids", version, about = "BIMids classification tooling")]
struct Cli {
    /// JSON config file; omitted keys keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Propagate inherited properties through classification XML documents.
    Fix {
        /// A `.xml` file or a directory of them.
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also write JSON element-tree dumps here.
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },
    /// Convert the requirements workbook into a bSDD dictionary.
    Bsdd {
        workbook: PathBuf,
        #[arg(long, default_value = "bsdd_output.json")]
        output: PathBuf,
    },
    /// Export or apply inheritance profiles.
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// Propagate a document and write its inheritance profile.
    Export {
        xml: PathBuf,
        /// Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Recompute a document's declarations from a profile.
    Apply {
        xml: PathBuf,
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "bimids failed");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command completed but some inputs failed.
fn run(cli: Cli) -> bimids::Result<bool> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Fix { input, output, dump_dir } => {
            let pipeline = Pipeline::new(config);
            let mut runner = BatchRunner::new(&pipeline, output);
            if let Some(dir) = dump_dir {
                runner = runner.with_dump_dir(dir);
            }
            let report = runner.run(&input)?;
            for (path, error) in &report.failed {
                eprintln!("failed: {}: {error}", path.display());
            }
            Ok(report.is_success())
        }
        Command::Bsdd { workbook, output } => {
            bimids::bsdd::convert_workbook(&workbook, &output, &config.bsdd)?;
            Ok(true)
        }
        Command::Profile(ProfileCommand::Export { xml, output }) => {
            let profile = Pipeline::new(config).export_profile(&xml)?;
            let json = profile.to_json()?;
            match output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
            Ok(true)
        }
        Command::Profile(ProfileCommand::Apply { xml, profile, output }) => {
            let profile = InheritanceProfile::from_json(&std::fs::read_to_string(profile)?)?;
            let document = Pipeline::new(config).apply_profile(&xml, &profile)?;
            document.save(&output)?;
            Ok(true)
        }
    }
}
