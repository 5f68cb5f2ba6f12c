//! appstrap: bootstrap a new web application project.
//!
//! `appstrap new <name>` installs the project template, resolves configuration
//! from an optional document and interactive answers, then provisions the
//! environment file, database, container manifests and repository. A fatal
//! failure rolls every committed side effect back.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use appstrap::exit_codes;
use appstrap::io::process::SystemRunner;
use appstrap::io::project::Stability;
use appstrap::io::prompt::{AnswerSource, NoInteraction, TerminalPrompter};
use appstrap::io::settings::load_settings;
use appstrap::logging;
use appstrap::pipeline::{PipelineOptions, PipelineOutcome, PipelineRun, run_pipeline};

#[derive(Parser)]
#[command(name = "appstrap", version, about = "Bootstrap a new web application project")]
struct Cli {
    /// Tool settings file (TOML).
    #[arg(long, global = true, env = "APPSTRAP_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new project directory named <NAME>.
    New {
        name: String,
        /// Configuration document (JSON, TOML or YAML). Keys found here are not prompted for.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Minimum stability forwarded to the template installer.
        #[arg(long, value_enum)]
        stability: Option<Stability>,
        /// Never prompt; missing keys take their defaults.
        #[arg(long)]
        no_interaction: bool,
        /// Directory to create the project in. Defaults to the current directory.
        #[arg(long)]
        workdir: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    match cli.command {
        Command::New {
            name,
            config,
            stability,
            no_interaction,
            workdir,
        } => {
            let workdir = match workdir {
                Some(dir) => dir,
                None => std::env::current_dir().context("read current directory")?,
            };
            let workdir = std::path::absolute(&workdir)
                .with_context(|| format!("resolve {}", workdir.display()))?;
            let mut options = PipelineOptions::new(name, workdir, settings);
            options.config_path = config;
            options.stability = stability;
            Ok(cmd_new(&options, no_interaction))
        }
    }
}

fn cmd_new(options: &PipelineOptions, no_interaction: bool) -> i32 {
    let runner = SystemRunner::new(options.settings.output_limit_bytes);
    let mut answers: Box<dyn AnswerSource> = if no_interaction {
        Box::new(NoInteraction)
    } else {
        Box::new(TerminalPrompter)
    };

    println!("Creating {} in {}", options.project_name, options.workdir.display());
    let run = run_pipeline(options, &runner, answers.as_mut(), |report| {
        println!("{}", report.progress_line());
    });
    print_summary(options, &run);
    run.exit_code()
}

fn print_summary(options: &PipelineOptions, run: &PipelineRun) {
    match &run.outcome {
        PipelineOutcome::Succeeded {
            project_path,
            configuration,
        } => {
            let warnings = run.warnings().count();
            if warnings > 0 {
                println!();
                println!("Finished with {warnings} warning(s):");
                for warning in run.warnings() {
                    println!("  - {warning}");
                }
            }
            println!();
            println!("Project ready at {}", project_path.display());
            println!("Next steps:");
            println!("  cd {}", options.project_name);
            if configuration.with_docker {
                println!("  docker compose up -d");
            } else {
                println!("  php artisan serve");
            }
        }
        PipelineOutcome::RolledBack {
            step,
            error,
            rollback_actions,
            rollback_warnings,
        } => {
            eprintln!();
            eprintln!("Step '{step}' failed: {error}");
            eprintln!("Rolled back {rollback_actions} change(s).");
            for warning in rollback_warnings {
                eprintln!("  could not undo: {warning}");
            }
        }
    }
}
