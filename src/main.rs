#![forbid(unsafe_code)]

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level as TraceLevel, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use true_stretch::config::{Config, GameConfigLayout};
use true_stretch::diff::{format_report, render};
use true_stretch::display::{UnknownDisplay, WindowsDisplay, X11Display};
use true_stretch::{ApplyResult, PatchPlan, ResolutionSpec, StretchEngine, ValidatedPair};

const EXIT_INPUT: u8 = 1;
const EXIT_VALIDATION: u8 = 2;
const EXIT_APPLY: u8 = 3;

/// Apply a lower resolution to the game as a true stretch. Close the game first.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Game config directory (overrides config file and auto-discovery)
    #[arg(long, global = true)]
    config_root: Option<PathBuf>,

    /// Path to the tool's config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the resolutions and the game's current settings
    Verify(StretchArgs),
    /// Show what would change (dry run)
    Preview(StretchArgs),
    /// Write the changes, keeping a .bak of every modified file
    Apply {
        #[command(flatten)]
        args: StretchArgs,

        /// Apply without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct StretchArgs {
    /// Your desktop native resolution, e.g. 2560x1440
    #[arg(long)]
    native: ResolutionSpec,

    /// The stretched resolution to run the game at, e.g. 1280x1024
    #[arg(long)]
    target: ResolutionSpec,

    /// Continue even if the native checks fail
    #[arg(long)]
    force: bool,

    /// Don't compare native against the active display mode
    #[arg(long)]
    skip_display_check: bool,
}

fn init_logging(config: &Config) -> Result<()> {
    // Parse log level from environment variable, falling back to the config file
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| config.log_level.clone())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_warnings(pair: &ValidatedPair, plan: Option<&PatchPlan>) {
    for warning in &pair.warnings {
        println!("[!] {warning}");
    }
    for warning in plan.map(|p| p.warnings.as_slice()).unwrap_or_default() {
        println!("[!] {warning}");
    }
}

fn print_apply_result(result: &ApplyResult, target: ResolutionSpec) {
    for path in &result.files_unchanged {
        println!("- No changes needed: {}", path.display());
    }
    for path in &result.files_written {
        println!("-> Updated {}", path.display());
    }
    for (path, backup) in &result.backup_paths {
        println!("   backup of {} at {}", path.display(), backup.display());
    }

    if result.succeeded {
        println!("\nDone.");
        println!("Next steps:");
        println!("  1) Change your desktop resolution to {target}.");
        println!("  2) Launch the game.");
    } else {
        let stage = result.failure_stage.map(|s| s.to_string()).unwrap_or_default();
        println!(
            "\n[!] Failed at {stage}: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        if result.rolled_back == Some(false) {
            println!("    The failed file may be incomplete; restore it from its .bak copy.");
        }
        if !result.files_written.is_empty() {
            println!("    Files listed as updated above remain patched.");
        }
        println!("    Make sure the game is fully closed, then retry.");
    }
}

fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    let root = cli.config_root.clone().or_else(|| config.config_root.clone());
    let layout = GameConfigLayout::discover(root.as_deref())?;
    let targets = layout.targets()?;
    for target in &targets {
        info!(label = %target.label, path = %target.path.display(), "Target file");
    }
    let paths: Vec<PathBuf> = targets.iter().map(|t| t.path.clone()).collect();

    let (args, yes) = match &cli.command {
        Command::Verify(args) | Command::Preview(args) => (args, false),
        Command::Apply { args, yes } => (args, *yes),
    };

    let engine = StretchEngine::new(paths, config.profile.clone());
    let engine = if args.skip_display_check {
        engine.with_display(UnknownDisplay)
    } else if cfg!(windows) {
        engine.with_display(WindowsDisplay)
    } else {
        engine.with_display(X11Display)
    };

    let pair = match engine.verify(args.native, args.target, args.force) {
        Ok(pair) => pair,
        Err(e) => {
            if cli.json {
                println!("{}", json!({ "error": e }));
            } else {
                println!("[!] {e}");
            }
            return Ok(ExitCode::from(EXIT_VALIDATION));
        }
    };

    if let Command::Verify(_) = cli.command {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&pair)?);
        } else {
            print_warnings(&pair, None);
            println!("Planned updates:");
            for target in &targets {
                println!(" - {} -> {}", target.label, target.path.display());
            }
            println!("\nVerification complete.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let plan = engine.plan(&pair);
    let lines = render(&plan);

    if !cli.json {
        print_warnings(&pair, Some(&plan));
        print!("{}", format_report(&lines));
    }

    if let Command::Preview(_) = cli.command {
        if cli.json {
            let out = json!({ "validated": pair, "plan_warnings": plan.warnings, "lines": lines });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("-> Dry run (no write).");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if plan.is_noop() {
        if cli.json {
            let result = ApplyResult {
                succeeded: true,
                ..ApplyResult::default()
            };
            let out = json!({ "validated": pair, "lines": lines, "result": result });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !yes && !confirm("\nApply changes? [y/N]: ")? {
        warn!("Apply declined by user");
        println!("Aborted, nothing written.");
        return Ok(ExitCode::SUCCESS);
    }

    let result = engine.apply(&plan);
    if cli.json {
        let out = json!({ "validated": pair, "lines": lines, "result": result });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_apply_result(&result, pair.target);
    }

    Ok(if result.succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_APPLY)
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    if let Some(e) = config_error {
        warn!(error = ?e, "Using default config");
    }

    match run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "true-stretch failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_INPUT)
        }
    }
}
