//! `wizard` command-line entry point

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wizard_cli::{open_manager, simulate, CliConfig, SimulateOptions};

fn cli() -> Command {
    Command::new("wizard")
        .version(wizard_cli::VERSION)
        .about("Guided workflow recovery tooling")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory of the durable storage scope"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Describe the stored recovery snapshot")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("clear").about("Delete the stored recovery snapshot"))
        .subcommand(
            Command::new("simulate")
                .about("Run the article-analysis workflow, save, and resume it")
                .arg(
                    Arg::new("articles")
                        .long("articles")
                        .default_value("3")
                        .value_parser(value_parser!(u64))
                        .help("Number of articles to select"),
                )
                .arg(
                    Arg::new("stop-at")
                        .long("stop-at")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Step number to stop on before saving"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<CliConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = CliConfig::load(path.map(PathBuf::as_path))
        .with_context(|| format!("loading configuration {path:?}"))?;
    if let Some(dir) = matches.get_one::<PathBuf>("storage-dir") {
        config = config.with_storage_dir(dir);
    }
    Ok(config)
}

async fn inspect(config: &CliConfig, json: bool) -> Result<()> {
    let manager = open_manager(config);
    let summary = manager.recovery_summary().await;

    if json {
        let value = serde_json::json!({
            "storageDir": config.storage_dir,
            "available": manager.is_available().await,
            "lastSessionId": manager.last_session_id().await,
            "snapshot": summary,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Storage: {}", config.storage_dir.display());
    let Some(summary) = summary else {
        println!("No recovery snapshot stored.");
        return Ok(());
    };
    println!("Recovery snapshot:");
    println!("  Step:       {}", summary.step_name);
    println!("  Last saved: {}", summary.last_saved.to_rfc3339());
    println!("  Size:       {}", summary.data_size);
    println!("  Expired:    {}", if summary.is_expired { "yes" } else { "no" });
    if let Some(session) = manager.last_session_id().await {
        println!("  Session:    {session}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("inspect", args)) => inspect(&config, args.get_flag("json")).await?,
        Some(("clear", _)) => {
            open_manager(&config).clear_recovery_state().await;
            println!("Cleared recovery snapshot in {}", config.storage_dir.display());
        }
        Some(("simulate", args)) => {
            let options = SimulateOptions {
                articles: args.get_one::<u64>("articles").copied().unwrap_or(3),
                stop_at: args.get_one::<usize>("stop-at").copied().unwrap_or(2),
            };
            println!("Simulating {} article(s), stopping at step {}", options.articles, options.stop_at);

            let report = simulate::run(&config, options).await?;
            println!("Session {} ended on step {}", report.session_id, report.reached_step);
            println!("Saved: {}", if report.saved { "yes" } else { "no" });
            match report.restored_step {
                Some(step) => println!("Resumed on step {step}"),
                None => println!("Nothing to resume"),
            }
            if let Some(summary) = report.summary {
                println!("Snapshot: {} ({})", summary.step_name, summary.data_size);
            }
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
