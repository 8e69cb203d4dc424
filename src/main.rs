//! Code Vault: game server and offline level tools

use anyhow::Context;
use clap::{Parser, Subcommand};
use codevault_core::{
    check, BindMode, FragmentId, LevelCatalog, ServerConfig, TeamId, TeamRecord, Verdict,
};
use codevault_engine::{GameRuntime, JsonFileStore};
use codevault_gateway::start_server;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "codevault", about = "Code Vault, an escape-room code ordering game")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP game server
    Serve {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        port: Option<u16>,
        /// loopback or lan
        #[arg(short, long)]
        bind: Option<String>,
        /// JSON team file (teams stay in memory when omitted)
        #[arg(short, long)]
        teams: Option<PathBuf>,
        /// JSON level catalog (built-in levels when omitted)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Log as JSON lines
        #[arg(long)]
        log_json: bool,
    },
    /// List the levels of a catalog
    Levels {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Verify an arrangement of fragment ids against a level
    Check {
        #[arg(short, long)]
        level: u32,
        #[arg(short, long, default_value = "0")]
        variant: u32,
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Fragment ids in submitted order
        ids: Vec<String>,
    },
    /// Add a team to a JSON team file
    AddTeam {
        id: String,
        #[arg(long)]
        pin: Option<String>,
        #[arg(long, default_value = "0")]
        variant: u32,
        #[arg(short, long)]
        teams: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show version
    Version,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "codevault=info,tower_http=info".into());
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve {
            config,
            port,
            bind,
            teams,
            catalog,
            log_json,
        }) => {
            init_tracing(log_json);

            let mut config = ServerConfig::resolve(config.as_deref())
                .context("failed to load configuration")?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = BindMode::parse(&bind);
            }
            if teams.is_some() {
                config.data.teams_path = teams;
            }
            if catalog.is_some() {
                config.data.catalog_path = catalog;
            }
            start_server(config).await?;
        }

        Some(Commands::Levels { catalog }) => {
            let catalog = LevelCatalog::load_or_builtin(catalog.as_deref())?;
            for variant in catalog.variants() {
                println!("variant {}:", variant);
                for level in catalog.levels().filter(|l| l.variant == variant) {
                    println!(
                        "  level {:>2}  {:>2} fragments ({} bluffs)  {} groups  {}",
                        level.level_number,
                        level.fragments.len(),
                        level.bluffs().count(),
                        level.interchangeable_groups.len(),
                        level.description,
                    );
                }
            }
        }

        Some(Commands::Check {
            level,
            variant,
            catalog,
            ids,
        }) => {
            let catalog = LevelCatalog::load_or_builtin(catalog.as_deref())?;
            let level = catalog.require(level, variant)?;
            let submitted: Vec<FragmentId> = ids.into_iter().map(FragmentId::from).collect();
            let verdict = check(&submitted, level);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            if let Verdict::Rejected(_) = verdict {
                std::process::exit(1);
            }
        }

        Some(Commands::AddTeam {
            id,
            pin,
            variant,
            teams,
            config,
        }) => add_team(&id, pin, variant, &teams, config.as_deref()).await?,

        Some(Commands::Version) => {
            println!("codevault v{}", env!("CARGO_PKG_VERSION"));
        }

        None => {
            println!("codevault v{}", env!("CARGO_PKG_VERSION"));
            println!("Run `codevault serve` to start the game server, or --help for all commands.");
        }
    }

    Ok(())
}

async fn add_team(
    raw_id: &str,
    pin: Option<String>,
    variant: u32,
    teams: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let config = ServerConfig::resolve(config)?;
    let catalog = LevelCatalog::load_or_builtin(config.data.catalog_path.as_deref())?;
    if !catalog.variants().contains(&variant) {
        anyhow::bail!("catalog has no variant {}", variant);
    }
    let store = Arc::new(JsonFileStore::open(teams).await?);
    let start_score = config.policy.start_score;
    let runtime = GameRuntime::load(catalog, config.policy, store).await?;

    let mut record = TeamRecord::new(TeamId::sanitize(raw_id), variant, start_score);
    if let Some(pin) = pin {
        record = record.with_pin(pin);
    }
    let id = record.id().clone();
    runtime.register_team(record).await?;
    println!(
        "Added team {} (variant {}, score {}) to {}",
        id,
        variant,
        start_score,
        teams.display()
    );
    Ok(())
}
