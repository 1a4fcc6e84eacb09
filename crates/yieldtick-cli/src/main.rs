//! Yieldtick CLI
//!
//! Rate calculator, offline simulator and a live accrual session for local
//! experiments.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yieldtick_core::prelude::*;
use yieldtick_economics::{RateCalculator, RateFormula, TimeTier, SYMBOL};
use yieldtick_engine::{AccrualRuntime, AccrualSession, EngineConfig, LoggingConfig, SessionDeps};
use yieldtick_storage::{FileStore, MemoryRemoteStore, MemoryStore};

#[derive(Parser)]
#[command(name = "yieldtick")]
#[command(version)]
#[command(about = "Yieldtick - continuous staking accrual with periodic reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "yieldtick.toml", env = "YIELDTICK_CONFIG")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the earning rate for a stake
    Rate {
        /// Staked balance
        #[arg(short, long)]
        balance: f64,

        /// Days since the accrual epoch started
        #[arg(short, long, default_value = "0")]
        days: u64,

        /// Referred users, applied with the referral formula
        #[arg(short, long, default_value = "0")]
        referrals: u32,

        /// Override the configured daily ratio
        #[arg(long)]
        ratio: Option<f64>,
    },

    /// Replay a session against a simulated clock
    Simulate {
        /// Staked balance
        #[arg(short, long)]
        balance: f64,

        /// Referred users
        #[arg(short, long, default_value = "0")]
        referrals: u32,

        /// Foreground seconds to simulate
        #[arg(short, long, default_value = "3600")]
        seconds: i64,

        /// Seconds spent in the background afterwards
        #[arg(long, default_value = "0")]
        offline: i64,
    },

    /// Run a live session backed by a file cache
    Run {
        /// User identifier
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Staked balance
        #[arg(short, long)]
        balance: f64,

        /// Referred users
        #[arg(short, long, default_value = "0")]
        referrals: u32,

        /// Data directory
        #[arg(long, default_value = "~/.yieldtick")]
        data_dir: PathBuf,

        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Use short development windows
        #[arg(long)]
        dev: bool,
    },
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false),
            )
            .init();
    }
}

fn expand_path(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = expand_path(&cli.config);
    let config = EngineConfig::load(&config_path)?;
    init_logging(cli.verbose, &config.logging);

    match cli.command {
        Commands::Rate {
            balance,
            days,
            referrals,
            ratio,
        } => {
            let calculator = RateCalculator::new(ratio.unwrap_or(config.daily_ratio)).with_formula(
                if referrals > 0 {
                    RateFormula::WithReferrals
                } else {
                    config.rate_formula
                },
            );
            let profile = StakeProfile::new(balance, referrals);
            let tier = TimeTier::from_days(days);

            println!("Balance:     {} {}", balance, SYMBOL);
            println!("Tier:        {} (x{})", tier.name(), tier.multiplier());
            println!("Per second:  {:.12}", calculator.rate(&profile, days));
            println!("Per day:     {:.8}", calculator.daily_earnings(&profile, days));
        }

        Commands::Simulate {
            balance,
            referrals,
            seconds,
            offline,
        } => {
            simulate(config, StakeProfile::new(balance, referrals), seconds, offline).await?;
        }

        Commands::Run {
            user,
            balance,
            referrals,
            data_dir,
            duration,
        } => {
            let data_dir = expand_path(&data_dir);
            std::fs::create_dir_all(&data_dir)?;
            let local = Arc::new(FileStore::open(data_dir.join("accrual.json"))?);

            tracing::info!(config = %config_path.display(), data = %data_dir.display(), "starting accrual session");

            let deps = SessionDeps::new(Arc::new(SystemClock), local, Arc::new(MemoryRemoteStore::new()));
            let session = AccrualSession::new(UserId::new(user), StakeProfile::new(balance, referrals), config, deps);
            let handle = AccrualRuntime::spawn(session);

            let stop = async {
                match duration {
                    Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                    None => {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            tracing::error!(error = %e, "failed to listen for Ctrl-C");
                        }
                    }
                }
            };
            stop.await;

            let view = handle.shutdown().await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }

        Commands::InitConfig { dev } => {
            let config = if dev {
                EngineConfig::development()
            } else {
                EngineConfig::default()
            };
            config.save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

/// Step a session second by second on a manual clock
async fn simulate(config: EngineConfig, profile: StakeProfile, seconds: i64, offline: i64) -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::new(SystemClock.now_ms()));
    let remote = Arc::new(MemoryRemoteStore::new());
    let deps = SessionDeps::new(clock.clone(), Arc::new(MemoryStore::new()), remote.clone());
    let sync_every = (config.sync_interval_ms / 1_000).max(1) as i64;

    let mut session = AccrualSession::new(UserId::new("simulated"), profile, config, deps);
    session.initialize().await;

    for second in 1..=seconds {
        clock.advance_secs(1);
        session.tick();
        session.countdown();
        if second % sync_every == 0 {
            session.sync().await;
        }
    }

    if offline > 0 {
        session.set_visibility(Visibility::Background);
        clock.advance_secs(offline);
        if let Some(credit) = session.set_visibility(Visibility::Foreground) {
            tracing::info!(credit, "offline catch-up applied");
        }
    }

    let view = session.shutdown().await;
    println!("{}", serde_json::to_string_pretty(&view)?);
    println!("remote writes: {}", remote.write_count());
    Ok(())
}
