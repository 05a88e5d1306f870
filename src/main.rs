//! Granary - Capital Allocation & Yield Donation Engine
//!
//! Pools deposited capital across yield-bearing venues and donates the
//! earned yield to a configured recipient.

mod adapters;
mod application;
mod config;
mod domain;
mod ports;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::cli::{
    CliApp, Command, RebalanceCmd, RecommendCmd, ReleaseCmd, RunCmd, StatusCmd,
};
use crate::adapters::{LocalPayout, RecommenderClient, SimulatedVenue};
use crate::application::{AllocationEngine, AllocationService};
use crate::config::{load_config, Config};
use crate::domain::{AccountId, AccountingLedger, AllocationController, AuthPolicy};
use crate::ports::{PayoutPort, VenuePort};

#[tokio::main]
async fn main() -> Result<()> {
    // .env holds secrets and local overrides, not config.toml
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Status(cmd) => status_command(cmd).await,
        Command::Rebalance(cmd) => rebalance_command(cmd).await,
        Command::Release(cmd) => release_command(cmd).await,
        Command::Recommend(cmd) => recommend_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Build the engine and payout sink from a loaded config.
fn build_engine(config: &Config) -> Result<(AllocationEngine, Arc<LocalPayout>)> {
    let venues: Vec<Arc<dyn VenuePort>> = config
        .venues
        .iter()
        .map(|v| {
            let rate = Decimal::from_f64_retain(v.annual_rate).unwrap_or_default();
            let venue = SimulatedVenue::new(v.name.clone(), rate);
            let venue = if v.jitter { venue.with_jitter() } else { venue };
            Arc::new(venue) as Arc<dyn VenuePort>
        })
        .collect();

    let payout = Arc::new(LocalPayout::new());
    let ledger = AccountingLedger::new(
        AccountId::new(config.yield_release.recipient.clone()),
        config.yield_release.min_release_interval_secs,
    )
    .context("invalid yield recipient")?;
    let controller = AllocationController::new(config.venues.len(), config.allocation_policy());
    let auth = AuthPolicy::new(AccountId::new(config.engine.admin_id.clone()));

    let engine = AllocationEngine::new(
        venues,
        Arc::clone(&payout) as Arc<dyn PayoutPort>,
        ledger,
        controller,
        auth,
    );
    Ok((engine, payout))
}

fn recommender_from(config: &Config) -> Option<RecommenderClient> {
    if config.recommender.enabled {
        Some(RecommenderClient::new(config.recommender.api_url.clone()))
    } else {
        None
    }
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let (mut engine, _payout) = build_engine(&config)?;

    if let Some(amount) = cmd.seed_deposit {
        engine
            .deposit(amount)
            .await
            .context("seed deposit failed")?;
        tracing::info!(amount, "pool seeded");
    }

    let admin = AccountId::new(config.engine.admin_id.clone());
    let service = AllocationService::new(
        engine,
        recommender_from(&config),
        admin,
        Duration::from_secs(config.engine.poll_interval_secs),
    );

    let handle = service.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
        handle.stop().await;
    });

    service.run().await?;
    tracing::info!("granary stopped");
    Ok(())
}

async fn status_command(cmd: StatusCmd) -> Result<()> {
    let config = load_config(&cmd.config)?;
    let (engine, _payout) = build_engine(&config)?;
    let status = engine
        .allocation_status()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("Granary pool status");
    println!("  Recipient:   {}", engine.recipient());
    println!("  Total value: {}", status.total_value);
    println!("  Idle cash:   {}", status.idle);
    for venue in &status.venues {
        println!(
            "  {:<10} balance {:>12}  target {:>5} bps",
            venue.name, venue.balance, venue.target_bps
        );
    }
    Ok(())
}

async fn rebalance_command(cmd: RebalanceCmd) -> Result<()> {
    let config = load_config(&cmd.config)?;
    let (mut engine, _payout) = build_engine(&config)?;
    let admin = AccountId::new(config.engine.admin_id.clone());

    let weights = match cmd.weights {
        Some(w) => w,
        None => {
            let client = recommender_from(&config)
                .context("no weights given and recommender is disabled")?;
            client
                .fetch_weights(&engine.venue_names())
                .await
                .context("failed to fetch recommendation")?
        }
    };

    engine
        .set_target_weights(&admin, weights)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine
        .rebalance(&admin)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let status = engine
        .allocation_status()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Rebalanced. Total value: {}", status.total_value);
    for venue in &status.venues {
        println!("  {:<10} {:>12} ({} bps)", venue.name, venue.balance, venue.target_bps);
    }
    Ok(())
}

async fn release_command(cmd: ReleaseCmd) -> Result<()> {
    let config = load_config(&cmd.config)?;
    let (mut engine, payout) = build_engine(&config)?;

    let released = engine
        .release_yield()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if released == 0 {
        println!("No yield accumulated; nothing released.");
    } else {
        println!(
            "Released {} to {} (total paid: {})",
            released,
            engine.recipient(),
            payout.total_paid(engine.recipient())
        );
    }
    Ok(())
}

async fn recommend_command(cmd: RecommendCmd) -> Result<()> {
    let config = load_config(&cmd.config)?;
    let client = RecommenderClient::new(config.recommender.api_url.clone());

    let recommendation = client
        .get_recommendation()
        .await
        .context("failed to fetch recommendation")?;

    println!("AI allocation recommendation (confidence {:.2}):", recommendation.confidence);
    for (venue, bps) in &recommendation.allocation {
        let apy = recommendation
            .predicted_yields
            .get(venue)
            .copied()
            .unwrap_or(0.0);
        println!("  {:<10} {:>5} bps  (predicted APY {:.2}%)", venue, bps, apy * 100.0);
    }
    Ok(())
}
