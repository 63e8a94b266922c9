mod cli;

use std::sync::Arc;

use clap::Parser;
use pairkeeper::config::{Config, Credentials};
use pairkeeper::engine::Engine;
use pairkeeper::infra::db::{configure_sqlite_connection, create_pool, run_migrations};
use pairkeeper::infra::kalshi::client::KalshiClientConfig;
use pairkeeper::infra::kalshi::KalshiClient;
use pairkeeper::infra::sqlite_ledger::SqliteLedger;
use pairkeeper::port::{ExchangeClient, Ledger};
use pairkeeper::{Error, Result};
use tracing::{error, info};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            std::process::exit(1);
        }
    };
    config.init_logging();

    let result = match cli.command {
        Commands::Run(args) => {
            if args.paper {
                config.paper_trade = true;
            }
            if args.live {
                config.paper_trade = false;
            }
            run(config).await
        }
        Commands::InitDb => init_db(&config),
        Commands::Status => status(&config),
    };

    if let Err(err) = result {
        error!(error = %err, "fatal error");
        std::process::exit(1);
    }
}

fn init_db(config: &Config) -> Result<()> {
    let pool = create_pool(&config.database)?;
    run_migrations(&pool)?;
    println!("migrations applied to {}", config.database);
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let pool = create_pool(&config.database)?;
    let ledger = SqliteLedger::new(pool);

    let open_pairs = ledger.open_pairs()?;
    println!("open pairs: {}", open_pairs.len());
    for pair in &open_pairs {
        println!("  {} {} (status={})", pair.pair_id, pair.ticker, pair.status.as_str());
    }

    let summary = ledger.pnl_summary()?;
    println!(
        "pnl: {} pairs, total_realized={}, total_fees={}, average_realized={}",
        summary.count, summary.total_realized, summary.total_fees, summary.average_realized
    );

    let events = ledger.recent_events(20)?;
    println!("recent events:");
    for (event_type, details, at) in events {
        println!("  [{at}] {event_type}: {details}");
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    info!(paper_trade = config.paper_trade, "pairkeeper starting");

    let pool = create_pool(&config.database)?;
    run_migrations(&pool)?;
    {
        let mut conn = pool.get()?;
        configure_sqlite_connection(&mut conn)?;
    }
    let ledger: Arc<dyn Ledger> = Arc::new(SqliteLedger::new(pool));

    // Paper mode still reads real market data (post-only quotes are priced
    // off the live book); only order placement and cancellation are routed
    // to the synthetic ledger instead of the exchange (§4.6).
    let credentials = Credentials::from_env()?;
    let client_config = KalshiClientConfig {
        base_url: config.api_url.clone(),
        api_key_id: credentials.api_key_id,
        private_key_pem: credentials.private_key_pem,
        requests_per_minute: std::num::NonZeroU32::new(config.rate_limit_per_minute)
            .ok_or_else(|| Error::Fatal("rate_limit_per_minute must be nonzero".into()))?,
        timeout_seconds: 30,
    };
    let exchange: Arc<dyn ExchangeClient> = Arc::new(KalshiClient::new(client_config)?);

    let mut engine = Engine::new(config, ledger, exchange)?;
    engine.recover().await?;
    engine.run(shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => error!(error = %err, "failed to install ctrl-c handler"),
    }
}
