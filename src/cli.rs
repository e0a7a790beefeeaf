use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use geoaddr_application::{
    prelude as flows,
    queue::{GeocodeQueue, QueueStats},
};
use geoaddr_core::{entities::AddressId, usecases::GeocodeOutcome};
use geoaddr_db_sqlite::{self as sqlite, run_embedded_database_migrations};

use crate::{config::Config, gateways};

#[derive(Parser)]
#[command(name = "geoaddress", version, about)]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// URL to the database
    #[arg(long, value_name = "DATABASE_URL")]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered geocoding providers
    Providers,
    /// Geocode a single address immediately
    Geocode { address_id: AddressId },
    /// Geocode all addresses that are still waiting for coordinates
    GeocodePending {
        /// Maximum number of addresses
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Forget a previous failure and geocode the address again
    Retry { address_id: AddressId },
    /// Run the database migrations
    Migrate,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut cfg = Config::try_load_from_file_or_default(args.config.as_deref())?;
    if let Some(db_url) = args.db_url {
        cfg.db.conn_sqlite = db_url;
    }

    if let Command::Providers = args.command {
        for name in gateways::geocoder_factory(&cfg).list_providers() {
            println!("{name}");
        }
        return Ok(());
    }

    log::info!(
        "Connecting to SQLite database '{}' (pool size = {})",
        cfg.db.conn_sqlite,
        cfg.db.conn_pool_size
    );
    let connections =
        sqlite::Connections::init(&cfg.db.conn_sqlite, cfg.db.conn_pool_size.into())?;
    run_embedded_database_migrations(connections.exclusive()?)?;

    match args.command {
        Command::Providers | Command::Migrate => Ok(()),
        Command::Geocode { address_id } => {
            let job = gateways::geocode_job(&cfg, connections)?;
            match job.run(&address_id)? {
                GeocodeOutcome::Geocoded(address) => {
                    if let Some(coordinates) = address.coordinates() {
                        println!("{address_id}: {coordinates}");
                    }
                }
                GeocodeOutcome::Skipped(reason) => println!("{address_id}: skipped ({reason})"),
            }
            Ok(())
        }
        Command::GeocodePending { limit } => {
            let job = gateways::geocode_job(&cfg, connections.clone())?;
            let queue = GeocodeQueue::new(cfg.queue.clone());
            let count = flows::enqueue_pending_geocoding(&connections, &queue, limit)?;
            log::info!("Geocoding {count} pending address(es)");
            let stats = process_queue(&queue, job)?;
            println!("{} geocoded, {} failed", stats.completed, stats.failed);
            Ok(())
        }
        Command::Retry { address_id } => {
            let job = gateways::geocode_job(&cfg, connections.clone())?;
            let queue = GeocodeQueue::new(cfg.queue.clone());
            if !flows::retry_geocoding(&connections, &queue, &address_id)? {
                println!("{address_id}: nothing to do");
                return Ok(());
            }
            let stats = process_queue(&queue, job)?;
            if stats.failed > 0 {
                return Err(anyhow!("Unable to geocode address {address_id}"));
            }
            Ok(())
        }
    }
}

fn process_queue(queue: &GeocodeQueue, job: flows::GeocodeAddressJob) -> Result<QueueStats> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(queue.process_pending(Arc::new(job))))
}
