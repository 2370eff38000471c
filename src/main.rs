mod config;
mod lookup;
mod normalize;
mod plate;
mod region;
mod server;
mod types;
mod upstream;

use config::Config;
use env_logger::Env;
use log::{error, info};
use lookup::Lookup;
use std::process;

#[macro_use]
extern crate failure;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting placa-lookup");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let regions = match config.region_table() {
        Ok(r) => r,
        Err(e) => {
            error!("Unable to load state table: {}", e);
            process::exit(1);
        }
    };
    info!(
        "Using {:?} upstream at {} with {} state ranges",
        config.source,
        config.upstream_url,
        regions.len()
    );

    let lookup = Lookup::new(config.plate_source(), regions);
    let server_task = tokio::spawn(server::run(config.addr, lookup));
    tokio::select! {
        result = server_task => {
            if let Err(e) = result {
                error!("Server task failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
    info!("Exiting main");
}
