use std::sync::Arc;

use solid_launch::config::{load_config, print_schema};
use solid_launch::startup;
use solid_launch::utils::logger::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {}", e);
        std::process::exit(1);
    }
    info!(
        "Loaded configuration (environment={}, port={})",
        config.environment, config.port
    );

    if let Err(e) = startup::run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
