// src/main.rs

use leetqode_lib::api;
use leetqode_lib::config::Config;
use leetqode_lib::database;
use leetqode_lib::models::AppState;
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting LeetQode scheduler backend...");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Bad configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Database path: {:?}", config.db_path);
    let conn = match database::open(&config.db_path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Init Database (Schema + Seeds)
    if let Err(e) = database::init_db(&conn, config.seed) {
        error!("Failed to init database: {}", e);
        return ExitCode::FAILURE;
    }

    let state = Arc::new(AppState::new(conn));
    match api::serve(state, config.bind_addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
