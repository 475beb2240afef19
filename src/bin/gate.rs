use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use edupulse_guard::config::GateConfig;
use edupulse_guard::error::install_panic_logger;
use edupulse_guard::guard::RoutePolicy;
use edupulse_guard::handlers::{handle_redirect, health, route_guard};
use edupulse_guard::security_logger::init_security_logger;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();
    install_panic_logger();

    // Initialize env
    match dotenvy::dotenv() {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match GateConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, static_dir={}",
        config.host,
        config.port,
        config.static_dir.display()
    );

    init_security_logger();

    let policy = Arc::new(RoutePolicy::standard().clone());

    // Every page goes through the edge guard before it is served
    let site = route_guard(policy).and(warp::fs::dir(config.static_dir.clone()));
    let routes = health().or(site).recover(handle_redirect);

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting EduPulse gate on {}", addr);
    warp::serve(routes).run(addr).await;
}
