// Concierge — process entry point.

use concierge::config::Config;
use concierge::server::{router, AppState};
use log::{error, info};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("[server] {}", e);
            std::process::exit(1);
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::build(config);
    let services = state.services.clone();
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("[server] Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    info!("[server] Listening on {}", bind_addr);

    let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = serve.await {
        error!("[server] Server error: {}", e);
    }

    // Child service processes outlive the router unless torn down here.
    services.close_all().await;
    info!("[server] Shutdown complete");
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        error!("[server] Failed to install ctrl-c handler");
        return;
    }
    info!("[server] Shutdown signal received");
}
