use room_relay::{api, Config, Relay};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let addr = config.addr;

    // Keep track of connected users and their rooms
    let relay = Relay::new(config);
    let routes = api::build_filters(relay);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for shutdown signal: {}", e);
        }
    };
    let (addr, server) = match warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok(bound) => bound,
        Err(e) => {
            log::error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    log::info!("relay listening on {}", addr);
    server.await;
    log::info!("relay stopped");
}
