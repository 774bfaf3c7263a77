use std::process::exit;

use gateway::{Config, Gateway, MemoryUserStore};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config {
        oscar_host: env_or("ICQ_GATEWAY_OSCAR_HOST", "login.icq.com"),
        component_host: env_or("ICQ_GATEWAY_COMPONENT_HOST", "localhost"),
        component_domain: env_or("ICQ_GATEWAY_DOMAIN", "icq.localhost"),
        component_secret: std::env::var("ICQ_GATEWAY_SECRET").unwrap_or_else(|_| {
            eprintln!("ICQ_GATEWAY_SECRET must be set to the component's shared secret");
            exit(1);
        }),
        ..Config::default()
    };

    // A real deployment supplies its own persistent UserStore; this process
    // only demonstrates wiring the gateway up with the in-memory reference
    // implementation.
    let store = Box::new(MemoryUserStore::new());

    let mut gw = match Gateway::connect(config, store).await {
        Ok(gw) => gw,
        Err(e) => {
            eprintln!("failed to connect to the component stream: {e}");
            exit(1);
        }
    };

    log::info!("gateway connected, entering main loop");

    tokio::select! {
        result = gw.run() => {
            if let Err(e) = result {
                log::error!("gateway loop ended with an error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutting down");
            if let Err(e) = gw.shutdown().await {
                log::error!("error during shutdown: {e}");
            }
        }
    }
}
