use flow_server::{build_state, router, ServerConfig, ServerError};

#[tokio::main]
async fn main() {
    // Initialize logging; RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Flow server starting...");

    if let Err(e) = run().await {
        log::error!("Flow server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env().await?;

    if !config.data_dir.exists() {
        match std::fs::create_dir_all(&config.data_dir) {
            Ok(()) => log::info!("Created data directory: {:?}", config.data_dir),
            Err(e) => log::error!("Failed to create data directory {:?}: {}", config.data_dir, e),
        }
    }

    let state = build_state(&config).await?;
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    log::info!("Flow server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
