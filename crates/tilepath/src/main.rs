use clap::Parser;
use tilepath::{ServerBuilder, Settings, TilepathError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), TilepathError> {
    // RUST_LOG=tilepath_session=debug for move-by-move output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let settings = Settings::parse();
    let mut builder = ServerBuilder::new()
        .bind(&settings.bind)
        .transport(settings.transport)
        .round_config(settings.round_config());
    if let Some(seed) = settings.seed {
        builder = builder.seed(seed);
    }

    let server = match builder.build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, bind = %settings.bind, "could not start");
            return Err(e);
        }
    };
    match server.local_addr() {
        Ok(addr) => tracing::info!(%addr, "listening"),
        Err(e) => tracing::warn!(error = %e, "listening on an unknown address"),
    }

    server.run().await;
    Ok(())
}
