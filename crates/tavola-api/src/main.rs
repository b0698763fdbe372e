use tavola_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tavola_api::telemetry::init_telemetry();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage trees, generator, routes)
    let (_state, router) = tavola_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    tavola_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
