use parlor_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    parlor_api::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let config = Config::from_env()?;

    let (_state, app) = parlor_api::setup::initialize_app(config.clone()).await?;

    parlor_api::setup::server::start_server(&config, app).await?;

    Ok(())
}
