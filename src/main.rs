use bridge_warden::{relay, Config};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    let role_label = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre::eyre!("usage: bridge-warden <source|destination>"))?;

    tracing::info!(role = %role_label, "Starting bridge warden pass");

    let config = Config::load()?;

    let processed = relay::run(&config, &role_label).await;
    tracing::info!(processed, "Bridge warden pass complete");
    println!("{processed}");

    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_warden=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}
