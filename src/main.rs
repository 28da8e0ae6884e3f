mod application;
mod cli_adapter;
mod config;
mod domain;
mod infrastructure;

use cli_adapter::CliAdapter;
use config::app_config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

fn setup_tracing() {
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    Registry::default()
        .with(
            tracing_subscriber::filter::Targets::new()
                .with_target("med_error_log", tracing::Level::INFO),
        )
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let app = AppConfig::from_env();
    tracing::debug!(title = %app.title, unit = %app.unit_name, "starting med-error-log");

    let args: Vec<String> = std::env::args().collect();
    let adapter = CliAdapter::new(app);

    match adapter.run(args).await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::error!("command failed: {err}");
            Err(err)
        }
    }
}
