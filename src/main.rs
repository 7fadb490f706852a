use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod backend;
mod config;
mod events;
mod settle;
mod store;
mod theme;
mod ui;

use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Terminal client for a chat assistant backend", long_about = None)]
struct Cli {
    /// Override the backend endpoint from the config file
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    // The TUI owns stdout, so logs go to a file under the parley home.
    let file_appender = tracing_appender::rolling::never(&config.parley_home, "parley.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=debug")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!(endpoint = %config.endpoint, "starting parley");

    App::new(config)?.run().await
}
