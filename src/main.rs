mod app;
mod cli;
mod clipboard;
mod platform;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = app::run(cli.display, cli.command).await {
        tracing::error!(error = %e, "clipboard command failed");
        eprintln!("lcui-clipboard: {e}");
        std::process::exit(1);
    }
}
