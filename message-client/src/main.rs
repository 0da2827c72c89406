use anyhow::Result;
use clap::Parser;
use tracing::info;

use message_client::{cli::Cli, session::Session, shell};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.client_config();
    info!(server = %config.server_host, port = config.server_port, "starting client");

    let (session, notifications) = Session::new(config);
    let session = session.with_filter(cli.filter.build());
    shell::run(session, notifications).await;

    println!("+++ FINISHED +++");
    Ok(())
}
