use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    let cli = tdo::cli::Cli::parse();
    tdo::init_tracing(cli.log_filter.clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async {
        let config = tdo::ClientConfig::discover(cli.api_url.clone())
            .context("failed to resolve the service URL")?;
        let client = tdo::RemoteClient::new(&config)?;
        let mut engine = tdo::TaskEngine::new(client);

        let stdout = std::io::stdout();
        let handle = stdout.lock();
        tdo::commands::execute(&mut engine, cli.command, handle).await
    })
}
