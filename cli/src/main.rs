use clap::Parser;
use qtube_cli::Cli;
use qtube_cli::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_main(cli).await
}
