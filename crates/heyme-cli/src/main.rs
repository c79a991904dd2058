use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    heyme_cli::init_logging();
    heyme_cli::run(heyme_cli::Args::parse()).await
}
