use clap::Parser;
use survey_chat::cli::{args::Args, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if let Some(level) = run::log_level(args.debug) {
        logger.filter_level(level);
    }
    logger.init();
    run::run(args).await?;
    Ok(())
}
