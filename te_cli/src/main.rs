use std::sync::Arc;
use clap::Parser;
use tracing_subscriber::util::SubscriberInitExt;
use crate::args::SubCommands;

mod args;
mod config;
mod trace;

fn main() -> eyre::Result<()> {
    // We don't care if it can't find a .env file
    let _ = dotenv::dotenv();

    color_eyre::install()?;
    let args = args::ClapArgs::parse();
    let conf = Arc::new(match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::initialise_config()?,
    });
    trace::create_subscriber("WARN,te_cli=INFO,te_ml=INFO").init();

    tracing::info!(version = te_ml::BURN_VERSION, "Using burn");
    let now = std::time::Instant::now();

    match args.commands {
        SubCommands::Train(train) => {
            train.run(conf)?;
        }
        SubCommands::Evaluate(eval) => {
            eval.run(conf)?;
        }
        SubCommands::Predict(pred) => {
            pred.run(conf)?;
        }
        SubCommands::Inspect(insp) => {
            insp.run(conf)?;
        }
    }

    tracing::info!(
        "Runtime: {:.2?}", now.elapsed()
    );

    Ok(())
}
