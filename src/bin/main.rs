use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use xserver_renew::{runner, Config, RunOutcome};

#[tokio::main]
async fn main() {
    let cfg = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let code = match runner::execute(&cfg).await {
        Ok(outcome) => {
            match outcome {
                RunOutcome::Success => info!("{}", outcome.describe()),
                RunOutcome::SkippedTooSoon => info!("{}", outcome.describe()),
                other => warn!("{}", other.describe()),
            }
            outcome.exit_code()
        }
        Err(e) => {
            error!("fatal: {}", e);
            1
        }
    };

    std::process::exit(code as i32);
}
