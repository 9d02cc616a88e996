//! Pricing engine entry point

use clap::Parser;
use pricing_engine::cli::{cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pricing_engine=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, output, cv_folds, seed, report } => {
            cmd_train(data, output, cv_folds, seed, report.as_deref())?;
        }
        Commands::Predict { model, input } => {
            cmd_predict(model, &input)?;
        }
        Commands::Serve { model, host, port } => {
            cmd_serve(model, host, port).await?;
        }
    }

    Ok(())
}
