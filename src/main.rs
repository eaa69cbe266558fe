use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gleaner::app::AppContext;
use gleaner::cli::commands::{self, CheckpointChoice, Overrides};
use gleaner::cli::{Cli, Commands, ConfigAction};
use gleaner::config::Config;
use gleaner::domain::Target;
use gleaner::harvester::ChromeRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gleaner=info")))
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Path => commands::config_path(cli.config.as_deref())?,
            ConfigAction::Show => commands::show_config(&config)?,
        }
        return Ok(());
    }

    let ctx = AppContext::new(config, None)?;

    match cli.command {
        Commands::Harvest {
            keyword,
            url,
            count,
            headless,
            preset,
            timeout,
            checkpoint,
            output,
        } => {
            let target = match (keyword, url) {
                (_, Some(url)) => Target::Locator(url),
                (Some(keyword), None) => Target::Keyword(keyword),
                (None, None) => anyhow::bail!("either --keyword or --url is required"),
            };
            let overrides = Overrides {
                preset,
                headless,
                timeout_secs: timeout,
                output_dir: None,
            };
            commands::harvest(
                &ctx,
                &ChromeRunner,
                target,
                count,
                CheckpointChoice::from(checkpoint),
                output,
                &overrides,
            )
            .await?;
        }
        Commands::Batch {
            path,
            headless,
            preset,
            checkpoint,
            skip_completed,
            output_dir,
        } => {
            let overrides = Overrides {
                preset,
                headless,
                timeout_secs: None,
                output_dir,
            };
            commands::batch(&ctx, &ChromeRunner, &path, checkpoint, skip_completed, &overrides)
                .await?;
        }
        Commands::History { limit } => {
            commands::history(&ctx, limit)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
