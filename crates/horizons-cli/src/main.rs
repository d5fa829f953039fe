mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use horizons_cache::{EntityKey, connect_store};

use cli::{Cli, Commands};
use output::{print_error, print_success, print_value};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();
    let cfg = config::loader::load_config(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    observability::init_tracing_with_level(&cfg.logging.level);

    // Commands that never touch the store.
    match &cli.command {
        Commands::Config => {
            print!("{}", commands::admin::show_config(&cfg)?);
            return Ok(());
        }
        Commands::Key(args) => {
            return print_value(&commands::inspect::explain_key(&args.raw)?, format);
        }
        _ => {}
    }

    if !cfg.redis.enabled {
        eprintln!(
            "{} redis.enabled is false; inspecting an empty in-process store",
            "!".yellow()
        );
    }
    let store = connect_store(&cfg.redis)
        .await
        .context("failed to connect to the cache store")?;

    match &cli.command {
        Commands::Ping => {
            print_value(&commands::admin::ping(&store).await?, format)?;
        }
        Commands::Get(args) => {
            let key = EntityKey::new(args.entity_type, args.id);
            print_value(&commands::inspect::get(&store, key).await?, format)?;
        }
        Commands::Count(args) => {
            let key = EntityKey::new(args.entity.entity_type, args.entity.id);
            print_value(
                &commands::inspect::count(&store, key, args.related).await?,
                format,
            )?;
        }
        Commands::Relations(args) => {
            let key = EntityKey::new(args.entity.entity_type, args.entity.id);
            print_value(
                &commands::inspect::relations(&store, key, args.related).await?,
                format,
            )?;
        }
        Commands::Evict(args) => {
            let key = EntityKey::new(args.entity_type, args.id);
            let purged = commands::admin::evict(&store, key).await?;
            print_success(&format!("Evicted {key} ({purged} entities purged)"));
        }
        Commands::Config | Commands::Key(_) => {}
    }

    Ok(())
}
