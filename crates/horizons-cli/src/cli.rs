use clap::{Parser, Subcommand, ValueEnum};
use horizons_core::{EntityId, EntityType};

#[derive(Parser)]
#[command(name = "horizons-cache")]
#[command(about = "Inspect and evict Horizons entity cache state")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./horizons.toml when present)
    #[arg(short, long, global = true, env = "HORIZONS_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the cache store answers
    Ping,
    /// Show the cached record of an entity with its edges
    Get(EntityArgs),
    /// Show an access counter
    Count(CountArgs),
    /// List the members of a relation set
    Relations(RelationsArgs),
    /// Delete an entity and its cascade closure from the cache
    Evict(EntityArgs),
    /// Parse a raw cache key and explain what it holds
    Key(KeyArgs),
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args)]
pub struct EntityArgs {
    /// Entity type (topic, category, tag, translation, topic-translation)
    pub entity_type: EntityType,
    /// Entity id
    pub id: EntityId,
}

#[derive(clap::Args)]
pub struct CountArgs {
    #[command(flatten)]
    pub entity: EntityArgs,
    /// Count accesses to this relation collection instead of the entity
    #[arg(long)]
    pub related: Option<EntityType>,
}

#[derive(clap::Args)]
pub struct RelationsArgs {
    #[command(flatten)]
    pub entity: EntityArgs,
    /// Related entity type
    pub related: EntityType,
}

#[derive(clap::Args)]
pub struct KeyArgs {
    /// Raw key (e.g. topic:1:tag:count)
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_with_related() {
        let cli = Cli::try_parse_from([
            "horizons-cache",
            "count",
            "tag",
            "7",
            "--related",
            "topic",
        ])
        .unwrap();
        match cli.command {
            Commands::Count(args) => {
                assert_eq!(args.entity.entity_type, EntityType::Tag);
                assert_eq!(args.entity.id, 7);
                assert_eq!(args.related, Some(EntityType::Topic));
            }
            _ => panic!("expected count"),
        }
    }

    #[test]
    fn test_unknown_entity_type_is_rejected() {
        assert!(Cli::try_parse_from(["horizons-cache", "get", "user", "1"]).is_err());
    }
}
