//! CLI module for taskboard
//!
//! Cache management subcommands:
//! - `stats`: driver diagnostics
//! - `warm`: precompute task and comment entries
//! - `clear`: flush the cache or remove keys by pattern
//! - `clear-tags`: invalidate entries by tag

pub mod cache;

use clap::{Parser, Subcommand};

/// Taskboard - task management cache tooling
#[derive(Debug, Parser)]
#[command(name = "taskboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show cache statistics
    Stats,

    /// Warm up the cache with tasks, task lists and comments
    Warm(cache::WarmArgs),

    /// Flush the cache, or only keys matching a pattern
    Clear(cache::ClearArgs),

    /// Invalidate cache entries by tag
    ClearTags(cache::ClearTagsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clear_with_pattern() {
        let cli = Cli::try_parse_from(["taskboard", "clear", "--pattern", "app:task_*", "--yes"])
            .unwrap();

        match cli.command {
            Command::Clear(args) => {
                assert_eq!(args.pattern.as_deref(), Some("app:task_*"));
                assert!(args.yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_clear_tags() {
        let cli = Cli::try_parse_from(["taskboard", "clear-tags", "--tags", "tasks,user_1", "--tags", "dashboard"])
            .unwrap();

        match cli.command {
            Command::ClearTags(args) => assert_eq!(args.tags, vec!["tasks", "user_1", "dashboard"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_warm_seed() {
        let cli = Cli::try_parse_from(["taskboard", "warm", "--seed", "seed.json"]).unwrap();

        match cli.command {
            Command::Warm(args) => {
                assert_eq!(args.seed.as_deref(), Some(std::path::Path::new("seed.json")))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["taskboard", "serve"]).is_err());
    }
}
