//! Cache management commands

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use serde::Deserialize;
use tracing::{error, info};

use super::Command;
use crate::config::AppConfig;
use crate::domain::cache::TagSet;
use crate::domain::comment::Comment;
use crate::domain::task::Task;
use crate::infrastructure::cache::{CacheConfig, CacheFactory};
use crate::infrastructure::comment::InMemoryCommentRepository;
use crate::infrastructure::logging;
use crate::infrastructure::services::{CacheService, CacheWarmer, TaskCachePolicy};
use crate::infrastructure::task::InMemoryTaskRepository;

#[derive(Debug, Args)]
pub struct WarmArgs {
    /// JSON snapshot `{"tasks": [...], "comments": [...]}` to load before warming
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Only remove keys matching this glob pattern (`*`, `?`)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Confirm flushing the whole cache
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ClearTagsArgs {
    /// Tags to invalidate, repeated or comma separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

/// Repository contents loaded by `warm --seed`
#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Snapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;

        serde_json::from_str(&data)
            .with_context(|| format!("Invalid seed file {}", path.display()))
    }
}

/// Runs a cache command against the configured store
///
/// Every failure is reported on stderr and turned into a failing exit status.
pub async fn run(command: Command) -> ExitCode {
    match execute(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Cache command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Command) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    let cache_config = config.cache.cache_config()?;
    ensure_shared(&cache_config)?;
    let cache = CacheFactory::new().create(&cache_config).await?;

    let mut out = std::io::stdout();

    match command {
        Command::Stats => stats(&cache, &mut out).await,
        Command::Warm(args) => warm(Arc::new(cache), &args, &mut out).await,
        Command::Clear(args) => clear(&cache, &args, &mut out).await,
        Command::ClearTags(args) => clear_tags(&cache, &args, &mut out).await,
    }
}

/// Rejects drivers whose entries live only inside this process
///
/// Such a cache would be created empty for the command and dropped on exit,
/// so nothing the command reports or changes reaches the application.
pub fn ensure_shared(config: &CacheConfig) -> anyhow::Result<()> {
    if !config.driver.is_shared() {
        bail!(
            "The {} cache driver is local to each process; set APP__CACHE__DRIVER=redis \
             to manage the application's shared cache",
            config.driver
        );
    }

    Ok(())
}

pub async fn stats(cache: &CacheService, out: &mut impl Write) -> anyhow::Result<()> {
    let stats = cache.stats().await?;

    fn or_na<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
    }

    writeln!(out, "Cache driver: {}", stats.driver)?;
    writeln!(out, "Tag strategy: {}", or_na(stats.tag_strategy.as_deref()))?;
    writeln!(out, "Memory usage: {}", or_na(stats.memory_usage.as_deref()))?;
    writeln!(out, "Total keys:   {}", or_na(stats.total_keys))?;
    writeln!(out, "Hits:         {}", or_na(stats.hits))?;
    writeln!(out, "Misses:       {}", or_na(stats.misses))?;
    writeln!(
        out,
        "Hit ratio:    {}",
        or_na(stats.hit_ratio().map(|ratio| format!("{:.2}%", ratio)))
    )?;

    Ok(())
}

pub async fn warm(
    cache: Arc<CacheService>,
    args: &WarmArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let snapshot = match &args.seed {
        Some(path) => Snapshot::load(path)?,
        None => Snapshot::default(),
    };

    let warmer = CacheWarmer::new(
        Arc::new(InMemoryTaskRepository::with_tasks(snapshot.tasks)),
        Arc::new(InMemoryCommentRepository::with_comments(snapshot.comments)),
        TaskCachePolicy::new(cache),
    );

    let report = warmer.warm().await?;

    writeln!(out, "Warmed {} tasks", report.tasks)?;
    writeln!(out, "Warmed {} task lists", report.task_lists)?;
    writeln!(out, "Warmed {} task comment lists", report.task_comments)?;

    Ok(())
}

pub async fn clear(cache: &CacheService, args: &ClearArgs, out: &mut impl Write) -> anyhow::Result<()> {
    if let Some(pattern) = &args.pattern {
        match cache.forget_by_pattern(pattern).await? {
            Some(removed) => writeln!(out, "Removed {} keys matching '{}'", removed, pattern)?,
            None => writeln!(
                out,
                "The {} store cannot enumerate keys; nothing removed for '{}'",
                cache.store().driver(),
                pattern
            )?,
        }
        return Ok(());
    }

    if !args.yes {
        writeln!(out, "Cache clear cancelled (pass --yes to flush the whole cache)")?;
        return Ok(());
    }

    cache.flush().await?;
    info!("Cache cleared from CLI");
    writeln!(out, "Cache cleared")?;

    Ok(())
}

pub async fn clear_tags(
    cache: &CacheService,
    args: &ClearTagsArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let tags: TagSet = args
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect();

    if tags.is_empty() {
        bail!("No tags given; pass --tags tag1,tag2");
    }

    let removed = cache.forget_by_tags(&tags).await?;
    writeln!(out, "Removed {} entries tagged {}", removed, tags)?;

    Ok(())
}
