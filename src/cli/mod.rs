//! Command-line interface for weekboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands lives in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::backend::HttpBackend;
use crate::board::Board;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::Day;
use crate::output::OutputOptions;
use crate::store::TaskStore;
use crate::sync::SyncCoordinator;

mod edit;
mod moves;
mod tasks;

/// weekboard - week planner board client
///
/// Lists, reorders, archives and edits the tasks of a week plan. Changes are
/// applied locally first and then synced to the planner API.
#[derive(Parser, Debug)]
#[command(name = "weekboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to ./.weekboard.toml, then the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Planner API base URL
    #[arg(long, global = true, env = "WEEKBOARD_URL")]
    pub url: Option<String>,

    /// Bearer token for the planner API
    #[arg(long, global = true, env = "WEEKBOARD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tasks of a week plan
    Tasks {
        /// Week plan id
        #[arg(long)]
        week: String,

        /// Only this day (1 = Monday .. 7 = Sunday)
        #[arg(long)]
        day: Option<u8>,
    },

    /// List archived tasks
    Archived,

    /// List categories with planned and actual time
    Categories,

    /// Move a task within or across days
    Move {
        /// Task id
        task: String,

        /// Week plan id
        #[arg(long)]
        week: String,

        /// Destination day (1 = Monday .. 7 = Sunday)
        #[arg(long)]
        day: u8,

        /// Task to drop onto; omit to append to the day
        #[arg(long)]
        target: Option<String>,
    },

    /// Move a task to the archive
    Archive {
        /// Task id
        task: String,

        /// Week plan id
        #[arg(long)]
        week: String,

        /// Why the task was archived
        #[arg(long)]
        reason: Option<String>,
    },

    /// Bring an archived task back onto a day
    Unarchive {
        /// Task id
        task: String,

        /// Week plan id
        #[arg(long)]
        week: String,

        /// Destination day (1 = Monday .. 7 = Sunday)
        #[arg(long)]
        day: u8,

        /// Task to drop onto; omit to append to the day
        #[arg(long)]
        target: Option<String>,
    },

    /// Create a task at the end of a day
    Create {
        /// Week plan id
        #[arg(long)]
        week: String,

        /// Day (1 = Monday .. 7 = Sunday)
        #[arg(long)]
        day: u8,

        /// Task title
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Priority: high, medium, low
        #[arg(long)]
        priority: Option<String>,

        /// Planned duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Category id
        #[arg(long)]
        category: Option<String>,
    },

    /// Edit task fields
    Update {
        /// Task id
        task: String,

        /// Week plan id
        #[arg(long)]
        week: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Priority: high, medium, low
        #[arg(long)]
        priority: Option<String>,

        /// Status: todo, in_progress, completed
        #[arg(long)]
        status: Option<String>,

        /// Planned duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Category id
        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task id
        task: String,

        /// Week plan id
        #[arg(long)]
        week: String,
    },
}

/// Resolved settings shared by every command.
pub struct CommandContext {
    pub config: Config,
    pub output: OutputOptions,
}

impl CommandContext {
    pub fn coordinator(&self) -> Result<SyncCoordinator> {
        let backend = HttpBackend::new(&self.config.backend)?;
        debug!(base_url = backend.base_url(), "backend configured");
        SyncCoordinator::new(
            Arc::new(backend),
            TaskStore::new(),
            self.config.sync.debounce(),
        )
    }

    pub async fn open_board(&self, week_id: &str) -> Result<Board> {
        let board = Board::open(self.coordinator()?, week_id).await?;
        Ok(board.with_step(self.config.board.position_step))
    }
}

/// Wait for the board's calls and surface any that failed.
pub(crate) async fn settle(board: &Board) -> Result<()> {
    board.settle().await;
    let failures = board.coordinator().take_failures();
    if failures.is_empty() {
        return Ok(());
    }
    let message = failures
        .iter()
        .map(|failure| format!("{} {}: {}", failure.op, failure.task_id, failure.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::SyncFailed(message))
}

pub(crate) fn parse_day(value: u8) -> Result<Day> {
    Day::try_from(value)
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.execute())
    }

    async fn execute(self) -> Result<()> {
        let cwd = std::env::current_dir()?;
        let mut config = Config::resolve(self.config.as_deref(), &cwd)?;
        if let Some(url) = self.url {
            config.backend.base_url = url;
        }
        if let Some(token) = self.token {
            config.backend.token = Some(token);
        }
        config.validate()?;

        let ctx = CommandContext {
            config,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        };

        match self.command {
            Commands::Tasks { week, day } => {
                tasks::run_list(&ctx, tasks::ListOptions { week, day }).await
            }
            Commands::Archived => tasks::run_archived(&ctx).await,
            Commands::Categories => tasks::run_categories(&ctx).await,
            Commands::Move {
                task,
                week,
                day,
                target,
            } => {
                moves::run_move(
                    &ctx,
                    moves::MoveOptions {
                        task,
                        week,
                        day,
                        target,
                        unarchive: false,
                    },
                )
                .await
            }
            Commands::Unarchive {
                task,
                week,
                day,
                target,
            } => {
                moves::run_move(
                    &ctx,
                    moves::MoveOptions {
                        task,
                        week,
                        day,
                        target,
                        unarchive: true,
                    },
                )
                .await
            }
            Commands::Archive { task, week, reason } => {
                moves::run_archive(&ctx, moves::ArchiveOptions { task, week, reason }).await
            }
            Commands::Create {
                week,
                day,
                title,
                description,
                priority,
                duration,
                category,
            } => {
                edit::run_create(
                    &ctx,
                    edit::CreateOptions {
                        week,
                        day,
                        title,
                        description,
                        priority,
                        duration,
                        category,
                    },
                )
                .await
            }
            Commands::Update {
                task,
                week,
                title,
                description,
                priority,
                status,
                duration,
                category,
            } => {
                edit::run_update(
                    &ctx,
                    edit::UpdateOptions {
                        task,
                        week,
                        title,
                        description,
                        priority,
                        status,
                        duration,
                        category,
                    },
                )
                .await
            }
            Commands::Delete { task, week } => {
                edit::run_delete(&ctx, edit::DeleteOptions { task, week }).await
            }
        }
    }
}
