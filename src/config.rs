// src/config.rs
use crate::api::{BatchSettings, DelaySchedule};
use crate::constants::{
    CHUNKING_THRESHOLD, CONVERSATION_LIST_LIMIT, DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE,
    DEFAULT_CHUNK_SIZE, DEFAULT_COMBINE_ABOVE, DEFAULT_MAX_ATTEMPTS, FLUSH_THRESHOLD,
};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::output::{default_output_dir, Destination, OutputMode, OutputSettings};
use crate::resolver::SessionResolver;
use crate::types::{ProjectId, SessionCookie, ValidationError};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Environment variable holding the session's `Cookie` header.
pub const COOKIE_ENV_VAR: &str = "CHAT_EXPORT_COOKIE";

const MAX_BATCH_SIZE: usize = 50;
const MAX_ATTEMPTS_LIMIT: usize = 10;

/// Parsed and validated command-line input.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Project page URL or project ID (e.g., "https://claude.ai/project/<uuid>")
    pub project: String,

    /// Organization ID (defaults to the lastActiveOrg cookie)
    #[arg(long)]
    pub org_id: Option<String>,

    /// JSON dump of the browser's local/session storage, searched for the organization ID
    #[arg(long)]
    pub storage_snapshot: Option<PathBuf>,

    /// Base URL of the chat platform
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum number of conversations requested from the project listing
    #[arg(long, default_value_t = CONVERSATION_LIST_LIMIT)]
    pub list_limit: u32,

    /// Conversations fetched concurrently
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Conversations per memory chunk in large exports
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Attempts per conversation before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_retries: u32,

    /// Directory for the exported files (defaults to ./project_<id>_export)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// File layout of the export
    #[arg(long, value_enum, default_value_t = OutputMode::Individual)]
    pub output_mode: OutputMode,

    /// With --output-mode auto, exports larger than this become one combined file
    #[arg(long, default_value_t = DEFAULT_COMBINE_ABOVE)]
    pub combine_above: usize,

    /// Pipe mode - print the documents to stdout instead of writing files
    #[arg(short = 'p', long, default_value_t = false)]
    pub pipe: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved pipeline configuration, validated and ready to drive an export.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub project: ProjectId,
    /// Raw project argument, kept for the identifier resolver.
    pub project_input: String,
    pub org_id: Option<String>,
    pub storage_snapshot: Option<serde_json::Value>,
    pub cookie: SessionCookie,
    pub base_url: String,
    pub list_limit: u32,
    pub batching: BatchSettings,
    pub retry: RetryPolicy,
    pub output: OutputSettings,
}

impl PipelineConfig {
    /// Resolves a complete pipeline configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let cookie = std::env::var(COOKIE_ENV_VAR).map_err(|_| {
            AppError::MissingConfiguration(format!(
                "{} environment variable not set (copy the Cookie header of a logged-in browser session)",
                COOKIE_ENV_VAR
            ))
        })?;
        Self::resolve_with_cookie(cli, &cookie)
    }

    /// Same as `resolve`, with the cookie supplied by the caller.
    pub fn resolve_with_cookie(cli: CommandLineInput, cookie: &str) -> Result<Self, AppError> {
        let cookie = SessionCookie::new(cookie)?;
        let project = ProjectId::from_input(&cli.project)?;

        check_bounds(cli.batch_size, 1, MAX_BATCH_SIZE)?;
        check_bounds(cli.max_retries as usize, 1, MAX_ATTEMPTS_LIMIT)?;
        check_bounds(cli.list_limit as usize, 1, CONVERSATION_LIST_LIMIT as usize * 10)?;

        let batching = BatchSettings {
            batch_size: cli.batch_size,
            chunk_size: cli.chunk_size,
            chunk_threshold: CHUNKING_THRESHOLD,
            flush_threshold: FLUSH_THRESHOLD,
            delays: DelaySchedule::default(),
        };
        batching.validate()?;

        let storage_snapshot = match &cli.storage_snapshot {
            Some(path) => Some(read_snapshot(path)?),
            None => None,
        };

        let destination = if cli.pipe {
            Destination::Stdout
        } else {
            Destination::Directory(
                cli.output_dir
                    .clone()
                    .unwrap_or_else(|| default_output_dir(&project)),
            )
        };

        Ok(PipelineConfig {
            project,
            project_input: cli.project,
            org_id: cli.org_id,
            storage_snapshot,
            cookie,
            base_url: cli.base_url,
            list_limit: cli.list_limit,
            batching,
            retry: RetryPolicy::with_max_attempts(cli.max_retries),
            output: OutputSettings {
                destination,
                mode: cli.output_mode,
                combine_above: cli.combine_above,
            },
        })
    }

    /// The production identifier resolver for this configuration.
    pub fn session_resolver(&self) -> SessionResolver {
        SessionResolver::new(self.project_input.clone(), self.cookie.clone())
            .with_organization(self.org_id.clone())
            .with_storage_snapshot(self.storage_snapshot.clone())
    }
}

fn check_bounds(value: usize, min: usize, max: usize) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfBounds { value, min, max });
    }
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<serde_json::Value, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::MissingConfiguration(format!(
            "Could not read storage snapshot {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        AppError::MissingConfiguration(format!(
            "Storage snapshot {} is not valid JSON: {}",
            path.display(),
            e
        ))
    })
}
