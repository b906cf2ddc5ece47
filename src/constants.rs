// src/constants.rs
//! Domain constants that define the operational boundaries of the exporter.
//!
//! Each constant is named for the domain concept it constrains. Reading them
//! top to bottom tells the story of an export: how many conversations are in
//! flight, how long we pause between waves, when we switch to chunking and
//! when chunks stop being kept in memory.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Remote API boundaries
// ---------------------------------------------------------------------------

/// Default host of the chat platform.
pub const DEFAULT_BASE_URL: &str = "https://claude.ai";

/// How many conversation summaries we request from the list endpoint.
///
/// The endpoint is paged but a project never comes close to this, so a
/// single request with offset 0 is enough.
pub const CONVERSATION_LIST_LIMIT: u32 = 1000;

// ---------------------------------------------------------------------------
// Fetch pipeline
// ---------------------------------------------------------------------------

/// Conversations fetched concurrently in one batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Conversations grouped into one memory chunk in large exports.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Above this many conversations the scheduler hands over to chunking.
pub const CHUNKING_THRESHOLD: usize = 100;

/// Above this many conversations finished chunks are flushed to disk and
/// dropped instead of being kept for a final combined write.
pub const FLUSH_THRESHOLD: usize = 200;

/// Pause between batches for exports of up to 50 conversations.
pub const SMALL_EXPORT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Exports up to this size use the small-export pause.
pub const SMALL_EXPORT_LIMIT: usize = 50;

/// Pause between batches for exports of 51 to 200 conversations.
pub const MEDIUM_EXPORT_BATCH_DELAY: Duration = Duration::from_millis(750);

/// Exports up to this size use the medium-export pause.
pub const MEDIUM_EXPORT_LIMIT: usize = 200;

/// Pause between batches for anything larger.
pub const LARGE_EXPORT_BATCH_DELAY: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Total attempts per conversation, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Unit of both backoff schedules.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Ceiling for the exponential rate-limit backoff.
pub const RETRY_MAX_DELAY: Duration = Duration::from_millis(10_000);

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// With `--output-mode auto`, up to this many conversations get their own file.
pub const DEFAULT_COMBINE_ABOVE: usize = 20;

/// Longest filename stem derived from a conversation title.
pub const FILENAME_MAX_CHARS: usize = 100;

/// Characters of attachment text quoted in the Markdown export.
pub const ATTACHMENT_PREVIEW_CHARS: usize = 500;

/// Estimated characters per message, used to pre-allocate output strings.
pub const CHARS_PER_MESSAGE_ESTIMATE: usize = 1024;
