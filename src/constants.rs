use std::time::Duration;

/// Maximum number of targets a bulk command accepts
pub const MAX_BULK_TARGETS: usize = 5;

/// Maximum number of autocomplete suggestions Discord accepts
pub const MAX_SUGGESTIONS: usize = 25;

/// Messages in a log channel older than this are deleted by the retention sweep
pub const LOG_RETENTION_DAYS: i64 = 7;

/// Interval between two retention sweeps
pub const RETENTION_SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Messages older than this can no longer be bulk deleted
pub const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// Maximum number of messages per bulk delete / history page
pub const MESSAGE_BATCH_SIZE: u8 = 100;

/// Seconds before transient prefix-command errors are removed
pub const TRANSIENT_MESSAGE_SECS: u64 = 8;

/// Shown in logs when an action has no reason
pub const NO_REASON_PLACEHOLDER: &str = "No reason provided";

/// Default location of the per-guild log channel document
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Prefix for legacy text commands
pub const COMMAND_PREFIX: &str = "!";

/// Log directive for the application
pub const LOG_DIRECTIVE: &str = "voicewarden=info";
