//! Centralized constants for toksync.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "toksync";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "toksync.toml";

/// Readline history filename for the interactive session.
pub const READLINE_HISTORY_FILENAME: &str = "repl_history.txt";

/// Persisted engine state filename (history, language, model type).
pub const STATE_FILENAME: &str = "state.json";

/// Environment variable that overrides `server_url`.
pub const SERVER_URL_ENV: &str = "TOKSYNC_SERVER_URL";

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TOKSYNC_LOG";

// --- Server defaults ---

/// Default origin of the tokenizer service.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:7860";

/// Default path prefix of the request API.
pub const DEFAULT_API_PATH: &str = "/api";

/// Path of the push channel below the API prefix.
pub const WS_PATH: &str = "/ws";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// --- Push channel ---

/// Fixed delay before an automatic reconnection attempt.
pub const RECONNECT_DELAY_MS: u64 = 3000;

/// Automatic reconnection attempts before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

// --- History ---

/// Number of entries the history ring retains.
pub const HISTORY_CAPACITY: usize = 5;

/// Visible characters of text input kept in a history preview.
pub const HISTORY_PREVIEW_CHARS: usize = 20;

// --- File uploads ---

/// File extensions the counting service can parse.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md"];

/// Largest file accepted for upload (20 MiB).
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Shortest model name the catalog accepts.
pub const MIN_MODEL_NAME_LEN: usize = 2;

// --- Observers ---

/// Buffered engine events per subscriber before the slowest one lags.
pub const EVENT_CAPACITY: usize = 64;
