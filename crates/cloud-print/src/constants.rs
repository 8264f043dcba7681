//! Cloud print provider defaults

/// Root of the cloud print interface.
pub const DEFAULT_BASE_URL: &str = "https://www.google.com/cloudprint";

/// The campus release-queue printer jobs are sent to.
pub const DEFAULT_PRINTER_ID: &str = "7b30c56e-08f1-e90a-7fc8-ed11099a4a72";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Wait before the first job history poll, in milliseconds.
pub const DEFAULT_POLL_INITIAL_DELAY_MS: u64 = 1_000;

/// Wait before each job history poll, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Job history polls before giving up on confirmation.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 29;
