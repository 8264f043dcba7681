//! Portal layout constants
//!
//! The portal serves two independent applications under one host: the
//! client application (budget) and the release queue manager (queue).
//! Each keeps its own session and token.

/// Default portal host.
pub const DEFAULT_BASE_URL: &str = "https://uniflow.calvin.edu/";

/// Sub-path of the budget application.
pub const CLIENT_PATH: &str = "pwclient/";

/// Sub-path of the release queue manager.
pub const RQM_PATH: &str = "pwrqm/";

/// Sign-in endpoint, relative to either sub-path.
pub const AUTH_PAGE: &str = "getuserid.asp";

/// Budget page, relative to `CLIENT_PATH`.
pub const PRINT_BUDGET_PAGE: &str = "dispBudget.asp";

/// Queue page, relative to `RQM_PATH`. Also receives deletion posts.
pub const PRINT_QUEUE_PAGE: &str = "dispObjects.asp";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
