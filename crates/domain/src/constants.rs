//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! application.

/// Scope required on an ESI token to read a character calendar.
pub const CALENDAR_READ_SCOPE: &str = "esi-calendar.read_calendar_events.v1";

/// Maximum number of sign-ups accepted for a single local event.
pub const MAX_EVENT_MEMBERS: usize = 10;

/// Maximum length of a local event title.
pub const MAX_EVENT_TITLE_LENGTH: usize = 200;

// Remote access defaults
pub const DEFAULT_ESI_BASE_URL: &str = "https://esi.evetech.net/latest";
pub const DEFAULT_SSO_TOKEN_URL: &str = "https://login.eveonline.com/v2/oauth/token";
pub const DEFAULT_USER_AGENT: &str = "opcal/0.1";
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

// Sync scheduling defaults
pub const DEFAULT_SYNC_CRON: &str = "0 */15 * * * *"; // every 15 minutes
pub const DEFAULT_SYNC_JOB_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_CONCURRENT_OWNERS: usize = 4;

// Storage defaults
pub const DEFAULT_DB_PATH: &str = "opcal.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;
