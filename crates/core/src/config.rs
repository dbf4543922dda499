//! Global configuration constants for the SNP wizard.
//!
//! All paging caps, timeouts, input validation limits, and server defaults are defined here.
//! These are compile-time constants; runtime configuration is handled via CLI arguments
//! and environment variables in the server's `main.rs`.

/// Row cap used by the count probe.
///
/// The count endpoint never counts past this value; clients render anything above
/// [`COUNT_DISPLAY_CAP`] as "more than 1,000".
pub const COUNT_PROBE_LIMIT: u64 = 1001;

/// Largest count shown as an exact number.
pub const COUNT_DISPLAY_CAP: u64 = 1000;

/// Default statement timeout for count probes in milliseconds.
pub const DEFAULT_COUNT_TIMEOUT_MS: u64 = 15_000;

/// Default statement timeout for page queries in milliseconds. 0 = none.
pub const DEFAULT_PAGE_TIMEOUT_MS: u64 = 0;

/// Default page size requested by clients.
pub const DEFAULT_PAGE_LIMIT: u64 = 10_000;

/// Sentinel accepted in the `limit` parameter for "no limit".
pub const UNBOUNDED_LIMIT: i64 = -1;

/// Default client-side transport timeout for page requests (10 minutes).
pub const DEFAULT_PAGE_TRANSPORT_TIMEOUT_SECS: u64 = 600;

/// Default debounce applied by client sessions before issuing a count request.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Maximum number of symbols accepted in a multi-symbol search.
pub const MAX_SYMBOLS: usize = 1_000;

/// Maximum length of a single free-text parameter (symbol, chromosome, rs-number).
pub const MAX_TEXT_PARAM_LEN: usize = 256;

/// Separator used when a variant carries several consequences.
pub const CONSEQUENCE_SEPARATOR: &str = "&";

/// Column holding the reference allele in every variant table.
pub const REFERENCE_COLUMN: &str = "ref";

/// Header written in place of the reference column in exported files.
pub const EXPORT_REFERENCE_HEADER: &str = "reference/alternatives";

/// File name used for exports when the search has no better label.
pub const DEFAULT_EXPORT_NAME: &str = "mouse_snp_wizard";

/// Worksheet name of spreadsheet exports.
pub const EXPORT_SHEET_NAME: &str = "variants";

/// Rows per worksheet, header included.
pub const MAX_SHEET_ROWS: usize = 1_048_576;

/// Columns per worksheet.
pub const MAX_SHEET_COLUMNS: usize = 16_384;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default size of the database connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Default number of attempts when connecting to the database at startup.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;

/// Initial delay between connection attempts in milliseconds. Doubles per attempt.
pub const CONNECT_BACKOFF_INITIAL_MS: u64 = 500;

/// Upper bound for the delay between connection attempts in milliseconds.
pub const CONNECT_BACKOFF_MAX_MS: u64 = 5_000;

/// Per-request timeout in seconds. Sized for unbounded page loads.
pub const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Default path of the strain vocabulary file.
pub const DEFAULT_STRAINS_FILE: &str = "./data/strains.json";

/// Default path of the strain reference order file.
pub const DEFAULT_STRAIN_ORDER_FILE: &str = "./data/DOIds.json";

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
