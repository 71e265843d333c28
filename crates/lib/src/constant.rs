pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

// Batching
pub const DEFAULT_ACCOUNTS_PER_TRANSACTION: usize = 20;
// A serialized transaction must fit in one packet. A close batch that mixes both token
// programs takes 283 + 39 * n bytes on the wire, so 24 closes is the most that fits.
pub const PACKET_DATA_SIZE: usize = 1232;
pub const MAX_ACCOUNTS_PER_TRANSACTION: usize = 24;

// Compute budget
pub const DEFAULT_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS: u64 = 1000;
pub const CLOSE_ACCOUNT_CU: u32 = 3000;
pub const ADD_COMPUTE_UNIT_PRICE_CU: u32 = 150;
pub const ADD_COMPUTE_UNIT_LIMIT_CU: u32 = 150;

// Index of SetComputeUnitLimit in every close transaction, carries the tracking reference
pub const COMPUTE_UNIT_LIMIT_IX_INDEX: usize = 1;

// Confirmation polling
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 10_000;

// Off-chain attribution marker appended to the compute-unit-limit instruction
pub const DEFAULT_TRACKING_ADDRESS: &str = "21yD9YfPjY8R6DP95wDyEJrrCtmRtL5yFxYnEvJjGfY3";

// Metadata
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown token";
pub const DAS_MAX_BATCH_SIZE: usize = 1000;
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 15;

// Explorer
pub const EXPLORER_TOKEN_URL: &str = "https://solscan.io/token";

// Files
pub const DEFAULT_CONFIG_FILE: &str = "reclaim.toml";
pub const DEFAULT_AUDIT_FILE: &str = "reclaim_audit.csv";

// User-facing messages
pub const EMPTY_SELECTION_MESSAGE: &str = "Please choose at least one token account to close first!";
pub const CONFIRMED_MESSAGE: &str = "Success!";
pub const TIMED_OUT_MESSAGE: &str = "Tx timed-out. Try again";
