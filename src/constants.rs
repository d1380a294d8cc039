// Constants module - centralized default values for configuration
//
// Defaults used by the config layer and the pipeline components. Keeping them
// here avoids magic numbers scattered across modules.

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

/// Accepted connections per CPU core before the admission limit kicks in
pub const CONNECTIONS_PER_CORE: usize = 20;

/// Seconds suggested to clients in `Retry-After` when the admission limit is hit
pub const RETRY_AFTER_SECS: u64 = 5;

// =============================================================================
// Storage defaults
// =============================================================================

/// Default root directory of the filesystem backend
pub const DEFAULT_STORAGE_ROOT: &str = "./storage";

/// Default region reported to S3-compatible object stores
pub const DEFAULT_OBJECT_STORE_REGION: &str = "us-east-1";

// =============================================================================
// Cache defaults
// =============================================================================

/// Default cache directory
pub const DEFAULT_CACHE_DIR: &str = "./temp";

/// Extension of cache artifacts, distinguishing them from originals
pub const CACHE_FILE_EXTENSION: &str = "cache";

/// Extension of in-progress cache writes
pub const TEMP_FILE_EXTENSION: &str = "tmp";

/// Default time-to-live of a cache artifact, in hours
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Default period between eviction sweeps, in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Default delay before the first eviction sweep, in seconds
pub const DEFAULT_SWEEP_INITIAL_DELAY_SECS: u64 = 60;

// =============================================================================
// Encoding defaults
// =============================================================================

/// JPEG quality used for every encoded artifact
pub const JPEG_QUALITY: u8 = 90;

// =============================================================================
// Marker defaults
// =============================================================================

/// Default font size of marker labels, in pixels
pub const DEFAULT_MARKER_FONT_SIZE: f32 = 16.0;

/// Vertical offset of the label above a plain marker's center
pub const MARKER_LABEL_OFFSET: f32 = 7.0;

/// Vertical offset of the label above a directional marker's center
pub const MARKER_VIEW_LABEL_OFFSET: f32 = 2.0;

