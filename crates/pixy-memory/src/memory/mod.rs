//! Date-based note archive with safe line-level search.
//!
//! Notes live under `<workspace>/memory`: one `YYYY-MM-DD.md` file per day
//! plus a single long-term `MEMORY.md`.

pub mod archive;
pub mod config;
pub mod regex_safety;
pub mod search;

pub use archive::{is_daily_file_name, ArchiveError, MemoryArchive};
pub use config::{
    ConfigError, LogConfig, MemoryConfig, PixyMemoryToml, LONG_TERM_FILE_NAME, MEMORY_DIR_NAME,
};
pub use regex_safety::{RegexSafetyValidator, UnsafePattern};
pub use search::{MatchStrategy, MatcherSet, SearchHit, SearchQuery, SearchResult};
