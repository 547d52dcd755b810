//! Persistent memory for a tool-using agent: a date-based note archive,
//! the `memory_search` agent tool, and consolidation of conversation turns
//! into notes through a bounded tool-calling loop.

mod consolidator;
pub mod memory;
mod memory_tool;
mod tools;

pub use consolidator::{
    format_turns, time_range, ConsolidationOutcome, ConsolidatorConfig, ConversationTurn,
    MemoryConsolidator,
};
pub use memory::{
    is_daily_file_name, ArchiveError, ConfigError, LogConfig, MatchStrategy, MatcherSet,
    MemoryArchive, MemoryConfig, PixyMemoryToml, RegexSafetyValidator, SearchHit, SearchQuery,
    SearchResult, UnsafePattern,
};
pub use memory_tool::{create_memory_search_tool, MemorySearchTool, MEMORY_SEARCH_TOOL_NAME};
pub use tools::{
    create_edit_file_tool, create_memory_file_tools, create_read_file_tool,
    create_write_file_tool,
};
