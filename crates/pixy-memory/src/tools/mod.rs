mod common;
mod edit;
mod read;
mod write;

use std::path::Path;

use pixy_agent_core::AgentTool;

pub use edit::create_edit_file_tool;
pub use read::create_read_file_tool;
pub use write::create_write_file_tool;

/// File tools handed to the consolidation agent. Every path they accept
/// is confined to `root`.
pub fn create_memory_file_tools(root: impl AsRef<Path>) -> Vec<AgentTool> {
    let root = root.as_ref().to_path_buf();
    vec![
        create_read_file_tool(&root),
        create_write_file_tool(&root),
        create_edit_file_tool(&root),
    ]
}
