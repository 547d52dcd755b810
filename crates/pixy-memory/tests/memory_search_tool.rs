use std::fs;
use std::sync::Arc;

use pixy_memory::{create_memory_search_tool, MemoryArchive, MemoryConfig, MemorySearchTool};
use serde_json::json;
use tempfile::{tempdir, TempDir};

fn search_tool(notes: &[(&str, &str)]) -> (TempDir, MemorySearchTool) {
    let dir = tempdir().expect("tempdir");
    let config = MemoryConfig::new(dir.path());
    let archive = MemoryArchive::from_config(&config).expect("archive should open");
    for (name, content) in notes {
        fs::write(archive.memory_dir().join(name), content).expect("write note");
    }
    (dir, MemorySearchTool::new(Arc::new(archive), config))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[test]
fn empty_query_is_reported_before_touching_files() {
    let (_dir, tool) = search_tool(&[]);
    assert_eq!(
        tool.search(Vec::new(), Vec::new(), None),
        "Error: No keywords or regex patterns provided"
    );
    assert_eq!(
        tool.search(strings(&["  "]), strings(&[""]), None),
        "Error: No keywords or regex patterns provided"
    );
}

#[test]
fn empty_archive_reports_no_files() {
    let (_dir, tool) = search_tool(&[("MEMORY.md", "volleyball")]);
    assert_eq!(
        tool.search(strings(&["volleyball"]), Vec::new(), None),
        "No historical memory files found."
    );
}

#[test]
fn no_matches_lists_keywords_or_else_patterns() {
    let (_dir, tool) = search_tool(&[("2024-01-01.md", "- lunch\n")]);
    assert_eq!(
        tool.search(strings(&["chess", "go"]), strings(&["tennis?"]), None),
        "No matches found for: chess, go"
    );
    assert_eq!(
        tool.search(Vec::new(), strings(&["tennis?", "(a+)+"]), None),
        "No matches found for: tennis?, (a+)+"
    );
}

#[test]
fn matches_are_numbered_with_file_names() {
    let (_dir, tool) = search_tool(&[
        ("2024-01-01.md", "- played Volleyball\n"),
        ("2024-02-01.md", "- volleyball practice\n- lunch\n"),
    ]);
    assert_eq!(
        tool.search(strings(&["volleyball"]), Vec::new(), None),
        "Found 2 relevant memories:\n\n1. [2024-02-01.md] - volleyball practice\n2. [2024-01-01.md] - played Volleyball\n"
    );
}

#[test]
fn max_results_is_clamped() {
    let content = (1..=60)
        .map(|index| format!("- item {index}"))
        .collect::<Vec<_>>()
        .join("\n");
    let (_dir, tool) = search_tool(&[("2024-01-01.md", content.as_str())]);

    let count = |output: String| output.lines().filter(|line| line.contains("] - item")).count();
    assert_eq!(count(tool.search(strings(&["item"]), Vec::new(), None)), 10);
    assert_eq!(count(tool.search(strings(&["item"]), Vec::new(), Some(0))), 1);
    assert_eq!(count(tool.search(strings(&["item"]), Vec::new(), Some(3))), 3);
    assert_eq!(count(tool.search(strings(&["item"]), Vec::new(), Some(999))), 50);
}

#[tokio::test]
async fn agent_tool_returns_text_and_match_details() {
    let (_dir, search) = search_tool(&[("2024-01-01.md", "- (volleyball) finals\n- basketball\n")]);
    let tool = create_memory_search_tool(search);
    assert_eq!(tool.name, "memory_search");
    assert_eq!(tool.parameters["properties"]["max_results"]["maximum"], 50);

    let result = tool
        .execute
        .execute(
            "call-1".to_string(),
            json!({ "regex_patterns": ["(volley|basket)ball"], "max_results": 5 }),
        )
        .await
        .expect("memory_search never fails");

    assert!(result.text_content().starts_with("Found 2 relevant memories:"));
    assert_eq!(result.details["count"], 2);
    assert_eq!(result.details["filesSearched"], 1);
    assert_eq!(result.details["matches"][1]["line"], "- basketball");
    assert_eq!(result.details["matches"][0]["file"], "2024-01-01.md");
}

#[tokio::test]
async fn agent_tool_renders_bad_arguments_as_text() {
    let (_dir, search) = search_tool(&[("2024-01-01.md", "x\n")]);
    let tool = create_memory_search_tool(search);

    let result = tool
        .execute
        .execute("call-1".to_string(), json!({ "keywords": "volleyball" }))
        .await
        .expect("memory_search never fails");
    assert_eq!(
        result.text_content(),
        "Error: `keywords` must be an array of strings"
    );

    let result = tool
        .execute
        .execute("call-2".to_string(), json!({}))
        .await
        .expect("memory_search never fails");
    assert_eq!(
        result.text_content(),
        "Error: No keywords or regex patterns provided"
    );
}

#[test]
fn listing_failure_is_not_reported_as_empty_archive() {
    let (_dir, tool) = search_tool(&[]);
    let memory_dir = tool.archive().memory_dir().to_path_buf();
    fs::remove_dir(&memory_dir).expect("remove memory dir");
    fs::write(&memory_dir, "not a directory").expect("write file in its place");

    let text = tool.search(strings(&["volleyball"]), Vec::new(), None);
    assert!(
        text.starts_with("Error: Failed to list memory files:"),
        "unexpected text: {text}"
    );
}
