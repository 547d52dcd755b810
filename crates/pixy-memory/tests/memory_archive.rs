use std::fs;

use chrono::NaiveDate;
use pixy_memory::{is_daily_file_name, MemoryArchive, SearchQuery};
use tempfile::tempdir;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn archive_with_notes(notes: &[(&str, &str)]) -> (tempfile::TempDir, MemoryArchive) {
    let dir = tempdir().expect("tempdir");
    let archive = MemoryArchive::open(dir.path()).expect("archive should open");
    for (name, content) in notes {
        fs::write(archive.memory_dir().join(name), content).expect("write note");
    }
    (dir, archive)
}

#[test]
fn open_creates_memory_dir_and_paths_are_date_based() {
    let dir = tempdir().expect("tempdir");
    let archive = MemoryArchive::open(dir.path()).expect("archive should open");

    assert!(dir.path().join("memory").is_dir());
    assert_eq!(
        archive.daily_path(date(2024, 3, 1)),
        dir.path().join("memory/2024-03-01.md")
    );
    assert_eq!(archive.long_term_path(), dir.path().join("memory/MEMORY.md"));
    let today = MemoryArchive::today().format("%Y-%m-%d").to_string();
    assert_eq!(
        archive.today_path(),
        dir.path().join("memory").join(format!("{today}.md"))
    );
}

#[test]
fn missing_notes_read_as_empty() {
    let (_dir, archive) = archive_with_notes(&[]);
    assert_eq!(archive.read_long_term().expect("read"), "");
    assert_eq!(archive.read_daily(date(2020, 1, 1)).expect("read"), "");
    assert_eq!(archive.read_today().expect("read"), "");
    assert_eq!(archive.context_snapshot().expect("snapshot"), "");
}

#[test]
fn missing_directory_lists_nothing() {
    let dir = tempdir().expect("tempdir");
    let archive = MemoryArchive::new(dir.path().join("does-not-exist"));
    assert!(archive.list_daily_files().expect("list").is_empty());
    assert!(archive
        .search_daily(&SearchQuery::keywords(vec!["x"], 10))
        .is_empty());
}

#[test]
fn list_daily_files_is_newest_first_and_ignores_other_files() {
    let (_dir, archive) = archive_with_notes(&[
        ("2024-01-15.md", "a"),
        ("2024-03-01.md", "b"),
        ("2023-12-31.md", "c"),
        ("MEMORY.md", "long term"),
        ("notes.md", "x"),
        ("2024-3-1.md", "x"),
        ("2024-03-01.md.bak", "x"),
        ("2024-03-02.txt", "x"),
    ]);
    fs::create_dir(archive.memory_dir().join("2024-05-05.md")).expect("dir named like a note");

    let names = |archive: &MemoryArchive| {
        archive
            .list_daily_files()
            .expect("list")
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
    };

    let first = names(&archive);
    assert_eq!(first, vec!["2024-03-01.md", "2024-01-15.md", "2023-12-31.md"]);
    assert_eq!(names(&archive), first);
}

#[test]
fn daily_file_name_pattern_is_exact() {
    assert!(is_daily_file_name("2024-03-01.md"));
    assert!(!is_daily_file_name("2024-03-01.md.tmp"));
    assert!(!is_daily_file_name("x2024-03-01.md"));
    assert!(!is_daily_file_name("MEMORY.md"));
}

#[test]
fn context_snapshot_labels_long_term_and_today() {
    let (_dir, archive) = archive_with_notes(&[("MEMORY.md", "## Preferences\n- tea")]);
    assert_eq!(
        archive.context_snapshot().expect("snapshot"),
        "## Long-term Memory\n## Preferences\n- tea"
    );

    fs::write(archive.today_path(), "- [09:00-09:10] standup").expect("write today");
    assert_eq!(
        archive.context_snapshot().expect("snapshot"),
        "## Long-term Memory\n## Preferences\n- tea\n\n## Today's Notes\n- [09:00-09:10] standup"
    );

    fs::remove_file(archive.long_term_path()).expect("remove long term");
    assert_eq!(
        archive.context_snapshot().expect("snapshot"),
        "## Today's Notes\n- [09:00-09:10] standup"
    );
}

#[test]
fn append_daily_writes_header_once() {
    let (_dir, archive) = archive_with_notes(&[]);
    let day = date(2024, 3, 1);

    let path = archive
        .append_daily(day, "- [09:00-09:10] first\n")
        .expect("append");
    archive.append_daily(day, "- [10:00-10:05] second").expect("append");

    assert_eq!(path, archive.daily_path(day));
    assert_eq!(
        archive.read_daily(day).expect("read"),
        "# 2024-03-01\n\n- [09:00-09:10] first\n- [10:00-10:05] second\n"
    );
}

#[test]
fn search_returns_newest_file_first_in_line_order() {
    let (_dir, archive) = archive_with_notes(&[
        ("2024-01-01.md", "# 2024-01-01\n- played volleyball\n"),
        ("2024-02-01.md", "- volleyball practice   \n- lunch\n- more Volleyball\n"),
    ]);

    let result = archive.search_daily(&SearchQuery::keywords(vec!["volleyball"], 10));
    let hits = result
        .hits
        .iter()
        .map(|hit| (hit.file_name.as_str(), hit.line.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        hits,
        vec![
            ("2024-02-01.md", "- volleyball practice"),
            ("2024-02-01.md", "- more Volleyball"),
            ("2024-01-01.md", "- played volleyball"),
        ]
    );
    assert_eq!(result.files_available, 2);
}

#[test]
fn search_cap_returns_first_k_hits_in_order() {
    let lines = (1..=8).map(|index| format!("- note {index}")).collect::<Vec<_>>();
    let newer = lines[..5].join("\n");
    let older = lines[5..].join("\n");
    let (_dir, archive) = archive_with_notes(&[
        ("2024-01-02.md", newer.as_str()),
        ("2024-01-01.md", older.as_str()),
    ]);

    let all = archive.search_daily(&SearchQuery::keywords(vec!["note"], 50));
    assert_eq!(all.len(), 8);

    for cap in [1usize, 3, 5, 6, 8] {
        let capped = archive.search_daily(&SearchQuery::keywords(vec!["note"], cap));
        assert_eq!(capped.len(), cap.min(8));
        assert_eq!(capped.hits[..], all.hits[..cap.min(8)]);
    }
}

#[test]
fn a_line_matching_several_terms_is_reported_once() {
    let (_dir, archive) = archive_with_notes(&[("2024-01-01.md", "tea and coffee\ncoffee only\n")]);
    let query = SearchQuery::new(vec!["tea", "coffee"], vec!["(tea|coffee)"], 10);
    let result = archive.search_daily(&query);
    let lines = result.hits.iter().map(|hit| hit.line.as_str()).collect::<Vec<_>>();
    assert_eq!(lines, vec!["tea and coffee", "coffee only"]);
}

#[test]
fn unsafe_patterns_are_dropped_and_safe_ones_still_match() {
    let (_dir, archive) = archive_with_notes(&[("2024-01-01.md", "aaaa\nbasketball game\n")]);

    let only_unsafe = SearchQuery::new(Vec::<String>::new(), vec!["(a+)+"], 10);
    let result = archive.search_daily(&only_unsafe);
    assert!(result.is_empty());
    assert_eq!(result.files_available, 1);

    let mixed = SearchQuery::new(Vec::<String>::new(), vec!["(a+)+", "BASKET\\w+"], 10);
    let result = archive.search_daily(&mixed);
    assert_eq!(result.len(), 1);
    assert_eq!(result.hits[0].line, "basketball game");
}

#[test]
fn non_utf8_bytes_do_not_hide_the_rest_of_a_file() {
    let (_dir, archive) = archive_with_notes(&[]);
    fs::write(
        archive.memory_dir().join("2024-01-01.md"),
        b"bad \xff\xfe bytes\nvolleyball later\n",
    )
    .expect("write");

    let result = archive.search_daily(&SearchQuery::keywords(vec!["volleyball"], 10));
    assert_eq!(result.len(), 1);
    assert_eq!(result.hits[0].line, "volleyball later");
}

#[test]
fn unlistable_memory_dir_is_reported_apart_from_an_empty_archive() {
    let (_dir, archive) = archive_with_notes(&[]);
    fs::remove_dir(archive.memory_dir()).expect("remove memory dir");
    fs::write(archive.memory_dir(), "not a directory").expect("write file in its place");

    assert!(archive.list_daily_files().is_err());
    let result = archive.search_daily(&SearchQuery::new(["lunch"], Vec::<String>::new(), 5));
    assert!(result.hits.is_empty());
    assert_eq!(result.files_available, 0);
    assert!(result.listing_error.is_some());

    fs::remove_file(archive.memory_dir()).expect("remove file");
    let result = archive.search_daily(&SearchQuery::new(["lunch"], Vec::<String>::new(), 5));
    assert_eq!(result.listing_error, None);
}
