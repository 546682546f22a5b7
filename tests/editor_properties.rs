//! LineEditor property tests
//!
//! Every edit is checked against a plain `Vec<String>` model of the file's
//! lines, through the public API only.

use linepatch::{EditorConfig, LineEditor, SearchEngine};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    config: EditorConfig,
    file: PathBuf,
}

impl Workspace {
    fn with_content(content: &[u8]) -> Self {
        let dir = TempDir::new().unwrap();
        let config = EditorConfig::in_dir(dir.path());
        let file = dir.path().join("notes.txt");
        fs::write(&file, content).unwrap();
        Self {
            _dir: dir,
            config,
            file,
        }
    }

    fn editor(&self) -> LineEditor {
        LineEditor::new(&self.config)
    }

    fn content(&self) -> Vec<u8> {
        fs::read(&self.file).unwrap()
    }

    fn lines(&self) -> Vec<String> {
        split_lines(&self.content())
    }
}

/// Render `lines` as file content. The last line is left unterminated when
/// asked and when doing so does not change the line count.
fn render(lines: &[String], unterminated: bool) -> Vec<u8> {
    let mut content = Vec::new();
    for line in lines {
        content.extend_from_slice(line.as_bytes());
        content.push(b'\n');
    }
    if unterminated && lines.last().is_some_and(|l| !l.is_empty()) {
        content.pop();
    }
    content
}

fn split_lines(content: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(content);
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if text.is_empty() || text.ends_with('\n') {
        lines.pop();
    }
    lines
}

fn line_strategy() -> impl Strategy<Value = String> {
    "[a-z ]{0,12}"
}

fn file_strategy() -> impl Strategy<Value = (Vec<String>, bool)> {
    (proptest::collection::vec(line_strategy(), 0..8), any::<bool>())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]

    #[test]
    fn insert_then_delete_restores_lines(
        (lines, unterminated) in file_strategy(),
        text in line_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let original = render(&lines, unterminated);
        let ws = Workspace::with_content(&original);
        let editor = ws.editor();

        let lineno = pick.index(lines.len() + 1) + 1;
        let inserted = editor.insert_at(&ws.file, lineno, &text).unwrap();
        prop_assert_eq!(inserted.lines_after, lines.len() + 1);

        let mut model = lines.clone();
        model.insert(lineno - 1, text.clone());
        prop_assert_eq!(ws.lines(), model);

        let deleted = editor.delete_at(&ws.file, lineno).unwrap();
        prop_assert_eq!(deleted.lines_after, lines.len());
        prop_assert_eq!(ws.lines(), lines.clone());
        if lineno <= lines.len() {
            prop_assert_eq!(ws.content(), original);
        }
    }

    #[test]
    fn append_adds_exactly_one_line(
        (lines, unterminated) in file_strategy(),
        text in "[a-z]{1,12}",
    ) {
        let ws = Workspace::with_content(&render(&lines, unterminated));
        let editor = ws.editor();

        let outcome = editor.append(&ws.file, &text).unwrap();
        prop_assert_eq!(outcome.lines_before, lines.len());
        prop_assert_eq!(outcome.lines_after, lines.len() + 1);
        prop_assert_eq!(editor.count_lines(&ws.file).unwrap(), lines.len() + 1);

        let mut model = lines.clone();
        model.push(text);
        prop_assert_eq!(ws.lines(), model);
    }

    #[test]
    fn replace_keeps_line_count(
        (lines, unterminated) in file_strategy().prop_filter("needs a line", |(l, _)| !l.is_empty()),
        text in line_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let ws = Workspace::with_content(&render(&lines, unterminated));
        let lineno = pick.index(lines.len()) + 1;

        let outcome = ws.editor().replace_at(&ws.file, lineno, &text).unwrap();
        prop_assert_eq!(outcome.lines_after, lines.len());

        let mut model = lines.clone();
        model[lineno - 1] = text;
        prop_assert_eq!(ws.lines(), model);
    }

    #[test]
    fn substitution_without_match_is_byte_identical(
        (lines, unterminated) in file_strategy(),
        key in "[#%]{1,3}",
    ) {
        let original = render(&lines, unterminated);
        let ws = Workspace::with_content(&original);

        let report = ws.editor().replace_substring(&ws.file, &key, "x").unwrap();
        prop_assert_eq!(report.total, 0);
        prop_assert!(report.lines.is_empty());
        prop_assert_eq!(ws.content(), original);
    }

    #[test]
    fn literal_search_counts_every_occurrence(
        (lines, unterminated) in file_strategy(),
        key in "[a-c]{1,2}",
    ) {
        let ws = Workspace::with_content(&render(&lines, unterminated));
        let report = SearchEngine::new(&ws.config).search_literal(&ws.file, &key).unwrap();

        let expected: usize = lines.iter().map(|l| l.matches(key.as_str()).count()).sum();
        prop_assert_eq!(report.total, expected);
        prop_assert_eq!(report.line_count, lines.len());
        for m in &report.matches {
            prop_assert_eq!(&m.text, &lines[m.lineno - 1]);
        }
    }
}

#[test]
fn scenario_insert_in_middle() {
    let ws = Workspace::with_content(b"one\ntwo\nthree\n");
    let outcome = ws.editor().insert_at(&ws.file, 2, "X").unwrap();
    assert_eq!(outcome.lines_after, 4);
    assert_eq!(ws.content(), b"one\nX\ntwo\nthree\n");
}

#[test]
fn scenario_delete_out_of_range_is_rejected() {
    let ws = Workspace::with_content(b"one\ntwo\n");
    let err = ws.editor().delete_at(&ws.file, 5).unwrap_err();
    assert!(err.to_string().contains("out of range"));
    assert_eq!(ws.content(), b"one\ntwo\n");
    assert!(!ws.config.log_path.exists());
}

#[test]
fn scenario_append_to_empty_file() {
    let ws = Workspace::with_content(b"");
    let outcome = ws.editor().append(&ws.file, "first").unwrap();
    assert_eq!(outcome.lines_after, 1);
    assert_eq!(ws.content(), b"first");
}

#[test]
fn scenario_substitute_reports_each_line() {
    let ws = Workspace::with_content(b"aXbXc\nnone\nX\n");
    let report = ws.editor().replace_substring(&ws.file, "X", "--").unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.lines.len(), 2);
    assert_eq!(report.lines[0].after, "a--b--c");
    assert_eq!(report.lines[1].lineno, 3);
    assert_eq!(ws.content(), b"a--b--c\nnone\n--\n");
}

#[test]
fn scenario_pattern_search_is_case_insensitive() {
    let ws = Workspace::with_content(b"Error: disk\nok\nerror again\n");
    let report = SearchEngine::new(&ws.config)
        .search_pattern(&ws.file, "^error")
        .unwrap();

    assert_eq!(report.total, 2);
    let linenos: Vec<usize> = report.matches.iter().map(|m| m.lineno).collect();
    assert_eq!(linenos, vec![1, 3]);
}

#[test]
fn scenario_invalid_pattern_touches_nothing() {
    let ws = Workspace::with_content(b"abc\n");
    let err = SearchEngine::new(&ws.config)
        .search_pattern(&ws.file, "(unclosed")
        .unwrap_err();
    assert!(matches!(err, linepatch::SearchError::InvalidPattern { .. }));
}

#[test]
fn scenario_search_rejects_overlong_line() {
    let mut content = vec![b'a'; 2000];
    content.push(b'\n');
    let ws = Workspace::with_content(&content);
    let engine = SearchEngine::new(&ws.config.clone().with_max_line_len(100));

    let err = engine.search_literal(&ws.file, "a").unwrap_err();
    assert!(matches!(
        err,
        linepatch::SearchError::Scan(linepatch::ScanError::LineTooLong { line: 1, .. })
    ));
}
