//! Regression suite control files and output comparison.
use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostic::CompileError;
use crate::driver::compiler::DriverError;
use crate::driver::suite::{SuiteControl, compare_output, run_suite};
use crate::tests::test_utils::setup;

fn invalid(text: &str) -> (usize, String) {
    match SuiteControl::parse(text, Path::new("base")) {
        Err(DriverError::InvalidControl { line, message }) => (line, message),
        other => panic!("expected an invalid control file, got {other:?}"),
    }
}

#[test]
fn test_parse_control_file() {
    let text = "# regression range\nfirst = 1\nlast = 3   # inclusive\n\nsilent = yes\ndir = cases\n";
    let control = SuiteControl::parse(text, Path::new("/suite")).unwrap();
    assert_eq!(
        control,
        SuiteControl {
            first: 1,
            last: 3,
            silent: true,
            dir: PathBuf::from("/suite/cases"),
        }
    );
    assert_eq!(control.source_path(2), PathBuf::from("/suite/cases/2.c"));
    assert_eq!(control.answer_path(2), PathBuf::from("/suite/cases/2.answer"));
}

#[test]
fn test_control_defaults() {
    let control = SuiteControl::parse("first=4\nlast=4", Path::new("here")).unwrap();
    assert!(!control.silent);
    assert_eq!(control.dir, PathBuf::from("here"));
}

#[test]
fn test_invalid_control_files() {
    assert_eq!(invalid("first = 1"), (0, "missing `last`".to_string()));
    assert_eq!(invalid("first = 3\nlast = 1"), (0, "empty range 3..=1".to_string()));
    assert_eq!(invalid("first = 1\nlast = 2\ncolor = red"), (3, "unknown key `color`".to_string()));
    assert_eq!(
        invalid("first = one"),
        (1, "`first` must be a number, found `one`".to_string())
    );
    assert_eq!(
        invalid("first = 1\nsilent = maybe"),
        (2, "`silent` must be true or false, found `maybe`".to_string())
    );
    assert_eq!(invalid("first 1"), (1, "expected `key = value`, found `first 1`".to_string()));
}

#[test]
fn test_load_control_file() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control.txt");
    fs::write(&path, "first = 1\nlast = 2\ndir = cases\n").unwrap();
    let control = SuiteControl::load(&path).unwrap();
    assert_eq!(control.dir, dir.path().join("cases"));

    let missing = dir.path().join("absent.txt");
    assert!(matches!(SuiteControl::load(&missing), Err(DriverError::Io { .. })));
}

#[test]
fn test_compare_output() {
    assert_eq!(compare_output("a\nb\n", "a\r\nb\r\n\n\n"), None);
    assert_eq!(
        compare_output("a\nb\n", "a\nc\n"),
        Some((2, Some("b".to_string()), Some("c".to_string())))
    );
    assert_eq!(compare_output("a\n", "a\nextra"), Some((2, None, Some("extra".to_string()))));
    assert_eq!(compare_output("a\nb", "a"), Some((2, Some("b".to_string()), None)));
    assert_eq!(compare_output("", "\n"), None);
}

fn write_answers(dir: &Path, answers: &[(u32, &str)]) {
    for (case, answer) in answers {
        fs::write(dir.join(format!("{case}.answer")), answer).unwrap();
    }
}

fn control_for(dir: &Path, first: u32, last: u32) -> SuiteControl {
    SuiteControl {
        first,
        last,
        silent: true,
        dir: dir.to_path_buf(),
    }
}

fn case_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse().ok())
        .unwrap()
}

#[test]
fn test_run_suite_reports_each_case() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    write_answers(dir.path(), &[(1, "hello\n"), (2, "[x] not defined\n"), (3, "bye\n")]);

    let mut seen = Vec::new();
    let report = run_suite(&control_for(dir.path(), 1, 3), |path| {
        let case = case_number(path);
        seen.push(path.to_path_buf());
        match case {
            1 => Ok("hello\r\n".to_string()),
            2 => Err(DriverError::Compile(CompileError::source(4, "[x] not defined"))),
            _ => Ok("hi\n".to_string()),
        }
    })
    .unwrap();

    assert_eq!(seen[0], dir.path().join("1.c"));
    assert_eq!(report.passed, [1, 2]);
    assert_eq!(report.failed.len(), 1);
    let failure = &report.failed[0];
    assert_eq!((failure.case, failure.line), (3, 1));
    assert_eq!(failure.expected.as_deref(), Some("bye"));
    assert_eq!(failure.actual.as_deref(), Some("hi"));
    assert_eq!(report.total(), 3);
    assert!(!report.all_passed());
    assert_eq!(report.summary(), "2 passed, 1 failed (3)");
}

#[test]
fn test_run_suite_stops_on_internal_error() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    write_answers(dir.path(), &[(1, "x\n")]);
    let result = run_suite(&control_for(dir.path(), 1, 1), |_| {
        Err(DriverError::Compile(CompileError::internal("broken invariant")))
    });
    assert!(matches!(result, Err(DriverError::Compile(CompileError::Internal { .. }))));
}

#[test]
fn test_run_suite_requires_answer_files() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let result = run_suite(&control_for(dir.path(), 7, 7), |_| Ok(String::new()));
    match result {
        Err(DriverError::Io { path, .. }) => assert_eq!(path, dir.path().join("7.answer")),
        other => panic!("expected a missing answer file, got {other:?}"),
    }
}
