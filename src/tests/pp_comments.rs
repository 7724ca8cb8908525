//! Tests for the comment-stripping pre-pass.
use crate::pp::strip_comments;
use crate::tests::test_utils::setup;

fn strip(source: &str) -> String {
    setup();
    match strip_comments(source) {
        Ok(text) => text,
        Err(e) => panic!("strip failed: {e}"),
    }
}

#[test]
fn test_line_comment_removed_newline_kept() {
    assert_eq!(strip("int a; // trailing\nint b;"), "int a; \nint b;");
}

#[test]
fn test_block_comment_becomes_space() {
    assert_eq!(strip("int/**/a;"), "int a;");
}

#[test]
fn test_block_comment_keeps_line_count() {
    let source = "int a; /* one\ntwo\nthree */ int b;\nint c;";
    let stripped = strip(source);
    assert_eq!(stripped.lines().count(), source.lines().count());
    assert_eq!(stripped, "int a; \n\n  int b;\nint c;");
}

#[test]
fn test_markers_inside_literals_survive() {
    let source = r#"char *s = "a // not /* a comment */"; int c = '/';"#;
    assert_eq!(strip(source), source);
}

#[test]
fn test_escaped_quote_inside_string() {
    let source = r#"char *s = "say \"/*hi*/\""; // gone"#;
    assert_eq!(strip(source), r#"char *s = "say \"/*hi*/\""; "#);
}

#[test]
fn test_stripping_twice_is_a_no_op() {
    let once = strip("int main() { /* x */ return 0; // done\n}\n");
    assert_eq!(strip(&once), once);
}

#[test]
fn test_unterminated_comment_reports_its_start_line() {
    setup();
    let err = strip_comments("int a;\n/* never\nclosed").unwrap_err();
    assert!(err.is_source_error());
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.message(), "unterminated comment");
}
