//! Compile-time folding of global initializers, enum values and array bounds.
use crate::ast::BinaryOp;
use crate::semantic::fold_binary;
use crate::tests::test_utils::{compile, source_error};

/// The data-section definition of `label` in the assembly for `source`.
fn data_line(source: &str, label: &str) -> String {
    let asm = compile(source);
    let prefix = format!("{label} ");
    match asm.lines().find(|line| line.starts_with(&prefix)) {
        Some(line) => line.to_string(),
        None => panic!("no data for {label} in:\n{asm}"),
    }
}

#[test]
fn test_fold_binary_operators() {
    assert_eq!(fold_binary(BinaryOp::Div, -7, 2, 1).unwrap(), -3);
    assert_eq!(fold_binary(BinaryOp::Rem, -7, 3, 1).unwrap(), -1);
    assert_eq!(fold_binary(BinaryOp::Shr, -16, 2, 1).unwrap(), -4);
    assert_eq!(fold_binary(BinaryOp::Shl, 1, 4, 1).unwrap(), 16);
    assert_eq!(fold_binary(BinaryOp::Le, 3, 3, 1).unwrap(), 1);
    assert_eq!(fold_binary(BinaryOp::LogicalAnd, 2, 0, 1).unwrap(), 0);
    assert_eq!(fold_binary(BinaryOp::Mul, i64::MAX, 2, 1).unwrap(), -2);
}

#[test]
fn test_fold_division_by_zero() {
    let err = fold_binary(BinaryOp::Rem, 1, 0, 9).unwrap_err();
    assert_eq!(err.line(), Some(9));
    assert_eq!(err.message(), "division by zero in constant expression");
    assert_eq!(
        source_error("int x = 1 / 0;"),
        "division by zero in constant expression"
    );
}

#[test]
fn test_global_initializer_precedence() {
    assert_eq!(data_line("int a = 2 + 3 * 4;", "a"), "a qword 14");
    assert_eq!(data_line("int a = (2 + 3) * 4;", "a"), "a qword 20");
    assert_eq!(data_line("int a = 1 << 4 | 1;", "a"), "a qword 17");
    assert_eq!(data_line("int a = 10 - 4 - 3;", "a"), "a qword 3");
}

#[test]
fn test_global_initializer_unary_and_logic() {
    assert_eq!(data_line("int a = -5;", "a"), "a qword -5");
    assert_eq!(data_line("int a = ~0;", "a"), "a qword -1");
    assert_eq!(data_line("int a = !7;", "a"), "a qword 0");
    assert_eq!(data_line("int a = 5 > 3 && 0 || 2;", "a"), "a qword 1");
    assert_eq!(data_line("int a = 0 ? 10 : 20;", "a"), "a qword 20");
    assert_eq!(data_line("int a = (1, 2);", "a"), "a qword 2");
}

#[test]
fn test_short_circuit_skips_right_operand() {
    // the division is never folded
    assert_eq!(data_line("int a = 0 && 1 / 0;", "a"), "a qword 0");
    assert_eq!(data_line("int a = 1 || 1 / 0;", "a"), "a qword 1");
}

#[test]
fn test_earlier_global_value_is_foldable() {
    let source = "int g = 5;\nint h = g * 2;\nint z;\nint w = z + 1;";
    assert_eq!(data_line(source, "h"), "h qword 10");
    assert_eq!(data_line(source, "w"), "w qword 1");
}

#[test]
fn test_enum_constants_count_up() {
    let source = "enum color { RED, GREEN = 5, BLUE };\nint a = RED;\nint b = BLUE;";
    assert_eq!(data_line(source, "a"), "a qword 0");
    assert_eq!(data_line(source, "b"), "b qword 6");
}

#[test]
fn test_enum_value_from_earlier_constant() {
    let source = "enum { BASE = 4, NEXT = BASE * 2 };\nint n = NEXT;";
    assert_eq!(data_line(source, "n"), "n qword 8");
}

#[test]
fn test_sizeof_in_constant_expression() {
    let source = r"
struct point { int x; int y; };
int arr[3];
int a = sizeof(struct point);
int b = sizeof arr;
int c = sizeof(int *);
int d = sizeof(int[2][3]);";
    assert_eq!(data_line(source, "a"), "a qword 16");
    assert_eq!(data_line(source, "b"), "b qword 24");
    assert_eq!(data_line(source, "c"), "c qword 8");
    assert_eq!(data_line(source, "d"), "d qword 48");
}

#[test]
fn test_array_bound_from_enum_constant() {
    let source = "enum { N = 3 };\nint table[N * 2];";
    assert_eq!(data_line(source, "table"), "table byte 48 dup (0)");
}

#[test]
fn test_non_constant_initializers() {
    assert_eq!(
        source_error("int f();\nint x = f();"),
        "function call is not a compile-time constant"
    );
    assert_eq!(
        source_error("int *p;\nint x = *p;"),
        "dereference is not a compile-time constant"
    );
    assert_eq!(
        source_error("int v[2];\nint x = v[1];"),
        "array subscript is not a compile-time constant"
    );
    assert_eq!(
        source_error("int y;\nint x = y = 2;"),
        "assignment is not a compile-time constant"
    );
}

#[test]
fn test_local_is_not_constant_for_switch_case() {
    let source = "int main() { int k; k = 1; switch (k) { case k: return 1; } return 0; }";
    assert_eq!(source_error(source), "[k] is not a compile-time constant");
}

#[test]
fn test_array_bound_errors() {
    assert_eq!(
        source_error("int main() { int n; n = 3; int a[n]; return 0; }"),
        "array rank must be const"
    );
    assert_eq!(source_error("int a[];"), "array size missing");
    assert_eq!(source_error("int a[0];"), "array size 0 is not positive");
}
