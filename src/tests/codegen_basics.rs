//! Whole-file layout, expressions and the errors the generator reports.
use crate::tests::test_utils::{compile, procedure, source_error};

/// Instructions and labels of procedure `name`, without indentation.
fn body(asm: &str, name: &str) -> String {
    procedure(asm, name).iter().map(|line| line.trim()).collect::<Vec<_>>().join("\n")
}

#[test]
fn test_minimal_program() {
    insta::assert_snapshot!(compile("int main() { return 0; }"), @r"
    ; test.asm

        .data

    right_32f qword 0ffffffffh

        .code

    main proc
        push rbp
        mov rbp, rsp
        mov rax, 0
        leave
        ret 0
        xor rax, rax
        leave
        ret 0
    main endp

    end
    ");
}

#[test]
fn test_global_read_in_expression() {
    let source = "int g = 5;\nint h = g;\nint main() { return g + 1; }";
    let asm = compile(source);
    assert!(asm.contains("g qword 5\nh qword 5\n"));
    insta::assert_snapshot!(body(&asm, "main"), @r"
    push rbp
    mov rbp, rsp
    mov r10, g
    mov r11, 1
    add r10, r11
    sub rsp, 8
    mov [rbp - 8], r10
    mov rax, [rbp - 8]
    leave
    ret 0
    xor rax, rax
    leave
    ret 0
    ");
}

#[test]
fn test_two_dimensional_array_store() {
    let source = "int main() {\n    int a[3][4];\n    a[1][2] = 7;\n    return 0;\n}";
    insta::assert_snapshot!(body(&compile(source), "main"), @r"
    push rbp
    mov rbp, rsp
    sub rsp, 96
    lea r10, [rbp - 96]
    add r10, 32
    sub rsp, 8
    mov [rbp - 104], r10
    mov r10, [rbp - 104]
    add r10, 16
    sub rsp, 8
    mov [rbp - 112], r10
    mov r11, [rbp - 112]
    mov rax, 7
    mov [r11], rax
    add rsp, 16
    mov rax, 0
    leave
    ret 0
    xor rax, rax
    leave
    ret 0
    ");
}

#[test]
fn test_member_access_adds_member_offsets() {
    let source = r"
struct T { int x; int y; };
struct S { int a; int b[3]; struct T t; };
struct S g;
int main() {
    struct S s;
    struct S *p;
    p = &s;
    s.t.y = 1;
    p->b[2] = 2;
    g.t.y = 3;
    return 0;
}";
    insta::assert_snapshot!(body(&compile(source), "main"), @r"
    push rbp
    mov rbp, rsp
    sub rsp, 48
    sub rsp, 8
    lea r10, [rbp - 48]
    sub rsp, 8
    mov [rbp - 64], r10
    lea r11, [rbp - 56]
    mov rax, [rbp - 64]
    mov [r11], rax
    add rsp, 8
    lea r11, [rbp - 8]
    mov rax, 1
    mov [r11], rax
    mov r10, [rbp - 56]
    sub rsp, 8
    mov [rbp - 64], r10
    mov r10, [rbp - 64]
    add r10, 8
    sub rsp, 8
    mov [rbp - 72], r10
    mov r10, [rbp - 72]
    add r10, 16
    sub rsp, 8
    mov [rbp - 80], r10
    mov r11, [rbp - 80]
    mov rax, 2
    mov [r11], rax
    add rsp, 24
    lea r10, g
    add r10, 32
    sub rsp, 8
    mov [rbp - 64], r10
    mov r10, [rbp - 64]
    add r10, 8
    sub rsp, 8
    mov [rbp - 72], r10
    mov r11, [rbp - 72]
    mov rax, 3
    mov [r11], rax
    add rsp, 16
    mov rax, 0
    leave
    ret 0
    xor rax, rax
    leave
    ret 0
    ");
}

#[test]
fn test_postfix_increment_keeps_old_value() {
    let source = "int main() { int i; i = 0; i++; return i; }";
    insta::assert_snapshot!(body(&compile(source), "main"), @r"
    push rbp
    mov rbp, rsp
    sub rsp, 8
    lea r11, [rbp - 8]
    mov rax, 0
    mov [r11], rax
    lea r11, [rbp - 8]
    mov rax, [r11]
    sub rsp, 8
    mov [rbp - 16], rax
    add rax, 1
    mov [r11], rax
    add rsp, 8
    mov rax, [rbp - 8]
    leave
    ret 0
    xor rax, rax
    leave
    ret 0
    ");
}

#[test]
fn test_stores_keep_to_volatile_registers() {
    let source = r"
struct pair { int a; int b; };
int main() {
    struct pair x;
    struct pair y;
    int i;
    x.a = 1;
    y = x;
    i = 0;
    i++;
    --i;
    return y.a + i;
}";
    let asm = compile(source);
    for register in ["rbx", "rsi", "rdi", "r12", "r13", "r14", "r15"] {
        assert!(!asm.contains(register), "{register} used in:\n{asm}");
    }
}

#[test]
fn test_constant_subexpressions_fold() {
    let asm = compile("int main() { return 2 * 3 + -1; }");
    let lines = procedure(&asm, "main");
    assert!(lines.contains(&"    mov rax, 5"));
    assert!(!lines.iter().any(|line| line.contains("imul")));
}

#[test]
fn test_pointer_arithmetic_scales_by_pointee() {
    let source = r"
struct pair { int a; int b; };
int main() {
    int v[4];
    int *p;
    struct pair *q;
    p = v + 1;
    q = q + 2;
    return p - v;
}";
    let asm = compile(source);
    let lines = procedure(&asm, "main");
    assert!(lines.contains(&"    imul r11, 8"));
    assert!(lines.contains(&"    imul r11, 16"));
    // pointer difference divides by the element size
    assert!(lines.contains(&"    idiv r11"));
}

#[test]
fn test_two_dimensional_parameter_keeps_row_size() {
    let asm = compile("int f(int b[][4]) { return b[1][2]; }");
    let lines = body(&asm, "f");
    assert!(lines.contains("add r10, 32\n"), "{lines}");
    assert!(lines.contains("add r10, 16\n"), "{lines}");
}

#[test]
fn test_array_decays_to_pointer_to_row() {
    let source = "int main() { int a[3][4]; int *r; r = *(a + 1); return r[0]; }";
    let lines = body(&compile(source), "main");
    assert!(lines.contains("imul r11, 32\n"), "{lines}");
    assert!(!lines.contains("imul r11, 8\n"), "{lines}");

    let asm = compile("int main() { int a[3][4]; return sizeof(*(a + 1)) + sizeof a[0]; }");
    assert!(asm.contains("    mov rax, 64\n"), "{asm}");
}

#[test]
fn test_pointer_to_array_typedef() {
    let source = "typedef int A[3];\nint main() { A x; A *p; p = &x; return (*p)[2] + sizeof *p; }";
    let lines = body(&compile(source), "main");
    assert!(lines.starts_with("push rbp\nmov rbp, rsp\nsub rsp, 24\nsub rsp, 8\n"), "{lines}");
    assert!(lines.contains("add r10, 16\n"), "{lines}");
    assert!(lines.contains("mov r11, 24\n"), "{lines}");
}

#[test]
fn test_comparison_and_logical_operators() {
    let source = "int main() { int a; a = 3; return a < 4 && a != 0 || !a; }";
    let asm = compile(source);
    for expected in ["setl r10b", "setne r10b", "sete r10b", "je and_false_", "jne or_true_"] {
        assert!(asm.contains(expected), "missing {expected} in:\n{asm}");
    }
}

#[test]
fn test_conditional_expression_labels() {
    let asm = compile("int main() { int a; a = 1; return a ? 10 : 20; }");
    assert!(asm.contains("cond_else_0:\n"));
    assert!(asm.contains("cond_over_0:\n"));
}

#[test]
fn test_string_literal_goes_to_data() {
    let asm = compile("int main() { int *s; s = \"hi\\n\"; return 0; }");
    assert!(asm.contains("string_0 byte \"hi\", 10, 0\n"));
    assert!(asm.contains("    lea r10, string_0\n"));
}

#[test]
fn test_output_is_deterministic() {
    let source = r"
int total;
int add(int a, int b) { return a + b; }
int main() {
    int i;
    for (i = 0; i < 3; i++) total = add(total, i);
    return total;
}";
    assert_eq!(compile(source), compile(source));
}

#[test]
fn test_compound_assignment_rejected() {
    assert_eq!(
        source_error("int main() { int a; a = 1; a += 2; return a; }"),
        "compound assignment '+=' is not supported"
    );
}

#[test]
fn test_assignment_errors() {
    assert_eq!(
        source_error("int main() { const int c = 1; c = 2; return c; }"),
        "assignment to a const-qualified object"
    );
    assert_eq!(
        source_error("int main() { 3 = 4; return 0; }"),
        "lvalue required as left operand of assignment"
    );
    assert_eq!(
        source_error("int main() { int a[2]; int b[2]; a = b; return 0; }"),
        "array is not assignable"
    );
}

#[test]
fn test_jump_statements_outside_loops() {
    assert_eq!(
        source_error("int main() { break; return 0; }"),
        "break statement not within loop or switch"
    );
    assert_eq!(
        source_error("int main() { continue; return 0; }"),
        "continue statement not within a loop"
    );
}

#[test]
fn test_return_errors() {
    assert_eq!(source_error("void f() { return 1; }"), "void function returns a value");
}

#[test]
fn test_dereference_errors() {
    assert_eq!(
        source_error("int main() { int a; a = 1; return *a; }"),
        "cannot dereference [int]"
    );
    assert_eq!(
        source_error("int main() { void *p; return *p; }"),
        "dereferencing a void pointer"
    );
}

#[test]
fn test_error_line_numbers() {
    let error = crate::tests::test_utils::compile_err("int main() {\n    int a;\n\n    return b;\n}");
    assert_eq!(error.line(), Some(4));
}
