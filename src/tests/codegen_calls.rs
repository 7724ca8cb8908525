//! Calls under the Microsoft x64 convention.
use crate::tests::test_utils::{compile, procedure, source_error};

fn body(asm: &str, name: &str) -> String {
    procedure(asm, name).iter().map(|line| line.trim()).collect::<Vec<_>>().join("\n")
}

const FIVE_ARGS: &str = r"
int f(int a, int b, int c, int d, int e) { return e; }
int main() { return f(1, 2, 3, 4, 5); }";

#[test]
fn test_callee_spills_register_arguments() {
    insta::assert_snapshot!(body(&compile(FIVE_ARGS), "f"), @r"
    push rbp
    mov rbp, rsp
    mov [rbp + 16], rcx
    mov [rbp + 24], rdx
    mov [rbp + 32], r8
    mov [rbp + 40], r9
    mov rax, [rbp + 48]
    leave
    ret 0
    xor rax, rax
    leave
    ret 0
    ");
}

#[test]
fn test_caller_pads_to_sixteen_bytes() {
    insta::assert_snapshot!(body(&compile(FIVE_ARGS), "main"), @r"
    push rbp
    mov rbp, rsp
    sub rsp, 8
    push r15
    mov r15, 5
    sub rsp, 48
    mov r10, 1
    mov [rbp - 64], r10
    mov r10, 2
    mov [rbp - 56], r10
    mov r10, 3
    mov [rbp - 48], r10
    mov r10, 4
    mov [rbp - 40], r10
    mov r10, 5
    mov [rbp - 32], r10
    mov rcx, [rbp - 64]
    mov rdx, [rbp - 56]
    mov r8, [rbp - 48]
    mov r9, [rbp - 40]
    call f
    mov [rbp - 8], rax
    add rsp, 48
    pop r15
    mov rax, [rbp - 8]
    leave
    ret 0
    xor rax, rax
    leave
    ret 0
    ");
}

#[test]
fn test_call_without_arguments_reserves_shadow_space() {
    let asm = compile("int g();\nint main() { return g(); }");
    let lines = body(&asm, "main");
    assert!(lines.contains("mov r15, 0\nsub rsp, 32\ncall g\n"), "{lines}");
    assert!(asm.contains("extern g:proc\n"));
}

#[test]
fn test_defined_function_is_not_extern() {
    let asm = compile("int g();\nint g() { return 1; }\nint main() { return g(); }");
    assert!(!asm.contains("extern g:proc"));
    assert!(asm.contains("g proc\n"));
}

#[test]
fn test_nested_calls_stay_aligned() {
    let source = r"
int id(int x) { return x; }
int sum(int a, int b, int c) { return a + b + c; }
int main() {
    int local;
    local = 1;
    return sum(id(local), id(sum(1, 2, id(3))), 4 > local);
}";
    let asm = compile(source);
    assert_eq!(asm.matches("call id").count(), 3);
    assert_eq!(asm.matches("call sum").count(), 2);
}

#[test]
fn test_variadic_call_accepts_extra_arguments() {
    let source = "int printf(int *format, ...);\nint main() { printf(\"%d %d\", 1, 2); return 0; }";
    let asm = compile(source);
    assert!(asm.contains("mov r15, 3"));
    assert!(asm.contains("extern printf:proc\n"));
    assert!(asm.contains("string_0 byte \"%d %d\", 0\n"));
}

#[test]
fn test_argument_count_mismatch() {
    assert_eq!(
        source_error("int f(int a, int b) { return a; }\nint main() { return f(1); }"),
        "function args not match [f]"
    );
    assert_eq!(
        source_error("int printf(int *format, ...);\nint main() { return printf(); }"),
        "function args not match [printf]"
    );
}

#[test]
fn test_conflicting_prototypes() {
    assert_eq!(
        source_error("int f(int a);\nint f(int a, int b);"),
        "conflicting types for [f]"
    );
}

#[test]
fn test_function_used_as_value() {
    assert_eq!(
        source_error("int f() { return 0; }\nint main() { return f; }"),
        "[f] is a function and can only be called"
    );
    assert_eq!(
        source_error("int main() { int x; x = 0; return x(); }"),
        "called object is not a function"
    );
}

#[test]
fn test_struct_argument_rejected() {
    let source = "struct s { int a; };\nint f(int x);\nint main() { struct s v; return f(v); }";
    assert_eq!(source_error(source), "struct arguments are not supported");
}
