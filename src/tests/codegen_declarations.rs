//! Global data, static and extern objects, and initializers.
use crate::tests::test_utils::{compile, procedure, source_error};

/// Lines of the `.data` section after the fixed mask constant.
fn data_section(asm: &str) -> Vec<&str> {
    asm.lines()
        .skip_while(|line| !line.starts_with("right_32f"))
        .skip(1)
        .take_while(|line| !line.is_empty())
        .collect()
}

#[test]
fn test_global_scalars_and_arrays() {
    let source = r"
int x;
int y = 3;
int v[4] = {1, 2};
int z[3] = {0};
int w[] = {1, 2, 3};
int grid[2][2];";
    assert_eq!(
        data_section(&compile(source)),
        [
            "x qword 0",
            "y qword 3",
            "v qword 1, 2",
            "    qword 2 dup (0)",
            "z qword 3 dup (0)",
            "w qword 1, 2, 3",
            "grid byte 32 dup (0)",
        ]
    );
}

#[test]
fn test_global_struct_and_nested_initializers() {
    let source = r"
struct point { int x; int y; };
struct point origin = {3};
int m[2][3] = {{1}, {4, 5}};";
    assert_eq!(
        data_section(&compile(source)),
        [
            "origin qword 3",
            "    qword 1 dup (0)",
            "m qword 1, 0, 0, 4, 5",
            "    qword 1 dup (0)",
        ]
    );
}

#[test]
fn test_global_strings() {
    let source = "int *msg = \"ok\";\nchar text[4] = \"ab\";";
    assert_eq!(
        data_section(&compile(source)),
        [
            "string_0 byte \"ok\", 0",
            "msg qword string_0",
            "text qword 97, 98",
            "    qword 2 dup (0)",
        ]
    );
}

#[test]
fn test_static_local_lives_in_data() {
    let source = "int counter() { static int n = 5; n = n + 1; return n; }";
    let asm = compile(source);
    assert!(data_section(&asm).contains(&"n_static_0 qword 5"));
    let lines = procedure(&asm, "counter");
    assert!(lines.contains(&"    mov r10, n_static_0"));
    assert!(lines.contains(&"    lea r11, n_static_0"));
}

#[test]
fn test_static_locals_in_two_functions_do_not_clash() {
    let source = "int a() { static int n; return n; }\nint b() { static int n; return n; }";
    let asm = compile(source);
    let data = data_section(&asm);
    assert_eq!(data, ["n_static_0 qword 0", "n_static_1 qword 0"]);
}

#[test]
fn test_extern_objects() {
    let asm = compile("extern int ext;\nint main() { return ext; }");
    assert!(data_section(&asm).contains(&"extern ext:qword"));
    assert!(asm.contains("    mov rax, ext\n"));

    let asm = compile("extern int x;\nint x = 3;\nint main() { return x; }");
    assert_eq!(data_section(&asm), ["x qword 3"]);
}

#[test]
fn test_local_initializers() {
    let source = "int main() { int x = 4; int a[3] = {1, 2}; return a[0] + x; }";
    let asm = compile(source);
    let lines = procedure(&asm, "main");
    let expected = [
        "    sub rsp, 8",
        "    lea r11, [rbp - 8]",
        "    mov rax, 4",
        "    mov [r11], rax",
        "    sub rsp, 24",
        "    mov qword ptr [rbp - 32], 0",
        "    mov qword ptr [rbp - 24], 0",
        "    mov qword ptr [rbp - 16], 0",
        "    lea r11, [rbp - 32]",
        "    mov rax, 1",
        "    mov [r11], rax",
        "    lea r11, [rbp - 24]",
        "    mov rax, 2",
        "    mov [r11], rax",
    ];
    assert_eq!(&lines[2..2 + expected.len()], expected);
}

#[test]
fn test_large_local_array_zeroed_in_loop() {
    let asm = compile("int main() { int big[10] = {0}; return big[9]; }");
    assert!(asm.contains("zero_fill_0:\n    mov qword ptr [r10], 0\n"));
    assert!(asm.contains("    mov r11, 10\n"));
}

#[test]
fn test_struct_assignment_copies_every_word() {
    let source = r"
struct pair { int a; int b; };
int main() {
    struct pair p = {1, 2};
    struct pair q;
    q = p;
    return q.b;
}";
    let asm = compile(source);
    assert!(asm.contains("    mov rax, [r10 + 0]\n    mov [r11 + 0], rax\n"));
    assert!(asm.contains("    mov rax, [r10 + 8]\n    mov [r11 + 8], rax\n"));
}

#[test]
fn test_typedef_names_as_types() {
    let source = "typedef int *IP;\nIP p;\nint size = sizeof(IP);\nint main() { IP q; q = p; return 0; }";
    let asm = compile(source);
    assert!(data_section(&asm).contains(&"size qword 8"));
}

#[test]
fn test_initializer_errors() {
    assert_eq!(source_error("int v[2] = {1, 2, 3};"), "excess elements in array initializer");
    assert_eq!(source_error("char s[2] = \"abc\";"), "initializer string is too long");
    assert_eq!(source_error("int v[2] = 5;"), "array initializer must be a brace list");
    assert_eq!(source_error("int x = {1, 2};"), "excess elements in scalar initializer");
    assert_eq!(
        source_error("int v[3] = {[1] = 2};"),
        "designated initializers are not supported"
    );
    assert_eq!(
        source_error("struct p { int a; };\nstruct p s = {1, 2};"),
        "excess elements in struct initializer"
    );
}

#[test]
fn test_declaration_errors() {
    assert_eq!(source_error("extern int x = 1;"), "extern [x] is initialized");
    assert_eq!(source_error("void v;"), "variable [v] has void type");
    assert_eq!(source_error("typedef int T = 1;"), "typedef [T] is initialized");
    assert_eq!(source_error("int x;\nint x;"), "[x] already defined");
    assert_eq!(source_error("float f;"), "floating point types are not supported");
}
