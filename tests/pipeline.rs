//! End-to-end compilation through the public driver API.

use crankcc::ast::dumper::AstDumper;
use crankcc::driver::{CompileConfig, CompilePhase, CompilerDriver, DriverError};

fn compile(source: &str) -> Result<String, DriverError> {
    let config = CompileConfig::from_source_code(source, CompilePhase::Codegen).expect("temp dir");
    let mut driver = CompilerDriver::from_config(config);
    let artifact = driver.run_pipeline(CompilePhase::Codegen)?;
    Ok(artifact.assembly.unwrap_or_default())
}

#[test]
fn compiles_a_complete_program() {
    let source = r#"
/* linked list sum */
struct node {
    int value;
    struct node *next;
};

int printf(int *format, ...);

int sum(struct node *head) {
    int total;
    total = 0;
    while (head) {
        total = total + head->value;
        head = head->next;
    }
    return total;
}

int main() {
    struct node a;
    struct node b;
    a.value = 3;
    a.next = &b;
    b.value = 4;
    b.next = 0;
    printf("%d\n", sum(&a));
    return 0;
}
"#;
    let asm = compile(source).unwrap();
    assert!(asm.contains("sum proc\n"));
    assert!(asm.contains("main proc\n"));
    assert!(asm.contains("extern printf:proc\n"));
    assert!(asm.contains("    call sum\n"));
    assert!(asm.trim_end().ends_with("end"));
}

#[test]
fn reports_the_failing_line() {
    let error = compile("int main() {\n    int a;\n    a = b;\n    return a;\n}\n").unwrap_err();
    let compile_error = error.as_source_error().expect("source error");
    assert_eq!(compile_error.line(), Some(3));
    assert_eq!(compile_error.message(), "[b] not defined");
}

#[test]
fn dumps_the_parsed_tree() {
    let config = CompileConfig::from_source_code("int x;", CompilePhase::Parse).expect("temp dir");
    let mut driver = CompilerDriver::from_config(config);
    let artifact = driver.run_pipeline(CompilePhase::Parse).unwrap();
    let dump = AstDumper::dump(&artifact.ast.unwrap());
    assert!(dump.starts_with("TranslationUnit\n"));
}
