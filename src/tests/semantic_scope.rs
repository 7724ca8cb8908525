//! Scope stack behavior, directly and through whole programs.
use crate::ast::NameId;
use crate::semantic::{CType, Namespace, ScopeStack, Storage, Symbol};
use crate::tests::test_utils::{compile, setup, source_error};

fn variable(offset: i64) -> Symbol {
    Symbol::Variable {
        ty: CType::int(),
        storage: Storage::Frame(offset),
        initial: None,
    }
}

#[test]
fn test_inner_declaration_disappears_with_its_scope() {
    setup();
    let mut scopes = ScopeStack::new();
    let x = NameId::new("x");
    scopes.push_scope();
    scopes.declare(Namespace::Ordinary, x, variable(8), 1).unwrap();
    assert!(scopes.find(Namespace::Ordinary, x).is_some());
    scopes.pop_scope().unwrap();
    assert!(scopes.find(Namespace::Ordinary, x).is_none());
}

#[test]
fn test_shadowing_keeps_outer_binding() {
    setup();
    let mut scopes = ScopeStack::new();
    let x = NameId::new("x");
    scopes.declare(Namespace::Ordinary, x, variable(8), 1).unwrap();
    scopes.push_scope();
    scopes.declare(Namespace::Ordinary, x, variable(16), 2).unwrap();
    assert_eq!(scopes.find(Namespace::Ordinary, x), Some(&variable(16)));
    scopes.pop_scope().unwrap();
    assert_eq!(scopes.find(Namespace::Ordinary, x), Some(&variable(8)));
}

#[test]
fn test_redeclaration_in_same_scope_is_an_error() {
    setup();
    let mut scopes = ScopeStack::new();
    let x = NameId::new("x");
    scopes.declare(Namespace::Ordinary, x, variable(8), 1).unwrap();
    let err = scopes.declare(Namespace::Ordinary, x, variable(16), 3).unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert_eq!(err.message(), "[x] already defined");
}

#[test]
fn test_tags_and_ordinary_names_do_not_collide() {
    setup();
    let mut scopes = ScopeStack::new();
    let s = NameId::new("s");
    scopes.declare(Namespace::Ordinary, s, variable(8), 1).unwrap();
    scopes.declare(Namespace::Tag, s, Symbol::EnumTag, 1).unwrap();
    assert_eq!(scopes.find(Namespace::Tag, s), Some(&Symbol::EnumTag));
}

#[test]
fn test_pop_scope_guards_file_scope() {
    setup();
    let mut scopes = ScopeStack::new();
    assert!(scopes.is_file_scope());
    scopes.push_scope();
    assert_eq!(scopes.depth(), 2);
    scopes.pop_scope().unwrap();
    assert!(scopes.is_file_scope());
    let err = scopes.pop_scope().unwrap_err();
    assert!(!err.is_source_error());
}

#[test]
fn test_lookup_of_unknown_name() {
    assert_eq!(
        source_error("int main() { return missing; }"),
        "[missing] not defined"
    );
}

#[test]
fn test_block_local_is_invisible_after_block() {
    assert_eq!(
        source_error("int main() { { int inner; } return inner; }"),
        "[inner] not defined"
    );
}

#[test]
fn test_duplicate_local_in_one_block() {
    assert_eq!(source_error("int main() { int a; int a; return 0; }"), "[a] already defined");
}

#[test]
fn test_shadowing_local_in_nested_block_compiles() {
    let asm = compile("int main() { int a; a = 1; { int a; a = 2; } return a; }");
    assert!(asm.contains("main proc"));
}

#[test]
fn test_duplicate_typedef_in_one_block() {
    assert_eq!(
        source_error("int main() { typedef int T; typedef int T; return 0; }"),
        "[T] already defined"
    );
}

#[test]
fn test_typedef_in_nested_block_does_not_leak() {
    let source = r"
typedef int T;
int main() {
    T outer;
    {
        typedef int *T;
        T inner;
        inner = &outer;
    }
    T again;
    again = 3;
    return sizeof(T) + again;
}";
    let asm = compile(source);
    assert!(asm.contains("main proc"));
}

#[test]
fn test_redefined_function_and_struct() {
    assert_eq!(
        source_error("int f() { return 1; }\nint f() { return 2; }"),
        "[f] already defined"
    );
    assert_eq!(
        source_error("struct s { int a; };\nstruct s { int b; };"),
        "[s] already defined"
    );
}
