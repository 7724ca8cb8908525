//! Parser tests for declarations and declarators.
use crate::ast::*;
use crate::tests::test_utils::{dump, parse, parse_err};

fn only_declaration(unit: &TranslationUnit) -> &Declaration {
    match unit.items.as_slice() {
        [ExternalDeclaration::Declaration(declaration)] => declaration,
        other => panic!("expected one declaration, got {other:#?}"),
    }
}

#[test]
fn test_function_with_local_declaration() {
    let source = "int main() {\n    int x = 1 + 2 * 3;\n    return x;\n}\n";
    insta::assert_snapshot!(dump(source), @r"
    TranslationUnit
      FunctionDefinition int main() (line 1)
        Compound
          Declaration int (line 2)
            Declarator x
              Init (1 + (2 * 3))
          Return x
    ");
}

#[test]
fn test_pointer_and_array_declarators() {
    let unit = parse("int **pp, a[3][4], *p[2];");
    let declaration = only_declaration(&unit);
    let declarators = &declaration.declarators;
    assert_eq!(declarators.len(), 3);
    assert_eq!(declarators[0].declarator.pointers.len(), 2);
    match &declarators[1].declarator.suffix {
        DeclaratorSuffix::Array(dims) => assert_eq!(dims.len(), 2),
        other => panic!("expected array suffix, got {other:?}"),
    }
    assert_eq!(declarators[2].declarator.pointers.len(), 1);
}

#[test]
fn test_prototype_with_unnamed_and_variadic_parameters() {
    let unit = parse("int printf(char *, ...);");
    let declaration = only_declaration(&unit);
    let DeclaratorSuffix::Function(params) = &declaration.declarators[0].declarator.suffix else {
        panic!("expected a function declarator");
    };
    assert!(params.variadic);
    assert_eq!(params.params.len(), 1);
    assert!(matches!(params.params[0].declarator, ParamDeclarator::Abstract(_)));
}

#[test]
fn test_void_parameter_list_is_empty() {
    let unit = parse("int f(void);");
    let declaration = only_declaration(&unit);
    let DeclaratorSuffix::Function(params) = &declaration.declarators[0].declarator.suffix else {
        panic!("expected a function declarator");
    };
    assert!(params.params.is_empty());
    assert!(!params.variadic);
}

#[test]
fn test_struct_definition_and_self_reference() {
    let source = "struct node { int value; struct node *next; } head;";
    let unit = parse(source);
    let declaration = only_declaration(&unit);
    let TypeSpecifier::Record(record) = &declaration.specifiers.type_spec else {
        panic!("expected a struct specifier");
    };
    assert_eq!(record.kind, RecordKind::Struct);
    assert_eq!(record.members.as_ref().map(Vec::len), Some(2));
    assert!(dump(source).contains("Declaration struct node {2 members}"));
}

#[test]
fn test_enum_with_explicit_values() {
    let unit = parse("enum color { RED, GREEN = 5, BLUE };");
    let declaration = only_declaration(&unit);
    let TypeSpecifier::Enum(enumeration) = &declaration.specifiers.type_spec else {
        panic!("expected an enum specifier");
    };
    let enumerators = enumeration.enumerators.as_ref().map(Vec::len);
    assert_eq!(enumerators, Some(3));
    assert!(declaration.declarators.is_empty());
}

#[test]
fn test_storage_classes_and_qualifiers() {
    let unit = parse("static const int limit = 10;");
    let declaration = only_declaration(&unit);
    assert_eq!(declaration.specifiers.storage, Some(StorageClass::Static));
    assert!(declaration.specifiers.qualifiers.contains(TypeQualifiers::CONST));
}

#[test]
fn test_typedef_name_starts_a_declaration() {
    let source = "typedef int T;\nint main() { T * p; return 0; }";
    let text = dump(source);
    assert!(text.contains("Declaration T (line 2)"), "{text}");
    assert!(text.contains("Declarator *p"), "{text}");
}

#[test]
fn test_without_typedef_star_is_multiplication() {
    let text = dump("int main() { int a; int b; a * b; return 0; }");
    assert!(text.contains("Expr (a * b)"), "{text}");
}

#[test]
fn test_typedef_shadowed_by_local_variable() {
    let text = dump("typedef int T;\nint main() { int T = 3; return T * 2; }");
    assert!(text.contains("Return (T * 2)"), "{text}");
}

#[test]
fn test_typedef_in_block_ends_with_block() {
    let text = dump("int T;\nint main() { { typedef int T; T x; } return T * 2; }");
    assert!(text.contains("Declaration T (line 2)"), "{text}");
    assert!(text.contains("Return (T * 2)"), "{text}");
}

#[test]
fn test_brace_initializers_nest() {
    let text = dump("int m[2][2] = { {1, 2}, {3} };");
    insta::assert_snapshot!(text, @r"
    TranslationUnit
      Declaration int (line 1)
        Declarator m[2][2]
          InitList
            InitList
              Init 1
              Init 2
            InitList
              Init 3
    ");
}

#[test]
fn test_unparsable_input_reports_declaration_failure() {
    let err = parse_err("int main( { return 0; }");
    assert!(err.is_source_error());
    assert_eq!(err.message(), "declaration parsing failed");
}

#[test]
fn test_void_with_other_specifier_is_rejected() {
    let err = parse_err("void int x;");
    assert_eq!(err.message(), "void combined with other type specifiers");
}
