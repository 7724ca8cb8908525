//! Struct and union layout.
use serde::Serialize;

use crate::ast::{ExternalDeclaration, NameId, TypeQualifiers};
use crate::codegen::CodeGen;
use crate::semantic::{CType, Derivation, Namespace, Symbol};
use crate::tests::test_utils::{parse, source_error};

#[derive(Debug, Serialize)]
struct MemberSummary {
    name: String,
    ty: String,
    elements: usize,
    offset: usize,
    size: usize,
}

#[derive(Debug, Serialize)]
struct LayoutSummary {
    name: String,
    size: usize,
    members: Vec<MemberSummary>,
}

/// Declare everything in `source` and summarize the record tagged `tag`.
fn layout_of(source: &str, tag: &str) -> LayoutSummary {
    let unit = parse(source);
    let mut cg = CodeGen::new("test", None);
    for item in &unit.items {
        let ExternalDeclaration::Declaration(declaration) = item else {
            panic!("only declarations expected");
        };
        if let Err(e) = cg.gen_declaration(declaration) {
            panic!("declaration failed: {e}");
        }
    }
    let Some(Symbol::Record(id)) = cg.sema.scopes.find(Namespace::Tag, NameId::new(tag)) else {
        panic!("no struct tagged {tag}");
    };
    let registry = &cg.sema.registry;
    let record = registry.record(*id);
    LayoutSummary {
        name: record.display_name(),
        size: record.size,
        members: record
            .members
            .values()
            .map(|member| {
                MemberSummary {
                    name: member.name.to_string(),
                    ty: registry.describe(&member.ty.element()),
                    elements: member.ty.element_count(),
                    offset: member.offset,
                    size: member.size,
                }
            })
            .collect(),
    }
}

#[test]
fn test_nested_struct_layout() {
    let source = r"
struct inner { int a; int b[3]; };
struct outer {
    int x;
    struct inner in;
    int *p;
    struct outer *next;
    int m[2][2];
};";
    insta::assert_yaml_snapshot!(layout_of(source, "outer"), @r"
    name: struct outer
    size: 88
    members:
      - name: x
        ty: int
        elements: 1
        offset: 0
        size: 8
      - name: in
        ty: struct inner
        elements: 1
        offset: 8
        size: 32
      - name: p
        ty: int*
        elements: 1
        offset: 40
        size: 8
      - name: next
        ty: struct outer*
        elements: 1
        offset: 48
        size: 8
      - name: m
        ty: int
        elements: 4
        offset: 56
        size: 32
    ");
}

#[test]
fn test_union_members_are_laid_out_in_sequence() {
    let layout = layout_of("union u { int a; int b; };", "u");
    assert_eq!(layout.name, "union u");
    assert_eq!(layout.size, 16);
    assert_eq!(layout.members[1].offset, 8);
}

#[test]
fn test_forward_declared_struct_completed_later() {
    let source = "struct node;\nstruct list { struct node *head; };\nstruct node { int value; struct node *next; };";
    let node = layout_of(source, "node");
    assert_eq!(node.size, 16);
    let list = layout_of(source, "list");
    assert_eq!(list.members[0].ty, "struct node*");
}

#[test]
fn test_struct_containing_itself() {
    assert_eq!(source_error("struct s { int a; struct s inner; };"), "[inner] has incomplete type");
}

#[test]
fn test_duplicate_member() {
    assert_eq!(source_error("struct s { int a; int a; };"), "[a] already defined");
}

#[test]
fn test_member_access_errors() {
    assert_eq!(
        source_error("struct s { int a; };\nint main() { struct s v; return v.b; }"),
        "[b] is not a member of [struct s]"
    );
    assert_eq!(
        source_error("struct s;\nint main() { struct s *p; return p->a; }"),
        "[struct s] not defined"
    );
    assert_eq!(
        source_error("int main() { int v; return v.a; }"),
        "[a] requested from [int], which is not a struct"
    );
}

#[test]
fn test_object_of_incomplete_struct() {
    assert_eq!(source_error("struct s;\nstruct s v;"), "[s] not defined");
}

#[test]
fn test_bitfields_rejected() {
    assert_eq!(source_error("struct s { int a : 3; };"), "bitfields are not supported");
}

#[test]
fn test_decay_keeps_inner_dimensions() {
    let mut matrix = CType::int();
    matrix.derived.extend([Derivation::Array(4), Derivation::Array(3)]);
    assert_eq!(matrix.dims(), [3, 4]);
    assert_eq!(matrix.element_count(), 12);
    assert_eq!(matrix.to_string(), "int[3][4]");

    let row_pointer = matrix.decay();
    assert!(row_pointer.is_pointer());
    assert_eq!(row_pointer.to_string(), "int(*)[4]");
    assert_eq!(row_pointer.deref().map(|row| row.dims()), Some(vec![4]));

    let mut pointers = CType::int();
    pointers.derived.extend([Derivation::Pointer(TypeQualifiers::empty()), Derivation::Array(3)]);
    assert_eq!(pointers.to_string(), "int*[3]");
    assert_eq!(pointers.decay().to_string(), "int**");
}

#[test]
fn test_array_member_of_pointers() {
    let layout = layout_of("struct s { int *v[3]; int *q; };", "s");
    assert_eq!(layout.members[0].ty, "int*");
    assert_eq!(layout.members[0].elements, 3);
    assert_eq!(layout.size, 32);
}
