//! Parser tests for statements.
use crate::tests::test_utils::dump;

#[test]
fn test_control_flow_statements() {
    let source = r"int main() {
    int i;
    for (i = 0; i < 3; i++) {
        if (i == 1) continue; else break;
    }
    while (i) i--;
    do { i++; } while (i < 2);
    return i;
}";
    insta::assert_snapshot!(dump(source), @r"
    TranslationUnit
      FunctionDefinition int main() (line 1)
        Compound
          Declaration int (line 2)
            Declarator i
          For ; (i < 3) ; i++
            Init (i = 0)
            Compound
              If (i == 1)
                Continue
                Else
                  Break
          While i
            Expr i--
          DoWhile (i < 2)
            Compound
              Expr i++
          Return i
    ");
}

#[test]
fn test_switch_labels_and_goto() {
    let source = r"int main() {
    int x;
    switch (x) {
    case 1: x = 2;
    case 2: break;
    default: ;
    }
    goto done;
done:
    return x;
}";
    insta::assert_snapshot!(dump(source), @r"
    TranslationUnit
      FunctionDefinition int main() (line 1)
        Compound
          Declaration int (line 2)
            Declarator x
          Switch x
            Compound
              Case 1
                Expr (x = 2)
              Case 2
                Break
              Default
                Empty
          Goto done
          Label done
            Return x
    ");
}

#[test]
fn test_for_with_declaration_and_empty_clauses() {
    let text = dump("int main() { for (int i = 0;;) { return i; } for (;;) ; }");
    assert!(text.contains("For ;  ; \n"), "{text}");
    assert!(text.contains("Declarator i"), "{text}");
}

#[test]
fn test_keyword_prefix_is_an_identifier() {
    let text = dump("int main() { int iffy; int returned; iffy = returned; return iffy; }");
    assert!(text.contains("Expr (iffy = returned)"), "{text}");
}
