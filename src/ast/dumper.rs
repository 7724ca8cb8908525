//! AST Dumper module
//!
//! Renders a parsed translation unit as an indented tree, one node per line.

use std::fmt::Write;

use itertools::Itertools;

use crate::ast::*;

/// Dumper for AST
pub struct AstDumper {
    out: String,
    indent: usize,
}

impl AstDumper {
    pub fn dump(unit: &TranslationUnit) -> String {
        let mut dumper = AstDumper {
            out: String::new(),
            indent: 0,
        };
        dumper.line("TranslationUnit");
        dumper.nested(|d| {
            for item in &unit.items {
                match item {
                    ExternalDeclaration::Function(function) => d.function(function),
                    ExternalDeclaration::Declaration(declaration) => d.declaration(declaration),
                }
            }
        });
        dumper.out
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}{}", "  ".repeat(self.indent), text.as_ref());
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn function(&mut self, function: &FunctionDefinition) {
        self.line(format!(
            "FunctionDefinition {} {} (line {})",
            specifiers_text(&function.specifiers),
            declarator_text(&function.declarator),
            function.line
        ));
        self.nested(|d| d.compound(&function.body));
    }

    fn declaration(&mut self, declaration: &Declaration) {
        self.line(format!(
            "Declaration {} (line {})",
            specifiers_text(&declaration.specifiers),
            declaration.line
        ));
        self.nested(|d| {
            for init in &declaration.declarators {
                d.line(format!("Declarator {}", declarator_text(&init.declarator)));
                if let Some(init) = &init.init {
                    d.nested(|d| d.initializer(init));
                }
            }
        });
    }

    fn initializer(&mut self, init: &Initializer) {
        match init {
            Initializer::Expr(expr) => self.line(format!("Init {}", assignment_text(expr))),
            Initializer::List(items, _) => {
                self.line("InitList");
                self.nested(|d| {
                    for item in items {
                        d.initializer(&item.init);
                    }
                });
            }
        }
    }

    fn compound(&mut self, compound: &CompoundStatement) {
        self.line("Compound");
        self.nested(|d| {
            for item in &compound.items {
                match item {
                    BlockItem::Declaration(declaration) => d.declaration(declaration),
                    BlockItem::Statement(statement) => d.statement(statement),
                }
            }
        });
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Labeled(LabeledStatement::Label { name, body, .. }) => {
                self.line(format!("Label {name}"));
                self.nested(|d| d.statement(body));
            }
            Statement::Labeled(LabeledStatement::Case { value, body, .. }) => {
                self.line(format!("Case {}", conditional_text(value)));
                self.nested(|d| d.statement(body));
            }
            Statement::Labeled(LabeledStatement::Default { body, .. }) => {
                self.line("Default");
                self.nested(|d| d.statement(body));
            }
            Statement::Compound(compound) => self.compound(compound),
            Statement::Expression(Some(expr), _) => self.line(format!("Expr {}", expression_text(expr))),
            Statement::Expression(None, _) => self.line("Empty"),
            Statement::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.line(format!("If {}", expression_text(cond)));
                self.nested(|d| {
                    d.statement(then_branch);
                    if let Some(else_branch) = else_branch {
                        d.line("Else");
                        d.nested(|d| d.statement(else_branch));
                    }
                });
            }
            Statement::Switch { cond, body, .. } => {
                self.line(format!("Switch {}", expression_text(cond)));
                self.nested(|d| d.statement(body));
            }
            Statement::While { cond, body, .. } => {
                self.line(format!("While {}", expression_text(cond)));
                self.nested(|d| d.statement(body));
            }
            Statement::DoWhile { body, cond, .. } => {
                self.line(format!("DoWhile {}", expression_text(cond)));
                self.nested(|d| d.statement(body));
            }
            Statement::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                let cond = cond.as_ref().map(expression_text).unwrap_or_default();
                let step = step.as_ref().map(expression_text).unwrap_or_default();
                self.line(format!("For ; {cond} ; {step}"));
                self.nested(|d| {
                    match init {
                        ForInit::None => {}
                        ForInit::Declaration(declaration) => d.declaration(declaration),
                        ForInit::Expression(expr) => d.line(format!("Init {}", expression_text(expr))),
                    }
                    d.statement(body);
                });
            }
            Statement::Goto(label, _) => self.line(format!("Goto {label}")),
            Statement::Continue(_) => self.line("Continue"),
            Statement::Break(_) => self.line("Break"),
            Statement::Return(Some(expr), _) => self.line(format!("Return {}", expression_text(expr))),
            Statement::Return(None, _) => self.line("Return"),
        }
    }
}

fn specifiers_text(specifiers: &DeclSpecifiers) -> String {
    let mut parts = Vec::new();
    if let Some(storage) = specifiers.storage {
        parts.push(format!("{storage:?}").to_lowercase());
    }
    if specifiers.qualifiers.contains(TypeQualifiers::CONST) {
        parts.push("const".to_string());
    }
    if specifiers.qualifiers.contains(TypeQualifiers::VOLATILE) {
        parts.push("volatile".to_string());
    }
    parts.push(type_spec_text(&specifiers.type_spec));
    parts.join(" ")
}

fn type_spec_text(spec: &TypeSpecifier) -> String {
    match spec {
        TypeSpecifier::Basic(basic) => format!("{basic:?}").to_lowercase(),
        TypeSpecifier::Record(record) => {
            let keyword = match record.kind {
                RecordKind::Struct => "struct",
                RecordKind::Union => "union",
            };
            let name = record.name.map(|n| n.to_string()).unwrap_or_else(|| "<anonymous>".to_string());
            match &record.members {
                Some(members) => format!("{keyword} {name} {{{} members}}", members.len()),
                None => format!("{keyword} {name}"),
            }
        }
        TypeSpecifier::Enum(enumeration) => {
            let name = enumeration
                .name
                .map(|n| n.to_string())
                .unwrap_or_else(|| "<anonymous>".to_string());
            format!("enum {name}")
        }
        TypeSpecifier::TypedefName(name) => name.to_string(),
    }
}

fn declarator_text(declarator: &Declarator) -> String {
    let stars = "*".repeat(declarator.pointers.len());
    let suffix = match &declarator.suffix {
        DeclaratorSuffix::None => String::new(),
        DeclaratorSuffix::Array(dims) => dims
            .iter()
            .map(|dim| format!("[{}]", dim.as_ref().map(conditional_text).unwrap_or_default()))
            .join(""),
        DeclaratorSuffix::Function(params) => {
            let mut names = params
                .params
                .iter()
                .map(|param| match &param.declarator {
                    ParamDeclarator::Named(named) => {
                        format!("{} {}", type_spec_text(&param.specifiers.type_spec), declarator_text(named))
                    }
                    ParamDeclarator::Abstract(abs) => format!(
                        "{}{}",
                        type_spec_text(&param.specifiers.type_spec),
                        "*".repeat(abs.pointers.len())
                    ),
                })
                .collect_vec();
            if params.variadic {
                names.push("...".to_string());
            }
            format!("({})", names.join(", "))
        }
    };
    format!("{stars}{}{suffix}", declarator.name)
}

pub(crate) fn expression_text(expr: &Expression) -> String {
    expr.items.iter().map(assignment_text).join(", ")
}

fn assignment_text(expr: &AssignmentExpr) -> String {
    match expr {
        AssignmentExpr::Conditional(cond) => conditional_text(cond),
        AssignmentExpr::Assign { target, op, value, .. } => {
            format!("({} {} {})", unary_text(target), op.as_str(), assignment_text(value))
        }
    }
}

fn conditional_text(expr: &ConditionalExpr) -> String {
    match expr {
        ConditionalExpr::LogicalOr(chain) => chain.text(),
        ConditionalExpr::Ternary {
            cond,
            then_expr,
            else_expr,
            ..
        } => format!(
            "({} ? {} : {})",
            cond.text(),
            expression_text(then_expr),
            conditional_text(else_expr)
        ),
    }
}

/// Compact one-line rendering of an expression node.
trait ExprText {
    fn text(&self) -> String;
}

impl<T: ExprText> ExprText for ChainExpr<T> {
    fn text(&self) -> String {
        if self.is_single() {
            return self.head.text();
        }
        let mut text = format!("({}", self.head.text());
        for (op, next) in &self.tail {
            let _ = write!(text, " {} {}", op.as_str(), next.text());
        }
        text.push(')');
        text
    }
}

impl ExprText for CastExpr {
    fn text(&self) -> String {
        let mut text = unary_text(&self.operand);
        for cast in self.casts.iter().rev() {
            text = format!(
                "({}{}){text}",
                type_spec_text(&cast.type_spec),
                "*".repeat(cast.declarator.pointers.len())
            );
        }
        text
    }
}

fn unary_text(expr: &UnaryExpr) -> String {
    match expr {
        UnaryExpr::Postfix(postfix) => postfix_text(postfix),
        UnaryExpr::PreIncDec { op, operand, .. } => {
            let op = if *op == IncDec::Increment { "++" } else { "--" };
            format!("{op}{}", unary_text(operand))
        }
        UnaryExpr::Unary { op, operand, .. } => format!("{}{}", op.as_str(), operand.text()),
        UnaryExpr::SizeofExpr(operand, _) => format!("sizeof {}", unary_text(operand)),
        UnaryExpr::SizeofType(type_name, _) => format!(
            "sizeof({}{})",
            type_spec_text(&type_name.type_spec),
            "*".repeat(type_name.declarator.pointers.len())
        ),
    }
}

fn postfix_text(expr: &PostfixExpr) -> String {
    let mut text = match &expr.primary {
        PrimaryExpr::Identifier(name) => name.to_string(),
        PrimaryExpr::Constant(value) => value.to_string(),
        PrimaryExpr::StringLiteral(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        PrimaryExpr::Parenthesized(inner) => expression_text(inner),
    };
    for suffix in &expr.suffixes {
        match suffix {
            PostfixSuffix::Index(index) => {
                let _ = write!(text, "[{}]", expression_text(index));
            }
            PostfixSuffix::Call(args) => {
                let _ = write!(text, "({})", args.iter().map(assignment_text).join(", "));
            }
            PostfixSuffix::Member(name) => {
                let _ = write!(text, ".{name}");
            }
            PostfixSuffix::Arrow(name) => {
                let _ = write!(text, "->{name}");
            }
            PostfixSuffix::IncDec(IncDec::Increment) => text.push_str("++"),
            PostfixSuffix::IncDec(IncDec::Decrement) => text.push_str("--"),
        }
    }
    text
}
