//! Abstract syntax tree for the supported C subset.
//!
//! Every grammar alternative has its own variant so that the code generator
//! can match exhaustively. Nodes own their children and remember the source
//! line they started on.
//!
//! Binary operators of one precedence level are stored flat in a
//! [`ChainExpr`]: an operand list plus the operator joining each adjacent
//! pair, evaluated strictly left to right.

use bitflags::bitflags;

pub mod dumper;

/// Interned identifier.
pub type NameId = symbol_table::GlobalSymbol;

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub items: Vec<ExternalDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDeclaration {
    Function(FunctionDefinition),
    Declaration(Declaration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub body: CompoundStatement,
    pub line: u32,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub specifiers: DeclSpecifiers,
    pub declarators: Vec<InitDeclarator>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Auto,
    Register,
    Static,
    Extern,
    Typedef,
}

bitflags! {
    /// Type qualifiers attached to a base type or a pointer level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeQualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclSpecifiers {
    pub storage: Option<StorageClass>,
    pub type_spec: TypeSpecifier,
    pub qualifiers: TypeQualifiers,
    pub line: u32,
}

/// Basic type keywords after combination (`unsigned long int` is one `Long`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpecifier {
    Basic(BasicType),
    Record(RecordSpecifier),
    Enum(EnumSpecifier),
    TypedefName(NameId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSpecifier {
    pub kind: RecordKind,
    pub name: Option<NameId>,
    /// `None` for a reference by name, `Some` for a definition.
    pub members: Option<Vec<MemberDeclaration>>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDeclaration {
    pub type_spec: TypeSpecifier,
    pub qualifiers: TypeQualifiers,
    pub declarators: Vec<MemberDeclarator>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDeclarator {
    pub declarator: Option<Declarator>,
    pub bit_width: Option<ConditionalExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSpecifier {
    pub name: Option<NameId>,
    pub enumerators: Option<Vec<Enumerator>>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enumerator {
    pub name: NameId,
    pub value: Option<ConditionalExpr>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub init: Option<Initializer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// One entry per `*`, outermost first.
    pub pointers: Vec<TypeQualifiers>,
    pub name: NameId,
    pub suffix: DeclaratorSuffix,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclaratorSuffix {
    None,
    /// One bound per `[...]`; `None` for `[]`.
    Array(Vec<Option<ConditionalExpr>>),
    Function(ParameterList),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterList {
    pub params: Vec<ParameterDeclaration>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDeclaration {
    pub specifiers: DeclSpecifiers,
    pub declarator: ParamDeclarator,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamDeclarator {
    Named(Declarator),
    Abstract(AbstractDeclarator),
}

/// Declarator without a name, used by type names and unnamed parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AbstractDeclarator {
    pub pointers: Vec<TypeQualifiers>,
    pub dims: Vec<Option<ConditionalExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub type_spec: TypeSpecifier,
    pub qualifiers: TypeQualifiers,
    pub declarator: AbstractDeclarator,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(AssignmentExpr),
    List(Vec<InitializerItem>, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializerItem {
    pub designators: Vec<Designator>,
    pub init: Initializer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Designator {
    Index(ConditionalExpr),
    Member(NameId),
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundStatement {
    pub items: Vec<BlockItem>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    Declaration(Declaration),
    Statement(Statement),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Labeled(LabeledStatement),
    Compound(CompoundStatement),
    Expression(Option<Expression>, u32),
    If {
        cond: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        line: u32,
    },
    Switch {
        cond: Expression,
        body: Box<Statement>,
        line: u32,
    },
    While {
        cond: Expression,
        body: Box<Statement>,
        line: u32,
    },
    DoWhile {
        body: Box<Statement>,
        cond: Expression,
        line: u32,
    },
    For {
        init: ForInit,
        cond: Option<Expression>,
        step: Option<Expression>,
        body: Box<Statement>,
        line: u32,
    },
    Goto(NameId, u32),
    Continue(u32),
    Break(u32),
    Return(Option<Expression>, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabeledStatement {
    Label {
        name: NameId,
        body: Box<Statement>,
        line: u32,
    },
    Case {
        value: ConditionalExpr,
        body: Box<Statement>,
        line: u32,
    },
    Default {
        body: Box<Statement>,
        line: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    None,
    Declaration(Declaration),
    Expression(Expression),
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Comma expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub items: Vec<AssignmentExpr>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    And,
    Xor,
    Or,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::And => "&=",
            AssignOp::Xor => "^=",
            AssignOp::Or => "|=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentExpr {
    Conditional(ConditionalExpr),
    Assign {
        target: UnaryExpr,
        op: AssignOp,
        value: Box<AssignmentExpr>,
        line: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalExpr {
    LogicalOr(LogicalOrExpr),
    Ternary {
        cond: LogicalOrExpr,
        then_expr: Box<Expression>,
        else_expr: Box<ConditionalExpr>,
        line: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }
}

/// Flattened left-associative operator sequence at one precedence level.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainExpr<T> {
    pub head: Box<T>,
    pub tail: Vec<(BinaryOp, T)>,
    pub line: u32,
}

impl<T> ChainExpr<T> {
    pub fn single(head: T, line: u32) -> Self {
        ChainExpr {
            head: Box::new(head),
            tail: Vec::new(),
            line,
        }
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn is_single(&self) -> bool {
        self.tail.is_empty()
    }

    pub fn operands(&self) -> impl Iterator<Item = &T> {
        std::iter::once(self.head.as_ref()).chain(self.tail.iter().map(|(_, operand)| operand))
    }
}

pub type LogicalOrExpr = ChainExpr<LogicalAndExpr>;
pub type LogicalAndExpr = ChainExpr<InclusiveOrExpr>;
pub type InclusiveOrExpr = ChainExpr<ExclusiveOrExpr>;
pub type ExclusiveOrExpr = ChainExpr<AndExpr>;
pub type AndExpr = ChainExpr<EqualityExpr>;
pub type EqualityExpr = ChainExpr<RelationalExpr>;
pub type RelationalExpr = ChainExpr<ShiftExpr>;
pub type ShiftExpr = ChainExpr<AdditiveExpr>;
pub type AdditiveExpr = ChainExpr<MultiplicativeExpr>;
pub type MultiplicativeExpr = ChainExpr<CastExpr>;

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    /// Casts in source order, innermost last.
    pub casts: Vec<TypeName>,
    pub operand: UnaryExpr,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDec {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    AddressOf,
    Deref,
    Plus,
    Minus,
    BitNot,
    LogicalNot,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::LogicalNot => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryExpr {
    Postfix(PostfixExpr),
    PreIncDec {
        op: IncDec,
        operand: Box<UnaryExpr>,
        line: u32,
    },
    Unary {
        op: UnaryOp,
        operand: Box<CastExpr>,
        line: u32,
    },
    SizeofExpr(Box<UnaryExpr>, u32),
    SizeofType(TypeName, u32),
}

impl UnaryExpr {
    pub fn line(&self) -> u32 {
        match self {
            UnaryExpr::Postfix(postfix) => postfix.line,
            UnaryExpr::PreIncDec { line, .. }
            | UnaryExpr::Unary { line, .. }
            | UnaryExpr::SizeofExpr(_, line)
            | UnaryExpr::SizeofType(_, line) => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostfixExpr {
    pub primary: PrimaryExpr,
    pub suffixes: Vec<PostfixSuffix>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostfixSuffix {
    Index(Expression),
    Call(Vec<AssignmentExpr>),
    Member(NameId),
    Arrow(NameId),
    IncDec(IncDec),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryExpr {
    Identifier(NameId),
    Constant(i64),
    StringLiteral(Vec<u8>),
    Parenthesized(Box<Expression>),
}

impl AssignmentExpr {
    pub fn line(&self) -> u32 {
        match self {
            AssignmentExpr::Conditional(cond) => cond.line(),
            AssignmentExpr::Assign { line, .. } => *line,
        }
    }
}

impl ConditionalExpr {
    pub fn line(&self) -> u32 {
        match self {
            ConditionalExpr::LogicalOr(chain) => chain.line,
            ConditionalExpr::Ternary { line, .. } => *line,
        }
    }
}

/// Nodes that may reduce to a lone primary expression.
trait SolePrimary {
    fn sole_primary(&self) -> Option<&PrimaryExpr>;
}

impl<T: SolePrimary> SolePrimary for ChainExpr<T> {
    fn sole_primary(&self) -> Option<&PrimaryExpr> {
        if self.is_single() { self.head.sole_primary() } else { None }
    }
}

impl SolePrimary for CastExpr {
    fn sole_primary(&self) -> Option<&PrimaryExpr> {
        match &self.operand {
            UnaryExpr::Postfix(postfix) if self.casts.is_empty() && postfix.suffixes.is_empty() => {
                match &postfix.primary {
                    PrimaryExpr::Parenthesized(inner) if inner.items.len() == 1 => inner.items[0].sole_primary(),
                    primary => Some(primary),
                }
            }
            _ => None,
        }
    }
}

impl AssignmentExpr {
    fn sole_primary(&self) -> Option<&PrimaryExpr> {
        match self {
            AssignmentExpr::Conditional(ConditionalExpr::LogicalOr(chain)) => chain.sole_primary(),
            _ => None,
        }
    }

    /// The bytes of a bare (possibly parenthesized) string literal.
    pub fn as_string_literal(&self) -> Option<&[u8]> {
        match self.sole_primary()? {
            PrimaryExpr::StringLiteral(bytes) => Some(bytes),
            _ => None,
        }
    }
}
