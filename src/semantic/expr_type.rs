//! Static expression types.
//!
//! `sizeof expr` needs the type of an expression without evaluating it.
//! The rules here match what the code generator produces for the same
//! expression.

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};

use super::symbol_table::{Namespace, Symbol};
use super::types::CType;
use super::Semantic;

/// Result type of `lhs op rhs` after array decay.
///
/// `ptr ± int` and `int + ptr` keep the pointer type, `ptr - ptr` is an
/// integer, every other operator yields an integer.
pub fn binary_result_type(op: BinaryOp, lhs: &CType, rhs: &CType) -> CType {
    let lhs = lhs.decay();
    let rhs = rhs.decay();
    match op {
        BinaryOp::Add | BinaryOp::Sub if lhs.is_pointer() && !rhs.is_pointer() => lhs,
        BinaryOp::Add if rhs.is_pointer() && !lhs.is_pointer() => rhs,
        _ => CType::int(),
    }
}

trait StaticType {
    fn static_type(&self, sema: &mut Semantic) -> CompileResult<CType>;
}

impl<T: StaticType> StaticType for ChainExpr<T> {
    fn static_type(&self, sema: &mut Semantic) -> CompileResult<CType> {
        let mut ty = self.head.static_type(sema)?;
        for (op, operand) in &self.tail {
            let rhs = operand.static_type(sema)?;
            ty = binary_result_type(*op, &ty, &rhs);
        }
        Ok(ty)
    }
}

impl StaticType for CastExpr {
    fn static_type(&self, sema: &mut Semantic) -> CompileResult<CType> {
        match self.casts.first() {
            Some(outermost) => sema.resolve_type_name(outermost),
            None => sema.type_of_unary(&self.operand),
        }
    }
}

impl Semantic {
    pub fn type_of_expression(&mut self, expr: &Expression) -> CompileResult<CType> {
        let mut ty = None;
        for item in &expr.items {
            ty = Some(self.type_of_assignment(item)?);
        }
        ty.ok_or_else(|| CompileError::internal("empty comma expression"))
    }

    pub fn type_of_assignment(&mut self, expr: &AssignmentExpr) -> CompileResult<CType> {
        match expr {
            AssignmentExpr::Conditional(cond) => self.type_of_conditional(cond),
            AssignmentExpr::Assign { target, .. } => self.type_of_unary(target),
        }
    }

    pub fn type_of_conditional(&mut self, expr: &ConditionalExpr) -> CompileResult<CType> {
        match expr {
            ConditionalExpr::LogicalOr(chain) => chain.static_type(self),
            ConditionalExpr::Ternary { then_expr, .. } => Ok(self.type_of_expression(then_expr)?.decay()),
        }
    }

    pub fn type_of_unary(&mut self, expr: &UnaryExpr) -> CompileResult<CType> {
        match expr {
            UnaryExpr::Postfix(postfix) => self.type_of_postfix(postfix),
            UnaryExpr::PreIncDec { operand, .. } => self.type_of_unary(operand),
            UnaryExpr::Unary { op, operand, line } => {
                let ty = operand.static_type(self)?;
                match op {
                    UnaryOp::AddressOf => Ok(ty.pointer_to()),
                    UnaryOp::Deref => ty.decay().deref().ok_or_else(|| {
                        CompileError::source(*line, format!("cannot dereference [{}]", self.registry.describe(&ty)))
                    }),
                    _ => Ok(CType::int()),
                }
            }
            UnaryExpr::SizeofExpr(..) | UnaryExpr::SizeofType(..) => Ok(CType::int()),
        }
    }

    fn type_of_postfix(&mut self, postfix: &PostfixExpr) -> CompileResult<CType> {
        let line = postfix.line;
        let mut suffixes = postfix.suffixes.iter().peekable();
        let mut ty = match &postfix.primary {
            PrimaryExpr::Constant(_) => CType::int(),
            // string literals evaluate to the address of their data label
            PrimaryExpr::StringLiteral(_) => CType::int().pointer_to(),
            PrimaryExpr::Parenthesized(inner) => self.type_of_expression(inner)?,
            PrimaryExpr::Identifier(name) => match self.scopes.lookup(Namespace::Ordinary, *name, line)? {
                Symbol::Variable { ty, .. } | Symbol::Array { ty, .. } => ty.clone(),
                Symbol::EnumConstant(_) => CType::int(),
                Symbol::Function(sig) => {
                    if !matches!(suffixes.peek(), Some(PostfixSuffix::Call(_))) {
                        return Err(CompileError::source(line, format!("[{name}] is a function")));
                    }
                    suffixes.next();
                    sig.ret.clone()
                }
                other => {
                    return Err(CompileError::source(
                        line,
                        format!("[{name}] is a {}, not a value", other.kind_name()),
                    ));
                }
            },
        };

        for suffix in suffixes {
            ty = match suffix {
                PostfixSuffix::Index(_) if ty.is_array() => ty.without_first_dim(),
                PostfixSuffix::Index(_) => ty
                    .deref()
                    .ok_or_else(|| CompileError::source(line, "subscripted value is not an array or pointer"))?,
                PostfixSuffix::Call(_) => {
                    return Err(CompileError::source(line, "called object is not a function"));
                }
                PostfixSuffix::Member(name) => self.member_type(&ty, *name, line)?,
                PostfixSuffix::Arrow(name) => {
                    let pointee = ty.decay().deref().ok_or_else(|| {
                        CompileError::source(line, format!("[->{name}] applied to a non-pointer"))
                    })?;
                    self.member_type(&pointee, *name, line)?
                }
                PostfixSuffix::IncDec(_) => ty,
            };
        }
        Ok(ty)
    }

    fn member_type(&self, ty: &CType, name: NameId, line: u32) -> CompileResult<CType> {
        let id = ty.record().ok_or_else(|| {
            CompileError::source(
                line,
                format!("[{name}] requested from [{}], which is not a struct", self.registry.describe(ty)),
            )
        })?;
        Ok(self.registry.member(id, name, line)?.ty.clone())
    }
}
