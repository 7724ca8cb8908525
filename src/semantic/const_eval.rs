//! Constant expression evaluation
//!
//! Folds an expression to an integer at compile time. Global initializers
//! and every array bound go through here; anything that needs a run-time
//! value is a source error naming the offending construct.
//!
//! Chains are folded strictly left to right, applying each recorded
//! operator to the running value, the same order the generated code uses.

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};

use super::symbol_table::{Namespace, Storage, Symbol};
use super::Semantic;

/// Apply one binary operator to two folded operands.
///
/// Arithmetic wraps like the 64-bit machine instructions do; `>>` is
/// arithmetic, division truncates toward zero.
pub fn fold_binary(op: BinaryOp, lhs: i64, rhs: i64, line: u32) -> CompileResult<i64> {
    let value = match op {
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div | BinaryOp::Rem if rhs == 0 => {
            return Err(CompileError::source(line, "division by zero in constant expression"));
        }
        BinaryOp::Div => lhs.wrapping_div(rhs),
        BinaryOp::Rem => lhs.wrapping_rem(rhs),
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Shl => lhs.wrapping_shl(rhs as u32),
        BinaryOp::Shr => lhs.wrapping_shr(rhs as u32),
        BinaryOp::Lt => (lhs < rhs) as i64,
        BinaryOp::Gt => (lhs > rhs) as i64,
        BinaryOp::Le => (lhs <= rhs) as i64,
        BinaryOp::Ge => (lhs >= rhs) as i64,
        BinaryOp::Eq => (lhs == rhs) as i64,
        BinaryOp::Ne => (lhs != rhs) as i64,
        BinaryOp::BitAnd => lhs & rhs,
        BinaryOp::BitXor => lhs ^ rhs,
        BinaryOp::BitOr => lhs | rhs,
        BinaryOp::LogicalAnd => (lhs != 0 && rhs != 0) as i64,
        BinaryOp::LogicalOr => (lhs != 0 || rhs != 0) as i64,
    };
    Ok(value)
}

fn not_constant(line: u32, what: impl std::fmt::Display) -> CompileError {
    CompileError::source(line, format!("{what} is not a compile-time constant"))
}

/// Expression nodes that can be folded in constant mode.
trait ConstFold {
    fn fold(&self, sema: &mut Semantic) -> CompileResult<i64>;
}

impl<T: ConstFold> ConstFold for ChainExpr<T> {
    fn fold(&self, sema: &mut Semantic) -> CompileResult<i64> {
        let mut acc = self.head.fold(sema)?;
        for (op, operand) in &self.tail {
            // the right side of a decided && / || is never evaluated
            match op {
                BinaryOp::LogicalAnd if acc == 0 => continue,
                BinaryOp::LogicalOr if acc != 0 => {
                    acc = 1;
                    continue;
                }
                _ => {}
            }
            let rhs = operand.fold(sema)?;
            acc = fold_binary(*op, acc, rhs, self.line)?;
        }
        Ok(acc)
    }
}

impl ConstFold for CastExpr {
    fn fold(&self, sema: &mut Semantic) -> CompileResult<i64> {
        for cast in &self.casts {
            sema.resolve_type_name(cast)?;
        }
        self.operand.fold(sema)
    }
}

impl ConstFold for UnaryExpr {
    fn fold(&self, sema: &mut Semantic) -> CompileResult<i64> {
        match self {
            UnaryExpr::Postfix(postfix) => postfix.fold(sema),
            UnaryExpr::PreIncDec { line, .. } => Err(not_constant(*line, "increment/decrement")),
            UnaryExpr::Unary { op, operand, line } => {
                let value = match op {
                    UnaryOp::AddressOf => return Err(not_constant(*line, "address-of")),
                    UnaryOp::Deref => return Err(not_constant(*line, "dereference")),
                    UnaryOp::Plus => operand.fold(sema)?,
                    UnaryOp::Minus => operand.fold(sema)?.wrapping_neg(),
                    UnaryOp::BitNot => !operand.fold(sema)?,
                    UnaryOp::LogicalNot => (operand.fold(sema)? == 0) as i64,
                };
                Ok(value)
            }
            UnaryExpr::SizeofExpr(operand, line) => {
                let ty = sema.type_of_unary(operand)?;
                Ok(sema.registry.size_of(&ty, *line)? as i64)
            }
            UnaryExpr::SizeofType(type_name, line) => {
                let ty = sema.resolve_type_name(type_name)?;
                Ok(sema.registry.size_of(&ty, *line)? as i64)
            }
        }
    }
}

impl ConstFold for PostfixExpr {
    fn fold(&self, sema: &mut Semantic) -> CompileResult<i64> {
        if let Some(suffix) = self.suffixes.first() {
            let what = match suffix {
                PostfixSuffix::Index(_) => "array subscript",
                PostfixSuffix::Call(_) => "function call",
                PostfixSuffix::Member(_) | PostfixSuffix::Arrow(_) => "member access",
                PostfixSuffix::IncDec(_) => "increment/decrement",
            };
            return Err(not_constant(self.line, what));
        }
        match &self.primary {
            PrimaryExpr::Constant(value) => Ok(*value),
            PrimaryExpr::StringLiteral(_) => Err(not_constant(self.line, "string literal")),
            PrimaryExpr::Parenthesized(inner) => sema.fold_expression(inner),
            PrimaryExpr::Identifier(name) => match sema.scopes.lookup(Namespace::Ordinary, *name, self.line)? {
                Symbol::EnumConstant(value) => Ok(*value),
                Symbol::Variable {
                    storage: Storage::Global(_),
                    initial: Some(value),
                    ..
                } => Ok(*value),
                _ => Err(not_constant(self.line, format!("[{name}]"))),
            },
        }
    }
}

impl Semantic {
    pub fn fold_conditional(&mut self, expr: &ConditionalExpr) -> CompileResult<i64> {
        match expr {
            ConditionalExpr::LogicalOr(chain) => chain.fold(self),
            ConditionalExpr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                if cond.fold(self)? != 0 {
                    self.fold_expression(then_expr)
                } else {
                    self.fold_conditional(else_expr)
                }
            }
        }
    }

    pub fn fold_assignment(&mut self, expr: &AssignmentExpr) -> CompileResult<i64> {
        match expr {
            AssignmentExpr::Conditional(cond) => self.fold_conditional(cond),
            AssignmentExpr::Assign { line, .. } => Err(not_constant(*line, "assignment")),
        }
    }

    /// Fold a comma expression; the value is the last operand's.
    pub fn fold_expression(&mut self, expr: &Expression) -> CompileResult<i64> {
        let mut value = None;
        for item in &expr.items {
            value = Some(self.fold_assignment(item)?);
        }
        value.ok_or_else(|| CompileError::internal("empty comma expression"))
    }
}
