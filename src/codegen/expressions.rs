//! Expression code generation.
//!
//! Every expression produces an [`Operand`]. Chains of binary operators are
//! evaluated left to right into fresh temporaries; constants fold on the
//! spot when both sides are known. Temporaries stay reserved until the
//! enclosing statement releases them.

use log::trace;

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};
use crate::semantic::{CType, Namespace, Symbol, binary_result_type, fold_binary};

use super::CodeGen;
use super::frame::{Operand, Place, frame_slot};

/// One precedence level of the expression grammar.
trait Generate {
    fn generate(&self, cg: &mut CodeGen) -> CompileResult<Operand>;
}

impl<T: Generate> Generate for ChainExpr<T> {
    fn generate(&self, cg: &mut CodeGen) -> CompileResult<Operand> {
        let mut acc = self.head.generate(cg)?;
        for (op, operand) in &self.tail {
            acc = match op {
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => cg.short_circuit(*op, acc, operand)?,
                _ => {
                    let rhs = operand.generate(cg)?;
                    cg.combine(*op, acc, rhs, self.line)?
                }
            };
        }
        Ok(acc)
    }
}

impl Generate for CastExpr {
    fn generate(&self, cg: &mut CodeGen) -> CompileResult<Operand> {
        let mut value = cg.gen_unary(&self.operand)?;
        for cast in self.casts.iter().rev() {
            let ty = cg.sema.resolve_type_name(cast)?;
            if ty.record().is_some() || value.ty.record().is_some() {
                return Err(CompileError::source(self.line, "struct casts are not supported"));
            }
            value = match value.place {
                Place::Const(constant) if !ty.is_void() => Operand::new(Place::Const(constant), ty),
                _ => {
                    let spilled = cg.spill(value)?;
                    Operand::new(spilled.place, ty)
                }
            };
        }
        Ok(value)
    }
}

impl CodeGen {
    /// Comma expression: every operand is evaluated, the last one is the
    /// result.
    pub(crate) fn gen_expression(&mut self, expr: &Expression) -> CompileResult<Operand> {
        let mut result = None;
        for item in &expr.items {
            result = Some(self.gen_assignment(item)?);
        }
        result.ok_or_else(|| CompileError::internal("empty comma expression"))
    }

    pub(crate) fn gen_assignment(&mut self, expr: &AssignmentExpr) -> CompileResult<Operand> {
        let (target, op, value, line) = match expr {
            AssignmentExpr::Conditional(cond) => return self.gen_conditional(cond),
            AssignmentExpr::Assign {
                target,
                op,
                value,
                line,
            } => (target, op, value, line),
        };
        let line = *line;
        if *op != AssignOp::Assign {
            return Err(CompileError::source(
                line,
                format!("compound assignment '{}' is not supported", op.as_str()),
            ));
        }

        let value = self.gen_assignment(value)?;
        let value = self.spill(value)?;
        let target = self.gen_unary(target)?;
        if !target.is_lvalue() {
            return Err(CompileError::source(line, "lvalue required as left operand of assignment"));
        }
        if target.ty.is_const() {
            return Err(CompileError::source(line, "assignment to a const-qualified object"));
        }
        self.store(&target, &value, line)?;
        Ok(Operand::new(value.place, target.ty))
    }

    pub(crate) fn gen_conditional(&mut self, expr: &ConditionalExpr) -> CompileResult<Operand> {
        let (cond, then_expr, else_expr) = match expr {
            ConditionalExpr::LogicalOr(chain) => return chain.generate(self),
            ConditionalExpr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => (cond, then_expr, else_expr),
        };

        let id = self.next_label_id();
        let else_label = format!("cond_else_{id}");
        let over_label = format!("cond_over_{id}");
        let result = self.alloc_temp()?;
        let mark = self.frame()?.offset();

        let cond = cond.generate(self)?;
        self.load(&cond, "r10")?;
        self.stack_release_to(mark)?;
        self.emit("cmp r10, 0");
        self.emit(format_args!("je {else_label}"));

        let then_value = self.gen_expression(then_expr)?;
        self.load(&then_value, "r10")?;
        self.emit(format_args!("mov {}, r10", frame_slot(result)));
        self.stack_release_to(mark)?;
        self.emit(format_args!("jmp {over_label}"));

        self.emit_label(&else_label);
        let else_value = self.gen_conditional(else_expr)?;
        self.load(&else_value, "r10")?;
        self.emit(format_args!("mov {}, r10", frame_slot(result)));
        self.stack_release_to(mark)?;
        self.emit_label(&over_label);

        // a struct result is carried by address
        let place = if then_value.ty.record().is_some() {
            Place::Address(result)
        } else {
            Place::Slot(result)
        };
        Ok(Operand::new(place, then_value.ty.decay()))
    }

    /// Evaluate a condition and leave its value in `r10` with every
    /// temporary released.
    pub(crate) fn gen_condition(&mut self, expr: &Expression) -> CompileResult<()> {
        let mark = self.frame()?.offset();
        let value = self.gen_expression(expr)?;
        if value.ty.record().is_some() {
            return Err(CompileError::source(expr.line, "struct used where a scalar is required"));
        }
        self.load(&value, "r10")?;
        self.stack_release_to(mark)
    }

    fn short_circuit(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: &impl Generate,
    ) -> CompileResult<Operand> {
        let (prefix, jump, decided) = match op {
            BinaryOp::LogicalAnd => ("and", "je", 0),
            _ => ("or", "jne", 1),
        };
        let id = self.next_label_id();
        let decided_label = if decided == 0 {
            format!("{prefix}_false_{id}")
        } else {
            format!("{prefix}_true_{id}")
        };
        let over_label = format!("{prefix}_over_{id}");

        let result = self.alloc_temp()?;
        let slot = frame_slot(result);
        let mark = self.frame()?.offset();
        self.load(&lhs, "r10")?;
        self.emit("cmp r10, 0");
        self.emit(format_args!("{jump} {decided_label}"));

        let rhs = rhs.generate(self)?;
        self.load(&rhs, "r11")?;
        self.stack_release_to(mark)?;
        self.emit("cmp r11, 0");
        self.emit(format_args!("{jump} {decided_label}"));
        self.emit(format_args!("mov r10, {}", 1 - decided));
        self.emit(format_args!("mov {slot}, r10"));
        self.emit(format_args!("jmp {over_label}"));

        self.emit_label(&decided_label);
        self.emit(format_args!("mov r10, {decided}"));
        self.emit(format_args!("mov {slot}, r10"));
        self.emit_label(&over_label);
        Ok(Operand::new(Place::Slot(result), CType::int()))
    }

    /// `lhs op rhs` for every operator except `&&` and `||`.
    fn combine(&mut self, op: BinaryOp, lhs: Operand, rhs: Operand, line: u32) -> CompileResult<Operand> {
        if lhs.ty.record().is_some() || rhs.ty.record().is_some() {
            return Err(CompileError::source(
                line,
                format!("invalid struct operand to binary {}", op.as_str()),
            ));
        }
        let result_ty = binary_result_type(op, &lhs.ty, &rhs.ty);
        if let (Place::Const(l), Place::Const(r)) = (&lhs.place, &rhs.place) {
            let value = fold_binary(op, *l, *r, line)?;
            trace!("folded {l} {} {r} = {value}", op.as_str());
            return Ok(Operand::new(Place::Const(value), result_ty));
        }

        let lhs_ty = lhs.ty.decay();
        let rhs_ty = rhs.ty.decay();
        self.load(&lhs, "r10")?;
        self.load(&rhs, "r11")?;
        match op {
            BinaryOp::Add | BinaryOp::Sub if lhs_ty.is_pointer() && rhs_ty.is_pointer() => {
                if op == BinaryOp::Add {
                    return Err(CompileError::source(line, "cannot add two pointers"));
                }
                self.emit("sub r10, r11");
                let size = self.sema.registry.pointee_size(&lhs_ty, line)?;
                if size > 1 {
                    self.emit("mov rax, r10");
                    self.emit("cqo");
                    self.emit(format_args!("mov r11, {size}"));
                    self.emit("idiv r11");
                    self.emit("mov r10, rax");
                }
            }
            BinaryOp::Add | BinaryOp::Sub if lhs_ty.is_pointer() => {
                let size = self.sema.registry.pointee_size(&lhs_ty, line)?;
                if size > 1 {
                    self.emit(format_args!("imul r11, {size}"));
                }
                self.emit(format_args!("{} r10, r11", if op == BinaryOp::Add { "add" } else { "sub" }));
            }
            BinaryOp::Add if rhs_ty.is_pointer() => {
                let size = self.sema.registry.pointee_size(&rhs_ty, line)?;
                if size > 1 {
                    self.emit(format_args!("imul r10, {size}"));
                }
                self.emit("add r10, r11");
            }
            BinaryOp::Add => self.emit("add r10, r11"),
            BinaryOp::Sub => self.emit("sub r10, r11"),
            BinaryOp::Mul => self.emit("imul r10, r11"),
            BinaryOp::Div | BinaryOp::Rem => {
                self.emit("mov rax, r10");
                self.emit("cqo");
                self.emit("idiv r11");
                self.emit(if op == BinaryOp::Div { "mov r10, rax" } else { "mov r10, rdx" });
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                self.emit("mov rcx, r11");
                self.emit(if op == BinaryOp::Shl { "shl r10, cl" } else { "sar r10, cl" });
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
                let set = match op {
                    BinaryOp::Lt => "setl",
                    BinaryOp::Gt => "setg",
                    BinaryOp::Le => "setle",
                    BinaryOp::Ge => "setge",
                    BinaryOp::Eq => "sete",
                    _ => "setne",
                };
                self.emit("cmp r10, r11");
                self.emit(format_args!("{set} r10b"));
                self.emit("movzx r10, r10b");
            }
            BinaryOp::BitAnd => self.emit("and r10, r11"),
            BinaryOp::BitXor => self.emit("xor r10, r11"),
            BinaryOp::BitOr => self.emit("or r10, r11"),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                return Err(CompileError::internal("logical operator reached combine"));
            }
        }
        let slot = self.store_temp("r10")?;
        Ok(Operand::new(Place::Slot(slot), result_ty))
    }

    pub(crate) fn gen_unary(&mut self, expr: &UnaryExpr) -> CompileResult<Operand> {
        match expr {
            UnaryExpr::Postfix(postfix) => self.gen_postfix(postfix),
            UnaryExpr::PreIncDec { op, operand, line } => {
                let target = self.gen_unary(operand)?;
                self.inc_dec(target, *op, true, *line)
            }
            UnaryExpr::Unary { op, operand, line } => {
                let value = operand.generate(self)?;
                self.gen_unary_op(*op, value, *line)
            }
            UnaryExpr::SizeofExpr(operand, line) => {
                let ty = self.sema.type_of_unary(operand)?;
                Ok(Operand::constant(self.sema.registry.size_of(&ty, *line)? as i64))
            }
            UnaryExpr::SizeofType(type_name, line) => {
                let ty = self.sema.resolve_type_name(type_name)?;
                Ok(Operand::constant(self.sema.registry.size_of(&ty, *line)? as i64))
            }
        }
    }

    fn gen_unary_op(&mut self, op: UnaryOp, value: Operand, line: u32) -> CompileResult<Operand> {
        match op {
            UnaryOp::AddressOf => {
                self.load_address(&value, "r10", line)?;
                let slot = self.store_temp("r10")?;
                return Ok(Operand::new(Place::Slot(slot), value.ty.pointer_to()));
            }
            UnaryOp::Deref => {
                let Some(pointee) = value.ty.decay().deref() else {
                    return Err(CompileError::source(
                        line,
                        format!("cannot dereference [{}]", self.sema.registry.describe(&value.ty)),
                    ));
                };
                if pointee.is_void() {
                    return Err(CompileError::source(line, "dereferencing a void pointer"));
                }
                self.load(&value, "r10")?;
                return self.address_in("r10", pointee);
            }
            _ => {}
        }

        if value.ty.record().is_some() {
            return Err(CompileError::source(
                line,
                format!("invalid struct operand to unary {}", op.as_str()),
            ));
        }
        if let Place::Const(constant) = value.place {
            let folded = match op {
                UnaryOp::Minus => constant.wrapping_neg(),
                UnaryOp::BitNot => !constant,
                UnaryOp::LogicalNot => (constant == 0) as i64,
                _ => constant,
            };
            return Ok(Operand::constant(folded));
        }

        self.load(&value, "r10")?;
        match op {
            UnaryOp::Minus => self.emit("neg r10"),
            UnaryOp::BitNot => self.emit("not r10"),
            UnaryOp::LogicalNot => {
                self.emit("cmp r10, 0");
                self.emit("sete r10b");
                self.emit("movzx r10, r10b");
            }
            _ => {}
        }
        let ty = if op == UnaryOp::LogicalNot { CType::int() } else { value.ty.decay() };
        let slot = self.store_temp("r10")?;
        Ok(Operand::new(Place::Slot(slot), ty))
    }

    /// `++`/`--` on an lvalue; pointers step by the pointee size.
    fn inc_dec(&mut self, target: Operand, op: IncDec, prefix: bool, line: u32) -> CompileResult<Operand> {
        if !target.is_lvalue() {
            return Err(CompileError::source(line, "lvalue required as increment operand"));
        }
        if target.ty.is_const() {
            return Err(CompileError::source(line, "increment of a const-qualified object"));
        }
        let step = if target.ty.is_pointer() {
            self.sema.registry.pointee_size(&target.ty, line)?
        } else if target.ty.is_integer() {
            1
        } else {
            return Err(CompileError::source(
                line,
                format!("cannot increment [{}]", self.sema.registry.describe(&target.ty)),
            ));
        };
        let instruction = match op {
            IncDec::Increment => "add",
            IncDec::Decrement => "sub",
        };

        self.load_address(&target, "r11", line)?;
        self.emit("mov rax, [r11]");
        let old = if prefix { None } else { Some(self.store_temp("rax")?) };
        self.emit(format_args!("{instruction} rax, {step}"));
        self.emit("mov [r11], rax");
        let slot = match old {
            Some(slot) => slot,
            None => self.store_temp("rax")?,
        };
        Ok(Operand::new(Place::Slot(slot), target.ty))
    }

    fn gen_postfix(&mut self, postfix: &PostfixExpr) -> CompileResult<Operand> {
        let line = postfix.line;
        let mut suffixes = postfix.suffixes.iter().peekable();
        let mut operand = match &postfix.primary {
            PrimaryExpr::Constant(value) => Operand::constant(*value),
            PrimaryExpr::StringLiteral(bytes) => {
                let label = self.intern_string(bytes);
                self.emit(format_args!("lea r10, {label}"));
                let slot = self.store_temp("r10")?;
                Operand::new(Place::Slot(slot), CType::int().pointer_to())
            }
            PrimaryExpr::Parenthesized(inner) => self.gen_expression(inner)?,
            PrimaryExpr::Identifier(name) => {
                let symbol = self.sema.scopes.lookup(Namespace::Ordinary, *name, line)?.clone();
                match symbol {
                    Symbol::Variable { ty, storage, .. } | Symbol::Array { ty, storage } => {
                        Operand::new(Place::Var(storage), ty)
                    }
                    Symbol::EnumConstant(value) => Operand::constant(value),
                    Symbol::Function(sig) => match suffixes.next() {
                        Some(PostfixSuffix::Call(args)) => self.gen_call(&sig, args, line)?,
                        _ => {
                            return Err(CompileError::source(
                                line,
                                format!("[{name}] is a function and can only be called"),
                            ));
                        }
                    },
                    other => {
                        return Err(CompileError::source(
                            line,
                            format!("[{name}] is a {}, not a value", other.kind_name()),
                        ));
                    }
                }
            }
        };

        for suffix in suffixes {
            operand = match suffix {
                PostfixSuffix::Index(index) => {
                    let index = self.gen_expression(index)?;
                    self.index(operand, index, line)?
                }
                PostfixSuffix::Call(_) => {
                    return Err(CompileError::source(line, "called object is not a function"));
                }
                PostfixSuffix::Member(name) => self.member(operand, *name, line)?,
                PostfixSuffix::Arrow(name) => self.arrow(operand, *name, line)?,
                PostfixSuffix::IncDec(op) => self.inc_dec(operand, *op, false, line)?,
            };
        }
        Ok(operand)
    }
}
