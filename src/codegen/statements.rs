//! Statement code generation.
//!
//! Each statement releases the temporaries it allocated before the next one
//! starts, so the tracked frame offset at any statement boundary is the
//! space taken by the locals of the enclosing blocks. Labels that can be
//! reached from a different depth (user labels, `case`) resynchronize `rsp`
//! from that offset.

use std::collections::VecDeque;

use hashbrown::HashSet;
use log::trace;

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};

use super::{CodeGen, JumpTarget, SwitchContext};

/// `case` values and `default` labels of one switch body, outside nested
/// switches, in source order.
#[derive(Debug, Default)]
struct CaseCollector<'a> {
    cases: Vec<&'a ConditionalExpr>,
    case_lines: Vec<u32>,
    default_lines: Vec<u32>,
}

impl<'a> CaseCollector<'a> {
    fn visit(&mut self, stmt: &'a Statement) {
        match stmt {
            Statement::Labeled(LabeledStatement::Case { value, body, line }) => {
                self.cases.push(value);
                self.case_lines.push(*line);
                self.visit(body);
            }
            Statement::Labeled(LabeledStatement::Default { body, line }) => {
                self.default_lines.push(*line);
                self.visit(body);
            }
            Statement::Labeled(LabeledStatement::Label { body, .. }) => self.visit(body),
            Statement::Compound(compound) => {
                for item in &compound.items {
                    if let BlockItem::Statement(stmt) = item {
                        self.visit(stmt);
                    }
                }
            }
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.visit(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit(else_branch);
                }
            }
            Statement::While { body, .. } | Statement::DoWhile { body, .. } | Statement::For { body, .. } => {
                self.visit(body)
            }
            Statement::Switch { .. }
            | Statement::Expression(..)
            | Statement::Goto(..)
            | Statement::Continue(_)
            | Statement::Break(_)
            | Statement::Return(..) => {}
        }
    }
}

impl CodeGen {
    pub(crate) fn gen_block_item(&mut self, item: &BlockItem) -> CompileResult<()> {
        match item {
            BlockItem::Declaration(declaration) => self.gen_declaration(declaration),
            BlockItem::Statement(stmt) => self.gen_statement(stmt),
        }
    }

    pub(crate) fn gen_statement(&mut self, stmt: &Statement) -> CompileResult<()> {
        match stmt {
            Statement::Labeled(labeled) => self.gen_labeled(labeled),
            Statement::Compound(compound) => self.gen_compound(compound),
            Statement::Expression(None, _) => Ok(()),
            Statement::Expression(Some(expr), _) => {
                let mark = self.frame()?.offset();
                self.gen_expression(expr)?;
                self.stack_release_to(mark)
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let id = self.next_label_id();
                let not_label = format!("if_not_{id}");
                self.gen_condition(cond)?;
                self.emit("cmp r10, 0");
                self.emit(format_args!("je {not_label}"));
                self.gen_statement(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let over_label = format!("if_over_{id}");
                        self.emit(format_args!("jmp {over_label}"));
                        self.emit_label(&not_label);
                        self.gen_statement(else_branch)?;
                        self.emit_label(&over_label);
                    }
                    None => self.emit_label(&not_label),
                }
                Ok(())
            }
            Statement::Switch { cond, body, line } => self.gen_switch(cond, body, *line),
            Statement::While { cond, body, .. } => {
                let id = self.next_label_id();
                let start = format!("loop_start_{id}");
                let over = format!("loop_over_{id}");
                self.emit_label(&start);
                self.gen_condition(cond)?;
                self.emit("cmp r10, 0");
                self.emit(format_args!("je {over}"));
                self.gen_loop_body(body, &over, &start)?;
                self.emit(format_args!("jmp {start}"));
                self.emit_label(&over);
                Ok(())
            }
            Statement::DoWhile { body, cond, .. } => {
                let id = self.next_label_id();
                let start = format!("loop_start_{id}");
                let next = format!("loop_next_{id}");
                let over = format!("loop_over_{id}");
                self.emit_label(&start);
                self.gen_loop_body(body, &over, &next)?;
                self.emit_label(&next);
                self.gen_condition(cond)?;
                self.emit("cmp r10, 0");
                self.emit(format_args!("jne {start}"));
                self.emit_label(&over);
                Ok(())
            }
            Statement::For {
                init,
                cond,
                step,
                body,
                ..
            } => self.gen_for(init, cond.as_ref(), step.as_ref(), body),
            Statement::Goto(label, _) => {
                self.emit(format_args!("jmp {label}"));
                Ok(())
            }
            Statement::Continue(line) => {
                let Some(target) = self.jump_targets.iter().rev().find(|t| t.continue_label.is_some()).cloned() else {
                    return Err(CompileError::source(*line, "continue statement not within a loop"));
                };
                self.jump_out(target.offset, target.continue_label.as_deref().unwrap_or_default())
            }
            Statement::Break(line) => {
                let Some(target) = self.jump_targets.last().cloned() else {
                    return Err(CompileError::source(*line, "break statement not within loop or switch"));
                };
                self.jump_out(target.offset, &target.break_label)
            }
            Statement::Return(value, line) => self.gen_return(value.as_ref(), *line),
        }
    }

    pub(crate) fn gen_compound(&mut self, compound: &CompoundStatement) -> CompileResult<()> {
        let mark = self.frame()?.offset();
        self.sema.scopes.push_scope();
        for item in &compound.items {
            self.gen_block_item(item)?;
        }
        self.sema.scopes.pop_scope()?;
        self.stack_release_to(mark)
    }

    fn gen_labeled(&mut self, labeled: &LabeledStatement) -> CompileResult<()> {
        match labeled {
            LabeledStatement::Label { name, body, .. } => {
                self.emit_label(&name.to_string());
                self.sync_stack()?;
                self.gen_statement(body)
            }
            LabeledStatement::Case { body, line, .. } => {
                let label = self
                    .switches
                    .last_mut()
                    .and_then(|switch| switch.case_labels.pop_front())
                    .ok_or_else(|| CompileError::source(*line, "case label not within a switch statement"))?;
                self.emit_label(&label);
                self.sync_stack()?;
                self.gen_statement(body)
            }
            LabeledStatement::Default { body, line } => {
                let label = self
                    .switches
                    .last_mut()
                    .and_then(|switch| switch.default_label.take())
                    .ok_or_else(|| CompileError::source(*line, "default label not within a switch statement"))?;
                self.emit_label(&label);
                self.sync_stack()?;
                self.gen_statement(body)
            }
        }
    }

    /// Body of a loop with `break`/`continue` targets registered.
    fn gen_loop_body(&mut self, body: &Statement, break_label: &str, continue_label: &str) -> CompileResult<()> {
        let offset = self.frame()?.offset();
        self.jump_targets.push(JumpTarget {
            break_label: break_label.to_string(),
            continue_label: Some(continue_label.to_string()),
            offset,
        });
        let result = self.gen_statement(body);
        self.jump_targets.pop();
        result
    }

    fn gen_for(
        &mut self,
        init: &ForInit,
        cond: Option<&Expression>,
        step: Option<&Expression>,
        body: &Statement,
    ) -> CompileResult<()> {
        let mark = self.frame()?.offset();
        self.sema.scopes.push_scope();
        match init {
            ForInit::None => {}
            ForInit::Declaration(declaration) => self.gen_declaration(declaration)?,
            ForInit::Expression(expr) => {
                let before = self.frame()?.offset();
                self.gen_expression(expr)?;
                self.stack_release_to(before)?;
            }
        }

        let id = self.next_label_id();
        let start = format!("loop_start_{id}");
        let next = format!("loop_next_{id}");
        let over = format!("loop_over_{id}");
        self.emit_label(&start);
        if let Some(cond) = cond {
            self.gen_condition(cond)?;
            self.emit("cmp r10, 0");
            self.emit(format_args!("je {over}"));
        }
        self.gen_loop_body(body, &over, &next)?;
        self.emit_label(&next);
        if let Some(step) = step {
            let before = self.frame()?.offset();
            self.gen_expression(step)?;
            self.stack_release_to(before)?;
        }
        self.emit(format_args!("jmp {start}"));
        self.emit_label(&over);

        self.sema.scopes.pop_scope()?;
        self.stack_release_to(mark)
    }

    fn gen_switch(&mut self, cond: &Expression, body: &Statement, line: u32) -> CompileResult<()> {
        let mut collector = CaseCollector::default();
        collector.visit(body);
        if collector.default_lines.len() > 1 {
            return Err(CompileError::source(
                collector.default_lines[1],
                "multiple default labels in one switch",
            ));
        }

        let mut seen = HashSet::new();
        let mut dispatch = Vec::with_capacity(collector.cases.len());
        for (value, case_line) in collector.cases.iter().zip(&collector.case_lines) {
            let value = self.sema.fold_conditional(value)?;
            if !seen.insert(value) {
                return Err(CompileError::source(*case_line, format!("duplicate case value {value}")));
            }
            dispatch.push((value, self.new_label("switch_case")));
        }
        let over = self.new_label("switch_over");
        let default_label = if collector.default_lines.is_empty() {
            None
        } else {
            Some(self.new_label("switch_default"))
        };
        trace!("switch at line {line}: {} cases", dispatch.len());

        self.gen_condition(cond)?;
        for (value, label) in &dispatch {
            self.emit(format_args!("mov r11, {value}"));
            self.emit("cmp r10, r11");
            self.emit(format_args!("je {label}"));
        }
        self.emit(format_args!("jmp {}", default_label.as_deref().unwrap_or(over.as_str())));

        let offset = self.frame()?.offset();
        self.switches.push(SwitchContext {
            case_labels: dispatch.into_iter().map(|(_, label)| label).collect::<VecDeque<_>>(),
            default_label,
        });
        self.jump_targets.push(JumpTarget {
            break_label: over.clone(),
            continue_label: None,
            offset,
        });
        let result = self.gen_statement(body);
        self.jump_targets.pop();
        self.switches.pop();
        result?;
        self.emit_label(&over);
        Ok(())
    }

    /// `break`/`continue`: drop locals of the blocks being left, then jump.
    fn jump_out(&mut self, offset: i64, label: &str) -> CompileResult<()> {
        if self.frame()?.offset() != offset {
            self.emit(format_args!("lea rsp, [rbp - {offset}]"));
        }
        self.emit(format_args!("jmp {label}"));
        Ok(())
    }

    fn gen_return(&mut self, value: Option<&Expression>, line: u32) -> CompileResult<()> {
        let returns_void = self.frame()?.ret.is_void();
        let mark = self.frame()?.offset();
        match value {
            Some(expr) => {
                if returns_void {
                    return Err(CompileError::source(line, "void function returns a value"));
                }
                let result = self.gen_expression(expr)?;
                if result.ty.record().is_some() {
                    return Err(CompileError::source(line, "struct return values are not supported"));
                }
                self.load(&result, "rax")?;
            }
            None => self.emit("xor rax, rax"),
        }
        self.emit("leave");
        self.emit("ret 0");
        // nothing after `ret` runs; only the bookkeeping is unwound
        let extra = self.frame()?.offset() - mark;
        self.frame_mut()?.release(extra)
    }
}
