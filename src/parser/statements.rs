//! Statement productions.

use crate::ast::*;

use super::{PResult, Parser};

impl<'src> Parser<'src> {
    /// `{ block-item* }`. Typedef names declared inside stay local to the
    /// block.
    pub(crate) fn parse_compound_statement(&mut self) -> PResult<CompoundStatement> {
        self.rule("compound_statement", |p| {
            let line = p.start_line();
            if !p.scanner.eat("{") {
                return Ok(None);
            }
            p.enter_typedef_scope();
            let mut items = Vec::new();
            while let Some(item) = p.parse_block_item()? {
                items.push(item);
            }
            if !p.scanner.eat("}") {
                return Ok(None);
            }
            p.leave_typedef_scope();
            Ok(Some(CompoundStatement { items, line }))
        })
    }

    fn parse_block_item(&mut self) -> PResult<BlockItem> {
        self.rule("block_item", |p| {
            if let Some(declaration) = p.parse_declaration()? {
                return Ok(Some(BlockItem::Declaration(declaration)));
            }
            Ok(p.parse_statement()?.map(BlockItem::Statement))
        })
    }

    pub(crate) fn parse_statement(&mut self) -> PResult<Statement> {
        self.nested("statement", |p| {
            if let Some(labeled) = p.parse_labeled_statement()? {
                return Ok(Some(Statement::Labeled(labeled)));
            }
            if let Some(compound) = p.parse_compound_statement()? {
                return Ok(Some(Statement::Compound(compound)));
            }
            if let Some(statement) = p.parse_selection_statement()? {
                return Ok(Some(statement));
            }
            if let Some(statement) = p.parse_iteration_statement()? {
                return Ok(Some(statement));
            }
            if let Some(statement) = p.parse_jump_statement()? {
                return Ok(Some(statement));
            }
            p.parse_expression_statement()
        })
    }

    fn parse_labeled_statement(&mut self) -> PResult<LabeledStatement> {
        self.rule("labeled_statement", |p| {
            let line = p.start_line();
            if p.scanner.eat_keyword("case") {
                let Some(value) = p.parse_constant_expression()? else {
                    return Ok(None);
                };
                if !p.scanner.eat(":") {
                    return Ok(None);
                }
                let Some(body) = p.parse_statement()? else {
                    return Ok(None);
                };
                return Ok(Some(LabeledStatement::Case {
                    value,
                    body: Box::new(body),
                    line,
                }));
            }
            if p.scanner.eat_keyword("default") {
                if !p.scanner.eat(":") {
                    return Ok(None);
                }
                let Some(body) = p.parse_statement()? else {
                    return Ok(None);
                };
                return Ok(Some(LabeledStatement::Default {
                    body: Box::new(body),
                    line,
                }));
            }

            let Some(name) = p.identifier() else {
                return Ok(None);
            };
            if !p.scanner.eat_punct(":", b":") {
                return Ok(None);
            }
            let Some(body) = p.parse_statement()? else {
                return Ok(None);
            };
            Ok(Some(LabeledStatement::Label {
                name,
                body: Box::new(body),
                line,
            }))
        })
    }

    fn parse_expression_statement(&mut self) -> PResult<Statement> {
        self.rule("expression_statement", |p| {
            let line = p.start_line();
            let expression = p.parse_expression()?;
            if !p.scanner.eat(";") {
                return Ok(None);
            }
            Ok(Some(Statement::Expression(expression, line)))
        })
    }

    /// `( expression )` as used by if/switch/while heads.
    fn parenthesized(&mut self) -> PResult<Expression> {
        self.rule("parenthesized_expression", |p| {
            if !p.scanner.eat("(") {
                return Ok(None);
            }
            let Some(expression) = p.parse_expression()? else {
                return Ok(None);
            };
            Ok(p.expect(")").map(|_| expression))
        })
    }

    fn parse_selection_statement(&mut self) -> PResult<Statement> {
        self.rule("selection_statement", |p| {
            let line = p.start_line();
            if p.scanner.eat_keyword("if") {
                let Some(cond) = p.parenthesized()? else {
                    return Ok(None);
                };
                let Some(then_branch) = p.parse_statement()? else {
                    return Ok(None);
                };
                let else_branch = if p.scanner.eat_keyword("else") {
                    let Some(else_branch) = p.parse_statement()? else {
                        return Ok(None);
                    };
                    Some(Box::new(else_branch))
                } else {
                    None
                };
                return Ok(Some(Statement::If {
                    cond,
                    then_branch: Box::new(then_branch),
                    else_branch,
                    line,
                }));
            }

            if p.scanner.eat_keyword("switch") {
                let Some(cond) = p.parenthesized()? else {
                    return Ok(None);
                };
                let Some(body) = p.parse_statement()? else {
                    return Ok(None);
                };
                return Ok(Some(Statement::Switch {
                    cond,
                    body: Box::new(body),
                    line,
                }));
            }
            Ok(None)
        })
    }

    fn parse_iteration_statement(&mut self) -> PResult<Statement> {
        self.rule("iteration_statement", |p| {
            let line = p.start_line();
            if p.scanner.eat_keyword("while") {
                let Some(cond) = p.parenthesized()? else {
                    return Ok(None);
                };
                let Some(body) = p.parse_statement()? else {
                    return Ok(None);
                };
                return Ok(Some(Statement::While {
                    cond,
                    body: Box::new(body),
                    line,
                }));
            }

            if p.scanner.eat_keyword("do") {
                let Some(body) = p.parse_statement()? else {
                    return Ok(None);
                };
                if !p.scanner.eat_keyword("while") {
                    return Ok(None);
                }
                let Some(cond) = p.parenthesized()? else {
                    return Ok(None);
                };
                if !p.scanner.eat(";") {
                    return Ok(None);
                }
                return Ok(Some(Statement::DoWhile {
                    body: Box::new(body),
                    cond,
                    line,
                }));
            }

            if p.scanner.eat_keyword("for") {
                if !p.scanner.eat("(") {
                    return Ok(None);
                }
                p.enter_typedef_scope();
                let result = p.parse_for_rest(line);
                p.leave_typedef_scope();
                return result;
            }
            Ok(None)
        })
    }

    /// Everything after `for (`.
    fn parse_for_rest(&mut self, line: u32) -> PResult<Statement> {
        let init = if let Some(declaration) = self.parse_declaration()? {
            ForInit::Declaration(declaration)
        } else {
            let init = self.parse_expression()?;
            if !self.scanner.eat(";") {
                return Ok(None);
            }
            init.map_or(ForInit::None, ForInit::Expression)
        };
        let cond = self.parse_expression()?;
        if !self.scanner.eat(";") {
            return Ok(None);
        }
        let step = self.parse_expression()?;
        if !self.scanner.eat(")") {
            return Ok(None);
        }
        let Some(body) = self.parse_statement()? else {
            return Ok(None);
        };
        Ok(Some(Statement::For {
            init,
            cond,
            step,
            body: Box::new(body),
            line,
        }))
    }

    fn parse_jump_statement(&mut self) -> PResult<Statement> {
        self.rule("jump_statement", |p| {
            let line = p.start_line();
            let statement = if p.scanner.eat_keyword("goto") {
                let Some(label) = p.identifier() else {
                    return Ok(None);
                };
                Statement::Goto(label, line)
            } else if p.scanner.eat_keyword("continue") {
                Statement::Continue(line)
            } else if p.scanner.eat_keyword("break") {
                Statement::Break(line)
            } else if p.scanner.eat_keyword("return") {
                Statement::Return(p.parse_expression()?, line)
            } else {
                return Ok(None);
            };
            Ok(p.expect(";").map(|_| statement))
        })
    }
}
