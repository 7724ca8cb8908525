//! Expression productions, from comma expressions down to primaries.
//!
//! Binary precedence levels are parsed as flat chains: one operand, then
//! any number of operator/operand pairs.

use crate::ast::*;
use crate::diagnostic::CompileError;

use super::cursor::is_ident_continue;
use super::{PResult, Parser};

/// Punctuator spelling, characters that must not follow it, and the operator.
type OpTable = &'static [(&'static str, &'static [u8], BinaryOp)];

const LOGICAL_OR_OPS: OpTable = &[("||", b"", BinaryOp::LogicalOr)];
const LOGICAL_AND_OPS: OpTable = &[("&&", b"", BinaryOp::LogicalAnd)];
const INCLUSIVE_OR_OPS: OpTable = &[("|", b"|=", BinaryOp::BitOr)];
const EXCLUSIVE_OR_OPS: OpTable = &[("^", b"=", BinaryOp::BitXor)];
const AND_OPS: OpTable = &[("&", b"&=", BinaryOp::BitAnd)];
const EQUALITY_OPS: OpTable = &[("==", b"", BinaryOp::Eq), ("!=", b"", BinaryOp::Ne)];
const RELATIONAL_OPS: OpTable = &[
    ("<=", b"", BinaryOp::Le),
    (">=", b"", BinaryOp::Ge),
    ("<", b"<=", BinaryOp::Lt),
    (">", b">=", BinaryOp::Gt),
];
const SHIFT_OPS: OpTable = &[("<<", b"=", BinaryOp::Shl), (">>", b"=", BinaryOp::Shr)];
const ADDITIVE_OPS: OpTable = &[("+", b"+=", BinaryOp::Add), ("-", b"-=>", BinaryOp::Sub)];
const MULTIPLICATIVE_OPS: OpTable = &[
    ("*", b"=", BinaryOp::Mul),
    ("/", b"=", BinaryOp::Div),
    ("%", b"=", BinaryOp::Rem),
];

const ASSIGN_OPS: &[(&str, AssignOp)] = &[
    ("<<=", AssignOp::Shl),
    (">>=", AssignOp::Shr),
    ("*=", AssignOp::Mul),
    ("/=", AssignOp::Div),
    ("%=", AssignOp::Rem),
    ("+=", AssignOp::Add),
    ("-=", AssignOp::Sub),
    ("&=", AssignOp::And),
    ("^=", AssignOp::Xor),
    ("|=", AssignOp::Or),
];

/// The unary expression wrapped by a conditional expression that has no
/// operators and no casts at any level.
pub(crate) fn bare_unary(cond: &ConditionalExpr) -> Option<&UnaryExpr> {
    let ConditionalExpr::LogicalOr(lor) = cond else {
        return None;
    };
    fn single<T>(chain: &ChainExpr<T>) -> Option<&T> {
        chain.is_single().then(|| chain.head.as_ref())
    }
    let cast = single(lor)
        .and_then(single)
        .and_then(single)
        .and_then(single)
        .and_then(single)
        .and_then(single)
        .and_then(single)
        .and_then(single)
        .and_then(single)
        .and_then(single)?;
    cast.casts.is_empty().then_some(&cast.operand)
}

impl<'src> Parser<'src> {
    pub(crate) fn parse_expression(&mut self) -> PResult<Expression> {
        self.rule("expression", |p| {
            let line = p.start_line();
            let Some(first) = p.parse_assignment_expression()? else {
                return Ok(None);
            };
            let mut items = vec![first];
            loop {
                let saved = p.scanner.save();
                if !p.scanner.eat(",") {
                    break;
                }
                match p.parse_assignment_expression()? {
                    Some(item) => items.push(item),
                    None => {
                        p.scanner.restore(saved);
                        break;
                    }
                }
            }
            Ok(Some(Expression { items, line }))
        })
    }

    /// `conditional | unary assignment-operator assignment`.
    ///
    /// The left side is parsed once as a conditional expression and only
    /// reinterpreted as a unary target when an assignment operator follows.
    pub(crate) fn parse_assignment_expression(&mut self) -> PResult<AssignmentExpr> {
        self.nested("assignment_expression", |p| {
            let line = p.start_line();
            let Some(cond) = p.parse_conditional_expression()? else {
                return Ok(None);
            };
            let Some(target) = bare_unary(&cond).cloned() else {
                return Ok(Some(AssignmentExpr::Conditional(cond)));
            };

            let saved = p.scanner.save();
            let Some(op) = p.assignment_operator() else {
                return Ok(Some(AssignmentExpr::Conditional(cond)));
            };
            match p.parse_assignment_expression()? {
                Some(value) => Ok(Some(AssignmentExpr::Assign {
                    target,
                    op,
                    value: Box::new(value),
                    line,
                })),
                None => {
                    p.scanner.restore(saved);
                    Ok(Some(AssignmentExpr::Conditional(cond)))
                }
            }
        })
    }

    fn assignment_operator(&mut self) -> Option<AssignOp> {
        for &(text, op) in ASSIGN_OPS {
            if self.scanner.eat(text) {
                return Some(op);
            }
        }
        self.scanner.eat_punct("=", b"=").then_some(AssignOp::Assign)
    }

    pub(crate) fn parse_constant_expression(&mut self) -> PResult<ConditionalExpr> {
        self.parse_conditional_expression()
    }

    pub(crate) fn parse_conditional_expression(&mut self) -> PResult<ConditionalExpr> {
        self.rule("conditional_expression", |p| {
            let line = p.start_line();
            let Some(cond) = p.parse_logical_or()? else {
                return Ok(None);
            };

            let saved = p.scanner.save();
            if !p.scanner.eat("?") {
                return Ok(Some(ConditionalExpr::LogicalOr(cond)));
            }
            let Some(then_expr) = p.parse_expression()? else {
                p.scanner.restore(saved);
                return Ok(Some(ConditionalExpr::LogicalOr(cond)));
            };
            if !p.scanner.eat(":") {
                p.scanner.restore(saved);
                return Ok(Some(ConditionalExpr::LogicalOr(cond)));
            }
            let Some(else_expr) = p.parse_conditional_expression()? else {
                p.scanner.restore(saved);
                return Ok(Some(ConditionalExpr::LogicalOr(cond)));
            };
            Ok(Some(ConditionalExpr::Ternary {
                cond,
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                line,
            }))
        })
    }

    /// Generic flat chain over one precedence level.
    fn parse_chain<T>(
        &mut self,
        name: &'static str,
        ops: OpTable,
        mut operand: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<ChainExpr<T>> {
        self.rule(name, |p| {
            let line = p.start_line();
            let Some(head) = operand(p)? else {
                return Ok(None);
            };
            let mut chain = ChainExpr::single(head, line);

            'chain: loop {
                let saved = p.scanner.save();
                for &(text, forbidden, op) in ops {
                    if !p.scanner.eat_punct(text, forbidden) {
                        continue;
                    }
                    match operand(p)? {
                        Some(next) => {
                            chain.tail.push((op, next));
                            continue 'chain;
                        }
                        None => {
                            p.scanner.restore(saved);
                            break 'chain;
                        }
                    }
                }
                break;
            }
            Ok(Some(chain))
        })
    }

    fn parse_logical_or(&mut self) -> PResult<LogicalOrExpr> {
        self.parse_chain("logical_or_expression", LOGICAL_OR_OPS, Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> PResult<LogicalAndExpr> {
        self.parse_chain("logical_and_expression", LOGICAL_AND_OPS, Self::parse_inclusive_or)
    }

    fn parse_inclusive_or(&mut self) -> PResult<InclusiveOrExpr> {
        self.parse_chain("inclusive_or_expression", INCLUSIVE_OR_OPS, Self::parse_exclusive_or)
    }

    fn parse_exclusive_or(&mut self) -> PResult<ExclusiveOrExpr> {
        self.parse_chain("exclusive_or_expression", EXCLUSIVE_OR_OPS, Self::parse_and)
    }

    fn parse_and(&mut self) -> PResult<AndExpr> {
        self.parse_chain("and_expression", AND_OPS, Self::parse_equality)
    }

    fn parse_equality(&mut self) -> PResult<EqualityExpr> {
        self.parse_chain("equality_expression", EQUALITY_OPS, Self::parse_relational)
    }

    fn parse_relational(&mut self) -> PResult<RelationalExpr> {
        self.parse_chain("relational_expression", RELATIONAL_OPS, Self::parse_shift)
    }

    fn parse_shift(&mut self) -> PResult<ShiftExpr> {
        self.parse_chain("shift_expression", SHIFT_OPS, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> PResult<AdditiveExpr> {
        self.parse_chain("additive_expression", ADDITIVE_OPS, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> PResult<MultiplicativeExpr> {
        self.parse_chain("multiplicative_expression", MULTIPLICATIVE_OPS, Self::parse_cast)
    }

    pub(crate) fn parse_cast(&mut self) -> PResult<CastExpr> {
        self.nested("cast_expression", |p| {
            let line = p.start_line();
            let mut casts = Vec::new();
            loop {
                let saved = p.scanner.save();
                if !p.scanner.eat("(") {
                    break;
                }
                match p.parse_type_name()? {
                    Some(type_name) if p.scanner.eat(")") => casts.push(type_name),
                    _ => {
                        p.scanner.restore(saved);
                        break;
                    }
                }
            }
            let Some(operand) = p.parse_unary()? else {
                return Ok(None);
            };
            Ok(Some(CastExpr { casts, operand, line }))
        })
    }

    pub(crate) fn parse_unary(&mut self) -> PResult<UnaryExpr> {
        self.nested("unary_expression", |p| {
            let line = p.start_line();

            for (text, op) in [("++", IncDec::Increment), ("--", IncDec::Decrement)] {
                if p.scanner.eat(text) {
                    let Some(operand) = p.parse_unary()? else {
                        return Ok(None);
                    };
                    return Ok(Some(UnaryExpr::PreIncDec {
                        op,
                        operand: Box::new(operand),
                        line,
                    }));
                }
            }

            let unary_ops: [(&str, &[u8], UnaryOp); 6] = [
                ("&", b"&=", UnaryOp::AddressOf),
                ("*", b"=", UnaryOp::Deref),
                ("+", b"+=", UnaryOp::Plus),
                ("-", b"-=>", UnaryOp::Minus),
                ("~", b"", UnaryOp::BitNot),
                ("!", b"=", UnaryOp::LogicalNot),
            ];
            for (text, forbidden, op) in unary_ops {
                if p.scanner.eat_punct(text, forbidden) {
                    let Some(operand) = p.parse_cast()? else {
                        return Ok(None);
                    };
                    return Ok(Some(UnaryExpr::Unary {
                        op,
                        operand: Box::new(operand),
                        line,
                    }));
                }
            }

            if p.scanner.eat_keyword("sizeof") {
                let saved = p.scanner.save();
                if p.scanner.eat("(") {
                    if let Some(type_name) = p.parse_type_name()?
                        && p.scanner.eat(")")
                    {
                        return Ok(Some(UnaryExpr::SizeofType(type_name, line)));
                    }
                    p.scanner.restore(saved);
                }
                let Some(operand) = p.parse_unary()? else {
                    return Ok(None);
                };
                return Ok(Some(UnaryExpr::SizeofExpr(Box::new(operand), line)));
            }

            Ok(p.parse_postfix()?.map(UnaryExpr::Postfix))
        })
    }

    fn parse_postfix(&mut self) -> PResult<PostfixExpr> {
        self.rule("postfix_expression", |p| {
            let line = p.start_line();
            let Some(primary) = p.parse_primary()? else {
                return Ok(None);
            };
            let mut suffixes = Vec::new();
            while let Some(suffix) = p.parse_postfix_suffix()? {
                suffixes.push(suffix);
            }
            Ok(Some(PostfixExpr {
                primary,
                suffixes,
                line,
            }))
        })
    }

    fn parse_postfix_suffix(&mut self) -> PResult<PostfixSuffix> {
        self.rule("postfix_suffix", |p| {
            if p.scanner.eat("[") {
                let Some(index) = p.parse_expression()? else {
                    return Ok(None);
                };
                return Ok(p.expect("]").map(|_| PostfixSuffix::Index(index)));
            }
            if p.scanner.eat("(") {
                let mut args = Vec::new();
                if !p.scanner.eat(")") {
                    loop {
                        let Some(arg) = p.parse_assignment_expression()? else {
                            return Ok(None);
                        };
                        args.push(arg);
                        if p.scanner.eat(")") {
                            break;
                        }
                        if !p.scanner.eat(",") {
                            return Ok(None);
                        }
                    }
                }
                return Ok(Some(PostfixSuffix::Call(args)));
            }
            if p.scanner.eat("->") {
                return Ok(p.identifier().map(PostfixSuffix::Arrow));
            }
            if p.scanner.eat_punct(".", b".") {
                return Ok(p.identifier().map(PostfixSuffix::Member));
            }
            if p.scanner.eat("++") {
                return Ok(Some(PostfixSuffix::IncDec(IncDec::Increment)));
            }
            if p.scanner.eat("--") {
                return Ok(Some(PostfixSuffix::IncDec(IncDec::Decrement)));
            }
            Ok(None)
        })
    }

    fn parse_primary(&mut self) -> PResult<PrimaryExpr> {
        self.rule("primary_expression", |p| {
            if let Some(name) = p.identifier() {
                return Ok(Some(PrimaryExpr::Identifier(name)));
            }
            if let Some(value) = p.parse_integer_constant()? {
                return Ok(Some(PrimaryExpr::Constant(value)));
            }
            if let Some(value) = p.parse_char_constant()? {
                return Ok(Some(PrimaryExpr::Constant(value)));
            }
            if let Some(bytes) = p.parse_string_literal()? {
                return Ok(Some(PrimaryExpr::StringLiteral(bytes)));
            }
            if p.scanner.eat("(") {
                let Some(inner) = p.parse_expression()? else {
                    return Ok(None);
                };
                return Ok(p.expect(")").map(|_| PrimaryExpr::Parenthesized(Box::new(inner))));
            }
            Ok(None)
        })
    }

    /// Decimal, hexadecimal and octal integer constants. `u`/`l` suffixes
    /// are accepted and ignored.
    fn parse_integer_constant(&mut self) -> PResult<i64> {
        self.rule("integer_constant", |p| {
            let line = p.start_line();
            let Some(first) = p.scanner.peek().filter(u8::is_ascii_digit) else {
                return Ok(None);
            };

            let radix = if first == b'0' && matches!(p.scanner.peek_at(1), Some(b'x' | b'X')) {
                p.scanner.getc();
                p.scanner.getc();
                16
            } else if first == b'0' {
                8
            } else {
                10
            };

            let mut digits = String::new();
            while let Some(c) = p.scanner.peek() {
                if !(c as char).is_digit(radix) {
                    break;
                }
                digits.push(c as char);
                p.scanner.getc();
            }
            if digits.is_empty() {
                if radix == 16 {
                    return Err(CompileError::source(line, "malformed hexadecimal constant"));
                }
                return Ok(None);
            }
            if matches!(p.scanner.peek(), Some(b'.' | b'e' | b'E')) && radix != 16 {
                return Err(CompileError::source(line, "floating point constants are not supported"));
            }
            while matches!(p.scanner.peek(), Some(b'u' | b'U' | b'l' | b'L')) {
                p.scanner.getc();
            }
            if p.scanner.peek().is_some_and(is_ident_continue) {
                return Ok(None);
            }

            let value = u64::from_str_radix(&digits, radix)
                .map_err(|_| CompileError::source(line, format!("integer constant '{digits}' is too large")))?;
            Ok(Some(value as i64))
        })
    }

    fn parse_char_constant(&mut self) -> PResult<i64> {
        self.rule("char_constant", |p| {
            let line = p.start_line();
            if p.scanner.peek() != Some(b'\'') {
                return Ok(None);
            }
            p.scanner.getc();
            let value = match p.scanner.getc() {
                Some(b'\\') => p.escape_sequence(line)?,
                Some(b'\'') | Some(b'\n') | None => {
                    return Err(CompileError::source(line, "malformed character constant"));
                }
                Some(c) => c,
            };
            if p.scanner.getc() != Some(b'\'') {
                return Err(CompileError::source(line, "unterminated character constant"));
            }
            Ok(Some(value as i64))
        })
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_string_literal(&mut self) -> PResult<Vec<u8>> {
        self.rule("string_literal", |p| {
            let mut bytes = Vec::new();
            let mut matched = false;
            loop {
                let line = p.start_line();
                if p.scanner.peek() != Some(b'"') {
                    break;
                }
                p.scanner.getc();
                loop {
                    match p.scanner.getc() {
                        Some(b'"') => break,
                        Some(b'\\') => bytes.push(p.escape_sequence(line)?),
                        Some(b'\n') | None => {
                            return Err(CompileError::source(line, "unterminated string literal"));
                        }
                        Some(c) => bytes.push(c),
                    }
                }
                matched = true;
            }
            Ok(matched.then_some(bytes))
        })
    }

    fn escape_sequence(&mut self, line: u32) -> Result<u8, CompileError> {
        let Some(c) = self.scanner.getc() else {
            return Err(CompileError::source(line, "unterminated escape sequence"));
        };
        let out_of_range = move || CompileError::source(line, "escape sequence out of range");
        let byte = match c {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    match self.scanner.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.scanner.getc();
                        }
                        _ => break,
                    }
                }
                u8::try_from(value).map_err(|_| out_of_range())?
            }
            b'x' => {
                let mut value = 0u32;
                let mut any = false;
                while let Some(d) = self.scanner.peek().filter(u8::is_ascii_hexdigit) {
                    value = value
                        .checked_mul(16)
                        .and_then(|v| v.checked_add((d as char).to_digit(16).unwrap_or(0)))
                        .ok_or_else(out_of_range)?;
                    any = true;
                    self.scanner.getc();
                }
                if !any {
                    return Err(CompileError::source(line, "\\x used with no following hex digits"));
                }
                u8::try_from(value).map_err(|_| out_of_range())?
            }
            b'\\' | b'\'' | b'"' | b'?' => c,
            other => {
                return Err(CompileError::source(
                    line,
                    format!("unknown escape sequence '\\{}'", other as char),
                ));
            }
        };
        Ok(byte)
    }
}
