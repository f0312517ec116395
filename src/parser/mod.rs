/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::assembler::PioAssembler;
use crate::ast::{
    BinOp, Expr, InSource, Instruction, InstrKind, IrqIndexMode, JmpCond, MovDest, MovOp,
    MovSource, OutDest, SetDest, UnaryOp, Value, WaitSource,
};
use crate::errors::AsmError;
use crate::program::{PioVersion, ShiftConfig, ShiftDir};
use crate::scanner::{Scanner, Token, TokenKind};

// Binding powers, weakest to strongest. EXPR parsing starts at Or.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Prec {
    Stmt,
    None,
    Assign,
    Or,
    And,
    Equality,
    Compare,
    Shift,
    Term,
    Factor,
    Unary,
    Primary,
}

impl Prec {
    // one step up the ladder, for left-associative infix recursion
    fn next(self) -> Prec {
        match self {
            Prec::Stmt => Prec::None,
            Prec::None => Prec::Assign,
            Prec::Assign => Prec::Or,
            Prec::Or => Prec::And,
            Prec::And => Prec::Equality,
            Prec::Equality => Prec::Compare,
            Prec::Compare => Prec::Shift,
            Prec::Shift => Prec::Term,
            Prec::Term => Prec::Factor,
            Prec::Factor => Prec::Unary,
            Prec::Unary => Prec::Primary,
            Prec::Primary => Prec::Primary,
        }
    }
}

pub type Handler = fn(&mut Parser<'_>, &mut PioAssembler, &Token) -> Result<(), AsmError>;

pub struct Rule {
    pub key: &'static str,
    pub prefix: Option<Handler>,
    pub infix: Option<Handler>,
    pub prec: Prec,
}

// Keyword-keyed rows of the Pratt table, sorted ascending by key for the
// binary search in get_rule (the ordering is unit-tested). Number, Symbol,
// Label and Newline tokens dispatch on token kind in the driver instead.
pub static PRATT_TAB: &[Rule] = &[
    Rule { key: "!", prefix: Some(prefix_unary), infix: None, prec: Prec::None },
    Rule { key: "!=", prefix: None, infix: Some(infix_binary), prec: Prec::Equality },
    Rule { key: "%", prefix: None, infix: Some(infix_binary), prec: Prec::Factor },
    Rule { key: "&", prefix: None, infix: Some(infix_binary), prec: Prec::And },
    Rule { key: "(", prefix: Some(prefix_group), infix: None, prec: Prec::None },
    Rule { key: "*", prefix: None, infix: Some(infix_binary), prec: Prec::Factor },
    Rule { key: "+", prefix: None, infix: Some(infix_binary), prec: Prec::Term },
    Rule { key: "-", prefix: Some(prefix_unary), infix: Some(infix_binary), prec: Prec::Term },
    Rule { key: ".", prefix: Some(prefix_directive), infix: None, prec: Prec::None },
    Rule { key: "/", prefix: None, infix: Some(infix_binary), prec: Prec::Factor },
    Rule { key: "::", prefix: Some(prefix_unary), infix: None, prec: Prec::None },
    Rule { key: "<", prefix: None, infix: Some(infix_binary), prec: Prec::Compare },
    Rule { key: "<<", prefix: None, infix: Some(infix_binary), prec: Prec::Shift },
    Rule { key: "==", prefix: None, infix: Some(infix_binary), prec: Prec::Equality },
    Rule { key: ">>", prefix: None, infix: Some(infix_binary), prec: Prec::Shift },
    Rule { key: "in", prefix: Some(prefix_in), infix: None, prec: Prec::None },
    Rule { key: "irq", prefix: Some(prefix_irq), infix: None, prec: Prec::None },
    Rule { key: "jmp", prefix: Some(prefix_jmp), infix: None, prec: Prec::None },
    Rule { key: "mov", prefix: Some(prefix_mov), infix: None, prec: Prec::None },
    Rule { key: "nop", prefix: Some(prefix_nop), infix: None, prec: Prec::None },
    Rule { key: "out", prefix: Some(prefix_out), infix: None, prec: Prec::None },
    Rule { key: "public", prefix: Some(prefix_public), infix: None, prec: Prec::None },
    Rule { key: "pull", prefix: Some(prefix_pull), infix: None, prec: Prec::None },
    Rule { key: "push", prefix: Some(prefix_push), infix: None, prec: Prec::None },
    Rule { key: "set", prefix: Some(prefix_set), infix: None, prec: Prec::None },
    Rule { key: "wait", prefix: Some(prefix_wait), infix: None, prec: Prec::None },
    Rule { key: "|", prefix: None, infix: Some(infix_binary), prec: Prec::Or },
    Rule { key: "~", prefix: Some(prefix_unary), infix: None, prec: Prec::None },
];

pub fn get_rule(key: &str) -> Option<&'static Rule> {
    PRATT_TAB
        .binary_search_by(|rule| rule.key.cmp(key))
        .ok()
        .map(|i| &PRATT_TAB[i])
}

/// Precedence-climbing parser over the token stream. Statement handlers
/// (mnemonics, directives, labels) feed the assembler facade directly;
/// expression handlers push onto an explicit expression stack.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    lookahead: Option<Token>,
    exprs: Vec<Expr>,
    stmt_done: bool,
    in_expr: bool,
}

impl<'a> Parser<'a> {
    pub fn new(scanner: Scanner<'a>) -> Parser<'a> {
        Parser {
            scanner,
            lookahead: None,
            exprs: Vec::new(),
            stmt_done: false,
            in_expr: false,
        }
    }

    /// Parse the whole token stream, driving `asm` one statement at a time.
    pub fn parse_into(&mut self, asm: &mut PioAssembler) -> Result<(), AsmError> {
        loop {
            if self.peek()?.kind == TokenKind::Eof {
                return Ok(());
            }
            self.stmt_done = false;
            self.parse_precedence(asm, Prec::None)?;
            if !self.stmt_done {
                // a bare expression is not a statement
                self.exprs.clear();
                let tok = self.peek()?;
                return Err(AsmError::ExpectedToken {
                    line: tok.line,
                    col: tok.col,
                    expected: "a statement",
                    found: tok.text(),
                });
            }
        }
    }

    // --- token plumbing ---

    fn peek(&mut self) -> Result<&Token, AsmError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.scanner.next_token()?);
        }
        Ok(self.lookahead.as_ref().unwrap())
    }

    fn advance(&mut self) -> Result<Token, AsmError> {
        match self.lookahead.take() {
            Some(tok) => Ok(tok),
            None => self.scanner.next_token(),
        }
    }

    fn eat_kw(&mut self, kw: &str) -> Result<bool, AsmError> {
        if self.peek()?.is_kw(kw) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // commas between operands are optional
    fn eat_comma(&mut self) -> Result<(), AsmError> {
        self.eat_kw(",")?;
        Ok(())
    }

    fn expect_kw(&mut self, kw: &'static str) -> Result<Token, AsmError> {
        let tok = self.advance()?;
        if tok.is_kw(kw) {
            Ok(tok)
        } else {
            Err(AsmError::ExpectedToken {
                line: tok.line,
                col: tok.col,
                expected: kw,
                found: tok.text(),
            })
        }
    }

    fn expect_symbol(&mut self) -> Result<String, AsmError> {
        let tok = self.advance()?;
        match tok.kind {
            TokenKind::Symbol(name) => Ok(name),
            _ => Err(AsmError::ExpectedToken {
                line: tok.line,
                col: tok.col,
                expected: "a symbol",
                found: tok.text(),
            }),
        }
    }

    // statements are line-terminated
    fn end_statement(&mut self) -> Result<(), AsmError> {
        let tok = self.advance()?;
        if tok.kind != TokenKind::Newline {
            return Err(AsmError::ExpectedToken {
                line: tok.line,
                col: tok.col,
                expected: "end of line",
                found: tok.text(),
            });
        }
        self.stmt_done = true;
        Ok(())
    }

    // --- driver ---

    fn parse_precedence(&mut self, asm: &mut PioAssembler, min_prec: Prec) -> Result<(), AsmError> {
        let tok = self.advance()?;
        self.dispatch_prefix(asm, &tok)?;
        if self.stmt_done {
            return Ok(());
        }
        loop {
            let Some((prec, infix)) = self.peek_infix()? else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let tok = self.advance()?;
            infix(self, asm, &tok)?;
        }
        Ok(())
    }

    fn dispatch_prefix(&mut self, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
        match &tok.kind {
            TokenKind::Number(n) => {
                self.exprs.push(Expr::Num(*n));
                Ok(())
            }
            TokenKind::Symbol(name) => {
                self.exprs.push(Expr::Sym(name.clone()));
                Ok(())
            }
            TokenKind::Label(name) => {
                if self.in_expr {
                    return Err(AsmError::ExpectedValue {
                        line: tok.line,
                        col: tok.col,
                        found: tok.text(),
                    });
                }
                asm.place_label(name, false)?;
                self.stmt_done = true;
                Ok(())
            }
            TokenKind::Newline => {
                if self.in_expr {
                    return Err(AsmError::ExpectedValue {
                        line: tok.line,
                        col: tok.col,
                        found: "end of line".to_string(),
                    });
                }
                self.stmt_done = true;
                Ok(())
            }
            TokenKind::Keyword(key) => match get_rule(key).and_then(|r| r.prefix) {
                Some(prefix) => prefix(self, asm, tok),
                None => Err(AsmError::NotAPrefixOperator {
                    line: tok.line,
                    col: tok.col,
                    token: tok.text(),
                }),
            },
            TokenKind::Eof => Err(AsmError::NotAPrefixOperator {
                line: tok.line,
                col: tok.col,
                token: tok.text(),
            }),
        }
    }

    fn peek_infix(&mut self) -> Result<Option<(Prec, Handler)>, AsmError> {
        let tok = self.peek()?;
        if let TokenKind::Keyword(key) = &tok.kind {
            if let Some(rule) = get_rule(key) {
                if let Some(infix) = rule.infix {
                    return Ok(Some((rule.prec, infix)));
                }
            }
        }
        Ok(None)
    }

    // statement handlers may not fire inside an expression
    fn stmt_context(&self, tok: &Token) -> Result<(), AsmError> {
        if self.in_expr {
            return Err(AsmError::NotAPrefixOperator {
                line: tok.line,
                col: tok.col,
                token: tok.text(),
            });
        }
        Ok(())
    }

    // --- expressions and values ---

    fn pop_expr(&mut self) -> Result<Expr, AsmError> {
        self.exprs.pop().ok_or(AsmError::BadExpression {
            reason: "missing operand".to_string(),
        })
    }

    fn parse_expr(&mut self, asm: &mut PioAssembler) -> Result<Expr, AsmError> {
        let saved = self.in_expr;
        self.in_expr = true;
        let result = self.parse_precedence(asm, Prec::Or);
        self.in_expr = saved;
        result?;
        self.pop_expr()
    }

    /// A value operand: a number, a symbol, or a parenthesized expression.
    fn parse_value(&mut self, asm: &mut PioAssembler) -> Result<Value, AsmError> {
        let tok = self.advance()?;
        match &tok.kind {
            TokenKind::Number(n) => Ok(Value::Num(*n)),
            TokenKind::Symbol(name) => Ok(Value::Sym(name.clone())),
            TokenKind::Keyword(k) if k == "(" => {
                prefix_group(self, asm, &tok)?;
                Ok(fold_value(self.pop_expr()?))
            }
            _ => Err(AsmError::ExpectedValue {
                line: tok.line,
                col: tok.col,
                found: tok.text(),
            }),
        }
    }

    // a value that must be known immediately (configuration directives)
    fn parse_const(&mut self, asm: &mut PioAssembler) -> Result<i32, AsmError> {
        let value = self.parse_value(asm)?;
        asm.resolve_now(&value)
    }

    // --- instruction tails ---

    // `side <value>` and `[ <delay> ]` may follow any instruction, in either
    // order, each at most once.
    fn finish_instruction(
        &mut self,
        asm: &mut PioAssembler,
        kind: InstrKind,
        mnemonic: &'static str,
    ) -> Result<(), AsmError> {
        let mut instr = Instruction::new(kind);
        loop {
            if self.peek()?.is_kw("side") {
                self.advance()?;
                if instr.side.is_some() {
                    return Err(AsmError::InvalidOperand {
                        mnemonic,
                        slot: "side (given twice)",
                    });
                }
                instr.side = Some(self.parse_value(asm)?);
            } else if self.peek()?.is_kw("[") {
                self.advance()?;
                if instr.delay.is_some() {
                    return Err(AsmError::InvalidOperand {
                        mnemonic,
                        slot: "delay (given twice)",
                    });
                }
                let expr = self.parse_expr(asm)?;
                self.expect_kw("]")?;
                instr.delay = Some(fold_value(expr));
            } else {
                break;
            }
        }
        self.end_statement()?;
        asm.push_instr(instr)
    }
}

// collapse trivial expressions so the IR carries plain integers where it can
fn fold_value(expr: Expr) -> Value {
    match expr {
        Expr::Num(n) => Value::Num(n),
        Expr::Sym(name) => Value::Sym(name),
        other => Value::Expr(other),
    }
}

// --- expression handlers ---

fn prefix_unary(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    let op = match &tok.kind {
        TokenKind::Keyword(k) if k == "-" => UnaryOp::Neg,
        TokenKind::Keyword(k) if k == "~" || k == "!" => UnaryOp::Not,
        _ => UnaryOp::Reverse, // "::"
    };
    let saved = p.in_expr;
    p.in_expr = true;
    let result = p.parse_precedence(asm, Prec::Unary);
    p.in_expr = saved;
    result?;
    let operand = p.pop_expr()?;
    p.exprs.push(Expr::Unary(op, Box::new(operand)));
    Ok(())
}

fn prefix_group(p: &mut Parser<'_>, asm: &mut PioAssembler, _tok: &Token) -> Result<(), AsmError> {
    let saved = p.in_expr;
    p.in_expr = true;
    let result = p.parse_precedence(asm, Prec::Or);
    p.in_expr = saved;
    result?;
    let close = p.advance()?;
    if !close.is_kw(")") {
        // something that cannot continue the expression
        return Err(AsmError::NotAnInfixOperator {
            line: close.line,
            col: close.col,
            token: close.text(),
        });
    }
    Ok(())
}

fn infix_binary(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    let TokenKind::Keyword(key) = &tok.kind else {
        return Err(AsmError::NotAnInfixOperator {
            line: tok.line,
            col: tok.col,
            token: tok.text(),
        });
    };
    let op = match key.as_str() {
        "|" => BinOp::Or,
        "&" => BinOp::And,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<" => BinOp::Lt,
        "<<" => BinOp::Shl,
        ">>" => BinOp::Shr,
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Rem,
        _ => {
            return Err(AsmError::NotAnInfixOperator {
                line: tok.line,
                col: tok.col,
                token: tok.text(),
            });
        }
    };
    let prec = get_rule(key).map(|r| r.prec).unwrap_or(Prec::Primary);
    let saved = p.in_expr;
    p.in_expr = true;
    let result = p.parse_precedence(asm, prec.next());
    p.in_expr = saved;
    result?;
    let rhs = p.pop_expr()?;
    let lhs = p.pop_expr()?;
    p.exprs.push(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
    Ok(())
}

// --- statement handlers: labels and directives ---

fn prefix_public(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let next = p.advance()?;
    match &next.kind {
        TokenKind::Label(name) => {
            asm.place_label(name, true)?;
            p.stmt_done = true;
            Ok(())
        }
        _ => Err(AsmError::ExpectedToken {
            line: next.line,
            col: next.col,
            expected: "a label",
            found: next.text(),
        }),
    }
}

fn prefix_directive(
    p: &mut Parser<'_>,
    asm: &mut PioAssembler,
    tok: &Token,
) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let name_tok = p.advance()?;
    let TokenKind::Keyword(name) = &name_tok.kind else {
        return Err(AsmError::ExpectedToken {
            line: name_tok.line,
            col: name_tok.col,
            expected: "a directive name",
            found: name_tok.text(),
        });
    };
    match name.as_str() {
        "program" => {
            let name = p.expect_symbol()?;
            asm.begin_program(&name)?;
            p.end_statement()
        }
        "define" => {
            let public = p.eat_kw("public")?;
            let name = p.expect_symbol()?;
            let expr = p.parse_expr(asm)?;
            asm.define(&name, expr, public)?;
            p.end_statement()
        }
        "origin" => {
            let offset = p.parse_value(asm)?;
            asm.origin(offset)?;
            p.end_statement()
        }
        "side_set" => {
            let count = p.parse_const(asm)?;
            let opt = p.eat_kw("opt")?;
            let pindirs = p.eat_kw("pindirs")?;
            asm.side_set(count, opt, pindirs)?;
            p.end_statement()
        }
        "wrap" => {
            asm.wrap()?;
            p.end_statement()
        }
        "wrap_target" => {
            asm.wrap_target()?;
            p.end_statement()
        }
        "word" => {
            let expr = p.parse_expr(asm)?;
            asm.word(fold_value(expr))?;
            p.end_statement()
        }
        "pio_version" => {
            let version_tok = p.advance()?;
            let version = if version_tok.is_kw("rp2040") {
                PioVersion::Rp2040
            } else if version_tok.is_kw("rp2350") {
                PioVersion::Rp2350
            } else {
                return Err(AsmError::ExpectedToken {
                    line: version_tok.line,
                    col: version_tok.col,
                    expected: "rp2040 or rp2350",
                    found: version_tok.text(),
                });
            };
            asm.pio_version(version)?;
            p.end_statement()
        }
        "clock_div" => {
            let expr = p.parse_expr(asm)?;
            asm.clock_div(fold_value(expr))?;
            p.end_statement()
        }
        "in" => {
            let cfg = parse_shift_config(p, asm)?;
            asm.in_shift(cfg)?;
            p.end_statement()
        }
        "out" => {
            let cfg = parse_shift_config(p, asm)?;
            asm.out_shift(cfg)?;
            p.end_statement()
        }
        "set" => {
            let count = p.parse_value(asm)?;
            asm.set_count(count)?;
            p.end_statement()
        }
        "lang_opt" => parse_lang_opt(p, asm),
        _ => Err(AsmError::ExpectedToken {
            line: name_tok.line,
            col: name_tok.col,
            expected: "a directive name",
            found: name_tok.text(),
        }),
    }
}

// `.in <count> [left|right] [auto|manual] [<threshold>]` (same for `.out`)
fn parse_shift_config(
    p: &mut Parser<'_>,
    asm: &mut PioAssembler,
) -> Result<ShiftConfig, AsmError> {
    let count = p.parse_const(asm)?;
    if !(1..=32).contains(&count) {
        return Err(AsmError::OutOfRange {
            field: "shift count",
            value: count,
        });
    }
    let dir = if p.eat_kw("left")? {
        Some(ShiftDir::Left)
    } else if p.eat_kw("right")? {
        Some(ShiftDir::Right)
    } else {
        None
    };
    let auto = if p.eat_kw("auto")? {
        Some(true)
    } else if p.eat_kw("manual")? {
        Some(false)
    } else {
        None
    };
    let threshold = if p.peek()?.kind == TokenKind::Newline {
        None
    } else {
        let t = p.parse_const(asm)?;
        if !(1..=32).contains(&t) {
            return Err(AsmError::OutOfRange {
                field: "shift threshold",
                value: t,
            });
        }
        Some(t as u8)
    };
    Ok(ShiftConfig {
        count: count as u8,
        dir,
        auto,
        threshold,
    })
}

// `.lang_opt <lang> <key> = <rest of line>`, captured opaquely
fn parse_lang_opt(p: &mut Parser<'_>, asm: &mut PioAssembler) -> Result<(), AsmError> {
    let word = |p: &mut Parser<'_>| -> Result<String, AsmError> {
        let tok = p.advance()?;
        match &tok.kind {
            TokenKind::Keyword(k) => Ok(k.clone()),
            TokenKind::Symbol(s) => Ok(s.clone()),
            _ => Err(AsmError::ExpectedToken {
                line: tok.line,
                col: tok.col,
                expected: "a word",
                found: tok.text(),
            }),
        }
    };
    let lang = word(p)?;
    let key = word(p)?;
    p.expect_kw("=")?;
    let mut parts: Vec<String> = Vec::new();
    while p.peek()?.kind != TokenKind::Newline {
        parts.push(p.advance()?.text());
    }
    asm.lang_opt(&lang, &key, &parts.join(" "))?;
    p.end_statement()
}

// --- statement handlers: instructions ---

fn prefix_jmp(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let cond = parse_jmp_cond(p)?;
    p.eat_comma()?;
    let target = p.parse_value(asm)?;
    p.finish_instruction(asm, InstrKind::Jmp { cond, target }, "jmp")
}

fn parse_jmp_cond(p: &mut Parser<'_>) -> Result<JmpCond, AsmError> {
    let bad = AsmError::InvalidOperand {
        mnemonic: "jmp",
        slot: "condition",
    };
    if p.eat_kw("!")? {
        let tok = p.advance()?;
        return match &tok.kind {
            TokenKind::Keyword(k) if k == "x" => Ok(JmpCond::NotX),
            TokenKind::Keyword(k) if k == "y" => Ok(JmpCond::NotY),
            TokenKind::Symbol(s) if s == "osre" => Ok(JmpCond::NotOsre),
            _ => Err(bad),
        };
    }
    if p.eat_kw("x")? {
        if p.eat_kw("--")? {
            return Ok(JmpCond::XDec);
        }
        if p.eat_kw("!=")? {
            p.expect_kw("y")?;
            return Ok(JmpCond::XNeY);
        }
        return Err(bad);
    }
    if p.eat_kw("y")? {
        if p.eat_kw("--")? {
            return Ok(JmpCond::YDec);
        }
        return Err(bad);
    }
    if p.eat_kw("pin")? {
        return Ok(JmpCond::Pin);
    }
    Ok(JmpCond::Always)
}

fn prefix_wait(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let polarity = p.parse_value(asm)?;
    let source_tok = p.advance()?;
    let kind = if source_tok.is_kw("gpio") || source_tok.is_kw("pin") {
        let source = if source_tok.is_kw("gpio") {
            WaitSource::Gpio
        } else {
            WaitSource::Pin
        };
        p.eat_comma()?;
        let index = p.parse_value(asm)?;
        InstrKind::Wait {
            polarity,
            source,
            index,
            mode: IrqIndexMode::Direct,
        }
    } else if source_tok.is_kw("irq") {
        let mut mode = if p.eat_kw("prev")? {
            IrqIndexMode::Prev
        } else if p.eat_kw("next")? {
            IrqIndexMode::Next
        } else {
            IrqIndexMode::Direct
        };
        p.eat_comma()?;
        let index = p.parse_value(asm)?;
        if p.eat_kw("rel")? {
            if mode != IrqIndexMode::Direct {
                return Err(AsmError::InvalidOperand {
                    mnemonic: "wait",
                    slot: "rel combined with prev/next",
                });
            }
            mode = IrqIndexMode::Rel;
        }
        InstrKind::Wait {
            polarity,
            source: WaitSource::Irq,
            index,
            mode,
        }
    } else if source_tok.is_kw("jmppin") {
        let index = if p.eat_kw("+")? {
            p.parse_value(asm)?
        } else {
            Value::Num(0)
        };
        InstrKind::Wait {
            polarity,
            source: WaitSource::JmpPin,
            index,
            mode: IrqIndexMode::Direct,
        }
    } else {
        return Err(AsmError::InvalidOperand {
            mnemonic: "wait",
            slot: "source",
        });
    };
    p.finish_instruction(asm, kind, "wait")
}

fn prefix_in(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let source_tok = p.advance()?;
    let source = match &source_tok.kind {
        TokenKind::Keyword(k) => match k.as_str() {
            "pins" => InSource::Pins,
            "x" => InSource::X,
            "y" => InSource::Y,
            "null" => InSource::Null,
            "isr" => InSource::Isr,
            "osr" => InSource::Osr,
            _ => {
                return Err(AsmError::InvalidOperand {
                    mnemonic: "in",
                    slot: "source",
                });
            }
        },
        _ => {
            return Err(AsmError::InvalidOperand {
                mnemonic: "in",
                slot: "source",
            });
        }
    };
    p.eat_comma()?;
    let count = p.parse_value(asm)?;
    p.finish_instruction(asm, InstrKind::In { source, count }, "in")
}

fn prefix_out(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let dest_tok = p.advance()?;
    let dest = match &dest_tok.kind {
        TokenKind::Keyword(k) => match k.as_str() {
            "pins" => OutDest::Pins,
            "x" => OutDest::X,
            "y" => OutDest::Y,
            "null" => OutDest::Null,
            "pindirs" => OutDest::Pindirs,
            "pc" => OutDest::Pc,
            "isr" => OutDest::Isr,
            "osr" => OutDest::Osr,
            _ => {
                return Err(AsmError::InvalidOperand {
                    mnemonic: "out",
                    slot: "destination",
                });
            }
        },
        _ => {
            return Err(AsmError::InvalidOperand {
                mnemonic: "out",
                slot: "destination",
            });
        }
    };
    p.eat_comma()?;
    let count = p.parse_value(asm)?;
    p.finish_instruction(asm, InstrKind::Out { dest, count }, "out")
}

fn prefix_push(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let iffull = p.eat_kw("iffull")?;
    let block = parse_blocking(p)?;
    p.finish_instruction(asm, InstrKind::Push { iffull, block }, "push")
}

fn prefix_pull(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let ifempty = p.eat_kw("ifempty")?;
    let block = parse_blocking(p)?;
    p.finish_instruction(asm, InstrKind::Pull { ifempty, block }, "pull")
}

// `[block|noblock]`, defaulting to block
fn parse_blocking(p: &mut Parser<'_>) -> Result<bool, AsmError> {
    if p.eat_kw("noblock")? {
        Ok(false)
    } else {
        p.eat_kw("block")?;
        Ok(true)
    }
}

fn prefix_mov(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let dest_tok = p.advance()?;
    let dest = match &dest_tok.kind {
        TokenKind::Keyword(k) => match k.as_str() {
            "pins" => MovDest::Pins,
            "x" => MovDest::X,
            "y" => MovDest::Y,
            "exec" => MovDest::Exec,
            "pc" => MovDest::Pc,
            "isr" => MovDest::Isr,
            "osr" => MovDest::Osr,
            _ => {
                return Err(AsmError::InvalidOperand {
                    mnemonic: "mov",
                    slot: "destination",
                });
            }
        },
        _ => {
            return Err(AsmError::InvalidOperand {
                mnemonic: "mov",
                slot: "destination",
            });
        }
    };
    p.eat_comma()?;
    let op = if p.eat_kw("~")? || p.eat_kw("!")? {
        MovOp::Invert
    } else if p.eat_kw("::")? {
        MovOp::Reverse
    } else {
        MovOp::None
    };
    let source_tok = p.advance()?;
    let source = match &source_tok.kind {
        TokenKind::Keyword(k) => match k.as_str() {
            "pins" => MovSource::Pins,
            "x" => MovSource::X,
            "y" => MovSource::Y,
            "null" => MovSource::Null,
            "status" => MovSource::Status,
            "isr" => MovSource::Isr,
            "osr" => MovSource::Osr,
            _ => {
                return Err(AsmError::InvalidOperand {
                    mnemonic: "mov",
                    slot: "source",
                });
            }
        },
        _ => {
            return Err(AsmError::InvalidOperand {
                mnemonic: "mov",
                slot: "source",
            });
        }
    };
    p.finish_instruction(asm, InstrKind::Mov { dest, op, source }, "mov")
}

fn prefix_irq(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let mut mode = if p.eat_kw("prev")? {
        IrqIndexMode::Prev
    } else if p.eat_kw("next")? {
        IrqIndexMode::Next
    } else {
        IrqIndexMode::Direct
    };
    // action, defaulting to set
    let mut clear = false;
    let mut wait = false;
    if p.eat_kw("clear")? {
        clear = true;
    } else if p.eat_kw("wait")? {
        wait = true;
    } else if p.eat_kw("set")? || p.eat_kw("nowait")? || p.eat_kw("-")? {
        // explicit default
    }
    let index = p.parse_value(asm)?;
    if p.eat_kw("rel")? {
        if mode != IrqIndexMode::Direct {
            return Err(AsmError::InvalidOperand {
                mnemonic: "irq",
                slot: "rel combined with prev/next",
            });
        }
        mode = IrqIndexMode::Rel;
    }
    p.finish_instruction(
        asm,
        InstrKind::Irq {
            mode,
            clear,
            wait,
            index,
        },
        "irq",
    )
}

fn prefix_set(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    let dest_tok = p.advance()?;
    let dest = match &dest_tok.kind {
        TokenKind::Keyword(k) => match k.as_str() {
            "pins" => SetDest::Pins,
            "x" => SetDest::X,
            "y" => SetDest::Y,
            "pindirs" => SetDest::Pindirs,
            _ => {
                return Err(AsmError::InvalidOperand {
                    mnemonic: "set",
                    slot: "destination",
                });
            }
        },
        _ => {
            return Err(AsmError::InvalidOperand {
                mnemonic: "set",
                slot: "destination",
            });
        }
    };
    p.eat_comma()?;
    let data = p.parse_value(asm)?;
    p.finish_instruction(asm, InstrKind::Set { dest, data }, "set")
}

fn prefix_nop(p: &mut Parser<'_>, asm: &mut PioAssembler, tok: &Token) -> Result<(), AsmError> {
    p.stmt_context(tok)?;
    p.finish_instruction(asm, InstrKind::Nop, "nop")
}

// ------------- unit tests -------------
