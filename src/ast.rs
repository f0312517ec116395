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

use crate::errors::AsmError;

// --- Expressions ---

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,     // -e
    Not,     // ~e (also written !e)
    Reverse, // ::e, 32-bit bit reversal
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Or,    // |
    And,   // &
    Eq,    // ==
    Ne,    // !=
    Lt,    // <
    Shl,   // <<
    Shr,   // >>
    Add,   // +
    Sub,   // -
    Mul,   // *
    Div,   // /
    Rem,   // %
}

// Expression tree built by the parser. All arithmetic is two's-complement
// 32-bit; symbols are looked up in the defines table at resolve time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(i32),
    Sym(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// True when the expression contains no symbol references and can be
    /// folded to a constant without a defines table.
    pub fn is_const(&self) -> bool {
        match self {
            Expr::Num(_) => true,
            Expr::Sym(_) => false,
            Expr::Unary(_, e) => e.is_const(),
            Expr::Binary(_, l, r) => l.is_const() && r.is_const(),
        }
    }
}

// An instruction operand slot: a literal, a symbol resolved later, or a
// parenthesized expression evaluated at resolve time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(i32),
    Sym(String),
    Expr(Expr),
}

// --- Instruction operand enums ---

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JmpCond {
    Always,  // jmp <target>
    NotX,    // jmp !x, <target>
    XDec,    // jmp x--, <target>
    NotY,    // jmp !y, <target>
    YDec,    // jmp y--, <target>
    XNeY,    // jmp x!=y, <target>
    Pin,     // jmp pin, <target>
    NotOsre, // jmp !osre, <target>
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaitSource {
    Gpio,
    Pin,
    Irq,
    JmpPin, // rp2350 only
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InSource {
    Pins,
    X,
    Y,
    Null,
    Isr,
    Osr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutDest {
    Pins,
    X,
    Y,
    Null,
    Pindirs,
    Pc,
    Isr,
    Osr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MovDest {
    Pins,
    X,
    Y,
    Exec,
    Pc,
    Isr,
    Osr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MovOp {
    None,
    Invert,  // ~ (also written !)
    Reverse, // ::
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MovSource {
    Pins,
    X,
    Y,
    Null,
    Status,
    Isr,
    Osr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SetDest {
    Pins,
    X,
    Y,
    Pindirs,
}

// Index mode for irq and wait-irq. Prev/Next are rp2350 extensions; Rel adds
// the state machine number to the low two index bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IrqIndexMode {
    Direct,
    Prev,
    Rel,
    Next,
}

// --- Instructions ---

// One PIO instruction as parsed, before symbol resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    Jmp { cond: JmpCond, target: Value },
    Wait { polarity: Value, source: WaitSource, index: Value, mode: IrqIndexMode },
    In { source: InSource, count: Value },
    Out { dest: OutDest, count: Value },
    Push { iffull: bool, block: bool },
    Pull { ifempty: bool, block: bool },
    Mov { dest: MovDest, op: MovOp, source: MovSource },
    Irq { mode: IrqIndexMode, clear: bool, wait: bool, index: Value },
    Set { dest: SetDest, data: Value },
    Nop,
    Word { value: Value }, // .word literal opcode
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstrKind,
    pub side: Option<Value>,
    pub delay: Option<Value>,
}

impl Instruction {
    pub fn new(kind: InstrKind) -> Instruction {
        Instruction {
            kind,
            side: None,
            delay: None,
        }
    }

    /// Walk one instruction through a visitor: the mnemonic method first,
    /// then delay, then side. The encoder relies on this order to OR the
    /// side/delay bits onto the opcode it just emitted.
    pub fn visit<V: InstructionVisitor>(&self, v: &mut V) -> Result<(), AsmError> {
        match &self.kind {
            InstrKind::Jmp { cond, target } => v.jmp(*cond, target)?,
            InstrKind::Wait {
                polarity,
                source,
                index,
                mode,
            } => v.wait(polarity, *source, index, *mode)?,
            InstrKind::In { source, count } => v.in_(*source, count)?,
            InstrKind::Out { dest, count } => v.out(*dest, count)?,
            InstrKind::Push { iffull, block } => v.push(*iffull, *block)?,
            InstrKind::Pull { ifempty, block } => v.pull(*ifempty, *block)?,
            InstrKind::Mov { dest, op, source } => v.mov(*dest, *op, *source)?,
            InstrKind::Irq {
                mode,
                clear,
                wait,
                index,
            } => v.irq(*mode, *clear, *wait, index)?,
            InstrKind::Set { dest, data } => v.set(*dest, data)?,
            InstrKind::Nop => v.nop()?,
            InstrKind::Word { value } => v.word(value)?,
        }
        if let Some(delay) = &self.delay {
            v.delay(delay)?;
        }
        if let Some(side) = &self.side {
            v.side(side)?;
        }
        Ok(())
    }
}

// Downstream consumers of the instruction stream (resolver, encoder) all
// implement this; the resolver wraps another visitor and rewrites symbolic
// operands to integers on the way through.
pub trait InstructionVisitor {
    fn jmp(&mut self, cond: JmpCond, target: &Value) -> Result<(), AsmError>;
    fn wait(
        &mut self,
        polarity: &Value,
        source: WaitSource,
        index: &Value,
        mode: IrqIndexMode,
    ) -> Result<(), AsmError>;
    fn in_(&mut self, source: InSource, count: &Value) -> Result<(), AsmError>;
    fn out(&mut self, dest: OutDest, count: &Value) -> Result<(), AsmError>;
    fn push(&mut self, iffull: bool, block: bool) -> Result<(), AsmError>;
    fn pull(&mut self, ifempty: bool, block: bool) -> Result<(), AsmError>;
    fn mov(&mut self, dest: MovDest, op: MovOp, source: MovSource) -> Result<(), AsmError>;
    fn irq(
        &mut self,
        mode: IrqIndexMode,
        clear: bool,
        wait: bool,
        index: &Value,
    ) -> Result<(), AsmError>;
    fn set(&mut self, dest: SetDest, data: &Value) -> Result<(), AsmError>;
    fn nop(&mut self) -> Result<(), AsmError>;
    fn word(&mut self, value: &Value) -> Result<(), AsmError>;
    fn delay(&mut self, delay: &Value) -> Result<(), AsmError>;
    fn side(&mut self, side: &Value) -> Result<(), AsmError>;
}
