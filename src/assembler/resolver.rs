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

use crate::assembler::defines::Defines;
use crate::ast::{
    InSource, InstructionVisitor, IrqIndexMode, JmpCond, MovDest, MovOp, MovSource, OutDest,
    SetDest, Value, WaitSource,
};
use crate::errors::AsmError;

/// Wedge between the instruction stream and the encoder: rewrites symbolic
/// operands to integers by looking them up in the program's defines table,
/// and evaluates parenthesized operand expressions. Integer operands pass
/// through untouched, so resolving an already-resolved stream is a no-op.
pub struct Resolver<'a, V> {
    defines: &'a Defines,
    next: &'a mut V,
}

impl<'a, V: InstructionVisitor> Resolver<'a, V> {
    pub fn new(defines: &'a Defines, next: &'a mut V) -> Resolver<'a, V> {
        Resolver { defines, next }
    }

    fn resolve(&self, value: &Value) -> Result<Value, AsmError> {
        match value {
            Value::Num(n) => Ok(Value::Num(*n)),
            Value::Sym(name) => Ok(Value::Num(self.defines.resolve(name)?)),
            Value::Expr(e) => Ok(Value::Num(self.defines.eval(e)?)),
        }
    }
}

impl<V: InstructionVisitor> InstructionVisitor for Resolver<'_, V> {
    fn jmp(&mut self, cond: JmpCond, target: &Value) -> Result<(), AsmError> {
        let addr = self.resolve(target)?;
        self.next.jmp(cond, &addr)
    }

    fn wait(
        &mut self,
        polarity: &Value,
        source: WaitSource,
        index: &Value,
        mode: IrqIndexMode,
    ) -> Result<(), AsmError> {
        let pol = self.resolve(polarity)?;
        let idx = self.resolve(index)?;
        self.next.wait(&pol, source, &idx, mode)
    }

    fn in_(&mut self, source: InSource, count: &Value) -> Result<(), AsmError> {
        let n = self.resolve(count)?;
        self.next.in_(source, &n)
    }

    fn out(&mut self, dest: OutDest, count: &Value) -> Result<(), AsmError> {
        let n = self.resolve(count)?;
        self.next.out(dest, &n)
    }

    fn push(&mut self, iffull: bool, block: bool) -> Result<(), AsmError> {
        self.next.push(iffull, block)
    }

    fn pull(&mut self, ifempty: bool, block: bool) -> Result<(), AsmError> {
        self.next.pull(ifempty, block)
    }

    fn mov(&mut self, dest: MovDest, op: MovOp, source: MovSource) -> Result<(), AsmError> {
        self.next.mov(dest, op, source)
    }

    fn irq(
        &mut self,
        mode: IrqIndexMode,
        clear: bool,
        wait: bool,
        index: &Value,
    ) -> Result<(), AsmError> {
        let idx = self.resolve(index)?;
        self.next.irq(mode, clear, wait, &idx)
    }

    fn set(&mut self, dest: SetDest, data: &Value) -> Result<(), AsmError> {
        let v = self.resolve(data)?;
        self.next.set(dest, &v)
    }

    fn nop(&mut self) -> Result<(), AsmError> {
        self.next.nop()
    }

    fn word(&mut self, value: &Value) -> Result<(), AsmError> {
        let v = self.resolve(value)?;
        self.next.word(&v)
    }

    fn delay(&mut self, delay: &Value) -> Result<(), AsmError> {
        let v = self.resolve(delay)?;
        self.next.delay(&v)
    }

    fn side(&mut self, side: &Value) -> Result<(), AsmError> {
        let v = self.resolve(side)?;
        self.next.side(&v)
    }
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::defines::DefineValue;
    use crate::assembler::encoder::Emitter;
    use crate::ast::{BinOp, Expr, Instruction, InstrKind};
    use crate::program::{PioVersion, SideSet};

    fn defines() -> Defines {
        let mut defs = Defines::new();
        defs.define("target", DefineValue::Int(3), false).unwrap();
        defs.define("count", DefineValue::Int(8), false).unwrap();
        defs
    }

    #[test]
    fn test_symbols_resolve_through_defines() {
        let defs = defines();
        let mut e = Emitter::new(SideSet::default(), PioVersion::Rp2040).unwrap();
        let mut r = Resolver::new(&defs, &mut e);
        r.jmp(JmpCond::Always, &Value::Sym("target".to_string()))
            .unwrap();
        assert_eq!(e.opcodes(), &[0x0003]);
    }

    #[test]
    fn test_expressions_evaluate_at_resolve_time() {
        let defs = defines();
        let mut e = Emitter::new(SideSet::default(), PioVersion::Rp2040).unwrap();
        let mut r = Resolver::new(&defs, &mut e);
        let expr = Expr::Binary(
            BinOp::Sub,
            Box::new(Expr::Sym("count".to_string())),
            Box::new(Expr::Num(1)),
        );
        r.out(OutDest::Pins, &Value::Expr(expr)).unwrap();
        assert_eq!(e.opcodes(), &[0x6007]);
    }

    #[test]
    fn test_unresolved_symbol_fails() {
        let defs = defines();
        let mut e = Emitter::new(SideSet::default(), PioVersion::Rp2040).unwrap();
        let mut r = Resolver::new(&defs, &mut e);
        assert_eq!(
            r.jmp(JmpCond::Always, &Value::Sym("nowhere".to_string())),
            Err(AsmError::NotDefined {
                name: "nowhere".to_string()
            })
        );
    }

    // Resolving a stream twice must produce the same opcodes: integers pass
    // through unchanged.
    #[test]
    fn test_resolver_idempotence() {
        let defs = defines();
        let prog = vec![
            Instruction::new(InstrKind::Jmp {
                cond: JmpCond::Always,
                target: Value::Sym("target".to_string()),
            }),
            Instruction::new(InstrKind::Set {
                dest: SetDest::X,
                data: Value::Num(5),
            }),
        ];

        let mut first = Emitter::new(SideSet::default(), PioVersion::Rp2040).unwrap();
        {
            let mut r = Resolver::new(&defs, &mut first);
            for i in &prog {
                i.visit(&mut r).unwrap();
            }
        }

        // second pass over operands that are already plain integers
        let resolved = vec![
            Instruction::new(InstrKind::Jmp {
                cond: JmpCond::Always,
                target: Value::Num(3),
            }),
            Instruction::new(InstrKind::Set {
                dest: SetDest::X,
                data: Value::Num(5),
            }),
        ];
        let mut second = Emitter::new(SideSet::default(), PioVersion::Rp2040).unwrap();
        {
            let mut r = Resolver::new(&defs, &mut second);
            for i in &resolved {
                i.visit(&mut r).unwrap();
            }
        }

        assert_eq!(first.opcodes(), second.opcodes());
    }
}
