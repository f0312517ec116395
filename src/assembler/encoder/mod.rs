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

pub mod constants;

use crate::ast::{
    InSource, InstructionVisitor, IrqIndexMode, JmpCond, MovDest, MovOp, MovSource, OutDest,
    SetDest, Value, WaitSource,
};
use crate::errors::AsmError;
use crate::program::{MAX_PROGRAM_LEN, PioVersion, SideSet};
use constants::*;

/// Emits 16-bit opcodes from fully resolved instructions. Every opcode is
///
/// ```text
/// bits 15..13  major opcode
/// bits 12..8   delay / side-set field
/// bits  7..0   mnemonic specific
/// ```
///
/// `side`/`delay` OR their bits onto the most recently emitted opcode, so
/// they must be visited after the mnemonic itself.
pub struct Emitter {
    out: Vec<u16>,
    side_set: SideSet,
    version: PioVersion,
}

impl Emitter {
    pub fn new(side_set: SideSet, version: PioVersion) -> Result<Emitter, AsmError> {
        if side_set.count > 5 {
            return Err(AsmError::InvalidSideSetConfig {
                reason: format!("count {} not in 0..=5", side_set.count),
            });
        }
        if side_set.opt && side_set.count < 2 {
            return Err(AsmError::InvalidSideSetConfig {
                reason: "optional side-set needs count >= 2 (enable bit plus data)".to_string(),
            });
        }
        Ok(Emitter {
            out: Vec::new(),
            side_set,
            version,
        })
    }

    pub fn opcodes(&self) -> &[u16] {
        &self.out
    }

    pub fn into_opcodes(self) -> Vec<u16> {
        self.out
    }

    fn emit(&mut self, code: u16) -> Result<(), AsmError> {
        if self.out.len() >= MAX_PROGRAM_LEN {
            return Err(AsmError::ProgramTooLong);
        }
        self.out.push(code);
        Ok(())
    }

    fn or_last(&mut self, bits: u16, slot: &'static str) -> Result<(), AsmError> {
        match self.out.last_mut() {
            Some(op) => {
                *op |= bits;
                Ok(())
            }
            None => Err(AsmError::InvalidOperand {
                mnemonic: slot,
                slot: "placement",
            }),
        }
    }

    // The resolver runs ahead of the emitter, so operands must arrive as
    // plain integers here.
    fn want_int(value: &Value, field: &'static str) -> Result<i32, AsmError> {
        match value {
            Value::Num(n) => Ok(*n),
            Value::Sym(name) => Err(AsmError::ValueNotAssigned { name: name.clone() }),
            Value::Expr(_) => Err(AsmError::BadExpression {
                reason: format!("unresolved expression in {}", field),
            }),
        }
    }

    fn check_1_bit(value: &Value, field: &'static str) -> Result<u16, AsmError> {
        let v = Self::want_int(value, field)?;
        if !(0..=1).contains(&v) {
            return Err(AsmError::OutOfRange { field, value: v });
        }
        Ok(v as u16)
    }

    // 5-bit field, negatives encoded two's-complement
    fn check_5_bits(value: &Value, field: &'static str) -> Result<u16, AsmError> {
        let v = Self::want_int(value, field)?;
        if !(-16..=31).contains(&v) {
            return Err(AsmError::OutOfRange { field, value: v });
        }
        Ok((v & 31) as u16)
    }

    fn check_16_bits(value: &Value, field: &'static str) -> Result<u16, AsmError> {
        let v = Self::want_int(value, field)?;
        if !(-32768..=65535).contains(&v) {
            return Err(AsmError::OutOfRange { field, value: v });
        }
        Ok((v & 0xffff) as u16)
    }

    // bit counts: 1..32, with 32 truncating to 0
    fn check_pin_count(value: &Value, field: &'static str) -> Result<u16, AsmError> {
        let v = Self::want_int(value, field)?;
        if !(1..=32).contains(&v) {
            return Err(AsmError::OutOfRange { field, value: v });
        }
        Ok((v & 31) as u16)
    }

    // jmp targets are instruction addresses, never negative
    fn check_jmp_addr(value: &Value) -> Result<u16, AsmError> {
        let v = Self::want_int(value, "jmp target")?;
        if !(0..=31).contains(&v) {
            return Err(AsmError::OutOfRange {
                field: "jmp target",
                value: v,
            });
        }
        Ok(v as u16)
    }

    // irq numbers are 3 bits; bits 4..3 carry the index mode
    fn check_irq_index(value: &Value, field: &'static str) -> Result<u16, AsmError> {
        let v = Self::want_int(value, field)?;
        if !(0..=7).contains(&v) {
            return Err(AsmError::OutOfRange { field, value: v });
        }
        Ok(v as u16)
    }

    fn check_mode_available(
        &self,
        mode: IrqIndexMode,
        mnemonic: &'static str,
    ) -> Result<(), AsmError> {
        if matches!(mode, IrqIndexMode::Prev | IrqIndexMode::Next)
            && self.version == PioVersion::Rp2040
        {
            return Err(AsmError::InvalidOperand {
                mnemonic,
                slot: "prev/next (rp2350 only)",
            });
        }
        Ok(())
    }
}

impl InstructionVisitor for Emitter {
    fn jmp(&mut self, cond: JmpCond, target: &Value) -> Result<(), AsmError> {
        let addr = Self::check_jmp_addr(target)?;
        self.emit(OP_JMP | jmp_cond_bits(cond) | addr)
    }

    fn wait(
        &mut self,
        polarity: &Value,
        source: WaitSource,
        index: &Value,
        mode: IrqIndexMode,
    ) -> Result<(), AsmError> {
        let pol = Self::check_1_bit(polarity, "wait polarity")?;
        let idx = match source {
            WaitSource::Gpio | WaitSource::Pin => {
                if mode != IrqIndexMode::Direct {
                    return Err(AsmError::InvalidOperand {
                        mnemonic: "wait",
                        slot: "index mode",
                    });
                }
                Self::check_5_bits(index, "wait index")?
            }
            WaitSource::Irq => {
                self.check_mode_available(mode, "wait")?;
                Self::check_irq_index(index, "wait irq index")? | irq_mode_bits(mode)
            }
            WaitSource::JmpPin => {
                if self.version == PioVersion::Rp2040 {
                    return Err(AsmError::InvalidOperand {
                        mnemonic: "wait",
                        slot: "jmppin (rp2350 only)",
                    });
                }
                let v = Self::want_int(index, "wait jmppin offset")?;
                if !(0..=3).contains(&v) {
                    return Err(AsmError::OutOfRange {
                        field: "wait jmppin offset",
                        value: v,
                    });
                }
                v as u16
            }
        };
        self.emit(OP_WAIT | (pol << 7) | wait_source_bits(source) | idx)
    }

    fn in_(&mut self, source: InSource, count: &Value) -> Result<(), AsmError> {
        let n = Self::check_pin_count(count, "in count")?;
        self.emit(OP_IN | in_source_bits(source) | n)
    }

    fn out(&mut self, dest: OutDest, count: &Value) -> Result<(), AsmError> {
        let n = Self::check_pin_count(count, "out count")?;
        self.emit(OP_OUT | out_dest_bits(dest) | n)
    }

    fn push(&mut self, iffull: bool, block: bool) -> Result<(), AsmError> {
        let mut code = OP_PUSH;
        if iffull {
            code |= PUSH_IFFULL;
        }
        if block {
            code |= FIFO_BLOCK;
        }
        self.emit(code)
    }

    fn pull(&mut self, ifempty: bool, block: bool) -> Result<(), AsmError> {
        let mut code = OP_PULL;
        if ifempty {
            code |= PULL_IFEMPTY;
        }
        if block {
            code |= FIFO_BLOCK;
        }
        self.emit(code)
    }

    fn mov(&mut self, dest: MovDest, op: MovOp, source: MovSource) -> Result<(), AsmError> {
        self.emit(OP_MOV | mov_dest_bits(dest) | mov_op_bits(op) | mov_source_bits(source))
    }

    fn irq(
        &mut self,
        mode: IrqIndexMode,
        clear: bool,
        wait: bool,
        index: &Value,
    ) -> Result<(), AsmError> {
        self.check_mode_available(mode, "irq")?;
        let idx = Self::check_irq_index(index, "irq index")?;
        let mut code = OP_IRQ | irq_mode_bits(mode) | idx;
        if clear {
            code |= IRQ_CLEAR;
        }
        if wait {
            code |= IRQ_WAIT;
        }
        self.emit(code)
    }

    fn set(&mut self, dest: SetDest, data: &Value) -> Result<(), AsmError> {
        let v = Self::check_5_bits(data, "set data")?;
        self.emit(OP_SET | set_dest_bits(dest) | v)
    }

    fn nop(&mut self) -> Result<(), AsmError> {
        // canonical encoding: mov y, y
        self.mov(MovDest::Y, MovOp::None, MovSource::Y)
    }

    fn word(&mut self, value: &Value) -> Result<(), AsmError> {
        let code = Self::check_16_bits(value, ".word value")?;
        self.emit(code)
    }

    fn delay(&mut self, delay: &Value) -> Result<(), AsmError> {
        let v = Self::want_int(delay, "delay")?;
        let width = self.side_set.delay_width();
        if v < 0 || v >= (1 << width) {
            return Err(AsmError::OutOfRange {
                field: "delay",
                value: v,
            });
        }
        self.or_last((v as u16) << 8, "delay")
    }

    fn side(&mut self, side: &Value) -> Result<(), AsmError> {
        let v = Self::want_int(side, "side")?;
        let payload = self.side_set.payload_width();
        if self.side_set.count == 0 || v < 0 || v >= (1 << payload) {
            return Err(AsmError::OutOfRange {
                field: "side",
                value: v,
            });
        }
        let mut field = (v as u16) << self.side_set.delay_width();
        if self.side_set.opt {
            field |= 1 << 4; // per-instruction enable, bit 12 of the opcode
        }
        self.or_last(field << 8, "side")
    }
}

// ------------- unit tests -------------
