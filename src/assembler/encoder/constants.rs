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

use crate::ast::{
    InSource, IrqIndexMode, JmpCond, MovDest, MovOp, MovSource, OutDest, SetDest, WaitSource,
};

// Major opcodes, bits 15..13. Push and pull share a major opcode and are
// distinguished by bit 7.
pub const OP_JMP: u16 = 0b000 << 13;
pub const OP_WAIT: u16 = 0b001 << 13;
pub const OP_IN: u16 = 0b010 << 13;
pub const OP_OUT: u16 = 0b011 << 13;
pub const OP_PUSH: u16 = 0b100 << 13;
pub const OP_PULL: u16 = (0b100 << 13) | (1 << 7);
pub const OP_MOV: u16 = 0b101 << 13;
pub const OP_IRQ: u16 = 0b110 << 13;
pub const OP_SET: u16 = 0b111 << 13;

pub const PUSH_IFFULL: u16 = 1 << 6;
pub const PULL_IFEMPTY: u16 = 1 << 6;
pub const FIFO_BLOCK: u16 = 1 << 5;

pub const IRQ_CLEAR: u16 = 1 << 6;
pub const IRQ_WAIT: u16 = 1 << 5;

pub fn jmp_cond_bits(cond: JmpCond) -> u16 {
    let code: u16 = match cond {
        JmpCond::Always => 0b000,
        JmpCond::NotX => 0b001,
        JmpCond::XDec => 0b010,
        JmpCond::NotY => 0b011,
        JmpCond::YDec => 0b100,
        JmpCond::XNeY => 0b101,
        JmpCond::Pin => 0b110,
        JmpCond::NotOsre => 0b111,
    };
    code << 5
}

// 0b11 (jmppin) is rp2350 only; the emitter gates it on the program version.
pub fn wait_source_bits(source: WaitSource) -> u16 {
    let code: u16 = match source {
        WaitSource::Gpio => 0b00,
        WaitSource::Pin => 0b01,
        WaitSource::Irq => 0b10,
        WaitSource::JmpPin => 0b11,
    };
    code << 5
}

pub fn in_source_bits(source: InSource) -> u16 {
    let code: u16 = match source {
        InSource::Pins => 0b000,
        InSource::X => 0b001,
        InSource::Y => 0b010,
        InSource::Null => 0b011,
        // 100, 101 reserved
        InSource::Isr => 0b110,
        InSource::Osr => 0b111,
    };
    code << 5
}

pub fn out_dest_bits(dest: OutDest) -> u16 {
    let code: u16 = match dest {
        OutDest::Pins => 0b000,
        OutDest::X => 0b001,
        OutDest::Y => 0b010,
        OutDest::Null => 0b011,
        OutDest::Pindirs => 0b100,
        OutDest::Pc => 0b101,
        OutDest::Isr => 0b110,
        OutDest::Osr => 0b111,
    };
    code << 5
}

pub fn mov_dest_bits(dest: MovDest) -> u16 {
    let code: u16 = match dest {
        MovDest::Pins => 0b000,
        MovDest::X => 0b001,
        MovDest::Y => 0b010,
        // 011 reserved
        MovDest::Exec => 0b100,
        MovDest::Pc => 0b101,
        MovDest::Isr => 0b110,
        MovDest::Osr => 0b111,
    };
    code << 5
}

pub fn mov_op_bits(op: MovOp) -> u16 {
    let code: u16 = match op {
        MovOp::None => 0b00,
        MovOp::Invert => 0b01,
        MovOp::Reverse => 0b10,
        // 11 reserved
    };
    code << 3
}

pub fn mov_source_bits(source: MovSource) -> u16 {
    match source {
        MovSource::Pins => 0b000,
        MovSource::X => 0b001,
        MovSource::Y => 0b010,
        MovSource::Null => 0b011,
        // 100 reserved
        MovSource::Status => 0b101,
        MovSource::Isr => 0b110,
        MovSource::Osr => 0b111,
    }
}

pub fn set_dest_bits(dest: SetDest) -> u16 {
    let code: u16 = match dest {
        SetDest::Pins => 0b000,
        SetDest::X => 0b001,
        SetDest::Y => 0b010,
        // 011 reserved
        SetDest::Pindirs => 0b100,
        // 101..111 reserved
    };
    code << 5
}

// Index-mode bits 4..3 of the irq / wait-irq index field. Prev and Next are
// rp2350 only; Rel doubles as the rp2040 "add SM number" flag (bit 4).
pub fn irq_mode_bits(mode: IrqIndexMode) -> u16 {
    let code: u16 = match mode {
        IrqIndexMode::Direct => 0b00,
        IrqIndexMode::Prev => 0b01,
        IrqIndexMode::Rel => 0b10,
        IrqIndexMode::Next => 0b11,
    };
    code << 3
}
