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

use thiserror::Error;

// Every failure in the pipeline is an AsmError. The first error aborts the
// current assembly; there is no recovery or warning channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsmError {
    #[error("line {line}:{col}: unterminated block comment")]
    UnterminatedComment { line: usize, col: usize },

    #[error("line {line}:{col}: bad input character {found:?}")]
    BadInput {
        line: usize,
        col: usize,
        found: char,
    },

    #[error("line {line}:{col}: bad number \"{text}\"")]
    BadNumber {
        line: usize,
        col: usize,
        text: String,
    },

    #[error("line {line}:{col}: \"{token}\" is not a prefix operator")]
    NotAPrefixOperator {
        line: usize,
        col: usize,
        token: String,
    },

    #[error("line {line}:{col}: \"{token}\" is not an infix operator")]
    NotAnInfixOperator {
        line: usize,
        col: usize,
        token: String,
    },

    #[error("line {line}:{col}: expected a value, found \"{found}\"")]
    ExpectedValue {
        line: usize,
        col: usize,
        found: String,
    },

    #[error("line {line}:{col}: expected {expected}, found \"{found}\"")]
    ExpectedToken {
        line: usize,
        col: usize,
        expected: &'static str,
        found: String,
    },

    #[error("invalid {slot} operand for {mnemonic}")]
    InvalidOperand {
        mnemonic: &'static str,
        slot: &'static str,
    },

    #[error("\"{name}\" already defined")]
    AlreadyDefined { name: String },

    #[error("\"{name}\" already assigned")]
    AlreadyAssigned { name: String },

    #[error("\"{name}\" not declared")]
    NotDeclared { name: String },

    #[error("value of \"{name}\" not assigned")]
    ValueNotAssigned { name: String },

    #[error("\"{name}\" not defined")]
    NotDefined { name: String },

    #[error("bad expression: {reason}")]
    BadExpression { reason: String },

    #[error("{field}: value {value} out of range")]
    OutOfRange { field: &'static str, value: i32 },

    #[error("program longer than 32 instructions")]
    ProgramTooLong,

    #[error("instruction outside of a program")]
    InstructionOutsideProgram,

    #[error(".wrap already used")]
    WrapAlreadyUsed,

    #[error(".wrap_target already used")]
    WrapTargetAlreadyUsed,

    #[error("invalid side-set configuration: {reason}")]
    InvalidSideSetConfig { reason: String },

    #[error("instruction {index}: {source}")]
    AtInstruction {
        index: usize,
        #[source]
        source: Box<AsmError>,
    },
}

impl AsmError {
    /// Tag an error with the index of the instruction it was raised at.
    pub fn at_instruction(self, index: usize) -> AsmError {
        AsmError::AtInstruction {
            index,
            source: Box::new(self),
        }
    }
}
