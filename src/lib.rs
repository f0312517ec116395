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

pub mod assembler;
pub mod ast;
pub mod errors;
pub mod parser;
pub mod program;
pub mod scanner;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use assembler::PioAssembler;
use parser::Parser;
use program::Program;
use scanner::Scanner;

/// Assemble every `.program` in a pioasm source string.
pub fn assemble_str(source: &str) -> Result<Vec<Program>> {
    let mut asm = PioAssembler::new();
    let mut parser = Parser::new(Scanner::new(source));
    parser
        .parse_into(&mut asm)
        .context("failed during parse phase")?;
    asm.finish().context("failed during resolve/encode phase")
}

/// Assemble a `.pio` file.
pub fn assemble_file(path: &Path) -> Result<Vec<Program>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    assemble_str(&source)
}
