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

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use clap::ValueEnum;
use pioasm::assemble_file;
use pioasm::program::Program;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Full program dump (opcodes, defines, wrap points, side-set config)
    Json,
    /// Plain opcode listing
    Hex,
}

#[derive(clap_parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    #[clap(short, long)]
    input: PathBuf,
    /// Write here instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,
    #[clap(short, long, value_enum, default_value = "hex")]
    format: Format,
}

fn render_hex(programs: &[Program]) -> String {
    let mut out = String::new();
    for program in programs {
        let _ = writeln!(out, "{}:", program.name);
        for (offset, opcode) in program.opcodes.iter().enumerate() {
            let _ = writeln!(out, "    0x{:04x}, // {:2}", opcode, offset);
        }
    }
    out
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    let programs = assemble_file(&opts.input)?;

    let rendered = match opts.format {
        Format::Json => serde_json::to_string_pretty(&programs)
            .context("failed to serialize assembled programs")?,
        Format::Hex => render_hex(&programs),
    };

    match &opts.output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!(
                "Successfully assembled {} to {}",
                opts.input.display(),
                path.display()
            );
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
