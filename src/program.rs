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

use serde::Serialize;

pub const MAX_PROGRAM_LEN: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PioVersion {
    Rp2040,
    Rp2350,
}

impl Default for PioVersion {
    fn default() -> Self {
        PioVersion::Rp2040
    }
}

// Side-set configuration from `.side_set <count> [opt] [pindirs]`. The
// declared count includes the enable bit when `opt` is set, so the data
// payload is `count - 1` bits in that case.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SideSet {
    pub count: u8,
    pub opt: bool,
    pub pindirs: bool,
}

impl SideSet {
    /// Bits of the 5-bit field left over for per-instruction delay.
    pub fn delay_width(&self) -> u32 {
        5 - self.count as u32
    }

    /// Bits available for the side-set value itself.
    pub fn payload_width(&self) -> u32 {
        self.count as u32 - self.opt as u32
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftDir {
    Left,
    Right,
}

// `.in` / `.out` shift configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftConfig {
    pub count: u8,
    pub dir: Option<ShiftDir>,
    pub auto: Option<bool>,
    pub threshold: Option<u8>,
}

// One entry of a program's symbol table, exported to downstream tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Define {
    pub name: String,
    pub value: i32,
    pub public: bool,
}

// `.lang_opt <lang> <key> = <value...>`, captured opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LangOpt {
    pub lang: String,
    pub key: String,
    pub value: String,
}

/// A finished, immutable program: opcodes plus everything a loader needs to
/// configure a state machine for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub name: String,
    pub pio_version: PioVersion,
    pub side_set: SideSet,
    pub origin: Option<u8>,
    pub opcodes: Vec<u16>,
    pub defines: Vec<Define>,
    pub wrap_target: Option<u8>,
    pub wrap: Option<u8>,
    pub in_shift: Option<ShiftConfig>,
    pub out_shift: Option<ShiftConfig>,
    pub set_count: Option<u8>,
    pub clock_div: Option<i32>,
    pub lang_opts: Vec<LangOpt>,
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_width() {
        let ss = SideSet {
            count: 1,
            opt: false,
            pindirs: false,
        };
        assert_eq!(ss.delay_width(), 4);
        assert_eq!(ss.payload_width(), 1);
    }

    #[test]
    fn test_opt_steals_a_payload_bit() {
        let ss = SideSet {
            count: 2,
            opt: true,
            pindirs: false,
        };
        assert_eq!(ss.delay_width(), 3);
        assert_eq!(ss.payload_width(), 1);
    }

    #[test]
    fn test_default_side_set_leaves_full_delay() {
        let ss = SideSet::default();
        assert_eq!(ss.delay_width(), 5);
        assert_eq!(ss.payload_width(), 0);
    }
}
