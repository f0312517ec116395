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

pub mod defines;
pub mod encoder;
pub mod resolver;

use crate::ast::{Expr, Instruction, InstrKind, Value};
use crate::errors::AsmError;
use crate::program::{
    Define, LangOpt, MAX_PROGRAM_LEN, PioVersion, Program, ShiftConfig, SideSet,
};
use defines::{DefineValue, Defines};
use encoder::Emitter;
use resolver::Resolver;

// Name under which the wrap target is visible to jmp operands.
const WRAP_TARGET_LABEL: &str = ".wrap_target";

// Everything accumulated for the program currently being built (phase 1).
struct ProgramState {
    name: String,
    pio_version: PioVersion,
    pdefs: Defines,
    ilist: Vec<Instruction>,
    side_set: SideSet,
    origin: Option<Value>,
    wrap: Option<usize>,
    wrap_target: Option<usize>,
    in_shift: Option<ShiftConfig>,
    out_shift: Option<ShiftConfig>,
    set_count: Option<Value>,
    clock_div: Option<Value>,
    lang_opts: Vec<LangOpt>,
}

impl ProgramState {
    fn new(name: &str, pdefs: Defines) -> ProgramState {
        ProgramState {
            name: name.to_string(),
            pio_version: PioVersion::default(),
            pdefs,
            ilist: Vec::new(),
            side_set: SideSet::default(),
            origin: None,
            wrap: None,
            wrap_target: None,
            in_shift: None,
            out_shift: None,
            set_count: None,
            clock_div: None,
            lang_opts: Vec::new(),
        }
    }
}

/// The facade the parser (or an embedded builder) drives. Phase 1 collects
/// instructions and defines per program; phase 2 runs at `finish_current`
/// (or implicitly at the next `.program`) and resolves + encodes.
pub struct PioAssembler {
    adefs: Defines,
    programs: Vec<Program>,
    cur: Option<ProgramState>,
}

impl Default for PioAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PioAssembler {
    pub fn new() -> PioAssembler {
        PioAssembler {
            adefs: Defines::new(),
            programs: Vec::new(),
            cur: None,
        }
    }

    fn cur(&mut self) -> Result<&mut ProgramState, AsmError> {
        self.cur
            .as_mut()
            .ok_or(AsmError::InstructionOutsideProgram)
    }

    /// Open a new program. Public assembler-scope defines are copied in; a
    /// program already in progress is finalized first.
    pub fn begin_program(&mut self, name: &str) -> Result<(), AsmError> {
        self.finish_current()?;
        let pdefs = self.adefs.copy(true)?;
        self.cur = Some(ProgramState::new(name, pdefs));
        Ok(())
    }

    /// `.define` lands in the current program's table, or in the assembler
    /// scope when no program is open.
    pub fn define(&mut self, name: &str, expr: Expr, public: bool) -> Result<(), AsmError> {
        let tab = match self.cur.as_mut() {
            Some(state) => &mut state.pdefs,
            None => &mut self.adefs,
        };
        // fold constants now, keep symbolic expressions for resolve time
        let value = if expr.is_const() {
            DefineValue::Int(Defines::new().eval(&expr)?)
        } else {
            DefineValue::Expr(expr)
        };
        tab.define(name, value, public)
    }

    /// Place a label at the current instruction index. A previously declared
    /// forward label gets assigned; anything else is a fresh define.
    pub fn place_label(&mut self, name: &str, public: bool) -> Result<(), AsmError> {
        let state = self.cur()?;
        let index = state.ilist.len() as i32;
        if state.pdefs.contains(name) {
            state.pdefs.assign(name, index)
        } else {
            state.pdefs.define(name, DefineValue::Int(index), public)
        }
    }

    /// Reserve a forward label; its value is fixed by a later `place_label`.
    pub fn declare_label(&mut self, name: &str, public: bool) -> Result<(), AsmError> {
        self.cur()?.pdefs.declare(name, public)
    }

    /// Resolve a value against the current program's defines right away, for
    /// configuration directives whose value shapes later encoding.
    pub fn resolve_now(&mut self, value: &Value) -> Result<i32, AsmError> {
        let state = self.cur()?;
        Self::resolve_value(&state.pdefs, value)
    }

    pub fn pio_version(&mut self, version: PioVersion) -> Result<(), AsmError> {
        self.cur()?.pio_version = version;
        Ok(())
    }

    pub fn side_set(&mut self, count: i32, opt: bool, pindirs: bool) -> Result<(), AsmError> {
        if !(0..=5).contains(&count) {
            return Err(AsmError::InvalidSideSetConfig {
                reason: format!("count {} not in 0..=5", count),
            });
        }
        if opt && count < 2 {
            return Err(AsmError::InvalidSideSetConfig {
                reason: "optional side-set needs count >= 2 (enable bit plus data)".to_string(),
            });
        }
        self.cur()?.side_set = SideSet {
            count: count as u8,
            opt,
            pindirs,
        };
        Ok(())
    }

    pub fn origin(&mut self, offset: Value) -> Result<(), AsmError> {
        self.cur()?.origin = Some(offset);
        Ok(())
    }

    pub fn clock_div(&mut self, div: Value) -> Result<(), AsmError> {
        self.cur()?.clock_div = Some(div);
        Ok(())
    }

    pub fn in_shift(&mut self, cfg: ShiftConfig) -> Result<(), AsmError> {
        self.cur()?.in_shift = Some(cfg);
        Ok(())
    }

    pub fn out_shift(&mut self, cfg: ShiftConfig) -> Result<(), AsmError> {
        self.cur()?.out_shift = Some(cfg);
        Ok(())
    }

    pub fn set_count(&mut self, count: Value) -> Result<(), AsmError> {
        self.cur()?.set_count = Some(count);
        Ok(())
    }

    pub fn lang_opt(&mut self, lang: &str, key: &str, value: &str) -> Result<(), AsmError> {
        self.cur()?.lang_opts.push(LangOpt {
            lang: lang.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// `.wrap`: execution wraps after the previous instruction.
    pub fn wrap(&mut self) -> Result<(), AsmError> {
        let state = self.cur()?;
        if state.wrap.is_some() {
            return Err(AsmError::WrapAlreadyUsed);
        }
        if state.ilist.is_empty() {
            return Err(AsmError::OutOfRange {
                field: ".wrap",
                value: -1,
            });
        }
        state.wrap = Some(state.ilist.len() - 1);
        Ok(())
    }

    /// `.wrap_target`: execution wraps back to the next instruction.
    pub fn wrap_target(&mut self) -> Result<(), AsmError> {
        let state = self.cur()?;
        if state.wrap_target.is_some() {
            return Err(AsmError::WrapTargetAlreadyUsed);
        }
        state.wrap_target = Some(state.ilist.len());
        Ok(())
    }

    pub fn push_instr(&mut self, instr: Instruction) -> Result<(), AsmError> {
        let state = self.cur()?;
        if state.ilist.len() >= MAX_PROGRAM_LEN {
            return Err(AsmError::ProgramTooLong);
        }
        state.ilist.push(instr);
        Ok(())
    }

    /// `.word`: a literal 16-bit opcode, counted like any instruction.
    pub fn word(&mut self, value: Value) -> Result<(), AsmError> {
        self.push_instr(Instruction::new(InstrKind::Word { value }))
    }

    /// Phase 2 for the current program: resolve the instruction stream
    /// against its defines and encode it.
    pub fn finish_current(&mut self) -> Result<(), AsmError> {
        let Some(mut state) = self.cur.take() else {
            return Ok(());
        };

        // wrap_target doubles as a jmp-able label
        if let Some(wt) = state.wrap_target {
            if !state.pdefs.contains(WRAP_TARGET_LABEL) {
                state
                    .pdefs
                    .define(WRAP_TARGET_LABEL, DefineValue::Int(wt as i32), false)?;
            }
        }

        let mut emitter = Emitter::new(state.side_set, state.pio_version)?;
        {
            let mut resolver = Resolver::new(&state.pdefs, &mut emitter);
            for (index, instr) in state.ilist.iter().enumerate() {
                instr
                    .visit(&mut resolver)
                    .map_err(|e| e.at_instruction(index))?;
            }
        }
        let opcodes = emitter.into_opcodes();

        let len = opcodes.len();
        for (field, marker) in [(".wrap", state.wrap), (".wrap_target", state.wrap_target)] {
            if let Some(index) = marker {
                if index >= len {
                    return Err(AsmError::OutOfRange {
                        field,
                        value: index as i32,
                    });
                }
            }
        }
        if let (Some(wt), Some(w)) = (state.wrap_target, state.wrap) {
            if wt > w {
                return Err(AsmError::OutOfRange {
                    field: ".wrap_target",
                    value: wt as i32,
                });
            }
        }

        let origin = match &state.origin {
            Some(v) => Some(Self::resolve_small(&state.pdefs, v, ".origin", 0, 31)? as u8),
            None => None,
        };
        let set_count = match &state.set_count {
            Some(v) => Some(Self::resolve_small(&state.pdefs, v, ".set count", 0, 5)? as u8),
            None => None,
        };
        let clock_div = match &state.clock_div {
            Some(v) => Some(Self::resolve_value(&state.pdefs, v)?),
            None => None,
        };

        let defines = state
            .pdefs
            .resolved_entries()?
            .into_iter()
            .filter(|(name, _, _)| name != WRAP_TARGET_LABEL)
            .map(|(name, value, public)| Define {
                name,
                value,
                public,
            })
            .collect();

        self.programs.push(Program {
            name: state.name,
            pio_version: state.pio_version,
            side_set: state.side_set,
            origin,
            opcodes,
            defines,
            wrap_target: state.wrap_target.map(|i| i as u8),
            wrap: state.wrap.map(|i| i as u8),
            in_shift: state.in_shift,
            out_shift: state.out_shift,
            set_count,
            clock_div,
            lang_opts: state.lang_opts,
        });
        Ok(())
    }

    fn resolve_value(pdefs: &Defines, value: &Value) -> Result<i32, AsmError> {
        match value {
            Value::Num(n) => Ok(*n),
            Value::Sym(name) => pdefs.resolve(name),
            Value::Expr(e) => pdefs.eval(e),
        }
    }

    fn resolve_small(
        pdefs: &Defines,
        value: &Value,
        field: &'static str,
        lo: i32,
        hi: i32,
    ) -> Result<i32, AsmError> {
        let v = Self::resolve_value(pdefs, value)?;
        if v < lo || v > hi {
            return Err(AsmError::OutOfRange { field, value: v });
        }
        Ok(v)
    }

    /// Finalize any in-progress program and hand back everything assembled.
    pub fn finish(mut self) -> Result<Vec<Program>, AsmError> {
        self.finish_current()?;
        Ok(self.programs)
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{JmpCond, SetDest};

    fn nop() -> Instruction {
        Instruction::new(InstrKind::Nop)
    }

    #[test]
    fn test_instruction_outside_program() {
        let mut asm = PioAssembler::new();
        assert_eq!(
            asm.push_instr(nop()),
            Err(AsmError::InstructionOutsideProgram)
        );
    }

    #[test]
    fn test_program_too_long() {
        let mut asm = PioAssembler::new();
        asm.begin_program("long").unwrap();
        for _ in 0..32 {
            asm.push_instr(nop()).unwrap();
        }
        assert_eq!(asm.push_instr(nop()), Err(AsmError::ProgramTooLong));
    }

    #[test]
    fn test_wrap_markers_used_once() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        asm.wrap_target().unwrap();
        assert_eq!(asm.wrap_target(), Err(AsmError::WrapTargetAlreadyUsed));
        asm.push_instr(nop()).unwrap();
        asm.wrap().unwrap();
        assert_eq!(asm.wrap(), Err(AsmError::WrapAlreadyUsed));
    }

    #[test]
    fn test_wrap_before_any_instruction_fails() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        assert!(asm.wrap().is_err());
    }

    #[test]
    fn test_wrap_indices() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        asm.wrap_target().unwrap();
        asm.push_instr(nop()).unwrap();
        asm.push_instr(nop()).unwrap();
        asm.wrap().unwrap();
        let programs = asm.finish().unwrap();
        assert_eq!(programs[0].wrap_target, Some(0));
        assert_eq!(programs[0].wrap, Some(1));
    }

    #[test]
    fn test_forward_label_resolution() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        asm.push_instr(Instruction::new(InstrKind::Jmp {
            cond: JmpCond::Always,
            target: Value::Sym("end".to_string()),
        }))
        .unwrap();
        asm.push_instr(nop()).unwrap();
        asm.place_label("end", false).unwrap();
        asm.push_instr(nop()).unwrap();
        let programs = asm.finish().unwrap();
        assert_eq!(programs[0].opcodes[0], 0x0002);
    }

    #[test]
    fn test_declared_label_must_be_placed() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        asm.declare_label("ghost", false).unwrap();
        asm.push_instr(Instruction::new(InstrKind::Jmp {
            cond: JmpCond::Always,
            target: Value::Sym("ghost".to_string()),
        }))
        .unwrap();
        let err = asm.finish().unwrap_err();
        assert!(matches!(err, AsmError::AtInstruction { index: 0, .. }));
    }

    #[test]
    fn test_public_defines_copy_into_programs() {
        let mut asm = PioAssembler::new();
        asm.define("shared", Expr::Num(5), true).unwrap();
        asm.define("hidden", Expr::Num(6), false).unwrap();
        asm.begin_program("p").unwrap();
        asm.push_instr(Instruction::new(InstrKind::Set {
            dest: SetDest::X,
            data: Value::Sym("shared".to_string()),
        }))
        .unwrap();
        let programs = asm.finish().unwrap();
        assert_eq!(programs[0].opcodes[0], 0xE025);
        assert!(programs[0].defines.iter().any(|d| d.name == "shared"));
        assert!(!programs[0].defines.iter().any(|d| d.name == "hidden"));
    }

    #[test]
    fn test_wrap_target_is_a_jmp_label() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        asm.push_instr(nop()).unwrap();
        asm.wrap_target().unwrap();
        asm.push_instr(nop()).unwrap();
        asm.push_instr(Instruction::new(InstrKind::Jmp {
            cond: JmpCond::Always,
            target: Value::Sym(".wrap_target".to_string()),
        }))
        .unwrap();
        let programs = asm.finish().unwrap();
        assert_eq!(programs[0].opcodes[2], 0x0001);
    }

    #[test]
    fn test_origin_range_checked() {
        let mut asm = PioAssembler::new();
        asm.begin_program("p").unwrap();
        asm.origin(Value::Num(40)).unwrap();
        asm.push_instr(nop()).unwrap();
        assert!(matches!(asm.finish(), Err(AsmError::OutOfRange { .. })));
    }

    #[test]
    fn test_two_programs() {
        let mut asm = PioAssembler::new();
        asm.begin_program("a").unwrap();
        asm.push_instr(nop()).unwrap();
        asm.begin_program("b").unwrap();
        asm.push_instr(nop()).unwrap();
        asm.push_instr(nop()).unwrap();
        let programs = asm.finish().unwrap();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].name, "a");
        assert_eq!(programs[0].opcodes.len(), 1);
        assert_eq!(programs[1].name, "b");
        assert_eq!(programs[1].opcodes.len(), 2);
    }
}
