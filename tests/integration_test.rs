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

use pioasm::assemble_file;
use pioasm::assemble_str;
use pioasm::errors::AsmError;
use pioasm::program::Program;

fn assemble_one(source: &str) -> Program {
    let mut programs = assemble_str(source).unwrap();
    assert_eq!(programs.len(), 1);
    programs.remove(0)
}

fn first_error(source: &str) -> AsmError {
    let err = assemble_str(source).unwrap_err();
    err.downcast::<AsmError>().expect("should be an AsmError")
}

#[test]
fn test_empty_nop_program() {
    let program = assemble_one(".program x\nnop\n");
    assert_eq!(program.name, "x");
    assert_eq!(program.opcodes, vec![0xA042]);
}

#[test]
fn test_unconditional_jmp_to_label() {
    let program = assemble_one(".program p\nstart:\n jmp start\n");
    assert_eq!(program.opcodes, vec![0x0000]);
    assert!(
        program
            .defines
            .iter()
            .any(|d| d.name == "start" && d.value == 0)
    );
}

#[test]
fn test_set_pins() {
    let program = assemble_one(".program p\nset pins, 1\n");
    assert_eq!(program.opcodes, vec![0xE001]);
}

#[test]
fn test_wait_gpio() {
    let program = assemble_one(".program p\nwait 1 gpio 5\n");
    assert_eq!(program.opcodes, vec![0x2085]);
}

#[test]
fn test_side_and_delay() {
    let program = assemble_one(".program p\n.side_set 1\nnop side 1 [3]\n");
    assert_eq!(program.opcodes, vec![0xB342]);
}

#[test]
fn test_push_iffull_noblock() {
    let program = assemble_one(".program p\npush iffull noblock\n");
    assert_eq!(program.opcodes, vec![0x8040]);
}

// the classic WS2812 driver, checked against the SDK assembler's output
#[test]
fn test_ws2812() {
    let source = "\
.program ws2812
.side_set 1

.wrap_target
bitloop:
    out x, 1        side 0 [2]
    jmp !x do_zero  side 1 [1]
do_one:
    jmp bitloop     side 1 [4]
do_zero:
    nop             side 0 [4]
.wrap
";
    let program = assemble_one(source);
    assert_eq!(program.opcodes, vec![0x6221, 0x1123, 0x1400, 0xA442]);
    assert_eq!(program.wrap_target, Some(0));
    assert_eq!(program.wrap, Some(3));
    assert_eq!(program.side_set.count, 1);
    assert!(!program.side_set.opt);
}

#[test]
fn test_comments_are_stripped() {
    let source = "\
.program p ; trailing comment
// a whole line of comment
/* block
   spanning lines */
nop // done
";
    let program = assemble_one(source);
    assert_eq!(program.opcodes, vec![0xA042]);
}

#[test]
fn test_forward_label() {
    let source = "\
.program p
    jmp end
    nop
end:
    nop
";
    let program = assemble_one(source);
    assert_eq!(program.opcodes[0], 0x0002);
}

#[test]
fn test_defines_and_expressions() {
    let source = "\
.program p
.define public bit_count 8
.define loops (bit_count * 2) - 1
    set x, (loops & 31)
    out pins, bit_count
";
    let program = assemble_one(source);
    assert_eq!(program.opcodes[0], 0xE020 | 15);
    assert_eq!(program.opcodes[1], 0x6008);
    let bit_count = program
        .defines
        .iter()
        .find(|d| d.name == "bit_count")
        .unwrap();
    assert!(bit_count.public);
    assert_eq!(bit_count.value, 8);
}

#[test]
fn test_assembler_scope_public_defines() {
    let source = "\
.define public ticks 7
.define private_gap 3
.program a
    set y, ticks
.program b
    set x, ticks
";
    let programs = assemble_str(source).unwrap();
    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0].opcodes, vec![0xE047]);
    assert_eq!(programs[1].opcodes, vec![0xE027]);
    // only public assembler-scope entries are copied in
    for p in &programs {
        assert!(p.defines.iter().any(|d| d.name == "ticks"));
        assert!(!p.defines.iter().any(|d| d.name == "private_gap"));
    }
}

#[test]
fn test_word_directive() {
    let program = assemble_one(".program p\n.word 0xA042\n.word (1 << 15) | 2\n");
    assert_eq!(program.opcodes, vec![0xA042, 0x8002]);
}

#[test]
fn test_origin_recorded() {
    let program = assemble_one(".program p\n.origin 4\nnop\n");
    assert_eq!(program.origin, Some(4));
}

#[test]
fn test_wrap_points() {
    let source = "\
.program p
    pull
.wrap_target
loop:
    out pins, 1
    jmp loop
.wrap
";
    let program = assemble_one(source);
    assert_eq!(program.wrap_target, Some(1));
    assert_eq!(program.wrap, Some(2));
    assert_eq!(program.opcodes[2], 0x0001);
    // the synthetic wrap-target label is internal, not exported
    assert!(!program.defines.iter().any(|d| d.name == ".wrap_target"));
}

#[test]
fn test_optional_side_set() {
    let source = "\
.program p
.side_set 2 opt
    nop
    nop side 1
";
    let program = assemble_one(source);
    assert_eq!(program.opcodes[0], 0xA042);
    assert_eq!(program.opcodes[1], 0xA042 | (0b11 << 11));
    assert!(program.side_set.opt);
}

#[test]
fn test_side_set_pindirs_flag() {
    let program = assemble_one(".program p\n.side_set 1 pindirs\nnop side 1\n");
    assert!(program.side_set.pindirs);
    assert_eq!(program.opcodes, vec![0xA042 | (1 << 12)]);
}

#[test]
fn test_rp2350_program() {
    let source = "\
.program p
.pio_version rp2350
    irq prev 1
    wait 0 jmppin + 3
    wait 1 irq next 2
";
    let program = assemble_one(source);
    assert_eq!(program.opcodes[0], 0xC000 | (0b01 << 3) | 1);
    assert_eq!(program.opcodes[1], 0x2000 | (0b11 << 5) | 3);
    assert_eq!(
        program.opcodes[2],
        0x2000 | (1 << 7) | (0b10 << 5) | (0b11 << 3) | 2
    );
}

#[test]
fn test_program_too_long() {
    let mut source = String::from(".program p\n");
    for _ in 0..33 {
        source.push_str("nop\n");
    }
    assert_eq!(first_error(&source), AsmError::ProgramTooLong);
}

#[test]
fn test_invalid_side_set_config() {
    assert!(matches!(
        first_error(".program p\n.side_set 1 opt\nnop\n"),
        AsmError::InvalidSideSetConfig { .. }
    ));
    assert!(matches!(
        first_error(".program p\n.side_set 6\nnop\n"),
        AsmError::InvalidSideSetConfig { .. }
    ));
}

#[test]
fn test_duplicate_wrap() {
    assert_eq!(
        first_error(".program p\nnop\n.wrap\n.wrap\n"),
        AsmError::WrapAlreadyUsed
    );
    assert_eq!(
        first_error(".program p\n.wrap_target\n.wrap_target\nnop\n"),
        AsmError::WrapTargetAlreadyUsed
    );
}

#[test]
fn test_undefined_label_reports_instruction() {
    let err = first_error(".program p\n jmp nowhere\n");
    match err {
        AsmError::AtInstruction { index, source } => {
            assert_eq!(index, 0);
            assert_eq!(
                *source,
                AsmError::NotDefined {
                    name: "nowhere".to_string()
                }
            );
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_unterminated_comment() {
    assert!(matches!(
        first_error(".program p\nnop /* oops\n"),
        AsmError::UnterminatedComment { .. }
    ));
}

#[test]
fn test_duplicate_label() {
    assert_eq!(
        first_error(".program p\nl:\nnop\nl:\nnop\n"),
        AsmError::AlreadyAssigned {
            name: "l".to_string()
        }
    );
}

#[test]
fn test_out_of_range_operands() {
    assert!(matches!(
        first_error(".program p\nset pins, 32\n"),
        AsmError::AtInstruction { .. }
    ));
    assert!(matches!(
        first_error(".program p\nwait 2 gpio 0\n"),
        AsmError::AtInstruction { .. }
    ));
}

#[test]
fn test_division_by_zero_in_define() {
    assert!(matches!(
        first_error(".program p\n.define bad 1 / 0\nnop\n"),
        AsmError::BadExpression { .. }
    ));
}

#[test]
fn test_json_output_shape() {
    let program = assemble_one(".program p\n.side_set 1\nnop side 0\n");
    let json = serde_json::to_value(&program).unwrap();
    assert_eq!(json["name"], "p");
    assert_eq!(json["pio_version"], "rp2040");
    assert_eq!(json["side_set"]["count"], 1);
    assert_eq!(json["opcodes"][0], 0xA042);
}

#[test]
fn test_assemble_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blink.pio");
    std::fs::write(&path, ".program blink\nset pins, 1 [31]\nset pins, 0 [31]\n").unwrap();

    let programs = assemble_file(&path).unwrap();
    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].name, "blink");
    assert_eq!(programs[0].opcodes, vec![0xFF01, 0xFF00]);
}

#[test]
fn test_missing_file_is_an_error() {
    let err = assemble_file(std::path::Path::new("no_such_file.pio")).unwrap_err();
    assert!(err.to_string().contains("no_such_file.pio"));
}
