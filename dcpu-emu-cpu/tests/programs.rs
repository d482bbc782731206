use std::sync::Arc;

use dcpu_emu_cpu::cpu::Cpu;
use dcpu_emu_decode::instr::{assemble, Instruction, Operand};
use dcpu_emu_decode::op::{BasicOpcode, ExtendedOpcode};
use dcpu_emu_errors::CpuException;
use dcpu_emu_mem::phys::SharedMemory;
use dcpu_emu_mem::screen::SCREEN_BASE;
use dcpu_emu_regs::GeneralRegister as R;

fn machine(program: &[u16]) -> Cpu {
    let memory = Arc::new(SharedMemory::new());
    memory.load_image(program).unwrap();
    Cpu::new(memory)
}

fn run(cpu: &mut Cpu, ticks: usize) {
    for _ in 0..ticks {
        cpu.tick().unwrap();
    }
}

fn op(opcode: BasicOpcode, a: Operand, b: Operand) -> Instruction {
    Instruction::Basic { opcode, a, b }
}

fn reg(r: R) -> Operand {
    Operand::Register(r)
}

fn lit(value: u16) -> Operand {
    Operand::literal(value)
}

#[test]
fn set_register_and_memory_from_next_words() {
    // SET A, 0x30 / SET [0x1000], 0x20
    let mut cpu = machine(&[0x7C01, 0x0030, 0x7DE1, 0x1000, 0x0020]);
    run(&mut cpu, 2);

    assert_eq!(cpu.regs().gpr(R::A), 0x30);
    assert_eq!(cpu.memory().read(0x1000), 0x20);
    assert_eq!(cpu.regs().pc, 5);
}

#[test]
fn counting_loop_exits_when_x_reaches_ten() {
    // 0: SET X, 0
    // 1: ADD X, 1
    // 2: IFN X, 10
    // 3: SET PC, 1
    let program = [0x8031, 0x8432, 0xA83D, 0x85C1];
    assert_eq!(
        program.to_vec(),
        assemble(&[
            op(BasicOpcode::SET, reg(R::X), lit(0)),
            op(BasicOpcode::ADD, reg(R::X), lit(1)),
            op(BasicOpcode::IFN, reg(R::X), lit(10)),
            op(BasicOpcode::SET, Operand::Pc, lit(1)),
        ])
    );

    let mut cpu = machine(&program);

    // SET, then nine full trips round the loop
    run(&mut cpu, 1 + 9 * 3);
    assert_eq!(cpu.regs().gpr(R::X), 9);
    assert_eq!(cpu.regs().pc, 1);

    // The tenth trip skips the jump back
    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::X), 10);
    assert!(cpu.skip_pending());
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().pc, 4);
    assert!(!cpu.skip_pending());
    assert_eq!(cpu.regs().gpr(R::X), 10);
}

#[test]
fn push_then_pop_restores_the_stack() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, Operand::Push, lit(0x1234)),
        op(BasicOpcode::SET, reg(R::X), Operand::Pop),
    ]));

    run(&mut cpu, 1);
    assert_eq!(cpu.regs().sp, 0xFFFF);
    assert_eq!(cpu.memory().read(0xFFFF), 0x1234);

    run(&mut cpu, 1);
    assert_eq!(cpu.regs().gpr(R::X), 0x1234);
    assert_eq!(cpu.regs().sp, 0);
}

#[test]
fn peek_reads_without_moving_the_stack() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, Operand::Push, lit(7)),
        op(BasicOpcode::SET, reg(R::A), Operand::Peek),
        op(BasicOpcode::ADD, Operand::Peek, lit(1)),
    ]));
    run(&mut cpu, 3);
    assert_eq!(cpu.regs().gpr(R::A), 7);
    assert_eq!(cpu.memory().read(0xFFFF), 8);
    assert_eq!(cpu.regs().sp, 0xFFFF);
}

#[test]
fn skipped_instructions_of_every_length_keep_pc_in_sync() {
    let skipped = [
        op(BasicOpcode::SET, reg(R::A), lit(1)),
        op(BasicOpcode::SET, Operand::Absolute(0x1000), lit(1)),
        op(
            BasicOpcode::SET,
            Operand::Indexed {
                base: R::B,
                offset: 0x1000,
            },
            lit(0x1234),
        ),
    ];
    // Each condition is false with A = 0
    let conditions = [
        op(BasicOpcode::IFE, reg(R::A), lit(1)),
        op(BasicOpcode::IFN, reg(R::A), lit(0)),
        op(BasicOpcode::IFG, reg(R::A), lit(1)),
        op(BasicOpcode::IFB, reg(R::A), lit(1)),
    ];

    for cond in conditions {
        for (len, instr) in (1..=3u16).zip(skipped) {
            assert_eq!(instr.len(), len);

            let mut cpu = machine(&assemble(&[
                cond,
                instr,
                op(BasicOpcode::SET, reg(R::C), lit(7)),
            ]));

            run(&mut cpu, 2);
            assert_eq!(cpu.regs().pc, 1 + len, "{cond} / {instr}");
            assert_eq!(cpu.regs().gpr(R::A), 0);
            assert_eq!(cpu.memory().read(0x1000), 0);

            run(&mut cpu, 1);
            assert_eq!(cpu.regs().gpr(R::C), 7);
        }
    }
}

#[test]
fn taken_branch_ends_at_the_same_offset() {
    for (len, instr) in (1..=3u16).zip([
        op(BasicOpcode::SET, reg(R::A), lit(1)),
        op(BasicOpcode::SET, Operand::Absolute(0x1000), lit(1)),
        op(BasicOpcode::SET, Operand::Absolute(0x1000), lit(0x1234)),
    ]) {
        let mut cpu = machine(&assemble(&[op(BasicOpcode::IFE, reg(R::A), lit(0)), instr]));
        run(&mut cpu, 2);
        assert_eq!(cpu.regs().pc, 1 + len);
        assert!(cpu.regs().gpr(R::A) == 1 || cpu.memory().read(0x1000) != 0);
    }
}

#[test]
fn conditionals_consume_their_own_extra_words() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::IFE, Operand::Absolute(0x2000), lit(0x1234)),
        op(BasicOpcode::SET, reg(R::A), lit(1)),
        op(BasicOpcode::SET, reg(R::B), lit(2)),
    ]));
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().pc, 3);
    assert!(cpu.skip_pending());
    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::A), 0);
    assert_eq!(cpu.regs().gpr(R::B), 2);
}

#[test]
fn skipped_stack_operands_still_move_sp() {
    let program = assemble(&[
        op(BasicOpcode::IFE, reg(R::A), lit(1)),
        op(BasicOpcode::SET, reg(R::X), Operand::Pop),
        op(BasicOpcode::IFE, reg(R::A), lit(1)),
        op(BasicOpcode::SET, Operand::Push, lit(9)),
    ]);
    let mut cpu = machine(&program);

    run(&mut cpu, 2);
    assert_eq!(cpu.regs().sp, 1);
    assert_eq!(cpu.regs().gpr(R::X), 0);
    assert_eq!(cpu.regs().pc, 2);

    // The push lands on address 0 but its store is suppressed
    run(&mut cpu, 2);
    assert_eq!(cpu.regs().sp, 0);
    assert_eq!(cpu.memory().read(0), program[0]);
}

#[test]
fn skipped_conditional_does_not_chain() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::IFE, reg(R::A), lit(1)),
        op(BasicOpcode::IFE, reg(R::A), lit(1)),
        op(BasicOpcode::SET, reg(R::C), lit(7)),
    ]));
    run(&mut cpu, 3);
    assert_eq!(cpu.regs().gpr(R::C), 7);
}

#[test]
fn jsr_pushes_the_return_address() {
    let mut cpu = machine(&assemble(&[Instruction::Extended {
        opcode: ExtendedOpcode::JSR,
        a: lit(0x0040),
    }]));
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().pc, 0x0040);
    assert_eq!(cpu.regs().sp, 0xFFFF);
    assert_eq!(cpu.memory().read(0xFFFF), 2);

    let mut cpu = machine(&assemble(&[Instruction::Extended {
        opcode: ExtendedOpcode::JSR,
        a: lit(4),
    }]));
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().pc, 4);
    assert_eq!(cpu.memory().read(0xFFFF), 1);
}

#[test]
fn subroutine_returns_with_set_pc_pop() {
    // 0: JSR 4
    // 1: SET B, 2
    // 2: SET PC, 2   (halt)
    // 3: <pad>
    // 4: SET A, 1
    // 5: SET PC, POP
    let mut image = assemble(&[
        Instruction::Extended {
            opcode: ExtendedOpcode::JSR,
            a: lit(4),
        },
        op(BasicOpcode::SET, reg(R::B), lit(2)),
        op(BasicOpcode::SET, Operand::Pc, lit(2)),
    ]);
    image.push(0);
    image.extend(assemble(&[
        op(BasicOpcode::SET, reg(R::A), lit(1)),
        op(BasicOpcode::SET, Operand::Pc, Operand::Pop),
    ]));

    let mut cpu = machine(&image);
    run(&mut cpu, 5);
    assert_eq!(cpu.regs().gpr(R::A), 1);
    assert_eq!(cpu.regs().gpr(R::B), 2);
    assert_eq!(cpu.regs().pc, 2);
    assert_eq!(cpu.regs().sp, 0);
}

#[test]
fn unimplemented_extended_opcodes_are_reported_and_skipped_over() {
    let mut image = assemble(&[Instruction::Extended {
        opcode: ExtendedOpcode::new(0x02),
        a: lit(0x9999),
    }]);
    image.extend(assemble(&[op(BasicOpcode::SET, reg(R::A), lit(1))]));
    let mut cpu = machine(&image);

    assert_eq!(
        cpu.tick(),
        Err(CpuException::UnimplementedInstruction {
            opcode: 0x02,
            address: 0
        })
    );
    assert_eq!(cpu.regs().pc, 2);
    assert_eq!(cpu.regs().sp, 0);

    run(&mut cpu, 1);
    assert_eq!(cpu.regs().gpr(R::A), 1);
}

#[test]
fn zeroed_memory_is_an_unimplemented_instruction() {
    let mut cpu = machine(&[]);
    assert_eq!(
        cpu.tick(),
        Err(CpuException::UnimplementedInstruction {
            opcode: 0,
            address: 0
        })
    );
    assert_eq!(cpu.regs().pc, 1);
}

#[test]
fn overflow_is_set_even_when_the_destination_is_a_literal() {
    let mut cpu = machine(&assemble(&[op(
        BasicOpcode::ADD,
        Operand::Literal(31),
        lit(0xFFFF),
    )]));
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().o, 1);
    assert_eq!(cpu.regs().pc, 2);
}

#[test]
fn overflow_and_result_order_depends_on_the_opcode() {
    // ADD, SUB and MUL set O before storing, so O keeps the result
    let mut cpu = machine(&assemble(&[op(BasicOpcode::ADD, Operand::O, lit(5))]));
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().o, 5);

    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, Operand::O, lit(0x10)),
        op(BasicOpcode::MUL, Operand::O, lit(0x1000)),
    ]));
    run(&mut cpu, 2);
    assert_eq!(cpu.regs().o, 0);

    // Shifts store first, so O keeps the overflow
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, Operand::O, lit(0x8000)),
        op(BasicOpcode::SHL, Operand::O, lit(1)),
    ]));
    run(&mut cpu, 2);
    assert_eq!(cpu.regs().o, 1);
}

#[test]
fn writes_to_a_next_word_operand_land_on_that_word() {
    let mut cpu = machine(&assemble(&[op(BasicOpcode::SET, lit(0x1234), lit(5))]));
    run(&mut cpu, 1);
    assert_eq!(cpu.memory().read(1), 5);
    assert_eq!(cpu.memory().read(0x1234), 0);
}

#[test]
fn indexed_and_indirect_writes() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, reg(R::I), lit(2)),
        op(
            BasicOpcode::SET,
            Operand::Indexed {
                base: R::I,
                offset: 0x1000,
            },
            lit(9),
        ),
        op(BasicOpcode::SET, reg(R::J), lit(0x3000)),
        op(BasicOpcode::SET, Operand::Indirect(R::J), reg(R::I)),
    ]));
    run(&mut cpu, 4);
    assert_eq!(cpu.memory().read(0x1002), 9);
    assert_eq!(cpu.memory().read(0x3000), 2);
}

#[test]
fn pc_reads_as_the_address_after_the_operand_being_resolved() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, reg(R::A), Operand::Pc),
        op(BasicOpcode::SET, Operand::Absolute(0x1000), Operand::Pc),
    ]));
    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::A), 1);
    assert_eq!(cpu.memory().read(0x1000), 3);
}

#[test]
fn pc_as_operand_a_is_read_before_b_fetches_its_word() {
    // ADD PC, 0x30: A reads 1, the jump lands on 0x31
    let mut cpu = machine(&[0x7DC2, 0x0030]);
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().pc, 0x31);

    // IFE PC, 0x22 at 0x21 holds, so the SET that follows runs
    let mut image = vec![0; 0x21];
    image.extend(assemble(&[
        op(BasicOpcode::IFE, Operand::Pc, lit(0x22)),
        op(BasicOpcode::SET, reg(R::A), lit(1)),
    ]));
    let mut cpu = machine(&image);
    cpu.regs_mut().pc = 0x21;
    run(&mut cpu, 1);
    assert!(!cpu.skip_pending());
    run(&mut cpu, 1);
    assert_eq!(cpu.regs().gpr(R::A), 1);
}

#[test]
fn arithmetic_through_the_cpu() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, reg(R::A), lit(0xFFFF)),
        op(BasicOpcode::MUL, reg(R::A), lit(0x10)),
        op(BasicOpcode::SET, reg(R::B), lit(0x1234)),
        op(BasicOpcode::DIV, reg(R::B), lit(0)),
        op(BasicOpcode::SET, reg(R::C), lit(0x1234)),
        op(BasicOpcode::MOD, reg(R::C), lit(0)),
        op(BasicOpcode::SET, reg(R::X), lit(0x8000)),
        op(BasicOpcode::SHL, reg(R::X), lit(1)),
    ]));

    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::A), 0xFFF0);
    assert_eq!(cpu.regs().o, 0x000F);

    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::B), 0);
    assert_eq!(cpu.regs().o, 0);

    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::C), 0);

    run(&mut cpu, 2);
    assert_eq!(cpu.regs().gpr(R::X), 0);
    assert_eq!(cpu.regs().o, 1);
}

#[test]
fn programs_write_the_screen_window() {
    let mut cpu = machine(&assemble(&[
        op(BasicOpcode::SET, reg(R::I), lit(SCREEN_BASE)),
        op(BasicOpcode::SET, Operand::Indirect(R::I), lit(0x0048)),
        op(BasicOpcode::ADD, reg(R::I), lit(1)),
        op(BasicOpcode::SET, Operand::Indirect(R::I), lit(0x0069)),
    ]));
    run(&mut cpu, 4);

    let screen = cpu.memory().read_screen();
    assert_eq!(&screen[..3], &[0x0048, 0x0069, 0]);
}
