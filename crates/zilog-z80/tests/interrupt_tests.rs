//! NMI, maskable interrupts, EI masking and HALT.

use emu_core::{Cpu, SimpleBus};
use zilog_z80::{SignalFlags, Z80};

fn machine(program: &[u8]) -> (Z80, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0, program);
    let mut cpu = Z80::new();
    cpu.regs.sp = 0x8000;
    (cpu, bus)
}

fn stack_top(cpu: &Z80, bus: &SimpleBus) -> u16 {
    u16::from_le_bytes([bus.peek(cpu.regs.sp), bus.peek(cpu.regs.sp.wrapping_add(1))])
}

#[test]
fn nmi_jumps_to_0066_and_saves_iff1() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.regs.pc = 0x1234;
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.signals.insert(SignalFlags::NMI);

    let tacts = cpu.execute_instruction(&mut bus);

    assert_eq!(tacts, 11);
    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(!cpu.iff1);
    assert!(cpu.iff2);
    assert_eq!(stack_top(&cpu, &bus), 0x1234);
    assert_eq!(cpu.regs.r(), 1);
    assert!(!cpu.signals.contains(SignalFlags::NMI));
}

#[test]
fn nmi_ignores_iff1() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.signals.insert(SignalFlags::NMI);
    cpu.execute_cpu_cycle(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(!cpu.iff2);
}

#[test]
fn retn_after_nmi_restores_interrupts() {
    let (mut cpu, mut bus) = machine(&[0x00]);
    bus.load(0x0066, &[0xED, 0x45]);
    cpu.iff1 = true;
    cpu.signals.insert(SignalFlags::NMI);
    cpu.execute_instruction(&mut bus);
    cpu.execute_instruction(&mut bus);
    assert_eq!(cpu.regs.pc, 0);
    assert!(cpu.iff1);
    assert!(cpu.ret_executed);
}

#[test]
fn nmi_wins_over_int() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.iff1 = true;
    cpu.signals = SignalFlags::INT | SignalFlags::NMI;
    cpu.execute_cpu_cycle(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(cpu.signals.contains(SignalFlags::INT));
}

#[test]
fn im1_interrupt_vectors_to_0038() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.regs.pc = 0x4000;
    cpu.interrupt_mode = 1;
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.signals.insert(SignalFlags::INT);

    let tacts = cpu.execute_instruction(&mut bus);

    assert_eq!(tacts, 13);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(cpu.regs.wz, 0x0038);
    assert!(!cpu.iff1 && !cpu.iff2);
    assert_eq!(stack_top(&cpu, &bus), 0x4000);
    // Level-triggered: still raised until the embedder drops it.
    assert!(cpu.signals.contains(SignalFlags::INT));
}

#[test]
fn im0_behaves_like_im1() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.iff1 = true;
    cpu.signals.insert(SignalFlags::INT);
    assert_eq!(cpu.execute_instruction(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn im2_reads_vector_from_table() {
    let (mut cpu, mut bus) = machine(&[]);
    cpu.regs.pc = 0x1000;
    cpu.regs.set_i(0x80);
    cpu.interrupt_mode = 2;
    cpu.iff1 = true;
    bus.data_bus = 0x21;
    bus.load(0x8020, &[0x00, 0x90]);
    cpu.signals.insert(SignalFlags::INT);

    let tacts = cpu.execute_instruction(&mut bus);

    assert_eq!(tacts, 19);
    assert_eq!(cpu.regs.pc, 0x9000);
    assert_eq!(stack_top(&cpu, &bus), 0x1000);
}

#[test]
fn int_is_ignored_while_disabled() {
    let (mut cpu, mut bus) = machine(&[0x00]);
    cpu.signals.insert(SignalFlags::INT);
    cpu.execute_instruction(&mut bus);
    assert_eq!(cpu.regs.pc, 1);
}

#[test]
fn ei_holds_off_int_for_one_instruction() {
    // EI ; NOP ; NOP
    let (mut cpu, mut bus) = machine(&[0xFB, 0x00, 0x00]);
    cpu.interrupt_mode = 1;
    cpu.signals.insert(SignalFlags::INT);

    cpu.execute_instruction(&mut bus);
    assert!(cpu.iff1);
    assert_eq!(cpu.ei_backlog(), 2);

    cpu.execute_instruction(&mut bus);
    assert_eq!(cpu.regs.pc, 2, "NOP after EI runs first");

    cpu.execute_instruction(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(stack_top(&cpu, &bus), 2);
}

#[test]
fn halt_waits_for_interrupt_then_resumes_after_it() {
    // EI ; HALT
    let (mut cpu, mut bus) = machine(&[0xFB, 0x76]);
    cpu.interrupt_mode = 1;

    cpu.execute_instruction(&mut bus);
    cpu.execute_instruction(&mut bus);
    assert!(cpu.halted);
    assert_eq!(cpu.regs.pc, 1);

    for _ in 0..10 {
        assert_eq!(cpu.execute_instruction(&mut bus), 4);
    }
    assert_eq!(cpu.regs.pc, 1);

    cpu.signals.insert(SignalFlags::INT);
    cpu.execute_instruction(&mut bus);
    assert!(!cpu.halted);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(stack_top(&cpu, &bus), 2);
}

#[test]
fn nmi_releases_halt() {
    let (mut cpu, mut bus) = machine(&[0x76]);
    cpu.execute_instruction(&mut bus);
    assert!(cpu.halted);
    cpu.signals.insert(SignalFlags::NMI);
    cpu.execute_instruction(&mut bus);
    assert!(!cpu.halted);
    assert_eq!(stack_top(&cpu, &bus), 1);
}

#[test]
fn reset_signal_clears_latches_and_keeps_registers() {
    let (mut cpu, mut bus) = machine(&[0x00]);
    cpu.regs.de = 0xCAFE;
    cpu.regs.pc = 0x5000;
    cpu.iff1 = true;
    cpu.signals = SignalFlags::all();

    let tacts = cpu.execute_instruction(&mut bus);

    assert_eq!(tacts, 0);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.regs.de, 0xCAFE);
    assert!(!cpu.iff1);
    assert!(cpu.signals.is_empty());
}

/// Drive the core only through the machine-independent trait.
fn run_through_trait<C: Cpu<SimpleBus>>(cpu: &mut C, bus: &mut SimpleBus) -> (u64, u16, bool) {
    cpu.nmi();
    let tacts = cpu.step(bus);
    (tacts, cpu.pc(), cpu.is_halted())
}

#[test]
fn cpu_trait_drives_the_core() {
    let (mut cpu, mut bus) = machine(&[0x76]);
    cpu.execute_instruction(&mut bus);
    assert_eq!(run_through_trait(&mut cpu, &mut bus), (11, 0x0066, false));
    assert_eq!(Cpu::<SimpleBus>::registers(&cpu).pc, 0x0066);

    Cpu::<SimpleBus>::reset(&mut cpu);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert_eq!(cpu.clock.total.get(), 0);
}
