use memdig::core::address_space::VirtualAddress;
use memdig::core::instruction::Operand;
use memdig::disasm::mips;

#[test]
fn zero_word_decodes_to_nop() {
    let insn = mips::decode(0x0000_0000, VirtualAddress(0x0880_4000));
    assert_eq!(insn.mnemonic, "nop");
    assert!(insn.operands.is_empty());
    assert_eq!(insn.branch_target, None);
    assert!(!insn.is_call);
    assert!(!insn.is_return);
}

#[test]
fn addiu_negative_immediate() {
    // addiu $t0, $zero, 0xFFFC: the immediate is -4, not 65532.
    let word = (0x09 << 26) | (8 << 16) | 0xFFFC;
    let insn = mips::decode(word, VirtualAddress(0x0880_4000));
    assert_eq!(insn.mnemonic, "addiu");
    assert_eq!(insn.operands[2], Operand::Imm(-4));
    assert_eq!(insn.to_string(), "addiu $t0, $zero, -4");
}

#[test]
fn branch_law() {
    // For a branch at A with signed displacement d: target = A + 4 + 4*d.
    let a = VirtualAddress(0x0885_D440);
    for d in [-0x8000i32, -100, -1, 0, 1, 100, 0x7FFF] {
        let imm = (d as i16) as u16;
        let word = (0x04 << 26) | (2 << 21) | imm as u32; // beq $v0, $zero
        let insn = mips::decode(word, a);
        let expected = a.0.wrapping_add(4).wrapping_add((d << 2) as u32);
        assert_eq!(insn.branch_target, Some(VirtualAddress(expected)), "d={}", d);
    }
}

#[test]
fn jump_law() {
    // For a jump at A with 26-bit field t: target = (A & 0xF0000000) | (t << 2).
    for (site, t) in [
        (0x0880_4000u32, 0x0021_44F3u32),
        (0x0895_0000, 0x0000_0000),
        (0x0880_0000, 0x03FF_FFFF),
    ] {
        let word = (0x02 << 26) | t;
        let insn = mips::decode(word, VirtualAddress(site));
        assert_eq!(
            insn.branch_target,
            Some(VirtualAddress((site & 0xF000_0000) | (t << 2)))
        );
        assert!(!insn.is_call);
    }
}

#[test]
fn decoder_is_total_over_a_word_sweep() {
    // A multiplicative sweep touches every opcode family; decoding must
    // never panic and must always carry the raw word back out.
    let addr = VirtualAddress(0x0880_4000);
    let mut word = 0x0000_0001u32;
    for _ in 0..100_000 {
        let insn = mips::decode(word, addr);
        assert_eq!(insn.word, word);
        assert!(!insn.mnemonic.is_empty());
        word = word.wrapping_mul(2_654_435_761).wrapping_add(1);
    }
}

#[test]
fn unknown_words_keep_opcode_visible() {
    let word = 0x7C00_003F;
    let insn = mips::decode(word, VirtualAddress(0x0880_4000));
    assert!(insn.is_unknown());
    assert_eq!(insn.word, word);
    assert_eq!(insn.to_string(), "unknown [7C00003F]");
}

#[test]
fn call_and_return_classification() {
    let site = VirtualAddress(0x0884_0000);
    // jal
    let jal = (0x03 << 26) | (0x0885_13CC >> 2);
    assert!(mips::decode(jal, site).is_call);
    // jr $ra
    let jr_ra = (31 << 21) | 0x08;
    let insn = mips::decode(jr_ra, site);
    assert!(insn.is_return);
    assert_eq!(insn.branch_target, None);
    // bgezal links
    let bgezal = (0x01 << 26) | (4 << 21) | (0x11 << 16) | 8;
    assert!(mips::decode(bgezal, site).is_call);
}
