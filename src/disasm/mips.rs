//! Stateless MIPS instruction decoder.
//!
//! [`decode`] is total over all 2^32 words: malformed words and data
//! decoded as code are expected inputs and come back as `unknown`
//! instructions carrying the raw word. No register file or execution
//! state is modeled.
//!
//! Coverage is the instruction classes the analyses actually walk
//! through: the R-type core, REGIMM branches, direct jumps, and the
//! common I-type arithmetic/branch/load/store forms, plus the two
//! coprocessor word transfers that show up inside rendering code.

use crate::core::address_space::VirtualAddress;
use crate::core::instruction::{DecodedInstruction, Operand, Reg};

/// Decode one 32-bit word fetched from `address`.
pub fn decode(word: u32, address: VirtualAddress) -> DecodedInstruction {
    let opcode = (word >> 26) & 0x3F;
    match opcode {
        0x00 => decode_rtype(word, address),
        0x01 => decode_regimm(word, address),
        0x02 => DecodedInstruction::new(word, address, "j").with_target(jump_target(word, address)),
        0x03 => DecodedInstruction::new(word, address, "jal")
            .with_target(jump_target(word, address))
            .call(),
        _ => decode_itype(word, address),
    }
}

fn rs(word: u32) -> u32 {
    (word >> 21) & 0x1F
}

fn rt(word: u32) -> u32 {
    (word >> 16) & 0x1F
}

fn rd(word: u32) -> u32 {
    (word >> 11) & 0x1F
}

fn shamt(word: u32) -> u32 {
    (word >> 6) & 0x1F
}

fn imm16(word: u32) -> u16 {
    (word & 0xFFFF) as u16
}

fn simm16(word: u32) -> i16 {
    imm16(word) as i16
}

/// Delay-slot-relative branch destination: `address + 4 + simm * 4`.
fn branch_target(word: u32, address: VirtualAddress) -> VirtualAddress {
    let disp = ((simm16(word) as i32) << 2) as u32;
    address.wrapping_add(4).wrapping_add(disp)
}

/// Direct-jump destination: the current address supplies the high
/// segment bits the 26-bit index field cannot carry.
fn jump_target(word: u32, address: VirtualAddress) -> VirtualAddress {
    VirtualAddress((address.0 & 0xF000_0000) | ((word & 0x03FF_FFFF) << 2))
}

fn unknown(word: u32, address: VirtualAddress) -> DecodedInstruction {
    DecodedInstruction::new(word, address, "unknown")
}

fn decode_rtype(word: u32, address: VirtualAddress) -> DecodedInstruction {
    // The all-zero word is bit-identical to `sll $zero, $zero, 0` but is
    // the canonical no-op, so it wins the dispatch.
    if word == 0 {
        return DecodedInstruction::new(word, address, "nop");
    }

    let funct = word & 0x3F;
    let new = |m: &str, ops: Vec<Operand>| {
        DecodedInstruction::new(word, address, m).with_operands(ops)
    };
    let shift_imm = |m: &str| {
        new(
            m,
            vec![
                Operand::reg(rd(word)),
                Operand::reg(rt(word)),
                Operand::imm(shamt(word) as i32),
            ],
        )
    };
    let shift_reg = |m: &str| {
        new(
            m,
            vec![
                Operand::reg(rd(word)),
                Operand::reg(rt(word)),
                Operand::reg(rs(word)),
            ],
        )
    };
    // mult/div families write the implicit hi/lo pair, read back via
    // mfhi/mflo.
    let mul_div = |m: &str| new(m, vec![Operand::reg(rs(word)), Operand::reg(rt(word))]);
    let arith = |m: &str| {
        new(
            m,
            vec![
                Operand::reg(rd(word)),
                Operand::reg(rs(word)),
                Operand::reg(rt(word)),
            ],
        )
    };

    match funct {
        0x00 => shift_imm("sll"),
        0x02 => shift_imm("srl"),
        0x03 => shift_imm("sra"),
        0x04 => shift_reg("sllv"),
        0x06 => shift_reg("srlv"),
        0x07 => shift_reg("srav"),
        0x08 => {
            // Register-indirect jump: destination unknown until runtime,
            // so no branch target. `jr $ra` is the conventional return.
            let insn = new("jr", vec![Operand::reg(rs(word))]);
            if rs(word) == u32::from(Reg::RA.0) {
                insn.ret()
            } else {
                insn
            }
        }
        0x09 => new("jalr", vec![Operand::reg(rd(word)), Operand::reg(rs(word))]).call(),
        0x10 => new("mfhi", vec![Operand::reg(rd(word))]),
        0x12 => new("mflo", vec![Operand::reg(rd(word))]),
        0x18 => mul_div("mult"),
        0x19 => mul_div("multu"),
        0x1A => mul_div("div"),
        0x1B => mul_div("divu"),
        0x20 => arith("add"),
        0x21 => arith("addu"),
        0x22 => arith("sub"),
        0x23 => arith("subu"),
        0x24 => arith("and"),
        0x25 => arith("or"),
        0x26 => arith("xor"),
        0x27 => arith("nor"),
        0x2A => arith("slt"),
        0x2B => arith("sltu"),
        _ => unknown(word, address),
    }
}

fn decode_regimm(word: u32, address: VirtualAddress) -> DecodedInstruction {
    let (mnemonic, links) = match rt(word) {
        0x00 => ("bltz", false),
        0x01 => ("bgez", false),
        0x10 => ("bltzal", true),
        0x11 => ("bgezal", true),
        _ => return unknown(word, address),
    };
    let insn = DecodedInstruction::new(word, address, mnemonic)
        .with_operands(vec![Operand::reg(rs(word))])
        .with_target(branch_target(word, address));
    if links {
        insn.call()
    } else {
        insn
    }
}

fn decode_itype(word: u32, address: VirtualAddress) -> DecodedInstruction {
    let new = |m: &str, ops: Vec<Operand>| {
        DecodedInstruction::new(word, address, m).with_operands(ops)
    };
    let branch2 = |m: &str| {
        new(m, vec![Operand::reg(rs(word)), Operand::reg(rt(word))])
            .with_target(branch_target(word, address))
    };
    let branch1 = |m: &str| {
        new(m, vec![Operand::reg(rs(word))]).with_target(branch_target(word, address))
    };
    // Immediate arithmetic sign-extends; sltiu included, the extension
    // happens before the unsigned compare.
    let arith_imm = |m: &str| {
        new(
            m,
            vec![
                Operand::reg(rt(word)),
                Operand::reg(rs(word)),
                Operand::imm(simm16(word) as i32),
            ],
        )
    };
    // Bitwise immediates stay zero-extended.
    let bitwise_imm = |m: &str| {
        new(
            m,
            vec![
                Operand::reg(rt(word)),
                Operand::reg(rs(word)),
                Operand::uimm(imm16(word)),
            ],
        )
    };
    let load_store = |m: &str| {
        new(
            m,
            vec![
                Operand::reg(rt(word)),
                Operand::mem(rs(word), simm16(word)),
            ],
        )
    };
    let fpu_load_store = |m: &str| {
        new(
            m,
            vec![
                Operand::FpReg(rt(word) as u8),
                Operand::mem(rs(word), simm16(word)),
            ],
        )
    };

    match (word >> 26) & 0x3F {
        0x04 => branch2("beq"),
        0x05 => branch2("bne"),
        0x06 => branch1("blez"),
        0x07 => branch1("bgtz"),
        0x08 => arith_imm("addi"),
        0x09 => arith_imm("addiu"),
        0x0A => arith_imm("slti"),
        0x0B => arith_imm("sltiu"),
        0x0C => bitwise_imm("andi"),
        0x0D => bitwise_imm("ori"),
        0x0E => bitwise_imm("xori"),
        0x0F => new("lui", vec![Operand::reg(rt(word)), Operand::uimm(imm16(word))]),
        0x14 => branch2("beql"),
        0x15 => branch2("bnel"),
        0x16 => branch1("blezl"),
        0x17 => branch1("bgtzl"),
        0x20 => load_store("lb"),
        0x21 => load_store("lh"),
        0x23 => load_store("lw"),
        0x24 => load_store("lbu"),
        0x25 => load_store("lhu"),
        0x28 => load_store("sb"),
        0x29 => load_store("sh"),
        0x2B => load_store("sw"),
        0x31 => fpu_load_store("lwc1"),
        0x39 => fpu_load_store("swc1"),
        _ => unknown(word, address),
    }
}
