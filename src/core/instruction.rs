//! Decoded-instruction and operand types.
//!
//! A [`DecodedInstruction`] is produced purely from a 32-bit word and the
//! address it was fetched from; no decoder state survives between words.
//! Rendering follows the classic register-name convention of the target
//! ABI ("$v0", "$a0", ...).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address_space::VirtualAddress;

/// Canonical ABI names for the 32 general-purpose registers.
const REG_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];

/// A general-purpose register index (0..=31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg(pub u8);

impl Reg {
    /// The return-address register.
    pub const RA: Reg = Reg(31);

    /// ABI name without the leading `$`.
    pub fn name(self) -> &'static str {
        REG_NAMES[(self.0 & 0x1F) as usize]
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// One operand of a decoded instruction, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// General-purpose register.
    Reg(Reg),
    /// Floating-point register (coprocessor loads/stores).
    FpReg(u8),
    /// Sign-extended immediate, already extended to full width.
    Imm(i32),
    /// Zero-extended immediate (bitwise and load-upper forms), rendered
    /// in hex.
    UImm(u16),
    /// Base-plus-displacement memory reference.
    Mem { base: Reg, offset: i16 },
    /// Absolute code target.
    Target(VirtualAddress),
}

impl Operand {
    pub fn reg(index: u32) -> Self {
        Operand::Reg(Reg(index as u8))
    }

    pub fn imm(value: i32) -> Self {
        Operand::Imm(value)
    }

    pub fn uimm(value: u16) -> Self {
        Operand::UImm(value)
    }

    pub fn mem(base: u32, offset: i16) -> Self {
        Operand::Mem {
            base: Reg(base as u8),
            offset,
        }
    }

    pub fn target(addr: VirtualAddress) -> Self {
        Operand::Target(addr)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::FpReg(n) => write!(f, "$f{}", n),
            Operand::Imm(v) => write!(f, "{}", v),
            Operand::UImm(v) => write!(f, "{:#06x}", v),
            Operand::Mem { base, offset } => write!(f, "{}({})", offset, base),
            Operand::Target(t) => write!(f, "{}", t),
        }
    }
}

/// A single decoded instruction.
///
/// `branch_target` is the statically-known absolute destination for
/// branches and direct jumps; register-indirect jumps carry `None`
/// because their destination is unknown until runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    /// Lower-case mnemonic, `"unknown"` for unrecognized words.
    pub mnemonic: String,
    /// Operands in display order.
    pub operands: Vec<Operand>,
    /// Absolute destination, when statically known.
    pub branch_target: Option<VirtualAddress>,
    /// Whether this instruction links a return address (calls).
    pub is_call: bool,
    /// Whether this is the conventional function return.
    pub is_return: bool,
    /// The raw 32-bit word.
    pub word: u32,
    /// The address the word was fetched from.
    pub address: VirtualAddress,
}

impl DecodedInstruction {
    pub(crate) fn new(word: u32, address: VirtualAddress, mnemonic: &str) -> Self {
        Self {
            mnemonic: mnemonic.to_string(),
            operands: Vec::new(),
            branch_target: None,
            is_call: false,
            is_return: false,
            word,
            address,
        }
    }

    pub(crate) fn with_operands(mut self, operands: Vec<Operand>) -> Self {
        self.operands = operands;
        self
    }

    pub(crate) fn with_target(mut self, target: VirtualAddress) -> Self {
        self.branch_target = Some(target);
        self.operands.push(Operand::Target(target));
        self
    }

    pub(crate) fn call(mut self) -> Self {
        self.is_call = true;
        self
    }

    pub(crate) fn ret(mut self) -> Self {
        self.is_return = true;
        self
    }

    /// Whether the word failed to match any recognized encoding.
    pub fn is_unknown(&self) -> bool {
        self.mnemonic == "unknown"
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "unknown [{:08X}]", self.word);
        }
        write!(f, "{}", self.mnemonic)?;
        for (i, op) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " {}", op)?;
            } else {
                write!(f, ", {}", op)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names_follow_abi() {
        assert_eq!(Reg(0).name(), "zero");
        assert_eq!(Reg(2).name(), "v0");
        assert_eq!(Reg(4).name(), "a0");
        assert_eq!(Reg(29).name(), "sp");
        assert_eq!(Reg::RA.name(), "ra");
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::reg(8).to_string(), "$t0");
        assert_eq!(Operand::imm(-4).to_string(), "-4");
        assert_eq!(Operand::uimm(0x0899).to_string(), "0x0899");
        assert_eq!(Operand::mem(4, 0x4DA).to_string(), "1242($a0)");
        assert_eq!(
            Operand::target(VirtualAddress(0x0885_13CC)).to_string(),
            "0x088513CC"
        );
    }

    #[test]
    fn instruction_display() {
        let insn = DecodedInstruction::new(0, VirtualAddress(0x0880_4000), "addiu")
            .with_operands(vec![Operand::reg(8), Operand::reg(0), Operand::imm(-4)]);
        assert_eq!(insn.to_string(), "addiu $t0, $zero, -4");
    }
}
