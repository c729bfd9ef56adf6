//! DVI opcode table
//!
//! Only the opcodes the rewriter emits or checks get a name. Everything else
//! is handled by [`fixed_operand_len`], which the inspector uses to step over
//! commands it does not interpret.

pub const SET_CHAR_0: u8 = 0;
pub const SET_CHAR_127: u8 = 127;
pub const SET1: u8 = 128;
pub const SET_RULE: u8 = 132;
pub const PUT1: u8 = 133;
pub const PUT_RULE: u8 = 137;
pub const NOP: u8 = 138;
pub const BOP: u8 = 139;
pub const EOP: u8 = 140;
pub const PUSH: u8 = 141;
pub const POP: u8 = 142;
pub const RIGHT1: u8 = 143;
pub const RIGHT4: u8 = 146;
pub const W0: u8 = 147;
pub const W1: u8 = 148;
pub const X0: u8 = 152;
pub const X1: u8 = 153;
pub const DOWN1: u8 = 157;
pub const DOWN4: u8 = 160;
pub const Y0: u8 = 161;
pub const Y1: u8 = 162;
pub const Z0: u8 = 166;
pub const Z1: u8 = 167;
pub const FNT_NUM_0: u8 = 171;
pub const FNT_NUM_63: u8 = 234;
pub const FNT1: u8 = 235;
pub const XXX1: u8 = 239;
pub const XXX4: u8 = 242;
pub const FNT_DEF1: u8 = 243;
pub const FNT_DEF4: u8 = 246;
pub const PRE: u8 = 247;
pub const POST: u8 = 248;
pub const POST_POST: u8 = 249;
/// pTeX direction change
pub const DIR: u8 = 255;

/// Filler byte after the post_post pointer and id byte
pub const TRAILER_PAD: u8 = 223;

/// Bytes following a BOP opcode: ten counters and the previous-page pointer
pub const BOP_OPERANDS: usize = 44;
/// Offset of the previous-page pointer relative to the BOP opcode
pub const BOP_PREV_POINTER: usize = 1 + 40;
/// num, den, mag, l, u (4 bytes each) plus s, t (2 bytes each)
pub const POST_HEADER: usize = 4 * 6;

/// Width of the length field of the `XXXn`/`FNT_DEFn` family member `op`,
/// where `first` is the family's 1-byte variant.
pub fn family_width(op: u8, first: u8) -> usize {
    usize::from(op - first) + 1
}

/// Operand length of opcodes whose size does not depend on their contents.
///
/// Returns `None` for specials, font definitions, pre/post-amble markers and
/// undefined opcodes; those need their own handling.
pub fn fixed_operand_len(op: u8) -> Option<usize> {
    match op {
        SET_CHAR_0..=SET_CHAR_127 => Some(0),
        SET1..=131 => Some(family_width(op, SET1)),
        SET_RULE | PUT_RULE => Some(8),
        PUT1..=136 => Some(family_width(op, PUT1)),
        NOP | EOP | PUSH | POP => Some(0),
        BOP => Some(BOP_OPERANDS),
        RIGHT1..=RIGHT4 => Some(family_width(op, RIGHT1)),
        W0 | X0 | Y0 | Z0 => Some(0),
        W1..=151 => Some(family_width(op, W1)),
        X1..=156 => Some(family_width(op, X1)),
        DOWN1..=DOWN4 => Some(family_width(op, DOWN1)),
        Y1..=165 => Some(family_width(op, Y1)),
        Z1..=170 => Some(family_width(op, Z1)),
        FNT_NUM_0..=FNT_NUM_63 => Some(0),
        FNT1..=238 => Some(family_width(op, FNT1)),
        DIR => Some(1),
        _ => None,
    }
}
