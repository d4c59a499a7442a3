//! Compiled pattern programs and the instruction encoding they use.
//!
//! This crate does not compile pattern syntax. A separate compiler produces a
//! [`Pattern`]: a sequence of 32-bit instruction words plus the auxiliary
//! tables the words refer to. The matcher in [`crate::matcher`] only executes
//! such programs. The encoding is fixed: the opcode tag lives in the high 8
//! bits of each word and the operand value in the low 24, so operands can
//! address any BMP or supplementary code point, capture group, set index, or
//! jump target a realistic program needs.

use bon::Builder;

use crate::matcher::{Config, Matcher};
use crate::unicode;

/// Number of low bits of an instruction word holding the operand value.
pub const VAL_BITS: u32 = 24;

/// Mask selecting the operand value of an instruction word.
pub const VAL_MASK: u32 = (1 << VAL_BITS) - 1;

/// Polarity flag inside a [`Op::StaticSetref`] operand. When set, the
/// instruction succeeds on code points *outside* the referenced set.
pub const NEG_SET: u32 = 0x0080_0000;

/// Instruction opcodes.
///
/// Each opcode either consumes input, moves the pattern cursor, mutates
/// capture state, pushes a choice point, or ends the match attempt. The set
/// is closed; the compiler and this engine must agree on it exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// No effect.
    Nop = 0,
    /// Unconditionally take the most recent choice point.
    Backtrack,
    /// Match one exact code point, given in the operand.
    OneChar,
    /// Match a literal run from the pattern's literal text. The operand is
    /// the offset of the run; the following word must be a [`Op::StringLen`]
    /// carrying the run length in code units.
    String,
    /// Length word of a two-word [`Op::String`] instruction. Never dispatched
    /// on its own.
    StringLen,
    /// Push a choice point. The operand is the pattern index to resume at
    /// when the current path fails.
    StateSave,
    /// Jump to the pattern index in the operand.
    Jmp,
    /// Successful end of the pattern.
    End,
    /// Definitive failure of the whole attempt, saved choice points
    /// notwithstanding.
    Fail,
    /// Record the current input position as the start of capture group
    /// `operand`.
    StartCapture,
    /// Record the current input position as the end of capture group
    /// `operand`.
    EndCapture,
    /// Anchor at the start of input.
    Caret,
    /// Anchor at the end of input, or just before a terminal line break.
    Dollar,
    /// Anchor at the start of input (`\A`).
    BackslashA,
    /// Word boundary (`\b`); a nonzero operand flips the sense (`\B`).
    BackslashB,
    /// One decimal-digit code point (`\d`); a nonzero operand flips the
    /// sense (`\D`).
    BackslashD,
    /// Anchor at the end of the previous match (`\G`).
    BackslashG,
    /// One grapheme cluster (`\X`): a base code point with any following
    /// combining marks, or a CR LF pair.
    BackslashX,
    /// Anchor at the absolute end of input (`\z`).
    BackslashZ,
    /// One code point contained in a predefined set. The operand is a
    /// [`StaticClass`] index, optionally flagged with [`NEG_SET`].
    StaticSetref,
    /// One code point contained in the pattern's set table at the operand
    /// index.
    Setref,
    /// Any one code point except a line terminator.
    DotAny,
    /// Any one code point, with CR LF consumed as a pair.
    DotAnyAll,
}

impl Op {
    /// Decodes an opcode tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        if tag <= Op::DotAnyAll as u8 {
            Some(unsafe { std::mem::transmute::<u8, Op>(tag) })
        } else {
            None
        }
    }

    /// Assembles an instruction word from this opcode and an operand value.
    #[inline]
    pub fn word(self, value: u32) -> u32 {
        debug_assert!(value <= VAL_MASK);
        ((self as u32) << VAL_BITS) | (value & VAL_MASK)
    }
}

/// Splits an instruction word into its opcode and operand value.
///
/// # Panics
///
/// Panics when the tag is not a valid [`Op`]; a program containing such a
/// word was produced by a broken compiler.
#[inline]
pub fn decode(word: u32) -> (Op, u32) {
    let tag = (word >> VAL_BITS) as u8;
    let op = Op::from_u8(tag)
        .unwrap_or_else(|| panic!("compiled pattern contains unrecognized opcode tag {tag}"));
    (op, word & VAL_MASK)
}

/// An immutable set of code points stored as sorted, disjoint inclusive
/// ranges. Referenced from programs through [`Op::Setref`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodePointSet {
    ranges: Vec<(u32, u32)>,
}

impl CodePointSet {
    /// Builds a set from inclusive ranges. Overlapping and adjacent ranges
    /// are merged.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut ranges: Vec<(u32, u32)> = ranges
            .into_iter()
            .filter(|&(lo, hi)| lo <= hi)
            .collect();
        ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    /// Builds a set holding exactly the characters of `chars`.
    pub fn from_chars(chars: &str) -> Self {
        Self::from_ranges(chars.chars().map(|c| (u32::from(c), u32::from(c))))
    }

    /// Membership query.
    pub fn contains(&self, cp: u32) -> bool {
        use std::cmp::Ordering;
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if cp < lo {
                    Ordering::Greater
                } else if cp > hi {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// The complement of this set over the whole code-point space, lone
    /// surrogates included. Compilers use this to express negated classes as
    /// a dedicated set.
    pub fn negated(&self) -> Self {
        const MAX_CP: u32 = 0x10_FFFF;
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(lo, hi) in &self.ranges {
            if lo > next {
                ranges.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
            if next > MAX_CP {
                return Self { ranges };
            }
        }
        ranges.push((next, MAX_CP));
        Self { ranges }
    }
}

/// Indices of the predefined sets addressable by [`Op::StaticSetref`].
///
/// `Word` is also the set consulted by the word-boundary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StaticClass {
    /// Letters, combining marks, decimal digits, connector punctuation, and
    /// the zero-width (non-)joiners.
    Word = 1,
    /// White space.
    Space = 2,
    /// Letters and decimal digits.
    Alnum = 3,
}

/// One past the largest valid [`StaticClass`] index.
pub const LAST_STATIC_SET: u32 = 4;

impl StaticClass {
    /// Resolves a static-set operand index.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            1 => Some(StaticClass::Word),
            2 => Some(StaticClass::Space),
            3 => Some(StaticClass::Alnum),
            _ => None,
        }
    }

    /// Membership query.
    pub fn contains(self, cp: u32) -> bool {
        use unicode_general_category::GeneralCategory::*;
        match self {
            StaticClass::Word => {
                matches!(cp, 0x200C | 0x200D)
                    || matches!(
                        unicode::general_category(cp),
                        UppercaseLetter
                            | LowercaseLetter
                            | TitlecaseLetter
                            | ModifierLetter
                            | OtherLetter
                            | NonspacingMark
                            | SpacingMark
                            | EnclosingMark
                            | DecimalNumber
                            | ConnectorPunctuation
                    )
            }
            StaticClass::Space => char::from_u32(cp).is_some_and(char::is_whitespace),
            StaticClass::Alnum => matches!(
                unicode::general_category(cp),
                UppercaseLetter
                    | LowercaseLetter
                    | TitlecaseLetter
                    | ModifierLetter
                    | OtherLetter
                    | DecimalNumber
            ),
        }
    }
}

/// A compiled regular expression program.
///
/// A `Pattern` is immutable once built and may be shared by any number of
/// matchers, each of which borrows it for as long as it runs. Programs are
/// produced by an external compiler; tests and the examples in this crate
/// assemble the instruction words by hand with [`Op::word`].
///
/// The instruction stream must be terminated by [`Op::End`] or [`Op::Fail`]
/// on every path; the engine does not bound the pattern cursor itself.
#[derive(Builder, Clone, Debug)]
pub struct Pattern {
    /// Instruction words, as described at the module level.
    pub(crate) code: Vec<u32>,
    /// Literal runs referenced by [`Op::String`] offsets.
    #[builder(default)]
    pub(crate) literal_text: Vec<u16>,
    /// Character sets referenced by [`Op::Setref`]. Index 0 is reserved;
    /// operands are always positive.
    #[builder(default)]
    pub(crate) sets: Vec<CodePointSet>,
    /// Number of capture groups, excluding the implicit whole-match group 0.
    #[builder(default)]
    pub(crate) num_capture_groups: usize,
    /// Maximum decimal digits consumed after `$` in replacement templates.
    /// Defaults to the number of digits in the group count.
    max_capture_digits: Option<u32>,
}

impl Pattern {
    /// Creates a matcher over `input` with the default [`Config`].
    pub fn matcher<'p, 'i>(&'p self, input: &'i [u16]) -> Matcher<'p, 'i> {
        self.matcher_with_config(Config::default(), input)
    }

    /// Creates a matcher over `input` with an explicit [`Config`].
    pub fn matcher_with_config<'p, 'i>(&'p self, config: Config, input: &'i [u16]) -> Matcher<'p, 'i> {
        Matcher::new(self, input, config)
    }

    /// Number of capture groups in the pattern, excluding group 0.
    pub fn group_count(&self) -> usize {
        self.num_capture_groups
    }

    pub(crate) fn code(&self) -> &[u32] {
        &self.code
    }

    pub(crate) fn literal_text(&self) -> &[u16] {
        &self.literal_text
    }

    pub(crate) fn sets(&self) -> &[CodePointSet] {
        &self.sets
    }

    /// Cells per backtrack frame: a start/end pair per group plus the
    /// pattern and input continuation.
    pub(crate) fn capture_state_size(&self) -> usize {
        2 * self.num_capture_groups + 2
    }

    pub(crate) fn max_capture_digits(&self) -> u32 {
        self.max_capture_digits
            .unwrap_or_else(|| decimal_digits(self.num_capture_groups))
    }
}

fn decimal_digits(mut n: usize) -> u32 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}
