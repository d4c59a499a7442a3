//! The bytecode interpreter driving every search operation.
//!
//! `match_at` runs the compiled program against the subject starting at one
//! input position. Choice points are pushed by `StateSave` and consumed on
//! local failure; when no choice point remains the attempt is over. The
//! facade in the parent module decides which positions to try.

use log::trace;

use crate::pattern::{self, Op, StaticClass};
use crate::unicode;

use super::stack::BacktrackStack;
use super::Matcher;

/// Restores the most recent choice point, returning the pattern and input
/// indices to resume at. `None` means the attempt has definitively failed.
fn back_track(
    stack: &mut BacktrackStack,
    capture_starts: &mut [i32],
    capture_ends: &mut [i32],
) -> Option<(usize, usize)> {
    let num_groups = capture_starts.len() - 1;
    let frame = stack.pop_block(2 * num_groups + 2)?;
    let mut cell = 0;
    for group in (1..=num_groups).rev() {
        capture_starts[group] = frame[cell];
        capture_ends[group] = frame[cell + 1];
        cell += 2;
    }
    Some((frame[cell] as usize, frame[cell + 1] as usize))
}

impl<'p, 'i> Matcher<'p, 'i> {
    /// Attempts a match with the whole pattern anchored at `start_idx`.
    ///
    /// On success the match bounds and capture slots describe the match; on
    /// failure the capture slots may hold partial data, which is why a
    /// group's participation is always judged by its start slot.
    pub(crate) fn match_at(&mut self, start_idx: usize) -> Result<(), crate::Error> {
        let pattern = self.pattern;
        let code = pattern.code();
        let literal = pattern.literal_text();
        let sets = pattern.sets();
        let num_groups = pattern.group_count();
        let frame_size = pattern.capture_state_size();
        let input = self.input;
        let input_len = input.len();

        // Capture results must not leak in from a previous attempt; a group
        // on an untaken alternation branch stays at -1.
        for slot in self.capture_starts.iter_mut() {
            *slot = -1;
        }
        self.stack.clear();

        let mut input_idx = start_idx;
        let mut pat_idx = 0usize;
        let mut is_match = false;

        trace!("match_at: start_idx={start_idx}");

        'run: loop {
            macro_rules! fail {
                () => {{
                    match back_track(&mut self.stack, &mut self.capture_starts, &mut self.capture_ends) {
                        Some((p, i)) => {
                            pat_idx = p;
                            input_idx = i;
                            continue 'run;
                        }
                        None => break 'run,
                    }
                }};
            }

            let word = code[pat_idx];
            let (op, op_value) = pattern::decode(word);
            pat_idx += 1;

            match op {
                Op::Nop => {}

                Op::Backtrack => fail!(),

                Op::OneChar => {
                    if input_idx < input_len {
                        let (c, next) = unicode::next_code_point(input, input_idx);
                        if c == op_value {
                            input_idx = next;
                            continue 'run;
                        }
                    }
                    fail!();
                }

                Op::String => {
                    let offset = op_value as usize;
                    let (len_op, len_value) = pattern::decode(code[pat_idx]);
                    pat_idx += 1;
                    debug_assert_eq!(len_op, Op::StringLen);
                    let len = len_value as usize;
                    let end = input_idx + len;
                    if end <= input_len && input[input_idx..end] == literal[offset..offset + len] {
                        input_idx = end;
                    } else {
                        fail!();
                    }
                }

                Op::StringLen => panic!("misplaced StringLen instruction at {}", pat_idx - 1),

                Op::StateSave => {
                    // Snapshot every group plus the continuation, newest
                    // group first so restoration walks groups 1..=N.
                    let block = self.stack.reserve_block(frame_size)?;
                    let mut cell = 0;
                    for group in (1..=num_groups).rev() {
                        block[cell] = self.capture_starts[group];
                        block[cell + 1] = self.capture_ends[group];
                        cell += 2;
                    }
                    block[cell] = op_value as i32;
                    block[cell + 1] = input_idx as i32;
                }

                Op::Jmp => pat_idx = op_value as usize,

                Op::End => {
                    is_match = true;
                    break 'run;
                }

                Op::Fail => break 'run,

                Op::StartCapture => {
                    let group = op_value as usize;
                    debug_assert!((1..=num_groups).contains(&group));
                    self.capture_starts[group] = input_idx as i32;
                }

                Op::EndCapture => {
                    let group = op_value as usize;
                    debug_assert!((1..=num_groups).contains(&group));
                    debug_assert!(self.capture_starts[group] >= 0);
                    self.capture_ends[group] = input_idx as i32;
                }

                Op::Caret => {
                    if input_idx != 0 {
                        fail!();
                    }
                }

                Op::Dollar => {
                    let at_end = input_idx == input_len;
                    let before_final_break = input_idx + 1 == input_len
                        && unicode::code_point_at(input, input_idx)
                            .is_some_and(unicode::is_line_terminator);
                    let before_final_crlf = input_idx + 2 == input_len
                        && input[input_idx] == 0x0D
                        && input[input_idx + 1] == 0x0A;
                    if !(at_end || before_final_break || before_final_crlf) {
                        fail!();
                    }
                }

                Op::BackslashA => {
                    if input_idx != 0 {
                        fail!();
                    }
                }

                Op::BackslashB => {
                    let mut boundary = self.is_word_boundary(input_idx);
                    if op_value != 0 {
                        boundary = !boundary;
                    }
                    if !boundary {
                        fail!();
                    }
                }

                Op::BackslashD => {
                    if input_idx >= input_len {
                        fail!();
                    }
                    let (c, next) = unicode::next_code_point(input, input_idx);
                    let mut is_digit = unicode::is_decimal_digit(c);
                    if op_value != 0 {
                        is_digit = !is_digit;
                    }
                    if is_digit {
                        input_idx = next;
                    } else {
                        fail!();
                    }
                }

                Op::BackslashG => {
                    let anchored = if self.matched {
                        input_idx == self.match_end
                    } else {
                        input_idx == 0
                    };
                    if !anchored {
                        fail!();
                    }
                }

                Op::BackslashX => {
                    if input_idx >= input_len {
                        fail!();
                    }
                    let (c, next) = unicode::next_code_point(input, input_idx);
                    input_idx = next;
                    if c == 0x0D && unicode::code_point_at(input, input_idx) == Some(0x0A) {
                        // CR LF forms a single cluster.
                        input_idx += 1;
                        continue 'run;
                    }
                    if unicode::general_category(c)
                        != unicode_general_category::GeneralCategory::Control
                    {
                        while let Some(mark) = unicode::code_point_at(input, input_idx) {
                            if !unicode::is_combining_mark(mark) {
                                break;
                            }
                            input_idx = unicode::move_index(input, input_idx, 1);
                        }
                    }
                }

                Op::BackslashZ => {
                    if input_idx < input_len {
                        fail!();
                    }
                }

                Op::StaticSetref => {
                    let negated = (op_value & pattern::NEG_SET) != 0;
                    let set_index = op_value & !pattern::NEG_SET;
                    let class = StaticClass::from_index(set_index)
                        .expect("static set index out of range");
                    let mut success = negated;
                    let mut next = input_idx;
                    if input_idx < input_len {
                        let (c, n) = unicode::next_code_point(input, input_idx);
                        next = n;
                        if class.contains(c) {
                            success = !success;
                        }
                    }
                    if !success {
                        fail!();
                    }
                    input_idx = next;
                }

                Op::Setref => {
                    if input_idx < input_len {
                        let (c, next) = unicode::next_code_point(input, input_idx);
                        let set_index = op_value as usize;
                        debug_assert!(set_index > 0 && set_index < sets.len());
                        if sets[set_index].contains(c) {
                            input_idx = next;
                            continue 'run;
                        }
                    }
                    fail!();
                }

                Op::DotAny => {
                    if input_idx >= input_len {
                        fail!();
                    }
                    let (c, next) = unicode::next_code_point(input, input_idx);
                    if unicode::is_line_terminator(c) {
                        fail!();
                    }
                    input_idx = next;
                }

                Op::DotAnyAll => {
                    if input_idx >= input_len {
                        fail!();
                    }
                    let (c, next) = unicode::next_code_point(input, input_idx);
                    input_idx = next;
                    if c == 0x0D && unicode::code_point_at(input, input_idx) == Some(0x0A) {
                        input_idx += 1;
                    }
                }
            }
        }

        // Leftover choice points from a successful exit are dead state.
        self.stack.clear();

        self.matched = is_match;
        if is_match {
            self.last_match_end = self.match_end;
            self.match_start = start_idx;
            self.match_end = input_idx;
            trace!("match: start={} end={}", self.match_start, self.match_end);
        } else {
            trace!("no match at {start_idx}");
        }
        Ok(())
    }

    /// Whether `pos` sits on a word boundary.
    ///
    /// A combining mark is never a boundary. Otherwise the position is a
    /// boundary when the code point at `pos` (none, past the end) and the
    /// nearest non-combining code point before it disagree about word-set
    /// membership.
    pub(crate) fn is_word_boundary(&self, pos: usize) -> bool {
        let c_is_word = match unicode::code_point_at(self.input, pos) {
            Some(c) if unicode::is_combining_mark(c) => return false,
            Some(c) => StaticClass::Word.contains(c),
            None => false,
        };

        let mut prev_is_word = false;
        let mut prev_pos = pos;
        while prev_pos > 0 {
            prev_pos = unicode::move_index(self.input, prev_pos, -1);
            let (prev, _) = unicode::next_code_point(self.input, prev_pos);
            if !unicode::is_combining_mark(prev) {
                prev_is_word = StaticClass::Word.contains(prev);
                break;
            }
        }
        c_is_word != prev_is_word
    }
}

#[cfg(test)]
mod tests {
    use crate::pattern::{CodePointSet, Op, Pattern, NEG_SET};
    use crate::unicode::to_utf16;

    fn pattern(code: Vec<u32>) -> Pattern {
        Pattern::builder().code(code).build()
    }

    #[test]
    fn backtrack_restores_continuation() {
        // StateSave then a forced Backtrack resumes at the saved target.
        let p = pattern(vec![
            Op::StateSave.word(3),
            Op::Backtrack.word(0),
            Op::Fail.word(0),
            Op::OneChar.word(u32::from('a')),
            Op::End.word(0),
        ]);
        let input = to_utf16("a");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (0, 1));
    }

    #[test]
    fn fail_is_definitive_despite_saved_frames() {
        let p = pattern(vec![Op::StateSave.word(2), Op::Fail.word(0), Op::End.word(0)]);
        let input = to_utf16("anything");
        let mut m = p.matcher(&input);
        assert!(!m.find().unwrap());
    }

    #[test]
    fn greedy_loop_backtracks_to_longest_viable_prefix() {
        // a*a : the loop must give one 'a' back for the tail to match.
        let p = pattern(vec![
            Op::StateSave.word(3),
            Op::OneChar.word(u32::from('a')),
            Op::Jmp.word(0),
            Op::OneChar.word(u32::from('a')),
            Op::End.word(0),
        ]);
        let input = to_utf16("aaa");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (0, 3));
    }

    #[test]
    fn string_matches_literal_runs() {
        let p = Pattern::builder()
            .code(vec![
                Op::String.word(2),
                Op::StringLen.word(3),
                Op::End.word(0),
            ])
            .literal_text(to_utf16("xxabc"))
            .build();
        let input = to_utf16("zabc");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (1, 4));

        let input = to_utf16("zab");
        let mut m = p.matcher(&input);
        assert!(!m.find().unwrap());
    }

    #[test]
    fn one_char_crosses_surrogate_pairs() {
        let p = pattern(vec![Op::OneChar.word(0x1F600), Op::End.word(0)]);
        let input = to_utf16("a😀b");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (1, 3));
    }

    #[test]
    fn dollar_positions() {
        let p = pattern(vec![Op::Dollar.word(0), Op::End.word(0)]);
        let input = to_utf16("x\r\n");
        let mut m = p.matcher(&input);
        let mut hits = Vec::new();
        while m.find().unwrap() {
            hits.push(m.start(0).unwrap());
        }
        // Before the CR LF pair, before the LF, and at the very end.
        assert_eq!(hits, vec![1, 2, 3]);

        let input = to_utf16("xy");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 2);
    }

    #[test]
    fn caret_and_input_anchors() {
        let p = pattern(vec![
            Op::BackslashA.word(0),
            Op::OneChar.word(u32::from('a')),
            Op::BackslashZ.word(0),
            Op::End.word(0),
        ]);
        let input = to_utf16("a");
        assert!(p.matcher(&input).find().unwrap());
        let input = to_utf16("ab");
        assert!(!p.matcher(&input).find().unwrap());
        let input = to_utf16("ba");
        assert!(!p.matcher(&input).find().unwrap());

        let p = pattern(vec![Op::Caret.word(0), Op::End.word(0)]);
        let input = to_utf16("ab");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.end(0).unwrap(), 0);
        assert!(!m.find().unwrap());
    }

    #[test]
    fn digit_class_and_negation() {
        let p = pattern(vec![Op::BackslashD.word(0), Op::End.word(0)]);
        let input = to_utf16("x5");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 1);

        let p = pattern(vec![Op::BackslashD.word(1), Op::End.word(0)]);
        let input = to_utf16("5x");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 1);
    }

    #[test]
    fn continuation_anchor_follows_previous_match() {
        // \Ga
        let p = pattern(vec![
            Op::BackslashG.word(0),
            Op::OneChar.word(u32::from('a')),
            Op::End.word(0),
        ]);
        let input = to_utf16("aab");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 0);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 1);
        assert!(!m.find().unwrap());
    }

    #[test]
    fn grapheme_cluster_consumes_combining_marks() {
        let p = pattern(vec![Op::BackslashX.word(0), Op::End.word(0)]);
        // e + combining acute, then x
        let input = vec![0x0065, 0x0301, 0x0078];
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (0, 2));
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (2, 3));
    }

    #[test]
    fn grapheme_cluster_treats_crlf_as_one() {
        let p = pattern(vec![Op::BackslashX.word(0), Op::End.word(0)]);
        let input = to_utf16("\r\na");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (0, 2));
    }

    #[test]
    fn static_set_polarity() {
        let p = pattern(vec![Op::StaticSetref.word(1), Op::End.word(0)]);
        let input = to_utf16("!a");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 1);

        let p = pattern(vec![Op::StaticSetref.word(1 | NEG_SET), Op::End.word(0)]);
        let input = to_utf16("a!");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (1, 2));
    }

    #[test]
    fn negated_static_set_succeeds_at_end_without_consuming() {
        let p = pattern(vec![Op::StaticSetref.word(1 | NEG_SET), Op::End.word(0)]);
        let input = to_utf16("a");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (1, 1));
    }

    #[test]
    fn setref_uses_pattern_sets() {
        let p = Pattern::builder()
            .code(vec![Op::Setref.word(1), Op::End.word(0)])
            .sets(vec![CodePointSet::default(), CodePointSet::from_chars("abc")])
            .build();
        let input = to_utf16("zb");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 1);
    }

    #[test]
    fn dot_any_rejects_line_terminators() {
        let p = pattern(vec![Op::DotAny.word(0), Op::End.word(0)]);
        let input = to_utf16("\n\u{2029}a");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!(m.start(0).unwrap(), 2);
    }

    #[test]
    fn dot_any_all_consumes_crlf_pair() {
        let p = pattern(vec![Op::DotAnyAll.word(0), Op::End.word(0)]);
        let input = to_utf16("\r\nx");
        let mut m = p.matcher(&input);
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (0, 2));
        assert!(m.find().unwrap());
        assert_eq!((m.start(0).unwrap(), m.end(0).unwrap()), (2, 3));
    }

    #[test]
    fn word_boundaries_skip_combining_marks() {
        // "e<combining acute> x": the mark belongs to the word before it.
        let input = vec![0x0065, 0x0301, 0x0020, 0x0078];
        let p = pattern(vec![Op::BackslashB.word(0), Op::End.word(0)]);
        let mut m = p.matcher(&input);
        let mut hits = Vec::new();
        while m.find().unwrap() {
            hits.push(m.start(0).unwrap());
        }
        // Position 1 is a combining mark, never a boundary; position 2 ends
        // the word through the mark.
        assert_eq!(hits, vec![0, 2, 3, 4]);
    }
}
