/*!
Searching, capture-group queries, and replacement over a bound subject.

A [`Matcher`] is created from a [`Pattern`](crate::pattern::Pattern) and a
UTF-16 subject. It is exclusively owned by its caller: the search operations
mutate match state in place, and one matcher must never be shared between
threads. The pattern itself is read-only and can back any number of matchers
at once.

All offsets are in UTF-16 code units and always fall on code-point
boundaries. Capture-group queries report `-1` for groups that did not
participate in the match, which is distinct from matching an empty range.
*/

mod engine;
mod matches;
mod stack;

pub use matches::Match;

use bon::Builder;

use crate::error::Error;
use crate::pattern::Pattern;
use crate::unicode;

use stack::BacktrackStack;

/// Resource limits for a matcher.
///
/// The engine itself places no bound on backtracking; a pathological
/// pattern can revisit choice points for a very long time. Callers that
/// need bounded memory can cap the backtrack stack here and treat the
/// resulting [`Error::StackLimit`] as a match failure.
#[derive(Builder, Clone, Copy, Debug, Default)]
pub struct Config {
    /// Maximum number of 32-bit cells the backtrack stack may hold.
    pub backtrack_limit: Option<usize>,
}

/// A regular-expression matcher bound to one subject string.
pub struct Matcher<'p, 'i> {
    pattern: &'p Pattern,
    input: &'i [u16],
    /// Capture bounds per group; slot 0 mirrors the whole match. A start of
    /// -1 marks a group that did not participate.
    capture_starts: Vec<i32>,
    capture_ends: Vec<i32>,
    match_start: usize,
    match_end: usize,
    /// End of the match before the current one; `append_replacement` copies
    /// the subject from here up to the current match start.
    last_match_end: usize,
    matched: bool,
    stack: BacktrackStack,
}

impl<'p, 'i> Matcher<'p, 'i> {
    pub(crate) fn new(pattern: &'p Pattern, input: &'i [u16], config: Config) -> Self {
        debug_assert!(input.len() <= i32::MAX as usize);
        let slots = pattern.group_count() + 1;
        Self {
            pattern,
            input,
            capture_starts: vec![-1; slots],
            capture_ends: vec![-1; slots],
            match_start: 0,
            match_end: 0,
            last_match_end: 0,
            matched: false,
            stack: BacktrackStack::new(config.backtrack_limit),
        }
    }

    /// The pattern this matcher executes.
    pub fn pattern(&self) -> &'p Pattern {
        self.pattern
    }

    /// The subject this matcher searches.
    pub fn input(&self) -> &'i [u16] {
        self.input
    }

    /// Number of capture groups in the pattern, excluding group 0.
    pub fn group_count(&self) -> usize {
        self.pattern.group_count()
    }

    /// Discards all match state. The next [`find`](Self::find) starts from
    /// the beginning of the subject.
    pub fn reset(&mut self) -> &mut Self {
        self.match_start = 0;
        self.match_end = 0;
        self.last_match_end = 0;
        self.matched = false;
        for slot in self.capture_starts.iter_mut() {
            *slot = -1;
        }
        self
    }

    /// Rebinds the matcher to a new subject and resets it.
    pub fn reset_input(&mut self, input: &'i [u16]) -> &mut Self {
        debug_assert!(input.len() <= i32::MAX as usize);
        self.input = input;
        self.reset()
    }

    /// Finds the next match, scanning forward from the end of the previous
    /// one (or from the start after a reset).
    ///
    /// A previous zero-width match is skipped over by one code point so that
    /// repeated calls always make progress.
    pub fn find(&mut self) -> Result<bool, Error> {
        let mut start = self.match_end;
        if self.matched && self.match_start == self.match_end {
            if start >= self.input.len() {
                return Ok(false);
            }
            start = unicode::move_index(self.input, start, 1);
        }
        self.find_at(start)
    }

    /// Resets the matcher and finds the first match at or after `start`.
    ///
    /// `start` must address a position inside the subject; the position just
    /// past the end is not accepted.
    pub fn find_from(&mut self, start: usize) -> Result<bool, Error> {
        if start >= self.input.len() {
            return Err(Error::IndexOutOfBounds {
                index: start,
                limit: self.input.len(),
            });
        }
        self.reset();
        self.find_at(start)
    }

    /// Tries each position from `pos` through the end of input, including
    /// the zero-width position at the very end.
    fn find_at(&mut self, mut pos: usize) -> Result<bool, Error> {
        loop {
            self.match_at(pos)?;
            if self.matched {
                return Ok(true);
            }
            if pos >= self.input.len() {
                return Ok(false);
            }
            pos = unicode::move_index(self.input, pos, 1);
        }
    }

    /// Whether the pattern matches at the very start of the subject. The
    /// match may end before the end of input.
    pub fn looking_at(&mut self) -> Result<bool, Error> {
        self.reset();
        self.match_at(0)?;
        Ok(self.matched)
    }

    /// Whether the pattern matches the entire subject.
    pub fn matches(&mut self) -> Result<bool, Error> {
        self.reset();
        self.match_at(0)?;
        Ok(self.matched && self.match_end == self.input.len())
    }

    /// Start offset of a capture group in the last match, or -1 when the
    /// group did not participate. Group 0 is the whole match.
    pub fn start(&self, group: usize) -> Result<i32, Error> {
        self.check_group(group)?;
        Ok(if group == 0 {
            self.match_start as i32
        } else {
            self.capture_starts[group]
        })
    }

    /// End offset of a capture group in the last match, or -1 when the group
    /// did not participate.
    pub fn end(&self, group: usize) -> Result<i32, Error> {
        self.check_group(group)?;
        Ok(if group == 0 {
            self.match_end as i32
        } else if self.capture_starts[group] >= 0 {
            // The end slot holds stale data until the start slot shows the
            // group actually matched.
            self.capture_ends[group]
        } else {
            -1
        })
    }

    /// The text captured by a group in the last match. A group that did not
    /// participate yields the empty slice.
    pub fn group(&self, group: usize) -> Result<&'i [u16], Error> {
        let start = self.start(group)?;
        let end = self.end(group)?;
        if start < 0 {
            return Ok(&[]);
        }
        debug_assert!(start <= end);
        Ok(&self.input[start as usize..end as usize])
    }

    fn check_group(&self, group: usize) -> Result<(), Error> {
        if !self.matched {
            return Err(Error::InvalidState);
        }
        let limit = self.pattern.group_count();
        if group > limit {
            return Err(Error::IndexOutOfBounds { index: group, limit });
        }
        Ok(())
    }

    /// Appends the subject between the previous and current matches to
    /// `dest`, followed by the expansion of `replacement`.
    ///
    /// In the replacement, `$` followed by decimal digits substitutes the
    /// corresponding capture group, a backslash escapes the next code unit,
    /// and everything else is copied verbatim. A `$` with no following digit
    /// is literal; a trailing lone backslash is dropped.
    pub fn append_replacement(&self, dest: &mut Vec<u16>, replacement: &[u16]) -> Result<(), Error> {
        const BACKSLASH: u16 = b'\\' as u16;
        const DOLLAR: u16 = b'$' as u16;

        if !self.matched {
            return Err(Error::InvalidState);
        }

        dest.extend_from_slice(&self.input[self.last_match_end..self.match_start]);

        let mut idx = 0;
        while idx < replacement.len() {
            let unit = replacement[idx];
            idx += 1;
            if unit == BACKSLASH {
                // A low surrogate can be neither '$' nor '\', so pairs need
                // no special casing anywhere in this loop.
                if idx >= replacement.len() {
                    break;
                }
                dest.push(replacement[idx]);
                idx += 1;
                continue;
            }
            if unit != DOLLAR {
                dest.push(unit);
                continue;
            }

            let mut num_digits = 0;
            let mut group = 0usize;
            while idx < replacement.len() {
                let (cp, next) = unicode::next_code_point(replacement, idx);
                if !unicode::is_decimal_digit(cp) {
                    break;
                }
                let Some(value) = unicode::digit_value(cp) else {
                    break;
                };
                idx = next;
                group = group * 10 + value as usize;
                num_digits += 1;
                if num_digits >= self.pattern.max_capture_digits() {
                    break;
                }
            }
            if num_digits == 0 {
                // No group number after all; the dollar sign is literal.
                dest.push(DOLLAR);
                continue;
            }
            let captured = self.group(group)?;
            dest.extend_from_slice(captured);
        }
        Ok(())
    }

    /// Appends the subject from the end of the last match through the end of
    /// input to `dest`.
    pub fn append_tail(&self, dest: &mut Vec<u16>) {
        dest.extend_from_slice(&self.input[self.match_end..]);
    }

    /// Replaces every match in the subject with the expansion of
    /// `replacement` and returns the result.
    pub fn replace_all(&mut self, replacement: &[u16]) -> Result<Vec<u16>, Error> {
        self.reset();
        let mut dest = Vec::new();
        while self.find()? {
            self.append_replacement(&mut dest, replacement)?;
        }
        self.append_tail(&mut dest);
        Ok(dest)
    }

    /// Replaces the first match in the subject with the expansion of
    /// `replacement` and returns the result. Without a match the subject is
    /// returned unchanged.
    pub fn replace_first(&mut self, replacement: &[u16]) -> Result<Vec<u16>, Error> {
        self.reset();
        if !self.find()? {
            return Ok(self.input.to_vec());
        }
        let mut dest = Vec::new();
        self.append_replacement(&mut dest, replacement)?;
        self.append_tail(&mut dest);
        Ok(dest)
    }

    /// Iterates over the remaining matches, continuing from the current
    /// matcher state. Call [`reset`](Self::reset) first to scan the whole
    /// subject.
    pub fn find_iter<'m>(&'m mut self) -> FindIter<'m, 'p, 'i> {
        FindIter { matcher: self }
    }
}

/// Iterator over successive matches, created by [`Matcher::find_iter`].
pub struct FindIter<'m, 'p, 'i> {
    matcher: &'m mut Matcher<'p, 'i>,
}

impl Iterator for FindIter<'_, '_, '_> {
    type Item = Result<Match, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.matcher.find() {
            Ok(true) => Some(Ok(Match {
                start: self.matcher.match_start,
                end: self.matcher.match_end,
            })),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
