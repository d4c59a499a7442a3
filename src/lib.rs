/*!
A backtracking regular-expression matcher for UTF-16 subjects.

## Features
- Executes precompiled pattern programs: 32-bit instruction words plus
  literal-text and character-set tables, produced by an external compiler.
- Full capture-group support with faithful backtracking semantics: a group
  abandoned on a failed path reports "did not participate" rather than a
  stale range.
- Unicode-aware primitives
  - Subjects are UTF-16 code-unit slices; the engine advances by code point
    and treats surrogate pairs atomically.
  - General-category classification backs the digit, word-boundary, and
    grapheme-cluster operators.
- The classic matcher surface: [`find`](matcher::Matcher::find),
  [`looking_at`](matcher::Matcher::looking_at),
  [`matches`](matcher::Matcher::matches), capture queries, and the
  `append_replacement` / `append_tail` / `replace_all` / `replace_first`
  family with `$n` substitution.

Pattern compilation is out of scope, as are multi-line mode and streaming
subjects. A [`Pattern`](pattern::Pattern) is immutable and may back many
matchers; a [`Matcher`](matcher::Matcher) belongs to a single caller.

## Usage
```
use regex_u16::{pattern::{Op, Pattern}, unicode};

// The program for `a+`, assembled by hand here; a compiler normally
// emits this.
let pattern = Pattern::builder()
    .code(vec![
        Op::OneChar.word(u32::from('a')),
        Op::StateSave.word(3),
        Op::Jmp.word(0),
        Op::End.word(0),
    ])
    .build();

let input = unicode::to_utf16("xaaay");
let mut m = pattern.matcher(&input);
assert!(m.find()?);
assert_eq!((m.start(0)?, m.end(0)?), (1, 4));
assert_eq!(unicode::from_utf16_lossy(m.group(0)?), "aaa");

# Ok::<(), regex_u16::Error>(())
```

## Pathological patterns
The engine is a plain backtracker. Programs with overlapping choice points
can take exponential time, and nothing in the core interrupts them; callers
needing bounded latency should impose their own timeout, or cap memory with
[`Config::backtrack_limit`](matcher::Config).
*/

mod error;
pub mod matcher;
pub mod pattern;
pub mod unicode;

pub use error::Error;
pub use matcher::{Config, Match, Matcher};
pub use pattern::{Op, Pattern};
