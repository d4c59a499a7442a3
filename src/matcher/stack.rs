//! Backtrack stack: a growable array of 32-bit cells, pushed and popped in
//! fixed-size blocks.

use crate::error::Error;

/// Storage for the matcher's choice points.
///
/// One frame is pushed per `StateSave` and popped per local failure. The
/// buffer is retained across match attempts for reuse; `clear` only resets
/// the logical length.
#[derive(Debug)]
pub(crate) struct BacktrackStack {
    cells: Vec<i32>,
    len: usize,
    limit: Option<usize>,
}

impl BacktrackStack {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            cells: Vec::new(),
            len: 0,
            limit,
        }
    }

    /// Pushes `n` zeroed cells and returns a writable view of them.
    ///
    /// Fails when growing the buffer would exceed the configured limit or
    /// when the allocator refuses.
    pub fn reserve_block(&mut self, n: usize) -> Result<&mut [i32], Error> {
        let new_len = self.len + n;
        if let Some(limit) = self.limit {
            if new_len > limit {
                return Err(Error::StackLimit { limit });
            }
        }
        if self.cells.len() < new_len {
            self.cells.try_reserve(new_len - self.cells.len())?;
            self.cells.resize(new_len, 0);
        }
        let block = &mut self.cells[self.len..new_len];
        self.len = new_len;
        Ok(block)
    }

    /// Removes the top `n` cells and returns a view of them, or `None` when
    /// the stack is empty.
    ///
    /// # Panics
    ///
    /// Panics on a non-empty stack holding fewer than `n` cells; frames are
    /// pushed and popped with one size per pattern, so a partial frame is a
    /// bug.
    pub fn pop_block(&mut self, n: usize) -> Option<&[i32]> {
        if self.len == 0 {
            return None;
        }
        assert!(self.len >= n, "backtrack frame size mismatch");
        self.len -= n;
        Some(&self.cells[self.len..self.len + n])
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.len
    }
}
