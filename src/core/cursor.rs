use std::ops::{Deref, DerefMut};

use crate::core::row::Row;

/// Forward-only sequence of result rows.
///
/// `close` must be idempotent; the mapper calls it once it is done with the
/// cursor, whatever the outcome.
pub trait RowCursor {
    /// Moves to the next row; `false` once the sequence is exhausted.
    fn advance(&mut self) -> bool;

    /// Row under the cursor, `None` before the first `advance` or after the end.
    fn current(&self) -> Option<&Row>;

    fn close(&mut self);
}

/// In-memory cursor over a fixed set of rows.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    position: Option<usize>,
    close_count: usize,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            position: None,
            close_count: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close_count > 0
    }

    /// How many times `close` was called.
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl RowCursor for ResultSet {
    fn advance(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        let next = self.position.map_or(0, |idx| idx + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    fn current(&self) -> Option<&Row> {
        if self.is_closed() {
            return None;
        }
        self.position.and_then(|idx| self.rows.get(idx))
    }

    fn close(&mut self) {
        self.close_count += 1;
    }
}

impl<C: RowCursor + ?Sized> RowCursor for &mut C {
    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn current(&self) -> Option<&Row> {
        (**self).current()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Closes the wrapped cursor when dropped.
pub(crate) struct CursorGuard<'a, C: RowCursor + ?Sized> {
    cursor: &'a mut C,
}

impl<'a, C: RowCursor + ?Sized> CursorGuard<'a, C> {
    pub(crate) fn new(cursor: &'a mut C) -> Self {
        Self { cursor }
    }
}

impl<C: RowCursor + ?Sized> Deref for CursorGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.cursor
    }
}

impl<C: RowCursor + ?Sized> DerefMut for CursorGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.cursor
    }
}

impl<C: RowCursor + ?Sized> Drop for CursorGuard<'_, C> {
    fn drop(&mut self) {
        self.cursor.close();
    }
}
