//! Per-category row accumulation

use tokio::time::Instant;

use crate::storage::schema::{Category, Value};

/// Rows waiting to be written to one category's table
///
/// Values are stored flattened: `values.len() == rows * width` at all times.
#[derive(Debug)]
pub struct BatchBuffer {
    category: Category,
    capacity: usize,
    width: usize,
    values: Vec<Value>,
    rows: usize,
    oldest: Option<Instant>,
}

impl BatchBuffer {
    pub fn new(category: Category, capacity: usize) -> Self {
        let width = category.family().width();
        Self {
            category,
            capacity,
            width,
            values: Vec::with_capacity(capacity * width),
            rows: 0,
            oldest: None,
        }
    }

    /// Append one row, returns true once the buffer is full
    pub fn push(&mut self, row: Vec<Value>) -> bool {
        debug_assert_eq!(
            row.len(),
            self.width,
            "{} row has wrong number of values",
            self.category
        );

        if self.rows == 0 {
            self.oldest = Some(Instant::now());
        }
        self.values.extend(row);
        self.rows += 1;

        debug_assert_eq!(self.values.len(), self.rows * self.width);
        self.is_full()
    }

    /// Drain the buffer, returning the row count and flattened values
    pub fn take(&mut self) -> (usize, Vec<Value>) {
        let rows = std::mem::replace(&mut self.rows, 0);
        let values = std::mem::replace(
            &mut self.values,
            Vec::with_capacity(self.capacity * self.width),
        );
        self.oldest = None;
        (rows, values)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows currently buffered
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn is_full(&self) -> bool {
        self.rows >= self.capacity
    }

    /// When the first row of the current batch arrived
    pub fn oldest(&self) -> Option<Instant> {
        self.oldest
    }
}
