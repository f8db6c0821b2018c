/// The single integer stack a monty script operates on.
///
/// Strict LIFO discipline over 32-bit signed integers: the last value pushed
/// is the first value observed by any removal. Backed by an owning `Vec`, so
/// releasing the whole stack is the vector's `Drop`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<i32>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack { values: vec![] }
    }

    /// Inserts `value` as the new top of the stack.
    pub fn push(&mut self, value: i32) {
        self.values.push(value);
    }

    /// Removes and returns the top of the stack. `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<i32> {
        self.values.pop()
    }

    /// Returns the top of the stack without removing it.
    pub fn peek(&self) -> Option<i32> {
        self.values.last().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the stack contents from top to bottom without mutating it.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.iter().rev().copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl From<Vec<i32>> for Stack {
    /// Builds a stack from values in bottom-to-top order.
    fn from(values: Vec<i32>) -> Stack {
        Stack { values }
    }
}
