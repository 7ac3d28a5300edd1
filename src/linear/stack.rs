use std::fmt;

/// Virtual register standing in for one evaluation stack slot
///
/// The register for a slot is simply the slot's depth: the bottom of the stack is `v0`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Register(pub usize);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Evaluation stack simulator
///
/// Only the depth is tracked: the types of the values don't matter for picking registers.
#[derive(Clone, Debug, Default)]
pub struct EvaluationStack {
    depth: usize,
    max_depth: usize,
}

impl EvaluationStack {
    pub fn new() -> EvaluationStack {
        EvaluationStack::default()
    }

    /// Stack which already holds `depth` values (eg. the exception object in a catch handler)
    pub fn with_depth(depth: usize) -> EvaluationStack {
        EvaluationStack {
            depth,
            max_depth: depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Deepest the stack has been so far
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Pop `count` values, returning their registers from the deepest to the top
    ///
    /// Returns `None` (and leaves the stack untouched) if there aren't enough values.
    pub fn pop(&mut self, count: usize) -> Option<Vec<Register>> {
        let new_depth = self.depth.checked_sub(count)?;
        let registers = (new_depth..self.depth).map(Register).collect();
        self.depth = new_depth;
        Some(registers)
    }

    /// Push `count` values, returning their registers from the deepest to the top
    pub fn push(&mut self, count: usize) -> Vec<Register> {
        let registers = (self.depth..self.depth + count).map(Register).collect();
        self.set_depth(self.depth + count);
        registers
    }

    /// Drop everything on the stack
    pub fn clear(&mut self) {
        self.depth = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_and_pop() {
        let mut stack = EvaluationStack::new();
        assert_eq!(stack.push(2), vec![Register(0), Register(1)]);
        assert_eq!(stack.push(1), vec![Register(2)]);
        assert_eq!(stack.pop(2), Some(vec![Register(1), Register(2)]));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.max_depth(), 3);
        assert_eq!(stack.pop(0), Some(vec![]));
    }

    #[test]
    fn underflow_leaves_stack_alone() {
        let mut stack = EvaluationStack::with_depth(1);
        assert_eq!(stack.pop(2), None);
        assert_eq!(stack.depth(), 1);
        stack.clear();
        assert_eq!(stack.pop(1), None);
        assert_eq!(stack.max_depth(), 1);
    }

    #[test]
    fn registers_render_with_prefix() {
        assert_eq!(Register(0).to_string(), "v0");
        assert_eq!(Register(12).to_string(), "v12");
    }
}
