//! Best-effort call attribution keyed by the enclosing function name

use std::collections::BTreeMap;

/// Name used for calls made outside any function body.
pub const MODULE_SCOPE: &str = "<module>";

/// Name used for functions with no inferable name.
pub const ANONYMOUS: &str = "<anonymous>";

/// Stack of enclosing function names, pushed and popped by the syntax walker.
/// It only records calls; it never influences which nodes are visited.
#[derive(Debug, Default)]
pub struct AttributionStack {
    frames: Vec<String>,
    calls: BTreeMap<String, Vec<String>>,
}

impl AttributionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.frames.push(name.into());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn current(&self) -> &str {
        self.frames.last().map(String::as_str).unwrap_or(MODULE_SCOPE)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Attribute a call of `callee` to the current frame. Repeated calls are
    /// recorded once, in first-seen order.
    pub fn record_call(&mut self, callee: &str) {
        let frame = self.current().to_string();
        let calls = self.calls.entry(frame).or_default();
        if !calls.iter().any(|c| c == callee) {
            calls.push(callee.to_string());
        }
    }

    pub fn into_calls(self) -> BTreeMap<String, Vec<String>> {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_are_attributed_to_innermost_frame() {
        let mut stack = AttributionStack::new();
        stack.record_call("setup");
        stack.push("handler");
        stack.record_call("res.send");
        stack.push(ANONYMOUS);
        stack.record_call("next");
        stack.pop();
        stack.record_call("res.send");
        stack.pop();
        assert_eq!(stack.depth(), 0);

        let calls = stack.into_calls();
        assert_eq!(calls[MODULE_SCOPE], vec!["setup"]);
        assert_eq!(calls["handler"], vec!["res.send"]);
        assert_eq!(calls[ANONYMOUS], vec!["next"]);
    }

    #[test]
    fn test_pop_on_empty_stack_is_harmless() {
        let mut stack = AttributionStack::new();
        stack.pop();
        assert_eq!(stack.current(), MODULE_SCOPE);
    }
}
