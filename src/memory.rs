use crate::value::{Pipe, Value};
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

/// The reserved heap address holding a JSON object that mirrors every
/// user-level definition.
///
/// Definition checks consult this mirror, so every instruction that
/// defines or removes a symbol keeps it in sync with the heap.
pub const DEFINE: &str = "__DEFINE__";

/// One scope of the value stack.
#[derive(Default)]
struct Frame {
    stack: Vec<Value>,
}

/// The runtime state an instruction tree executes against: a frame stack
/// of values, a keyed heap, and the console text sink.
///
/// The base frame is always present and never popped.
pub struct Memory {
    frames: Vec<Frame>,
    heap: HashMap<String, Value>,
    console: String,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Create a new empty Memory.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            heap: HashMap::new(),
            console: String::new(),
        }
    }

    /// Push a value onto the top frame.
    pub fn push(&mut self, value: Value) {
        self.top().stack.push(value);
    }

    /// Pop a value from the top frame.
    ///
    /// An empty frame pops the empty text value.
    pub fn pop(&mut self) -> Value {
        self.top().stack.pop().unwrap_or_default()
    }

    /// Return a clone of the value on top of the stack without removing
    /// it.
    ///
    /// An empty frame yields the empty text value.
    pub fn peek(&self) -> Value {
        self.frames
            .last()
            .and_then(|frame| frame.stack.last())
            .cloned()
            .unwrap_or_default()
    }

    /// Open a new frame.
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Close the top frame, discarding whatever it holds.
    ///
    /// The base frame stays; closing it only clears it.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            self.top().stack.clear();
        }
    }

    /// Drain the top frame and return a lazy text value that concatenates
    /// the drained values in order.
    pub fn join_pop(&mut self) -> Value {
        let values = std::mem::take(&mut self.top().stack);
        Value::Text(Pipe::new(move |memory, _| {
            values
                .iter()
                .map(|value| value.evaluate(memory))
                .collect::<String>()
        }))
    }

    /// Drain the top frame and return the values in order.
    pub fn drain_top(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.top().stack)
    }

    /// Store a value at the given heap address.
    pub fn set<T>(&mut self, address: T, value: Value)
    where
        T: Into<String>,
    {
        self.heap.insert(address.into(), value);
    }

    /// Return a clone of the value at the given heap address.
    pub fn get(&self, address: &str) -> Option<Value> {
        self.heap.get(address).cloned()
    }

    /// Atomically rewrite the value at the given heap address.
    ///
    /// The function receives the memory and the current value (the empty
    /// text value when the address is vacant) and returns the replacement.
    pub fn compute<F>(&mut self, address: &str, f: F)
    where
        F: FnOnce(&Memory, Value) -> Value,
    {
        let current = self.get(address).unwrap_or_default();
        let replacement = f(&*self, current);
        self.heap.insert(address.to_string(), replacement);
    }

    /// Remove the value at the given heap address.
    pub fn free(&mut self, address: &str) {
        self.heap.remove(address);
    }

    /// Store a value at the given heap address and record its evaluated
    /// text in the definition mirror.
    pub fn define<T>(&mut self, address: T, value: Value)
    where
        T: Into<String>,
    {
        let address = address.into();
        let text = value.evaluate(&*self);
        self.heap.insert(address.clone(), value);

        let mut mirror = self.mirror();
        mirror.insert(address, Json::String(text));
        self.store_mirror(mirror);
    }

    /// Remove the given address from the heap and from the definition
    /// mirror.
    pub fn undefine(&mut self, address: &str) {
        self.heap.remove(address);
        self.conceal(address);
    }

    /// Remove the given address from the definition mirror only, keeping
    /// its heap value.
    pub fn conceal(&mut self, address: &str) {
        let mut mirror = self.mirror();
        mirror.remove(address);
        self.store_mirror(mirror);
    }

    /// Return true when the given address appears in the definition
    /// mirror.
    pub fn defined(&self, address: &str) -> bool {
        self.mirror().contains_key(address)
    }

    /// Append text to the console.
    pub fn print(&mut self, text: &str) {
        self.console.push_str(text);
    }

    /// Return the console text accumulated so far.
    pub fn console(&self) -> &str {
        &self.console
    }

    /// Take the console text, leaving the console empty.
    pub fn take_console(&mut self) -> String {
        std::mem::take(&mut self.console)
    }

    /// Read the definition mirror, falling back to an empty object when
    /// the mirror is vacant or does not parse.
    fn mirror(&self) -> Map<String, Json> {
        let text = match self.heap.get(DEFINE) {
            Some(value) => value.evaluate(self),
            None => return Map::new(),
        };
        match serde_json::from_str::<Json>(&text) {
            Ok(Json::Object(object)) => object,
            _ => Map::new(),
        }
    }

    fn store_mirror(&mut self, mirror: Map<String, Json>) {
        let text = Json::Object(mirror).to_string();
        self.heap.insert(DEFINE.to_string(), Value::text(text));
    }

    fn top(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("memory always holds the base frame")
    }
}

#[cfg(test)]
mod tests {
    use super::{Memory, DEFINE};
    use crate::value::Value;

    #[test]
    fn test_push_pop_peek() {
        let mut memory = Memory::new();
        memory.push(Value::text("one"));
        memory.push(Value::text("two"));

        assert_eq!(memory.peek().evaluate(&Memory::new()), "two");
        assert_eq!(memory.pop().evaluate(&Memory::new()), "two");
        assert_eq!(memory.pop().evaluate(&Memory::new()), "one");
        // Popping an empty frame yields empty text, not a panic.
        assert_eq!(memory.pop().evaluate(&Memory::new()), "");
    }

    #[test]
    fn test_frames_scope_the_stack() {
        let mut memory = Memory::new();
        memory.push(Value::text("below"));
        memory.push_frame();
        memory.push(Value::text("inside"));
        memory.pop_frame();

        assert_eq!(memory.pop().evaluate(&Memory::new()), "below");
    }

    #[test]
    fn test_base_frame_survives_pop() {
        let mut memory = Memory::new();
        memory.push(Value::text("x"));
        memory.pop_frame();

        assert_eq!(memory.pop().evaluate(&Memory::new()), "");
    }

    #[test]
    fn test_join_pop_in_order() {
        let mut memory = Memory::new();
        memory.push_frame();
        memory.push(Value::text("a"));
        memory.push(Value::number(7.0));
        memory.push(Value::text("c"));

        let joined = memory.join_pop();
        memory.pop_frame();
        assert_eq!(joined.evaluate(&memory), "a7c");
    }

    #[test]
    fn test_heap() {
        let mut memory = Memory::new();
        memory.set("x", Value::text("one"));

        assert_eq!(memory.get("x").unwrap().evaluate(&Memory::new()), "one");
        memory.free("x");
        assert!(memory.get("x").is_none());
    }

    #[test]
    fn test_compute_from_vacant() {
        let mut memory = Memory::new();
        memory.compute("n", |m, current| {
            let text = current.evaluate(m);
            Value::text(format!("{text}!"))
        });

        assert_eq!(memory.get("n").unwrap().evaluate(&Memory::new()), "!");
    }

    #[test]
    fn test_define_mirrors() {
        let mut memory = Memory::new();
        memory.define("X", Value::text("5"));

        assert!(memory.defined("X"));
        assert_eq!(memory.get("X").unwrap().evaluate(&Memory::new()), "5");
        let mirror = memory.get(DEFINE).unwrap().evaluate(&memory);
        assert_eq!(mirror, r#"{"X":"5"}"#);
    }

    #[test]
    fn test_undefine_clears_both() {
        let mut memory = Memory::new();
        memory.define("X", Value::text("5"));
        memory.undefine("X");

        assert!(!memory.defined("X"));
        assert!(memory.get("X").is_none());
    }

    #[test]
    fn test_conceal_keeps_heap_value() {
        let mut memory = Memory::new();
        memory.define("X", Value::text("5"));
        memory.conceal("X");

        assert!(!memory.defined("X"));
        assert_eq!(memory.get("X").unwrap().evaluate(&Memory::new()), "5");
    }

    #[test]
    fn test_console() {
        let mut memory = Memory::new();
        memory.print("hello ");
        memory.print("there");

        assert_eq!(memory.console(), "hello there");
        assert_eq!(memory.take_console(), "hello there");
        assert_eq!(memory.console(), "");
    }
}
