use crate::{
    environment::Environment,
    log::Error,
    memory::Memory,
    reference::Reference,
    value::{cast_array, cast_object, format_number, import_json, parse_number, Pipe, Value},
};
use serde::{Deserialize, Serialize};

/// Where an instruction came from, for diagnostics.
///
/// This is the serializable stand-in for the original tree back-link:
/// enough to name the offending spot without keeping the tree alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// The name of the document the instruction was compiled from.
    pub document: String,
    /// The interval the instruction was compiled from.
    pub reference: Reference,
    /// The kind of the tree the instruction was compiled from.
    pub kind: String,
}

/// One opcode of the stack machine.
///
/// Instructions form a tree: [`Block`][Op::Block] holds ordered children
/// and the control flow opcodes hold their branches inline; everything
/// else is a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Do nothing.
    Idle,
    /// Push a constant text value.
    PushConst { text: String },
    /// Discard the top of the stack.
    Pop,
    /// Duplicate the top of the stack.
    Dup,
    /// Open a new frame.
    PushFrame,
    /// Close the top frame, discarding its contents.
    DumpFrame,
    /// Close the top frame and push the concatenation of its values.
    JoinFrame,
    /// Close the top frame and push its contents as a single tagged
    /// value: one value passes through, a frame of pairs becomes an
    /// object, anything else becomes an array.
    GlueFrame,
    /// Push the value at a heap address.
    ///
    /// Without a static address, the address is popped from the stack.
    /// A vacant address evaluates to the address text itself.
    Access { address: Option<String> },
    /// Store a constant text value at a heap address, without touching
    /// the definition mirror.
    Alloc { address: String, text: String },
    /// Execute the instruction in a fresh frame, join its output, store
    /// the result at the address and record it in the definition mirror.
    Define {
        address: String,
        instruction: Box<Instruction>,
    },
    /// Remove an address from the heap and the definition mirror.
    Free { address: String },
    /// Remove an address from the definition mirror only.
    Conceal { address: String },
    /// Push `"1"` when the address is in the definition mirror, `"0"`
    /// otherwise.
    IsDefined { address: String },
    /// Push `"0"` when the address is in the definition mirror, `"1"`
    /// otherwise.
    IsUndefined { address: String },
    /// Pop right then left; add numerically when both parse as numbers,
    /// concatenate otherwise.
    Sum,
    /// Pop right then left and subtract; both must be numbers.
    Difference,
    /// Pop right then left and multiply; both must be numbers.
    Product,
    /// Pop right then left and divide; both must be numbers.
    Quotient,
    /// Pop right then left and take the remainder; both must be numbers.
    Remainder,
    /// Pop a value and push `"1"` when it is truthy, `"0"` otherwise.
    Truthy,
    /// Pop a value and push `"0"` when it is truthy, `"1"` otherwise.
    Negate,
    /// Pop a value then a key and push the pair `key:value`.
    BuildPair,
    /// Pop a value and push its array view.
    CastArray,
    /// Pop a value and push its object view.
    CastObject,
    /// Pop a value, a key path (an array) and a structure, and push the
    /// structure with the value written at the path.
    Touch,
    /// Execute the condition, pop its value and pick a branch by the
    /// falsy test (`""`, `"0"`, `"false"`).
    Branch {
        condition: Box<Instruction>,
        then: Box<Instruction>,
        otherwise: Option<Box<Instruction>>,
    },
    /// Execute the children in order.
    Block { children: Vec<Instruction> },
    /// Evaluate the iterable to an array, then for each element define
    /// the address to it and execute the body.
    Repeat {
        address: String,
        iterable: Box<Instruction>,
        body: Box<Instruction>,
    },
    /// Evaluate the name, locate that compilation in the environment and
    /// execute it.
    Import { name: Box<Instruction> },
    /// Pop a value and print its text to the console.
    Print,
    /// Print a constant character range to the console.
    PrintText { text: String },
    /// Execute the instruction in a fresh frame, join its output and
    /// print it.
    PrintEval { instruction: Box<Instruction> },
}

/// An executable node of the instruction tree: an opcode plus an optional
/// source trace for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    op: Op,
    #[serde(skip)]
    trace: Option<Trace>,
}

impl Instruction {
    /// Create a new Instruction with no trace.
    pub fn new(op: Op) -> Self {
        Self { op, trace: None }
    }

    /// Create a new Instruction carrying the given trace.
    pub fn traced(op: Op, trace: Trace) -> Self {
        Self {
            op,
            trace: Some(trace),
        }
    }

    /// Return the opcode of the Instruction.
    #[inline]
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Return the trace of the Instruction, if it carries one.
    #[inline]
    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Box the Instruction.
    #[inline]
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Execute the Instruction against the given memory.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind execution when an operand has the
    /// wrong shape for the opcode, carrying the source trace when one is
    /// available. An error aborts the containing block and propagates.
    pub fn exec(&self, environment: &Environment, memory: &mut Memory) -> Result<(), Error> {
        match &self.op {
            Op::Idle => Ok(()),
            Op::PushConst { text } => {
                memory.push(Value::text(text.clone()));
                Ok(())
            }
            Op::Pop => {
                memory.pop();
                Ok(())
            }
            Op::Dup => {
                let value = memory.peek();
                memory.push(value);
                Ok(())
            }
            Op::PushFrame => {
                memory.push_frame();
                Ok(())
            }
            Op::DumpFrame => {
                memory.pop_frame();
                Ok(())
            }
            Op::JoinFrame => {
                let joined = memory.join_pop();
                memory.pop_frame();
                memory.push(joined);
                Ok(())
            }
            Op::GlueFrame => {
                let values = memory.drain_top();
                memory.pop_frame();
                memory.push(glue(values));
                Ok(())
            }
            Op::Access { address } => {
                let name = match address {
                    Some(address) => Value::text(address.clone()),
                    None => memory.pop(),
                };
                memory.push(Value::Text(Pipe::new(move |m, _| {
                    let address = name.evaluate(m);
                    match m.get(&address) {
                        Some(value) => value.evaluate(m),
                        None => address,
                    }
                })));
                Ok(())
            }
            Op::Alloc { address, text } => {
                memory.set(address.clone(), Value::text(text.clone()));
                Ok(())
            }
            Op::Define {
                address,
                instruction,
            } => {
                memory.push_frame();
                instruction.exec(environment, memory)?;
                let joined = memory.join_pop();
                memory.pop_frame();
                // The stored value is the snapshot text, not the lazy
                // join, so later redefinitions cannot rewrite history.
                let text = joined.evaluate(memory);
                memory.define(address.clone(), Value::text(text));
                Ok(())
            }
            Op::Free { address } => {
                memory.undefine(address);
                Ok(())
            }
            Op::Conceal { address } => {
                memory.conceal(address);
                Ok(())
            }
            Op::IsDefined { address } => {
                memory.push(Value::text(if memory.defined(address) { "1" } else { "0" }));
                Ok(())
            }
            Op::IsUndefined { address } => {
                memory.push(Value::text(if memory.defined(address) { "0" } else { "1" }));
                Ok(())
            }
            Op::Sum => {
                let right = memory.pop();
                let left = memory.pop();
                memory.push(Value::Text(Pipe::new(move |m, _| {
                    let left = left.evaluate(m);
                    let right = right.evaluate(m);
                    match (parse_number(&left), parse_number(&right)) {
                        (Some(left), Some(right)) => format_number(left + right),
                        _ => format!("{left}{right}"),
                    }
                })));
                Ok(())
            }
            Op::Difference => self.arithmetic(memory, "DIFFERENCE (-)", |left, right| left - right),
            Op::Product => self.arithmetic(memory, "PRODUCT (*)", |left, right| left * right),
            Op::Quotient => self.arithmetic(memory, "QUOTIENT (/)", |left, right| left / right),
            Op::Remainder => self.arithmetic(memory, "REMAINDER (%)", |left, right| left % right),
            Op::Truthy => {
                let value = memory.pop();
                memory.push(Value::Text(Pipe::new(move |m, _| {
                    let text = value.evaluate(m);
                    if falsy(&text) { "0" } else { "1" }.to_string()
                })));
                Ok(())
            }
            Op::Negate => {
                let value = memory.pop();
                memory.push(Value::Text(Pipe::new(move |m, _| {
                    let text = value.evaluate(m);
                    if falsy(&text) { "1" } else { "0" }.to_string()
                })));
                Ok(())
            }
            Op::BuildPair => {
                let value = memory.pop();
                let key = memory.pop();
                memory.push(Value::pair(key, value));
                Ok(())
            }
            Op::CastArray => {
                let value = memory.pop();
                memory.push(Value::Array(cast_array(&value)));
                Ok(())
            }
            Op::CastObject => {
                let value = memory.pop();
                memory.push(Value::Object(cast_object(&value)));
                Ok(())
            }
            Op::Touch => {
                let value = memory.pop();
                let path = memory.pop();
                let target = memory.pop();

                let keys = match &path {
                    Value::Array(pipe) => pipe.eval(memory),
                    other => {
                        return Err(self.error(format!(
                            "TOUCH expected an array key but got: {}",
                            other.evaluate(memory)
                        )))
                    }
                };
                let touched = touch(memory, target, &keys, value);
                memory.push(touched);
                Ok(())
            }
            Op::Branch {
                condition,
                then,
                otherwise,
            } => {
                condition.exec(environment, memory)?;
                let value = memory.pop();
                let text = value.evaluate(memory);
                if falsy(&text) {
                    match otherwise {
                        Some(otherwise) => otherwise.exec(environment, memory),
                        None => Ok(()),
                    }
                } else {
                    then.exec(environment, memory)
                }
            }
            Op::Block { children } => {
                for child in children {
                    child.exec(environment, memory)?;
                }
                Ok(())
            }
            Op::Repeat {
                address,
                iterable,
                body,
            } => {
                memory.push_frame();
                iterable.exec(environment, memory)?;
                let values = memory.drain_top();
                memory.pop_frame();

                let value = glue(values);
                let elements = match &value {
                    Value::Array(pipe) => pipe.eval(memory),
                    other => {
                        let text = other.evaluate(memory);
                        match serde_json::from_str::<serde_json::Value>(&text) {
                            Ok(serde_json::Value::Array(elements)) => {
                                elements.into_iter().map(import_json).collect()
                            }
                            _ => {
                                return Err(self.error(format!(
                                    "REPEAT expected an array but got: {text}"
                                )))
                            }
                        }
                    }
                };

                for element in elements {
                    memory.define(address.clone(), element);
                    body.exec(environment, memory)?;
                }
                Ok(())
            }
            Op::Import { name } => {
                memory.push_frame();
                name.exec(environment, memory)?;
                let joined = memory.join_pop();
                memory.pop_frame();
                let target = joined.evaluate(memory);

                let instruction = environment.instruction(&target).ok_or_else(|| {
                    self.error(format!("no compilation with the name: {target}"))
                })?;
                instruction.exec(environment, memory)
            }
            Op::Print => {
                let value = memory.pop();
                let text = value.evaluate(memory);
                memory.print(&text);
                Ok(())
            }
            Op::PrintText { text } => {
                memory.print(text);
                Ok(())
            }
            Op::PrintEval { instruction } => {
                memory.push_frame();
                instruction.exec(environment, memory)?;
                let joined = memory.join_pop();
                memory.pop_frame();
                let text = joined.evaluate(memory);
                memory.print(&text);
                Ok(())
            }
        }
    }

    /// Pop right then left, require both to be numbers, and push the
    /// combined number.
    fn arithmetic(
        &self,
        memory: &mut Memory,
        name: &str,
        combine: fn(f64, f64) -> f64,
    ) -> Result<(), Error> {
        let right = memory.pop();
        let left = memory.pop();
        let left_text = left.evaluate(memory);
        let right_text = right.evaluate(memory);

        match (parse_number(&left_text), parse_number(&right_text)) {
            (Some(left), Some(right)) => {
                memory.push(Value::number(combine(left, right)));
                Ok(())
            }
            _ => Err(self.error(format!(
                "{name} expected two numbers but got: {left_text} and {right_text}"
            ))),
        }
    }

    /// Build an execution error carrying this instruction's trace.
    fn error<T>(&self, reason: T) -> Error
    where
        T: Into<String>,
    {
        let mut error = Error::execution(reason);
        if let Some(trace) = &self.trace {
            error = error.document(trace.document.clone()).help(format!(
                "raised by the `{}` tree at {}",
                trace.kind, trace.reference
            ));
        }
        error
    }
}

/// Collapse a drained frame into a single tagged value.
fn glue(mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::text(""),
        1 => values.pop().expect("length was checked"),
        _ if values.iter().all(|value| matches!(value, Value::Pair(_))) => {
            Value::Object(Pipe::new(move |memory, _| {
                values
                    .iter()
                    .map(|value| match value {
                        Value::Pair(pair) => pair.eval(memory),
                        _ => unreachable!("frame was checked to hold pairs"),
                    })
                    .collect()
            }))
        }
        _ => Value::array(values),
    }
}

/// The falsy test used by branching and logic: empty text, `"0"` and
/// `"false"`.
fn falsy(text: &str) -> bool {
    text.is_empty() || text == "0" || text == "false"
}

/// Write a value at a key path within a structure, creating intermediate
/// structures as needed.
///
/// A numeric key writes into an array view unless the target is already
/// an object; any other key writes into an object view.
fn touch(memory: &Memory, target: Value, keys: &[Value], value: Value) -> Value {
    let Some((key, rest)) = keys.split_first() else {
        return value;
    };

    let key_text = key.evaluate(memory);
    let index = parse_number(&key_text).map(|n| n.max(0.0) as usize);

    match index {
        Some(index) if !matches!(target, Value::Object(_) | Value::Pair(_)) => {
            let mut elements = cast_array(&target).eval(memory);
            while elements.len() <= index {
                elements.push(Value::text(""));
            }
            let previous = elements[index].clone();
            elements[index] = touch(memory, previous, rest, value);
            Value::array(elements)
        }
        _ => {
            let mut entries = cast_object(&target).eval(memory);
            match entries
                .iter_mut()
                .find(|(held, _)| held.evaluate(memory) == key_text)
            {
                Some(entry) => {
                    let previous = entry.1.clone();
                    entry.1 = touch(memory, previous, rest, value);
                }
                None => {
                    let fresh = touch(memory, Value::text(""), rest, value);
                    entries.push((Value::text(key_text), fresh));
                }
            }
            Value::object(entries)
        }
    }
}
