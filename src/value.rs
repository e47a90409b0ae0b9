use crate::memory::Memory;
use std::rc::Rc;

/// A lazy transformation from a previous payload to a new payload, given
/// read access to [`Memory`].
///
/// Pipes are the composition primitive of the value model: applying a new
/// pipe to a value produces a derived value whose pipe is the function
/// composition of the two.
pub struct Pipe<T> {
    f: Rc<dyn Fn(&Memory, T) -> T>,
}

impl<T> Clone for Pipe<T> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<T: 'static> Pipe<T> {
    /// Create a new Pipe from the given function.
    pub fn new(f: impl Fn(&Memory, T) -> T + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Create a Pipe that ignores its input and produces the given
    /// payload.
    pub fn supply(payload: T) -> Self
    where
        T: Clone,
    {
        Self::new(move |_, _| payload.clone())
    }

    /// Evaluate the Pipe against the given memory, feeding it the default
    /// payload.
    pub fn eval(&self, memory: &Memory) -> T
    where
        T: Default,
    {
        (self.f)(memory, T::default())
    }

    /// Compose this Pipe with another, producing a Pipe that runs this one
    /// first and feeds its output to the other.
    pub fn then(self, next: Pipe<T>) -> Self {
        Self::new(move |memory, payload| (next.f)(memory, (self.f)(memory, payload)))
    }
}

/// A lazy tagged value.
///
/// Every value evaluates to text; the tag records what shape the payload
/// has before stringification, which is what lets collections survive the
/// stack untouched until something needs their elements.
#[derive(Clone)]
pub enum Value {
    /// Plain text.
    Text(Pipe<String>),
    /// A number, stringified as an integer whenever it is integral.
    Number(Pipe<f64>),
    /// An ordered sequence of values.
    Array(Pipe<Vec<Value>>),
    /// An insertion-ordered sequence of key/value entries.
    Object(Pipe<Vec<(Value, Value)>>),
    /// A single key/value entry.
    Pair(Pipe<(Value, Value)>),
    /// A value that evaluates to the JSON fragment of its inner value.
    Quote(Pipe<Box<Value>>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(Pipe::new(|_, text| text))
    }
}

impl Value {
    /// Create a constant text value.
    pub fn text<T>(text: T) -> Self
    where
        T: Into<String>,
    {
        let text = text.into();
        Value::Text(Pipe::supply(text))
    }

    /// Create a constant number value.
    pub fn number(number: f64) -> Self {
        Value::Number(Pipe::supply(number))
    }

    /// Create a constant array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Pipe::supply(elements))
    }

    /// Create a constant object value.
    pub fn object(entries: Vec<(Value, Value)>) -> Self {
        Value::Object(Pipe::supply(entries))
    }

    /// Create a constant pair value.
    pub fn pair(key: Value, value: Value) -> Self {
        Value::Pair(Pipe::supply((key, value)))
    }

    /// Create a value that evaluates to the JSON fragment of the given
    /// value.
    pub fn quote(value: Value) -> Self {
        Value::Quote(Pipe::supply(Box::new(value)))
    }

    /// Derive a new value by composing the textual view of this value with
    /// the given pipe.
    pub fn apply(self, pipe: Pipe<String>) -> Self {
        match self {
            Value::Text(inner) => Value::Text(inner.then(pipe)),
            other => Value::Text(Pipe::new(move |memory, _| {
                (pipe.f)(memory, other.evaluate(memory))
            })),
        }
    }

    /// Evaluate the value to text against the given memory.
    pub fn evaluate(&self, memory: &Memory) -> String {
        match self {
            Value::Text(pipe) => pipe.eval(memory),
            Value::Number(pipe) => format_number(pipe.eval(memory)),
            Value::Array(pipe) => {
                let elements = pipe.eval(memory);
                let body: Vec<_> = elements
                    .iter()
                    .map(|element| element.fragment(memory))
                    .collect();
                format!("[{}]", body.join(","))
            }
            Value::Object(pipe) => {
                let entries = pipe.eval(memory);
                let body: Vec<_> = entries
                    .iter()
                    .map(|(key, value)| {
                        format!("{}:{}", quote_text(&key.evaluate(memory)), value.fragment(memory))
                    })
                    .collect();
                format!("{{{}}}", body.join(","))
            }
            Value::Pair(pipe) => {
                let (key, value) = pipe.eval(memory);
                format!("{}:{}", quote_text(&key.evaluate(memory)), value.fragment(memory))
            }
            Value::Quote(pipe) => pipe.eval(memory).fragment(memory),
        }
    }

    /// Evaluate the value as a fragment of a JSON structure: collections
    /// keep their own brackets, everything else stringifies and is quoted.
    fn fragment(&self, memory: &Memory) -> String {
        match self {
            Value::Array(_) | Value::Object(_) => self.evaluate(memory),
            other => quote_text(&other.evaluate(memory)),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Value::Text(_) => "Text",
            Value::Number(_) => "Number",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Pair(_) => "Pair",
            Value::Quote(_) => "Quote",
        };
        write!(f, "Value::{tag}")
    }
}

/// Largest magnitude at which every integer is exactly representable.
const EXACT_INTEGER_BOUND: f64 = 9_007_199_254_740_992.0;

/// Stringify a number: integral values within the exactly-representable
/// range print without a fraction, everything else prints as the minimal
/// decimal.
pub fn format_number(number: f64) -> String {
    if number == number.trunc() && number.abs() < EXACT_INTEGER_BOUND {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}

/// Parse text as a number the way the arithmetic instructions do.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Derive an array view of the given value.
///
/// Arrays pass through; any other value evaluates to text, which is read
/// as a JSON array when possible and becomes a singleton otherwise.
pub fn cast_array(value: &Value) -> Pipe<Vec<Value>> {
    match value {
        Value::Array(pipe) => pipe.clone(),
        other => {
            let other = other.clone();
            Pipe::new(move |memory, _| {
                let text = other.evaluate(memory);
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(serde_json::Value::Array(elements)) => {
                        elements.into_iter().map(import_json).collect()
                    }
                    _ => vec![other.clone()],
                }
            })
        }
    }
}

/// Derive an object view of the given value.
///
/// Objects pass through, pairs become singleton objects, arrays contribute
/// their pair elements, and any other value evaluates to text which is
/// read as a JSON object when possible and becomes empty otherwise.
pub fn cast_object(value: &Value) -> Pipe<Vec<(Value, Value)>> {
    match value {
        Value::Object(pipe) => pipe.clone(),
        Value::Pair(pipe) => {
            let pipe = pipe.clone();
            Pipe::new(move |memory, _| vec![pipe.eval(memory)])
        }
        Value::Array(pipe) => {
            let pipe = pipe.clone();
            Pipe::new(move |memory, _| {
                pipe.eval(memory)
                    .into_iter()
                    .map(|element| match element {
                        Value::Pair(pair) => pair.eval(memory),
                        other => (other, Value::text("")),
                    })
                    .collect()
            })
        }
        other => {
            let other = other.clone();
            Pipe::new(move |memory, _| {
                let text = other.evaluate(memory);
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(serde_json::Value::Object(entries)) => entries
                        .into_iter()
                        .map(|(key, value)| (Value::text(key), import_json(value)))
                        .collect(),
                    _ => Vec::new(),
                }
            })
        }
    }
}

/// Convert a parsed JSON value into a [`Value`].
pub fn import_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::text(""),
        serde_json::Value::Bool(b) => Value::text(if b { "true" } else { "false" }),
        serde_json::Value::Number(number) => Value::number(number.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(text) => Value::text(text),
        serde_json::Value::Array(elements) => {
            Value::array(elements.into_iter().map(import_json).collect())
        }
        serde_json::Value::Object(entries) => Value::object(
            entries
                .into_iter()
                .map(|(key, value)| (Value::text(key), import_json(value)))
                .collect(),
        ),
    }
}

/// Quote text as a JSON string.
fn quote_text(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

#[cfg(test)]
mod tests {
    use super::{cast_array, cast_object, format_number, parse_number, Pipe, Value};
    use crate::memory::Memory;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.5), "-0.5");
        // Past the exactly-representable range, integral values keep the
        // plain decimal form instead of pretending to be exact integers.
        assert_eq!(format_number(1e300), format!("{}", 1e300));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("a"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_evaluate_text_and_number() {
        let memory = Memory::new();

        assert_eq!(Value::text("hello").evaluate(&memory), "hello");
        assert_eq!(Value::number(8.0).evaluate(&memory), "8");
    }

    #[test]
    fn test_evaluate_array() {
        let memory = Memory::new();
        let value = Value::array(vec![Value::number(1.0), Value::text("two")]);

        assert_eq!(value.evaluate(&memory), r#"["1","two"]"#);
    }

    #[test]
    fn test_evaluate_object_keeps_order() {
        let memory = Memory::new();
        let value = Value::object(vec![
            (Value::text("b"), Value::number(2.0)),
            (Value::text("a"), Value::number(1.0)),
        ]);

        assert_eq!(value.evaluate(&memory), r#"{"b":"2","a":"1"}"#);
    }

    #[test]
    fn test_evaluate_pair_and_quote() {
        let memory = Memory::new();

        assert_eq!(
            Value::pair(Value::text("a"), Value::number(1.0)).evaluate(&memory),
            r#""a":"1""#
        );
        assert_eq!(Value::quote(Value::text("a")).evaluate(&memory), r#""a""#);
    }

    #[test]
    fn test_apply_composes() {
        let memory = Memory::new();
        let shout = Pipe::new(|_, text: String| text.to_uppercase());
        let bang = Pipe::new(|_, text: String| format!("{text}!"));

        let value = Value::text("hey").apply(shout).apply(bang);
        assert_eq!(value.evaluate(&memory), "HEY!");
    }

    #[test]
    fn test_cast_array_from_json_text() {
        let memory = Memory::new();
        let pipe = cast_array(&Value::text("[1,2,3]"));
        let elements = pipe.eval(&memory);

        let texts: Vec<_> = elements
            .iter()
            .map(|element| element.evaluate(&memory))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_cast_array_singleton_fallback() {
        let memory = Memory::new();
        let pipe = cast_array(&Value::text("loose"));

        assert_eq!(pipe.eval(&memory).len(), 1);
    }

    #[test]
    fn test_cast_object_from_pairs() {
        let memory = Memory::new();
        let array = Value::array(vec![
            Value::pair(Value::text("a"), Value::number(1.0)),
            Value::pair(Value::text("b"), Value::number(2.0)),
        ]);
        let object = Value::Object(cast_object(&array));

        assert_eq!(object.evaluate(&memory), r#"{"a":"1","b":"2"}"#);
    }
}
