//! Dynamic method tables: the tracer's target-type descriptor
//!
//! Rust has no open classes, so a traceable target is modeled as an explicit
//! method table over a receiver type `R`: a registry mapping operation name
//! to a callable body with a visibility level. Call sites dispatch through
//! the table, which is what lets the interceptor swap a timing wrapper in
//! for an existing entry without touching the receiver's own code.
//!
//! Dispatch comes in two flavors:
//!
//! - [`MethodTable::invoke`] is the external entry point and enforces
//!   visibility: protected and private entries are rejected.
//! - [`MethodTable::invoke_any`] is receiver-internal dispatch (the implicit
//!   `self` call of dynamic languages) and reaches any visibility. Method
//!   bodies use it to call siblings on the same table.
//!
//! Bodies receive the table itself, the receiver, and a dynamic argument
//! pack (positional values, named values, optional trailing block), and
//! return a [`Value`] or a [`MethodError`].

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Accessibility level of a method entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        };
        f.write_str(label)
    }
}

/// Dynamic value passed to and returned from table methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// String payload, if this value is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if this value is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
        }
    }
}

/// Trailing block argument: a callable forwarded to the method body
pub type BlockFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Dynamic call surface: positional arguments, named arguments, and an
/// optional trailing block
///
/// The timing wrapper forwards the whole pack to the original body
/// unmodified.
#[derive(Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: FnvHashMap<String, Value>,
    pub block: Option<BlockFn>,
}

impl Args {
    /// Empty argument pack
    pub fn new() -> Self {
        Self::default()
    }

    /// Pack with only positional arguments
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add a named argument
    pub fn with_named(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    /// Attach a trailing block
    pub fn with_block(mut self, block: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.block = Some(Arc::new(block));
        self
    }

    /// Positional argument at `index`
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Named argument by name
    pub fn named_arg(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Invoke the trailing block, if one was passed
    pub fn yield_block(&self, value: Value) -> Option<Value> {
        self.block.as_ref().map(|block| block(value))
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("positional", &self.positional)
            .field("named", &self.named)
            .field("block", &self.block.as_ref().map(|_| "<block>"))
            .finish()
    }
}

/// Errors raised by dynamic dispatch or by method bodies
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MethodError {
    /// No entry under this name at any visibility
    #[error("undefined method `{operation}` for {type_label}")]
    NoMethod {
        type_label: String,
        operation: String,
    },

    /// Entry exists but is not reachable from an external call site
    #[error("{visibility} method `{operation}` called for {type_label}")]
    VisibilityViolation {
        type_label: String,
        operation: String,
        visibility: Visibility,
    },

    /// Failure raised by a method body
    #[error("{class}: {message}")]
    Raised { class: String, message: String },
}

impl MethodError {
    /// Raise a failure with an explicit error class, e.g.
    /// `MethodError::raise("RuntimeError", "Intentional failure")`
    pub fn raise(class: impl Into<String>, message: impl Into<String>) -> Self {
        MethodError::Raised {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Error class name for recording purposes
    pub fn class_name(&self) -> &str {
        match self {
            MethodError::NoMethod { .. } | MethodError::VisibilityViolation { .. } => {
                "NoMethodError"
            }
            MethodError::Raised { class, .. } => class,
        }
    }

    /// Failure message without the class prefix
    pub fn message(&self) -> String {
        match self {
            MethodError::Raised { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Callable body of a method entry
pub type MethodBody<R> =
    Arc<dyn Fn(&MethodTable<R>, &mut R, Args) -> Result<Value, MethodError> + Send + Sync>;

struct MethodEntry<R> {
    visibility: Visibility,
    body: MethodBody<R>,
}

/// Named operations over a receiver type `R`, each with a visibility level
///
/// Every table has a process-unique id; the interceptor keys its
/// already-wrapped set on (table id, operation name).
pub struct MethodTable<R> {
    id: u64,
    type_label: String,
    methods: FnvHashMap<String, MethodEntry<R>>,
}

impl<R: 'static> MethodTable<R> {
    /// Create an empty table labeled with the target type name
    pub fn new(type_label: impl Into<String>) -> Self {
        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            type_label: type_label.into(),
            methods: FnvHashMap::default(),
        }
    }

    /// Process-unique identity of this table
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Target type name used in qualified operation names
    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    /// Define (or redefine) a method under `name`
    pub fn define_method<F>(&mut self, name: impl Into<String>, visibility: Visibility, body: F)
    where
        F: Fn(&MethodTable<R>, &mut R, Args) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.methods.insert(
            name.into(),
            MethodEntry {
                visibility,
                body: Arc::new(body),
            },
        );
    }

    /// Accessibility of `name`, or `None` when the method does not exist
    pub fn visibility_of(&self, name: &str) -> Option<Visibility> {
        self.methods.get(name).map(|entry| entry.visibility)
    }

    /// Retain an existing method's body under `alias`, as a private entry
    ///
    /// Returns false (and inserts nothing) when `existing` is not defined.
    pub fn alias_method(&mut self, alias: impl Into<String>, existing: &str) -> bool {
        let Some(body) = self.body_of(existing) else {
            return false;
        };
        self.methods.insert(
            alias.into(),
            MethodEntry {
                visibility: Visibility::Private,
                body,
            },
        );
        true
    }

    /// External dispatch; rejects protected and private entries
    pub fn invoke(&self, receiver: &mut R, name: &str, args: Args) -> Result<Value, MethodError> {
        match self.methods.get(name) {
            None => Err(MethodError::NoMethod {
                type_label: self.type_label.clone(),
                operation: name.to_string(),
            }),
            Some(entry) if entry.visibility != Visibility::Public => {
                Err(MethodError::VisibilityViolation {
                    type_label: self.type_label.clone(),
                    operation: name.to_string(),
                    visibility: entry.visibility,
                })
            }
            Some(entry) => (entry.body)(self, receiver, args),
        }
    }

    /// Receiver-internal dispatch; reaches any visibility
    pub fn invoke_any(
        &self,
        receiver: &mut R,
        name: &str,
        args: Args,
    ) -> Result<Value, MethodError> {
        match self.methods.get(name) {
            None => Err(MethodError::NoMethod {
                type_label: self.type_label.clone(),
                operation: name.to_string(),
            }),
            Some(entry) => (entry.body)(self, receiver, args),
        }
    }

    /// Clone of the body stored under `name`
    pub(crate) fn body_of(&self, name: &str) -> Option<MethodBody<R>> {
        self.methods.get(name).map(|entry| Arc::clone(&entry.body))
    }

    /// Swap the body under `name`, keeping its visibility
    ///
    /// Returns false when no such entry exists.
    pub(crate) fn replace_body(&mut self, name: &str, body: MethodBody<R>) -> bool {
        match self.methods.get_mut(name) {
            Some(entry) => {
                entry.body = body;
                true
            }
            None => false,
        }
    }
}

impl<R> fmt::Debug for MethodTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("MethodTable")
            .field("id", &self.id)
            .field("type_label", &self.type_label)
            .field("methods", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        total: i64,
    }

    fn counter_table() -> MethodTable<Counter> {
        let mut table = MethodTable::new("Counter");
        table.define_method("add", Visibility::Public, |_, counter: &mut Counter, args| {
            let amount = args.arg(0).and_then(Value::as_int).unwrap_or(1);
            counter.total += amount;
            Ok(Value::Int(counter.total))
        });
        table.define_method("reset", Visibility::Private, |_, counter: &mut Counter, _| {
            counter.total = 0;
            Ok(Value::Nil)
        });
        table
    }

    #[test]
    fn test_invoke_public_method() {
        let table = counter_table();
        let mut counter = Counter::default();
        let result = table.invoke(&mut counter, "add", Args::positional([Value::Int(5)]));
        assert_eq!(result, Ok(Value::Int(5)));
        assert_eq!(counter.total, 5);
    }

    #[test]
    fn test_invoke_missing_method_is_no_method() {
        let table = counter_table();
        let mut counter = Counter::default();
        let err = table.invoke(&mut counter, "missing", Args::new()).unwrap_err();
        assert_eq!(
            err,
            MethodError::NoMethod {
                type_label: "Counter".to_string(),
                operation: "missing".to_string(),
            }
        );
        assert_eq!(err.class_name(), "NoMethodError");
    }

    #[test]
    fn test_invoke_private_method_is_rejected_externally() {
        let table = counter_table();
        let mut counter = Counter { total: 9 };
        let err = table.invoke(&mut counter, "reset", Args::new()).unwrap_err();
        assert!(matches!(err, MethodError::VisibilityViolation { .. }));
        assert_eq!(counter.total, 9);
    }

    #[test]
    fn test_invoke_any_reaches_private_method() {
        let table = counter_table();
        let mut counter = Counter { total: 9 };
        let result = table.invoke_any(&mut counter, "reset", Args::new());
        assert_eq!(result, Ok(Value::Nil));
        assert_eq!(counter.total, 0);
    }

    #[test]
    fn test_body_can_dispatch_to_sibling() {
        let mut table = counter_table();
        table.define_method(
            "add_twice",
            Visibility::Public,
            |table, counter: &mut Counter, args| {
                table.invoke_any(counter, "add", args.clone())?;
                table.invoke_any(counter, "add", args)
            },
        );
        let mut counter = Counter::default();
        let result = table.invoke(&mut counter, "add_twice", Args::positional([Value::Int(3)]));
        assert_eq!(result, Ok(Value::Int(6)));
    }

    #[test]
    fn test_named_args_and_block_forwarding() {
        let mut table: MethodTable<()> = MethodTable::new("Formatter");
        table.define_method("shout", Visibility::Public, |_, _, args| {
            let text = args
                .named_arg("text")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_uppercase();
            let decorated = args
                .yield_block(Value::Str(text.clone()))
                .unwrap_or(Value::Str(text));
            Ok(decorated)
        });

        let args = Args::new()
            .with_named("text", Value::from("quiet"))
            .with_block(|value| Value::Str(format!("{value}!")));
        let result = table.invoke(&mut (), "shout", args);
        assert_eq!(result, Ok(Value::Str("QUIET!".to_string())));
    }

    #[test]
    fn test_alias_method_is_private_and_shares_body() {
        let mut table = counter_table();
        assert!(table.alias_method("__original_add", "add"));
        assert_eq!(
            table.visibility_of("__original_add"),
            Some(Visibility::Private)
        );
        let mut counter = Counter::default();
        let result = table.invoke_any(&mut counter, "__original_add", Args::new());
        assert_eq!(result, Ok(Value::Int(1)));
    }

    #[test]
    fn test_alias_method_missing_source() {
        let mut table = counter_table();
        assert!(!table.alias_method("__ghost", "missing"));
        assert_eq!(table.visibility_of("__ghost"), None);
    }

    #[test]
    fn test_raise_carries_class_and_message() {
        let err = MethodError::raise("RuntimeError", "Intentional failure");
        assert_eq!(err.class_name(), "RuntimeError");
        assert_eq!(err.message(), "Intentional failure");
        assert_eq!(err.to_string(), "RuntimeError: Intentional failure");
    }

    #[test]
    fn test_table_ids_are_unique() {
        let a: MethodTable<()> = MethodTable::new("A");
        let b: MethodTable<()> = MethodTable::new("A");
        assert_ne!(a.id(), b.id());
    }
}
