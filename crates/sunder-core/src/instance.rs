use crate::class::{ClassDef, ParamKind};
use crate::error::RuntimeError;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// An instance of a runtime class. Fields are bound once at construction
/// and never mutated; accessors are expected to be pure reads over them.
#[derive(Debug, Clone)]
pub struct Instance {
    class: Arc<ClassDef>,
    fields: IndexMap<String, Value>,
}

impl Instance {
    /// Construct an instance by binding `args` to the class's constructor
    /// parameters in declaration order.
    ///
    /// A trailing dict argument supplies keyword parameters when the
    /// constructor declares any.
    pub fn new(class: Arc<ClassDef>, mut args: Vec<Value>) -> Result<Self, RuntimeError> {
        let wants_kwargs = class
            .params()
            .iter()
            .any(|p| matches!(p.kind, ParamKind::Keyword | ParamKind::KeywordRest));
        let mut kwargs: IndexMap<String, Value> = IndexMap::new();
        if wants_kwargs && matches!(args.last(), Some(Value::Dict(_))) {
            if let Some(Value::Dict(map)) = args.pop() {
                kwargs = map;
            }
        }

        let mut queue: VecDeque<Value> = VecDeque::from(args);
        let mut fields = IndexMap::new();
        for param in class.params() {
            let value = match param.kind {
                ParamKind::Required => queue.pop_front().ok_or_else(|| {
                    RuntimeError::ArgumentError(format!(
                        "Missing required argument `{}` for {}",
                        param.name,
                        class.name()
                    ))
                })?,
                ParamKind::Optional => queue.pop_front().unwrap_or(Value::Null),
                ParamKind::Rest => Value::List(queue.drain(..).collect()),
                ParamKind::Keyword => kwargs.shift_remove(&param.name).unwrap_or(Value::Null),
                ParamKind::KeywordRest => Value::Dict(std::mem::take(&mut kwargs)),
            };
            fields.insert(param.name.clone(), value);
        }

        if !queue.is_empty() {
            return Err(RuntimeError::ArgumentError(format!(
                "Too many arguments for {}: {} unused",
                class.name(),
                queue.len()
            )));
        }

        Ok(Instance { class, fields })
    }

    /// Construct directly from already-bound fields.
    pub fn with_fields(class: Arc<ClassDef>, fields: IndexMap<String, Value>) -> Self {
        Instance { class, fields }
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// Invoke a method by name, resolving through the class (own methods
    /// first, then installed layers).
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        match self.class.resolve(name) {
            Some(method) => method.invoke(self, args),
            None => Err(RuntimeError::UnknownMember {
                class: self.class.name().to_string(),
                member: name.to_string(),
            }),
        }
    }
}
