use crate::error::RuntimeError;
use crate::instance::Instance;
use crate::value::Value;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

/// Canonical name the constructor is stored and referred to under.
pub const CONSTRUCTOR_NAME: &str = "init";

pub type ClassId = uuid::Uuid;

pub type MethodFn = Arc<dyn Fn(&Instance, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// A named method bound to a class: a closure over the receiving instance.
#[derive(Clone)]
pub struct Method {
    name: String,
    body: MethodFn,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&Instance, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        Method {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, instance: &Instance, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.body)(instance, args)
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Method({})", self.name)
    }
}

/// How a constructor parameter consumes its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    Optional,
    /// Collects the remaining positional arguments into a list.
    Rest,
    Keyword,
    /// Collects the remaining keyword arguments into a dict.
    KeywordRest,
}

/// A formal constructor parameter. The name doubles as the field name the
/// argument is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Required,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Optional,
        }
    }

    pub fn rest(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Rest,
        }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Keyword,
        }
    }

    pub fn keyword_rest(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::KeywordRest,
        }
    }
}

pub type MethodObserver = Arc<dyn Fn(&ClassDef, &str) + Send + Sync>;

struct Layer {
    name: String,
    methods: IndexMap<String, Method>,
}

/// A class defined at runtime: a name, a constructor parameter list, an own
/// method table, and an ordered stack of installed method layers.
///
/// Method resolution checks own methods first, then layers newest-first, so
/// a method the class author defines always shadows anything a layer
/// installed under the same name.
pub struct ClassDef {
    id: ClassId,
    name: String,
    params: Vec<Param>,
    methods: DashMap<String, Method>,
    layers: RwLock<Vec<Layer>>,
    observers: RwLock<Vec<MethodObserver>>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Arc<Self> {
        Arc::new(ClassDef {
            id: uuid::Uuid::now_v7(),
            name: name.into(),
            params,
            methods: DashMap::new(),
            layers: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
        })
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Constructor parameter names flattened in declaration order, every
    /// kind included.
    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Define (or redefine) an own method and notify method observers.
    pub fn define_method(
        &self,
        name: &str,
        body: impl Fn(&Instance, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) {
        trace!("{}: define method `{}`", self.name, name);
        self.methods
            .insert(name.to_string(), Method::new(name, body));
        self.notify_method_defined(name);
    }

    /// Define an accessor returning the same-named constructor field, or
    /// Null when the field is unset.
    pub fn define_reader(&self, field: &str) {
        let key = field.to_string();
        self.define_method(field, move |instance, _args| {
            Ok(instance.field(&key).cloned().unwrap_or(Value::Null))
        });
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn own_method(&self, name: &str) -> Option<Method> {
        self.methods.get(name).map(|m| m.value().clone())
    }

    /// Full method resolution: own methods, then layers newest-first.
    pub fn resolve(&self, name: &str) -> Option<Method> {
        if let Some(method) = self.own_method(name) {
            return Some(method);
        }
        let layers = self.layers.read();
        for layer in layers.iter().rev() {
            if let Some(method) = layer.methods.get(name) {
                return Some(method.clone());
            }
        }
        None
    }

    /// Subscribe to method-definition events. The observer is called with
    /// the class and the defined name, after the method is resolvable.
    pub fn observe_methods(&self, observer: impl Fn(&ClassDef, &str) + Send + Sync + 'static) {
        self.observers.write().push(Arc::new(observer));
    }

    /// Install a method into the named layer, creating the layer on first
    /// use. Returns false without replacing anything when the layer already
    /// holds a method of that name.
    ///
    /// Layer installs never fire method-definition events.
    pub fn install_layer_method(&self, layer_name: &str, method: Method) -> bool {
        let mut layers = self.layers.write();
        let idx = match layers.iter().position(|l| l.name == layer_name) {
            Some(idx) => idx,
            None => {
                layers.push(Layer {
                    name: layer_name.to_string(),
                    methods: IndexMap::new(),
                });
                layers.len() - 1
            }
        };
        let layer = &mut layers[idx];
        if layer.methods.contains_key(method.name()) {
            return false;
        }
        trace!(
            "{}: install `{}` into layer `{}`",
            self.name,
            method.name(),
            layer_name
        );
        layer.methods.insert(method.name().to_string(), method);
        true
    }

    pub fn layer_method(&self, layer_name: &str, name: &str) -> Option<Method> {
        let layers = self.layers.read();
        layers
            .iter()
            .find(|l| l.name == layer_name)
            .and_then(|l| l.methods.get(name).cloned())
    }

    fn notify_method_defined(&self, name: &str) {
        // Clone out of the lock: observers may define methods or install
        // layers themselves.
        let observers: Vec<MethodObserver> = self.observers.read().clone();
        for observer in observers {
            observer(self, name);
        }
    }
}

impl std::fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClassDef({}, {})", self.name, self.id)
    }
}
