use crate::accessor::AccessorSlot;
use std::sync::Arc;
use sunder_core::{CONSTRUCTOR_NAME, ClassDef, Instance, RuntimeError, Value};
use tracing::debug;

/// The declared source of a class's positional view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionalSource {
    /// A zero-argument method expected to return the sequence. The method
    /// may be defined after the declaration.
    Method(String),
    /// Derive the sequence from the constructor's parameter names, one
    /// same-named accessor per parameter.
    Constructor,
}

impl PositionalSource {
    /// The method name the binding is stored under. The constructor
    /// sentinel normalizes to the canonical constructor name.
    pub fn resolved_name(&self) -> &str {
        match self {
            PositionalSource::Method(name) => name,
            PositionalSource::Constructor => CONSTRUCTOR_NAME,
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, PositionalSource::Constructor)
    }
}

impl From<&str> for PositionalSource {
    fn from(name: &str) -> Self {
        PositionalSource::Method(name.to_string())
    }
}

pub type PositionalFn = Arc<dyn Fn(&Instance) -> Result<Value, RuntimeError> + Send + Sync>;

/// Build the zero-argument sequence operation for a resolved source.
///
/// Constructor mode snapshots the parameter names here, at bind time, in
/// declaration order with every parameter kind flattened to its name; the
/// produced operation reads one same-named accessor per parameter. It never
/// re-invokes the constructor. Accessor existence is not checked here; a
/// missing accessor surfaces when the operation runs.
pub(crate) fn synthesize(class: &ClassDef, resolved: &str, ctor_derived: bool) -> PositionalFn {
    if ctor_derived {
        let names = class.param_names();
        debug!(
            "{}: positional view derived from constructor params {:?}",
            class.name(),
            names
        );
        let slots: Vec<AccessorSlot> = names.into_iter().map(AccessorSlot::new).collect();
        Arc::new(move |instance| {
            let mut values = Vec::with_capacity(slots.len());
            for slot in &slots {
                values.push(slot.invoke(instance)?);
            }
            Ok(Value::List(values))
        })
    } else {
        debug!("{}: positional view bound to `{}`", class.name(), resolved);
        let slot = AccessorSlot::new(resolved);
        // The source method is trusted to return a sequence; its result is
        // passed through unvalidated.
        Arc::new(move |instance| slot.invoke(instance))
    }
}
