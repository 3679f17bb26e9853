use crate::diagnostics::translate_unknown_member;
use std::sync::OnceLock;
use sunder_core::{Instance, Method, RuntimeError, Value};
use tracing::trace;

/// A cache entry binding one declared name to the accessor it resolves to.
///
/// Resolution runs through the class's method tables at most once per slot:
/// after the first successful lookup the bound closure is stored and every
/// later call invokes it directly, with no name dispatch. A failed lookup
/// is not stored, so an accessor defined after the first call is picked up
/// on the next one.
pub(crate) struct AccessorSlot {
    name: String,
    resolved: OnceLock<Method>,
}

impl AccessorSlot {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        AccessorSlot {
            name: name.into(),
            resolved: OnceLock::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self, instance: &Instance) -> Result<Value, RuntimeError> {
        let method = match self.resolved.get() {
            Some(method) => method.clone(),
            None => {
                let Some(found) = instance.class().resolve(&self.name) else {
                    return Err(translate_unknown_member(RuntimeError::UnknownMember {
                        class: instance.class().name().to_string(),
                        member: self.name.clone(),
                    }));
                };
                trace!(
                    "bound accessor `{}` on {}",
                    self.name,
                    instance.class().name()
                );
                let _ = self.resolved.set(found.clone());
                found
            }
        };
        method
            .invoke(instance, &[])
            .map_err(translate_unknown_member)
    }
}

impl std::fmt::Debug for AccessorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AccessorSlot({}, {})",
            self.name,
            if self.resolved.get().is_some() {
                "bound"
            } else {
                "unbound"
            }
        )
    }
}
