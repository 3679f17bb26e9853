use crate::registry::BindingRegistry;
use std::sync::{Arc, Weak};
use sunder_core::ClassDef;

/// Hook the registry into a class's method-definition events.
///
/// The registry is held weakly: classes may outlive the registry that
/// watched them, and a dead registry simply stops observing. Events whose
/// name does not match the class's pending binding are no-ops inside
/// `complete_pending`, so ordinary method definitions are untouched.
pub(crate) fn attach(registry: &Arc<BindingRegistry>, class: &ClassDef) {
    let weak: Weak<BindingRegistry> = Arc::downgrade(registry);
    class.observe_methods(move |class, name| {
        if let Some(registry) = weak.upgrade() {
            registry.complete_pending(class, name);
        }
    });
}
