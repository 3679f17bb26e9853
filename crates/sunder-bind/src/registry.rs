use crate::install;
use crate::keyed::{self, KeyedFn};
use crate::positional::{self, PositionalFn, PositionalSource};
use crate::watcher;
use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use sunder_core::{BindingKind, ClassDef, ClassId, Instance, RuntimeError, Value};
use tracing::{debug, trace};

/// Result of a positional declaration: whether the binding completed
/// synchronously, and the method name it resolved to. `bound == false`
/// means completion is deferred until the source method is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareOutcome {
    pub bound: bool,
    pub resolved: String,
}

struct PositionalBinding {
    source: String,
    ctor_derived: bool,
    op: PositionalFn,
}

struct KeyedBinding {
    fields: IndexSet<String>,
    op: KeyedFn,
}

#[derive(Default)]
struct BindingEntry {
    positional: Option<PositionalBinding>,
    keyed: Option<KeyedBinding>,
    /// Awaiting this method to appear; cleared the moment it is defined.
    pending: Option<String>,
    watched: bool,
}

/// Per-class destructuring bindings: at most one positional source and one
/// keyed field set each, write-once. Entries are created at opt-in and
/// mutated only by the two declarations and deferred completion; the
/// synthesized operations themselves are immutable once stored, so
/// concurrent match operations read them without coordination.
#[derive(Default)]
pub struct BindingRegistry {
    entries: DashMap<ClassId, BindingEntry>,
}

impl BindingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The opt-in hook: creates the class's registry entry and attaches the
    /// deferred-bind watcher to its method-definition events, once.
    /// Idempotent.
    pub fn opt_in(self: &Arc<Self>, class: &ClassDef) {
        {
            let mut entry = self.entries.entry(class.id()).or_default();
            if entry.watched {
                return;
            }
            entry.watched = true;
        }
        watcher::attach(self, class);
        debug!("{}: opted in to destructuring", class.name());
    }

    /// Declare the positional source. Binds synchronously when the source
    /// already resolves (the constructor always does); otherwise records a
    /// pending flag for the watcher. Re-declaration (bound or pending) is
    /// a silent no-op reporting the current state.
    pub fn declare_positional(
        self: &Arc<Self>,
        class: &ClassDef,
        source: PositionalSource,
    ) -> DeclareOutcome {
        self.opt_in(class);
        let resolved = source.resolved_name().to_string();
        let ctor_derived = source.is_constructor();

        let mut entry = self.entries.entry(class.id()).or_default();
        if let Some(existing) = &entry.positional {
            trace!(
                "{}: positional source already bound to `{}`; ignoring `{}`",
                class.name(),
                existing.source,
                resolved
            );
            return DeclareOutcome {
                bound: true,
                resolved: existing.source.clone(),
            };
        }
        if let Some(pending) = &entry.pending {
            trace!(
                "{}: positional source `{}` still pending; ignoring `{}`",
                class.name(),
                pending,
                resolved
            );
            return DeclareOutcome {
                bound: false,
                resolved: pending.clone(),
            };
        }

        if ctor_derived || class.has_method(&resolved) {
            let op = positional::synthesize(class, &resolved, ctor_derived);
            entry.positional = Some(PositionalBinding {
                source: resolved.clone(),
                ctor_derived,
                op: op.clone(),
            });
            drop(entry);
            install::install_positional(class, op);
            DeclareOutcome {
                bound: true,
                resolved,
            }
        } else {
            debug!(
                "{}: positional source `{}` not defined yet; deferring",
                class.name(),
                resolved
            );
            entry.pending = Some(resolved.clone());
            DeclareOutcome {
                bound: false,
                resolved,
            }
        }
    }

    /// Declare the keyed field set. Deduplicates to unique names keeping
    /// first-seen order, builds the accessor cache eagerly, and installs.
    /// Never defers; a second call is a silent no-op.
    pub fn declare_keyed<I, S>(self: &Arc<Self>, class: &ClassDef, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.opt_in(class);
        let mut entry = self.entries.entry(class.id()).or_default();
        if entry.keyed.is_some() {
            trace!(
                "{}: keyed fields already declared; ignoring",
                class.name()
            );
            return;
        }

        let fields: IndexSet<String> = names.into_iter().map(Into::into).collect();
        let op = keyed::synthesize(class.name(), &fields);
        entry.keyed = Some(KeyedBinding {
            fields,
            op: op.clone(),
        });
        drop(entry);
        install::install_keyed(class, op);
    }

    /// Deferred completion, driven by the watcher on every method
    /// definition. A no-op unless the defined name matches the class's
    /// pending positional source; the flag is consumed exactly once.
    pub(crate) fn complete_pending(&self, class: &ClassDef, name: &str) {
        let Some(mut entry) = self.entries.get_mut(&class.id()) else {
            return;
        };
        if entry.pending.as_deref() != Some(name) {
            return;
        }
        let Some(resolved) = entry.pending.take() else {
            return;
        };
        let op = positional::synthesize(class, &resolved, false);
        entry.positional = Some(PositionalBinding {
            source: resolved.clone(),
            ctor_derived: false,
            op: op.clone(),
        });
        drop(entry);
        install::install_positional(class, op);
        debug!(
            "{}: deferred positional binding completed by `{}`",
            class.name(),
            resolved
        );
    }

    /// The positional view of an instance: an ordered sequence of values,
    /// computed fresh on every call.
    pub fn deconstruct(&self, instance: &Instance) -> Result<Value, RuntimeError> {
        let op = {
            let Some(entry) = self.entries.get(&instance.class().id()) else {
                return Err(not_bound(instance.class(), BindingKind::Positional));
            };
            match &entry.positional {
                Some(binding) => binding.op.clone(),
                None => return Err(not_bound(instance.class(), BindingKind::Positional)),
            }
        };
        // Guard dropped before the call so accessors may re-enter the
        // registry.
        op(instance)
    }

    /// The keyed view of an instance: declared fields (optionally filtered
    /// to a requested subset) mapped to their current values.
    pub fn deconstruct_keys(
        &self,
        instance: &Instance,
        requested: Option<&[String]>,
    ) -> Result<IndexMap<String, Value>, RuntimeError> {
        let op = {
            let Some(entry) = self.entries.get(&instance.class().id()) else {
                return Err(not_bound(instance.class(), BindingKind::Keyed));
            };
            match &entry.keyed {
                Some(binding) => binding.op.clone(),
                None => return Err(not_bound(instance.class(), BindingKind::Keyed)),
            }
        };
        op(instance, requested)
    }

    pub fn is_bound(&self, class: &ClassDef, kind: BindingKind) -> bool {
        self.entries
            .get(&class.id())
            .map(|entry| match kind {
                BindingKind::Positional => entry.positional.is_some(),
                BindingKind::Keyed => entry.keyed.is_some(),
            })
            .unwrap_or(false)
    }

    /// The stored positional source and whether it is constructor-derived.
    pub fn positional_source(&self, class: &ClassDef) -> Option<(String, bool)> {
        self.entries.get(&class.id()).and_then(|entry| {
            entry
                .positional
                .as_ref()
                .map(|b| (b.source.clone(), b.ctor_derived))
        })
    }

    /// The method name a deferred positional binding is waiting on.
    pub fn pending_source(&self, class: &ClassDef) -> Option<String> {
        self.entries
            .get(&class.id())
            .and_then(|entry| entry.pending.clone())
    }

    /// The declared keyed field names, deduplicated, in declaration order.
    pub fn keyed_fields(&self, class: &ClassDef) -> Option<Vec<String>> {
        self.entries.get(&class.id()).and_then(|entry| {
            entry
                .keyed
                .as_ref()
                .map(|b| b.fields.iter().cloned().collect())
        })
    }
}

fn not_bound(class: &ClassDef, kind: BindingKind) -> RuntimeError {
    RuntimeError::NotBound {
        class: class.name().to_string(),
        kind,
    }
}
