use crate::accessor::AccessorSlot;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use sunder_core::{Instance, RuntimeError, Value};
use tracing::debug;

pub type KeyedFn = Arc<
    dyn Fn(&Instance, Option<&[String]>) -> Result<IndexMap<String, Value>, RuntimeError>
        + Send
        + Sync,
>;

/// Build the keyed operation over the deduplicated, ordered field set.
///
/// The accessor cache is built here, once: one slot per declared field, in
/// declaration order. With no filter the operation yields every declared
/// field; with a filter it yields the intersection of declared and
/// requested names, declared order retained, silently excluding requested
/// names that were never declared.
pub(crate) fn synthesize(class_name: &str, fields: &IndexSet<String>) -> KeyedFn {
    debug!(
        "{}: keyed view over fields {:?}",
        class_name,
        fields.iter().collect::<Vec<_>>()
    );
    let slots: Vec<AccessorSlot> = fields.iter().cloned().map(AccessorSlot::new).collect();
    Arc::new(move |instance, requested| {
        let mut out = IndexMap::new();
        for slot in &slots {
            let wanted = match requested {
                None => true,
                Some(keys) => keys.iter().any(|key| key == slot.name()),
            };
            if !wanted {
                continue;
            }
            out.insert(slot.name().to_string(), slot.invoke(instance)?);
        }
        Ok(out)
    })
}
