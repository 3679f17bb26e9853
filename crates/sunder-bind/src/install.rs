use crate::keyed::KeyedFn;
use crate::positional::PositionalFn;
use sunder_core::{ClassDef, Method, RuntimeError, Value};
use tracing::trace;

/// Method layer the synthesized operations are installed into. Own methods
/// shadow it, so a class author defining their own `deconstruct` later
/// wins ordinary resolution without touching the registry's state.
pub const DESTRUCTURE_LAYER: &str = "destructure";

/// Instance-level entry point producing the positional view.
pub const DECONSTRUCT: &str = "deconstruct";

/// Instance-level entry point producing the keyed view.
pub const DECONSTRUCT_KEYS: &str = "deconstruct_keys";

pub(crate) fn install_positional(class: &ClassDef, op: PositionalFn) {
    let method = Method::new(DECONSTRUCT, move |instance, _args| op(instance));
    if !class.install_layer_method(DESTRUCTURE_LAYER, method) {
        trace!("{}: `{}` already installed", class.name(), DECONSTRUCT);
    }
}

pub(crate) fn install_keyed(class: &ClassDef, op: KeyedFn) {
    let method = Method::new(DECONSTRUCT_KEYS, move |instance, args| {
        let requested = requested_keys(args)?;
        let map = op(instance, requested.as_deref())?;
        Ok(Value::Dict(map))
    });
    if !class.install_layer_method(DESTRUCTURE_LAYER, method) {
        trace!("{}: `{}` already installed", class.name(), DECONSTRUCT_KEYS);
    }
}

/// Calling convention for the dynamic entry point: no argument or Null
/// selects every declared field; a list of words/strings selects a subset.
fn requested_keys(args: &[Value]) -> Result<Option<Vec<String>>, RuntimeError> {
    match args.first() {
        None | Some(Value::Null) => Ok(None),
        Some(Value::List(items)) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                match item.as_name() {
                    Some(name) => keys.push(name.to_string()),
                    None => {
                        return Err(RuntimeError::TypeError(format!(
                            "Requested key must be a word or string, got {item:?}"
                        )));
                    }
                }
            }
            Ok(Some(keys))
        }
        Some(other) => Err(RuntimeError::TypeError(format!(
            "Requested keys must be a list, got {other:?}"
        ))),
    }
}
