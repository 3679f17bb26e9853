use sunder_core::RuntimeError;

/// Error boundary for the synthesized operations: a missing-member failure
/// raised while resolving or invoking an accessor is re-raised as the
/// distinguished unmatched-name error, carrying the original message.
/// Every other error kind passes through unchanged.
pub(crate) fn translate_unknown_member(err: RuntimeError) -> RuntimeError {
    match err {
        unknown @ RuntimeError::UnknownMember { .. } => {
            RuntimeError::UnmatchedName(unknown.to_string())
        }
        other => other,
    }
}
