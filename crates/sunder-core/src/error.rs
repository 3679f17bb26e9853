use miette::Diagnostic;
use thiserror::Error;

/// Which of the two destructuring views a binding supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Positional,
    Keyed,
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKind::Positional => write!(f, "positional"),
            BindingKind::Keyed => write!(f, "keyed"),
        }
    }
}

#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum RuntimeError {
    #[error("Unknown member `{member}` on `{class}`")]
    #[diagnostic(code(sunder::unknown_member))]
    UnknownMember { class: String, member: String },

    /// A destructured name resolved to no accessor at call time.
    #[error("No accessor matches a destructured name: {0}")]
    #[diagnostic(
        code(sunder::unmatched_name),
        help("declare an accessor method named after every destructured field or constructor parameter")
    )]
    UnmatchedName(String),

    #[error("No {kind} destructuring is bound for `{class}`")]
    #[diagnostic(
        code(sunder::not_bound),
        help("declare a positional or keyed source on the class before destructuring its instances")
    )]
    NotBound { class: String, kind: BindingKind },

    #[error("Argument error: {0}")]
    ArgumentError(String),

    #[error("Type error: {0}")]
    TypeError(String),
}
