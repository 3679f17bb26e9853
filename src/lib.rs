pub use sunder_bind::*;
pub use sunder_core::*;
