//! Tool protocol definitions.
//!
//! Tools are the named capabilities a leaf node may call while it runs.

mod context;
mod definition;
mod result;
mod traits;

pub use context::*;
pub use definition::*;
pub use result::*;
pub use traits::*;
