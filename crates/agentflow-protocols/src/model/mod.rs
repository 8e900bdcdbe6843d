//! Model invocation protocol.
//!
//! A leaf node talks to its language model only through [`ModelInvoker`].

mod request;
mod traits;

pub use request::*;
pub use traits::*;
