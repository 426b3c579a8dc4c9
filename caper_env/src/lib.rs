//! Source positions for the Caper checker.
//!
//! The checker receives an already-parsed tree, so positions are plain
//! line/column pairs attached by the parser; there is no source text manager.

pub use loc::{Pos, Span, Spanned, WithLoc};

mod loc;
