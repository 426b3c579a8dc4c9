//! The Caper abstract syntax tree.
//!
//! The parser is a separate frontend; this crate only defines the tree it
//! produces. `Ex` is the assertion-level grammar (programs, share/subtype/
//! equality assertions) and `K` is the type grammar.

extern crate caper_env;

pub use ast::{Name, Ex, Exp, K, Kind, TypeDef};

pub mod ast;
