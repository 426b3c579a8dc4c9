//! Type representation and algebra for the Caper checker.
//!
//! Types form immutable `Rc` trees (`Ty`). Bound variables are De Bruijn
//! indices; the names carried alongside are purely cosmetic and ignored by
//! every comparison. The algebra (`ty::ops`) is pure: definitions to unfold
//! come in through a `Defs` table and scoping through `Gamma`.

#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;
extern crate caper_syntax;
#[cfg(test)] extern crate env_logger;

pub use ty::{T, Ty, VarKind, Flags};
pub use ty::flags::{F_NONE, F_PURE, F_PROTO};
pub use ty::ops::{self, Unify};
pub use defs::{Def, Defs};
pub use env::Gamma;

pub mod ty;
pub mod defs;
pub mod env;
