//! The Caper checker.
//!
//! Takes a parsed tree (`caper_syntax`), checks every assertion in it and
//! reports failures through a `caper_diag::Report`. The interesting part is
//! the `share` assertion: a worklist bisimulation that decides whether a
//! capability can be split into two rely/guarantee protocols.

#[macro_use] extern crate log;
#[macro_use] extern crate caper_diag;
extern crate caper_env;
extern crate caper_syntax;
extern crate caper_types;

pub use check::{Checker, Outcome};
pub use conformance::{Config, check_conformance};

mod check;
mod conformance;
mod message;

use caper_diag::{Report, Result};
use caper_syntax::Exp;

/// Checks a whole program, reporting failures through `report`.
/// The first fatal diagnostic aborts the check.
pub fn check_program(exp: &Exp, report: &Report) -> Result<Outcome> {
    let mut checker = Checker::new(report);
    checker.visit(exp)
}
