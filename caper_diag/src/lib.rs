//! Diagnostics for the Caper checker.
//!
//! Reports are pushed through the `Report` trait; the checker itself never
//! prints. A fatal report stops the current check via the `Stop` sentinel.

#[macro_use] extern crate log;
extern crate caper_env;

pub use message::{Localize, Localized, get_message_language};
pub use report::{Kind, Stop, Result, Report, Reporter, ReportMore};
pub use report::{CollectedReport, NoReport};

#[macro_use] mod message;
mod report;
