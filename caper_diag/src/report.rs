use std::result;
use std::cell::RefCell;
use std::rc::Rc;

use caper_env::Span;
use message::{Localize, Localized};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Kind {
    Note,
    Warning,
    Error,
    Fatal,
}

// used to stop the further checking
#[must_use]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Stop {
    // this cannot be recovered and should terminate immediately
    Fatal,
    // the callee will do its best to clean things up,
    // the caller can choose to recover or terminate immediately
    Recover,
}

pub type Result<T> = result::Result<T, Stop>;

pub trait Report {
    fn add_span(&self, kind: Kind, span: Span, msg: &Localize) -> Result<()>;
}

impl<'a, R: Report> Report for &'a R {
    fn add_span(&self, k: Kind, s: Span, m: &Localize) -> Result<()> { (**self).add_span(k, s, m) }
}

impl<'a, R: Report> Report for &'a mut R {
    fn add_span(&self, k: Kind, s: Span, m: &Localize) -> Result<()> { (**self).add_span(k, s, m) }
}

impl<'a> Report for &'a Report {
    fn add_span(&self, k: Kind, s: Span, m: &Localize) -> Result<()> { (**self).add_span(k, s, m) }
}

impl Report for Rc<Report> {
    fn add_span(&self, k: Kind, s: Span, m: &Localize) -> Result<()> { (**self).add_span(k, s, m) }
}

pub trait Reporter: Report + Sized {
    fn fatal<Loc: Into<Span>, Msg: Localize, T>(&self, loc: Loc, msg: Msg) -> ReportMore<T> {
        info!("reporting fatal error: {:?}", msg);
        let ret = self.add_span(Kind::Fatal, loc.into(), &msg);
        if let Err(Stop::Fatal) = ret {
            ReportMore::new(self, Err(Stop::Fatal))
        } else {
            panic!("Report::fatal should always return Err(Stop::Fatal) but returned {:?}", ret)
        }
    }

    fn error<Loc: Into<Span>, Msg: Localize>(&self, loc: Loc, msg: Msg) -> ReportMore<()> {
        info!("reporting error: {:?}", msg);
        let ret = self.add_span(Kind::Error, loc.into(), &msg);
        ReportMore::new(self, ret)
    }

    fn warn<Loc: Into<Span>, Msg: Localize>(&self, loc: Loc, msg: Msg) -> ReportMore<()> {
        info!("reporting warning: {:?}", msg);
        let ret = self.add_span(Kind::Warning, loc.into(), &msg);
        ReportMore::new(self, ret)
    }

    fn note<Loc: Into<Span>, Msg: Localize>(&self, loc: Loc, msg: Msg) -> ReportMore<()> {
        info!("reporting note: {:?}", msg);
        let ret = self.add_span(Kind::Note, loc.into(), &msg);
        ReportMore::new(self, ret)
    }
}

impl<T: Report> Reporter for T {}

#[must_use]
pub struct ReportMore<'a, T> {
    report: &'a Report,
    result: Result<T>,
}

impl<'a, T> ReportMore<'a, T> {
    fn new(report: &'a Report, result: Result<T>) -> ReportMore<'a, T> {
        ReportMore { report: report, result: result }
    }

    pub fn note<Loc: Into<Span>, Msg: Localize>(self, loc: Loc, msg: Msg) -> ReportMore<'a, T> {
        let ret = self.report.note(loc, msg).result;
        ReportMore::new(self.report, if let Err(e) = ret { Err(e) } else { self.result })
    }

    pub fn note_if<Loc: Into<Span>, Msg: Localize>(self, loc: Loc, msg: Msg) -> ReportMore<'a, T> {
        let loc = loc.into();
        if loc.is_dummy() {
            self
        } else {
            self.note(loc, msg)
        }
    }

    pub fn done(self) -> Result<T> { self.result }
}

/// Stores the reports, to be extracted later. Used in the tests.
pub struct CollectedReport {
    collected: RefCell<Vec<(Kind, Span, String)>>,
    lang: String,
}

impl CollectedReport {
    pub fn new(lang: String) -> CollectedReport {
        CollectedReport { collected: RefCell::new(Vec::new()), lang: lang }
    }

    pub fn into_reports(self) -> Vec<(Kind, Span, String)> {
        self.collected.into_inner()
    }
}

impl Report for CollectedReport {
    fn add_span(&self, kind: Kind, span: Span, msg: &Localize) -> Result<()> {
        let msg = Localized::new(msg, &self.lang).to_string();
        self.collected.borrow_mut().push((kind, span, msg));
        if kind == Kind::Fatal { Err(Stop::Fatal) } else { Ok(()) }
    }
}

/// Rejects every report. Useful for speculative checks.
pub struct NoReport;

impl Report for NoReport {
    fn add_span(&self, _kind: Kind, _span: Span, _msg: &Localize) -> Result<()> {
        Err(Stop::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use caper_env::Span;
    use super::*;

    #[test]
    fn test_collected_report() {
        let report = CollectedReport::new(String::new());
        assert!(report.error(Span::dummy(), "oops".to_string()).done().is_ok());
        assert!(report.fatal::<_, _, ()>(Span::dummy(), "bad".to_string()).done().is_err());
        let collected = report.into_reports();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].0, Kind::Error);
        assert_eq!(collected[0].2, "oops");
        assert_eq!(collected[1].0, Kind::Fatal);
    }

    #[test]
    fn test_no_report_stops() {
        let report = NoReport;
        assert!(report.error(Span::dummy(), "oops".to_string()).done().is_err());
    }
}
