extern crate env_logger;
extern crate caper_env;
extern crate caper_diag;
extern crate caper_syntax;
extern crate caper_check;

use caper_env::{Spanned, WithLoc};
use caper_diag::CollectedReport;
use caper_syntax::{Ex, Exp, K, Kind, Name, TypeDef};
use caper_check::check_program;

fn k(base: K) -> Kind {
    Box::new(base).without_loc()
}

fn ex(base: Ex) -> Exp {
    Box::new(base).without_loc()
}

fn n(s: &str) -> Name {
    Name::from(s)
}

fn sn(s: &str) -> Spanned<Name> {
    Name::from(s).without_loc()
}

fn prim(s: &str) -> Kind {
    k(K::Prim(n(s)))
}

fn check(exp: Exp) -> Result<(), Vec<String>> {
    let _ = env_logger::init();
    let report = CollectedReport::new(String::new());
    let ret = check_program(&exp, &report);
    let msgs: Vec<_> = report.into_reports().into_iter()
                             .filter(|&(kind, _, _)| kind == caper_diag::Kind::Fatal)
                             .map(|(_, _, msg)| msg)
                             .collect();
    match ret {
        Ok(_) => { assert!(msgs.is_empty()); Ok(()) }
        Err(_) => Err(msgs),
    }
}

fn assert_fails_with(exp: Exp, needle: &str) {
    match check(exp) {
        Ok(()) => panic!("expected a fatal report mentioning {:?}", needle),
        Err(msgs) => {
            assert!(msgs.iter().any(|m| m.contains(needle)),
                    "no fatal report mentioning {:?} in {:?}", needle, msgs);
        }
    }
}

#[test]
fn test_definition_is_transparent() {
    // typedef M<t> = ref t; forall q. M[q] == ref q
    let td = TypeDef {
        name: sn("M"),
        params: vec![sn("t")],
        body: k(K::Ref(sn("t"))),
    };
    let assertion = ex(Ex::Forall(sn("q"), None, ex(Ex::Equals(
        true,
        k(K::App(sn("M"), vec![k(K::Name(n("q")))])),
        k(K::Ref(sn("q"))),
    ))));
    let prog = ex(Ex::Program(vec![td.without_loc()], vec![assertion]));
    assert!(check(prog).is_ok());
}

#[test]
fn test_failed_assertion_is_fatal() {
    // forall q. (ref q == int) expected to hold, but it does not
    let assertion = ex(Ex::Forall(sn("q"), None, ex(Ex::Equals(
        true,
        k(K::Ref(sn("q"))),
        prim("int"),
    ))));
    let prog = ex(Ex::Program(vec![], vec![assertion]));
    assert_fails_with(prog, "Unexpected Result");
}

#[test]
fn test_negated_assertion_passes() {
    let assertion = ex(Ex::Forall(sn("q"), None, ex(Ex::Equals(
        false,
        k(K::Ref(sn("q"))),
        prim("int"),
    ))));
    let prog = ex(Ex::Program(vec![], vec![assertion]));
    assert!(check(prog).is_ok());
}

#[test]
fn test_share_identity_protocol() {
    // forall q. share (rw q int) as (rw q int => rw q int) || none
    let cap = || k(K::Cap(sn("q"), prim("int")));
    let assertion = ex(Ex::Forall(sn("q"), None, ex(Ex::Share(
        true,
        cap(),
        k(K::Rely(cap(), cap())),
        k(K::None),
    ))));
    let prog = ex(Ex::Program(vec![], vec![assertion]));
    assert!(check(prog).is_ok());
}

#[test]
fn test_share_mismatch_is_reported() {
    // the protocol relies on a state the capability never provides
    let assertion = ex(Ex::Forall(sn("q"), None, ex(Ex::Share(
        true,
        k(K::Cap(sn("q"), prim("int"))),
        k(K::Rely(prim("boolean"), prim("boolean"))),
        k(K::None),
    ))));
    let prog = ex(Ex::Program(vec![], vec![assertion]));
    assert_fails_with(prog, "Unexpected Result");
}

#[test]
fn test_share_requires_protocols() {
    let assertion = ex(Ex::Forall(sn("q"), None, ex(Ex::Share(
        true,
        k(K::Cap(sn("q"), prim("int"))),
        prim("int"),
        k(K::None),
    ))));
    let prog = ex(Ex::Program(vec![], vec![assertion]));
    assert_fails_with(prog, "not a protocol");
}

#[test]
fn test_bottom_definition_is_rejected() {
    // typedef A = A
    let td = TypeDef {
        name: sn("A"),
        params: vec![],
        body: k(K::Name(n("A"))),
    };
    let prog = ex(Ex::Program(vec![td.without_loc()], vec![]));
    assert_fails_with(prog, "bottom");
}

#[test]
fn test_duplicate_definition_is_rejected() {
    let td = |body: Kind| TypeDef { name: sn("M"), params: vec![], body: body };
    let prog = ex(Ex::Program(
        vec![td(prim("int")).without_loc(), td(prim("boolean")).without_loc()],
        vec![],
    ));
    assert_fails_with(prog, "already defined");
}

#[test]
fn test_unknown_name_is_reported() {
    let prog = ex(Ex::Program(vec![], vec![ex(Ex::Equals(
        true,
        k(K::Name(n("nope"))),
        prim("int"),
    ))]));
    assert_fails_with(prog, "Unknown name");
}

#[test]
fn test_bang_is_droppable() {
    // !int <: int always; the converse needs a pure type, which none is not
    let prog = ex(Ex::Program(vec![], vec![
        ex(Ex::Subtype(true, k(K::Bang(prim("int"))), prim("int"))),
        ex(Ex::Subtype(true, prim("int"), k(K::Bang(prim("int"))))),
        ex(Ex::Subtype(false, k(K::None), k(K::Bang(k(K::None))))),
    ]));
    assert!(check(prog).is_ok());
}
