//! Protocol conformance.
//!
//! `share C as P || Q` asks whether the capability `C` can be safely split
//! between two aliases following the protocols `P` and `Q`. The check is a
//! bisimulation search over configurations `(s, p, q)`: from every reachable
//! configuration, each protocol must be able to take its next step against
//! the state the other protocol may have left behind. The search works a
//! worklist and closes through subsumption; reaching a configuration with no
//! possible step refutes the split, an empty worklist proves it.

use std::rc::Rc;

use caper_types::{Defs, T, Ty, Unify};
use caper_types::ops::{shift, subst, index_set, reindex, unfold, equals, subtype, unify,
                       is_protocol};

/// One configuration of the search: the remaining state `s` and the two
/// protocol residuals. `p` and `q` keep their share-expression sides.
#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    pub s: Ty,
    pub p: Ty,
    pub q: Ty,
}

// reindexing keeps the reachable set finite, so running into this ceiling
// means the engine itself is broken, not the program under check
const MAX_CONFIGS: usize = 4096;

/// Runs the conformance search. On success the visited configurations are
/// returned as a witness table.
pub fn check_conformance(defs: &Defs, s: Ty, p: Ty, q: Ty) -> Option<Vec<Config>> {
    let (s, p, q) = reindex(&s, &p, &q);
    let mut work = vec![Config { s: s, p: p, q: q }];
    let mut visited: Vec<Config> = Vec::new();

    while let Some(config) = work.pop() {
        if visited.iter().any(|v| subsumes(defs, v, &config)) {
            continue;
        }
        if visited.len() >= MAX_CONFIGS {
            panic!("conformance search did not close after {} configurations, \
                    still growing at {:?}", MAX_CONFIGS, config);
        }
        debug!("conformance step {:?}", config);
        let left = step(defs, &config.s, &config.p, &config.q, true)?;
        let right = step(defs, &config.s, &config.q, &config.p, false)?;
        visited.push(config);
        work.extend(left);
        work.extend(right);
    }

    Some(visited)
}

// a visited configuration with a stronger state and weaker obligations
// already covers this one
fn subsumes(defs: &Defs, old: &Config, new: &Config) -> bool {
    subtype(defs, &new.s, &old.s) &&
        subtype(defs, &old.p, &new.p) &&
        subtype(defs, &old.q, &new.q)
}

/// Steps the active protocol `p` once against the state `s`. `q` is the
/// passive side, carried along (and shifted along) for the successors.
fn step(defs: &Defs, s: &Ty, p: &Ty, q: &Ty, p_is_left: bool) -> Option<Vec<Config>> {
    if let Some(next) = single_step(defs, s, p, q, p_is_left) {
        return Some(next);
    }

    // every alternative state must be able to step
    if let T::Alt(ref states) = **s {
        let mut all = Vec::new();
        let mut ok = true;
        for state in states {
            match step(defs, state, p, q, p_is_left) {
                Some(next) => all.extend(next),
                None => { ok = false; break; }
            }
        }
        if ok { return Some(all); }
    }

    // an intersection protocol obliges every member
    if let T::Isect(ref protos) = **p {
        let mut all = Vec::new();
        let mut ok = true;
        for proto in protos {
            match step(defs, s, proto, q, p_is_left) {
                Some(next) => all.extend(next),
                None => { ok = false; break; }
            }
        }
        if ok { return Some(all); }
    }

    // an alternative protocol may pick any member
    if let T::Alt(ref protos) = **p {
        for proto in protos {
            if let Some(next) = step(defs, s, proto, q, p_is_left) {
                return Some(next);
            }
        }
    }

    // an intersection state may pick any member
    if let T::Isect(ref states) = **s {
        for state in states {
            if let Some(next) = step(defs, state, p, q, p_is_left) {
                return Some(next);
            }
        }
    }

    if let T::Def(..) = **s {
        return step(defs, &unfold(defs, s), p, q, p_is_left);
    }
    if let T::Def(..) = **p {
        return step(defs, s, &unfold(defs, p), q, p_is_left);
    }

    None
}

fn single_step(defs: &Defs, s: &Ty, p: &Ty, q: &Ty, p_is_left: bool) -> Option<Vec<Config>> {
    // a finished protocol has nothing left to step
    if let T::None = **p {
        return Some(Vec::new());
    }
    if is_protocol(defs, s) {
        protocol_step(defs, s, p, q, p_is_left)
    } else {
        state_step(defs, s, p, q, p_is_left)
    }
}

// the capability itself is a protocol: the alias may only follow it
fn protocol_step(defs: &Defs, s: &Ty, p: &Ty, q: &Ty, p_is_left: bool) -> Option<Vec<Config>> {
    match (&**s, &**p) {
        (&T::Exists(_, ref sbody, ref sbound), &T::Exists(_, ref pbody, ref pbound)) => {
            // open both abstractions in lockstep
            match (sbound, pbound) {
                (&None, &None) => {}
                (&Some(ref a), &Some(ref b)) if equals(defs, a, b) => {}
                (_, _) => return None,
            }
            single_step(defs, sbody, pbody, &shift(q, 0, 1), p_is_left)
        }
        (&T::Rely(ref sr, ref sg), &T::Rely(ref pr, ref pg)) => {
            match (&**sg, &**pg) {
                (&T::Forall(_, ref sgb, _), &T::Forall(_, ref pgb, _)) => {
                    // open both foralls in lockstep
                    let s2 = Rc::new(T::Rely(shift(sr, 0, 1), sgb.clone()));
                    let p2 = Rc::new(T::Rely(shift(pr, 0, 1), pgb.clone()));
                    return single_step(defs, &s2, &p2, &shift(q, 0, 1), p_is_left);
                }
                (&T::Forall(ref name, ref sgb, _), _) => {
                    // only the capability abstracts; solve its variable
                    // against the protocol's concrete guarantee
                    let opened = open_with(defs, name, sgb, pg)?;
                    let s2 = Rc::new(T::Rely(sr.clone(), opened));
                    return single_step(defs, &s2, p, q, p_is_left);
                }
                (_, &T::Forall(ref name, ref pgb, _)) => {
                    let opened = open_with(defs, name, pgb, sg)?;
                    let p2 = Rc::new(T::Rely(pr.clone(), opened));
                    return single_step(defs, s, &p2, q, p_is_left);
                }
                (_, _) => {}
            }
            // the alias may rely on no more than the capability provides,
            // and must guarantee at least what the capability expects
            if !subtype(defs, sr, pr) { return None; }
            let (sg_state, sg_rest) = guarantee_parts(sg);
            let (pg_state, pg_rest) = guarantee_parts(pg);
            if !subtype(defs, &pg_state, &sg_state) { return None; }
            Some(successor(p_is_left, sg_rest, pg_rest, q.clone()))
        }
        (_, _) => None,
    }
}

// the capability is a concrete state: the protocol consumes it
fn state_step(defs: &Defs, s: &Ty, p: &Ty, q: &Ty, p_is_left: bool) -> Option<Vec<Config>> {
    // full recovery: the protocol takes the state as-is
    if equals(defs, s, p) {
        return Some(successor(p_is_left, T::none(), T::none(), q.clone()));
    }
    match **p {
        T::Exists(ref name, ref body, _) => {
            // pick the opening that matches the state against the rely
            let pr = match **body {
                T::Rely(ref pr, _) => pr.clone(),
                _ => return None,
            };
            let opened = open_against(defs, name, body, &pr, &shift(s, 0, 1))?;
            single_step(defs, s, &opened, q, p_is_left)
        }
        T::Rely(ref pr, ref pg) => {
            if let T::Forall(_, ref pgb, _) = **pg {
                // the guarantee abstracts over what comes back; the state
                // and the passive side move under the binder
                let p2 = Rc::new(T::Rely(shift(pr, 0, 1), pgb.clone()));
                return single_step(defs, &shift(s, 0, 1), &p2, &shift(q, 0, 1), p_is_left);
            }
            if !subtype(defs, s, pr) { return None; }
            let (pg_state, pg_rest) = guarantee_parts(pg);
            Some(successor(p_is_left, pg_state, pg_rest, q.clone()))
        }
        _ => None,
    }
}

// opens `exists/forall name. body` by unifying `pattern` (a part of the
// body) against `target`, both one binder deep
fn open_against(defs: &Defs, name: &::caper_syntax::Name, body: &Ty, pattern: &Ty,
                target: &Ty) -> Option<Ty> {
    let x = T::var(name.clone(), 0);
    match unify(defs, &x, pattern, target) {
        Unify::No => None,
        Unify::Free => drop_binder(body),
        Unify::To(w) => drop_binder(&subst(body, &x, &w)),
    }
}

fn open_with(defs: &Defs, name: &::caper_syntax::Name, body: &Ty, target: &Ty) -> Option<Ty> {
    open_against(defs, name, body, body, &shift(target, 0, 1))
}

// removes an opened binder; fails if the body still mentions it
fn drop_binder(t: &Ty) -> Option<Ty> {
    if index_set(t).contains(&0) {
        None
    } else {
        Some(shift(t, 0, -1))
    }
}

fn guarantee_parts(g: &Ty) -> (Ty, Ty) {
    match **g {
        T::Guarantee(ref state, ref rest) => (state.clone(), rest.clone()),
        // a bare guarantee leaves nothing behind
        _ => (g.clone(), T::none()),
    }
}

fn successor(p_is_left: bool, s: Ty, active: Ty, passive: Ty) -> Vec<Config> {
    let (s, active, passive) = reindex(&s, &active, &passive);
    if p_is_left {
        vec![Config { s: s, p: active, q: passive }]
    } else {
        vec![Config { s: s, p: passive, q: active }]
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use caper_syntax::Name;
    use caper_types::{Defs, T, Ty, VarKind};
    use super::check_conformance;

    fn n(s: &str) -> Name { Name::from(s) }
    fn prim(s: &str) -> Ty { Rc::new(T::Prim(n(s))) }
    fn lv(s: &str, i: u32) -> Ty { Rc::new(T::LocVar(n(s), i)) }
    fn tv(s: &str, i: u32) -> Ty { Rc::new(T::TyVar(n(s), i)) }
    fn cap(l: Ty, t: Ty) -> Ty { Rc::new(T::Cap(l, t)) }
    fn rely(r: Ty, g: Ty) -> Ty { Rc::new(T::Rely(r, g)) }
    fn guar(g: Ty, r: Ty) -> Ty { Rc::new(T::Guarantee(g, r)) }
    fn exists(name: &str, body: Ty) -> Ty { Rc::new(T::Exists(n(name), body, None)) }

    #[test]
    fn test_nothing_to_share() {
        let defs = Defs::new();
        let table = check_conformance(&defs, T::none(), T::none(), T::none());
        assert_eq!(table.map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_simple_borrow() {
        let defs = Defs::new();
        let state = cap(lv("q", 0), prim("int"));
        // the alias relies on the state and hands it straight back
        let proto = rely(state.clone(), state.clone());
        let table = check_conformance(&defs, state, proto, T::none());
        assert!(table.is_some());
    }

    #[test]
    fn test_mismatched_rely_fails() {
        let defs = Defs::new();
        let state = cap(lv("q", 0), prim("int"));
        let proto = rely(prim("boolean"), prim("boolean"));
        assert_eq!(check_conformance(&defs, state, proto, T::none()), None);
    }

    #[test]
    fn test_chained_steps_stay_linear() {
        let defs = Defs::new();
        // int => (boolean ; boolean => (string ; done))
        let p2 = rely(prim("boolean"), guar(prim("string"), T::none()));
        let p1 = rely(prim("int"), guar(prim("boolean"), p2));
        let table = check_conformance(&defs, prim("int"), p1, T::none()).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_long_chain_visits_each_step_once() {
        let defs = Defs::new();
        // a chain of n distinct rely steps must yield exactly n+1
        // configurations, one per step plus the drained one
        let n = 20;
        let mut proto = T::none();
        for _ in 0..n {
            proto = rely(prim("int"), guar(prim("int"), proto));
        }
        let table = check_conformance(&defs, prim("int"), proto, T::none()).unwrap();
        assert_eq!(table.len(), n + 1);
    }

    #[test]
    fn test_alternative_protocol_picks_a_branch() {
        let defs = Defs::new();
        let good = rely(prim("int"), T::none());
        let bad = rely(prim("boolean"), T::none());
        let proto = Rc::new(T::Alt(vec![bad, good]));
        assert!(check_conformance(&defs, prim("int"), proto, T::none()).is_some());
    }

    #[test]
    fn test_intersection_protocol_obliges_all() {
        let defs = Defs::new();
        let good = rely(prim("int"), T::none());
        let bad = rely(prim("boolean"), T::none());
        let both = Rc::new(T::Isect(vec![good.clone(), bad]));
        assert_eq!(check_conformance(&defs, prim("int"), both, T::none()), None);
        let fine = Rc::new(T::Isect(vec![good.clone(), good]));
        assert!(check_conformance(&defs, prim("int"), fine, T::none()).is_some());
    }

    #[test]
    fn test_exists_lockstep() {
        let defs = Defs::new();
        // exists X. (X => done) against itself
        let proto = exists("X", rely(tv("X", 0), T::none()));
        assert!(check_conformance(&defs, proto.clone(), proto, T::none()).is_some());
    }

    #[test]
    fn test_state_against_exists_unifies() {
        let defs = Defs::new();
        let state = cap(lv("l", 0), prim("int"));
        // exists X. (rw l X => done): the opening X = int is forced
        let proto = exists("X", rely(cap(lv("l", 1), tv("X", 0)), T::none()));
        assert!(check_conformance(&defs, state.clone(), proto, T::none()).is_some());

        // no opening makes boolean match int
        let fussy = exists("X", rely(cap(lv("l", 1), prim("boolean")), T::none()));
        assert_eq!(check_conformance(&defs, state, fussy, T::none()), None);
    }

    #[test]
    fn test_recursive_protocol_closes_by_subsumption() {
        // Loop = (int => (int ; Loop))
        let mut defs = Defs::new();
        assert!(defs.declare(n("Loop"), vec![]));
        let looped = Rc::new(T::Def(n("Loop"), vec![]));
        defs.define(&n("Loop"), rely(prim("int"), guar(prim("int"), looped.clone())));

        let table = check_conformance(&defs, prim("int"), looped, T::none()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_both_sides_must_step() {
        let defs = Defs::new();
        let state = cap(lv("q", 0), prim("int"));
        let proto = rely(state.clone(), state.clone());
        let bad = rely(prim("boolean"), prim("boolean"));
        // the left side alone would pass; the right side refutes the split
        assert_eq!(check_conformance(&defs, state, proto, bad), None);
    }
}
