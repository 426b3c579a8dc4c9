//! Operations over the type representation.
//!
//! Everything here is pure. Comparisons that may unfold definitions
//! (`equals`, `subtype`, `unify`) carry a coinductive trail of strictly
//! identical pairs: a pair seen again is assumed to hold, which is what
//! makes recursive definitions compare in finite time.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;

use caper_syntax::Name;

use defs::Defs;
use ty::{T, Ty};
use ty::flags::*;

type Trail = HashSet<(Ty, Ty)>;

fn shift_index(i: u32, cutoff: u32, delta: i32) -> u32 {
    if i < cutoff { return i; }
    let shifted = i as i64 + delta as i64;
    assert!(shifted >= cutoff as i64,
            "shifting index {} by {} would capture it below cutoff {}", i, delta, cutoff);
    shifted as u32
}

/// Moves every free variable with index >= `cutoff` by `delta`.
pub fn shift(t: &Ty, cutoff: u32, delta: i32) -> Ty {
    if delta == 0 { return t.clone(); }
    match **t {
        T::Prim(..) | T::None | T::Top => t.clone(),
        T::Bang(ref u) => Rc::new(T::Bang(shift(u, cutoff, delta))),
        T::Fun(ref a, ref r) => {
            Rc::new(T::Fun(shift(a, cutoff, delta), shift(r, cutoff, delta)))
        }
        T::Record(ref fields) => Rc::new(T::Record(shift_entries(fields, cutoff, delta))),
        T::Tuple(ref ts) => Rc::new(T::Tuple(shift_all(ts, cutoff, delta))),
        T::Sum(ref cases) => Rc::new(T::Sum(shift_entries(cases, cutoff, delta))),
        T::Ref(ref l) => Rc::new(T::Ref(shift(l, cutoff, delta))),
        T::Cap(ref l, ref u) => {
            Rc::new(T::Cap(shift(l, cutoff, delta), shift(u, cutoff, delta)))
        }
        T::Stacked(ref a, ref b) => {
            Rc::new(T::Stacked(shift(a, cutoff, delta), shift(b, cutoff, delta)))
        }
        T::Rely(ref r, ref g) => {
            Rc::new(T::Rely(shift(r, cutoff, delta), shift(g, cutoff, delta)))
        }
        T::Guarantee(ref g, ref r) => {
            Rc::new(T::Guarantee(shift(g, cutoff, delta), shift(r, cutoff, delta)))
        }
        T::Star(ref ts) => Rc::new(T::Star(shift_all(ts, cutoff, delta))),
        T::Alt(ref ts) => Rc::new(T::Alt(shift_all(ts, cutoff, delta))),
        T::Isect(ref ts) => Rc::new(T::Isect(shift_all(ts, cutoff, delta))),
        T::Forall(ref name, ref body, ref bound) => {
            Rc::new(T::Forall(name.clone(), shift(body, cutoff + 1, delta),
                              bound.as_ref().map(|b| shift(b, cutoff, delta))))
        }
        T::Exists(ref name, ref body, ref bound) => {
            Rc::new(T::Exists(name.clone(), shift(body, cutoff + 1, delta),
                              bound.as_ref().map(|b| shift(b, cutoff, delta))))
        }
        T::TyVar(ref name, i) => Rc::new(T::TyVar(name.clone(), shift_index(i, cutoff, delta))),
        T::LocVar(ref name, i) => Rc::new(T::LocVar(name.clone(), shift_index(i, cutoff, delta))),
        T::Def(ref name, ref args) => Rc::new(T::Def(name.clone(), shift_all(args, cutoff, delta))),
    }
}

fn shift_all(ts: &[Ty], cutoff: u32, delta: i32) -> Vec<Ty> {
    ts.iter().map(|t| shift(t, cutoff, delta)).collect()
}

fn shift_entries(entries: &[(Name, Ty)], cutoff: u32, delta: i32) -> Vec<(Name, Ty)> {
    entries.iter().map(|&(ref n, ref t)| (n.clone(), shift(t, cutoff, delta))).collect()
}

/// Replaces every occurrence of the variable `from` in `t` with `to`.
/// Both `from` and `to` are lifted when crossing a binder, so `to` may
/// mention free variables without being captured.
pub fn subst(t: &Ty, from: &Ty, to: &Ty) -> Ty {
    debug_assert!(match **from { T::TyVar(..) | T::LocVar(..) => true, _ => false });
    if **t == **from { return to.clone(); }
    match **t {
        T::Prim(..) | T::None | T::Top | T::TyVar(..) | T::LocVar(..) => t.clone(),
        T::Bang(ref u) => Rc::new(T::Bang(subst(u, from, to))),
        T::Fun(ref a, ref r) => Rc::new(T::Fun(subst(a, from, to), subst(r, from, to))),
        T::Record(ref fields) => Rc::new(T::Record(subst_entries(fields, from, to))),
        T::Tuple(ref ts) => Rc::new(T::Tuple(subst_all(ts, from, to))),
        T::Sum(ref cases) => Rc::new(T::Sum(subst_entries(cases, from, to))),
        T::Ref(ref l) => Rc::new(T::Ref(subst(l, from, to))),
        T::Cap(ref l, ref u) => Rc::new(T::Cap(subst(l, from, to), subst(u, from, to))),
        T::Stacked(ref a, ref b) => Rc::new(T::Stacked(subst(a, from, to), subst(b, from, to))),
        T::Rely(ref r, ref g) => Rc::new(T::Rely(subst(r, from, to), subst(g, from, to))),
        T::Guarantee(ref g, ref r) => {
            Rc::new(T::Guarantee(subst(g, from, to), subst(r, from, to)))
        }
        T::Star(ref ts) => Rc::new(T::Star(subst_all(ts, from, to))),
        T::Alt(ref ts) => Rc::new(T::Alt(subst_all(ts, from, to))),
        T::Isect(ref ts) => Rc::new(T::Isect(subst_all(ts, from, to))),
        T::Forall(ref name, ref body, ref bound) => {
            let inner_from = shift(from, 0, 1);
            let inner_to = shift(to, 0, 1);
            Rc::new(T::Forall(name.clone(), subst(body, &inner_from, &inner_to),
                              bound.as_ref().map(|b| subst(b, from, to))))
        }
        T::Exists(ref name, ref body, ref bound) => {
            let inner_from = shift(from, 0, 1);
            let inner_to = shift(to, 0, 1);
            Rc::new(T::Exists(name.clone(), subst(body, &inner_from, &inner_to),
                              bound.as_ref().map(|b| subst(b, from, to))))
        }
        T::Def(ref name, ref args) => Rc::new(T::Def(name.clone(), subst_all(args, from, to))),
    }
}

fn subst_all(ts: &[Ty], from: &Ty, to: &Ty) -> Vec<Ty> {
    ts.iter().map(|t| subst(t, from, to)).collect()
}

fn subst_entries(entries: &[(Name, Ty)], from: &Ty, to: &Ty) -> Vec<(Name, Ty)> {
    entries.iter().map(|&(ref n, ref t)| (n.clone(), subst(t, from, to))).collect()
}

/// Checks if the variable `x` occurs free in `t`.
pub fn is_free(x: &Ty, t: &Ty) -> bool {
    if **t == **x { return true; }
    match **t {
        T::Prim(..) | T::None | T::Top | T::TyVar(..) | T::LocVar(..) => false,
        T::Bang(ref u) | T::Ref(ref u) => is_free(x, u),
        T::Fun(ref a, ref b) | T::Cap(ref a, ref b) | T::Stacked(ref a, ref b) |
        T::Rely(ref a, ref b) | T::Guarantee(ref a, ref b) => is_free(x, a) || is_free(x, b),
        T::Record(ref entries) | T::Sum(ref entries) => {
            entries.iter().any(|&(_, ref t)| is_free(x, t))
        }
        T::Tuple(ref ts) | T::Star(ref ts) | T::Alt(ref ts) | T::Isect(ref ts) |
        T::Def(_, ref ts) => ts.iter().any(|t| is_free(x, t)),
        T::Forall(_, ref body, ref bound) | T::Exists(_, ref body, ref bound) => {
            is_free(&shift(x, 0, 1), body) ||
                bound.as_ref().map_or(false, |b| is_free(x, b))
        }
    }
}

/// The set of free variable indices of `t`, relative to its root.
pub fn index_set(t: &Ty) -> BTreeSet<u32> {
    fn go(t: &Ty, depth: u32, out: &mut BTreeSet<u32>) {
        match **t {
            T::Prim(..) | T::None | T::Top => {}
            T::TyVar(_, i) | T::LocVar(_, i) => {
                if i >= depth { out.insert(i - depth); }
            }
            T::Bang(ref u) | T::Ref(ref u) => go(u, depth, out),
            T::Fun(ref a, ref b) | T::Cap(ref a, ref b) | T::Stacked(ref a, ref b) |
            T::Rely(ref a, ref b) | T::Guarantee(ref a, ref b) => {
                go(a, depth, out);
                go(b, depth, out);
            }
            T::Record(ref entries) | T::Sum(ref entries) => {
                for &(_, ref t) in entries { go(t, depth, out); }
            }
            T::Tuple(ref ts) | T::Star(ref ts) | T::Alt(ref ts) | T::Isect(ref ts) |
            T::Def(_, ref ts) => {
                for t in ts { go(t, depth, out); }
            }
            T::Forall(_, ref body, ref bound) | T::Exists(_, ref body, ref bound) => {
                go(body, depth + 1, out);
                if let Some(ref b) = *bound { go(b, depth, out); }
            }
        }
    }

    let mut out = BTreeSet::new();
    go(t, 0, &mut out);
    out
}

/// Jointly renumbers the free variables of a configuration triple to the
/// dense prefix 0.. while keeping their relative order. Protocol stepping
/// opens binders as it goes; without this compaction a cyclic protocol
/// would keep producing configurations that differ only in unused indices
/// and the conformance search would never close.
pub fn reindex(s: &Ty, p: &Ty, q: &Ty) -> (Ty, Ty, Ty) {
    let mut set = index_set(s);
    set.extend(index_set(p));
    set.extend(index_set(q));
    if set.iter().cloned().eq(0..set.len() as u32) {
        return (s.clone(), p.clone(), q.clone());
    }
    let map: BTreeMap<u32, u32> =
        set.iter().enumerate().map(|(rank, &i)| (i, rank as u32)).collect();
    (remap(s, 0, &map), remap(p, 0, &map), remap(q, 0, &map))
}

fn remap(t: &Ty, depth: u32, map: &BTreeMap<u32, u32>) -> Ty {
    match **t {
        T::Prim(..) | T::None | T::Top => t.clone(),
        T::TyVar(ref name, i) => Rc::new(T::TyVar(name.clone(), remap_index(i, depth, map))),
        T::LocVar(ref name, i) => Rc::new(T::LocVar(name.clone(), remap_index(i, depth, map))),
        T::Bang(ref u) => Rc::new(T::Bang(remap(u, depth, map))),
        T::Fun(ref a, ref r) => Rc::new(T::Fun(remap(a, depth, map), remap(r, depth, map))),
        T::Record(ref fields) => Rc::new(T::Record(remap_entries(fields, depth, map))),
        T::Tuple(ref ts) => Rc::new(T::Tuple(remap_all(ts, depth, map))),
        T::Sum(ref cases) => Rc::new(T::Sum(remap_entries(cases, depth, map))),
        T::Ref(ref l) => Rc::new(T::Ref(remap(l, depth, map))),
        T::Cap(ref l, ref u) => Rc::new(T::Cap(remap(l, depth, map), remap(u, depth, map))),
        T::Stacked(ref a, ref b) => {
            Rc::new(T::Stacked(remap(a, depth, map), remap(b, depth, map)))
        }
        T::Rely(ref r, ref g) => Rc::new(T::Rely(remap(r, depth, map), remap(g, depth, map))),
        T::Guarantee(ref g, ref r) => {
            Rc::new(T::Guarantee(remap(g, depth, map), remap(r, depth, map)))
        }
        T::Star(ref ts) => Rc::new(T::Star(remap_all(ts, depth, map))),
        T::Alt(ref ts) => Rc::new(T::Alt(remap_all(ts, depth, map))),
        T::Isect(ref ts) => Rc::new(T::Isect(remap_all(ts, depth, map))),
        T::Forall(ref name, ref body, ref bound) => {
            Rc::new(T::Forall(name.clone(), remap(body, depth + 1, map),
                              bound.as_ref().map(|b| remap(b, depth, map))))
        }
        T::Exists(ref name, ref body, ref bound) => {
            Rc::new(T::Exists(name.clone(), remap(body, depth + 1, map),
                              bound.as_ref().map(|b| remap(b, depth, map))))
        }
        T::Def(ref name, ref args) => Rc::new(T::Def(name.clone(), remap_all(args, depth, map))),
    }
}

fn remap_index(i: u32, depth: u32, map: &BTreeMap<u32, u32>) -> u32 {
    if i < depth {
        i
    } else {
        depth + map[&(i - depth)]
    }
}

fn remap_all(ts: &[Ty], depth: u32, map: &BTreeMap<u32, u32>) -> Vec<Ty> {
    ts.iter().map(|t| remap(t, depth, map)).collect()
}

fn remap_entries(entries: &[(Name, Ty)], depth: u32, map: &BTreeMap<u32, u32>) -> Vec<(Name, Ty)> {
    entries.iter().map(|&(ref n, ref t)| (n.clone(), remap(t, depth, map))).collect()
}

/// Unfolds `t` until its head is no longer a definition reference.
pub fn unfold(defs: &Defs, t: &Ty) -> Ty {
    let mut t = t.clone();
    loop {
        let next = match *t {
            T::Def(ref name, ref args) => unfold_def(defs, name, args),
            _ => return t,
        };
        t = next;
    }
}

/// Replaces one definition reference with its body. With `n` parameters the
/// body refers to parameter `i` as index `n - 1 - i`; each argument is
/// lifted over all `n` binders before substitution and the result is shifted
/// back down once every parameter is gone.
pub fn unfold_def(defs: &Defs, name: &Name, args: &[Ty]) -> Ty {
    let def = match defs.get(name) {
        Some(def) => def,
        None => panic!("unfolding unregistered definition {:?}", name),
    };
    assert_eq!(def.params.len(), args.len(),
               "definition {:?} unfolded with wrong arity", name);
    let body = match def.body {
        Some(ref body) => body,
        None => panic!("unfolding definition {:?} before its body is checked", name),
    };

    let n = args.len();
    let mut t = body.clone();
    for (i, arg) in args.iter().enumerate().rev() {
        let index = (n - 1 - i) as u32;
        let var = T::var(def.params[i].0.clone(), index);
        t = subst(&t, &var, &shift(arg, 0, n as i32));
    }
    shift(&t, 0, -(n as i32))
}

/// Checks if `t` is protocol-shaped: `none`, a rely step, or a composite
/// made entirely of protocols. Definitions are unfolded with a seen set so
/// recursive protocols classify in finite time.
pub fn is_protocol(defs: &Defs, t: &Ty) -> bool {
    fn go(defs: &Defs, t: &Ty, seen: &mut HashSet<Ty>) -> bool {
        if t.flags().contains(F_PROTO) { return true; }
        match **t {
            T::None | T::Rely(..) => true,
            T::Exists(_, ref body, _) => go(defs, body, seen),
            T::Star(ref es) | T::Alt(ref es) | T::Isect(ref es) => {
                es.iter().all(|e| go(defs, e, seen))
            }
            T::Def(..) => {
                if !seen.insert(t.clone()) { return true; }
                let unfolded = unfold(defs, t);
                go(defs, &unfolded, seen)
            }
            _ => false,
        }
    }

    go(defs, t, &mut HashSet::new())
}

/// Semantic equality: multisets compare up to permutation and definitions
/// are unfolded coinductively.
pub fn equals(defs: &Defs, a: &Ty, b: &Ty) -> bool {
    trace!("equals {:?} == {:?}", a, b);
    eq_rec(defs, a, b, &mut Trail::new())
}

fn eq_rec(defs: &Defs, a: &Ty, b: &Ty, trail: &mut Trail) -> bool {
    match (&**a, &**b) {
        (&T::Def(..), _) | (_, &T::Def(..)) => {
            // same head with equal arguments needs no unfolding; test it on a
            // tentative trail so a failed attempt leaves no assumptions behind
            if let (&T::Def(ref n1, ref args1), &T::Def(ref n2, ref args2)) = (&**a, &**b) {
                if n1 == n2 && args1.len() == args2.len() {
                    let mut tentative = trail.clone();
                    if args1.iter().zip(args2.iter())
                            .all(|(x, y)| eq_rec(defs, x, y, &mut tentative)) {
                        *trail = tentative;
                        return true;
                    }
                }
            }
            let pair = (a.clone(), b.clone());
            if trail.contains(&pair) { return true; }
            // the unfolding also runs on a tentative trail, committed only on
            // success; otherwise a failed comparison would leave its pair
            // behind and a later retry would assume it holds
            let mut tentative = trail.clone();
            tentative.insert(pair);
            let ua = unfold(defs, a);
            let ub = unfold(defs, b);
            if eq_rec(defs, &ua, &ub, &mut tentative) {
                *trail = tentative;
                true
            } else {
                false
            }
        }
        (&T::Prim(ref n1), &T::Prim(ref n2)) => n1 == n2,
        (&T::None, &T::None) => true,
        (&T::Top, &T::Top) => true,
        (&T::Bang(ref x), &T::Bang(ref y)) => eq_rec(defs, x, y, trail),
        (&T::Fun(ref a1, ref r1), &T::Fun(ref a2, ref r2)) => {
            eq_rec(defs, a1, a2, trail) && eq_rec(defs, r1, r2, trail)
        }
        (&T::Record(ref e1), &T::Record(ref e2)) | (&T::Sum(ref e1), &T::Sum(ref e2)) => {
            e1.len() == e2.len() && e1.iter().all(|&(ref name, ref v1)| {
                match e2.iter().find(|&&(ref n2, _)| n2 == name) {
                    Some(&(_, ref v2)) => eq_rec(defs, v1, v2, trail),
                    None => false,
                }
            })
        }
        (&T::Tuple(ref xs), &T::Tuple(ref ys)) => {
            xs.len() == ys.len() &&
                xs.iter().zip(ys.iter()).all(|(x, y)| eq_rec(defs, x, y, trail))
        }
        (&T::Ref(ref l1), &T::Ref(ref l2)) => eq_rec(defs, l1, l2, trail),
        (&T::Cap(ref l1, ref v1), &T::Cap(ref l2, ref v2)) => {
            eq_rec(defs, l1, l2, trail) && eq_rec(defs, v1, v2, trail)
        }
        (&T::Stacked(ref x1, ref y1), &T::Stacked(ref x2, ref y2)) |
        (&T::Rely(ref x1, ref y1), &T::Rely(ref x2, ref y2)) |
        (&T::Guarantee(ref x1, ref y1), &T::Guarantee(ref x2, ref y2)) => {
            eq_rec(defs, x1, x2, trail) && eq_rec(defs, y1, y2, trail)
        }
        (&T::Star(ref xs), &T::Star(ref ys)) |
        (&T::Alt(ref xs), &T::Alt(ref ys)) |
        (&T::Isect(ref xs), &T::Isect(ref ys)) => {
            xs.len() == ys.len() &&
                multiset_match(xs, ys, &mut |x, y, trail| eq_rec(defs, x, y, trail), trail)
        }
        (&T::Forall(_, ref b1, ref d1), &T::Forall(_, ref b2, ref d2)) |
        (&T::Exists(_, ref b1, ref d1), &T::Exists(_, ref b2, ref d2)) => {
            opt_eq(defs, d1, d2, trail) && eq_rec(defs, b1, b2, trail)
        }
        (&T::TyVar(_, i), &T::TyVar(_, j)) => i == j,
        (&T::LocVar(_, i), &T::LocVar(_, j)) => i == j,
        (_, _) => false,
    }
}

fn opt_eq(defs: &Defs, a: &Option<Ty>, b: &Option<Ty>, trail: &mut Trail) -> bool {
    match (a, b) {
        (&None, &None) => true,
        (&Some(ref x), &Some(ref y)) => eq_rec(defs, x, y, trail),
        (_, _) => false,
    }
}

/// Matches every element of `xs` against a distinct element of `ys`,
/// backtracking over the assignment. `xs` may be shorter than `ys`.
fn multiset_match<F>(xs: &[Ty], ys: &[Ty], f: &mut F, trail: &mut Trail) -> bool
    where F: FnMut(&Ty, &Ty, &mut Trail) -> bool
{
    fn go<F>(xs: &[Ty], i: usize, ys: &[Ty], used: &mut [bool], f: &mut F,
             trail: &mut Trail) -> bool
        where F: FnMut(&Ty, &Ty, &mut Trail) -> bool
    {
        if i == xs.len() { return true; }
        for j in 0..ys.len() {
            if used[j] { continue; }
            if f(&xs[i], &ys[j], trail) {
                used[j] = true;
                if go(xs, i + 1, ys, used, f, trail) { return true; }
                used[j] = false;
            }
        }
        false
    }

    if xs.len() > ys.len() { return false; }
    let mut used = vec![false; ys.len()];
    go(xs, 0, ys, &mut used, f, trail)
}

/// Subtyping. Semantic equality short-circuits first; definitions unfold
/// under the trail like in `equals`.
pub fn subtype(defs: &Defs, a: &Ty, b: &Ty) -> bool {
    trace!("subtype {:?} <: {:?}", a, b);
    sub_rec(defs, a, b, &mut Trail::new())
}

fn sub_rec(defs: &Defs, a: &Ty, b: &Ty, trail: &mut Trail) -> bool {
    if eq_rec(defs, a, b, &mut Trail::new()) { return true; }
    match (&**a, &**b) {
        (&T::Def(..), _) | (_, &T::Def(..)) => {
            let pair = (a.clone(), b.clone());
            if trail.contains(&pair) { return true; }
            // commit the trail only on success, as in eq_rec
            let mut tentative = trail.clone();
            tentative.insert(pair);
            let ua = unfold(defs, a);
            let ub = unfold(defs, b);
            if sub_rec(defs, &ua, &ub, &mut tentative) {
                *trail = tentative;
                true
            } else {
                false
            }
        }

        // a bare location is not a value, so it has no place under top
        (&T::LocVar(..), &T::Top) => false,
        (_, &T::Top) => true,

        (&T::Bang(ref x), &T::Bang(ref y)) => sub_rec(defs, x, y, trail),
        (&T::Bang(ref x), _) => sub_rec(defs, x, b, trail),
        (_, &T::Bang(ref y)) => a.is_pure() && sub_rec(defs, a, y, trail),

        (&T::Fun(ref a1, ref r1), &T::Fun(ref a2, ref r2)) => {
            sub_rec(defs, a2, a1, trail) && sub_rec(defs, r1, r2, trail)
        }
        (&T::Record(ref f1), &T::Record(ref f2)) => {
            // dropping every field would silently discard linear state;
            // the equals short-circuit has already let [] <: [] through
            if f2.is_empty() { return false; }
            f2.iter().all(|&(ref name, ref v2)| {
                match f1.iter().find(|&&(ref n1, _)| n1 == name) {
                    Some(&(_, ref v1)) => sub_rec(defs, v1, v2, trail),
                    None => false,
                }
            })
        }
        (&T::Tuple(ref xs), &T::Tuple(ref ys)) => {
            xs.len() == ys.len() &&
                xs.iter().zip(ys.iter()).all(|(x, y)| sub_rec(defs, x, y, trail))
        }
        (&T::Sum(ref c1), &T::Sum(ref c2)) => {
            c1.iter().all(|&(ref tag, ref v1)| {
                match c2.iter().find(|&&(ref t2, _)| t2 == tag) {
                    Some(&(_, ref v2)) => sub_rec(defs, v1, v2, trail),
                    None => false,
                }
            })
        }
        (&T::Ref(ref l1), &T::Ref(ref l2)) => eq_rec(defs, l1, l2, &mut Trail::new()),
        (&T::Cap(ref l1, ref v1), &T::Cap(ref l2, ref v2)) => {
            eq_rec(defs, l1, l2, &mut Trail::new()) && sub_rec(defs, v1, v2, trail)
        }
        (&T::Stacked(ref x1, ref y1), &T::Stacked(ref x2, ref y2)) => {
            sub_rec(defs, x1, x2, trail) && sub_rec(defs, y1, y2, trail)
        }
        (&T::Rely(ref r1, ref g1), &T::Rely(ref r2, ref g2)) => {
            sub_rec(defs, r1, r2, trail) && sub_rec(defs, g1, g2, trail)
        }
        (&T::Guarantee(ref g1, ref r1), &T::Guarantee(ref g2, ref r2)) => {
            sub_rec(defs, g1, g2, trail) && sub_rec(defs, r1, r2, trail)
        }

        (&T::Star(ref xs), &T::Star(ref ys)) => {
            xs.len() == ys.len() &&
                multiset_match(xs, ys, &mut |x, y, trail| sub_rec(defs, x, y, trail), trail)
        }
        (&T::Alt(ref xs), &T::Alt(ref ys)) => {
            multiset_match(xs, ys, &mut |x, y, trail| sub_rec(defs, x, y, trail), trail)
        }
        (&T::Isect(ref xs), &T::Isect(ref ys)) => {
            multiset_match(ys, xs, &mut |y, x, trail| sub_rec(defs, x, y, trail), trail)
        }

        (&T::Forall(_, ref b1, ref d1), &T::Forall(_, ref b2, ref d2)) |
        (&T::Exists(_, ref b1, ref d1), &T::Exists(_, ref b2, ref d2)) => {
            opt_eq(defs, d1, d2, &mut Trail::new()) && sub_rec(defs, b1, b2, trail)
        }
        (&T::Forall(ref name, ref body, ref bound), _) => {
            // pick an instantiation that makes the body match the supertype
            let x = T::var(name.clone(), 0);
            let target = shift(b, 0, 1);
            match unify(defs, &x, body, &target) {
                Unify::No => false,
                Unify::Free => true,
                Unify::To(w) => witness_in_bound(defs, &w, bound, trail),
            }
        }
        (_, &T::Exists(ref name, ref body, ref bound)) => {
            let x = T::var(name.clone(), 0);
            let target = shift(a, 0, 1);
            match unify(defs, &x, body, &target) {
                Unify::No => false,
                Unify::Free => true,
                Unify::To(w) => witness_in_bound(defs, &w, bound, trail),
            }
        }

        (&T::Isect(ref xs), _) => xs.iter().any(|x| sub_rec(defs, x, b, trail)),
        (_, &T::Alt(ref ys)) => ys.iter().any(|y| sub_rec(defs, a, y, trail)),

        (_, _) => false,
    }
}

fn witness_in_bound(defs: &Defs, w: &Ty, bound: &Option<Ty>, trail: &mut Trail) -> bool {
    match *bound {
        None => true,
        Some(ref bound) => {
            // the witness came from a target lifted over the binder
            let w = shift(w, 0, -1);
            sub_rec(defs, &w, bound, trail)
        }
    }
}

/// The result of matching a pattern with one flexible variable against a
/// target.
#[derive(Clone, PartialEq, Debug)]
pub enum Unify {
    /// The shapes cannot be made to match.
    No,
    /// The shapes match without constraining the variable.
    Free,
    /// The shapes match exactly when the variable is this witness.
    To(Ty),
}

/// Matches `pattern` against `target`, solving for the single variable `x`.
/// Occurrences in different positions must produce equal witnesses.
pub fn unify(defs: &Defs, x: &Ty, pattern: &Ty, target: &Ty) -> Unify {
    trace!("unify {:?} in {:?} against {:?}", x, pattern, target);
    uni_rec(defs, x, pattern, target, &mut Trail::new())
}

fn uni_combine(defs: &Defs, r1: Unify, r2: Unify) -> Unify {
    match (r1, r2) {
        (Unify::No, _) | (_, Unify::No) => Unify::No,
        (Unify::Free, r) => r,
        (r, Unify::Free) => r,
        (Unify::To(w1), Unify::To(w2)) => {
            if equals(defs, &w1, &w2) { Unify::To(w1) } else { Unify::No }
        }
    }
}

fn uni_rec(defs: &Defs, x: &Ty, pattern: &Ty, target: &Ty, trail: &mut Trail) -> Unify {
    if **pattern == **x { return Unify::To(target.clone()); }
    match (&**pattern, &**target) {
        (&T::Def(..), _) | (_, &T::Def(..)) => {
            if let (&T::Def(ref n1, ref args1), &T::Def(ref n2, ref args2)) =
                    (&**pattern, &**target) {
                if n1 == n2 && args1.len() == args2.len() {
                    let mut tentative = trail.clone();
                    let mut result = Unify::Free;
                    for (pa, ta) in args1.iter().zip(args2.iter()) {
                        let arg = uni_rec(defs, x, pa, ta, &mut tentative);
                        result = uni_combine(defs, result, arg);
                        if result == Unify::No { break; }
                    }
                    if result != Unify::No {
                        *trail = tentative;
                        return result;
                    }
                }
            }
            let pair = (pattern.clone(), target.clone());
            if trail.contains(&pair) { return Unify::Free; }
            // commit the trail only on success, as in eq_rec
            let mut tentative = trail.clone();
            tentative.insert(pair);
            let up = unfold(defs, pattern);
            let ut = unfold(defs, target);
            let result = uni_rec(defs, x, &up, &ut, &mut tentative);
            if result != Unify::No { *trail = tentative; }
            result
        }
        (&T::Prim(ref n1), &T::Prim(ref n2)) => {
            if n1 == n2 { Unify::Free } else { Unify::No }
        }
        (&T::None, &T::None) => Unify::Free,
        (&T::Top, &T::Top) => Unify::Free,
        (&T::Bang(ref p), &T::Bang(ref t)) => uni_rec(defs, x, p, t, trail),
        (&T::Fun(ref p1, ref p2), &T::Fun(ref t1, ref t2)) |
        (&T::Cap(ref p1, ref p2), &T::Cap(ref t1, ref t2)) |
        (&T::Stacked(ref p1, ref p2), &T::Stacked(ref t1, ref t2)) |
        (&T::Rely(ref p1, ref p2), &T::Rely(ref t1, ref t2)) |
        (&T::Guarantee(ref p1, ref p2), &T::Guarantee(ref t1, ref t2)) => {
            let r1 = uni_rec(defs, x, p1, t1, trail);
            if r1 == Unify::No { return Unify::No; }
            let r2 = uni_rec(defs, x, p2, t2, trail);
            uni_combine(defs, r1, r2)
        }
        (&T::Record(ref e1), &T::Record(ref e2)) | (&T::Sum(ref e1), &T::Sum(ref e2)) => {
            if e1.len() != e2.len() { return Unify::No; }
            let mut result = Unify::Free;
            for &(ref name, ref p) in e1 {
                let t = match e2.iter().find(|&&(ref n2, _)| n2 == name) {
                    Some(&(_, ref t)) => t,
                    None => return Unify::No,
                };
                let r = uni_rec(defs, x, p, t, trail);
                result = uni_combine(defs, result, r);
                if result == Unify::No { return Unify::No; }
            }
            result
        }
        (&T::Tuple(ref ps), &T::Tuple(ref ts)) => {
            if ps.len() != ts.len() { return Unify::No; }
            let mut result = Unify::Free;
            for (p, t) in ps.iter().zip(ts.iter()) {
                let r = uni_rec(defs, x, p, t, trail);
                result = uni_combine(defs, result, r);
                if result == Unify::No { return Unify::No; }
            }
            result
        }
        (&T::Ref(ref p), &T::Ref(ref t)) => uni_rec(defs, x, p, t, trail),
        (&T::Star(ref ps), &T::Star(ref ts)) |
        (&T::Alt(ref ps), &T::Alt(ref ts)) |
        (&T::Isect(ref ps), &T::Isect(ref ts)) => uni_multiset(defs, x, ps, ts, trail),
        (&T::Forall(_, ref p, ref d1), &T::Forall(_, ref t, ref d2)) |
        (&T::Exists(_, ref p, ref d1), &T::Exists(_, ref t, ref d2)) => {
            match (d1, d2) {
                (&None, &None) => {}
                (&Some(ref b1), &Some(ref b2)) => {
                    if !equals(defs, b1, b2) { return Unify::No; }
                }
                (_, _) => return Unify::No,
            }
            let inner_x = shift(x, 0, 1);
            match uni_rec(defs, &inner_x, p, t, trail) {
                Unify::No => Unify::No,
                Unify::Free => Unify::Free,
                Unify::To(w) => {
                    // the witness may not capture the binder it was found under
                    if index_set(&w).contains(&0) {
                        Unify::No
                    } else {
                        Unify::To(shift(&w, 0, -1))
                    }
                }
            }
        }
        (&T::TyVar(_, i), &T::TyVar(_, j)) | (&T::LocVar(_, i), &T::LocVar(_, j)) => {
            if i == j { Unify::Free } else { Unify::No }
        }
        (_, _) => Unify::No,
    }
}

/// The multiset rule: cancel elements that are already equal, then the
/// remaining pattern elements must all be one repeated pattern and the
/// remaining target elements must divide evenly among its copies with a
/// single consistent witness.
fn uni_multiset(defs: &Defs, x: &Ty, ps: &[Ty], ts: &[Ty], trail: &mut Trail) -> Unify {
    let mut used = vec![false; ts.len()];
    let mut left = Vec::new();
    for p in ps {
        let mut cancelled = false;
        for (j, t) in ts.iter().enumerate() {
            if !used[j] && equals(defs, p, t) {
                used[j] = true;
                cancelled = true;
                break;
            }
        }
        if !cancelled { left.push(p); }
    }
    let leftover: Vec<&Ty> =
        ts.iter().enumerate().filter(|&(j, _)| !used[j]).map(|(_, t)| t).collect();

    if left.is_empty() {
        return if leftover.is_empty() { Unify::Free } else { Unify::No };
    }
    let rep = left[0];
    if !left.iter().all(|p| equals(defs, p, rep)) { return Unify::No; }
    if leftover.is_empty() || leftover.len() % left.len() != 0 { return Unify::No; }

    let mut result = Unify::Free;
    for t in leftover {
        let r = uni_rec(defs, x, rep, t, trail);
        result = uni_combine(defs, result, r);
        if result == Unify::No { return Unify::No; }
    }
    result
}
