//! The type representation.

use std::fmt;
use std::rc::Rc;
use std::hash::{Hash, Hasher};

use caper_syntax::Name;

pub use self::flags::*;

pub mod flags {
    bitflags! {
        /// Quick facts about a type, computed structurally.
        pub flags Flags: u8 {
            const F_NONE  = 0b00,
            /// The type may be freely duplicated and dropped, so `T <: !T`.
            const F_PURE  = 0b01,
            /// The type is protocol-shaped without consulting definitions.
            const F_PROTO = 0b10,
        }
    }
}

/// The kind of a variable: locations and types live in the same De Bruijn
/// index space but never unify with each other.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VarKind {
    Ty,
    Loc,
}

impl VarKind {
    /// The kind a name denotes, per the capitalization convention.
    pub fn of(name: &Name) -> VarKind {
        if name.is_type_name() { VarKind::Ty } else { VarKind::Loc }
    }
}

/// A type. Always handled behind `Ty` and immutable once built.
///
/// Bound variables are De Bruijn indices counting enclosing `Forall`/`Exists`
/// binders (and, at the top level, `Gamma` binder frames). The `Name` in
/// `TyVar`/`LocVar` and on binders is display-only; equality and hashing
/// ignore it. `PartialEq` here is *strict structural identity* (element
/// lists compared in order), which is what the coinductive trails key on;
/// semantic equality up to permutation and unfolding is `ops::equals`.
#[derive(Clone)]
pub enum T {
    /// A primitive type, e.g. `int`.
    Prim(Name),
    /// The empty resource.
    None,
    /// The universal supertype (of everything but bare locations).
    Top,
    /// An unrestricted type `!T`.
    Bang(Ty),
    /// A linear function.
    Fun(Ty, Ty),
    /// A record; labels are unique.
    Record(Vec<(Name, Ty)>),
    /// A tuple.
    Tuple(Vec<Ty>),
    /// A tagged sum; tags are unique.
    Sum(Vec<(Name, Ty)>),
    /// A reference to a location (the inner `Ty` is always a `LocVar`).
    Ref(Ty),
    /// A read-write capability for a location, `rw l T`.
    Cap(Ty, Ty),
    /// `T :: U`, a value stacked on top of a capability.
    Stacked(Ty, Ty),
    /// A protocol step `R => G`: relies on the state `R`, then behaves as `G`.
    Rely(Ty, Ty),
    /// `G ; R`: guarantees the state `G`, then resumes relying as `R`.
    Guarantee(Ty, Ty),
    /// Separate composition (a multiset).
    Star(Vec<Ty>),
    /// Alternatives (a multiset).
    Alt(Vec<Ty>),
    /// Intersection (a multiset).
    Isect(Vec<Ty>),
    /// Universal quantification with an optional bound.
    Forall(Name, Ty, Option<Ty>),
    /// Existential quantification with an optional bound.
    Exists(Name, Ty, Option<Ty>),
    /// A type variable.
    TyVar(Name, u32),
    /// A location variable.
    LocVar(Name, u32),
    /// A reference to a named definition, possibly applied.
    Def(Name, Vec<Ty>),
}

pub type Ty = Rc<T>;

impl T {
    pub fn none() -> Ty {
        Rc::new(T::None)
    }

    pub fn top() -> Ty {
        Rc::new(T::Top)
    }

    /// A variable of the kind the name's capitalization denotes.
    pub fn var(name: Name, index: u32) -> Ty {
        match VarKind::of(&name) {
            VarKind::Ty => Rc::new(T::TyVar(name, index)),
            VarKind::Loc => Rc::new(T::LocVar(name, index)),
        }
    }

    /// Builds a record, rejecting a duplicated label.
    pub fn record(fields: Vec<(Name, Ty)>) -> Result<Ty, Name> {
        T::check_labels(&fields)?;
        Ok(Rc::new(T::Record(fields)))
    }

    /// Builds a sum, rejecting a duplicated tag.
    pub fn sum(cases: Vec<(Name, Ty)>) -> Result<Ty, Name> {
        T::check_labels(&cases)?;
        Ok(Rc::new(T::Sum(cases)))
    }

    fn check_labels(entries: &[(Name, Ty)]) -> Result<(), Name> {
        for (i, &(ref name, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|&(ref prev, _)| prev == name) {
                return Err(name.clone());
            }
        }
        Ok(())
    }

    pub fn flags(&self) -> Flags {
        match *self {
            T::Prim(..) | T::Ref(..) => F_PURE,
            T::Record(ref fields) if fields.is_empty() => F_PURE,
            T::None | T::Rely(..) => F_PROTO,
            T::Exists(_, ref body, _) => body.flags() & F_PROTO,
            T::Star(ref es) | T::Alt(ref es) | T::Isect(ref es) => {
                if es.iter().all(|e| e.flags().contains(F_PROTO)) { F_PROTO } else { F_NONE }
            }
            _ => F_NONE,
        }
    }

    /// Whether the type may be narrowed into a `!` type (`T <: !T`).
    pub fn is_pure(&self) -> bool {
        self.flags().contains(F_PURE)
    }
}

impl PartialEq for T {
    fn eq(&self, other: &T) -> bool {
        match (self, other) {
            (&T::Prim(ref a), &T::Prim(ref b)) => a == b,
            (&T::None, &T::None) => true,
            (&T::Top, &T::Top) => true,
            (&T::Bang(ref a), &T::Bang(ref b)) => a == b,
            (&T::Fun(ref a1, ref r1), &T::Fun(ref a2, ref r2)) => a1 == a2 && r1 == r2,
            (&T::Record(ref a), &T::Record(ref b)) => a == b,
            (&T::Tuple(ref a), &T::Tuple(ref b)) => a == b,
            (&T::Sum(ref a), &T::Sum(ref b)) => a == b,
            (&T::Ref(ref a), &T::Ref(ref b)) => a == b,
            (&T::Cap(ref l1, ref t1), &T::Cap(ref l2, ref t2)) => l1 == l2 && t1 == t2,
            (&T::Stacked(ref a1, ref b1), &T::Stacked(ref a2, ref b2)) => a1 == a2 && b1 == b2,
            (&T::Rely(ref a1, ref b1), &T::Rely(ref a2, ref b2)) => a1 == a2 && b1 == b2,
            (&T::Guarantee(ref a1, ref b1), &T::Guarantee(ref a2, ref b2)) => {
                a1 == a2 && b1 == b2
            }
            (&T::Star(ref a), &T::Star(ref b)) => a == b,
            (&T::Alt(ref a), &T::Alt(ref b)) => a == b,
            (&T::Isect(ref a), &T::Isect(ref b)) => a == b,
            (&T::Forall(_, ref b1, ref d1), &T::Forall(_, ref b2, ref d2)) => {
                b1 == b2 && d1 == d2
            }
            (&T::Exists(_, ref b1, ref d1), &T::Exists(_, ref b2, ref d2)) => {
                b1 == b2 && d1 == d2
            }
            (&T::TyVar(_, i), &T::TyVar(_, j)) => i == j,
            (&T::LocVar(_, i), &T::LocVar(_, j)) => i == j,
            (&T::Def(ref n1, ref a1), &T::Def(ref n2, ref a2)) => n1 == n2 && a1 == a2,
            (_, _) => false,
        }
    }
}

impl Eq for T {}

impl Hash for T {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fn hash_entries<H: Hasher>(entries: &[(Name, Ty)], state: &mut H) {
            state.write_usize(entries.len());
            for &(ref name, ref ty) in entries {
                name.hash(state);
                ty.hash(state);
            }
        }

        match *self {
            T::Prim(ref n) => { state.write_u8(0); n.hash(state); }
            T::None => state.write_u8(1),
            T::Top => state.write_u8(2),
            T::Bang(ref t) => { state.write_u8(3); t.hash(state); }
            T::Fun(ref a, ref r) => { state.write_u8(4); a.hash(state); r.hash(state); }
            T::Record(ref fields) => { state.write_u8(5); hash_entries(fields, state); }
            T::Tuple(ref ts) => { state.write_u8(6); ts.hash(state); }
            T::Sum(ref cases) => { state.write_u8(7); hash_entries(cases, state); }
            T::Ref(ref l) => { state.write_u8(8); l.hash(state); }
            T::Cap(ref l, ref t) => { state.write_u8(9); l.hash(state); t.hash(state); }
            T::Stacked(ref a, ref b) => { state.write_u8(10); a.hash(state); b.hash(state); }
            T::Rely(ref a, ref b) => { state.write_u8(11); a.hash(state); b.hash(state); }
            T::Guarantee(ref a, ref b) => { state.write_u8(12); a.hash(state); b.hash(state); }
            T::Star(ref ts) => { state.write_u8(13); ts.hash(state); }
            T::Alt(ref ts) => { state.write_u8(14); ts.hash(state); }
            T::Isect(ref ts) => { state.write_u8(15); ts.hash(state); }
            T::Forall(_, ref body, ref bound) => {
                state.write_u8(16);
                body.hash(state);
                bound.hash(state);
            }
            T::Exists(_, ref body, ref bound) => {
                state.write_u8(17);
                body.hash(state);
                bound.hash(state);
            }
            T::TyVar(_, i) => { state.write_u8(18); state.write_u32(i); }
            T::LocVar(_, i) => { state.write_u8(19); state.write_u32(i); }
            T::Def(ref n, ref args) => { state.write_u8(20); n.hash(state); args.hash(state); }
        }
    }
}

impl fmt::Debug for T {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub mod ops;
mod display;

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use caper_syntax::Name;
    use super::*;

    fn prim(name: &str) -> Ty {
        Rc::new(T::Prim(Name::from(name)))
    }

    #[test]
    fn test_names_are_cosmetic() {
        assert_eq!(*T::var(Name::from("X"), 3), *T::var(Name::from("Y"), 3));
        assert_ne!(*T::var(Name::from("X"), 3), *T::var(Name::from("X"), 4));
        // a type variable never equals a location variable
        assert_ne!(*T::var(Name::from("X"), 0), *T::var(Name::from("x"), 0));

        let a = T::Forall(Name::from("X"), T::var(Name::from("X"), 0), None);
        let b = T::Forall(Name::from("Y"), T::var(Name::from("Y"), 0), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_strict_eq_is_order_sensitive() {
        let ab = T::Star(vec![prim("int"), prim("boolean")]);
        let ba = T::Star(vec![prim("boolean"), prim("int")]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_builders_reject_duplicates() {
        let fields = vec![(Name::from("f"), prim("int")), (Name::from("f"), prim("boolean"))];
        assert_eq!(T::record(fields), Err(Name::from("f")));
        let cases = vec![(Name::from("a"), prim("int")), (Name::from("b"), prim("int"))];
        assert!(T::sum(cases).is_ok());
    }

    #[test]
    fn test_flags() {
        assert!(prim("int").is_pure());
        assert!(Rc::new(T::Ref(T::var(Name::from("q"), 0))).is_pure());
        assert!(T::record(vec![]).unwrap().is_pure());
        assert!(!Rc::new(T::Fun(prim("int"), prim("int"))).is_pure());
        assert!(!T::none().is_pure());

        assert!(T::none().flags().contains(F_PROTO));
        let step = Rc::new(T::Rely(prim("int"), prim("int")));
        assert!(step.flags().contains(F_PROTO));
        assert!(Rc::new(T::Star(vec![step.clone(), T::none()])).flags().contains(F_PROTO));
        assert!(!Rc::new(T::Star(vec![step, prim("int")])).flags().contains(F_PROTO));
    }
}
