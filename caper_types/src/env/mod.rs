//! The typing environment.
//!
//! `Gamma` is a persistent chain of frames sharing their tails through `Rc`,
//! so extending a scope never invalidates an older handle; the conformance
//! engine and the quantifier rules backtrack by simply dropping the newer
//! environment. Binder frames (type and location variables) double as the
//! De Bruijn spine: an index counts binder frames outward, skipping value
//! bindings.

use std::rc::Rc;

use caper_syntax::Name;
use ty::{Ty, VarKind};
use ty::ops::shift;

#[derive(Clone, PartialEq, Debug)]
pub enum Slot {
    /// A linear value binding.
    Value(Ty),
    /// A type variable binder with an optional bound.
    TyVar(Option<Ty>),
    /// A location variable binder with an optional bound.
    LocVar(Option<Ty>),
}

impl Slot {
    fn is_var(&self) -> bool {
        match *self {
            Slot::Value(..) => false,
            Slot::TyVar(..) | Slot::LocVar(..) => true,
        }
    }
}

#[derive(Debug)]
struct Frame {
    name: Name,
    slot: Slot,
    next: Option<Rc<Frame>>,
}

#[derive(Clone, Debug)]
pub struct Gamma {
    head: Option<Rc<Frame>>,
}

impl Gamma {
    pub fn new() -> Gamma {
        Gamma { head: None }
    }

    pub fn push_value(&self, name: Name, ty: Ty) -> Gamma {
        self.push(name, Slot::Value(ty))
    }

    pub fn push_var(&self, name: Name, kind: VarKind, bound: Option<Ty>) -> Gamma {
        let slot = match kind {
            VarKind::Ty => Slot::TyVar(bound),
            VarKind::Loc => Slot::LocVar(bound),
        };
        self.push(name, slot)
    }

    fn push(&self, name: Name, slot: Slot) -> Gamma {
        Gamma {
            head: Some(Rc::new(Frame { name: name, slot: slot, next: self.head.clone() })),
        }
    }

    /// The current De Bruijn depth, i.e. the number of binder frames.
    pub fn depth(&self) -> u32 {
        let mut depth = 0;
        let mut cur = &self.head;
        while let Some(ref frame) = *cur {
            if frame.slot.is_var() { depth += 1; }
            cur = &frame.next;
        }
        depth
    }

    /// A non-consuming peek at a value binding. An intervening binder of
    /// the same name shadows it.
    pub fn value_of(&self, name: &Name) -> Option<Ty> {
        let mut cur = &self.head;
        while let Some(ref frame) = *cur {
            if frame.name == *name {
                return match frame.slot {
                    Slot::Value(ref ty) => Some(ty.clone()),
                    _ => None,
                };
            }
            cur = &frame.next;
        }
        None
    }

    /// Consumes a value binding: returns it together with the environment
    /// that no longer contains it. Linear use sites call this exactly once.
    pub fn take_value(&self, name: &Name) -> Option<(Ty, Gamma)> {
        let mut prefix: Vec<Rc<Frame>> = Vec::new();
        let mut cur = self.head.clone();
        while let Some(frame) = cur {
            if frame.name == *name {
                let ty = match frame.slot {
                    Slot::Value(ref ty) => ty.clone(),
                    _ => return None,
                };
                let mut gamma = Gamma { head: frame.next.clone() };
                for f in prefix.into_iter().rev() {
                    gamma = gamma.push(f.name.clone(), f.slot.clone());
                }
                return Some((ty, gamma));
            }
            prefix.push(frame.clone());
            cur = frame.next.clone();
        }
        None
    }

    /// Resolves a name to its binder kind and De Bruijn index.
    pub fn var_index(&self, name: &Name) -> Option<(VarKind, u32)> {
        let mut index = 0;
        let mut cur = &self.head;
        while let Some(ref frame) = *cur {
            if frame.name == *name {
                return match frame.slot {
                    Slot::TyVar(..) => Some((VarKind::Ty, index)),
                    Slot::LocVar(..) => Some((VarKind::Loc, index)),
                    Slot::Value(..) => None,
                };
            }
            if frame.slot.is_var() { index += 1; }
            cur = &frame.next;
        }
        None
    }

    /// The bound of the binder at the given index, shifted so it reads
    /// correctly at the current depth.
    pub fn var_bound(&self, kind: VarKind, index: u32) -> Option<Ty> {
        let mut i = 0;
        let mut cur = &self.head;
        while let Some(ref frame) = *cur {
            if frame.slot.is_var() {
                if i == index {
                    let bound = match frame.slot {
                        Slot::TyVar(ref bound) if kind == VarKind::Ty => bound,
                        Slot::LocVar(ref bound) if kind == VarKind::Loc => bound,
                        _ => return None,
                    };
                    return bound.as_ref().map(|b| shift(b, 0, (index + 1) as i32));
                }
                i += 1;
            }
            cur = &frame.next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use caper_syntax::Name;
    use ty::{T, Ty, VarKind};
    use super::Gamma;

    fn n(s: &str) -> Name { Name::from(s) }
    fn int() -> Ty { ::std::rc::Rc::new(T::Prim(n("int"))) }

    #[test]
    fn test_var_index_skips_values() {
        let g = Gamma::new()
            .push_var(n("X"), VarKind::Ty, None)
            .push_value(n("v"), int())
            .push_var(n("q"), VarKind::Loc, None);
        assert_eq!(g.depth(), 2);
        assert_eq!(g.var_index(&n("q")), Some((VarKind::Loc, 0)));
        assert_eq!(g.var_index(&n("X")), Some((VarKind::Ty, 1)));
        assert_eq!(g.var_index(&n("v")), None);
        assert_eq!(g.var_index(&n("missing")), None);
    }

    #[test]
    fn test_take_value() {
        let g = Gamma::new()
            .push_value(n("a"), int())
            .push_var(n("X"), VarKind::Ty, None)
            .push_value(n("b"), T::top());
        let (ty, g2) = g.take_value(&n("a")).unwrap();
        assert_eq!(*ty, *int());
        // the binding is gone, everything else survives
        assert_eq!(g2.value_of(&n("a")), None);
        assert_eq!(g2.value_of(&n("b")), Some(T::top()));
        assert_eq!(g2.var_index(&n("X")), Some((VarKind::Ty, 0)));
        // the original environment is untouched
        assert!(g.value_of(&n("a")).is_some());
        // consuming twice fails
        assert!(g2.take_value(&n("a")).is_none());
    }

    #[test]
    fn test_binder_shadows_value() {
        let g = Gamma::new()
            .push_value(n("x"), int())
            .push_var(n("x"), VarKind::Loc, None);
        assert_eq!(g.value_of(&n("x")), None);
        assert!(g.take_value(&n("x")).is_none());
        assert_eq!(g.var_index(&n("x")), Some((VarKind::Loc, 0)));
    }

    #[test]
    fn test_var_bound_is_shifted() {
        use ty::ops::shift;
        // X <: (something mentioning an outer binder)
        let g = Gamma::new()
            .push_var(n("q"), VarKind::Loc, None)
            .push_var(n("X"), VarKind::Ty, Some(T::var(n("q"), 0)));
        // at depth 2, q's index from X's bound must be lifted over X itself
        let bound = g.var_bound(VarKind::Ty, 0).unwrap();
        assert_eq!(*bound, *shift(&T::var(n("q"), 0), 0, 1));
        assert_eq!(g.var_bound(VarKind::Loc, 0), None);
        // q itself is unbounded
        assert_eq!(g.var_bound(VarKind::Loc, 1), None);
    }
}
