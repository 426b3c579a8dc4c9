//! The type definition table.
//!
//! Definitions are registered in two passes so they can refer to each other
//! in any order: `declare` reserves every name with its parameters, then
//! `define` fills in the checked bodies. A table belongs to a single
//! checker run and is never shared across runs.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::collections::HashSet;

use caper_syntax::Name;
use ty::{T, Ty, VarKind};

pub struct Def {
    pub params: Vec<(Name, VarKind)>,
    pub body: Option<Ty>,
}

pub struct Defs {
    map: BTreeMap<Name, Def>,
}

impl Defs {
    pub fn new() -> Defs {
        Defs { map: BTreeMap::new() }
    }

    /// Reserves a name. Returns false when the name is already taken.
    pub fn declare(&mut self, name: Name, params: Vec<(Name, VarKind)>) -> bool {
        match self.map.entry(name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(Def { params: params, body: None });
                true
            }
        }
    }

    /// Fills in the body of a declared name. Declaration must precede this
    /// and happen once, anything else is a checker bug.
    pub fn define(&mut self, name: &Name, body: Ty) {
        let def = match self.map.get_mut(name) {
            Some(def) => def,
            None => panic!("defining undeclared type {:?}", name),
        };
        assert!(def.body.is_none(), "defining type {:?} twice", name);
        def.body = Some(body);
    }

    pub fn get(&self, name: &Name) -> Option<&Def> {
        self.map.get(name)
    }

    /// Finds a "bottom" definition: one whose body forever refers to other
    /// definitions without ever reaching a type former, so it denotes no
    /// type at all. Returns the first such name in name order.
    pub fn find_bottom(&self) -> Option<&Name> {
        for (name, def) in &self.map {
            let mut seen = HashSet::new();
            seen.insert(name);
            let mut cur = def;
            loop {
                let head = match cur.body {
                    Some(ref body) => match **body {
                        T::Def(ref head, _) => head,
                        _ => break,
                    },
                    None => break,
                };
                if !seen.insert(head) { return Some(name); }
                match self.map.get(head) {
                    Some(next) => { cur = next; }
                    None => break,
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use caper_syntax::Name;
    use ty::{T, VarKind};
    use super::Defs;

    fn n(s: &str) -> Name { Name::from(s) }
    fn def0(name: &str) -> ::ty::Ty { Rc::new(T::Def(n(name), vec![])) }

    #[test]
    fn test_duplicate_declaration() {
        let mut defs = Defs::new();
        assert!(defs.declare(n("M"), vec![]));
        assert!(!defs.declare(n("M"), vec![(n("t"), VarKind::Loc)]));
    }

    #[test]
    fn test_self_cycle_is_bottom() {
        let mut defs = Defs::new();
        assert!(defs.declare(n("A"), vec![]));
        defs.define(&n("A"), def0("A"));
        assert_eq!(defs.find_bottom(), Some(&n("A")));
    }

    #[test]
    fn test_mutual_cycle_is_bottom() {
        let mut defs = Defs::new();
        assert!(defs.declare(n("A"), vec![]));
        assert!(defs.declare(n("B"), vec![]));
        defs.define(&n("A"), def0("B"));
        defs.define(&n("B"), def0("A"));
        assert_eq!(defs.find_bottom(), Some(&n("A")));
    }

    #[test]
    fn test_productive_definitions_pass() {
        let mut defs = Defs::new();
        assert!(defs.declare(n("A"), vec![]));
        assert!(defs.declare(n("B"), vec![]));
        // A = B, B = (int => B): B guards itself behind a type former
        defs.define(&n("A"), def0("B"));
        defs.define(&n("B"), Rc::new(T::Rely(Rc::new(T::Prim(n("int"))), def0("B"))));
        assert_eq!(defs.find_bottom(), None);
    }
}
