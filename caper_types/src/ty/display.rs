//! Human-readable rendering of types, used by diagnostics.

use std::fmt;

use ty::T;

impl fmt::Display for T {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            T::Prim(ref name) => write!(f, "{}", name),
            T::None => write!(f, "none"),
            T::Top => write!(f, "top"),
            T::Bang(ref t) => write!(f, "!{}", t),
            T::Fun(ref a, ref r) => write!(f, "({} -o {})", a, r),
            T::Record(ref fields) => {
                write!(f, "[")?;
                for (i, &(ref name, ref t)) in fields.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}: {}", name, t)?;
                }
                write!(f, "]")
            }
            T::Tuple(ref ts) => {
                write!(f, "[")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", t)?;
                }
                write!(f, "]")
            }
            T::Sum(ref cases) => {
                write!(f, "(")?;
                for (i, &(ref tag, ref t)) in cases.iter().enumerate() {
                    if i > 0 { write!(f, " + ")?; }
                    write!(f, "{}#{}", tag, t)?;
                }
                write!(f, ")")
            }
            T::Ref(ref l) => write!(f, "ref {}", l),
            T::Cap(ref l, ref t) => write!(f, "rw {} {}", l, t),
            T::Stacked(ref a, ref b) => write!(f, "({} :: {})", a, b),
            T::Rely(ref r, ref g) => write!(f, "({} => {})", r, g),
            T::Guarantee(ref g, ref r) => write!(f, "({} ; {})", g, r),
            T::Star(ref ts) => write_list(f, ts, " * "),
            T::Alt(ref ts) => write_list(f, ts, " (+) "),
            T::Isect(ref ts) => write_list(f, ts, " & "),
            T::Forall(ref name, ref body, ref bound) => {
                write_quantified(f, "forall", name, body, bound)
            }
            T::Exists(ref name, ref body, ref bound) => {
                write_quantified(f, "exists", name, body, bound)
            }
            T::TyVar(ref name, _) | T::LocVar(ref name, _) => write!(f, "{}", name),
            T::Def(ref name, ref args) => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 { write!(f, ", ")?; }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter, ts: &[::ty::Ty], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, t) in ts.iter().enumerate() {
        if i > 0 { write!(f, "{}", sep)?; }
        write!(f, "{}", t)?;
    }
    write!(f, ")")
}

fn write_quantified(f: &mut fmt::Formatter, keyword: &str, name: &::caper_syntax::Name,
                    body: &::ty::Ty, bound: &Option<::ty::Ty>) -> fmt::Result {
    write!(f, "({} {}", keyword, name)?;
    if let Some(ref bound) = *bound {
        write!(f, " <: {}", bound)?;
    }
    write!(f, ". {})", body)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use caper_syntax::Name;
    use ty::{T, Ty};

    fn prim(name: &str) -> Ty {
        Rc::new(T::Prim(Name::from(name)))
    }

    #[test]
    fn test_display() {
        let q = T::var(Name::from("q"), 0);
        let cap = Rc::new(T::Cap(q.clone(), prim("int")));
        assert_eq!(cap.to_string(), "rw q int");

        let proto = Rc::new(T::Rely(prim("int"), Rc::new(T::Guarantee(prim("boolean"),
                                                                      T::none()))));
        assert_eq!(proto.to_string(), "(int => (boolean ; none))");

        let star = Rc::new(T::Star(vec![cap, T::none()]));
        assert_eq!(star.to_string(), "(rw q int * none)");

        let all = Rc::new(T::Forall(Name::from("X"), T::var(Name::from("X"), 0),
                                    Some(T::top())));
        assert_eq!(all.to_string(), "(forall X <: top. X)");
    }
}
