use std::fmt;
use std::ops;

use caper_env::Spanned;

/// An identifier. Capitalization is meaningful: a name with an uppercase
/// initial denotes a type variable or parameter, a lowercase initial a
/// location variable (definition names are exempt and may be either).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    /// Checks if the name denotes a type (as opposed to a location).
    pub fn is_type_name(&self) -> bool {
        self.0.chars().next().map_or(false, |c| c.is_uppercase())
    }
}

impl<'a> From<&'a str> for Name {
    fn from(s: &'a str) -> Name { Name(s.to_string()) }
}

impl From<String> for Name {
    fn from(s: String) -> Name { Name(s) }
}

impl ops::Deref for Name {
    type Target = str;
    fn deref(&self) -> &str { &self.0 }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", self.0)
    }
}

/// A top-level type definition, e.g. `typedef M<t> = ref t`.
#[derive(Clone, PartialEq)]
pub struct TypeDef {
    pub name: Spanned<Name>,
    pub params: Vec<Spanned<Name>>,
    pub body: Kind,
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "<")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 { write!(f, ", ")?; }
                write!(f, "{:?}", p)?;
            }
            write!(f, ">")?;
        }
        write!(f, " = {:?}", self.body)
    }
}

/// An assertion-level expression.
#[derive(Clone, PartialEq)]
pub enum Ex {
    /// A whole program: type definitions followed by assertions.
    Program(Vec<Spanned<TypeDef>>, Vec<Exp>),
    /// `share C as P || Q`, expected to hold (or not) per the flag.
    Share(bool, Kind, Kind, Kind),
    /// `A <: B`, expected to hold (or not) per the flag.
    Subtype(bool, Kind, Kind),
    /// `A == B`, expected to hold (or not) per the flag.
    Equals(bool, Kind, Kind),
    /// `forall X <: B. e` quantifying over the nested assertion.
    Forall(Spanned<Name>, Option<Kind>, Exp),
}

pub type Exp = Spanned<Box<Ex>>;

impl fmt::Debug for Ex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Ex::Program(ref defs, ref exps) => {
                write!(f, "Program(")?;
                for d in defs { write!(f, "{:?}; ", d)?; }
                for e in exps { write!(f, "{:?}; ", e)?; }
                write!(f, ")")
            }
            Ex::Share(value, ref cap, ref left, ref right) => {
                write!(f, "Share[{}]({:?} as {:?} || {:?})", value, cap, left, right)
            }
            Ex::Subtype(value, ref lhs, ref rhs) => {
                write!(f, "Subtype[{}]({:?} <: {:?})", value, lhs, rhs)
            }
            Ex::Equals(value, ref lhs, ref rhs) => {
                write!(f, "Equals[{}]({:?} == {:?})", value, lhs, rhs)
            }
            Ex::Forall(ref name, ref bound, ref exp) => {
                write!(f, "forall {:?}", name)?;
                if let Some(ref bound) = *bound { write!(f, " <: {:?}", bound)?; }
                write!(f, ". {:?}", exp)
            }
        }
    }
}

/// A type-level term ("kind" in the checker's parlance, since it describes
/// types rather than values).
#[derive(Clone, PartialEq)]
pub enum K {
    /// The empty resource `none`.
    None,
    /// The universal supertype `top`.
    Top,
    /// A primitive type, e.g. `int` or `boolean`.
    Prim(Name),
    /// A variable or a zero-argument definition reference.
    Name(Name),
    /// A definition applied to arguments, `N[k, ...]`.
    App(Spanned<Name>, Vec<Kind>),
    /// `!k`, an unrestricted (shareable, droppable) type.
    Bang(Kind),
    /// A linear function `k -o k`.
    Fun(Kind, Kind),
    /// A record `[f: k, ...]`.
    Record(Vec<(Spanned<Name>, Kind)>),
    /// A tuple `[k, ...]`.
    Tuple(Vec<Kind>),
    /// A tagged sum `t#k + ...`.
    Sum(Vec<(Spanned<Name>, Kind)>),
    /// A reference to a location, `ref l`.
    Ref(Spanned<Name>),
    /// A read-write capability `rw l k`.
    Cap(Spanned<Name>, Kind),
    /// A stacked pair `k :: k`.
    Stacked(Kind, Kind),
    /// A rely step `k => k`.
    Rely(Kind, Kind),
    /// A guarantee step `k ; k`.
    Guarantee(Kind, Kind),
    /// Separate composition `k * k`.
    Star(Kind, Kind),
    /// An alternative `k (+) k`.
    Alt(Kind, Kind),
    /// An intersection `k & k`.
    Isect(Kind, Kind),
    /// `forall X <: B. k`.
    Forall(Spanned<Name>, Option<Kind>, Kind),
    /// `exists X <: B. k`.
    Exists(Spanned<Name>, Option<Kind>, Kind),
}

pub type Kind = Spanned<Box<K>>;

impl fmt::Debug for K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            K::None => write!(f, "none"),
            K::Top => write!(f, "top"),
            K::Prim(ref name) => write!(f, "{}", name),
            K::Name(ref name) => write!(f, "{}", name),
            K::App(ref name, ref args) => {
                write!(f, "{}[", name.base)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{:?}", arg)?;
                }
                write!(f, "]")
            }
            K::Bang(ref k) => write!(f, "!{:?}", k),
            K::Fun(ref a, ref b) => write!(f, "({:?} -o {:?})", a, b),
            K::Record(ref fields) => {
                write!(f, "[")?;
                for (i, &(ref name, ref k)) in fields.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}: {:?}", name.base, k)?;
                }
                write!(f, "]")
            }
            K::Tuple(ref ks) => {
                write!(f, "[")?;
                for (i, k) in ks.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{:?}", k)?;
                }
                write!(f, "]")
            }
            K::Sum(ref cases) => {
                write!(f, "(")?;
                for (i, &(ref tag, ref k)) in cases.iter().enumerate() {
                    if i > 0 { write!(f, " + ")?; }
                    write!(f, "{}#{:?}", tag.base, k)?;
                }
                write!(f, ")")
            }
            K::Ref(ref loc) => write!(f, "ref {}", loc.base),
            K::Cap(ref loc, ref k) => write!(f, "rw {} {:?}", loc.base, k),
            K::Stacked(ref a, ref b) => write!(f, "({:?} :: {:?})", a, b),
            K::Rely(ref a, ref b) => write!(f, "({:?} => {:?})", a, b),
            K::Guarantee(ref a, ref b) => write!(f, "({:?} ; {:?})", a, b),
            K::Star(ref a, ref b) => write!(f, "({:?} * {:?})", a, b),
            K::Alt(ref a, ref b) => write!(f, "({:?} (+) {:?})", a, b),
            K::Isect(ref a, ref b) => write!(f, "({:?} & {:?})", a, b),
            K::Forall(ref name, ref bound, ref k) => {
                write!(f, "(forall {}", name.base)?;
                if let Some(ref bound) = *bound { write!(f, " <: {:?}", bound)?; }
                write!(f, ". {:?})", k)
            }
            K::Exists(ref name, ref bound, ref k) => {
                write!(f, "(exists {}", name.base)?;
                if let Some(ref bound) = *bound { write!(f, " <: {:?}", bound)?; }
                write!(f, ". {:?})", k)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use caper_env::WithLoc;
    use super::*;

    fn kind(k: K) -> Kind {
        Box::new(k).without_loc()
    }

    #[test]
    fn test_name_kinds() {
        assert!(Name::from("M").is_type_name());
        assert!(Name::from("Abc").is_type_name());
        assert!(!Name::from("q").is_type_name());
        assert!(!Name::from("int").is_type_name());
    }

    #[test]
    fn test_kind_debug() {
        let k = kind(K::Rely(kind(K::Prim(Name::from("int"))),
                             kind(K::Prim(Name::from("boolean")))));
        assert_eq!(format!("{:?}", k), "(int => boolean)");
    }
}
