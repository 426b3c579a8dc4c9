use std::rc::Rc;

use caper_env::{Span, Spanned};
use caper_diag::{Report, Reporter, Result};
use caper_syntax::{Ex, Exp, K, Kind, Name};
use caper_types::{Defs, Gamma, T, Ty, VarKind};
use caper_types::ops::{equals, subtype, is_protocol};

use conformance::{self, Config};
use message as m;

/// What a successfully checked expression evaluates to.
pub enum Outcome {
    /// The elaborated type of the last assertion.
    Ty(Ty),
    /// The witness table from a `share` assertion.
    Conformance(Vec<Config>),
}

/// The checker proper. Walks the tree, elaborates surface kinds into the
/// internal representation and verifies every assertion.
pub struct Checker<'a> {
    defs: Defs,
    report: &'a Report,
}

impl<'a> Checker<'a> {
    pub fn new(report: &'a Report) -> Checker<'a> {
        Checker { defs: Defs::new(), report: report }
    }

    pub fn visit(&mut self, exp: &Exp) -> Result<Outcome> {
        debug!("checking {:?}", *exp);
        self.visit_exp(exp, &Gamma::new())
    }

    fn visit_exp(&mut self, exp: &Exp, gamma: &Gamma) -> Result<Outcome> {
        match *exp.base {
            Ex::Program(ref typedefs, ref exps) => {
                self.defs = Defs::new();

                // declare everything first so definitions can be mutually
                // recursive regardless of their order
                for td in typedefs {
                    let params = td.params.iter()
                                          .map(|p| (p.base.clone(), VarKind::of(&p.base)))
                                          .collect();
                    if !self.defs.declare(td.name.base.clone(), params) {
                        return self.report.fatal(td.name.span, m::DuplicateDefinition {
                            name: td.name.base.to_string(),
                        }).done();
                    }
                }

                for td in typedefs {
                    let mut scope = gamma.clone();
                    for p in &td.params {
                        scope = scope.push_var(p.base.clone(), VarKind::of(&p.base), None);
                    }
                    let body = self.visit_kind(&td.body, &scope)?;
                    self.defs.define(&td.name.base, body);
                }

                if let Some(name) = self.defs.find_bottom().cloned() {
                    let span = typedefs.iter()
                                       .find(|td| td.name.base == name)
                                       .map_or(Span::dummy(), |td| td.name.span);
                    return self.report.fatal(span, m::BottomDefinition {
                        name: name.to_string(),
                    }).done();
                }

                for e in exps {
                    self.visit_exp(e, gamma)?;
                }
                Ok(Outcome::Ty(T::none()))
            }

            Ex::Share(value, ref cap, ref left, ref right) => {
                let cap_ty = self.visit_kind(cap, gamma)?;
                let left_ty = self.visit_kind(left, gamma)?;
                let right_ty = self.visit_kind(right, gamma)?;
                if !is_protocol(&self.defs, &left_ty) {
                    return self.report.fatal(left.span, m::NotAProtocol {
                        ty: left_ty.to_string(),
                    }).done();
                }
                if !is_protocol(&self.defs, &right_ty) {
                    return self.report.fatal(right.span, m::NotAProtocol {
                        ty: right_ty.to_string(),
                    }).done();
                }
                let op = format!("share {} as {} || {}", cap_ty, left_ty, right_ty);
                let table = conformance::check_conformance(&self.defs, cap_ty,
                                                           left_ty, right_ty);
                if table.is_some() != value {
                    return self.report.fatal(exp.span, m::UnexpectedResult {
                        op: op, expected: value, actual: table.is_some(),
                    }).done();
                }
                Ok(Outcome::Conformance(table.unwrap_or_else(Vec::new)))
            }

            Ex::Subtype(value, ref lhs, ref rhs) => {
                let l = self.visit_kind(lhs, gamma)?;
                let r = self.visit_kind(rhs, gamma)?;
                let actual = subtype(&self.defs, &l, &r);
                if actual != value {
                    return self.report.fatal(exp.span, m::UnexpectedResult {
                        op: format!("{} <: {}", l, r), expected: value, actual: actual,
                    }).done();
                }
                Ok(Outcome::Ty(l))
            }

            Ex::Equals(value, ref lhs, ref rhs) => {
                let l = self.visit_kind(lhs, gamma)?;
                let r = self.visit_kind(rhs, gamma)?;
                let actual = equals(&self.defs, &l, &r);
                if actual != value {
                    return self.report.fatal(exp.span, m::UnexpectedResult {
                        op: format!("{} == {}", l, r), expected: value, actual: actual,
                    }).done();
                }
                Ok(Outcome::Ty(l))
            }

            Ex::Forall(ref name, ref bound, ref body) => {
                let bound_ty = match *bound {
                    Some(ref b) => Some(self.visit_kind(b, gamma)?),
                    None => None,
                };
                let inner = gamma.push_var(name.base.clone(), VarKind::of(&name.base),
                                           bound_ty.clone());
                match self.visit_exp(body, &inner)? {
                    Outcome::Ty(ty) => {
                        Ok(Outcome::Ty(Rc::new(T::Forall(name.base.clone(), ty, bound_ty))))
                    }
                    outcome => Ok(outcome),
                }
            }
        }
    }

    fn visit_kind(&self, kind: &Kind, gamma: &Gamma) -> Result<Ty> {
        match *kind.base {
            K::None => Ok(T::none()),
            K::Top => Ok(T::top()),
            K::Prim(ref name) => Ok(Rc::new(T::Prim(name.clone()))),

            K::Name(ref name) => {
                if let Some((vk, index)) = gamma.var_index(name) {
                    return Ok(match vk {
                        VarKind::Ty => Rc::new(T::TyVar(name.clone(), index)),
                        VarKind::Loc => Rc::new(T::LocVar(name.clone(), index)),
                    });
                }
                match self.defs.get(name) {
                    Some(def) if def.params.is_empty() => {
                        Ok(Rc::new(T::Def(name.clone(), Vec::new())))
                    }
                    Some(def) => {
                        self.report.fatal(kind.span, m::ArityMismatch {
                            name: name.to_string(),
                            expected: def.params.len(),
                            actual: 0,
                        }).done()
                    }
                    None => {
                        self.report.fatal(kind.span, m::UnknownName {
                            name: name.to_string(),
                        }).done()
                    }
                }
            }

            K::App(ref name, ref args) => {
                let params = match self.defs.get(&name.base) {
                    Some(def) => def.params.clone(),
                    None => {
                        return self.report.fatal(name.span, m::UnknownName {
                            name: name.base.to_string(),
                        }).done();
                    }
                };
                if params.len() != args.len() {
                    return self.report.fatal(kind.span, m::ArityMismatch {
                        name: name.base.to_string(),
                        expected: params.len(),
                        actual: args.len(),
                    }).done();
                }
                let mut tys = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let ty = self.visit_kind(arg, gamma)?;
                    let arg_kind = match *ty {
                        T::LocVar(..) => VarKind::Loc,
                        _ => VarKind::Ty,
                    };
                    if arg_kind != params[i].1 {
                        return self.report.fatal(arg.span, m::ArgumentKindMismatch {
                            name: name.base.to_string(), index: i + 1,
                        }).done();
                    }
                    tys.push(ty);
                }
                Ok(Rc::new(T::Def(name.base.clone(), tys)))
            }

            K::Bang(ref k) => Ok(Rc::new(T::Bang(self.visit_kind(k, gamma)?))),

            K::Fun(ref a, ref b) => {
                Ok(Rc::new(T::Fun(self.visit_kind(a, gamma)?, self.visit_kind(b, gamma)?)))
            }

            K::Record(ref fields) => {
                let mut fs = Vec::with_capacity(fields.len());
                for &(ref label, ref k) in fields {
                    fs.push((label.base.clone(), self.visit_kind(k, gamma)?));
                }
                match T::record(fs) {
                    Ok(ty) => Ok(ty),
                    Err(label) => self.duplicate_label(kind, fields, label),
                }
            }

            K::Tuple(ref ks) => {
                let mut tys = Vec::with_capacity(ks.len());
                for k in ks {
                    tys.push(self.visit_kind(k, gamma)?);
                }
                // a tuple of unrestricted components is itself unrestricted
                let all_bang = !tys.is_empty() &&
                    tys.iter().all(|t| match **t { T::Bang(..) => true, _ => false });
                let tuple = Rc::new(T::Tuple(tys));
                if all_bang {
                    Ok(Rc::new(T::Bang(tuple)))
                } else {
                    Ok(tuple)
                }
            }

            K::Sum(ref cases) => {
                let mut cs = Vec::with_capacity(cases.len());
                for &(ref tag, ref k) in cases {
                    cs.push((tag.base.clone(), self.visit_kind(k, gamma)?));
                }
                match T::sum(cs) {
                    Ok(ty) => Ok(ty),
                    Err(tag) => self.duplicate_label(kind, cases, tag),
                }
            }

            K::Ref(ref loc) => Ok(Rc::new(T::Ref(self.visit_loc(loc, gamma)?))),

            K::Cap(ref loc, ref k) => {
                Ok(Rc::new(T::Cap(self.visit_loc(loc, gamma)?, self.visit_kind(k, gamma)?)))
            }

            K::Stacked(ref a, ref b) => {
                Ok(Rc::new(T::Stacked(self.visit_kind(a, gamma)?, self.visit_kind(b, gamma)?)))
            }

            K::Rely(ref a, ref b) => {
                Ok(Rc::new(T::Rely(self.visit_kind(a, gamma)?, self.visit_kind(b, gamma)?)))
            }

            K::Guarantee(ref a, ref b) => {
                Ok(Rc::new(T::Guarantee(self.visit_kind(a, gamma)?,
                                        self.visit_kind(b, gamma)?)))
            }

            K::Star(ref a, ref b) => {
                Ok(Rc::new(T::Star(vec![self.visit_kind(a, gamma)?,
                                        self.visit_kind(b, gamma)?])))
            }

            K::Alt(ref a, ref b) => {
                Ok(Rc::new(T::Alt(vec![self.visit_kind(a, gamma)?,
                                       self.visit_kind(b, gamma)?])))
            }

            K::Isect(ref a, ref b) => {
                Ok(Rc::new(T::Isect(vec![self.visit_kind(a, gamma)?,
                                         self.visit_kind(b, gamma)?])))
            }

            K::Forall(ref name, ref bound, ref body) => {
                let (body_ty, bound_ty) = self.visit_binder(name, bound, body, gamma)?;
                Ok(Rc::new(T::Forall(name.base.clone(), body_ty, bound_ty)))
            }

            K::Exists(ref name, ref bound, ref body) => {
                let (body_ty, bound_ty) = self.visit_binder(name, bound, body, gamma)?;
                Ok(Rc::new(T::Exists(name.base.clone(), body_ty, bound_ty)))
            }
        }
    }

    fn visit_binder(&self, name: &Spanned<Name>, bound: &Option<Kind>, body: &Kind,
                    gamma: &Gamma) -> Result<(Ty, Option<Ty>)> {
        let bound_ty = match *bound {
            Some(ref b) => Some(self.visit_kind(b, gamma)?),
            None => None,
        };
        let inner = gamma.push_var(name.base.clone(), VarKind::of(&name.base),
                                   bound_ty.clone());
        let body_ty = self.visit_kind(body, &inner)?;
        Ok((body_ty, bound_ty))
    }

    fn visit_loc(&self, loc: &Spanned<Name>, gamma: &Gamma) -> Result<Ty> {
        match gamma.var_index(&loc.base) {
            Some((VarKind::Loc, index)) => Ok(Rc::new(T::LocVar(loc.base.clone(), index))),
            Some((VarKind::Ty, _)) => {
                self.report.fatal(loc.span, m::NotALocation {
                    name: loc.base.to_string(),
                }).done()
            }
            None => {
                self.report.fatal(loc.span, m::UnknownName {
                    name: loc.base.to_string(),
                }).done()
            }
        }
    }

    fn duplicate_label(&self, kind: &Kind, entries: &[(Spanned<Name>, Kind)],
                       label: Name) -> Result<Ty> {
        let span = entries.iter().rev()
                          .find(|&&(ref l, _)| l.base == label)
                          .map_or(kind.span, |&(ref l, _)| l.span);
        self.report.fatal(span, m::DuplicateLabel { label: label.to_string() }).done()
    }
}
