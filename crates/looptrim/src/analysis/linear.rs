//! Linear forms of signed integer arithmetic.
//!
//! A [`Linear`] is `Σ coefficient × atom + constant`, where atoms are any
//! sub-expressions that are not sums, differences, constants, or products
//! with a constant. Only types for which overflow is ruled out
//! ([`Type::is_no_overflow_int`]) are decomposed, since regrouping terms is
//! only valid when no intermediate result wraps.

use std::collections::BTreeMap;

use crate::ir::{BinOp, Expr, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linear {
    pub ty: Type,
    pub terms: BTreeMap<Expr, i64>,
    pub constant: i64,
}

impl Linear {
    pub fn constant(ty: Type, value: i64) -> Self {
        Self {
            ty,
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    /// Decomposes `e`, or `None` if its type is not a non-overflowing integer.
    pub fn from_expr(e: &Expr) -> Option<Self> {
        let ty = e.ty();
        if !ty.is_no_overflow_int() {
            return None;
        }
        let mut lin = Self::constant(ty, 0);
        lin.collect(e, 1);
        Some(lin)
    }

    fn collect(&mut self, e: &Expr, scale: i64) {
        match e {
            Expr::IntImm { value, .. } => {
                self.constant = self.constant.wrapping_add(scale.wrapping_mul(*value));
            }
            Expr::Binary {
                op: BinOp::Add,
                a,
                b,
            } => {
                self.collect(a, scale);
                self.collect(b, scale);
            }
            Expr::Binary {
                op: BinOp::Sub,
                a,
                b,
            } => {
                self.collect(a, scale);
                self.collect(b, scale.wrapping_neg());
            }
            Expr::Binary {
                op: BinOp::Mul,
                a,
                b,
            } => match (a.as_int(), b.as_int()) {
                (_, Some(k)) => self.collect(a, scale.wrapping_mul(k)),
                (Some(k), None) => self.collect(b, scale.wrapping_mul(k)),
                (None, None) => self.add_term(e.clone(), scale),
            },
            _ => self.add_term(e.clone(), scale),
        }
    }

    fn add_term(&mut self, atom: Expr, coefficient: i64) {
        let c = self.terms.entry(atom).or_insert(0);
        *c = c.wrapping_add(coefficient);
        if *c == 0 {
            self.terms.retain(|_, c| *c != 0);
        }
    }

    /// `self + scale × other`
    pub fn add_scaled(&mut self, other: &Linear, scale: i64) {
        for (atom, c) in &other.terms {
            self.add_term(atom.clone(), c.wrapping_mul(scale));
        }
        self.constant = self
            .constant
            .wrapping_add(other.constant.wrapping_mul(scale));
    }

    pub fn negated(&self) -> Linear {
        let mut out = Linear::constant(self.ty, 0);
        out.add_scaled(self, -1);
        out
    }

    /// `a - b`, if both decompose and have the same type.
    pub fn difference(a: &Expr, b: &Expr) -> Option<Linear> {
        let mut d = Linear::from_expr(a)?;
        let lb = Linear::from_expr(b)?;
        if lb.ty != d.ty {
            return None;
        }
        d.add_scaled(&lb, -1);
        Some(d)
    }

    pub fn as_constant(&self) -> Option<i64> {
        self.terms.is_empty().then_some(self.constant)
    }

    pub fn coefficient(&self, atom: &Expr) -> i64 {
        self.terms.get(atom).copied().unwrap_or(0)
    }

    pub fn remove_term(&mut self, atom: &Expr) -> i64 {
        self.terms.remove(atom).unwrap_or(0)
    }

    /// Every coefficient and the constant are multiples of `k`.
    pub fn divisible_by(&self, k: i64) -> bool {
        k != 0 && self.constant % k == 0 && self.terms.values().all(|c| c % k == 0)
    }

    /// Divides every coefficient and the constant by `k`, which must divide
    /// them exactly.
    pub fn divided_by(&self, k: i64) -> Linear {
        Linear {
            ty: self.ty,
            terms: self.terms.iter().map(|(a, c)| (a.clone(), c / k)).collect(),
            constant: self.constant / k,
        }
    }

    /// Splits into the positive terms and the negated negative terms, with
    /// no constant: `self = pos - neg + constant`.
    pub fn split_signs(&self) -> (Linear, Linear) {
        let mut pos = Linear::constant(self.ty, 0);
        let mut neg = Linear::constant(self.ty, 0);
        for (atom, &c) in &self.terms {
            if c > 0 {
                pos.terms.insert(atom.clone(), c);
            } else {
                neg.terms.insert(atom.clone(), c.wrapping_neg());
            }
        }
        (pos, neg)
    }

    fn term(&self, atom: &Expr, magnitude: i64) -> Expr {
        if magnitude == 1 {
            atom.clone()
        } else {
            Expr::mul(atom.clone(), Expr::int_of(self.ty, magnitude))
        }
    }

    /// Canonical expression: positive terms in atom order, then the negative
    /// terms subtracted, then the constant. With no positive terms the
    /// constant leads (`c - x`).
    pub fn to_expr(&self) -> Expr {
        let k = |v: i64| Expr::int_of(self.ty, v);
        let mut acc: Option<Expr> = None;
        for (atom, &c) in self.terms.iter().filter(|(_, c)| **c > 0) {
            let t = self.term(atom, c);
            acc = Some(match acc {
                None => t,
                Some(a) => Expr::add(a, t),
            });
        }
        let has_positive = acc.is_some();
        if !has_positive && self.terms.is_empty() {
            return k(self.constant);
        }
        if !has_positive {
            acc = Some(k(self.constant));
        }
        for (atom, &c) in self.terms.iter().filter(|(_, c)| **c < 0) {
            let t = self.term(atom, c.wrapping_neg());
            acc = acc.map(|a| Expr::sub(a, t));
        }
        let mut e = acc.unwrap_or_else(|| k(self.constant));
        if has_positive {
            if self.constant > 0 {
                e = Expr::add(e, k(self.constant));
            } else if self.constant < 0 {
                e = Expr::sub(e, k(self.constant.wrapping_neg()));
            }
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    fn y() -> Expr {
        Expr::var("y")
    }

    #[test]
    fn collects_terms_and_constant() {
        // (x + 3) * 2 - (y - x) - 1
        let e = Expr::sub(
            Expr::sub(
                Expr::mul(Expr::add(x(), Expr::int(3)), Expr::int(2)),
                Expr::sub(y(), x()),
            ),
            Expr::int(1),
        );
        let lin = Linear::from_expr(&e).unwrap();
        assert_eq!(lin.coefficient(&x()), 3);
        assert_eq!(lin.coefficient(&y()), -1);
        assert_eq!(lin.constant, 5);
    }

    #[test]
    fn narrow_types_are_not_decomposed() {
        let e = Expr::add(Expr::var_of(Type::int(8), "b"), Expr::int_of(Type::int(8), 1));
        assert!(Linear::from_expr(&e).is_none());
        let e = Expr::add(Expr::var_of(Type::uint(32), "u"), Expr::uint_of(Type::uint(32), 1));
        assert!(Linear::from_expr(&e).is_none());
    }

    #[test]
    fn cancelling_terms_disappear() {
        let d = Linear::difference(&Expr::add(x(), Expr::int(4)), &x()).unwrap();
        assert_eq!(d.as_constant(), Some(4));
    }

    #[test]
    fn canonical_shapes() {
        let mut lin = Linear::constant(Type::int(32), -2);
        lin.terms.insert(x(), 1);
        lin.terms.insert(y(), -3);
        assert_eq!(
            lin.to_expr(),
            Expr::sub(Expr::sub(x(), Expr::mul(y(), Expr::int(3))), Expr::int(2))
        );

        let mut only_negative = Linear::constant(Type::int(32), 7);
        only_negative.terms.insert(x(), -1);
        assert_eq!(only_negative.to_expr(), Expr::sub(Expr::int(7), x()));
    }

    #[test]
    fn exact_division() {
        let e = Expr::add(Expr::mul(x(), Expr::int(4)), Expr::int(6));
        let lin = Linear::from_expr(&e).unwrap();
        assert!(lin.divisible_by(2));
        assert!(!lin.divisible_by(4));
        assert_eq!(
            lin.divided_by(2).to_expr(),
            Expr::add(Expr::mul(x(), Expr::int(2)), Expr::int(3))
        );
    }
}
