//! The interval abstract domain (spec §4.3, "Interval is the only domain
//! this crate implements"; Octagon/Polyhedra are represented only as
//! `DomainLimitation` stubs since the numeric-domain library that would back
//! them is an external collaborator, spec §6).

use std::cmp::{max, min};
use std::fmt;

/// An interval endpoint. Ordered `NegInf < Finite(n) < PosInf` by
/// declaration order, which the derived `Ord` exploits directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    fn negate(self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(n) => Bound::Finite(-n),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-inf"),
            Bound::PosInf => write!(f, "+inf"),
            Bound::Finite(n) => write!(f, "{n}"),
        }
    }
}

/// A closed interval `[lo, hi]`. `lo > hi` represents the empty interval,
/// i.e. the domain's `Bottom` element — no separate sentinel variant is
/// needed (spec §4.3 "the bottom element of the lattice").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "bottom")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

impl Interval {
    pub fn point(n: i64) -> Self {
        Self {
            lo: Bound::Finite(n),
            hi: Bound::Finite(n),
        }
    }

    pub fn range(lo: i64, hi: i64) -> Self {
        Self {
            lo: Bound::Finite(lo),
            hi: Bound::Finite(hi),
        }
    }

    pub fn top() -> Self {
        Self {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    pub fn bottom() -> Self {
        Self {
            lo: Bound::Finite(1),
            hi: Bound::Finite(0),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.lo > self.hi
    }

    pub fn is_top(&self) -> bool {
        self.lo == Bound::NegInf && self.hi == Bound::PosInf
    }

    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self {
            lo: min(self.lo, other.lo),
            hi: max(self.hi, other.hi),
        }
    }

    pub fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self {
            lo: max(self.lo, other.lo),
            hi: min(self.hi, other.hi),
        }
    }

    /// Standard interval widening: a bound that moved outward between two
    /// successive iterations jumps straight to infinity (spec §4.3 "Widening
    /// jumps unstable bounds to ±infinity rather than extrapolating a step").
    pub fn widen(&self, new: &Self) -> Self {
        if self.is_bottom() {
            return *new;
        }
        if new.is_bottom() {
            return *self;
        }
        let lo = if new.lo < self.lo { Bound::NegInf } else { self.lo };
        let hi = if new.hi > self.hi { Bound::PosInf } else { self.hi };
        Self { lo, hi }
    }

    pub fn negate(&self) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        Self {
            lo: self.hi.negate(),
            hi: self.lo.negate(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self {
            lo: bound_add(self.lo, other.lo),
            hi: bound_add(self.hi, other.hi),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let candidates = [
            bound_mul(self.lo, other.lo),
            bound_mul(self.lo, other.hi),
            bound_mul(self.hi, other.lo),
            bound_mul(self.hi, other.hi),
        ];
        Self {
            lo: candidates.into_iter().min().expect("non-empty"),
            hi: candidates.into_iter().max().expect("non-empty"),
        }
    }

    /// Sound but conservative: when the divisor interval straddles (or
    /// touches) zero the result is `Top` rather than attempting a split,
    /// matching the "domain cannot represent a needed constraint" fallback
    /// in spec §4.3's Design Notes.
    pub fn div(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if !excludes_zero(other) {
            return Self::top();
        }
        let candidates = [
            bound_div(self.lo, other.lo),
            bound_div(self.lo, other.hi),
            bound_div(self.hi, other.lo),
            bound_div(self.hi, other.hi),
        ];
        Self {
            lo: candidates.into_iter().min().expect("non-empty"),
            hi: candidates.into_iter().max().expect("non-empty"),
        }
    }

    /// Remainder has no sound-and-precise interval abstraction worth the
    /// complexity here; conservatively `Top` unless both sides are the same
    /// known point.
    pub fn rem(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if let (Bound::Finite(a), Bound::Finite(b)) = (self.lo, other.lo) {
            if self.lo == self.hi && other.lo == other.hi && b != 0 {
                return Self::point(a % b);
            }
        }
        Self::top()
    }

    /// `Some(true)` if definitely nonzero, `Some(false)` if definitely zero,
    /// `None` if the interval straddles zero (used for `&&`/`||`/`!`
    /// short-circuit evaluation, spec §4.3 "control terms").
    pub fn nonzero(&self) -> Option<bool> {
        if self.is_bottom() {
            return None;
        }
        if excludes_zero(self) {
            Some(true)
        } else if *self == Self::point(0) {
            Some(false)
        } else {
            None
        }
    }
}

fn excludes_zero(iv: &Interval) -> bool {
    iv.lo > Bound::Finite(0) || iv.hi < Bound::Finite(0)
}

fn bound_add(a: Bound, b: Bound) -> Bound {
    match (a, b) {
        (Bound::Finite(x), Bound::Finite(y)) => x
            .checked_add(y)
            .map(Bound::Finite)
            .unwrap_or(if x > 0 { Bound::PosInf } else { Bound::NegInf }),
        (Bound::PosInf, Bound::NegInf) | (Bound::NegInf, Bound::PosInf) => Bound::Finite(0),
        (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
    }
}

fn bound_mul(a: Bound, b: Bound) -> Bound {
    match (a, b) {
        (Bound::Finite(x), Bound::Finite(y)) => x
            .checked_mul(y)
            .map(Bound::Finite)
            .unwrap_or(if (x > 0) == (y > 0) { Bound::PosInf } else { Bound::NegInf }),
        (Bound::Finite(0), _) | (_, Bound::Finite(0)) => Bound::Finite(0),
        (inf, Bound::Finite(y)) | (Bound::Finite(y), inf) => {
            let inf_positive = matches!(inf, Bound::PosInf);
            if (y > 0) == inf_positive {
                Bound::PosInf
            } else {
                Bound::NegInf
            }
        }
        (Bound::PosInf, Bound::PosInf) | (Bound::NegInf, Bound::NegInf) => Bound::PosInf,
        (Bound::PosInf, Bound::NegInf) | (Bound::NegInf, Bound::PosInf) => Bound::NegInf,
    }
}

fn bound_div(a: Bound, b: Bound) -> Bound {
    match (a, b) {
        (Bound::Finite(x), Bound::Finite(y)) if y != 0 => Bound::Finite(x / y),
        (Bound::Finite(_), Bound::Finite(0)) => Bound::PosInf, // unreachable: caller excludes zero divisors
        (inf, Bound::Finite(y)) if y != 0 => {
            let inf_positive = matches!(inf, Bound::PosInf);
            if (y > 0) == inf_positive {
                Bound::PosInf
            } else {
                Bound::NegInf
            }
        }
        (Bound::Finite(_), _) => Bound::Finite(0),
        _ => Bound::Finite(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_of_points_spans_both() {
        let joined = Interval::point(3).join(&Interval::point(7));
        assert_eq!(joined, Interval::range(3, 7));
    }

    #[test]
    fn meet_of_disjoint_points_is_bottom() {
        let met = Interval::point(3).meet(&Interval::point(7));
        assert!(met.is_bottom());
    }

    #[test]
    fn bottom_is_identity_for_join() {
        let a = Interval::range(1, 5);
        assert_eq!(a.join(&Interval::bottom()), a);
        assert_eq!(Interval::bottom().join(&a), a);
    }

    #[test]
    fn widen_jumps_ascending_bound_to_infinity() {
        let prev = Interval::range(0, 0);
        let next = Interval::range(0, 1);
        let widened = prev.widen(&next);
        assert_eq!(widened, Interval { lo: Bound::Finite(0), hi: Bound::PosInf });
    }

    #[test]
    fn add_and_sub_are_consistent() {
        let a = Interval::range(1, 3);
        let b = Interval::range(10, 10);
        assert_eq!(a.add(&b), Interval::range(11, 13));
        assert_eq!(a.sub(&b), Interval::range(-9, -7));
    }

    #[test]
    fn div_by_interval_straddling_zero_is_top() {
        let a = Interval::range(1, 3);
        let b = Interval::range(-1, 1);
        assert!(a.div(&b).is_top());
    }

    #[test]
    fn nonzero_classification() {
        assert_eq!(Interval::range(1, 5).nonzero(), Some(true));
        assert_eq!(Interval::point(0).nonzero(), Some(false));
        assert_eq!(Interval::range(-1, 1).nonzero(), None);
    }

    // Spec §8 invariant 3 (monotone ascent): the fixed-point engine's round
    // i+1 is computed as `prev.join(&new)`, so this only guarantees ascent
    // if `join` itself is monotone — `a ⊑ a.join(b)` and `b ⊑ a.join(b)` for
    // every pair. `⊑` on a closed interval is "is contained within".
    mod monotone_ascent {
        use super::*;
        use proptest::prelude::*;

        fn contains(wider: &Interval, narrower: &Interval) -> bool {
            wider.lo <= narrower.lo && narrower.hi <= wider.hi
        }

        proptest! {
            #[test]
            fn join_is_an_upper_bound_of_both_operands(
                a_lo in -50i64..50, a_len in 0i64..20,
                b_lo in -50i64..50, b_len in 0i64..20,
            ) {
                let a = Interval::range(a_lo, a_lo + a_len);
                let b = Interval::range(b_lo, b_lo + b_len);
                let joined = a.join(&b);
                prop_assert!(contains(&joined, &a));
                prop_assert!(contains(&joined, &b));
            }

            #[test]
            fn repeated_join_never_shrinks(
                a_lo in -50i64..50, a_len in 0i64..20,
                b_lo in -50i64..50, b_len in 0i64..20,
            ) {
                let a = Interval::range(a_lo, a_lo + a_len);
                let b = Interval::range(b_lo, b_lo + b_len);
                let once = a.join(&b);
                let twice = once.join(&b);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
