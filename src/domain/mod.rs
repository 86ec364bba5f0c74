//! Abstract domains (spec §4.3 "Abstract domain capability").
//!
//! `AbstractDomain` is the capability trait the collecting-semantics engine
//! is generic over; `Interval` is the only domain this crate actually
//! implements (spec §1's numeric-abstract-domain library, which would back
//! Octagon/Polyhedra, is an explicit external collaborator).

mod expr;
mod interval;

pub use expr::{lower, BinOp, Expr, UnOp};
pub use interval::{Bound, Interval};

use crate::registry::VariableRegistry;
use im::HashMap;

/// Which concrete domain a run is configured to use (spec §6 CLI surface).
/// Only `Interval` has an implementation; the others exist so that
/// unsupported requests fail with a named `DomainLimitation` instead of
/// silently falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Interval,
    Octagon,
    Polyhedra,
}

impl std::fmt::Display for DomainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainKind::Interval => write!(f, "interval"),
            DomainKind::Octagon => write!(f, "octagon"),
            DomainKind::Polyhedra => write!(f, "polyhedra"),
        }
    }
}

/// The capability surface the collecting-semantics engine drives (spec
/// §4.3's "bottom, top, join, meet, is_equal, assign, get_bound" list, plus
/// `widen` for domains that need it to guarantee termination).
pub trait AbstractDomain: Clone + PartialEq {
    fn bottom() -> Self;
    fn top() -> Self;
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn is_equal(&self, other: &Self) -> bool {
        self == other
    }
    /// Updates `var`'s dimension to the evaluation of `expr`, propagating
    /// `Bottom` if the expression is undefined (spec §4.3 "Propagate Bottom
    /// if the RHS is bottom").
    fn assign(&self, var: u32, expr: &Expr) -> Self;
    /// Evaluates `expr` against the current state without mutating it (used
    /// for condition narrowing and final-report bound extraction).
    fn get_bound(&self, expr: &Expr) -> Interval;
    /// Narrows the state to what's true when `expr` evaluates to
    /// `assume_true`. Domains that cannot represent the constraint return
    /// `self` unchanged (spec §4.3 "the exit is the unchanged entry").
    fn narrow(&self, expr: &Expr, assume_true: bool) -> Self;
    /// Widening operator for loop joins past the configured iteration
    /// threshold. Defaults to `join`, which never narrows convergence but
    /// also never guarantees termination on its own — domains that need a
    /// real widening (like `Interval`) override this.
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }
    /// Applied at a `FunctionDefinition` node's entry (spec §4.3.1.a "reset
    /// all non-state variables to top ... reinject its last known bound from
    /// the registry"). `last_known` is the engine's running join of every
    /// state computed so far, standing in for "the registry" of last-seen
    /// bounds. Domains with nothing to reset default to identity.
    fn scope_reset(&self, _registry: &VariableRegistry, _last_known: &Self) -> Self {
        self.clone()
    }
}

/// The interval domain's abstract state: a persistent map from variable
/// dimension id to its current `Interval`. A dimension absent from the map
/// is implicitly `Top` (spec §4.3 "entry[0] of the starting node ... top
/// element constrained only by driver-supplied constants" — represented
/// here by inserting only the constrained dimensions). A state is `Bottom`
/// as a whole when reached along an infeasible path; that is distinct from,
/// and takes priority over, any per-dimension value.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalState {
    Bottom,
    Values(HashMap<u32, Interval>),
}

impl IntervalState {
    pub fn seeded(constants: impl IntoIterator<Item = (u32, Interval)>) -> Self {
        let mut map = HashMap::new();
        for (id, value) in constants {
            map.insert(id, value);
        }
        IntervalState::Values(map)
    }

    pub fn get(&self, var: u32) -> Interval {
        match self {
            IntervalState::Bottom => Interval::bottom(),
            IntervalState::Values(map) => map.get(&var).copied().unwrap_or_else(Interval::top),
        }
    }

    fn with(&self, var: u32, value: Interval) -> Self {
        match self {
            IntervalState::Bottom => IntervalState::Bottom,
            IntervalState::Values(map) => {
                if value.is_bottom() {
                    IntervalState::Bottom
                } else {
                    IntervalState::Values(map.update(var, value))
                }
            }
        }
    }

    /// Keeps only the dimensions `registry` marks as state variables,
    /// reinstating any that would otherwise drop to implicit `Top` from
    /// `last_known` (spec §4.3's `FunctionDefinition` scope-reset rule).
    pub fn scoped_to_state_variables(
        &self,
        registry: &VariableRegistry,
        last_known: &HashMap<u32, Interval>,
    ) -> Self {
        let IntervalState::Values(map) = self else {
            return IntervalState::Bottom;
        };
        let mut scoped = HashMap::new();
        for id in 0..registry.len() as u32 {
            if !registry.is_state_variable(id) {
                continue;
            }
            if let Some(value) = map.get(&id) {
                scoped.insert(id, *value);
            } else if let Some(value) = last_known.get(&id) {
                scoped.insert(id, *value);
            }
        }
        IntervalState::Values(scoped)
    }
}

impl AbstractDomain for IntervalState {
    fn bottom() -> Self {
        IntervalState::Bottom
    }

    fn top() -> Self {
        IntervalState::Values(HashMap::new())
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (IntervalState::Bottom, s) | (s, IntervalState::Bottom) => s.clone(),
            (IntervalState::Values(a), IntervalState::Values(b)) => {
                let mut out = a.clone();
                for (id, bv) in b.iter() {
                    let av = a.get(id).copied().unwrap_or_else(Interval::top);
                    out.insert(*id, av.join(bv));
                }
                for id in a.keys() {
                    if !b.contains_key(id) {
                        // Missing in `b` means implicitly `Top` there; joining
                        // anything with `Top` yields `Top`, so drop the entry.
                        out.remove(id);
                    }
                }
                IntervalState::Values(out)
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (IntervalState::Bottom, _) | (_, IntervalState::Bottom) => IntervalState::Bottom,
            (IntervalState::Values(a), IntervalState::Values(b)) => {
                let mut out = a.clone();
                for (id, bv) in b.iter() {
                    let av = a.get(id).copied().unwrap_or_else(Interval::top);
                    out.insert(*id, av.meet(bv));
                }
                IntervalState::Values(out)
            }
        }
    }

    fn assign(&self, var: u32, expr: &Expr) -> Self {
        let value = self.get_bound(expr);
        self.with(var, value)
    }

    fn get_bound(&self, expr: &Expr) -> Interval {
        expr::eval(expr, self)
    }

    fn narrow(&self, expr: &Expr, assume_true: bool) -> Self {
        match expr::constraint_for(expr, assume_true) {
            Some((var, bound)) => {
                let current = self.get(var);
                self.with(var, current.meet(&bound))
            }
            None => self.clone(),
        }
    }

    fn widen(&self, other: &Self) -> Self {
        match (self, other) {
            (IntervalState::Bottom, s) => s.clone(),
            (s, IntervalState::Bottom) => s.clone(),
            (IntervalState::Values(a), IntervalState::Values(b)) => {
                let mut out = a.clone();
                for (id, bv) in b.iter() {
                    let av = a.get(id).copied().unwrap_or_else(Interval::top);
                    out.insert(*id, av.widen(bv));
                }
                for id in a.keys() {
                    if !b.contains_key(id) {
                        out.remove(id);
                    }
                }
                IntervalState::Values(out)
            }
        }
    }

    fn scope_reset(&self, registry: &VariableRegistry, last_known: &Self) -> Self {
        let empty = HashMap::new();
        let last_known_map = match last_known {
            IntervalState::Values(m) => m,
            IntervalState::Bottom => &empty,
        };
        self.scoped_to_state_variables(registry, last_known_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_unregistered_dimension_is_top() {
        let state = IntervalState::seeded([(0, Interval::point(5))]);
        assert!(state.get(1).is_top());
        assert_eq!(state.get(0), Interval::point(5));
    }

    #[test]
    fn assigning_bottom_rhs_collapses_whole_state() {
        let state = IntervalState::seeded([(0, Interval::point(5))]);
        let collapsed = state.assign(0, &Expr::Bottom);
        assert_eq!(collapsed, IntervalState::Bottom);
    }

    #[test]
    fn join_with_bottom_is_identity() {
        let state = IntervalState::seeded([(0, Interval::point(5))]);
        assert_eq!(state.join(&IntervalState::Bottom), state);
    }
}
