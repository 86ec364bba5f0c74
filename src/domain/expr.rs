//! Lowers an AST expression subtree into a small domain-native term and
//! evaluates it against an `IntervalState` (spec §4.3 "a tree of + - * / %
//! and variable references").

use super::interval::{Bound, Interval};
use super::IntervalState;
use crate::ast::{AstKind, AstNode};
use crate::registry::VariableRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// A domain-native expression term. `Bottom` marks a reference to a name the
/// registry never saw (spec §4.3's "unregistered variable" warning path);
/// `Top` marks a value that exists but is intentionally left unconstrained
/// (function call results, member accesses this crate does not model).
#[derive(Debug, Clone)]
pub enum Expr {
    Const(i64),
    Var(u32),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Un(UnOp, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Top,
    Bottom,
}

fn bin_op_from_str(op: &str) -> Option<BinOp> {
    Some(match op {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Rem,
        "<" => BinOp::Lt,
        "<=" => BinOp::Le,
        ">" => BinOp::Gt,
        ">=" => BinOp::Ge,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "&&" => BinOp::And,
        "||" => BinOp::Or,
        _ => return None,
    })
}

fn un_op_from_str(op: &str) -> Option<UnOp> {
    Some(match op {
        "-" => UnOp::Neg,
        "!" => UnOp::Not,
        _ => return None,
    })
}

/// Lowers an AST expression subtree. Never registers new names: a reference
/// to a name the registry has not already seen lowers to `Bottom` (the
/// caller is responsible for pre-registering every variable it intends to
/// track, per spec §4.3's "Variable initialization" step).
pub fn lower(ast: &AstNode, registry: &VariableRegistry) -> Expr {
    match ast.kind {
        AstKind::Literal => ast
            .value
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Expr::Const)
            .unwrap_or(Expr::Top),
        AstKind::Identifier => match ast.name.as_deref().and_then(|n| registry.id_of(n)) {
            Some(id) => Expr::Var(id),
            None => Expr::Bottom,
        },
        AstKind::MemberAccess => {
            // `block.timestamp`-style accesses: looked up under their dotted
            // name if the driver registered one, otherwise left `Top` (a
            // legitimate but unconstrained value, not an error).
            let dotted = qualified_name(ast);
            match dotted.as_deref().and_then(|n| registry.id_of(n)) {
                Some(id) => Expr::Var(id),
                None => Expr::Top,
            }
        }
        AstKind::BinaryOperation => {
            let op = ast.operator.as_deref().and_then(bin_op_from_str);
            let left = ast.left.as_deref().map(|n| lower(n, registry));
            let right = ast.right.as_deref().map(|n| lower(n, registry));
            match (op, left, right) {
                (Some(op), Some(l), Some(r)) => Expr::Bin(op, Box::new(l), Box::new(r)),
                _ => Expr::Top,
            }
        }
        AstKind::UnaryOperation => {
            let op = ast.operator.as_deref().and_then(un_op_from_str);
            let operand = ast.operand.as_deref().map(|n| lower(n, registry));
            match (op, operand) {
                (Some(op), Some(e)) => Expr::Un(op, Box::new(e)),
                _ => Expr::Top,
            }
        }
        AstKind::Conditional => {
            let cond = ast.condition.as_deref().map(|n| lower(n, registry));
            let t = ast.left.as_deref().map(|n| lower(n, registry));
            let f = ast.right.as_deref().map(|n| lower(n, registry));
            match (cond, t, f) {
                (Some(c), Some(t), Some(f)) => Expr::Cond(Box::new(c), Box::new(t), Box::new(f)),
                _ => Expr::Top,
            }
        }
        // Function calls and anything else: opaque, but not an error.
        _ => Expr::Top,
    }
}

fn qualified_name(member_access: &AstNode) -> Option<String> {
    let base_name = member_access.base.as_deref()?.name.clone()?;
    let member = member_access.name.clone()?;
    Some(format!("{base_name}.{member}"))
}

pub fn eval(expr: &Expr, state: &IntervalState) -> Interval {
    match expr {
        Expr::Const(n) => Interval::point(*n),
        Expr::Var(id) => state.get(*id),
        Expr::Top => Interval::top(),
        Expr::Bottom => Interval::bottom(),
        Expr::Un(UnOp::Neg, e) => eval(e, state).negate(),
        Expr::Un(UnOp::Not, e) => bool_not(eval(e, state)),
        Expr::Bin(BinOp::And, l, r) => {
            let lv = eval(l, state);
            match lv.nonzero() {
                Some(false) => Interval::point(0),
                Some(true) => bool_of(eval(r, state)),
                None => bool_unknown_or(eval(r, state), false),
            }
        }
        Expr::Bin(BinOp::Or, l, r) => {
            let lv = eval(l, state);
            match lv.nonzero() {
                Some(true) => Interval::point(1),
                Some(false) => bool_of(eval(r, state)),
                None => bool_unknown_or(eval(r, state), true),
            }
        }
        Expr::Bin(op, l, r) => {
            let lv = eval(l, state);
            let rv = eval(r, state);
            if lv.is_bottom() || rv.is_bottom() {
                return Interval::bottom();
            }
            match op {
                BinOp::Add => lv.add(&rv),
                BinOp::Sub => lv.sub(&rv),
                BinOp::Mul => lv.mul(&rv),
                BinOp::Div => lv.div(&rv),
                BinOp::Rem => lv.rem(&rv),
                BinOp::Lt => compare(|a, b| a < b, |a, b| a >= b, &lv, &rv),
                BinOp::Le => compare(|a, b| a <= b, |a, b| a > b, &lv, &rv),
                BinOp::Gt => compare(|a, b| a > b, |a, b| a <= b, &lv, &rv),
                BinOp::Ge => compare(|a, b| a >= b, |a, b| a < b, &lv, &rv),
                BinOp::Eq => {
                    let definitely_true = lv == rv && lv.lo == lv.hi;
                    let definitely_false = lv.hi < rv.lo || lv.lo > rv.hi;
                    tristate(definitely_true, definitely_false)
                }
                BinOp::Ne => {
                    let definitely_true = lv.hi < rv.lo || lv.lo > rv.hi;
                    let definitely_false = lv == rv && lv.lo == lv.hi;
                    tristate(definitely_true, definitely_false)
                }
                BinOp::And | BinOp::Or => unreachable!("handled above"),
            }
        }
        Expr::Cond(c, t, f) => {
            let cv = eval(c, state);
            match cv.nonzero() {
                Some(true) => eval(t, state),
                Some(false) => eval(f, state),
                None => eval(t, state).join(&eval(f, state)),
            }
        }
    }
}

/// `is_true`/`is_false` test the two endpoint pairs that can prove a
/// monotone relation always holds or never holds: `(lv.hi, rv.lo)` proves
/// "always true", `(lv.lo, rv.hi)` proves "always false".
fn compare(is_true: impl Fn(Bound, Bound) -> bool, is_false: impl Fn(Bound, Bound) -> bool, lv: &Interval, rv: &Interval) -> Interval {
    tristate(is_true(lv.hi, rv.lo), is_false(lv.lo, rv.hi))
}

fn tristate(definitely_true: bool, definitely_false: bool) -> Interval {
    if definitely_true {
        Interval::point(1)
    } else if definitely_false {
        Interval::point(0)
    } else {
        Interval::range(0, 1)
    }
}

fn bool_of(iv: Interval) -> Interval {
    match iv.nonzero() {
        Some(true) => Interval::point(1),
        Some(false) => Interval::point(0),
        None => Interval::range(0, 1),
    }
}

fn bool_not(iv: Interval) -> Interval {
    match iv.nonzero() {
        Some(true) => Interval::point(0),
        Some(false) => Interval::point(1),
        None => Interval::range(0, 1),
    }
}

/// Used when the left operand of `&&`/`||` is ambiguous: the result stays
/// ambiguous unless the right side is a known, non-dominant constant.
fn bool_unknown_or(rv: Interval, dominant_when: bool) -> Interval {
    match rv.nonzero() {
        Some(v) if v == dominant_when => Interval::point(dominant_when as i64),
        _ => Interval::range(0, 1),
    }
}

/// Recovers a single-dimension constraint from a condition expression, for
/// the narrowing step at `IfStatement`/`WhileStatement` joins (spec §4.3.1.b
/// "meeting entry with the condition's constraint and its negation"). Only
/// simple `var OP const` / `const OP var` comparisons are recognized;
/// anything else returns `None` and the caller leaves the state unchanged.
pub fn constraint_for(expr: &Expr, assume_true: bool) -> Option<(u32, Interval)> {
    match expr {
        Expr::Un(UnOp::Not, inner) => constraint_for(inner, !assume_true),
        Expr::Bin(op, l, r) => match (l.as_ref(), r.as_ref()) {
            (Expr::Var(id), Expr::Const(n)) => Some((*id, relation_interval(*op, *n, assume_true, true))),
            (Expr::Const(n), Expr::Var(id)) => Some((*id, relation_interval(*op, *n, assume_true, false))),
            _ => None,
        },
        _ => None,
    }
}

fn swap(op: BinOp) -> BinOp {
    match op {
        BinOp::Lt => BinOp::Gt,
        BinOp::Gt => BinOp::Lt,
        BinOp::Le => BinOp::Ge,
        BinOp::Ge => BinOp::Le,
        other => other,
    }
}

fn negate_op(op: BinOp) -> Option<BinOp> {
    Some(match op {
        BinOp::Lt => BinOp::Ge,
        BinOp::Ge => BinOp::Lt,
        BinOp::Le => BinOp::Gt,
        BinOp::Gt => BinOp::Le,
        BinOp::Eq => BinOp::Ne,
        BinOp::Ne => BinOp::Eq,
        _ => return None,
    })
}

fn relation_interval(op: BinOp, n: i64, assume_true: bool, var_is_left: bool) -> Interval {
    let effective = if var_is_left { op } else { swap(op) };
    let effective = if assume_true {
        effective
    } else {
        match negate_op(effective) {
            Some(op) => op,
            None => return Interval::top(),
        }
    };
    match effective {
        BinOp::Lt => Interval { lo: Bound::NegInf, hi: Bound::Finite(n - 1) },
        BinOp::Le => Interval { lo: Bound::NegInf, hi: Bound::Finite(n) },
        BinOp::Gt => Interval { lo: Bound::Finite(n + 1), hi: Bound::PosInf },
        BinOp::Ge => Interval { lo: Bound::Finite(n), hi: Bound::PosInf },
        BinOp::Eq => Interval::point(n),
        _ => Interval::top(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntervalState;

    #[test]
    fn addition_of_points_is_a_point() {
        let expr = Expr::Bin(BinOp::Add, Box::new(Expr::Const(2)), Box::new(Expr::Const(3)));
        assert_eq!(eval(&expr, &IntervalState::top()), Interval::point(5));
    }

    #[test]
    fn var_plus_const_tracks_registered_bound() {
        let state = IntervalState::seeded([(0, Interval::point(5))]);
        let expr = Expr::Bin(BinOp::Add, Box::new(Expr::Var(0)), Box::new(Expr::Const(1)));
        assert_eq!(eval(&expr, &state), Interval::point(6));
    }

    #[test]
    fn bottom_operand_propagates() {
        let expr = Expr::Bin(BinOp::Add, Box::new(Expr::Bottom), Box::new(Expr::Const(1)));
        assert!(eval(&expr, &IntervalState::top()).is_bottom());
    }

    #[test]
    fn narrowing_lt_constant_true_branch() {
        let cond = Expr::Bin(BinOp::Lt, Box::new(Expr::Var(0)), Box::new(Expr::Const(10)));
        let (id, bound) = constraint_for(&cond, true).unwrap();
        assert_eq!(id, 0);
        assert_eq!(bound, Interval { lo: Bound::NegInf, hi: Bound::Finite(9) });
    }

    #[test]
    fn narrowing_lt_constant_false_branch() {
        let cond = Expr::Bin(BinOp::Lt, Box::new(Expr::Var(0)), Box::new(Expr::Const(10)));
        let (id, bound) = constraint_for(&cond, false).unwrap();
        assert_eq!(id, 0);
        assert_eq!(bound, Interval { lo: Bound::Finite(10), hi: Bound::PosInf });
    }
}
