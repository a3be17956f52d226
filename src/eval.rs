//! Forward and inverse evaluation of recipe expressions against the data
//! tree and loop variables.
//!
//! Forward evaluation (`eval`) computes an expression's value from already
//! known operands, for the write side. Inverse evaluation (`solve`) is the
//! read side's workhorse: most record fields in real recipes are bare
//! variable names, but some are small arithmetic expressions of a
//! not-yet-bound variable (`NW-1`, `2*NPL`, ...) or of already-known
//! values that must merely be checked for consistency (literal constants,
//! repeated variable references). `solve` handles both by walking the
//! expression tree once to find the single unknown leaf (if any) and
//! algebraically inverting every node on the path down to it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::EndfError;
use crate::options::ReadOptions;
use crate::recipe::ast::{BoolExpr, CmpOp, Expr, ExtVarName, IndexTerm, Num};
use crate::tree::{LoopVars, Node, Value};

fn num_to_value(n: Num) -> Value {
    match n {
        Num::Int(i) => Value::Int(i),
        Num::Float(f) => Value::Float(f),
    }
}

/// `|a-b| <= max(atol, rtol*max(|a|,|b|))`.
pub fn fuzzy_eq(a: f64, b: f64, atol: f64, rtol: f64) -> bool {
    (a - b).abs() <= atol.max(rtol * a.abs().max(b.abs()))
}

pub(crate) fn resolve_indices(indices: &[IndexTerm], loop_vars: &LoopVars) -> Result<Vec<i64>, EndfError> {
    indices
        .iter()
        .map(|term| match term {
            IndexTerm::Literal(v) => Ok(*v),
            IndexTerm::Var(name) => loop_vars.get(name).ok_or(EndfError::Data),
        })
        .collect()
}

/// Resolve a variable's current value, or `None` if it is not yet bound
/// anywhere in scope (the read-side definition of "unknown").
pub(crate) fn resolve_var(ev: &ExtVarName, tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<Option<Value>, EndfError> {
    if ev.indices.is_empty() {
        if let Some(v) = loop_vars.get(&ev.name) {
            return Ok(Some(Value::Int(v)));
        }
        return Ok(Node::get(tree, &ev.name));
    }
    let indices = resolve_indices(&ev.indices, loop_vars)?;
    Ok(Node::get_indexed(tree, &ev.name, &indices))
}

/// Bind `ev` to an arbitrary [`Value`] directly, bypassing arithmetic
/// inversion. Used by [`crate::mapper`] for slots that name a variable
/// outright rather than an expression of one (`TEXT`'s `HL`, `INTG`'s
/// `KIJ`, `TAB1`/`TAB2`'s named table).
pub(crate) fn set_var(
    ev: &ExtVarName,
    value: Value,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<(), EndfError> {
    if ev.indices.is_empty() {
        tree.borrow_mut().set(ev.name.clone(), value);
    } else {
        let indices = resolve_indices(&ev.indices, loop_vars)?;
        tree.borrow_mut().set_indexed(&ev.name, indices, value);
    }
    Ok(())
}

/// Forward evaluation: every operand must already be known.
pub fn eval(expr: &Expr, tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<Value, EndfError> {
    match expr {
        Expr::Lit(n) => Ok(num_to_value(*n)),
        Expr::Desired(inner) => eval(inner, tree, loop_vars),
        Expr::Var(ev) => resolve_var(ev, tree, loop_vars)?.ok_or(EndfError::Data),
        Expr::Neg(inner) => match eval(inner, tree, loop_vars)? {
            Value::Int(i) => Ok(Value::Int(-i)),
            other => Ok(Value::Float(-other.as_f64().ok_or(EndfError::Data)?)),
        },
        Expr::Add(a, b) => arith(eval(a, tree, loop_vars)?, eval(b, tree, loop_vars)?, Op::Add),
        Expr::Sub(a, b) => arith(eval(a, tree, loop_vars)?, eval(b, tree, loop_vars)?, Op::Sub),
        Expr::Mul(a, b) => arith(eval(a, tree, loop_vars)?, eval(b, tree, loop_vars)?, Op::Mul),
        Expr::Div(a, b) => arith(eval(a, tree, loop_vars)?, eval(b, tree, loop_vars)?, Op::Div),
    }
}

/// Evaluate a boolean recipe expression (`if` heads): comparisons are
/// numeric, `and`/`or` compose with standard short-circuiting precedence.
pub fn eval_bool(expr: &BoolExpr, tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<bool, EndfError> {
    match expr {
        BoolExpr::Cmp(op, a, b) => {
            let a = eval(a, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
            let b = eval(b, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
            Ok(match op {
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Ge => a >= b,
                CmpOp::Gt => a > b,
            })
        }
        BoolExpr::And(a, b) => Ok(eval_bool(a, tree, loop_vars)? && eval_bool(b, tree, loop_vars)?),
        BoolExpr::Or(a, b) => Ok(eval_bool(a, tree, loop_vars)? || eval_bool(b, tree, loop_vars)?),
    }
}

#[derive(Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Int/float promotion: the result is an integer iff both operands are,
/// except division, which is always floating-point.
fn arith(a: Value, b: Value, op: Op) -> Result<Value, EndfError> {
    if let Op::Div = op {
        let a = a.as_f64().ok_or(EndfError::Data)?;
        let b = b.as_f64().ok_or(EndfError::Data)?;
        return Ok(Value::Float(a / b));
    }
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match op {
            Op::Add => x + y,
            Op::Sub => x - y,
            Op::Mul => x * y,
            Op::Div => unreachable!(),
        })),
        (a, b) => {
            let x = a.as_f64().ok_or(EndfError::Data)?;
            let y = b.as_f64().ok_or(EndfError::Data)?;
            Ok(Value::Float(match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => unreachable!(),
            }))
        }
    }
}

fn contains_unknown(expr: &Expr, tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<bool, EndfError> {
    Ok(match expr {
        Expr::Lit(_) => false,
        Expr::Desired(inner) => contains_unknown(inner, tree, loop_vars)?,
        Expr::Var(ev) => resolve_var(ev, tree, loop_vars)?.is_none(),
        Expr::Neg(inner) => contains_unknown(inner, tree, loop_vars)?,
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
            contains_unknown(a, tree, loop_vars)? || contains_unknown(b, tree, loop_vars)?
        }
    })
}

fn count_unknowns(expr: &Expr, tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<usize, EndfError> {
    Ok(match expr {
        Expr::Lit(_) => 0,
        Expr::Desired(inner) => count_unknowns(inner, tree, loop_vars)?,
        Expr::Var(ev) => usize::from(resolve_var(ev, tree, loop_vars)?.is_none()),
        Expr::Neg(inner) => count_unknowns(inner, tree, loop_vars)?,
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
            count_unknowns(a, tree, loop_vars)? + count_unknowns(b, tree, loop_vars)?
        }
    })
}

/// Walk down to the single unknown leaf, reversing each binary/unary node
/// on the path so `target` becomes that leaf's required value.
fn invert(
    expr: &Expr,
    target: f64,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<(ExtVarName, f64), EndfError> {
    match expr {
        Expr::Var(ev) => Ok((ev.clone(), target)),
        Expr::Desired(inner) => invert(inner, target, tree, loop_vars),
        Expr::Neg(inner) => invert(inner, -target, tree, loop_vars),
        Expr::Add(a, b) => {
            if contains_unknown(a, tree, loop_vars)? {
                let bv = eval(b, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(a, target - bv, tree, loop_vars)
            } else {
                let av = eval(a, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(b, target - av, tree, loop_vars)
            }
        }
        Expr::Sub(a, b) => {
            if contains_unknown(a, tree, loop_vars)? {
                let bv = eval(b, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(a, target + bv, tree, loop_vars)
            } else {
                let av = eval(a, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(b, av - target, tree, loop_vars)
            }
        }
        Expr::Mul(a, b) => {
            if contains_unknown(a, tree, loop_vars)? {
                let bv = eval(b, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(a, target / bv, tree, loop_vars)
            } else {
                let av = eval(a, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(b, target / av, tree, loop_vars)
            }
        }
        Expr::Div(a, b) => {
            if contains_unknown(a, tree, loop_vars)? {
                let bv = eval(b, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(a, target * bv, tree, loop_vars)
            } else {
                let av = eval(a, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
                invert(b, av / target, tree, loop_vars)
            }
        }
        Expr::Lit(_) => Err(EndfError::Data),
    }
}

/// Whether `expr`'s outermost node is a `?`-marked desired binding.
/// Recipes always place `?` on the whole field expression, never buried
/// inside a sub-expression, so a shallow check suffices.
fn is_desired(expr: &Expr) -> bool {
    matches!(expr, Expr::Desired(_))
}

fn bind(ev: &ExtVarName, value: f64, tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<(), EndfError> {
    let bound = if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::Int(value as i64)
    } else {
        Value::Float(value)
    };
    if ev.indices.is_empty() {
        tree.borrow_mut().set(ev.name.clone(), bound);
    } else {
        let indices = resolve_indices(&ev.indices, loop_vars)?;
        tree.borrow_mut().set_indexed(&ev.name, indices, bound);
    }
    Ok(())
}

fn verify(
    expr: &Expr,
    target: &Value,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
    opts: &ReadOptions,
) -> Result<(), EndfError> {
    let desired = is_desired(expr);
    let actual = eval(expr, tree, loop_vars)?.as_f64().ok_or(EndfError::Data)?;
    let expected = target.as_f64().ok_or(EndfError::Data)?;
    let equal = if opts.fuzzy_matching {
        fuzzy_eq(actual, expected, opts.atol, opts.rtol)
    } else {
        actual == expected
    };
    if equal {
        return Ok(());
    }
    if desired && opts.ignore_varspec_mismatch {
        return Ok(());
    }
    if expected == 0.0 && opts.ignore_zero_mismatch {
        return Ok(());
    }
    if opts.ignore_number_mismatch {
        return Ok(());
    }
    if desired {
        Err(EndfError::InconsistentVariableBinding)
    } else {
        Err(EndfError::NumberMismatch)
    }
}

/// Bind or verify `expr` against a value read off the wire.
///
/// If `expr` contains exactly one unknown variable, it is bound to the
/// value that makes `expr` equal `target`. If it contains none, `expr` is
/// forward-evaluated and checked against `target` (subject to the
/// tolerance options). More than one unknown is a recipe-authoring error.
pub fn solve(
    expr: &Expr,
    target: &Value,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
    opts: &ReadOptions,
) -> Result<(), EndfError> {
    match count_unknowns(expr, tree, loop_vars)? {
        0 => verify(expr, target, tree, loop_vars, opts),
        1 => {
            let target_f = target.as_f64().ok_or(EndfError::Data)?;
            let (ev, value) = invert(expr, target_f, tree, loop_vars)?;
            bind(&ev, value, tree, loop_vars)
        }
        _ => Err(EndfError::Data),
    }
}
