//! Record mappers: bind a parsed recipe record line to the ENDF record
//! codec in [`crate::record`], reading through [`crate::eval::solve`] and
//! writing through [`crate::eval::eval`].
//!
//! Every function here takes the enclosing section's (MAT, MF, MT) so a
//! `ctrl_spec` using the bare `MAT`/`MF`/`MT` placeholder can be resolved
//! against it, while a literal integer (`SEND`'s `MT=0`) overrides it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::EndfError;
use crate::eval::{eval, resolve_var, set_var, solve};
use crate::logbuf::RecordLog;
use crate::options::{ReadOptions, WriteOptions};
use crate::record::kinds::{ControlNumbers, Dir, Head, Intg, List, Send, Tab1, Tab2, Text};
use crate::record::{read, write};
use crate::recipe::ast::{CtrlField, CtrlSpec, ListItem, RecordLine};
use crate::tree::{LoopVars, Node, Value};

/// The enclosing recipe section's real control numbers.
pub type SectionCtrl = (i32, u32, u32);

fn resolve_ctrl_value(field: CtrlField, section_value: i64) -> i64 {
    match field {
        CtrlField::Section => section_value,
        CtrlField::Literal(n) => n,
    }
}

fn expected_ctrl(ctrl: &CtrlSpec, section: SectionCtrl) -> (i64, i64, i64) {
    (
        resolve_ctrl_value(ctrl.mat, section.0 as i64),
        resolve_ctrl_value(ctrl.mf, section.1 as i64),
        resolve_ctrl_value(ctrl.mt, section.2 as i64),
    )
}

/// Resolve the (MAT, MF, MT) this record line must carry on the wire.
fn resolve_ctrl(ctrl: &CtrlSpec, section: SectionCtrl) -> (i32, u32, u32) {
    let (mat, mf, mt) = expected_ctrl(ctrl, section);
    (mat as i32, mf as u32, mt as u32)
}

/// Verify a record's observed control numbers against its `ctrl_spec`.
fn check_ctrl(ctrl: &CtrlSpec, cn: ControlNumbers, section: SectionCtrl) -> Result<(), EndfError> {
    let (mat, mf, mt, _) = cn;
    let (emat, emf, emt) = expected_ctrl(ctrl, section);
    if mat as i64 != emat || mf as i64 != emf || mt as i64 != emt {
        return Err(EndfError::UnexpectedControlRecord);
    }
    Ok(())
}

fn as_f64(v: Value) -> Result<f64, EndfError> {
    v.as_f64().ok_or(EndfError::Data)
}

fn as_i64(v: Value) -> Result<i64, EndfError> {
    v.as_i64().ok_or(EndfError::Data)
}

fn eval_i64(expr: &crate::recipe::ast::Expr, tree: &Rc<RefCell<Node>>, lv: &LoopVars) -> Result<i64, EndfError> {
    as_i64(eval(expr, tree, lv)?)
}

/// Read one record line, advancing the cursor and binding fields into the
/// data tree. Returns the new cursor offset.
#[allow(clippy::too_many_arguments)]
pub fn read_record(
    record: &RecordLine,
    lines: &[String],
    ofs: usize,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    ropts: &ReadOptions,
    log: &mut RecordLog,
) -> Result<usize, EndfError> {
    let section: SectionCtrl = (
        Node::get(tree, "MAT").and_then(|v| v.as_i64()).unwrap_or(0) as i32,
        Node::get(tree, "MF").and_then(|v| v.as_i64()).unwrap_or(0) as u32,
        Node::get(tree, "MT").and_then(|v| v.as_i64()).unwrap_or(0) as u32,
    );
    let raw_line = lines.get(ofs).cloned().unwrap_or_default();
    match record {
        RecordLine::Head { ctrl, fields } => {
            log.push(ofs, raw_line.clone(), "head_line");
            let (Head(c1, c2, l1, l2, n1, n2), cn, next) = read::read_head(lines, ofs, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(&fields[0], &Value::Float(c1), tree, loop_vars, ropts)?;
            solve(&fields[1], &Value::Float(c2), tree, loop_vars, ropts)?;
            solve(&fields[2], &Value::Int(l1), tree, loop_vars, ropts)?;
            solve(&fields[3], &Value::Int(l2), tree, loop_vars, ropts)?;
            solve(&fields[4], &Value::Int(n1), tree, loop_vars, ropts)?;
            solve(&fields[5], &Value::Int(n2), tree, loop_vars, ropts)?;
            Ok(next)
        }
        RecordLine::Cont { ctrl, fields } => {
            log.push(ofs, raw_line.clone(), "cont_line");
            let (c, cn, next) = read::read_cont(lines, ofs, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(&fields[0], &Value::Float(c.0), tree, loop_vars, ropts)?;
            solve(&fields[1], &Value::Float(c.1), tree, loop_vars, ropts)?;
            solve(&fields[2], &Value::Int(c.2), tree, loop_vars, ropts)?;
            solve(&fields[3], &Value::Int(c.3), tree, loop_vars, ropts)?;
            solve(&fields[4], &Value::Int(c.4), tree, loop_vars, ropts)?;
            solve(&fields[5], &Value::Int(c.5), tree, loop_vars, ropts)?;
            Ok(next)
        }
        RecordLine::Dir { ctrl, fields } => {
            log.push(ofs, raw_line.clone(), "dir_line");
            let (Dir(l1, l2, n1, n2), cn, next) = read::read_dir(lines, ofs, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(&fields[0], &Value::Int(l1), tree, loop_vars, ropts)?;
            solve(&fields[1], &Value::Int(l2), tree, loop_vars, ropts)?;
            solve(&fields[2], &Value::Int(n1), tree, loop_vars, ropts)?;
            solve(&fields[3], &Value::Int(n2), tree, loop_vars, ropts)?;
            Ok(next)
        }
        RecordLine::Intg { ctrl, ii, jj, ndigit, kij } => {
            log.push(ofs, raw_line.clone(), "intg_line");
            let ndigit_val = eval_i64(ndigit, tree, loop_vars)? as usize;
            let (Intg(ii_val, jj_val, kij_vals), cn, next) = read::read_intg(lines, ofs, ndigit_val, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(ii, &Value::Int(ii_val), tree, loop_vars, ropts)?;
            solve(jj, &Value::Int(jj_val), tree, loop_vars, ropts)?;
            let seq = Value::Seq(kij_vals.into_iter().map(Value::Int).collect());
            set_var(kij, seq, tree, loop_vars)?;
            Ok(next)
        }
        RecordLine::Text { ctrl, hl } => {
            log.push(ofs, raw_line.clone(), "text_line");
            let (Text(text), cn, next) = read::read_text(lines, ofs)?;
            check_ctrl(ctrl, cn, section)?;
            set_var(hl, Value::Str(text), tree, loop_vars)?;
            Ok(next)
        }
        RecordLine::List { ctrl, fields, body } => {
            log.push(ofs, raw_line.clone(), "list_line");
            let (List(c1, c2, l1, l2, npl, n2, vals), cn, next) = read::read_list(lines, ofs, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(&fields[0], &Value::Float(c1), tree, loop_vars, ropts)?;
            solve(&fields[1], &Value::Float(c2), tree, loop_vars, ropts)?;
            solve(&fields[2], &Value::Int(l1), tree, loop_vars, ropts)?;
            solve(&fields[3], &Value::Int(l2), tree, loop_vars, ropts)?;
            solve(&fields[4], &Value::Int(npl as i64), tree, loop_vars, ropts)?;
            solve(&fields[5], &Value::Int(n2), tree, loop_vars, ropts)?;
            let mut idx = 0usize;
            read_list_body(body, &vals, &mut idx, tree, loop_vars, ropts)?;
            if idx != vals.len() {
                return Err(EndfError::UnconsumedListElements);
            }
            Ok(next)
        }
        RecordLine::Tab1 { ctrl, fields, name } => {
            log.push(ofs, raw_line.clone(), "tab1_line");
            let (Tab1(c1, c2, l1, l2, _nr, _np, pairs, xy), cn, next) = read::read_tab1(lines, ofs, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(&fields[0], &Value::Float(c1), tree, loop_vars, ropts)?;
            solve(&fields[1], &Value::Float(c2), tree, loop_vars, ropts)?;
            solve(&fields[2], &Value::Int(l1), tree, loop_vars, ropts)?;
            solve(&fields[3], &Value::Int(l2), tree, loop_vars, ropts)?;
            let child = open_table_child(name, tree, loop_vars)?;
            store_nbt_int(&child, &pairs);
            let xs: Vec<Value> = xy.iter().map(|(x, _)| Value::Float(*x)).collect();
            let ys: Vec<Value> = xy.iter().map(|(_, y)| Value::Float(*y)).collect();
            child.borrow_mut().set("X", Value::Seq(xs));
            child.borrow_mut().set("Y", Value::Seq(ys));
            Ok(next)
        }
        RecordLine::Tab2 { ctrl, fields, name } => {
            log.push(ofs, raw_line.clone(), "tab2_line");
            let (Tab2(c1, c2, l1, l2, _nr, nz, pairs), cn, next) = read::read_tab2(lines, ofs, ropts)?;
            check_ctrl(ctrl, cn, section)?;
            solve(&fields[0], &Value::Float(c1), tree, loop_vars, ropts)?;
            solve(&fields[1], &Value::Float(c2), tree, loop_vars, ropts)?;
            solve(&fields[2], &Value::Int(l1), tree, loop_vars, ropts)?;
            solve(&fields[3], &Value::Int(l2), tree, loop_vars, ropts)?;
            solve(&fields[4], &Value::Int(nz as i64), tree, loop_vars, ropts)?;
            let child = open_table_child(name, tree, loop_vars)?;
            store_nbt_int(&child, &pairs);
            Ok(next)
        }
        RecordLine::Send { ctrl } => {
            log.push(ofs, raw_line.clone(), "send_line");
            let (Send { mat, mf }, next) = read::read_send(lines, ofs)?;
            check_ctrl(ctrl, (mat, mf, 0, None), section)?;
            Ok(next)
        }
    }
}

/// Write one record line, appending its formatted 80-column lines (NS left
/// blank; the driver fills it in).
pub fn write_record(
    record: &RecordLine,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
    wopts: &WriteOptions,
) -> Result<Vec<String>, EndfError> {
    let section: SectionCtrl = (
        Node::get(tree, "MAT").and_then(|v| v.as_i64()).unwrap_or(0) as i32,
        Node::get(tree, "MF").and_then(|v| v.as_i64()).unwrap_or(0) as u32,
        Node::get(tree, "MT").and_then(|v| v.as_i64()).unwrap_or(0) as u32,
    );
    match record {
        RecordLine::Head { ctrl, fields } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let vals = eval_six(fields, tree, loop_vars)?;
            write::write_head(Head(vals.0, vals.1, vals.2, vals.3, vals.4, vals.5), mat, mf, mt, wopts)
        }
        RecordLine::Cont { ctrl, fields } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let vals = eval_six(fields, tree, loop_vars)?;
            write::write_cont(vals.0, vals.1, vals.2, vals.3, vals.4, vals.5, mat, mf, mt, wopts)
        }
        RecordLine::Dir { ctrl, fields } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let l1 = eval_i64(&fields[0], tree, loop_vars)?;
            let l2 = eval_i64(&fields[1], tree, loop_vars)?;
            let n1 = eval_i64(&fields[2], tree, loop_vars)?;
            let n2 = eval_i64(&fields[3], tree, loop_vars)?;
            write::write_dir(Dir(l1, l2, n1, n2), mat, mf, mt)
        }
        RecordLine::Intg { ctrl, ii, jj, ndigit, kij } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let ii_val = eval_i64(ii, tree, loop_vars)?;
            let jj_val = eval_i64(jj, tree, loop_vars)?;
            let ndigit_val = eval_i64(ndigit, tree, loop_vars)? as usize;
            let kij_val = resolve_var(kij, tree, loop_vars)?.ok_or(EndfError::Data)?;
            let kij_vec = match kij_val {
                Value::Seq(items) => items.into_iter().map(as_i64).collect::<Result<Vec<_>, _>>()?,
                other => vec![as_i64(other)?],
            };
            write::write_intg(&Intg(ii_val, jj_val, kij_vec), ndigit_val, mat, mf, mt)
        }
        RecordLine::Text { ctrl, hl } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let text = resolve_var(hl, tree, loop_vars)?.and_then(|v| v.as_str().map(str::to_string)).ok_or(EndfError::Data)?;
            write::write_text(&Text(text), mat, mf, mt)
        }
        RecordLine::List { ctrl, fields, body } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let c1 = as_f64(eval(&fields[0], tree, loop_vars)?)?;
            let c2 = as_f64(eval(&fields[1], tree, loop_vars)?)?;
            let l1 = eval_i64(&fields[2], tree, loop_vars)?;
            let l2 = eval_i64(&fields[3], tree, loop_vars)?;
            let n2 = eval_i64(&fields[5], tree, loop_vars)?;
            let vals = write_list_body(body, tree, loop_vars)?;
            let npl = vals.len();
            write::write_list(&List(c1, c2, l1, l2, npl, n2, vals), mat, mf, mt, wopts)
        }
        RecordLine::Tab1 { ctrl, fields, name } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let c1 = as_f64(eval(&fields[0], tree, loop_vars)?)?;
            let c2 = as_f64(eval(&fields[1], tree, loop_vars)?)?;
            let l1 = eval_i64(&fields[2], tree, loop_vars)?;
            let l2 = eval_i64(&fields[3], tree, loop_vars)?;
            let child = resolve_table_child(name, tree, loop_vars)?;
            let pairs = load_nbt_int(&child)?;
            let nr = pairs.len();
            let xy = load_xy(&child)?;
            let np = xy.len();
            write::write_tab1(&Tab1(c1, c2, l1, l2, nr, np, pairs, xy), mat, mf, mt, wopts)
        }
        RecordLine::Tab2 { ctrl, fields, name } => {
            let (mat, mf, mt) = resolve_ctrl(ctrl, section);
            let c1 = as_f64(eval(&fields[0], tree, loop_vars)?)?;
            let c2 = as_f64(eval(&fields[1], tree, loop_vars)?)?;
            let l1 = eval_i64(&fields[2], tree, loop_vars)?;
            let l2 = eval_i64(&fields[3], tree, loop_vars)?;
            let nz = eval_i64(&fields[4], tree, loop_vars)?;
            let child = resolve_table_child(name, tree, loop_vars)?;
            let pairs = load_nbt_int(&child)?;
            let nr = pairs.len();
            write::write_tab2(&Tab2(c1, c2, l1, l2, nr, nz as usize, pairs), mat, mf, mt, wopts)
        }
        RecordLine::Send { ctrl } => {
            let (mat, mf, _) = resolve_ctrl(ctrl, section);
            write::write_send(mat, mf, wopts)
        }
    }
}

fn eval_six(
    fields: &[crate::recipe::ast::Expr; 6],
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<(f64, f64, i64, i64, i64, i64), EndfError> {
    Ok((
        as_f64(eval(&fields[0], tree, loop_vars)?)?,
        as_f64(eval(&fields[1], tree, loop_vars)?)?,
        eval_i64(&fields[2], tree, loop_vars)?,
        eval_i64(&fields[3], tree, loop_vars)?,
        eval_i64(&fields[4], tree, loop_vars)?,
        eval_i64(&fields[5], tree, loop_vars)?,
    ))
}

/// Walk a LIST body on read, consuming `vals` in order. `idx` tracks the
/// flat cursor across nested loops so padding/completeness checks span the
/// whole body.
fn read_list_body(
    body: &[ListItem],
    vals: &[f64],
    idx: &mut usize,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    ropts: &ReadOptions,
) -> Result<(), EndfError> {
    for item in body {
        match item {
            ListItem::Value(expr) => {
                let value = *vals.get(*idx).ok_or(EndfError::MoreListElementsExpected)?;
                *idx += 1;
                solve(expr, &Value::Float(value), tree, loop_vars, ropts)?;
            }
            ListItem::Padding => {
                let remainder = (6 - (*idx % 6)) % 6;
                *idx += remainder;
                if *idx > vals.len() {
                    return Err(EndfError::MoreListElementsExpected);
                }
            }
            ListItem::Loop { var, start, stop, body } => {
                let start = eval_i64(start, tree, loop_vars)?;
                let stop = eval_i64(stop, tree, loop_vars)?;
                for i in start..=stop {
                    loop_vars.bind(var.clone(), i);
                    read_list_body(body, vals, idx, tree, loop_vars, ropts)?;
                }
                loop_vars.unbind(var);
            }
        }
    }
    Ok(())
}

/// Walk a LIST body on write, producing the flat value sequence.
fn write_list_body(body: &[ListItem], tree: &Rc<RefCell<Node>>, loop_vars: &LoopVars) -> Result<Vec<f64>, EndfError> {
    let mut loop_vars = loop_vars.clone();
    write_list_body_mut(body, tree, &mut loop_vars)
}

fn write_list_body_mut(
    body: &[ListItem],
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
) -> Result<Vec<f64>, EndfError> {
    let mut out = Vec::new();
    for item in body {
        match item {
            ListItem::Value(expr) => {
                out.push(as_f64(eval(expr, tree, loop_vars)?)?);
            }
            ListItem::Padding => {
                let remainder = (6 - (out.len() % 6)) % 6;
                out.extend(std::iter::repeat(0.0).take(remainder));
            }
            ListItem::Loop { var, start, stop, body } => {
                let start = eval_i64(start, tree, loop_vars)?;
                let stop = eval_i64(stop, tree, loop_vars)?;
                for i in start..=stop {
                    loop_vars.bind(var.clone(), i);
                    out.extend(write_list_body_mut(body, tree, loop_vars)?);
                }
                loop_vars.unbind(var);
            }
        }
    }
    Ok(out)
}

fn open_table_child(
    name: &Option<crate::recipe::ast::ExtVarName>,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<Rc<RefCell<Node>>, EndfError> {
    let child = Node::new_child(tree);
    match name {
        Some(ev) => set_var(ev, Value::Tree(child.clone()), tree, loop_vars)?,
        None => tree.borrow_mut().set("table", Value::Tree(child.clone())),
    }
    Ok(child)
}

fn resolve_table_child(
    name: &Option<crate::recipe::ast::ExtVarName>,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<Rc<RefCell<Node>>, EndfError> {
    let value = match name {
        Some(ev) => resolve_var(ev, tree, loop_vars)?,
        None => Node::get(tree, "table"),
    };
    match value {
        Some(Value::Tree(child)) => Ok(child),
        _ => Err(EndfError::Data),
    }
}

fn store_nbt_int(child: &Rc<RefCell<Node>>, pairs: &[(u32, u32)]) {
    let nbt: Vec<Value> = pairs.iter().map(|(a, _)| Value::Int(*a as i64)).collect();
    let interp: Vec<Value> = pairs.iter().map(|(_, b)| Value::Int(*b as i64)).collect();
    child.borrow_mut().set("NBT", Value::Seq(nbt));
    child.borrow_mut().set("INT", Value::Seq(interp));
}

fn load_nbt_int(child: &Rc<RefCell<Node>>) -> Result<Vec<(u32, u32)>, EndfError> {
    let nbt = match Node::get(child, "NBT") {
        Some(Value::Seq(items)) => items,
        _ => return Err(EndfError::Data),
    };
    let interp = match Node::get(child, "INT") {
        Some(Value::Seq(items)) => items,
        _ => return Err(EndfError::Data),
    };
    nbt.into_iter()
        .zip(interp)
        .map(|(a, b)| Ok((as_i64(a)? as u32, as_i64(b)? as u32)))
        .collect()
}

fn load_xy(child: &Rc<RefCell<Node>>) -> Result<Vec<(f64, f64)>, EndfError> {
    let xs = match Node::get(child, "X") {
        Some(Value::Seq(items)) => items,
        _ => return Err(EndfError::Data),
    };
    let ys = match Node::get(child, "Y") {
        Some(Value::Seq(items)) => items,
        _ => return Err(EndfError::Data),
    };
    xs.into_iter()
        .zip(ys)
        .map(|(x, y)| Ok((as_f64(x)?, as_f64(y)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::ast::{CtrlField, Expr, ExtVarName, Num};

    fn section_ctrl(mat: i64, mf: i64, mt: i64) -> CtrlSpec {
        CtrlSpec {
            mat: CtrlField::Literal(mat),
            mf: CtrlField::Literal(mf),
            mt: CtrlField::Literal(mt),
        }
    }

    fn var(name: &str) -> Expr {
        Expr::Var(ExtVarName { name: name.to_string(), indices: vec![] })
    }

    fn lit(i: i64) -> Expr {
        Expr::Lit(Num::Int(i))
    }

    fn line(body: &str, mat: &str, mf: &str, mt: &str, ns: &str) -> String {
        format!("{body:<66}{mat:>4}{mf:>2}{mt:>3}{ns:>5}")
    }

    #[test]
    fn reads_head_and_binds_variables() {
        let body = " 1001.000000 0.9991673          0          0          0          0";
        let lines = vec![line(body, "125", "1", "451", "1")];
        let record = RecordLine::Head {
            ctrl: section_ctrl(125, 1, 451),
            fields: [var("ZA"), var("AWR"), lit(0), lit(0), lit(0), lit(0)],
        };
        let tree = Node::new_root();
        let mut lv = LoopVars::new();
        let mut log = RecordLog::new();
        let next = read_record(&record, &lines, 0, &tree, &mut lv, &ReadOptions::default(), &mut log).unwrap();
        assert_eq!(next, 1);
        assert_eq!(Node::get(&tree, "ZA").unwrap().as_f64(), Some(1001.0));
    }

    #[test]
    fn write_round_trips_head() {
        let tree = Node::new_root();
        tree.borrow_mut().set("ZA", Value::Float(1001.0));
        tree.borrow_mut().set("AWR", Value::Float(0.9991673));
        let lv = LoopVars::new();
        let record = RecordLine::Head {
            ctrl: section_ctrl(125, 1, 451),
            fields: [var("ZA"), var("AWR"), lit(0), lit(0), lit(0), lit(0)],
        };
        let lines = write_record(&record, &tree, &lv, &WriteOptions::default()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 80);
    }

    #[test]
    fn list_body_with_padding_covers_full_range() {
        let body = vec![
            ListItem::Loop {
                var: "i".to_string(),
                start: lit(1),
                stop: lit(7),
                body: vec![ListItem::Value(Expr::Var(ExtVarName {
                    name: "x".to_string(),
                    indices: vec![crate::recipe::ast::IndexTerm::Var("i".to_string())],
                }))],
            },
            ListItem::Padding,
            ListItem::Loop {
                var: "j".to_string(),
                start: lit(1),
                stop: lit(3),
                body: vec![ListItem::Value(Expr::Var(ExtVarName {
                    name: "y".to_string(),
                    indices: vec![crate::recipe::ast::IndexTerm::Var("j".to_string())],
                }))],
            },
        ];
        let vals: Vec<f64> = (1..=7).map(|i| i as f64).chain((1..=3).map(|j| j as f64 + 100.0)).collect();
        assert_eq!(vals.len(), 10);
        let mut padded = vals[..7].to_vec();
        padded.extend(std::iter::repeat(0.0).take(5));
        padded.extend(&vals[7..]);
        let tree = Node::new_root();
        let mut lv = LoopVars::new();
        let mut idx = 0usize;
        read_list_body(&body, &padded, &mut idx, &tree, &mut lv, &ReadOptions::default()).unwrap();
        assert_eq!(idx, 12);
        assert_eq!(Node::get_indexed(&tree, "x", &[1]).unwrap().as_f64(), Some(1.0));
        assert_eq!(Node::get_indexed(&tree, "y", &[3]).unwrap().as_f64(), Some(103.0));
    }

    #[test]
    fn tab1_round_trips_table_under_reserved_key() {
        use crate::record::kinds::Tab1;

        let wire = write::write_tab1(
            &Tab1(0.0, 0.0, 0, 0, 1, 2, vec![(2, 2)], vec![(1.0, 10.0), (2.0, 20.0)]),
            1,
            3,
            1,
            &WriteOptions::default(),
        )
        .unwrap();

        let record = RecordLine::Tab1 {
            ctrl: section_ctrl(1, 3, 1),
            fields: [lit(0), lit(0), lit(0), lit(0)],
            name: None,
        };
        let tree = Node::new_root();
        let mut lv = LoopVars::new();
        let mut log = RecordLog::new();
        let next = read_record(&record, &wire, 0, &tree, &mut lv, &ReadOptions::default(), &mut log).unwrap();
        assert_eq!(next, wire.len());
        let table = match Node::get(&tree, "table") {
            Some(Value::Tree(t)) => t,
            _ => panic!("expected a table subsection"),
        };
        assert_eq!(Node::get(&table, "X").unwrap().as_f64(), None);
        match Node::get(&table, "X").unwrap() {
            Value::Seq(xs) => assert_eq!(xs.len(), 2),
            _ => panic!("expected X to be a sequence"),
        }
    }
}
