//! Flow-control executor: walks a parsed recipe [`Ast`] against a line
//! buffer and a data tree, in either read or write mode.
//!
//! Read mode consumes lines from a cursor and binds variables; write mode
//! produces lines from already-bound variables. Both modes share the same
//! instruction dispatch (`run_body`/`run_instruction`); only `Mode`
//! distinguishes how a [`RecordLine`] is executed, via [`crate::mapper`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::EndfError;
use crate::eval::{eval, eval_bool};
use crate::logbuf::RecordLog;
use crate::mapper::{read_record, write_record};
use crate::options::{ReadOptions, WriteOptions};
use crate::recipe::ast::{Ast, Instruction};
use crate::tree::{LoopVars, Node, Value};

/// Read-mode state: the full line buffer plus a cursor, threaded through
/// every instruction so a lookahead can snapshot and restore it.
pub struct ReadState<'a> {
    pub lines: &'a [String],
    pub ofs: usize,
    pub opts: ReadOptions,
}

/// Write-mode state: the output line buffer being appended to.
#[derive(Default)]
pub struct WriteState {
    pub out: Vec<String>,
}

/// Execute every instruction in `ast.body` in read mode, consuming lines
/// from `state.lines` starting at `state.ofs`.
pub fn run_read(
    ast: &Ast,
    state: &mut ReadState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    log: &mut RecordLog,
) -> Result<(), EndfError> {
    run_body_read(&ast.body, state, tree, loop_vars, log)
}

/// Execute every instruction in `ast.body` in write mode, appending
/// formatted lines to `state.out`.
pub fn run_write(
    ast: &Ast,
    state: &mut WriteState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    wopts: &WriteOptions,
) -> Result<(), EndfError> {
    run_body_write(&ast.body, state, tree, loop_vars, wopts)
}

fn run_body_read(
    body: &[Instruction],
    state: &mut ReadState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    log: &mut RecordLog,
) -> Result<(), EndfError> {
    for instr in body {
        run_instruction_read(instr, state, tree, loop_vars, log)?;
    }
    Ok(())
}

fn run_instruction_read(
    instr: &Instruction,
    state: &mut ReadState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    log: &mut RecordLog,
) -> Result<(), EndfError> {
    match instr {
        Instruction::Record(record) => {
            let next = read_record(record, state.lines, state.ofs, tree, loop_vars, &state.opts, log)?;
            state.ofs = next;
            loop_vars.set_ofs(state.ofs);
            Ok(())
        }
        Instruction::ForLoop { var, start, stop, body } => {
            let start = eval(start, tree, loop_vars)?.as_i64().ok_or(EndfError::Data)?;
            let stop = eval(stop, tree, loop_vars)?.as_i64().ok_or(EndfError::Data)?;
            for i in start..=stop {
                loop_vars.bind(var.clone(), i);
                run_body_read(body, state, tree, loop_vars, log)?;
            }
            loop_vars.unbind(var);
            Ok(())
        }
        Instruction::IfClause { branches, else_body } => {
            for branch in branches {
                let matched = match &branch.lookahead {
                    Some(n_expr) => {
                        let n = eval(n_expr, tree, loop_vars)?.as_i64().ok_or(EndfError::Data)? as usize;
                        speculative_condition(&branch.condition, n, &branch.body, state, tree, loop_vars, log)?
                    }
                    None => eval_bool(&branch.condition, tree, loop_vars)?,
                };
                if matched {
                    return run_body_read(&branch.body, state, tree, loop_vars, log);
                }
            }
            if let Some(body) = else_body {
                return run_body_read(body, state, tree, loop_vars, log);
            }
            Ok(())
        }
        Instruction::Section { open, close, body } => {
            let child = open_section(open, tree, loop_vars)?;
            let result = run_body_read(body, state, &child, loop_vars, log);
            verify_section_close(open, close, tree, loop_vars)?;
            result
        }
        Instruction::Stop(message) => Err(EndfError::Stop(message.clone())),
    }
}

/// A `[lookahead=N]` head: snapshot parser state, speculatively read up to
/// `N` of the branch's own leading records so the condition's variables
/// become bound exactly as they would if the branch were taken for real,
/// evaluate the condition, then restore everything except the verdict. A
/// read failure during the speculative phase makes the branch non-matching
/// rather than propagating.
fn speculative_condition(
    condition: &crate::recipe::ast::BoolExpr,
    lookahead_records: usize,
    body: &[Instruction],
    state: &mut ReadState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    log: &mut RecordLog,
) -> Result<bool, EndfError> {
    let snapshot_vars = tree.borrow().snapshot_vars();
    let snapshot_loop_vars = loop_vars.clone();
    let snapshot_ofs = state.ofs;
    let snapshot_log = (!state.opts.log_lookahead_traceback).then(|| log.clone());

    let outcome = peek_records(lookahead_records, body, state, tree, loop_vars, log)
        .and_then(|_| eval_bool(condition, tree, loop_vars));

    tree.borrow_mut().restore_vars(snapshot_vars);
    *loop_vars = snapshot_loop_vars;
    state.ofs = snapshot_ofs;
    if let Some(restored_log) = snapshot_log {
        *log = restored_log;
    }

    match outcome {
        Ok(matched) => Ok(matched),
        Err(_) => Ok(false),
    }
}

/// Speculatively run the branch's own leading `Instruction::Record`
/// declarations (up to `n` of them) through the real record mapper, so a
/// lookahead condition's field names (`LI`, `LTT`, ...) get bound the same
/// way they would if the branch were actually taken. Stops at the first
/// non-record leading instruction; used only by [`speculative_condition`],
/// which discards every effect afterward regardless of outcome.
fn peek_records(
    n: usize,
    body: &[Instruction],
    state: &mut ReadState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    log: &mut RecordLog,
) -> Result<(), EndfError> {
    let mut read_count = 0;
    for instr in body {
        if read_count >= n {
            break;
        }
        match instr {
            Instruction::Record(record) => {
                let next = read_record(record, state.lines, state.ofs, tree, loop_vars, &state.opts, log)?;
                state.ofs = next;
                loop_vars.set_ofs(state.ofs);
                read_count += 1;
            }
            _ => break,
        }
    }
    if read_count < n {
        return Err(EndfError::EndOfFile);
    }
    Ok(())
}

fn run_body_write(
    body: &[Instruction],
    state: &mut WriteState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    wopts: &WriteOptions,
) -> Result<(), EndfError> {
    for instr in body {
        run_instruction_write(instr, state, tree, loop_vars, wopts)?;
    }
    Ok(())
}

fn run_instruction_write(
    instr: &Instruction,
    state: &mut WriteState,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &mut LoopVars,
    wopts: &WriteOptions,
) -> Result<(), EndfError> {
    match instr {
        Instruction::Record(record) => {
            state.out.extend(write_record(record, tree, loop_vars, wopts)?);
            Ok(())
        }
        Instruction::ForLoop { var, start, stop, body } => {
            let start = eval(start, tree, loop_vars)?.as_i64().ok_or(EndfError::Data)?;
            let stop = eval(stop, tree, loop_vars)?.as_i64().ok_or(EndfError::Data)?;
            for i in start..=stop {
                loop_vars.bind(var.clone(), i);
                run_body_write(body, state, tree, loop_vars, wopts)?;
            }
            loop_vars.unbind(var);
            Ok(())
        }
        Instruction::IfClause { branches, else_body } => {
            for branch in branches {
                if eval_bool(&branch.condition, tree, loop_vars)? {
                    return run_body_write(&branch.body, state, tree, loop_vars, wopts);
                }
            }
            if let Some(body) = else_body {
                return run_body_write(body, state, tree, loop_vars, wopts);
            }
            Ok(())
        }
        Instruction::Section { open, close, body } => {
            let child = resolve_existing_section(open, tree, loop_vars)?;
            let result = run_body_write(body, state, &child, loop_vars, wopts);
            verify_section_close(open, close, tree, loop_vars)?;
            result
        }
        Instruction::Stop(message) => Err(EndfError::Stop(message.clone())),
    }
}

fn open_section(
    open: &crate::recipe::ast::ExtVarName,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<Rc<RefCell<Node>>, EndfError> {
    let child = Node::new_child(tree);
    crate::eval::set_var(open, Value::Tree(child.clone()), tree, loop_vars)?;
    Ok(child)
}

fn resolve_existing_section(
    open: &crate::recipe::ast::ExtVarName,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<Rc<RefCell<Node>>, EndfError> {
    match crate::eval::resolve_var(open, tree, loop_vars)? {
        Some(Value::Tree(child)) => Ok(child),
        _ => Err(EndfError::Data),
    }
}

fn verify_section_close(
    open: &crate::recipe::ast::ExtVarName,
    close: &crate::recipe::ast::ExtVarName,
    tree: &Rc<RefCell<Node>>,
    loop_vars: &LoopVars,
) -> Result<(), EndfError> {
    let open_indices = crate::eval::resolve_indices(&open.indices, loop_vars)?;
    let close_indices = crate::eval::resolve_indices(&close.indices, loop_vars)?;
    if open.name != close.name || open_indices != close_indices {
        return Err(EndfError::InconsistentSectionBrackets);
    }
    let _ = tree;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::ast::{BoolExpr, CmpOp, CtrlField, CtrlSpec, Expr, ExtVarName, IfBranch, Num, RecordLine};

    fn section_ctrl() -> CtrlSpec {
        CtrlSpec {
            mat: CtrlField::Literal(125),
            mf: CtrlField::Literal(1),
            mt: CtrlField::Literal(451),
        }
    }

    fn var(name: &str) -> Expr {
        Expr::Var(ExtVarName { name: name.to_string(), indices: vec![] })
    }

    fn lit(i: i64) -> Expr {
        Expr::Lit(Num::Int(i))
    }

    fn head_line(body: &str, mat: &str, mf: &str, mt: &str, ns: &str) -> String {
        format!("{body:<66}{mat:>4}{mf:>2}{mt:>3}{ns:>5}")
    }

    #[test]
    fn runs_a_single_head_record() {
        let body = " 1001.000000 0.9991673          0          0          0          0";
        let lines = vec![head_line(body, "125", "1", "451", "1")];
        let ast = Ast {
            body: vec![Instruction::Record(RecordLine::Head {
                ctrl: section_ctrl(),
                fields: [var("ZA"), var("AWR"), lit(0), lit(0), lit(0), lit(0)],
            })],
        };
        let tree = Node::new_root();
        tree.borrow_mut().set("MAT", Value::Int(125));
        tree.borrow_mut().set("MF", Value::Int(1));
        tree.borrow_mut().set("MT", Value::Int(451));
        let mut loop_vars = LoopVars::new();
        let mut log = RecordLog::new();
        let mut state = ReadState { lines: &lines, ofs: 0, opts: ReadOptions::default() };
        run_read(&ast, &mut state, &tree, &mut loop_vars, &mut log).unwrap();
        assert_eq!(state.ofs, 1);
        assert_eq!(Node::get(&tree, "ZA").unwrap().as_f64(), Some(1001.0));
    }

    #[test]
    fn for_loop_runs_inclusive_range() {
        let ast = Ast {
            body: vec![Instruction::ForLoop {
                var: "i".to_string(),
                start: lit(1),
                stop: lit(3),
                body: vec![],
            }],
        };
        let tree = Node::new_root();
        let mut loop_vars = LoopVars::new();
        let mut log = RecordLog::new();
        let lines: Vec<String> = vec![];
        let mut state = ReadState { lines: &lines, ofs: 0, opts: ReadOptions::default() };
        run_read(&ast, &mut state, &tree, &mut loop_vars, &mut log).unwrap();
        assert_eq!(loop_vars.get("i"), None);
    }

    #[test]
    fn section_mismatch_is_rejected() {
        let ast = Ast {
            body: vec![Instruction::Section {
                open: ExtVarName { name: "leg".to_string(), indices: vec![] },
                close: ExtVarName { name: "other".to_string(), indices: vec![] },
                body: vec![],
            }],
        };
        let tree = Node::new_root();
        let mut loop_vars = LoopVars::new();
        let mut log = RecordLog::new();
        let lines: Vec<String> = vec![];
        let mut state = ReadState { lines: &lines, ofs: 0, opts: ReadOptions::default() };
        assert!(run_read(&ast, &mut state, &tree, &mut loop_vars, &mut log).is_err());
    }

    #[test]
    fn if_without_lookahead_picks_matching_branch() {
        tree_with_li_select(1);
    }

    fn tree_with_li_select(li: i64) {
        let ast = Ast {
            body: vec![Instruction::IfClause {
                branches: vec![
                    IfBranch {
                        condition: BoolExpr::Cmp(CmpOp::Eq, var("LI"), lit(1)),
                        lookahead: None,
                        body: vec![Instruction::Stop("branch-one".to_string())],
                    },
                    IfBranch {
                        condition: BoolExpr::Cmp(CmpOp::Eq, var("LI"), lit(0)),
                        lookahead: None,
                        body: vec![Instruction::Stop("branch-two".to_string())],
                    },
                ],
                else_body: None,
            }],
        };
        let tree = Node::new_root();
        tree.borrow_mut().set("LI", Value::Int(li));
        let mut loop_vars = LoopVars::new();
        let mut log = RecordLog::new();
        let lines: Vec<String> = vec![];
        let mut state = ReadState { lines: &lines, ofs: 0, opts: ReadOptions::default() };
        let err = run_read(&ast, &mut state, &tree, &mut loop_vars, &mut log).unwrap_err();
        match err {
            EndfError::Stop(msg) => assert_eq!(msg, if li == 1 { "branch-one" } else { "branch-two" }),
            other => panic!("unexpected error {other:?}"),
        }
    }

    /// Property 5: after a lookahead whose speculative branch consumes
    /// lines and then turns out not to match, parser state (cursor and
    /// tree bindings) is exactly what it was before the lookahead ran.
    #[test]
    fn lookahead_restores_state_on_non_matching_branch() {
        let ast = Ast {
            body: vec![Instruction::IfClause {
                branches: vec![IfBranch {
                    // LI on the wire is 1, so this never matches, but the
                    // speculative read must still bind C1/C2/LI before
                    // the comparison is made.
                    condition: BoolExpr::Cmp(CmpOp::Eq, var("LI"), lit(99)),
                    lookahead: Some(lit(1)),
                    body: vec![Instruction::Record(RecordLine::Head {
                        ctrl: section_ctrl(),
                        fields: [var("C1"), var("C2"), var("LI"), lit(0), lit(0), lit(0)],
                    })],
                }],
                else_body: None,
            }],
        };
        let body = " 1001.000000 0.9991673          1          0          0          0";
        let lines = vec![head_line(body, "125", "1", "451", "1")];
        let tree = Node::new_root();
        tree.borrow_mut().set("MAT", Value::Int(125));
        tree.borrow_mut().set("MF", Value::Int(1));
        tree.borrow_mut().set("MT", Value::Int(451));
        let mut loop_vars = LoopVars::new();
        let mut log = RecordLog::new();
        let mut state = ReadState { lines: &lines, ofs: 0, opts: ReadOptions::default() };

        run_read(&ast, &mut state, &tree, &mut loop_vars, &mut log).unwrap();

        assert_eq!(state.ofs, 0, "speculative read must not advance the real cursor");
        assert!(Node::get(&tree, "LI").is_none(), "speculative bindings must not leak into the tree");
        assert!(Node::get(&tree, "C1").is_none());
    }
}
