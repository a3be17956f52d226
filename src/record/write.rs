//! Record writing.
//!
//! Every function here returns one or more complete 80-column lines, with
//! the trailing sequence-number field left blank: the driver overwrites it
//! once a section's final line count is known (`SPEC_FULL.md` §4.H), except
//! for the four control-only kinds, whose NS is fixed by ENDF-6 convention
//! and is therefore written inline.

use crate::error::EndfError;
use crate::fortran::{write_endf_float, write_endf_integer};
use crate::options::WriteOptions;

use super::kinds::{Dir, Dummy, Head, Intg, List, Tab1, Tab2, Text, MEND_TEND_NS, SEND_FEND_NS};

const BLANK_FIELD: &str = "           ";

fn format_float(val: f64, opts: &WriteOptions) -> Result<String, EndfError> {
    Ok(write_endf_float(val, &opts.float_opts())?)
}

fn format_int(val: i64, width: usize) -> Result<String, EndfError> {
    Ok(write_endf_integer(val, width)?)
}

fn control_suffix(mat: i32, mf: u32, mt: u32) -> Result<String, EndfError> {
    Ok(format!(
        "{}{}{}     ",
        write_endf_integer(mat as i64, 4)?,
        write_endf_integer(mf as i64, 2)?,
        write_endf_integer(mt as i64, 3)?,
    ))
}

fn control_suffix_with_ns(mat: i32, mf: u32, mt: u32, ns: u32) -> Result<String, EndfError> {
    Ok(format!(
        "{}{}{}{}",
        write_endf_integer(mat as i64, 4)?,
        write_endf_integer(mf as i64, 2)?,
        write_endf_integer(mt as i64, 3)?,
        write_endf_integer(ns as i64, 5)?,
    ))
}

fn cont_body(c1: f64, c2: f64, l1: i64, l2: i64, n1: i64, n2: i64, opts: &WriteOptions) -> Result<String, EndfError> {
    Ok(format!(
        "{}{}{}{}{}{}",
        format_float(c1, opts)?,
        format_float(c2, opts)?,
        format_int(l1, 11)?,
        format_int(l2, 11)?,
        format_int(n1, 11)?,
        format_int(n2, 11)?,
    ))
}

/// Write a `HEAD` record.
pub fn write_head(
    Head(c1, c2, l1, l2, n1, n2): Head,
    mat: i32,
    mf: u32,
    mt: u32,
    opts: &WriteOptions,
) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}",
        cont_body(c1, c2, l1, l2, n1, n2, opts)?,
        control_suffix(mat, mf, mt)?
    )])
}

/// Write a `CONT` record.
pub fn write_cont(
    c1: f64,
    c2: f64,
    l1: i64,
    l2: i64,
    n1: i64,
    n2: i64,
    mat: i32,
    mf: u32,
    mt: u32,
    opts: &WriteOptions,
) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}",
        cont_body(c1, c2, l1, l2, n1, n2, opts)?,
        control_suffix(mat, mf, mt)?
    )])
}

/// Write a `DIR` record; the two leading float slots are conventionally blank.
pub fn write_dir(Dir(l1, l2, n1, n2): Dir, mat: i32, mf: u32, mt: u32) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}{}{}{}{}",
        BLANK_FIELD,
        BLANK_FIELD,
        format_int(l1, 11)?,
        format_int(l2, 11)?,
        format_int(n1, 11)?,
        format_int(n2, 11)?,
    ) + &control_suffix(mat, mf, mt)?])
}

/// Write a `TEXT`/`TPID` record; `hl` is truncated or space-padded to 66
/// columns.
pub fn write_text(Text(hl): &Text, mat: i32, mf: u32, mt: u32) -> Result<Vec<String>, EndfError> {
    let body = if hl.len() >= 66 {
        hl[..66].to_string()
    } else {
        format!("{hl:<66}")
    };
    Ok(vec![format!("{body}{}", control_suffix(mat, mf, mt)?)])
}

/// Write an `INTG` record with the given NDIGIT field width, mirroring the
/// column layout [`crate::record::read::read_intg`] decodes.
pub fn write_intg(Intg(ii, jj, kij): &Intg, ndigit: usize, mat: i32, mf: u32, mt: u32) -> Result<Vec<String>, EndfError> {
    assert!((2..=6).contains(&ndigit), "ndigit must be in 2..=6");
    let mut body = format!("{}{}", write_endf_integer(*ii, 5)?, write_endf_integer(*jj, 5)?);
    let start = if ndigit <= 5 { 11 } else { 10 };
    // pad the gap between JJ (ends at column 10) and the KIJ run's start
    for _ in body.len()..start {
        body.push(' ');
    }
    for value in kij {
        body.push_str(&write_endf_integer(*value, ndigit)?);
        body.push(' ');
    }
    while body.len() < 66 {
        body.push(' ');
    }
    body.truncate(66);
    Ok(vec![format!("{body}{}", control_suffix(mat, mf, mt)?)])
}

/// Write a `LIST` record: the CONT-style head plus its body packed six
/// floats per continuation line, the last line blank-padded.
pub fn write_list(list: &List, mat: i32, mf: u32, mt: u32, opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    let List(c1, c2, l1, l2, npl, n2, vals) = list;
    let suffix = control_suffix(mat, mf, mt)?;
    let mut lines = vec![format!("{}{suffix}", cont_body(*c1, *c2, *l1, *l2, *npl as i64, *n2, opts)?)];
    for chunk in vals.chunks(6) {
        let mut body = String::with_capacity(66);
        for value in chunk {
            body.push_str(&format_float(*value, opts)?);
        }
        while body.len() < 66 {
            body.push_str(BLANK_FIELD);
        }
        lines.push(format!("{body}{suffix}"));
    }
    Ok(lines)
}

fn write_nbt_int_pairs(pairs: &[(u32, u32)], suffix: &str) -> Result<Vec<String>, EndfError> {
    let flat: Vec<i64> = pairs.iter().flat_map(|(a, b)| [*a as i64, *b as i64]).collect();
    let mut lines = Vec::new();
    for chunk in flat.chunks(6) {
        let mut body = String::with_capacity(66);
        for value in chunk {
            body.push_str(&write_endf_integer(*value, 11)?);
        }
        while body.len() < 66 {
            body.push_str(BLANK_FIELD);
        }
        lines.push(format!("{body}{suffix}"));
    }
    Ok(lines)
}

/// Write a `TAB2` record.
pub fn write_tab2(tab2: &super::kinds::Tab2, mat: i32, mf: u32, mt: u32, opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    let super::kinds::Tab2(c1, c2, l1, l2, nr, nz, pairs) = tab2;
    let suffix = control_suffix(mat, mf, mt)?;
    let mut lines = vec![format!("{}{suffix}", cont_body(*c1, *c2, *l1, *l2, *nr as i64, *nz as i64, opts)?)];
    lines.extend(write_nbt_int_pairs(pairs, &suffix)?);
    Ok(lines)
}

/// Write a `TAB1` record.
pub fn write_tab1(tab1: &Tab1, mat: i32, mf: u32, mt: u32, opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    let Tab1(c1, c2, l1, l2, nr, np, int_pairs, xy) = tab1;
    let suffix = control_suffix(mat, mf, mt)?;
    let mut lines = vec![format!("{}{suffix}", cont_body(*c1, *c2, *l1, *l2, *nr as i64, *np as i64, opts)?)];
    lines.extend(write_nbt_int_pairs(int_pairs, &suffix)?);
    for chunk in xy.chunks(3) {
        let mut body = String::with_capacity(66);
        for (x, y) in chunk {
            body.push_str(&format_float(*x, opts)?);
            body.push_str(&format_float(*y, opts)?);
        }
        while body.len() < 66 {
            body.push_str(BLANK_FIELD);
        }
        lines.push(format!("{body}{suffix}"));
    }
    Ok(lines)
}

/// Write a raw `DUMMY` line back out unchanged.
pub fn write_dummy(Dummy(line): &Dummy) -> Vec<String> {
    vec![line.clone()]
}

/// Body of a control-only line: blank by default, or six explicit
/// zero-valued fields when `opts.zero_as_blank` is disabled.
fn control_only_body(opts: &WriteOptions) -> Result<String, EndfError> {
    if opts.zero_as_blank {
        Ok(" ".repeat(66))
    } else {
        cont_body(0.0, 0.0, 0, 0, 0, 0, opts)
    }
}

/// Write a `SEND` sentinel.
pub fn write_send(mat: i32, mf: u32, opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}",
        control_only_body(opts)?,
        control_suffix_with_ns(mat, mf, 0, SEND_FEND_NS)?
    )])
}

/// Write a `FEND` sentinel.
pub fn write_fend(mat: i32, opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}",
        control_only_body(opts)?,
        control_suffix_with_ns(mat, 0, 0, SEND_FEND_NS)?
    )])
}

/// Write a `MEND` sentinel.
pub fn write_mend(opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}",
        control_only_body(opts)?,
        control_suffix_with_ns(0, 0, 0, MEND_TEND_NS)?
    )])
}

/// Write a `TEND` sentinel.
pub fn write_tend(opts: &WriteOptions) -> Result<Vec<String>, EndfError> {
    Ok(vec![format!(
        "{}{}",
        control_only_body(opts)?,
        control_suffix_with_ns(-1, 0, 0, MEND_TEND_NS)?
    )])
}
