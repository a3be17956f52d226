//! Record reading over a materialized line list.
//!
//! The teacher crate's [`crate`]-adjacent prototype read records from a
//! `BufRead` stream consumed sequentially. That cannot support the
//! lookahead snapshot/restore the recipe interpreter needs (a speculative
//! read must be cheaply undoable), so these functions instead take the full
//! line list plus an explicit cursor offset and return the advanced offset,
//! mirroring the reference interpreter's `(lines, ofs)` pair.

use crate::error::EndfError;
use crate::fortran::{is_blank, parse_endf_float, parse_endf_integer};
use crate::options::ReadOptions;

use super::kinds::{Cont, ControlNumbers, Dir, Dummy, Fend, Head, Intg, List, Mend, Send, Tab1, Tab2, Tend, Text};

fn line_at<'a>(lines: &'a [String], ofs: usize) -> Result<&'a str, EndfError> {
    lines.get(ofs).map(|s| s.as_str()).ok_or(EndfError::EndOfFile)
}

fn field<'a>(line: &'a str, index: usize) -> Result<&'a str, EndfError> {
    let start = index * 11;
    line.get(start..start + 11).ok_or(EndfError::Format)
}

fn parse_float_field(line: &str, index: usize, opts: &ReadOptions) -> Result<f64, EndfError> {
    let raw = field(line, index)?;
    if !opts.blank_as_zero && is_blank(raw.as_bytes()) {
        return Err(EndfError::InvalidFloat);
    }
    Ok(parse_endf_float(raw.as_bytes())?)
}

fn parse_int_field(line: &str, index: usize, opts: &ReadOptions) -> Result<i64, EndfError> {
    let raw = field(line, index)?;
    if !opts.blank_as_zero && is_blank(raw.as_bytes()) {
        return Err(EndfError::InvalidInteger);
    }
    Ok(parse_endf_integer(raw.as_bytes())?)
}

/// Material number, columns 67-70.
pub fn parse_material(line: &str) -> Result<i32, EndfError> {
    let raw = line.get(66..70).ok_or(EndfError::Format)?;
    Ok(parse_endf_integer(raw.as_bytes())? as i32)
}

/// File (MF) number, columns 71-72.
pub fn parse_file(line: &str) -> Result<u32, EndfError> {
    let raw = line.get(70..72).ok_or(EndfError::Format)?;
    Ok(parse_endf_integer(raw.as_bytes())? as u32)
}

/// Section (MT) number, columns 73-75.
pub fn parse_section(line: &str) -> Result<u32, EndfError> {
    let raw = line.get(72..75).ok_or(EndfError::Format)?;
    Ok(parse_endf_integer(raw.as_bytes())? as u32)
}

/// Sequence number, columns 76-80. `None` if the line is too short to carry
/// one (NS is the least load-bearing field on the line).
pub fn parse_sequence(line: &str) -> Option<u32> {
    line.get(75..80)
        .and_then(|raw| parse_endf_integer(raw.as_bytes()).ok())
        .map(|v| v as u32)
}

/// Parse the full MAT/MF/MT/NS control suffix of a line.
pub fn parse_control_numbers(line: &str) -> Result<ControlNumbers, EndfError> {
    Ok((
        parse_material(line)?,
        parse_file(line)?,
        parse_section(line)?,
        parse_sequence(line),
    ))
}

/// Read a `TEXT`/`TPID` record: the 66-character `HL` field.
pub fn read_text(lines: &[String], ofs: usize) -> Result<(Text, ControlNumbers, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let hl = line.get(0..66).ok_or(EndfError::Format)?.to_string();
    let cn = parse_control_numbers(line)?;
    Ok((Text(hl), cn, ofs + 1))
}

/// Read a `HEAD` record.
pub fn read_head(lines: &[String], ofs: usize, opts: &ReadOptions) -> Result<(Head, ControlNumbers, usize), EndfError> {
    let (Cont(c1, c2, l1, l2, n1, n2), cn, next) = read_cont(lines, ofs, opts)?;
    Ok((Head(c1, c2, l1, l2, n1, n2), cn, next))
}

/// Read a `CONT` record.
pub fn read_cont(lines: &[String], ofs: usize, opts: &ReadOptions) -> Result<(Cont, ControlNumbers, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let c1 = parse_float_field(line, 0, opts)?;
    let c2 = parse_float_field(line, 1, opts)?;
    let l1 = parse_int_field(line, 2, opts)?;
    let l2 = parse_int_field(line, 3, opts)?;
    let n1 = parse_int_field(line, 4, opts)?;
    let n2 = parse_int_field(line, 5, opts)?;
    let cn = parse_control_numbers(line)?;
    Ok((Cont(c1, c2, l1, l2, n1, n2), cn, ofs + 1))
}

/// Read a `DIR` record (the first two fields are conventionally blank).
pub fn read_dir(lines: &[String], ofs: usize, opts: &ReadOptions) -> Result<(Dir, ControlNumbers, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let l1 = parse_int_field(line, 2, opts)?;
    let l2 = parse_int_field(line, 3, opts)?;
    let n1 = parse_int_field(line, 4, opts)?;
    let n2 = parse_int_field(line, 5, opts)?;
    let cn = parse_control_numbers(line)?;
    Ok((Dir(l1, l2, n1, n2), cn, ofs + 1))
}

/// Read an `INTG` record. `ndigit` sets KIJ's field width (2..=6); II/JJ are
/// always 5-wide. The KIJ run starts at column 11 for `ndigit <= 5` and
/// column 10 for `ndigit == 6` (the one width where the values' sign column
/// reclaims a byte from the wasted NDIGIT=6 remainder).
pub fn read_intg(
    lines: &[String],
    ofs: usize,
    ndigit: usize,
    opts: &ReadOptions,
) -> Result<(Intg, ControlNumbers, usize), EndfError> {
    assert!((2..=6).contains(&ndigit), "ndigit must be in 2..=6");
    let line = line_at(lines, ofs)?;
    let ii = parse_endf_integer(line.get(0..5).ok_or(EndfError::Format)?.as_bytes())?;
    let jj = parse_endf_integer(line.get(5..10).ok_or(EndfError::Format)?.as_bytes())?;
    let start = if ndigit <= 5 { 11 } else { 10 };
    let step = ndigit + 1;
    let count = (66 - start) / step;
    let mut kij = Vec::with_capacity(count);
    let mut ptr = start;
    for _ in 0..count {
        let raw = line.get(ptr..ptr + ndigit).ok_or(EndfError::Format)?;
        if !opts.blank_as_zero && is_blank(raw.as_bytes()) {
            return Err(EndfError::InvalidInteger);
        }
        kij.push(parse_endf_integer(raw.as_bytes())?);
        ptr += step;
    }
    let cn = parse_control_numbers(line)?;
    Ok((Intg(ii, jj, kij), cn, ofs + 1))
}

/// Read a `LIST` record: a CONT-style head whose N1 slot gives the body
/// length NPL, followed by NPL floats packed six per continuation line.
pub fn read_list(lines: &[String], ofs: usize, opts: &ReadOptions) -> Result<(List, ControlNumbers, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let c1 = parse_float_field(line, 0, opts)?;
    let c2 = parse_float_field(line, 1, opts)?;
    let l1 = parse_int_field(line, 2, opts)?;
    let l2 = parse_int_field(line, 3, opts)?;
    let npl = parse_int_field(line, 4, opts)? as usize;
    let n2 = parse_int_field(line, 5, opts)?;
    let cn = parse_control_numbers(line)?;
    let mut vals = Vec::with_capacity(npl);
    let mut cur = ofs + 1;
    while vals.len() < npl {
        let body_line = line_at(lines, cur)?;
        for i in 0..6 {
            if vals.len() == npl {
                break;
            }
            vals.push(parse_float_field(body_line, i, opts)?);
        }
        cur += 1;
    }
    Ok((List(c1, c2, l1, l2, npl, n2, vals), cn, cur))
}

/// Read NR (NBT, INT) interpolation-range pairs, packed six integers
/// (three pairs) per continuation line. Shared by TAB1 and TAB2.
fn read_nbt_int_pairs(
    lines: &[String],
    ofs: usize,
    nr: usize,
    opts: &ReadOptions,
) -> Result<(Vec<(u32, u32)>, usize), EndfError> {
    let mut flat = Vec::with_capacity(nr * 2);
    let mut cur = ofs;
    while flat.len() < nr * 2 {
        let body_line = line_at(lines, cur)?;
        for i in 0..6 {
            if flat.len() == nr * 2 {
                break;
            }
            flat.push(parse_int_field(body_line, i, opts)? as u32);
        }
        cur += 1;
    }
    let pairs = flat.chunks(2).map(|c| (c[0], c[1])).collect();
    Ok((pairs, cur))
}

/// Read a `TAB2` record.
pub fn read_tab2(lines: &[String], ofs: usize, opts: &ReadOptions) -> Result<(Tab2, ControlNumbers, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let c1 = parse_float_field(line, 0, opts)?;
    let c2 = parse_float_field(line, 1, opts)?;
    let l1 = parse_int_field(line, 2, opts)?;
    let l2 = parse_int_field(line, 3, opts)?;
    let nr = parse_int_field(line, 4, opts)? as usize;
    let nz = parse_int_field(line, 5, opts)? as usize;
    let cn = parse_control_numbers(line)?;
    let (pairs, next) = read_nbt_int_pairs(lines, ofs + 1, nr, opts)?;
    Ok((Tab2(c1, c2, l1, l2, nr, nz, pairs), cn, next))
}

/// Read a `TAB1` record.
pub fn read_tab1(lines: &[String], ofs: usize, opts: &ReadOptions) -> Result<(Tab1, ControlNumbers, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let c1 = parse_float_field(line, 0, opts)?;
    let c2 = parse_float_field(line, 1, opts)?;
    let l1 = parse_int_field(line, 2, opts)?;
    let l2 = parse_int_field(line, 3, opts)?;
    let nr = parse_int_field(line, 4, opts)? as usize;
    let np = parse_int_field(line, 5, opts)? as usize;
    let cn = parse_control_numbers(line)?;
    let (int_pairs, after_int) = read_nbt_int_pairs(lines, ofs + 1, nr, opts)?;
    let mut flat = Vec::with_capacity(np * 2);
    let mut cur = after_int;
    while flat.len() < np * 2 {
        let body_line = line_at(lines, cur)?;
        for i in 0..6 {
            if flat.len() == np * 2 {
                break;
            }
            flat.push(parse_float_field(body_line, i, opts)?);
        }
        cur += 1;
    }
    let xy = flat.chunks(2).map(|c| (c[0], c[1])).collect();
    Ok((Tab1(c1, c2, l1, l2, nr, np, int_pairs, xy), cn, cur))
}

/// Read a raw, recipe-ignored `DUMMY` line verbatim.
pub fn read_dummy(lines: &[String], ofs: usize) -> Result<(Dummy, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    Ok((Dummy(line.to_string()), ofs + 1))
}

/// Read a `SEND` sentinel (end of one section); MT must be zero.
pub fn read_send(lines: &[String], ofs: usize) -> Result<(Send, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let (mat, mf, mt, _) = parse_control_numbers(line)?;
    if mt != 0 {
        return Err(EndfError::UnexpectedControlRecord);
    }
    Ok((Send { mat, mf }, ofs + 1))
}

/// Read a `FEND` sentinel (end of one MAT's MF); MF and MT must be zero.
pub fn read_fend(lines: &[String], ofs: usize) -> Result<(Fend, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let (mat, mf, mt, _) = parse_control_numbers(line)?;
    if mf != 0 || mt != 0 {
        return Err(EndfError::UnexpectedControlRecord);
    }
    Ok((Fend { mat }, ofs + 1))
}

/// Read a `MEND` sentinel (end of one material); MAT, MF, MT must be zero.
pub fn read_mend(lines: &[String], ofs: usize) -> Result<(Mend, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let (mat, mf, mt, _) = parse_control_numbers(line)?;
    if mat != 0 || mf != 0 || mt != 0 {
        return Err(EndfError::UnexpectedControlRecord);
    }
    Ok((Mend, ofs + 1))
}

/// Read a `TEND` sentinel (end of tape); MAT must be -1, MF and MT zero.
pub fn read_tend(lines: &[String], ofs: usize) -> Result<(Tend, usize), EndfError> {
    let line = line_at(lines, ofs)?;
    let (mat, mf, mt, _) = parse_control_numbers(line)?;
    if mat != -1 || mf != 0 || mt != 0 {
        return Err(EndfError::UnexpectedControlRecord);
    }
    Ok((Tend, ofs + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ReadOptions {
        ReadOptions::default()
    }

    fn line(body: &str, mat: &str, mf: &str, mt: &str, ns: &str) -> String {
        format!("{body:<66}{mat:>4}{mf:>2}{mt:>3}{ns:>5}")
    }

    #[test]
    fn reads_cont() {
        let body = " 1.00000000 2.00000000          1          2          3          4";
        let lines = vec![line(body, "125", "1", "451", "1")];
        let (Cont(c1, c2, l1, l2, n1, n2), cn, next) = read_cont(&lines, 0, &opts()).unwrap();
        assert_eq!(c1, 1.0);
        assert_eq!(c2, 2.0);
        assert_eq!((l1, l2, n1, n2), (1, 2, 3, 4));
        assert_eq!(cn, (125, 1, 451, Some(1)));
        assert_eq!(next, 1);
    }

    #[test]
    fn reads_text() {
        let body = "ABCDEFGHIJKLMNOPQRSTUVWXYZ abcdefghijklmnopqrstuvwxyz 0123456789";
        let lines = vec![line(body, "1", "0", "0", "0")];
        let (Text(hl), _, next) = read_text(&lines, 0).unwrap();
        assert_eq!(hl, format!("{body:<66}"));
        assert_eq!(next, 1);
    }

    #[test]
    fn reads_list_with_continuation() {
        let head = " 1.00000000 2.00000000          1          2          3          4";
        let body = " 1.00000000 2.00000000 3.00000000";
        let lines = vec![line(head, "1", "3", "1", "1"), line(body, "1", "3", "1", "2")];
        let (list, _, next) = read_list(&lines, 0, &opts()).unwrap();
        assert_eq!(list.4, 3);
        assert_eq!(list.6, vec![1.0, 2.0, 3.0]);
        assert_eq!(next, 2);
    }

    #[test]
    fn sentinel_mismatch_is_rejected() {
        let lines = vec![line("", "1", "1", "1", "0")];
        assert!(read_send(&lines, 0).is_err());
    }

    #[test]
    fn reads_mend_tend() {
        let mend_lines = vec![line("", "0", "0", "0", "0")];
        assert!(read_mend(&mend_lines, 0).is_ok());
        let tend_lines = vec![line("", "-1", "0", "0", "0")];
        assert!(read_tend(&tend_lines, 0).is_ok());
    }
}
