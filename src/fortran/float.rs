use std::{error::Error, fmt::Display};

/// Power of ten table.
#[rustfmt::skip]
const POW_10_TABLE: [f64; 23] = [
    1e0 , 1e1 , 1e2 , 1e3 , 1e4 , 1e5 , 1e6 , 1e7 , 1e8 , 1e9 ,
    1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16, 1e17, 1e18, 1e19,
    1e20, 1e21, 1e22,
];

/// Parse a fixed-width ENDF float field.
///
/// # Format
///
/// ```text
/// endf_float = int_sign? (int dec_sep fraction ((exp_sep exp_sign? exp) | (exp_sign exp)))[1:10]
/// int_sign, exp_sign = sign
/// sign = '-' | '+'
/// int, fraction, exp = digits
/// digits = '0' - '9'
/// dec_sep = '.'
/// expsep = 'e' | 'E'
/// ```
///
/// ENDF floats are read with fortran `F11.0` format. The exponent separator
/// may be omitted entirely (`1.234+5` means `1.234E+5`): a `+`/`-` that
/// immediately follows a digit introduces an implicit exponent.
///
/// # Examples
///
/// ```
/// use endf_recipe::fortran::parse_endf_float;
/// let float = parse_endf_float("1.2345E+01").unwrap();
/// assert!((float - 1.2345E+01).abs() < 1e-4);
/// let float = parse_endf_float("-2.5+3").unwrap();
/// assert_eq!(float, -2500.0);
/// ```
///
/// # Details
///
/// - Leading/trailing space is ignored
/// - A blank slice is considered to be `0` (fortran `F11.0` input processing rule)
/// - Space characters within a number are ignored
/// - The plus sign is optional
/// - Integral, fractional and exponential parts are each optional
/// - `d`/`D` are accepted as legacy exponent separators
///
/// # Errors
///
/// [`ParseEndfFloatError`] is returned if:
/// - `float.is_empty()`: empty slice
/// - `float.len() > 11`: too long slice
/// - `float` contains an invalid sign/digit
/// - `float` is only partially parsable
/// - `float`'s exponential part is empty after its separator
pub fn parse_endf_float<F: AsRef<[u8]>>(float: F) -> Result<f64, ParseEndfFloatError> {
    // See the module-level note on the IEEE-754 exactness argument for why
    // |decimal_exponent| <= 22 can be converted directly via POW_10_TABLE,
    // falling back to the standard library parser otherwise.
    let float = float.as_ref();
    if float.is_empty() {
        return Err(ParseEndfFloatError);
    }
    if float.len() > 11 {
        return Err(ParseEndfFloatError);
    }
    let mut iter = float.iter().filter(|&b| *b != b' ').peekable();
    let negative = match iter.peek() {
        None => return Ok(0.),
        Some(b'-') => {
            iter.next();
            true
        }
        Some(b'+') => {
            iter.next();
            false
        }
        Some(_) => false,
    };
    if iter.peek().is_none() {
        return Ok(0.);
    }
    let mut mantissa: i64 = 0;
    let mut exponent: i32 = 0;
    loop {
        match iter.peek() {
            Some(&byte) if byte.is_ascii_digit() => {
                mantissa = mantissa * 10 + (byte - b'0') as i64;
                iter.next();
            }
            _ => break,
        }
    }
    if iter.peek() == Some(&&b'.') {
        iter.next();
        loop {
            match iter.peek() {
                Some(&byte) if byte.is_ascii_digit() => {
                    mantissa = mantissa * 10 + (byte - b'0') as i64;
                    exponent -= 1;
                    iter.next();
                }
                _ => break,
            }
        }
    }

    // implicit-E detection: a bare sign preceded by a digit also introduces
    // the exponent, in addition to an explicit e/E/d/D separator.
    let mut exp_sep = false;
    match iter.peek() {
        Some(b'e') | Some(b'E') | Some(b'd') | Some(b'D') => {
            exp_sep = true;
            iter.next();
        }
        _ => {}
    }
    let negative_exponent = match iter.peek() {
        Some(b'-') => {
            exp_sep = true;
            iter.next();
            true
        }
        Some(b'+') => {
            exp_sep = true;
            iter.next();
            false
        }
        _ => false,
    };
    if exp_sep && iter.peek().is_none() {
        return Err(ParseEndfFloatError);
    }
    let mut exp = 0;
    loop {
        match iter.peek() {
            Some(&byte) if byte.is_ascii_digit() => {
                exp = exp * 10 + (byte - b'0') as i32;
                iter.next();
            }
            _ => break,
        }
    }
    if iter.peek().is_some() {
        return Err(ParseEndfFloatError);
    }
    if mantissa == 0 {
        return Ok(0.);
    }
    if negative_exponent {
        exponent -= exp;
    } else {
        exponent += exp;
    }
    let mut value = if exponent.abs() > 22 {
        let float = format!("{mantissa}e{exponent}");
        match float.parse() {
            Ok(value) => value,
            Err(_) => return Err(ParseEndfFloatError),
        }
    } else {
        let mut value = mantissa as f64;
        if exponent < 0 {
            value /= POW_10_TABLE[-exponent as usize]
        } else {
            value *= POW_10_TABLE[exponent as usize]
        }
        value
    };
    if negative {
        value = -value;
    }
    Ok(value)
}

/// Options controlling how [`write_endf_float`] formats a value.
#[derive(Clone, Copy, Debug)]
pub struct FloatWriteOptions {
    /// Field width in columns.
    pub width: usize,
    /// Reclaim the sign column for a non-negative value, gaining one extra
    /// significant digit.
    pub abuse_signpos: bool,
    /// Omit the leading `0` before the decimal point for `|x| < 1`.
    pub skip_intzero: bool,
    /// Prefer a non-scientific representation when it fits and does not
    /// lose significant digits relative to the scientific form.
    pub prefer_noexp: bool,
    /// Emit an explicit `E` before the exponent.
    pub keep_e: bool,
}

impl Default for FloatWriteOptions {
    fn default() -> Self {
        FloatWriteOptions {
            width: 11,
            abuse_signpos: false,
            skip_intzero: false,
            prefer_noexp: false,
            keep_e: false,
        }
    }
}

/// Format `val` as a fixed-width ENDF float field.
///
/// # Errors
///
/// [`WriteEndfFloatError`] is returned if `val` cannot be represented within
/// `opts.width` columns (this can only happen for exponents wide enough that
/// three exponent digits and the mandatory sign/mantissa slots overflow an
/// unusually small configured width).
///
/// # Examples
///
/// ```
/// use endf_recipe::fortran::{write_endf_float, FloatWriteOptions};
/// let s = write_endf_float(1.234e-7, &FloatWriteOptions::default()).unwrap();
/// assert_eq!(s, " 1.234000-7");
/// ```
pub fn write_endf_float(val: f64, opts: &FloatWriteOptions) -> Result<String, WriteEndfFloatError> {
    let exp_form = write_exp_form(val, opts)?;
    if opts.prefer_noexp {
        if let Some(basic) = write_basic_form(val, opts) {
            if basic.len() <= opts.width {
                let basic_sig = count_signif_digits(basic.trim());
                let exp_sig = count_signif_digits(&exp_form);
                if basic_sig >= exp_sig {
                    let trimmed = basic.trim();
                    let trimmed = if trimmed.contains('.') {
                        trimmed.trim_end_matches('0').trim_end_matches('.')
                    } else {
                        trimmed
                    };
                    return Ok(format!("{:>width$}", trimmed, width = opts.width));
                }
            }
        }
    }
    Ok(exp_form)
}

/// Non-scientific ("basic") decimal rendering, or `None` if it does not fit.
fn write_basic_form(val: f64, opts: &FloatWriteOptions) -> Option<String> {
    let intpart = val.trunc() as i64;
    let is_integer = intpart as f64 == val;
    if is_integer && intpart == 0 {
        return Some(format!("{:>width$}", "0", width = opts.width));
    }
    let len_intpart = intpart.unsigned_abs().to_string().len();
    let mut waste_space: i64 = 2;
    if opts.abuse_signpos && val > 0.0 {
        waste_space -= 1;
    }
    if is_integer {
        waste_space -= 1;
    }
    let floatwidth = opts.width as i64 - waste_space - len_intpart as i64;
    let mut numstr = if floatwidth > 0 && !is_integer {
        format!("{:.*}", floatwidth as usize, val)
    } else {
        let mut s = format!("{intpart}");
        if !opts.abuse_signpos && val >= 0.0 {
            s = format!(" {s}");
        }
        if s.len() <= opts.width.saturating_sub(2) {
            s.push('.');
            while s.len() < opts.width {
                s.push('0');
            }
        }
        s
    };
    if opts.skip_intzero && intpart == 0 {
        if let Some(dotpos) = numstr.find('.') {
            if dotpos >= 1 {
                numstr.remove(dotpos - 1);
            }
        }
    }
    if numstr.len() > opts.width {
        return None;
    }
    Some(format!("{:>width$}", numstr, width = opts.width))
}

/// Scientific rendering; always fits within `opts.width` for realistic widths.
fn write_exp_form(val: f64, opts: &FloatWriteOptions) -> Result<String, WriteEndfFloatError> {
    let av = val.abs();
    let nexp: usize = if av == 0.0 {
        1
    } else if (1e-9..1e10).contains(&av) {
        1
    } else if (1e-99..1e100).contains(&av) {
        2
    } else {
        3
    };
    let sign_dec: usize = if opts.abuse_signpos && val >= 0.0 { 0 } else { 1 };
    let expsymb_dec: usize = if opts.keep_e { 1 } else { 0 };
    let exponent: i32 = if av != 0.0 { av.log10().floor() as i32 } else { 0 };
    let mantissa = if av != 0.0 { av / 10f64.powi(exponent) } else { 0.0 };
    let mantissa_len = opts
        .width
        .checked_sub(1 + nexp + sign_dec + expsymb_dec)
        .ok_or(WriteEndfFloatError)?;
    let precision = mantissa_len.checked_sub(2).ok_or(WriteEndfFloatError)?;
    let mantissa_str = format!("{mantissa:.precision$}");
    let expsymb_str = if opts.keep_e { "E" } else { "" };
    let exp_sign = if exponent >= 0 { "+" } else { "-" };
    let exponent_str = format!("{:0width$}", exponent.unsigned_abs(), width = nexp);
    let mantissa_sign = if opts.abuse_signpos && val >= 0.0 {
        ""
    } else if val >= 0.0 {
        " "
    } else {
        "-"
    };
    let numstr = format!("{mantissa_sign}{mantissa_str}{expsymb_str}{exp_sign}{exponent_str}");
    if numstr.len() > opts.width {
        return Err(WriteEndfFloatError);
    }
    Ok(format!("{:>width$}", numstr, width = opts.width))
}

/// Count significant digits in a formatted decimal string, treating interior
/// zeros as significant.
fn count_signif_digits(s: &str) -> usize {
    let mut count = 0;
    let mut zero_acc = 0;
    let mut started = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            if c != '0' {
                count += 1 + zero_acc;
                zero_acc = 0;
                started = true;
            } else if started {
                zero_acc += 1;
            }
        } else if c == '.' {
            continue;
        } else {
            break;
        }
    }
    count
}

/// Error returned when parsing an ENDF float with [`parse_endf_float`] fails.
#[derive(Debug)]
pub struct ParseEndfFloatError;

impl Display for ParseEndfFloatError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "parse ENDF float error")
    }
}

impl Error for ParseEndfFloatError {}

/// Error returned when [`write_endf_float`] cannot fit a value in the
/// requested width.
#[derive(Debug)]
pub struct WriteEndfFloatError;

impl Display for WriteEndfFloatError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "ENDF float does not fit in field width")
    }
}

impl Error for WriteEndfFloatError {}
