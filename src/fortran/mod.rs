//! Fixed-width Fortran numeric field codec.
//!
//! ENDF-6 lays out numbers in 11-column fields using Fortran `I11`/`F11.0`
//! edit descriptors. This module converts between such fields and Rust's
//! native `i64`/`f64`, in both directions, including ENDF's non-standard
//! implicit-exponent float notation.

mod float;
mod integer;

pub use float::{parse_endf_float, write_endf_float, FloatWriteOptions, ParseEndfFloatError, WriteEndfFloatError};
pub use integer::{is_blank, parse_endf_integer, write_endf_integer, ParseEndfIntegerError, WriteEndfIntegerError};

/// Width, in columns, of a standard ENDF numeric field.
pub const FIELD_WIDTH: usize = 11;
