//! Construction options threaded through reading and writing.
//!
//! Mirrors the two plain option structs the driver exposes (`ReadOptions`,
//! `WriteOptions`); see `SPEC_FULL.md` §6 for the full table and defaults.

use crate::fortran::FloatWriteOptions;

/// Options governing how fixed-width fields are interpreted on read.
#[derive(Clone, Copy, Debug)]
pub struct ReadOptions {
    /// Treat a mismatch between a recipe literal and the wire value as a
    /// warning rather than an error.
    pub ignore_number_mismatch: bool,
    /// As `ignore_number_mismatch`, but only applied when the wire value is
    /// zero.
    pub ignore_zero_mismatch: bool,
    /// Allow a `var?` desired-number binding to disagree silently with an
    /// earlier binding of the same variable.
    pub ignore_varspec_mismatch: bool,
    /// Compare floats with relative/absolute tolerance rather than exactly.
    pub fuzzy_matching: bool,
    /// Treat an all-blank integer/float field as zero.
    pub blank_as_zero: bool,
    /// Record speculative lookahead reads in the record-log transcript too.
    pub log_lookahead_traceback: bool,
    /// Strip interior spaces from numeric fields before parsing.
    pub accept_spaces: bool,
    /// Field width in columns.
    pub width: usize,
    /// Absolute tolerance used when `fuzzy_matching` is enabled.
    pub atol: f64,
    /// Relative tolerance used when `fuzzy_matching` is enabled.
    pub rtol: f64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            ignore_number_mismatch: false,
            ignore_zero_mismatch: true,
            ignore_varspec_mismatch: false,
            fuzzy_matching: true,
            blank_as_zero: true,
            log_lookahead_traceback: false,
            accept_spaces: true,
            width: 11,
            atol: 1e-6,
            rtol: 1e-5,
        }
    }
}

/// Options governing how values are formatted on write.
#[derive(Clone, Copy, Debug)]
pub struct WriteOptions {
    /// Reclaim the sign column for non-negative floats.
    pub abuse_signpos: bool,
    /// Skip the leading zero-digit block on INTG lines whose value is zero.
    pub skip_intzero: bool,
    /// Prefer non-scientific float notation when it loses no precision.
    pub prefer_noexp: bool,
    /// Emit an explicit `E` before float exponents.
    pub keep_e: bool,
    /// Field width in columns.
    pub width: usize,
    /// Leave control-only lines (SEND/FEND/MEND/TEND) blank instead of
    /// writing explicit zero-valued fields.
    pub zero_as_blank: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            abuse_signpos: false,
            skip_intzero: false,
            prefer_noexp: false,
            keep_e: false,
            width: 11,
            zero_as_blank: true,
        }
    }
}

impl WriteOptions {
    /// Project onto the narrower option set [`crate::fortran::write_endf_float`]
    /// consumes.
    pub fn float_opts(&self) -> FloatWriteOptions {
        FloatWriteOptions {
            width: self.width,
            abuse_signpos: self.abuse_signpos,
            skip_intzero: self.skip_intzero,
            prefer_noexp: self.prefer_noexp,
            keep_e: self.keep_e,
        }
    }
}
