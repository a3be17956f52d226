//! ENDF-6 record bodies.
//!
//! Every record shares the same 80-column line layout (six 11-column value
//! fields, then MAT/MF/MT/NS); what differs between kinds is how the six
//! value fields, and any continuation lines, are interpreted. These are
//! plain tuple structs, not part of the recipe data tree: [`crate::mapper`]
//! binds their slots to data-tree variables.

/// `TEXT`/`TPID`: a 66-character free-text field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text(pub String);

/// `HEAD`: the first record of a section. Same wire layout as [`Cont`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Head(pub f64, pub f64, pub i64, pub i64, pub i64, pub i64);

/// `CONT`: C1, C2, L1, L2, N1, N2.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cont(pub f64, pub f64, pub i64, pub i64, pub i64, pub i64);

/// `DIR`: two blank float fields (not carried) then L1, L2, N1, N2.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dir(pub i64, pub i64, pub i64, pub i64);

/// `INTG`: II, JJ row/column indices and NDIGIT-wide KIJ values.
#[derive(Clone, Debug, PartialEq)]
pub struct Intg(pub i64, pub i64, pub Vec<i64>);

/// `LIST`: CONT-style head (C1, C2, L1, L2, NPL, N2) plus an NPL-long float
/// body.
#[derive(Clone, Debug, PartialEq)]
pub struct List(pub f64, pub f64, pub i64, pub i64, pub usize, pub i64, pub Vec<f64>);

/// `TAB2`: CONT-style head (C1, C2, L1, L2, NR, NZ) plus NR (NBT, INT) pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct Tab2(
    pub f64,
    pub f64,
    pub i64,
    pub i64,
    pub usize,
    pub usize,
    pub Vec<(u32, u32)>,
);

/// `TAB1`: CONT-style head (C1, C2, L1, L2, NR, NP), NR (NBT, INT) pairs, and
/// NP (x, y) pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct Tab1(
    pub f64,
    pub f64,
    pub i64,
    pub i64,
    pub usize,
    pub usize,
    pub Vec<(u32, u32)>,
    pub Vec<(f64, f64)>,
);

/// Control record read but not mapped into the data tree by any recipe
/// production (`DUMMY` in the recipe grammar); its raw line is retained
/// verbatim so round-tripping reproduces it unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dummy(pub String);

/// Control numbers common to every record: material, file, section, and the
/// line's sequence number (absent on some lines, hence `Option`).
pub type ControlNumbers = (i32, u32, u32, Option<u32>);

/// `SEND`: end of one (MAT, MF, MT) section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Send {
    pub mat: i32,
    pub mf: u32,
}

/// `FEND`: end of one MAT's MF=0 tape-head file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fend {
    pub mat: i32,
}

/// `MEND`: end of one material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mend;

/// `TEND`: end of the tape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tend;

/// Sequence number ENDF-6 convention uses for SEND/FEND control lines.
pub const SEND_FEND_NS: u32 = 99999;
/// Sequence number ENDF-6 convention uses for MEND/TEND control lines.
pub const MEND_TEND_NS: u32 = 0;
