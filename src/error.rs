use std::{
    error::Error as StdError,
    fmt::{self, Display},
    io::Error as IoError,
};

use crate::logbuf::RecordLog;

/// Crate-wide error type.
///
/// Variants `Data`, `Encoding`, `Format`, `EndOfFile` and `Io` cover the
/// record codec (reading malformed ENDF text); the remaining variants cover
/// recipe execution (an inconsistency between a recipe and the data it is
/// applied to).
#[derive(Debug)]
pub enum EndfError {
    /// Malformed record data that does not match the expected field layout.
    Data,
    /// A line contains bytes that are not valid ENDF text.
    Encoding,
    /// A record's fixed-column layout does not match the expected format.
    Format,
    /// The input ended before a complete record could be read.
    EndOfFile,
    /// An I/O error occurred while reading or writing.
    Io(IoError),
    /// A record's MAT/MF/MT disagrees with a literal `ctrl_spec` constraint.
    UnexpectedControlRecord,
    /// A fixed-width integer field could not be parsed.
    InvalidInteger,
    /// A fixed-width float field could not be parsed.
    InvalidFloat,
    /// A LIST body was read past its declared length.
    MoreListElementsExpected,
    /// A LIST body left values unconsumed.
    UnconsumedListElements,
    /// A section's opening and closing names disagree after index resolution.
    InconsistentSectionBrackets,
    /// A variable was rebound to a value inconsistent with its prior binding.
    InconsistentVariableBinding,
    /// A literal number in a recipe disagrees with the value on the wire.
    NumberMismatch,
    /// The recipe executed a `stop` instruction.
    Stop(String),
    /// A section failed and `nofail` mode attached the record-log transcript.
    Parser(Box<EndfError>, RecordLog),
}

impl Display for EndfError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndfError::Data => write!(fmt, "invalid ENDF data"),
            EndfError::Encoding => write!(fmt, "invalid ENDF encoding"),
            EndfError::Format => write!(fmt, "invalid ENDF format"),
            EndfError::EndOfFile => write!(fmt, "unexpected end of file"),
            EndfError::Io(_) => write!(fmt, "ENDF I/O error"),
            EndfError::UnexpectedControlRecord => write!(fmt, "unexpected control record"),
            EndfError::InvalidInteger => write!(fmt, "invalid ENDF integer field"),
            EndfError::InvalidFloat => write!(fmt, "invalid ENDF float field"),
            EndfError::MoreListElementsExpected => write!(fmt, "more LIST elements expected"),
            EndfError::UnconsumedListElements => write!(fmt, "unconsumed LIST elements"),
            EndfError::InconsistentSectionBrackets => {
                write!(fmt, "inconsistent section brackets")
            }
            EndfError::InconsistentVariableBinding => {
                write!(fmt, "inconsistent variable binding")
            }
            EndfError::NumberMismatch => write!(fmt, "number mismatch"),
            EndfError::Stop(message) => write!(fmt, "stop: {message}"),
            EndfError::Parser(cause, log) => {
                writeln!(fmt, "recipe execution failed: {cause}")?;
                write!(fmt, "{log}")
            }
        }
    }
}

impl StdError for EndfError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            EndfError::Io(error) => Some(error),
            EndfError::Parser(cause, _) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<IoError> for EndfError {
    fn from(error: IoError) -> Self {
        EndfError::Io(error)
    }
}

impl From<crate::fortran::ParseEndfIntegerError> for EndfError {
    fn from(_: crate::fortran::ParseEndfIntegerError) -> Self {
        EndfError::InvalidInteger
    }
}

impl From<crate::fortran::ParseEndfFloatError> for EndfError {
    fn from(_: crate::fortran::ParseEndfFloatError) -> Self {
        EndfError::InvalidFloat
    }
}

impl From<crate::fortran::WriteEndfIntegerError> for EndfError {
    fn from(_: crate::fortran::WriteEndfIntegerError) -> Self {
        EndfError::InvalidInteger
    }
}

impl From<crate::fortran::WriteEndfFloatError> for EndfError {
    fn from(_: crate::fortran::WriteEndfFloatError) -> Self {
        EndfError::InvalidFloat
    }
}
