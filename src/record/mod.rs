//! ENDF-6 record codec: the eight record kinds plus the four control
//! sentinels, and the section splitter.

pub mod kinds;
pub mod read;
pub mod split;
pub mod write;

pub use kinds::{
    Cont, ControlNumbers, Dir, Dummy, Fend, Head, Intg, List, Mend, Send, Tab1, Tab2, Tend, Text,
    MEND_TEND_NS, SEND_FEND_NS,
};
pub use split::{split_sections, SectionTable};
