mod error;
mod visual;

pub use error::{
    Error, ErrorKind, DOUBLE_ELSE, ELIF_OUTSIDE_IF, ELSE_OUTSIDE_IF, ENDFOR_OUTSIDE_FOR,
    ENDIF_OUTSIDE_IF, MISSING_COMPONENTS, OVERLAPPING_TREES, UNCLOSED_FOR, UNCLOSED_IF,
    UNRECOGNIZED_PARAMETER,
};
pub use visual::{Pointer, Visual};

const RED: &str = "\x1B[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1B[0m";
