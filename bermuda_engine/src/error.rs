use bermuda_formats::ScriptFormatError;
use thiserror::Error;

/// Fatal interpreter failures. A tick that returns one of these is abandoned
/// with whatever mutations it already made.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Format(#[from] ScriptFormatError),

    #[error("{table} index {index} out of range (len {len})")]
    IndexOutOfRange {
        table: &'static str,
        index: i32,
        len: usize,
    },

    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("invalid eval operator {0}")]
    InvalidEvalOp(i16),

    #[error("invalid test operator {0}")]
    InvalidTestOp(i16),

    #[error("invalid rectangle ({x1},{y1})-({x2},{y2})")]
    InvalidRect { x1: i16, y1: i16, x2: i16, y2: i16 },

    #[error("bag is full ({0} objects)")]
    BagFull(usize),

    #[error("bag bitmap for '{name}' is {actual} bytes, expected {expected}")]
    BagBitmapSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("statement {statement} at offset {offset} has end offset {end}")]
    MalformedStatement {
        statement: usize,
        offset: usize,
        end: usize,
    },

    #[error("object {object} statement {statement} offset {offset}: {source}")]
    InObject {
        object: usize,
        statement: usize,
        offset: usize,
        #[source]
        source: Box<ScriptError>,
    },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Checked conversion of a script-supplied index into a table slot.
pub(crate) fn check_index(table: &'static str, index: i32, len: usize) -> ScriptResult<usize> {
    if index >= 0 && (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(ScriptError::IndexOutOfRange { table, index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_index_rejects_negative_and_past_end() {
        assert_eq!(check_index("frames", 2, 3).unwrap(), 2);
        assert!(matches!(
            check_index("frames", -1, 3),
            Err(ScriptError::IndexOutOfRange { index: -1, .. })
        ));
        assert!(matches!(
            check_index("frames", 3, 3),
            Err(ScriptError::IndexOutOfRange { len: 3, .. })
        ));
    }

    #[test]
    fn object_context_wraps_source() {
        let err = ScriptError::InObject {
            object: 2,
            statement: 5,
            offset: 40,
            source: Box::new(ScriptError::DivisionByZero("eval")),
        };
        assert_eq!(
            err.to_string(),
            "object 2 statement 5 offset 40: division by zero in eval"
        );
    }
}
