//! Inline assignment and comparison expressions.

use log::warn;

use super::cursor::ScriptCursor;
use crate::error::{ScriptError, ScriptResult};

/// `op, arg` assignment: 0 set, 1 add, 2 sub, 3 mul, 4 div. Arithmetic wraps
/// at 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalExpr {
    pub op: i16,
    pub arg: i16,
}

impl EvalExpr {
    pub fn apply(self, value: i16) -> ScriptResult<i16> {
        match self.op {
            0 => Ok(self.arg),
            1 => Ok(value.wrapping_add(self.arg)),
            2 => Ok(value.wrapping_sub(self.arg)),
            3 => Ok(value.wrapping_mul(self.arg)),
            4 if self.arg == 0 => Err(ScriptError::DivisionByZero("eval expression")),
            4 => Ok(value.wrapping_div(self.arg)),
            other => Err(ScriptError::InvalidEvalOp(other)),
        }
    }
}

impl ScriptCursor {
    pub fn eval_expr(&mut self) -> ScriptResult<EvalExpr> {
        let op = self.word()?;
        let arg = self.word()?;
        Ok(EvalExpr { op, arg })
    }

    /// Reads a comparison and tests `value` against it. The operand is the
    /// left-hand side: op 2 is `arg > value`.
    pub fn test_expr(&mut self, value: i16) -> ScriptResult<bool> {
        let op = self.word()?;
        if op == -1 {
            let count = self.word()?;
            let mut hit = false;
            for _ in 0..count.max(0) {
                let lo = self.word()?;
                let hi = self.word()?;
                if lo > hi {
                    warn!("test interval {lo}..{hi} is empty");
                }
                if lo <= value && hi >= value {
                    hit = true;
                }
            }
            return Ok(hit);
        }
        let arg = self.word()?;
        match op {
            0 => Ok(arg == value),
            1 => Ok(arg != value),
            2 => Ok(arg > value),
            3 => Ok(arg < value),
            4 => Ok(arg >= value),
            5 => Ok(arg <= value),
            other => Err(ScriptError::InvalidTestOp(other)),
        }
    }
}
