use std::rc::Rc;

use bermuda_formats::{Operand, ScriptReader};

use crate::error::ScriptResult;

/// Per-object execution position inside an animation script.
#[derive(Debug, Clone)]
pub struct ScriptCursor {
    pub(super) reader: ScriptReader<Rc<[u8]>>,
    /// Object whose script is running.
    pub current: usize,
    /// Object selected by a `-1` name token. Reset before every statement
    /// and never assigned by any opcode, so such tokens always miss.
    pub default_object: Option<usize>,
    /// Whether the last lookup used an explicit (or default) name rather
    /// than the running object.
    pub named: bool,
    /// Index into the scene's next-scene table staged during this tick.
    pub next_scene: Option<usize>,
    pub statement: usize,
}

impl Default for ScriptCursor {
    fn default() -> Self {
        ScriptCursor {
            reader: ScriptReader::new(Rc::from(Vec::new())),
            current: 0,
            default_object: None,
            named: false,
            next_scene: None,
            statement: 0,
        }
    }
}

impl ScriptCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the cursor at the start of `script` for `object`, keeping the
    /// staged next scene.
    pub fn load(&mut self, script: Rc<[u8]>, object: usize) {
        self.reader = ScriptReader::new(script);
        self.current = object;
        self.default_object = None;
        self.named = false;
        self.statement = 0;
    }

    pub fn size(&self) -> usize {
        self.reader.len()
    }

    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    pub fn seek(&mut self, offset: usize) {
        self.reader.set_offset(offset);
    }

    pub fn word(&mut self) -> ScriptResult<i16> {
        Ok(self.reader.fetch_word()?)
    }

    pub fn end_offset(&mut self) -> ScriptResult<usize> {
        Ok(self.reader.fetch_offset()?)
    }

    pub fn string(&mut self) -> ScriptResult<String> {
        Ok(self.reader.fetch_string()?)
    }

    pub fn skip(&mut self, operands: &[Operand]) -> ScriptResult<()> {
        Ok(self.reader.skip_operands(operands)?)
    }
}
