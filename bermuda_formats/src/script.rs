//! Reader for compiled object scripts.
//!
//! Scripts are flat blobs of little-endian 16-bit words. Strings and object
//! names are stored inline behind a word holding their byte length, the
//! terminating NUL included.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::opcodes::Operand;

/// Length word selecting the statement's default object.
pub const NAME_DEFAULT_OBJECT: i16 = -1;
/// Length word selecting the object whose script is running.
pub const NAME_CURRENT_OBJECT: i16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptFormatError {
    #[error("script truncated: {needed} bytes requested at offset {offset} (size {size})")]
    Truncated {
        offset: usize,
        needed: usize,
        size: usize,
    },
    #[error("invalid string length {len} at offset {offset}")]
    BadStringLength { offset: usize, len: i16 },
    #[error("string at offset {offset} is not NUL-terminated")]
    UnterminatedString { offset: usize },
    #[error("invalid object name length {len} at offset {offset}")]
    BadNameLength { offset: usize, len: i16 },
    #[error("unknown condition opcode {code} at offset {offset}")]
    UnknownCondition { code: i16, offset: usize },
    #[error("unknown operator opcode {code} at offset {offset}")]
    UnknownOperator { code: i16, offset: usize },
}

/// Object reference decoded from a length-prefixed name token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectToken<'a> {
    /// Length `-1`: the statement's remembered default object.
    Default,
    /// Length `0`: the running object, no name bytes follow.
    Current,
    /// Explicit name, NUL and anything after it stripped.
    Named(&'a [u8]),
}

impl ObjectToken<'_> {
    pub fn describe(&self) -> String {
        match self {
            ObjectToken::Default => "<default>".to_string(),
            ObjectToken::Current => "<self>".to_string(),
            ObjectToken::Named(name) => format!("'{}'", String::from_utf8_lossy(name)),
        }
    }
}

/// Byte-offset cursor over one script blob.
#[derive(Debug, Clone)]
pub struct ScriptReader<B> {
    data: B,
    offset: usize,
}

impl<B: AsRef<[u8]>> ScriptReader<B> {
    pub fn new(data: B) -> Self {
        ScriptReader { data, offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Moves the cursor; reads past the end fail, the move itself never does.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn skip(&mut self, count: usize) {
        self.offset += count;
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.len()
    }

    fn take(&mut self, count: usize) -> Result<&[u8], ScriptFormatError> {
        let size = self.len();
        let end = self
            .offset
            .checked_add(count)
            .filter(|end| *end <= size)
            .ok_or(ScriptFormatError::Truncated {
                offset: self.offset,
                needed: count,
                size,
            })?;
        let start = self.offset;
        self.offset = end;
        Ok(&self.data.as_ref()[start..end])
    }

    pub fn fetch_word(&mut self) -> Result<i16, ScriptFormatError> {
        let bytes = self.take(2)?;
        Ok(LittleEndian::read_i16(bytes))
    }

    /// Statement end offsets are stored as raw words but address up to 64K.
    pub fn fetch_offset(&mut self) -> Result<usize, ScriptFormatError> {
        let bytes = self.take(2)?;
        Ok(LittleEndian::read_u16(bytes) as usize)
    }

    /// Reads a length-prefixed string and returns its bytes without the NUL.
    pub fn fetch_cstr(&mut self) -> Result<&[u8], ScriptFormatError> {
        let start = self.offset;
        let len = self.fetch_word()?;
        if len < 1 {
            return Err(ScriptFormatError::BadStringLength { offset: start, len });
        }
        let bytes = self.take(len as usize)?;
        match bytes.split_last() {
            Some((0, body)) => Ok(body),
            _ => Err(ScriptFormatError::UnterminatedString { offset: start }),
        }
    }

    pub fn fetch_string(&mut self) -> Result<String, ScriptFormatError> {
        let bytes = self.fetch_cstr()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Decodes an object-name token. Named tokens always consume their full
    /// length so the cursor stays aligned whether or not the name resolves.
    pub fn fetch_object_token(&mut self) -> Result<ObjectToken<'_>, ScriptFormatError> {
        let start = self.offset;
        let len = self.fetch_word()?;
        match len {
            NAME_DEFAULT_OBJECT => Ok(ObjectToken::Default),
            NAME_CURRENT_OBJECT => Ok(ObjectToken::Current),
            len if len > 0 => {
                let bytes = self.take(len as usize)?;
                let name = match bytes.iter().position(|&b| b == 0) {
                    Some(nul) => &bytes[..nul],
                    None => bytes,
                };
                Ok(ObjectToken::Named(name))
            }
            len => Err(ScriptFormatError::BadNameLength { offset: start, len }),
        }
    }

    /// Advances past one test expression without evaluating it.
    pub fn skip_test_expr(&mut self) -> Result<(), ScriptFormatError> {
        let op = self.fetch_word()?;
        if op == -1 {
            let count = self.fetch_word()?.max(0) as usize;
            self.take(count * 4)?;
        } else {
            self.fetch_word()?;
        }
        Ok(())
    }

    pub fn skip_operand(&mut self, operand: Operand) -> Result<(), ScriptFormatError> {
        match operand {
            Operand::Object => {
                self.fetch_object_token()?;
            }
            Operand::String => {
                self.fetch_cstr()?;
            }
            Operand::Test => self.skip_test_expr()?,
            Operand::Mode => {
                if self.fetch_word()? == 2 {
                    self.fetch_word()?;
                }
            }
            fixed => {
                let size = fixed.fixed_size().unwrap_or(0);
                self.take(size)?;
            }
        }
        Ok(())
    }

    pub fn skip_operands(&mut self, operands: &[Operand]) -> Result<(), ScriptFormatError> {
        for operand in operands {
            self.skip_operand(*operand)?;
        }
        Ok(())
    }
}

/// Little helper for building script blobs word by word.
#[derive(Debug, Default, Clone)]
pub struct ScriptWriter {
    bytes: Vec<u8>,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn word(&mut self, value: i16) -> &mut Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_i16(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub fn words(&mut self, values: &[i16]) -> &mut Self {
        for value in values {
            self.word(*value);
        }
        self
    }

    /// Writes a length-prefixed, NUL-terminated string.
    pub fn string(&mut self, text: &str) -> &mut Self {
        self.word((text.len() + 1) as i16);
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        self
    }

    /// Writes an explicit object name token.
    pub fn object(&mut self, name: &str) -> &mut Self {
        self.string(name)
    }

    pub fn current_object(&mut self) -> &mut Self {
        self.word(NAME_CURRENT_OBJECT)
    }

    pub fn default_object(&mut self) -> &mut Self {
        self.word(NAME_DEFAULT_OBJECT)
    }

    /// Overwrites a previously written word, used to patch statement ends.
    pub fn patch_word(&mut self, offset: usize, value: i16) {
        LittleEndian::write_i16(&mut self.bytes[offset..offset + 2], value);
    }

    /// Patches a statement end; ends are unsigned like `fetch_offset` reads them.
    pub fn patch_offset(&mut self, offset: usize, end: u16) {
        LittleEndian::write_u16(&mut self.bytes[offset..offset + 2], end);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
