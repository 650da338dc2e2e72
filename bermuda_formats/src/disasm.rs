use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::opcodes::{ConditionOp, Operand, OperatorOp};
use crate::script::{ObjectToken, ScriptReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptListing {
    pub size: usize,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub index: usize,
    pub offset: usize,
    pub end: usize,
    pub conditions: Vec<Instruction>,
    pub operators: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub offset: usize,
    pub code: i16,
    pub name: &'static str,
    pub operands: Vec<OperandValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperandValue {
    Word { value: i16 },
    Object { name: String },
    String { value: String },
    Eval { op: i16, arg: i16 },
    Compare { op: i16, arg: i16 },
    Intervals { ranges: Vec<(i16, i16)> },
    Transform { mul: i16, div: i16, add: i16 },
    Span { min: [i16; 3], max: [i16; 3], cmp: i16 },
    Mode { mode: i16, weight: Option<i16> },
}

impl OperandValue {
    fn render(&self) -> String {
        match self {
            OperandValue::Word { value } => value.to_string(),
            OperandValue::Object { name } => name.clone(),
            OperandValue::String { value } => format!("\"{value}\""),
            OperandValue::Eval { op, arg } => {
                let sym = match op {
                    0 => "=",
                    1 => "+=",
                    2 => "-=",
                    3 => "*=",
                    4 => "/=",
                    _ => "?=",
                };
                format!("{sym}{arg}")
            }
            OperandValue::Compare { op, arg } => {
                let sym = match op {
                    0 => "==",
                    1 => "!=",
                    2 => "<",
                    3 => ">",
                    4 => "<=",
                    5 => ">=",
                    _ => "??",
                };
                format!("v{sym}{arg}")
            }
            OperandValue::Intervals { ranges } => {
                let parts: Vec<String> = ranges
                    .iter()
                    .map(|(lo, hi)| format!("{lo}..={hi}"))
                    .collect();
                format!("in[{}]", parts.join(","))
            }
            OperandValue::Transform { mul, div, add } => format!("({mul}*d/{div}{add:+})"),
            OperandValue::Span { min, max, cmp } => format!(
                "({}*d/{}{:+} .. {}*d/{}{:+} ~ {cmp})",
                min[0], min[1], min[2], max[0], max[1], max[2]
            ),
            OperandValue::Mode { mode, weight } => match weight {
                Some(weight) => format!("mode {mode}/{weight}"),
                None => format!("mode {mode}"),
            },
        }
    }
}

/// Decodes every statement of a compiled script without executing it.
pub fn disassemble(data: &[u8]) -> Result<ScriptListing> {
    let mut reader = ScriptReader::new(data);
    let mut statements = Vec::new();

    while !reader.is_at_end() {
        let index = statements.len();
        let offset = reader.offset();
        let end = reader
            .fetch_offset()
            .with_context(|| format!("reading end of statement {index}"))?;
        if end <= offset || end > data.len() {
            bail!("statement {index} at {offset} has invalid end offset {end}");
        }

        let mut conditions = Vec::new();
        loop {
            let op_offset = reader.offset();
            let code = reader.fetch_word()?;
            if code == 0 {
                break;
            }
            let op = ConditionOp::try_from(code)
                .with_context(|| format!("statement {index} condition at offset {op_offset}"))?;
            let operands = decode_operands(&mut reader, op.operands())?;
            conditions.push(Instruction {
                offset: op_offset,
                code,
                name: op.name(),
                operands,
            });
        }

        let mut operators = Vec::new();
        while reader.offset() < end {
            let op_offset = reader.offset();
            let code = reader.fetch_word()?;
            let op = OperatorOp::try_from(code)
                .with_context(|| format!("statement {index} operator at offset {op_offset}"))?;
            let operands = decode_operands(&mut reader, op.operands())?;
            operators.push(Instruction {
                offset: op_offset,
                code,
                name: op.name(),
                operands,
            });
        }
        if reader.offset() != end {
            bail!(
                "statement {index} operands overrun end offset {end} (cursor at {})",
                reader.offset()
            );
        }

        statements.push(Statement {
            index,
            offset,
            end,
            conditions,
            operators,
        });
    }

    Ok(ScriptListing {
        size: data.len(),
        statements,
    })
}

fn decode_operands<B: AsRef<[u8]>>(
    reader: &mut ScriptReader<B>,
    layout: &[Operand],
) -> Result<Vec<OperandValue>> {
    let mut values = Vec::with_capacity(layout.len());
    for operand in layout {
        let value = match operand {
            Operand::Word => OperandValue::Word {
                value: reader.fetch_word()?,
            },
            Operand::Object => OperandValue::Object {
                name: match reader.fetch_object_token()? {
                    ObjectToken::Named(name) => String::from_utf8_lossy(name).into_owned(),
                    other => other.describe(),
                },
            },
            Operand::String => OperandValue::String {
                value: reader.fetch_string()?,
            },
            Operand::Eval => OperandValue::Eval {
                op: reader.fetch_word()?,
                arg: reader.fetch_word()?,
            },
            Operand::Test => {
                let op = reader.fetch_word()?;
                if op == -1 {
                    let count = reader.fetch_word()?.max(0);
                    let mut ranges = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        ranges.push((reader.fetch_word()?, reader.fetch_word()?));
                    }
                    OperandValue::Intervals { ranges }
                } else {
                    OperandValue::Compare {
                        op,
                        arg: reader.fetch_word()?,
                    }
                }
            }
            Operand::Transform => OperandValue::Transform {
                mul: reader.fetch_word()?,
                div: reader.fetch_word()?,
                add: reader.fetch_word()?,
            },
            Operand::Span => OperandValue::Span {
                min: [reader.fetch_word()?, reader.fetch_word()?, reader.fetch_word()?],
                max: [reader.fetch_word()?, reader.fetch_word()?, reader.fetch_word()?],
                cmp: reader.fetch_word()?,
            },
            Operand::Mode => {
                let mode = reader.fetch_word()?;
                let weight = if mode == 2 {
                    Some(reader.fetch_word()?)
                } else {
                    None
                };
                OperandValue::Mode { mode, weight }
            }
        };
        values.push(value);
    }
    Ok(values)
}

impl ScriptListing {
    /// Plain-text rendering, one statement block per paragraph.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for statement in &self.statements {
            let _ = writeln!(
                out,
                "#{:<3} @{:04x}..{:04x}",
                statement.index, statement.offset, statement.end
            );
            for (label, list) in [("if", &statement.conditions), ("do", &statement.operators)] {
                for instr in list {
                    let args: Vec<String> = instr.operands.iter().map(OperandValue::render).collect();
                    let _ = writeln!(
                        out,
                        "  {label} {:04x} {:>5} {:<26} {}",
                        instr.offset,
                        instr.code,
                        instr.name,
                        args.join(" ")
                    );
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptWriter;

    fn statement(writer: &mut ScriptWriter, body: impl FnOnce(&mut ScriptWriter)) {
        let start = writer.len();
        writer.word(0);
        body(writer);
        let end = writer.len() as i16;
        writer.patch_word(start, end);
    }

    #[test]
    fn lists_conditions_and_operators() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.word(3010).object("door").word(1);
            w.word(0);
            w.word(3120).current_object().words(&[1, 5]);
            w.word(100);
        });
        statement(&mut writer, |w| {
            w.word(10).word(0);
            w.word(5000).object("bird").words(&[2, 300]);
        });

        let listing = disassemble(writer.as_bytes()).unwrap();
        assert_eq!(listing.statements.len(), 2);

        let first = &listing.statements[0];
        assert_eq!(first.conditions[0].name, "state_is");
        assert_eq!(
            first.conditions[0].operands,
            vec![
                OperandValue::Object {
                    name: "door".into()
                },
                OperandValue::Word { value: 1 }
            ]
        );
        assert_eq!(first.operators.len(), 2);
        assert_eq!(first.operators[1].name, "break");

        let second = &listing.statements[1];
        assert_eq!(
            second.operators[0].operands[1],
            OperandValue::Mode {
                mode: 2,
                weight: Some(300)
            }
        );
        assert!(listing.to_text().contains("set_mode"));
    }

    #[test]
    fn rejects_backward_end_offsets() {
        let mut writer = ScriptWriter::new();
        writer.words(&[0, 0]);
        let err = disassemble(writer.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid end offset"));
    }

    #[test]
    fn rejects_unknown_operator() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.word(0).word(4242);
        });
        let err = disassemble(writer.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown opcode 4242"));
    }
}
