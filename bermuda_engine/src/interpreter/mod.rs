//! Per-object script interpreter.
//!
//! A script is a list of statements. Each statement starts with the offset of
//! its end, then a zero-terminated list of conditions, then operators up to
//! the end offset. The first failing condition skips the statement; operator
//! `100` stops the whole script for the running object.

mod conditions;
mod cursor;
mod expr;
mod geometry;
mod operators;

use bermuda_formats::{ConditionOp, ObjectToken, Operand, OperatorOp, ScriptFormatError};
use log::{debug, trace};
use serde::Serialize;

use crate::error::{ScriptError, ScriptResult};
use crate::host::EngineHost;
use crate::random::RandomGenerator;
use crate::scene::{state, Scene};
use crate::world::WorldState;

pub use cursor::ScriptCursor;
pub use expr::EvalExpr;
pub use geometry::Axis;

/// Outcome of running one object's script for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectRun {
    pub object: usize,
    pub statements: usize,
    /// Cursor position when the script stopped; equals the script size.
    pub end_offset: usize,
}

/// Borrowed view of everything a script can touch during one tick.
pub struct Interpreter<'a> {
    scene: &'a mut Scene,
    world: &'a mut WorldState,
    rng: &'a mut RandomGenerator,
    host: &'a dyn EngineHost,
    cursor: ScriptCursor,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        scene: &'a mut Scene,
        world: &'a mut WorldState,
        rng: &'a mut RandomGenerator,
        host: &'a dyn EngineHost,
    ) -> Self {
        Interpreter {
            scene,
            world,
            rng,
            host,
            cursor: ScriptCursor::new(),
        }
    }

    pub fn cursor(&self) -> &ScriptCursor {
        &self.cursor
    }

    /// Next-scene table index staged by a switch operator, if any.
    pub fn next_scene(&self) -> Option<usize> {
        self.cursor.next_scene
    }

    /// Runs every object from `start` whose committed state is neither
    /// inactive nor pending clear, in table order.
    pub fn run_objects(&mut self, start: usize) -> ScriptResult<Vec<ObjectRun>> {
        let mut runs = Vec::new();
        for index in start..self.scene.objects.len() {
            let state_prev = self.scene.objects[index].state_prev;
            if state_prev == state::INACTIVE || state_prev == state::CLEAR_PENDING {
                continue;
            }
            runs.push(self.run_object(index)?);
        }
        Ok(runs)
    }

    /// Runs the script of the animation owning the object's current motion.
    pub fn run_object(&mut self, index: usize) -> ScriptResult<ObjectRun> {
        let motion = self.scene.object(index)?.motion_num1;
        let anim = self.scene.animation_of_motion(motion)?;
        debug!(
            "running object {} ('{}') with script of '{}'",
            index, self.scene.objects[index].name, anim.name
        );
        let script = anim.script.clone();
        self.cursor.load(script, index);

        match self.run_statements() {
            Ok(statements) => Ok(ObjectRun {
                object: index,
                statements,
                end_offset: self.cursor.offset(),
            }),
            Err(source) => Err(ScriptError::InObject {
                object: index,
                statement: self.cursor.statement,
                offset: self.cursor.offset(),
                source: Box::new(source),
            }),
        }
    }

    fn run_statements(&mut self) -> ScriptResult<usize> {
        let size = self.cursor.size();
        let mut statement = 0;
        while self.cursor.offset() < size {
            self.cursor.statement = statement;
            let start = self.cursor.offset();
            let mut end = self.cursor.end_offset()?;
            if end <= start || end > size {
                return Err(ScriptError::MalformedStatement {
                    statement,
                    offset: start,
                    end,
                });
            }
            self.cursor.default_object = None;

            if self.run_conditions()? {
                while self.cursor.offset() < end {
                    let offset = self.cursor.offset();
                    let code = self.cursor.word()?;
                    let op = OperatorOp::try_from(code)
                        .map_err(|_| ScriptFormatError::UnknownOperator { code, offset })?;
                    trace!("statement {statement} operator {} @{offset}", op.name());
                    if op == OperatorOp::Break {
                        end = size;
                        break;
                    }
                    self.operator(op)?;
                }
            }
            self.cursor.seek(end);
            statement += 1;
        }
        Ok(statement)
    }

    /// Evaluates conditions until the terminating zero or the first failure.
    fn run_conditions(&mut self) -> ScriptResult<bool> {
        loop {
            let offset = self.cursor.offset();
            let code = self.cursor.word()?;
            if code == 0 {
                return Ok(true);
            }
            let op = ConditionOp::try_from(code)
                .map_err(|_| ScriptFormatError::UnknownCondition { code, offset })?;
            let passed = self.condition(op)?;
            trace!(
                "statement {} condition {} @{offset} -> {passed}",
                self.cursor.statement,
                op.name()
            );
            if !passed {
                return Ok(false);
            }
        }
    }

    /// Resolves the object token at the cursor. A miss is a normal outcome;
    /// the caller must then skip the rest of the opcode's operands.
    fn resolve(&mut self) -> ScriptResult<Option<usize>> {
        let token = self.cursor.reader.fetch_object_token()?;
        let (index, named) = match token {
            ObjectToken::Default => (self.cursor.default_object, true),
            ObjectToken::Current => (Some(self.cursor.current), false),
            ObjectToken::Named(name) => (self.scene.find_object(name), true),
        };
        if index.is_none() {
            trace!("object {} not found", token.describe());
        }
        self.cursor.named = named;
        Ok(index)
    }

    /// Resolves the opcode's object, skipping `miss_skip` operands on a miss.
    fn resolve_or_skip(&mut self, miss_skip: &[Operand]) -> ScriptResult<Option<usize>> {
        let index = self.resolve()?;
        if index.is_none() {
            self.cursor.skip(miss_skip)?;
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use bermuda_formats::ScriptWriter;

    use super::*;
    use crate::host::RecordingHost;
    use crate::scene::{
        FrameHeader, SceneAnimation, SceneObject, SceneObjectFrame, SceneObjectMotion,
    };

    pub(crate) fn statement(
        writer: &mut ScriptWriter,
        body: impl FnOnce(&mut ScriptWriter),
    ) {
        let mark = writer.len();
        writer.word(0);
        body(writer);
        let end = writer.len() as i16;
        writer.patch_word(mark, end);
    }

    pub(crate) fn scene_with_script(script: Vec<u8>, names: &[&str]) -> Scene {
        let mut scene = Scene::new("UNIT.SCN", 7);
        scene.frames.push(SceneObjectFrame {
            hdr: FrameHeader {
                next_frame: 0,
                w: 10,
                h: 20,
                x_pos: 0,
                y_pos: 0,
            },
            data: vec![0; 204],
        });
        scene.motions.push(SceneObjectMotion {
            name: "idle".into(),
            first_frame: 0,
            count: 1,
            anim: 0,
        });
        for name in names {
            scene.objects.push(SceneObject {
                name: name.to_string(),
                x: 100,
                y: 50,
                x_prev: 100,
                y_prev: 50,
                state: state::ACTIVE,
                state_prev: state::ACTIVE,
                ..SceneObject::default()
            });
        }
        scene.animations.push(SceneAnimation {
            name: "anim".into(),
            first_motion: 0,
            motions_count: 1,
            first_object: 0,
            objects_count: names.len() as i16,
            first_sound: 0,
            sounds_count: 0,
            foreign_motion_offset: 0,
            script: Rc::from(script),
        });
        scene.loaded = true;
        scene
    }

    fn run(scene: &mut Scene, world: &mut WorldState) -> ScriptResult<ObjectRun> {
        let mut rng = RandomGenerator::new(0);
        let host = RecordingHost::new();
        let mut interp = Interpreter::new(scene, world, &mut rng, &host);
        interp.run_object(0)
    }

    #[test]
    fn break_stops_remaining_statements() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.words(&[10, 0, 6000, 1, 0, 5, 100, 6000, 2, 0, 5]);
        });
        statement(&mut writer, |w| {
            w.words(&[10, 0, 6000, 3, 0, 5]);
        });
        let size = writer.len();
        let mut scene = scene_with_script(writer.into_bytes(), &["hero"]);
        let mut world = WorldState::new();

        let run = run(&mut scene, &mut world).unwrap();
        assert_eq!(run.end_offset, size);
        assert_eq!(run.statements, 1);
        assert_eq!(&world.vars()[1..4], &[5, 0, 0]);
    }

    #[test]
    fn failed_condition_skips_operators() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.words(&[6000, 9, 0, 1, 0, 6000, 1, 0, 5]);
        });
        statement(&mut writer, |w| {
            w.words(&[0, 6000, 2, 0, 6]);
        });
        let mut scene = scene_with_script(writer.into_bytes(), &["hero"]);
        let mut world = WorldState::new();

        let run = run(&mut scene, &mut world).unwrap();
        assert_eq!(run.statements, 2);
        assert_eq!(world.vars()[1], 0);
        assert_eq!(world.vars()[2], 6);
    }

    #[test]
    fn unknown_opcode_reports_object_and_offset() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.words(&[10, 0, 4321]);
        });
        let mut scene = scene_with_script(writer.into_bytes(), &["hero"]);
        let mut world = WorldState::new();

        let err = run(&mut scene, &mut world).unwrap_err();
        match err {
            ScriptError::InObject {
                object: 0,
                statement: 0,
                source,
                ..
            } => assert!(matches!(
                *source,
                ScriptError::Format(ScriptFormatError::UnknownOperator {
                    code: 4321,
                    offset: 6
                })
            )),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn backwards_end_offset_is_malformed() {
        let mut writer = ScriptWriter::new();
        writer.words(&[0, 10, 0]);
        let mut scene = scene_with_script(writer.into_bytes(), &["hero"]);
        let mut world = WorldState::new();

        let err = run(&mut scene, &mut world).unwrap_err();
        assert!(err.to_string().contains("end offset 0"));
    }

    #[test]
    fn skips_inactive_and_clearing_objects() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.words(&[0, 6000, 1, 1, 1]);
        });
        let mut scene = scene_with_script(writer.into_bytes(), &["a", "b", "c"]);
        scene.objects[1].state_prev = state::INACTIVE;
        scene.objects[2].state_prev = state::CLEAR_PENDING;
        let mut world = WorldState::new();
        let mut rng = RandomGenerator::new(0);
        let host = RecordingHost::new();

        let runs = Interpreter::new(&mut scene, &mut world, &mut rng, &host)
            .run_objects(0)
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].object, 0);
        assert_eq!(world.vars()[1], 1);
    }
}
