use bermuda_formats::OperatorOp;
use log::{debug, info, trace, warn};

use super::geometry::{Axis, RowAlign};
use super::Interpreter;
use crate::boxes::{BOX_DISABLED, BOX_ENABLED};
use crate::error::{check_index, ScriptError, ScriptResult};
use crate::lifecycle::reinitialize_object;
use crate::scene::{mode, state, NUM_OBJECT_VARS, FLIP_HORIZONTAL};
use crate::world::DialogueRequest;

/// Statements of object 0 whose box-disable is ignored; the raft scenes rely
/// on the box staying enabled.
const RAFT_STATEMENTS: [usize; 2] = [38, 39];

impl Interpreter<'_> {
    pub(super) fn operator(&mut self, op: OperatorOp) -> ScriptResult<()> {
        match op {
            OperatorOp::Break => Ok(()),
            OperatorOp::InitObject => self.init_object(op),
            OperatorOp::EvalSelfX | OperatorOp::EvalSelfY => {
                let current = self.cursor.current;
                if self.scene.object(current)?.state == 0 {
                    return self.cursor.skip(op.operands());
                }
                self.cursor.skip(&op.operands()[..1])?;
                let axis = if op == OperatorOp::EvalSelfX { Axis::X } else { Axis::Y };
                let eval = self.cursor.eval_expr()?;
                let pos = axis.pos_mut(self.scene.object_mut(current)?);
                *pos = eval.apply(*pos)?;
                Ok(())
            }
            OperatorOp::EvalX
            | OperatorOp::EvalY
            | OperatorOp::EvalZ
            | OperatorOp::EvalInitX
            | OperatorOp::EvalInitY
            | OperatorOp::EvalInitZ => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(());
                };
                let eval = self.cursor.eval_expr()?;
                let object = self.scene.object_mut(index)?;
                let field = match op {
                    OperatorOp::EvalX => &mut object.x,
                    OperatorOp::EvalY => &mut object.y,
                    OperatorOp::EvalZ => &mut object.z,
                    OperatorOp::EvalInitX => &mut object.x_init,
                    OperatorOp::EvalInitY => &mut object.y_init,
                    _ => &mut object.z_init,
                };
                *field = eval.apply(*field)?;
                Ok(())
            }
            OperatorOp::SetFlip | OperatorOp::SetInitFlip => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(());
                };
                let flip = self.cursor.word()?;
                let object = self.scene.object_mut(index)?;
                if op == OperatorOp::SetFlip {
                    object.flip = flip;
                } else {
                    object.flip_init = flip;
                }
                Ok(())
            }
            OperatorOp::SetMotionFrame => self.motion_frame(op, |w| (w[1], w[0], None, None)),
            OperatorOp::SetMotionFrameDx => self.motion_frame(op, |w| (w[1], w[0], Some(w[2]), None)),
            OperatorOp::SetMotionFrameDxDy => {
                self.motion_frame(op, |w| (w[1], w[0], Some(w[2]), Some(w[3])))
            }
            OperatorOp::SetMotion => self.motion_frame(op, |w| (1, w[0], None, None)),
            OperatorOp::SetMotionDxDy => self.motion_frame(op, |w| (1, w[0], Some(w[1]), Some(w[2]))),
            OperatorOp::AlignFrameGridX => self.align(op, true, RowAlign::Frame),
            OperatorOp::AlignFrameGridXY => self.align(op, true, RowAlign::Grid),
            OperatorOp::AlignFrameGridXAbsY => self.align(op, true, RowAlign::Absolute),
            OperatorOp::AlignMotionGridX => self.align(op, false, RowAlign::Frame),
            OperatorOp::AlignMotionGridXY => self.align(op, false, RowAlign::Grid),
            OperatorOp::AlignMotionGridXAbsY => self.align(op, false, RowAlign::Absolute),
            OperatorOp::EvalObjectVar => {
                let var = self.cursor.word()?;
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(());
                };
                let slot = check_index("object variable", i32::from(var), NUM_OBJECT_VARS)?;
                let eval = self.cursor.eval_expr()?;
                let value = &mut self.scene.object_mut(index)?.vars[slot];
                *value = eval.apply(*value)?;
                Ok(())
            }
            OperatorOp::TranslateX => self.translate(op, Axis::X),
            OperatorOp::TranslateY => self.translate(op, Axis::Y),
            OperatorOp::SetMode => {
                let index = self.resolve()?;
                let new_mode = self.cursor.word()?;
                let weight = if new_mode == mode::RANDOM {
                    Some(self.cursor.word()?)
                } else {
                    None
                };
                if let Some(index) = index {
                    let object = self.scene.object_mut(index)?;
                    object.mode = new_mode;
                    if let Some(weight) = weight {
                        object.mode_rnd_mul = weight;
                    }
                }
                Ok(())
            }
            OperatorOp::SetInitPos => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(());
                };
                let x = self.cursor.word()?;
                let y = self.cursor.word()?;
                let object = self.scene.object_mut(index)?;
                object.x_init = x;
                object.y_init = y;
                Ok(())
            }
            OperatorOp::SetInitPosFromSelf => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(());
                };
                let current = self.cursor.current;
                let x = self.transform(Axis::X, current)?;
                let y = self.transform(Axis::Y, current)?;
                let object = self.scene.object_mut(index)?;
                object.x_init = x;
                object.y_init = y;
                Ok(())
            }
            OperatorOp::SetCel | OperatorOp::ResetCel => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(());
                };
                let motion = self.cursor.word()?.wrapping_sub(1);
                let frame = if op == OperatorOp::SetCel {
                    self.cursor.word()?.wrapping_sub(1)
                } else {
                    0
                };
                let object = self.scene.object_mut(index)?;
                object.motion_num = motion;
                object.motion_frame_num = frame;
                Ok(())
            }
            OperatorOp::EvalVar => {
                let var = self.cursor.word()?;
                let eval = self.cursor.eval_expr()?;
                let value = self.world.var_mut(i32::from(var))?;
                *value = eval.apply(*value)?;
                Ok(())
            }
            OperatorOp::StoreSceneNumber => {
                let var = self.cursor.word()?;
                self.world.set_var(i32::from(var), self.scene.number)
            }
            OperatorOp::DisableBox | OperatorOp::EnableBox => {
                let category = self.cursor.word()?;
                let index = self.cursor.word()?;
                let state = if op == OperatorOp::EnableBox {
                    BOX_ENABLED
                } else if self.cursor.current == 0
                    && RAFT_STATEMENTS.contains(&self.cursor.statement)
                {
                    trace!("box {category}/{index} kept enabled for the raft");
                    return Ok(());
                } else {
                    BOX_DISABLED
                };
                self.world.boxes.get_mut(category, index)?.state = state;
                Ok(())
            }
            OperatorOp::EvalBoxesX | OperatorOp::EvalBoxesY => {
                let eval = self.cursor.eval_expr()?;
                for b in self.world.boxes.live_mut() {
                    if op == OperatorOp::EvalBoxesX {
                        b.x1 = eval.apply(b.x1)?;
                        b.x2 = eval.apply(b.x2)?;
                    } else {
                        b.y1 = eval.apply(b.y1)?;
                        b.y2 = eval.apply(b.y2)?;
                    }
                }
                Ok(())
            }
            OperatorOp::FitBoxToObject => self.fit_box(op),
            OperatorOp::ClipBoxes => {
                let x1 = self.cursor.word()?;
                let y1 = self.cursor.word()?;
                let x2 = self.cursor.word()?;
                let y2 = self.cursor.word()?;
                let clip = |v: i16, lo: i16, hi: i16| if v < lo { lo } else if v > hi { hi } else { v };
                for b in self.world.boxes.live_mut() {
                    b.x1 = clip(b.x1, x1, x2);
                    b.x2 = clip(b.x2, x1, x2);
                    b.y1 = clip(b.y1, y1, y2);
                    b.y2 = clip(b.y2, y1, y2);
                }
                Ok(())
            }
            OperatorOp::SaveStatus => self.save_status(),
            OperatorOp::AddToBag => self.add_to_bag(),
            OperatorOp::RemoveFromBag => {
                let name = self.cursor.reader.fetch_cstr()?;
                if let Some(index) = self.world.bag.find(name) {
                    self.world.bag.remove(index);
                }
                Ok(())
            }
            OperatorOp::PlaySound => self.play_sound(false),
            OperatorOp::PlaySoundStrict => self.play_sound(true),
            OperatorOp::StartDialogue => {
                let request = DialogueRequest {
                    id: self.cursor.string()?,
                    data_file: self.cursor.string()?,
                    sprite1: self.cursor.string()?,
                    sprite2: self.cursor.string()?,
                };
                debug!("dialogue '{}' requested", request.id);
                self.world.dialogue_request = Some(request);
                Ok(())
            }
            OperatorOp::SwitchSceneClearBoxes | OperatorOp::SwitchSceneCopyBoxes => {
                let num = self.cursor.word()?;
                let Some(next) = self.scene.find_next_scene(num) else {
                    return Ok(());
                };
                info!(
                    "next scene {} ('{}') staged",
                    num, self.scene.next_scenes[next].name
                );
                self.cursor.next_scene = Some(next);
                if op == OperatorOp::SwitchSceneClearBoxes {
                    self.world.boxes.clear_staged();
                } else {
                    self.world.boxes.stage_live();
                }
                Ok(())
            }
        }
    }

    /// `0` clears the object, `1` activates it, `2` freezes it.
    fn init_object(&mut self, op: OperatorOp) -> ScriptResult<()> {
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(());
        };
        let action = self.cursor.word()?;
        match action {
            0 => {
                let object = self.scene.object(index)?;
                if object.state == state::INACTIVE {
                    return Ok(());
                }
                let frozen = object.state == state::FROZEN;
                let frame = *self.scene.frame(object.frame_num_prev)?;
                let object = self.scene.object_mut(index)?;
                object.x = object.x_prev;
                object.y = object.y_prev;
                object.frame_num = object.frame_num_prev;
                object.state = state::CLEAR_PENDING;
                if frozen {
                    self.host
                        .restore_background(object.x, object.y, frame.w, frame.h);
                }
            }
            1 => {
                self.reinitialize_as(index, mode::ALWAYS)?;
                let object = self.scene.object_mut(index)?;
                if object.state == state::FROZEN {
                    object.state = state::ACTIVE;
                }
            }
            2 => {
                let object = self.scene.object_mut(index)?;
                if object.state == state::ACTIVE {
                    object.x = object.x_prev;
                    object.y = object.y_prev;
                    object.frame_num = object.frame_num_prev;
                    object.state = state::FROZEN;
                } else {
                    self.reinitialize_as(index, mode::PUT)?;
                }
            }
            other => warn!("unknown object initialisation {other}"),
        }
        Ok(())
    }

    /// Reinitializes an object as if it had `forced` mode, keeping its own.
    fn reinitialize_as(&mut self, index: usize, forced: i16) -> ScriptResult<()> {
        let saved = std::mem::replace(&mut self.scene.object_mut(index)?.mode, forced);
        let result = reinitialize_object(self.scene, self.rng, index);
        self.scene.object_mut(index)?.mode = saved;
        result.map(|_| ())
    }

    /// Reads the opcode's words after the object token and maps them to
    /// `(frame, motion, dx, dy)`.
    fn motion_frame(
        &mut self,
        op: OperatorOp,
        args: fn(&[i16]) -> (i16, i16, Option<i16>, Option<i16>),
    ) -> ScriptResult<()> {
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(());
        };
        let mut words = Vec::with_capacity(op.miss_skip().len());
        for _ in op.miss_skip() {
            words.push(self.cursor.word()?);
        }
        let (frame, motion, dx, dy) = args(&words);
        let named = self.cursor.named;
        self.change_motion_frame(index, named, frame, motion, dx, dy)
    }

    fn align(&mut self, op: OperatorOp, with_frame: bool, row: RowAlign) -> ScriptResult<()> {
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(());
        };
        if self.scene.object(self.cursor.current)?.state_prev == 0 {
            return self.cursor.skip(op.miss_skip());
        }
        let named = self.cursor.named;
        self.align_to_grid(index, named, with_frame, row)
    }

    /// Nudges an object toward the nearest rest position of a lattice of
    /// step `div`, moving at most `speed` units.
    fn translate(&mut self, op: OperatorOp, axis: Axis) -> ScriptResult<()> {
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(());
        };
        let bias = self.cursor.word()?;
        let div = self.cursor.word()?;
        let shift = self.cursor.word()?;
        let speed = self.cursor.word()?;
        let phase = self.translate_phase(axis, index, bias, div, shift)?;
        let pos = axis.pos_mut(self.scene.object_mut(index)?);
        if div / 2 >= phase {
            *pos = pos.wrapping_sub(speed.min(phase));
        } else {
            *pos = pos.wrapping_add(speed.min(div.wrapping_sub(phase)));
        }
        Ok(())
    }

    fn fit_box(&mut self, op: OperatorOp) -> ScriptResult<()> {
        let category = self.cursor.word()?;
        let slot = self.cursor.word()?;
        let index = self.resolve()?;
        let live = match index {
            Some(index) if self.scene.object(index)?.state_prev != 0 => Some(index),
            _ => None,
        };
        let Some(index) = live else {
            return self.cursor.skip(op.miss_skip());
        };
        let x1 = self.transform(Axis::X, index)?;
        let x2 = self.transform(Axis::X, index)?;
        let y1 = self.transform(Axis::Y, index)?;
        let y2 = self.transform(Axis::Y, index)?;
        let b = self.world.boxes.get_mut(category, slot)?;
        b.x1 = x1.min(x2);
        b.x2 = x1.max(x2);
        b.y1 = y1.min(y2);
        b.y2 = y1.max(y2);
        Ok(())
    }

    /// Records the running object's committed placement, motion and frame
    /// relative to its animation.
    fn save_status(&mut self) -> ScriptResult<()> {
        let object = self.scene.object(self.cursor.current)?;
        let committed = self.scene.frame(object.frame_num_prev)?;
        let x = if object.flip_prev == FLIP_HORIZONTAL {
            (i32::from(object.x_prev) + i32::from(committed.w) - 1) as i16
        } else {
            object.x_prev
        };
        let motion = self.scene.motion(object.motion_num1)?;
        let first_motion = self.scene.animation(motion.anim)?.first_motion;
        let status = crate::scene::SceneObjectStatus {
            x,
            y: object.y_prev,
            z: object.z_prev,
            motion: object.motion_num1.wrapping_sub(first_motion),
            frame: object.frame_num_prev.wrapping_sub(motion.first_frame),
            flip: object.flip_prev,
        };
        let slot = self.cursor.word()?;
        *self.world.status_mut(i32::from(slot))? = status;
        Ok(())
    }

    /// Copies the object's committed frame into the bag unless an item with
    /// the same name is already there.
    fn add_to_bag(&mut self) -> ScriptResult<()> {
        let Some(index) = self.resolve()? else {
            return Ok(());
        };
        let object = self.scene.object(index)?;
        if self.world.bag.find(object.name.as_bytes()).is_some() {
            return Ok(());
        }
        if self.world.bag.is_full() {
            return Err(ScriptError::BagFull(self.world.bag.len()));
        }
        let frame = self.scene.frame_data(object.frame_num_prev)?;
        let expected = usize::try_from(i32::from(frame.hdr.w) * i32::from(frame.hdr.h))
            .unwrap_or(0)
            + 4;
        let data = self.host.decode_frame_bitmap(frame);
        if data.len() != expected {
            return Err(ScriptError::BagBitmapSize {
                name: object.name.clone(),
                expected,
                actual: data.len(),
            });
        }
        let name = object.name.clone();
        self.world.bag.add(name, data)
    }

    /// Plays a sound of the running object's animation. While a sound is
    /// playing, a request whose priority is above the current one (or equal,
    /// when `strict`) is dropped.
    fn play_sound(&mut self, strict: bool) -> ScriptResult<()> {
        let num = self.cursor.word()?;
        let priority = self.cursor.word()?;
        let current = self.world.current_sound_priority;
        let outranked = if strict {
            priority >= current
        } else {
            priority > current
        };
        if outranked && self.host.is_sound_playing() {
            trace!("sound {num} priority {priority} blocked by {current}");
            return Ok(());
        }
        let object = self.scene.object(self.cursor.current)?;
        let first_sound = self.scene.animation_of_motion(object.motion_num1)?.first_sound;
        let slot = i32::from(num) + i32::from(first_sound) - 1;
        let sound = self.scene.sound(slot)?;
        self.host.play_sound(&sound.filename, priority);
        self.world.current_sound_priority = priority;
        Ok(())
    }
}
