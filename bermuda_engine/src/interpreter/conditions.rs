use bermuda_formats::ConditionOp;
use log::warn;

use super::geometry::Axis;
use super::Interpreter;
use crate::boxes::BOX_ENABLED;
use crate::error::{check_index, ScriptError, ScriptResult};
use crate::scene::NUM_OBJECT_VARS;
use crate::world::{MOUSE_LEFT, MOUSE_RIGHT};

impl Interpreter<'_> {
    pub(super) fn condition(&mut self, op: ConditionOp) -> ScriptResult<bool> {
        match op {
            ConditionOp::True => Ok(true),
            ConditionOp::Chance => {
                let weight = self.cursor.word()?;
                Ok(self.rng.chance(weight))
            }
            ConditionOp::KeyPressed => {
                let key = self.cursor.word()?;
                self.world.key(i32::from(key))
            }
            ConditionOp::KeyNotPressed => {
                let key = self.cursor.word()?;
                Ok(!self.world.key(i32::from(key))?)
            }
            ConditionOp::MouseButtons => {
                let buttons = self.world.mouse_buttons;
                Ok(match self.cursor.word()? {
                    0 => buttons & MOUSE_LEFT != 0,
                    1 => buttons & MOUSE_RIGHT != 0,
                    2 => buttons & MOUSE_LEFT == 0,
                    3 => buttons & MOUSE_RIGHT == 0,
                    other => {
                        warn!("unknown mouse selector {other}");
                        true
                    }
                })
            }
            ConditionOp::IsRunningObject => Ok(self.resolve()? == Some(self.cursor.current)),
            ConditionOp::PrevStateIs | ConditionOp::StateIs => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(false);
                };
                let expected = self.cursor.word()?;
                let object = self.scene.object(index)?;
                let state = if op == ConditionOp::PrevStateIs {
                    object.state_prev
                } else {
                    object.state
                };
                Ok(state == expected)
            }
            ConditionOp::InRect => self.in_rect(),
            ConditionOp::PrevSpanX => self.span(op, Axis::X, true),
            ConditionOp::SpanX => self.span(op, Axis::X, false),
            ConditionOp::PrevSpanY => self.span(op, Axis::Y, true),
            ConditionOp::SpanY => self.span(op, Axis::Y, false),
            ConditionOp::PrevFlipIs | ConditionOp::FlipIs => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(false);
                };
                let expected = self.cursor.word()?;
                let object = self.scene.object(index)?;
                let flip = if op == ConditionOp::PrevFlipIs {
                    object.flip_prev
                } else {
                    object.flip
                };
                Ok(flip == expected)
            }
            ConditionOp::PrevFrameTest | ConditionOp::FrameTest => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(false);
                };
                let object = self.scene.object(index)?;
                if object.state_prev == 0 {
                    return Ok(false);
                }
                let (frame, motion) = if op == ConditionOp::PrevFrameTest {
                    (object.frame_num_prev, object.motion_num1)
                } else {
                    (object.frame_num, object.motion_num2)
                };
                let first = self.scene.motion(motion)?.first_frame;
                let value = (i32::from(frame) - i32::from(first) + 1) as i16;
                self.cursor.test_expr(value)
            }
            ConditionOp::PrevMotionTest | ConditionOp::MotionTest => {
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(false);
                };
                let value = match self.motion_index(index, op == ConditionOp::PrevMotionTest)? {
                    Some(value) => value,
                    None => return Ok(false),
                };
                self.cursor.test_expr(value)
            }
            ConditionOp::ObjectVarTest => {
                let var = self.cursor.word()?;
                let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
                    return Ok(false);
                };
                let slot = check_index("object variable", i32::from(var), NUM_OBJECT_VARS)?;
                let value = self.scene.object(index)?.vars[slot];
                self.cursor.test_expr(value)
            }
            ConditionOp::ObjectsOverlapX => self.objects_overlap(Axis::X),
            ConditionOp::ObjectsOverlapY => self.objects_overlap(Axis::Y),
            ConditionOp::MotionYModulo => self.motion_y_modulo(op),
            ConditionOp::VarTest => {
                let var = self.cursor.word()?;
                let value = self.world.var(i32::from(var))?;
                self.cursor.test_expr(value)
            }
            ConditionOp::BagActionIs => Ok(self.cursor.word()? == self.world.bag.current_action),
            ConditionOp::InBox | ConditionOp::NotInBox => self.in_box(op),
            ConditionOp::NotCrossingBox => self.not_crossing_box(op),
            ConditionOp::BagObjectIs => {
                let name = self.cursor.reader.fetch_cstr()?;
                Ok(self.world.bag.is_current(name))
            }
            ConditionOp::LifeBarShown => Ok(self.world.life_bar_displayed),
            ConditionOp::LifeBarHidden => Ok(!self.world.life_bar_displayed),
            ConditionOp::DialogueEnded => {
                let matched = self.cursor.test_expr(self.world.last_dialogue_ended_id)?;
                Ok(matched && self.world.dialogue_ended)
            }
            ConditionOp::NextSceneStaged => {
                let num = self.cursor.word()?;
                Ok(self.scene.find_next_scene(num).is_some())
            }
        }
    }

    /// Motion index within the animation, 1-based. Objects looked up by name
    /// that run a motion of another animation add its foreign offset.
    fn motion_index(&self, index: usize, committed: bool) -> ScriptResult<Option<i16>> {
        let object = self.scene.object(index)?;
        if object.state_prev == 0 {
            return Ok(None);
        }
        let running = self.scene.motion(object.motion_num1)?.anim;
        let anim = self.scene.animation(running)?;
        let motion = if committed {
            object.motion_num1
        } else {
            object.motion_num2
        };
        let mut value = i32::from(motion) - i32::from(anim.first_motion) + 1;
        if self.cursor.named && running != self.scene.motion(object.motion_init)?.anim {
            value += i32::from(anim.foreign_motion_offset);
        }
        Ok(Some(value as i16))
    }

    fn in_rect(&mut self) -> ScriptResult<bool> {
        let index = self.resolve()?;
        let x1 = self.cursor.word()?;
        let y1 = self.cursor.word()?;
        let x2 = self.cursor.word()?;
        let y2 = self.cursor.word()?;
        if x1 > x2 || y1 > y2 {
            return Err(ScriptError::InvalidRect { x1, y1, x2, y2 });
        }
        let Some(index) = index else {
            return Ok(false);
        };
        let object = self.scene.object(index)?;
        if object.state == 0 {
            return Ok(false);
        }
        let frame = self.scene.frame(object.frame_num_prev)?;
        let (x, y) = (i32::from(object.x_prev), i32::from(object.y_prev));
        Ok(x + i32::from(frame.w) >= i32::from(x1)
            && x <= i32::from(x2)
            && y + i32::from(frame.h) >= i32::from(y1)
            && y <= i32::from(y2))
    }

    /// An object that is found but inactive passes without being measured.
    fn span(&mut self, op: ConditionOp, axis: Axis, committed: bool) -> ScriptResult<bool> {
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(false);
        };
        let object = self.scene.object(index)?;
        let state = if committed { object.state_prev } else { object.state };
        if state == 0 {
            self.cursor.skip(op.miss_skip())?;
            return Ok(true);
        }
        self.span_contains(axis, index, committed)
    }

    /// Two transformed spans, one per object, share at least one coordinate.
    fn objects_overlap(&mut self, axis: Axis) -> ScriptResult<bool> {
        let Some(first) = self.resolve()? else {
            return Ok(false);
        };
        if self.scene.object(first)?.state_prev == 0 {
            return Ok(false);
        }
        let a1 = self.transform(axis, first)?;
        let a2 = self.transform(axis, first)?;
        let Some(second) = self.resolve()? else {
            return Ok(false);
        };
        if self.scene.object(second)?.state_prev == 0 {
            return Ok(false);
        }
        let b1 = self.transform(axis, second)?;
        let b2 = self.transform(axis, second)?;
        Ok(a1.min(a2) <= b1.max(b2) && a1.max(a2) >= b1.min(b2))
    }

    fn motion_y_modulo(&mut self, op: ConditionOp) -> ScriptResult<bool> {
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(false);
        };
        let object = self.scene.object(index)?;
        let motion = self
            .scene
            .motion(object.motion_num.wrapping_add(object.motion_init))?;
        let rest = self
            .scene
            .frame(motion.first_frame.wrapping_add(object.motion_frame_num))?;
        let committed = self.scene.frame(object.frame_num_prev)?;
        let delta = i32::from(object.y_prev) - i32::from(object.y_init)
            - i32::from(committed.y_pos)
            + i32::from(rest.y_pos);
        let active = object.state == 1;

        let div = self.cursor.word()?;
        if div == 0 {
            return Err(ScriptError::DivisionByZero("motion modulo"));
        }
        let mut phase = (delta % i32::from(div)) as i16;
        if phase < 0 {
            phase = phase.wrapping_add(div);
        }
        let expected = self.cursor.word()?;
        Ok(phase == expected && active)
    }

    /// Box query built from the object's transformed rectangle. The live
    /// category is searched before its staged twin.
    fn in_box(&mut self, op: ConditionOp) -> ScriptResult<bool> {
        let category = self.cursor.word()?;
        let Some(index) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(false);
        };
        if self.scene.object(index)?.state_prev == 0 {
            return Ok(false);
        }
        let x1 = self.transform(Axis::X, index)?;
        let x2 = self.transform(Axis::X, index)?;
        let y1 = self.transform(Axis::Y, index)?;
        let y2 = self.transform(Axis::Y, index)?;
        let hit = self.world.boxes.any_in_pair(category, |b| {
            b.in_rect(x1, x2, y1, y2) && b.state == BOX_ENABLED
        })?;
        Ok(if op == ConditionOp::InBox { hit } else { !hit })
    }

    /// True when the segment between two transformed points crosses no
    /// enabled box of the category.
    fn not_crossing_box(&mut self, op: ConditionOp) -> ScriptResult<bool> {
        let category = self.cursor.word()?;
        let Some(first) = self.resolve_or_skip(op.miss_skip())? else {
            return Ok(false);
        };
        if self.scene.object(first)?.state_prev == 0 {
            return Ok(false);
        }
        let x1 = i32::from(self.transform(Axis::X, first)?);
        let y1 = i32::from(self.transform(Axis::Y, first)?);
        let Some(second) = self.resolve()? else {
            return Ok(false);
        };
        if self.scene.object(second)?.state_prev == 0 {
            return Ok(false);
        }
        let x2 = i32::from(self.transform(Axis::X, second)?);
        let y2 = i32::from(self.transform(Axis::Y, second)?);
        let hit = self
            .world
            .boxes
            .any_in_pair(category, |b| b.intersects(x1, y1, x2, y2))?;
        Ok(!hit)
    }
}

#[cfg(test)]
mod tests {
    use bermuda_formats::ScriptWriter;

    use super::super::tests::{scene_with_script, statement};
    use crate::boxes::SceneBox;
    use crate::host::RecordingHost;
    use crate::interpreter::Interpreter;
    use crate::random::RandomGenerator;
    use crate::scene::Scene;
    use crate::world::WorldState;

    /// Builds a one-statement script whose operator sets var 1 to 1, runs it
    /// on object 0 and reports whether the conditions held.
    fn holds(
        conditions: impl FnOnce(&mut ScriptWriter),
        setup: impl FnOnce(&mut Scene, &mut WorldState),
    ) -> bool {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            conditions(w);
            w.word(0).words(&[6000, 1, 0, 1]);
        });
        let mut scene = scene_with_script(writer.into_bytes(), &["hero", "rock"]);
        let mut world = WorldState::new();
        setup(&mut scene, &mut world);
        let mut rng = RandomGenerator::new(0);
        let host = RecordingHost::new();
        Interpreter::new(&mut scene, &mut world, &mut rng, &host)
            .run_object(0)
            .unwrap();
        world.vars()[1] == 1
    }

    #[test]
    fn missing_object_skips_to_next_condition() {
        // unknown object: state test fails without reading past its operand
        assert!(!holds(
            |w| {
                w.word(3010).object("ghost").word(1);
            },
            |_, _| {}
        ));
        assert!(holds(
            |w| {
                w.word(3010).object("rock").word(1);
            },
            |_, _| {}
        ));
    }

    #[test]
    fn default_token_never_resolves() {
        assert!(!holds(
            |w| {
                w.word(3010).default_object().word(1);
            },
            |_, _| {}
        ));
    }

    #[test]
    fn running_object_check() {
        assert!(holds(
            |w| {
                w.word(2500).current_object();
            },
            |_, _| {}
        ));
        assert!(!holds(
            |w| {
                w.word(2500).object("rock");
            },
            |_, _| {}
        ));
    }

    #[test]
    fn chance_with_seed_zero_and_weight_hundred_holds() {
        assert!(holds(|w| { w.words(&[100, 100]); }, |_, _| {}));
    }

    #[test]
    fn frame_test_uses_motion_relative_index() {
        assert!(holds(
            |w| {
                w.word(3400).current_object().words(&[0, 1]);
            },
            |_, _| {}
        ));
        assert!(holds(
            |w| {
                w.word(3410).current_object().words(&[-1, 1, 0, 2]);
            },
            |_, _| {}
        ));
    }

    #[test]
    fn span_condition_checks_coordinate_against_scaled_width() {
        // frame is 10 wide at x 100: span 0..5 covers 100..105
        assert!(holds(
            |w| {
                w.word(3100)
                    .current_object()
                    .words(&[0, 1, 0, 1, 2, 0, 104]);
            },
            |_, _| {}
        ));
        assert!(!holds(
            |w| {
                w.word(3105)
                    .current_object()
                    .words(&[0, 1, 0, 1, 2, 0, 106]);
            },
            |_, _| {}
        ));
    }

    #[test]
    fn span_on_inactive_object_passes_and_stays_aligned() {
        // 106 lies outside the span; the trailing state test reads the next operand
        let span = |code: i16| {
            move |w: &mut ScriptWriter| {
                w.word(code)
                    .object("rock")
                    .words(&[0, 1, 0, 1, 2, 0, 106])
                    .word(3010)
                    .current_object()
                    .word(1);
            }
        };
        for code in [3105, 3150] {
            assert!(holds(span(code), |scene, _| scene.objects[1].state = 0), "{code}");
        }
        for code in [3100, 3110] {
            assert!(holds(span(code), |scene, _| scene.objects[1].state_prev = 0), "{code}");
            assert!(!holds(span(code), |_, _| {}), "{code}");
        }
    }

    #[test]
    fn span_on_missing_object_fails() {
        for code in [3100, 3105, 3110, 3150] {
            assert!(
                !holds(
                    |w| {
                        w.word(code)
                            .object("ghost")
                            .words(&[0, 1, 0, 1, 2, 0, 104]);
                    },
                    |_, _| {}
                ),
                "{code}"
            );
        }
    }

    #[test]
    fn in_rect_rejects_reversed_rectangles() {
        let mut writer = ScriptWriter::new();
        statement(&mut writer, |w| {
            w.word(3050).current_object().words(&[10, 0, 5, 0]).word(0);
        });
        let mut scene = scene_with_script(writer.into_bytes(), &["hero"]);
        let mut world = WorldState::new();
        let mut rng = RandomGenerator::new(0);
        let host = RecordingHost::new();
        let result = Interpreter::new(&mut scene, &mut world, &mut rng, &host).run_object(0);
        assert!(result.is_err());
    }

    #[test]
    fn box_conditions_search_live_and_staged() {
        let query = |w: &mut ScriptWriter, code: i16| {
            w.word(code)
                .word(3)
                .current_object()
                .words(&[0, 1, 0, 1, 1, -1, 0, 1, 0, 1, 1, -1]);
        };
        let staged_box = |_: &mut Scene, world: &mut WorldState| {
            world
                .boxes
                .push(
                    13,
                    SceneBox {
                        x1: 105,
                        x2: 120,
                        y1: 0,
                        y2: 200,
                        state: 1,
                        ..SceneBox::default()
                    },
                )
                .unwrap();
        };
        assert!(holds(|w| query(w, 7000), staged_box));
        assert!(!holds(|w| query(w, 7500), staged_box));
        assert!(holds(|w| query(w, 7500), |_, _| {}));
    }

    #[test]
    fn crossing_box_blocks_segment_between_objects() {
        let blocker = |scene: &mut Scene, world: &mut WorldState| {
            scene.objects[1].x_prev = 200;
            world
                .boxes
                .push(
                    0,
                    SceneBox {
                        x1: 150,
                        x2: 160,
                        y1: 0,
                        y2: 100,
                        state: 1,
                        ..SceneBox::default()
                    },
                )
                .unwrap();
        };
        let segment = |w: &mut ScriptWriter| {
            w.words(&[8500, 0])
                .current_object()
                .words(&[0, 1, 0, 0, 1, 0])
                .object("rock")
                .words(&[0, 1, 0, 0, 1, 0]);
        };
        assert!(!holds(segment, blocker));
        assert!(holds(segment, |scene, _| scene.objects[1].x_prev = 200));
    }

    #[test]
    fn bag_and_dialogue_conditions() {
        assert!(holds(
            |w| {
                w.word(10000).string("rope");
            },
            |_, world| world.bag.add("ROPE", vec![0; 4]).unwrap()
        ));
        assert!(!holds(
            |w| {
                w.word(25000).words(&[0, 4]);
            },
            |_, world| world.last_dialogue_ended_id = 4
        ));
        assert!(holds(
            |w| {
                w.word(25000).words(&[0, 4]);
            },
            |_, world| world.finish_dialogue(4)
        ));
    }

    #[test]
    fn key_and_mouse_conditions() {
        assert!(holds(
            |w| {
                w.words(&[500, 39, 1100, 1]);
            },
            |_, world| {
                world.set_key(39, true);
                world.mouse_buttons = crate::world::MOUSE_RIGHT;
            }
        ));
        assert!(!holds(
            |w| {
                w.words(&[510, 39]);
            },
            |_, world| world.set_key(39, true)
        ));
    }
}
