//! Scene tables: animations, motions, frames, objects and sounds.
//!
//! Objects, motions and frames reference each other through `i16` indices
//! exactly as the compiled scripts do; every dereference goes through a
//! checked accessor so a stale index surfaces as a [`ScriptError`].

use std::rc::Rc;

use log::info;
use serde::Serialize;

use crate::error::{check_index, ScriptError, ScriptResult};

pub const NUM_OBJECT_VARS: usize = 10;
pub const NUM_OBJECT_STATUS: usize = 200;

/// Object activity phase.
pub mod state {
    pub const CLEAR_PENDING: i16 = -1;
    pub const INACTIVE: i16 = 0;
    pub const ACTIVE: i16 = 1;
    pub const FROZEN: i16 = 2;
}

/// Object activation policy.
pub mod mode {
    pub const MANUAL: i16 = 0;
    pub const ALWAYS: i16 = 1;
    pub const RANDOM: i16 = 2;
    pub const PUT: i16 = 3;
}

pub const FLIP_VERTICAL: i16 = 1;
pub const FLIP_HORIZONTAL: i16 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    /// Frame that follows this one, relative to its motion's first frame.
    pub next_frame: i16,
    pub w: i16,
    pub h: i16,
    /// Artwork origin offsets.
    pub x_pos: i16,
    pub y_pos: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneObjectFrame {
    pub hdr: FrameHeader,
    /// Encoded bitmap; decoding is left to the host.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneObjectMotion {
    pub name: String,
    pub first_frame: i16,
    pub count: i16,
    pub anim: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneAnimation {
    pub name: String,
    pub first_motion: i16,
    pub motions_count: i16,
    pub first_object: i16,
    pub objects_count: i16,
    pub first_sound: i16,
    pub sounds_count: i16,
    /// Added to motion tests on objects borrowed from another animation.
    pub foreign_motion_offset: i16,
    #[serde(skip)]
    pub script: Rc<[u8]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneObject {
    pub name: String,
    pub class_name: String,
    pub x_init: i16,
    pub y_init: i16,
    pub x: i16,
    pub y: i16,
    pub x_prev: i16,
    pub y_prev: i16,
    pub z_init: i16,
    pub z: i16,
    pub z_prev: i16,
    pub frame_num: i16,
    pub frame_num_prev: i16,
    pub flip_init: i16,
    pub flip: i16,
    pub flip_prev: i16,
    /// Starting motion, relative to `motion_init`.
    pub motion_num: i16,
    /// First motion of the owning animation.
    pub motion_init: i16,
    /// Motion the current tick started with.
    pub motion_num1: i16,
    /// Motion the current tick ends with.
    pub motion_num2: i16,
    pub motion_frame_num: i16,
    pub mode: i16,
    pub mode_rnd_mul: i16,
    pub state: i16,
    pub state_prev: i16,
    pub vars: [i16; NUM_OBJECT_VARS],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoundBuffer {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextScene {
    pub num: i16,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneObjectStatus {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub motion: i16,
    pub frame: i16,
    pub flip: i16,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: String,
    pub number: i16,
    pub animations: Vec<SceneAnimation>,
    pub motions: Vec<SceneObjectMotion>,
    pub frames: Vec<SceneObjectFrame>,
    pub objects: Vec<SceneObject>,
    pub sounds: Vec<SoundBuffer>,
    pub next_scenes: Vec<NextScene>,
    pub loaded: bool,
}

impl Scene {
    pub fn new(name: impl Into<String>, number: i16) -> Self {
        Scene {
            name: name.into(),
            number,
            ..Scene::default()
        }
    }

    pub fn animation(&self, index: i16) -> ScriptResult<&SceneAnimation> {
        let slot = check_index("animation", i32::from(index), self.animations.len())?;
        Ok(&self.animations[slot])
    }

    pub fn motion(&self, index: i16) -> ScriptResult<&SceneObjectMotion> {
        let slot = check_index("motion", i32::from(index), self.motions.len())?;
        Ok(&self.motions[slot])
    }

    pub fn frame(&self, index: i16) -> ScriptResult<&FrameHeader> {
        let slot = check_index("frame", i32::from(index), self.frames.len())?;
        Ok(&self.frames[slot].hdr)
    }

    pub fn frame_data(&self, index: i16) -> ScriptResult<&SceneObjectFrame> {
        let slot = check_index("frame", i32::from(index), self.frames.len())?;
        Ok(&self.frames[slot])
    }

    pub fn object(&self, index: usize) -> ScriptResult<&SceneObject> {
        self.objects
            .get(index)
            .ok_or(ScriptError::IndexOutOfRange {
                table: "object",
                index: index as i32,
                len: self.objects.len(),
            })
    }

    pub fn object_mut(&mut self, index: usize) -> ScriptResult<&mut SceneObject> {
        let len = self.objects.len();
        self.objects
            .get_mut(index)
            .ok_or(ScriptError::IndexOutOfRange {
                table: "object",
                index: index as i32,
                len,
            })
    }

    pub fn sound(&self, index: i32) -> ScriptResult<&SoundBuffer> {
        let slot = check_index("sound", index, self.sounds.len())?;
        Ok(&self.sounds[slot])
    }

    /// Animation owning the motion an object is currently playing.
    pub fn animation_of_motion(&self, motion: i16) -> ScriptResult<&SceneAnimation> {
        let anim = self.motion(motion)?.anim;
        self.animation(anim)
    }

    /// Exact byte match against the active objects.
    pub fn find_object(&self, name: &[u8]) -> Option<usize> {
        self.objects
            .iter()
            .position(|object| object.name.as_bytes() == name)
    }

    pub fn find_next_scene(&self, num: i16) -> Option<usize> {
        self.next_scenes.iter().position(|scene| scene.num == num)
    }

    /// Drops every table (`None`) or keeps animations up to and including
    /// `anim` together with the motions, frames, objects and sounds they own.
    pub fn clear_data(&mut self, anim: Option<usize>) -> ScriptResult<()> {
        match anim {
            None => {
                self.next_scenes.clear();
                self.sounds.clear();
                self.animations.clear();
                self.objects.clear();
                self.motions.clear();
                self.frames.clear();
                self.loaded = false;
            }
            Some(anim) => {
                let slot = check_index("animation", anim as i32, self.animations.len())?;
                let sa = &self.animations[slot];
                let motions_end = (sa.first_motion + sa.motions_count).max(0) as usize;
                let objects_end = (sa.first_object + sa.objects_count).max(0) as usize;
                let sounds_end = (sa.first_sound + sa.sounds_count).max(0) as usize;
                let frames_end = match motions_end.checked_sub(1) {
                    Some(last) => {
                        let som = self.motion(last as i16)?;
                        (som.first_frame + som.count).max(0) as usize
                    }
                    None => 0,
                };
                self.animations.truncate(slot + 1);
                self.motions.truncate(motions_end);
                self.frames.truncate(frames_end);
                self.objects.truncate(objects_end);
                self.sounds.truncate(sounds_end);
                self.next_scenes.clear();
                self.loaded = true;
            }
        }
        info!(
            "scene {} cleared to {} animations, {} objects",
            self.name,
            self.animations.len(),
            self.objects.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_animation_scene() -> Scene {
        let mut scene = Scene::new("TEST.SCN", 1);
        for (a, name) in ["first", "second"].iter().enumerate() {
            let first_motion = scene.motions.len() as i16;
            let first_object = scene.objects.len() as i16;
            for _ in 0..2 {
                let first_frame = scene.frames.len() as i16;
                scene.frames.push(SceneObjectFrame::default());
                scene.frames.push(SceneObjectFrame::default());
                scene.motions.push(SceneObjectMotion {
                    name: format!("{name}-motion"),
                    first_frame,
                    count: 2,
                    anim: a as i16,
                });
            }
            scene.objects.push(SceneObject {
                name: name.to_string(),
                motion_init: first_motion,
                ..SceneObject::default()
            });
            scene.sounds.push(SoundBuffer {
                filename: format!("{name}.wav"),
            });
            scene.animations.push(SceneAnimation {
                name: name.to_string(),
                first_motion,
                motions_count: 2,
                first_object,
                objects_count: 1,
                first_sound: a as i16,
                sounds_count: 1,
                foreign_motion_offset: 0,
                script: Rc::from(Vec::new()),
            });
        }
        scene.next_scenes.push(NextScene {
            num: 3,
            name: "NEXT.SCN".into(),
        });
        scene.loaded = true;
        scene
    }

    #[test]
    fn truncates_to_first_animation() {
        let mut scene = two_animation_scene();
        scene.clear_data(Some(0)).unwrap();
        assert_eq!(scene.animations.len(), 1);
        assert_eq!(scene.motions.len(), 2);
        assert_eq!(scene.frames.len(), 4);
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.sounds.len(), 1);
        assert!(scene.next_scenes.is_empty());
        assert!(scene.loaded);
    }

    #[test]
    fn full_clear_marks_unloaded() {
        let mut scene = two_animation_scene();
        scene.clear_data(None).unwrap();
        assert!(scene.objects.is_empty());
        assert!(scene.frames.is_empty());
        assert!(!scene.loaded);
    }

    #[test]
    fn lookups_are_checked() {
        let scene = two_animation_scene();
        assert_eq!(scene.find_object(b"second"), Some(1));
        assert_eq!(scene.find_object(b"SECOND"), None);
        assert!(scene.frame(8).is_err());
        assert!(scene.motion(-1).is_err());
        assert_eq!(scene.animation_of_motion(3).unwrap().name, "second");
        assert_eq!(scene.find_next_scene(3), Some(0));
    }
}
