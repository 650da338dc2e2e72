//! JSON scene descriptions.
//!
//! A fixture stands in for a parsed scene file: animations with their motions,
//! frames, objects, sounds and compiled script, plus the boxes, next-scene
//! table and initial variables. Motion and frame numbers on objects are
//! 1-based like in scene files; `next_frame` on a frame is the 0-based frame
//! within its motion.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, ensure, Context, Result};
use bermuda_formats::ScriptWriter;
use serde::Deserialize;

use crate::boxes::{SceneBox, BOX_ENABLED};
use crate::engine::Engine;
use crate::scene::{
    FrameHeader, NextScene, Scene, SceneAnimation, SceneObject, SceneObjectFrame,
    SceneObjectMotion, SoundBuffer, NUM_OBJECT_VARS,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneFixture {
    pub name: String,
    #[serde(default)]
    pub number: i16,
    #[serde(default)]
    pub vars: BTreeMap<usize, i16>,
    pub animations: Vec<AnimationFixture>,
    #[serde(default)]
    pub boxes: Vec<BoxFixture>,
    #[serde(default)]
    pub next_scenes: Vec<NextSceneFixture>,
    /// Directory that `file` scripts are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationFixture {
    pub name: String,
    #[serde(default)]
    pub foreign_motion_offset: i16,
    pub script: ScriptSource,
    #[serde(default)]
    pub sounds: Vec<String>,
    pub motions: Vec<MotionFixture>,
    #[serde(default)]
    pub objects: Vec<ObjectFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionFixture {
    pub name: String,
    pub frames: Vec<FrameFixture>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameFixture {
    pub w: i16,
    pub h: i16,
    #[serde(default)]
    pub x_pos: i16,
    #[serde(default)]
    pub y_pos: i16,
    #[serde(default)]
    pub next_frame: i16,
    /// Decoded bitmap; defaults to a blank `w * h` image with its header.
    #[serde(default)]
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectFixture {
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub x_init: i16,
    #[serde(default)]
    pub y_init: i16,
    #[serde(default)]
    pub z_init: i16,
    #[serde(default)]
    pub flip_init: i16,
    #[serde(default = "first")]
    pub motion: i16,
    #[serde(default = "first")]
    pub motion_frame: i16,
    #[serde(default)]
    pub mode: i16,
    #[serde(default)]
    pub mode_rnd_mul: i16,
    #[serde(default)]
    pub vars: Vec<i16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoxFixture {
    pub category: usize,
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
    #[serde(default = "enabled")]
    pub state: u8,
    #[serde(default)]
    pub z: i16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NextSceneFixture {
    pub num: i16,
    pub name: String,
}

/// Where an animation's compiled script comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptSource {
    /// Raw tokens, end offsets included.
    Words { words: Vec<ScriptToken> },
    /// Statements whose end offsets are filled in on assembly.
    Statements { statements: Vec<StatementFixture> },
    /// A compiled `.script` dump.
    File { file: PathBuf },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementFixture {
    #[serde(default)]
    pub conditions: Vec<ScriptToken>,
    #[serde(default)]
    pub operators: Vec<ScriptToken>,
}

/// A word, or a length-prefixed string (object names use the same encoding).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptToken {
    Word(i16),
    Text(String),
}

fn first() -> i16 {
    1
}

fn enabled() -> u8 {
    BOX_ENABLED
}

fn write_tokens(writer: &mut ScriptWriter, tokens: &[ScriptToken]) {
    for token in tokens {
        match token {
            ScriptToken::Word(word) => writer.word(*word),
            ScriptToken::Text(text) => writer.string(text),
        };
    }
}

impl ScriptSource {
    pub fn assemble(&self, base_dir: &Path) -> Result<Vec<u8>> {
        match self {
            ScriptSource::Words { words } => {
                let mut writer = ScriptWriter::new();
                write_tokens(&mut writer, words);
                Ok(writer.into_bytes())
            }
            ScriptSource::Statements { statements } => {
                let mut writer = ScriptWriter::new();
                for statement in statements {
                    let mark = writer.len();
                    writer.word(0);
                    write_tokens(&mut writer, &statement.conditions);
                    writer.word(0);
                    write_tokens(&mut writer, &statement.operators);
                    let end = u16::try_from(writer.len())
                        .context("script larger than a 16-bit offset")?;
                    writer.patch_offset(mark, end);
                }
                Ok(writer.into_bytes())
            }
            ScriptSource::File { file } => {
                let path = base_dir.join(file);
                fs::read(&path).with_context(|| format!("reading script {}", path.display()))
            }
        }
    }
}

impl SceneFixture {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scene fixture {}", path.display()))?;
        let mut fixture: SceneFixture = serde_json::from_str(&text)
            .with_context(|| format!("parsing scene fixture {}", path.display()))?;
        fixture.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(fixture)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing scene fixture")
    }

    /// Builds the scene tables. Objects start inactive.
    pub fn build_scene(&self) -> Result<Scene> {
        let mut scene = Scene::new(self.name.clone(), self.number);
        for (anim_index, anim) in self.animations.iter().enumerate() {
            let first_motion = scene.motions.len() as i16;
            for motion in &anim.motions {
                ensure!(
                    !motion.frames.is_empty(),
                    "motion '{}' of '{}' has no frames",
                    motion.name,
                    anim.name
                );
                let first_frame = scene.frames.len() as i16;
                for (i, frame) in motion.frames.iter().enumerate() {
                    if frame.next_frame < 0 || frame.next_frame as usize >= motion.frames.len() {
                        bail!(
                            "frame {} of motion '{}' links to missing frame {}",
                            i,
                            motion.name,
                            frame.next_frame
                        );
                    }
                    let blank = (frame.w.max(0) as usize) * (frame.h.max(0) as usize) + 4;
                    scene.frames.push(SceneObjectFrame {
                        hdr: FrameHeader {
                            next_frame: frame.next_frame,
                            w: frame.w,
                            h: frame.h,
                            x_pos: frame.x_pos,
                            y_pos: frame.y_pos,
                        },
                        data: frame.data.clone().unwrap_or_else(|| vec![0; blank]),
                    });
                }
                scene.motions.push(SceneObjectMotion {
                    name: motion.name.clone(),
                    first_frame,
                    count: motion.frames.len() as i16,
                    anim: anim_index as i16,
                });
            }

            let first_object = scene.objects.len() as i16;
            for object in &anim.objects {
                let built = build_object(object, anim, first_motion, &scene)?;
                scene.objects.push(built);
            }
            let first_sound = scene.sounds.len() as i16;
            scene.sounds.extend(anim.sounds.iter().map(|filename| SoundBuffer {
                filename: filename.clone(),
            }));

            let script = anim
                .script
                .assemble(&self.base_dir)
                .with_context(|| format!("assembling script of '{}'", anim.name))?;
            scene.animations.push(SceneAnimation {
                name: anim.name.clone(),
                first_motion,
                motions_count: anim.motions.len() as i16,
                first_object,
                objects_count: anim.objects.len() as i16,
                first_sound,
                sounds_count: anim.sounds.len() as i16,
                foreign_motion_offset: anim.foreign_motion_offset,
                script: Rc::from(script),
            });
        }
        scene.next_scenes = self
            .next_scenes
            .iter()
            .map(|next| NextScene {
                num: next.num,
                name: next.name.clone(),
            })
            .collect();
        scene.loaded = !scene.objects.is_empty();
        Ok(scene)
    }

    /// Seeds variables and boxes, then enters the scene.
    pub fn install(&self, engine: &mut Engine) -> Result<()> {
        let scene = self.build_scene()?;
        let world = engine.world_mut();
        for (&var, &value) in &self.vars {
            world
                .set_var(var as i32, value)
                .with_context(|| format!("setting variable {var}"))?;
        }
        for b in &self.boxes {
            world
                .boxes
                .push(
                    b.category,
                    SceneBox {
                        x1: b.x1,
                        x2: b.x2,
                        y1: b.y1,
                        y2: b.y2,
                        state: b.state,
                        z: b.z,
                        ..SceneBox::default()
                    },
                )
                .with_context(|| format!("adding box to category {}", b.category))?;
        }
        engine.enter_scene(scene);
        Ok(())
    }
}

fn build_object(
    object: &ObjectFixture,
    anim: &AnimationFixture,
    first_motion: i16,
    scene: &Scene,
) -> Result<SceneObject> {
    let motion = object.motion - 1;
    if motion < 0 || motion as usize >= anim.motions.len() {
        bail!("object '{}' uses missing motion {}", object.name, object.motion);
    }
    let frames = scene.motion(first_motion + motion)?.count;
    if object.motion_frame < 1 || object.motion_frame > frames {
        bail!(
            "object '{}' uses missing frame {} of motion {}",
            object.name,
            object.motion_frame,
            object.motion
        );
    }
    ensure!(
        object.vars.len() <= NUM_OBJECT_VARS,
        "object '{}' has more than {} variables",
        object.name,
        NUM_OBJECT_VARS
    );
    let mut vars = [0; NUM_OBJECT_VARS];
    vars[..object.vars.len()].copy_from_slice(&object.vars);
    Ok(SceneObject {
        name: object.name.clone(),
        class_name: object.class.clone(),
        x_init: object.x_init,
        y_init: object.y_init,
        z_init: object.z_init,
        flip_init: object.flip_init,
        motion_init: first_motion,
        motion_num: motion,
        motion_frame_num: object.motion_frame - 1,
        mode: object.mode,
        mode_rnd_mul: object.mode_rnd_mul,
        vars,
        ..SceneObject::default()
    })
}
