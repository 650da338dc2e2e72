//! Tick driver: runs every object script, then activates, commits and
//! handles the end-of-tick requests the game loop acts on.

use std::rc::Rc;

use log::{debug, info};
use serde::Serialize;

use crate::error::ScriptResult;
use crate::host::EngineHost;
use crate::interpreter::{Interpreter, ObjectRun};
use crate::lifecycle::{commit_objects, reinitialize_object};
use crate::random::RandomGenerator;
use crate::scene::Scene;
use crate::world::{
    DialogueRequest, PlayerInput, WorldState, GAME_OVER_HITS, VAR_DISABLE_INPUT, VAR_ENDING,
    VAR_HITS,
};

pub const GAME_OVER_MUSIC: &str = "..\\midi\\gameover.mid";
pub const FINAL_VIDEO: &str = "DATA/FINAL.AVI";
pub const ENDING_SCENE: &str = "END.SCN";

/// What one tick produced, in the order the game loop consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub runs: Vec<ObjectRun>,
    /// Scene file the game loop should load next.
    pub scene_switch: Option<String>,
    pub dialogue: Option<DialogueRequest>,
    pub game_over: bool,
    pub ending: bool,
}

pub struct Engine {
    scene: Scene,
    world: WorldState,
    rng: RandomGenerator,
    host: Rc<dyn EngineHost>,
    /// Skip object 0 on the first tick of a `FLY*` scene.
    fly_workaround: bool,
    tick: u64,
}

impl Engine {
    pub fn new(host: Rc<dyn EngineHost>, rng: RandomGenerator) -> Self {
        Engine {
            scene: Scene::default(),
            world: WorldState::new(),
            rng,
            host,
            fly_workaround: false,
            tick: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn rng(&self) -> &RandomGenerator {
        &self.rng
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Installs a freshly loaded scene. Objects are expected to start inactive;
    /// the first tick activates them.
    pub fn enter_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.world.snapshot_vars();
        self.world.bag.normalize_selection();
        self.world.game_over = false;
        self.fly_workaround = self.scene.name.starts_with("FLY");
        info!(
            "entered scene '{}' (#{}) with {} objects",
            self.scene.name,
            self.scene.number,
            self.scene.objects.len()
        );
    }

    pub fn run_tick(&mut self, input: &PlayerInput) -> ScriptResult<TickReport> {
        self.tick += 1;
        debug!("tick {}", self.tick);
        self.world.latch_input(input);
        if self.world.vars()[VAR_DISABLE_INPUT] != 0 {
            self.world.clear_keys();
        }

        let mut runs = Vec::new();
        if self.scene.loaded {
            let start = usize::from(self.fly_workaround);
            self.fly_workaround = false;
            let mut interp = Interpreter::new(
                &mut self.scene,
                &mut self.world,
                &mut self.rng,
                &*self.host,
            );
            runs = interp.run_objects(start)?;
            let next_scene = interp.next_scene();

            self.world.dialogue_ended = false;
            if let Some(next) = next_scene.and_then(|i| self.scene.next_scenes.get(i)) {
                info!("switching to scene '{}'", next.name);
                self.world.scene_switch = Some(next.name.clone());
            }
            for index in 0..self.scene.objects.len() {
                reinitialize_object(&mut self.scene, &mut self.rng, index)?;
            }
            if self.world.vars()[VAR_HITS] >= GAME_OVER_HITS && !self.world.game_over {
                info!("game over");
                self.host.play_music(GAME_OVER_MUSIC);
                self.world.game_over = true;
            }
            if self.scene.loaded {
                commit_objects(&mut self.scene)?;
            }
        }

        if self.world.vars()[VAR_ENDING] == 1 {
            info!("ending sequence");
            self.host.stop_music();
            self.clear_scene_data(None)?;
            self.world.set_var(VAR_ENDING as i32, 2)?;
            self.host.play_video(FINAL_VIDEO);
            self.world.scene_switch = Some(ENDING_SCENE.to_string());
            self.world.ending_requested = true;
        }

        Ok(TickReport {
            tick: self.tick,
            runs,
            scene_switch: self.world.scene_switch.take(),
            dialogue: self.world.dialogue_request.take(),
            game_over: self.world.game_over,
            ending: std::mem::take(&mut self.world.ending_requested),
        })
    }

    /// Runs the activation rule on one object outside of a tick.
    pub fn reinitialize(&mut self, index: usize) -> ScriptResult<bool> {
        reinitialize_object(&mut self.scene, &mut self.rng, index)
    }

    /// Drops scene tables past `anim` (all of them for `None`), the live
    /// boxes, and any playing sound.
    pub fn clear_scene_data(&mut self, anim: Option<usize>) -> ScriptResult<()> {
        info!("clearing scene data after animation {anim:?}");
        self.scene.clear_data(anim)?;
        self.world.boxes.clear_live();
        self.host.stop_sound();
        Ok(())
    }

    /// Called by the dialogue front end once a conversation ends.
    pub fn finish_dialogue(&mut self, ended_id: i16) {
        self.world.finish_dialogue(ended_id);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scene", &self.scene.name)
            .field("tick", &self.tick)
            .field("host", &self.host)
            .finish()
    }
}
