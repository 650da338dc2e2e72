//! Process-wide tables shared by every scene: variables, boxes, the bag and
//! the flags the surrounding game loop reads after a tick.

use serde::Serialize;

use crate::bag::Bag;
use crate::boxes::BoxTable;
use crate::error::{check_index, ScriptResult};
use crate::scene::{SceneObjectStatus, NUM_OBJECT_STATUS};

pub const NUM_VARS: usize = 310;
pub const NUM_KEYS: usize = 128;

/// Variable that clears the key table at the start of every tick.
pub const VAR_DISABLE_INPUT: usize = 309;
/// Hit counter; reaching [`GAME_OVER_HITS`] ends the game.
pub const VAR_HITS: usize = 0;
pub const GAME_OVER_HITS: i16 = 10;
/// Set to 1 by the final scene to start the ending.
pub const VAR_ENDING: usize = 241;

pub const KEY_ENTER: usize = 13;
pub const KEY_SHIFT: usize = 16;
pub const KEY_SPACE: usize = 32;
pub const KEY_LEFT: usize = 37;
pub const KEY_UP: usize = 38;
pub const KEY_RIGHT: usize = 39;
pub const KEY_DOWN: usize = 40;

pub const MOUSE_LEFT: u8 = 1;
pub const MOUSE_RIGHT: u8 = 2;

/// Platform input sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub enter: bool,
    pub shift: bool,
    pub space: bool,
    pub left: bool,
    pub up: bool,
    pub right: bool,
    pub down: bool,
    pub left_click: bool,
    pub right_click: bool,
    pub toggle_life_bar: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueRequest {
    pub id: String,
    pub data_file: String,
    pub sprite1: String,
    pub sprite2: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldState {
    vars: Vec<i16>,
    default_vars: Vec<i16>,
    pub statuses: Vec<SceneObjectStatus>,
    pub boxes: BoxTable,
    pub bag: Bag,
    #[serde(skip)]
    keys: Vec<u8>,
    pub mouse_buttons: u8,
    pub life_bar_displayed: bool,
    pub last_dialogue_ended_id: i16,
    pub dialogue_ended: bool,
    pub current_sound_priority: i16,
    pub dialogue_request: Option<DialogueRequest>,
    pub scene_switch: Option<String>,
    pub game_over: bool,
    pub ending_requested: bool,
}

impl Default for WorldState {
    fn default() -> Self {
        WorldState {
            vars: vec![0; NUM_VARS],
            default_vars: vec![0; NUM_VARS],
            statuses: vec![SceneObjectStatus::default(); NUM_OBJECT_STATUS],
            boxes: BoxTable::new(),
            bag: Bag::new(),
            keys: vec![0; NUM_KEYS],
            mouse_buttons: 0,
            life_bar_displayed: false,
            last_dialogue_ended_id: 0,
            dialogue_ended: false,
            current_sound_priority: 0,
            dialogue_request: None,
            scene_switch: None,
            game_over: false,
            ending_requested: false,
        }
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vars(&self) -> &[i16] {
        &self.vars
    }

    pub fn var(&self, index: i32) -> ScriptResult<i16> {
        let slot = check_index("variable", index, NUM_VARS)?;
        Ok(self.vars[slot])
    }

    pub fn var_mut(&mut self, index: i32) -> ScriptResult<&mut i16> {
        let slot = check_index("variable", index, NUM_VARS)?;
        Ok(&mut self.vars[slot])
    }

    pub fn set_var(&mut self, index: i32, value: i16) -> ScriptResult<()> {
        *self.var_mut(index)? = value;
        Ok(())
    }

    /// Copy of the variables taken when the last scene script was loaded.
    pub fn default_vars(&self) -> &[i16] {
        &self.default_vars
    }

    pub fn snapshot_vars(&mut self) {
        self.default_vars.copy_from_slice(&self.vars);
    }

    pub fn key(&self, index: i32) -> ScriptResult<bool> {
        let slot = check_index("key", index, NUM_KEYS)?;
        Ok(self.keys[slot] != 0)
    }

    pub fn set_key(&mut self, index: usize, pressed: bool) {
        if let Some(slot) = self.keys.get_mut(index) {
            *slot = u8::from(pressed);
        }
    }

    pub fn clear_keys(&mut self) {
        self.keys.iter_mut().for_each(|key| *key = 0);
    }

    pub fn status_mut(&mut self, index: i32) -> ScriptResult<&mut SceneObjectStatus> {
        let slot = check_index("object status", index, NUM_OBJECT_STATUS)?;
        Ok(&mut self.statuses[slot])
    }

    /// Latches one tick of platform input into the key table and mouse bits.
    pub fn latch_input(&mut self, input: &PlayerInput) {
        self.set_key(KEY_ENTER, input.enter);
        self.set_key(KEY_SHIFT, input.shift);
        self.set_key(KEY_SPACE, input.space);
        self.set_key(KEY_LEFT, input.left);
        self.set_key(KEY_UP, input.up);
        self.set_key(KEY_RIGHT, input.right);
        self.set_key(KEY_DOWN, input.down);
        if input.toggle_life_bar {
            self.life_bar_displayed = !self.life_bar_displayed;
        }
        self.mouse_buttons = 0;
        if input.left_click {
            self.mouse_buttons |= MOUSE_LEFT;
        }
        if input.right_click {
            self.mouse_buttons |= MOUSE_RIGHT;
        }
    }

    /// Records the end of a dialogue so scripts can react on the next tick.
    pub fn finish_dialogue(&mut self, ended_id: i16) {
        self.last_dialogue_ended_id = ended_id;
        self.dialogue_ended = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_matches_vars_at_capture() {
        let mut world = WorldState::new();
        world.set_var(5, 42).unwrap();
        world.snapshot_vars();
        world.set_var(5, 7).unwrap();
        assert_eq!(world.default_vars()[5], 42);
        assert_eq!(world.var(5).unwrap(), 7);
    }

    #[test]
    fn variable_bounds_are_checked() {
        let mut world = WorldState::new();
        assert!(world.var(309).is_ok());
        assert!(world.var(310).is_err());
        assert!(world.set_var(-1, 0).is_err());
    }

    #[test]
    fn latch_maps_buttons_to_slots() {
        let mut world = WorldState::new();
        world.latch_input(&PlayerInput {
            enter: true,
            right: true,
            right_click: true,
            toggle_life_bar: true,
            ..PlayerInput::default()
        });
        assert!(world.key(13).unwrap());
        assert!(world.key(39).unwrap());
        assert!(!world.key(37).unwrap());
        assert_eq!(world.mouse_buttons, MOUSE_RIGHT);
        assert!(world.life_bar_displayed);

        world.latch_input(&PlayerInput::default());
        assert!(!world.key(13).unwrap());
        assert_eq!(world.mouse_buttons, 0);
        assert!(world.life_bar_displayed);
        assert!(world.key(128).is_err());
    }
}
