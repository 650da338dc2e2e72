use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::scene::SceneObjectFrame;

/// Services the interpreter requests from the surrounding game. Every call is
/// fire-and-forget; none of them may call back into the engine.
pub trait EngineHost {
    fn is_sound_playing(&self) -> bool {
        false
    }
    fn play_sound(&self, _filename: &str, _priority: i16) {}
    fn stop_sound(&self) {}
    fn play_music(&self, _name: &str) {}
    fn stop_music(&self) {}
    fn play_video(&self, _name: &str) {}
    /// Repaints the background under a frozen object that is being cleared.
    fn restore_background(&self, _x: i16, _y: i16, _w: i16, _h: i16) {}
    /// Decodes a frame into a bag bitmap (4 header bytes then `w * h` pixels).
    fn decode_frame_bitmap(&self, frame: &SceneObjectFrame) -> Vec<u8> {
        frame.data.clone()
    }
}

impl fmt::Debug for dyn EngineHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EngineHost")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    SoundPlay { filename: String, priority: i16 },
    SoundStop,
    MusicPlay { name: String },
    MusicStop,
    VideoPlay { name: String },
    RestoreBackground { x: i16, y: i16, w: i16, h: i16 },
}

/// Host that records every request, optionally pretending a sound is still
/// playing so priority gating can be exercised.
#[derive(Clone, Default)]
pub struct RecordingHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
    sound_playing: Rc<Cell<bool>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<HostEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn set_sound_playing(&self, playing: bool) {
        self.sound_playing.set(playing);
    }
}

impl EngineHost for RecordingHost {
    fn is_sound_playing(&self) -> bool {
        self.sound_playing.get()
    }

    fn play_sound(&self, filename: &str, priority: i16) {
        self.events.borrow_mut().push(HostEvent::SoundPlay {
            filename: filename.to_string(),
            priority,
        });
    }

    fn stop_sound(&self) {
        self.events.borrow_mut().push(HostEvent::SoundStop);
    }

    fn play_music(&self, name: &str) {
        self.events.borrow_mut().push(HostEvent::MusicPlay {
            name: name.to_string(),
        });
    }

    fn stop_music(&self) {
        self.events.borrow_mut().push(HostEvent::MusicStop);
    }

    fn play_video(&self, name: &str) {
        self.events.borrow_mut().push(HostEvent::VideoPlay {
            name: name.to_string(),
        });
    }

    fn restore_background(&self, x: i16, y: i16, w: i16, h: i16) {
        self.events
            .borrow_mut()
            .push(HostEvent::RestoreBackground { x, y, w, h });
    }
}
