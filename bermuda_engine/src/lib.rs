//! Per-object script interpreter of the Bermuda Syndrome engine.
//!
//! Every tick each active scene object runs the compiled script of the
//! animation it is playing. Scripts test and mutate object placement, global
//! variables, collision boxes and the inventory bag; the [`engine::Engine`]
//! then activates, commits and reports what the game loop must do next.

pub mod bag;
pub mod boxes;
pub mod cli;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod host;
pub mod interpreter;
pub mod lifecycle;
pub mod random;
pub mod scene;
pub mod world;

pub use engine::{Engine, TickReport};
pub use error::{ScriptError, ScriptResult};
pub use fixture::SceneFixture;
pub use host::{EngineHost, HostEvent, RecordingHost};
pub use interpreter::{Interpreter, ObjectRun};
pub use random::RandomGenerator;
pub use scene::Scene;
pub use world::{PlayerInput, WorldState};
