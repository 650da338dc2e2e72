use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::world::{
    PlayerInput, KEY_DOWN, KEY_ENTER, KEY_LEFT, KEY_RIGHT, KEY_SHIFT, KEY_SPACE, KEY_UP,
};

#[derive(Parser, Debug)]
#[command(
    about = "Runs object scripts of a scene fixture for a number of ticks",
    version
)]
pub struct Args {
    /// Path to the JSON scene fixture
    #[arg(long)]
    pub scene: PathBuf,

    /// Number of ticks to run
    #[arg(long, default_value_t = 1)]
    pub ticks: u32,

    /// Random seed (default: wall clock)
    #[arg(long)]
    pub seed: Option<u16>,

    /// Path to write the per-tick reports and final object table as JSON
    #[arg(long)]
    pub trace_json: Option<PathBuf>,

    /// Print every object's placement after each tick
    #[arg(long)]
    pub verbose: bool,

    /// Key held down on every tick (13, 16, 32 or 37-40); repeatable
    #[arg(long, value_name = "CODE")]
    pub hold_key: Vec<usize>,

    /// Start with the life bar displayed
    #[arg(long)]
    pub life_bar: bool,
}

#[derive(Debug)]
pub struct RunArgs {
    pub scene: PathBuf,
    pub ticks: u32,
    pub seed: Option<u16>,
    pub trace_json: Option<PathBuf>,
    pub verbose: bool,
    pub input: PlayerInput,
    pub life_bar: bool,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    pub fn into_run_args(self) -> Result<RunArgs> {
        if self.ticks == 0 {
            bail!("--ticks must be at least 1");
        }
        let mut input = PlayerInput::default();
        for code in &self.hold_key {
            let key = match *code {
                KEY_ENTER => &mut input.enter,
                KEY_SHIFT => &mut input.shift,
                KEY_SPACE => &mut input.space,
                KEY_LEFT => &mut input.left,
                KEY_UP => &mut input.up,
                KEY_RIGHT => &mut input.right,
                KEY_DOWN => &mut input.down,
                other => bail!("--hold-key {other} is not a key the game latches"),
            };
            *key = true;
        }
        Ok(RunArgs {
            scene: self.scene,
            ticks: self.ticks,
            seed: self.seed,
            trace_json: self.trace_json,
            verbose: self.verbose,
            input,
            life_bar: self.life_bar,
        })
    }
}
