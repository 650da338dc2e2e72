use std::collections::BTreeMap;
use std::fs;
use std::rc::Rc;

use anyhow::{Context, Result};
use bermuda_engine::bag::BagObject;
use bermuda_engine::scene::SceneObject;
use bermuda_engine::{cli, Engine, HostEvent, RandomGenerator, RecordingHost, SceneFixture, TickReport};
use serde::Serialize;

#[derive(Serialize)]
struct TraceManifest<'a> {
    scene: &'a str,
    seed: Option<u16>,
    ticks: &'a [TickReport],
    objects: &'a [SceneObject],
    /// Non-zero global variables.
    vars: BTreeMap<usize, i16>,
    bag: &'a [BagObjectName<'a>],
    host_events: &'a [HostEvent],
}

#[derive(Serialize)]
struct BagObjectName<'a> {
    name: &'a str,
    bytes: usize,
}

impl<'a> From<&'a BagObject> for BagObjectName<'a> {
    fn from(object: &'a BagObject) -> Self {
        BagObjectName {
            name: &object.name,
            bytes: object.data.len(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;

    let fixture = SceneFixture::from_path(&args.scene)?;
    let rng = match args.seed {
        Some(seed) => RandomGenerator::new(seed),
        None => RandomGenerator::from_clock(),
    };
    let host = RecordingHost::new();
    let mut engine = Engine::new(Rc::new(host.clone()), rng);
    fixture
        .install(&mut engine)
        .with_context(|| format!("installing scene {}", args.scene.display()))?;
    engine.world_mut().life_bar_displayed = args.life_bar;

    let mut reports = Vec::new();
    for tick in 1..=args.ticks {
        let report = engine
            .run_tick(&args.input)
            .with_context(|| format!("running tick {tick} of {}", fixture.name))?;
        if args.verbose {
            describe_objects(&engine, tick);
        }
        if let Some(dialogue) = report.dialogue.as_ref() {
            println!(
                "tick {tick}: dialogue '{}' from {} requested",
                dialogue.id, dialogue.data_file
            );
        }
        let stop = report.scene_switch.is_some();
        if let Some(next) = report.scene_switch.as_ref() {
            println!("tick {tick}: switch to scene {next}");
        }
        reports.push(report);
        if stop {
            break;
        }
    }

    let world = engine.world();
    println!(
        "Scene {} (#{}) ran {} tick(s)",
        fixture.name,
        fixture.number,
        reports.len()
    );
    println!(
        "Objects -> total: {} | active: {}",
        engine.scene().objects.len(),
        engine
            .scene()
            .objects
            .iter()
            .filter(|object| object.state_prev != 0)
            .count()
    );
    println!(
        "Bag -> {} item(s) | game over: {} | ending: {}",
        world.bag.len(),
        world.game_over,
        reports.iter().any(|report| report.ending)
    );
    let events = host.events();
    println!("Host requests: {}", events.len());

    if let Some(path) = args.trace_json.as_ref() {
        let bag: Vec<BagObjectName<'_>> = world.bag.objects().iter().map(Into::into).collect();
        let manifest = TraceManifest {
            scene: &fixture.name,
            seed: args.seed,
            ticks: &reports,
            objects: &engine.scene().objects,
            vars: world
                .vars()
                .iter()
                .enumerate()
                .filter(|(_, value)| **value != 0)
                .map(|(index, value)| (index, *value))
                .collect(),
            bag: &bag,
            host_events: &events,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .context("serializing tick trace to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing trace JSON to {}", path.display()))?;
        println!("Saved trace JSON to {}", path.display());
    }

    Ok(())
}

fn describe_objects(engine: &Engine, tick: u32) {
    println!("tick {tick}:");
    for (index, object) in engine.scene().objects.iter().enumerate() {
        println!(
            "  {:>2}. {:<12} state {:>2} at ({:>4}, {:>4}) z {:>3} frame {:>3}",
            index, object.name, object.state_prev, object.x_prev, object.y_prev, object.z_prev,
            object.frame_num_prev
        );
    }
}
