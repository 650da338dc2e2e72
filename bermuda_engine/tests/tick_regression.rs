use std::rc::Rc;

use bermuda_engine::engine::{ENDING_SCENE, FINAL_VIDEO, GAME_OVER_MUSIC};
use bermuda_engine::scene::state;
use bermuda_engine::{
    Engine, HostEvent, PlayerInput, RandomGenerator, RecordingHost, SceneFixture, ScriptError,
};

/// One animation with a two-frame motion shared by every object.
fn scene(name: &str, extra: &str, statements: &str, objects: &str) -> String {
    format!(
        r#"{{
            "name": "{name}",
            "number": 5,
            {extra}
            "animations": [{{
                "name": "actors",
                "script": {{ "statements": {statements} }},
                "sounds": ["step.wav"],
                "motions": [{{ "name": "stand", "frames": [
                    {{ "w": 10, "h": 20, "next_frame": 1 }},
                    {{ "w": 10, "h": 20 }}
                ] }}],
                "objects": {objects}
            }}],
            "next_scenes": [{{ "num": 2, "name": "C1_02.SCN" }}]
        }}"#
    )
}

const HERO: &str = r#"[{ "name": "hero", "x_init": 30, "y_init": 60, "mode": 1 }]"#;

fn start(json: &str, seed: u16) -> (Engine, RecordingHost) {
    let fixture = SceneFixture::from_json(json).expect("fixture");
    let host = RecordingHost::new();
    let mut engine = Engine::new(Rc::new(host.clone()), RandomGenerator::new(seed));
    fixture.install(&mut engine).expect("install");
    (engine, host)
}

fn ticks(engine: &mut Engine, count: usize) {
    for _ in 0..count {
        engine.run_tick(&PlayerInput::default()).expect("tick");
    }
}

#[test]
fn objects_activate_on_first_tick_and_run_from_the_second() {
    let objects = r#"[
        { "name": "hero", "mode": 1 },
        { "name": "rock", "mode": 3 },
        { "name": "ghost" }
    ]"#;
    let statements = r#"[{ "conditions": [10], "operators": [6000, 1, 1, 1] }]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, objects), 0);

    let first = engine.run_tick(&PlayerInput::default()).unwrap();
    assert!(first.runs.is_empty());
    let states: Vec<_> = engine.scene().objects.iter().map(|o| o.state_prev).collect();
    assert_eq!(states, vec![state::ACTIVE, state::FROZEN, state::INACTIVE]);
    assert_eq!(engine.scene().objects[0].frame_num, 1);
    assert_eq!(engine.scene().objects[1].frame_num, 0);

    let second = engine.run_tick(&PlayerInput::default()).unwrap();
    let ran: Vec<_> = second.runs.iter().map(|run| run.object).collect();
    assert_eq!(ran, vec![0, 1]);
    let size = engine.scene().animations[0].script.len();
    assert!(second.runs.iter().all(|run| run.end_offset == size));
    assert_eq!(engine.world().vars()[1], 2);
    assert_eq!(engine.scene().objects[0].frame_num_prev, 1);
}

#[test]
fn break_ends_the_script_for_the_tick() {
    let statements = r#"[
        { "conditions": [10], "operators": [3120, 0, 1, 5, 100, 3120, 0, 1, 50] },
        { "operators": [3120, 0, 1, 500] }
    ]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, HERO), 0);
    ticks(&mut engine, 1);
    let report = engine.run_tick(&PlayerInput::default()).unwrap();

    assert_eq!(report.runs[0].statements, 1);
    assert_eq!(report.runs[0].end_offset, engine.scene().animations[0].script.len());
    assert_eq!(engine.scene().objects[0].x_prev, 35);
}

#[test]
fn failed_lookups_keep_the_cursor_aligned() {
    let statements = r#"[{ "operators": [
        4100, "ghost", 1, 1, 1, 1,
        3000, "ghost", 1,
        5100, "ghost", 7, 7,
        6000, 7, 0, 99
    ] }]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, HERO), 0);
    ticks(&mut engine, 2);
    assert_eq!(engine.world().vars()[7], 99);
}

#[test]
fn random_mode_follows_the_seeded_generator() {
    let objects = |weight: i16| {
        format!(r#"[{{ "name": "bird", "mode": 2, "mode_rnd_mul": {weight} }}]"#)
    };
    let (mut engine, _) = start(&scene("C1_01.SCN", "", "[]", &objects(2)), 1234);
    ticks(&mut engine, 1);
    assert_eq!(engine.scene().objects[0].state_prev, state::INACTIVE);

    let (mut engine, _) = start(&scene("C1_01.SCN", "", "[]", &objects(100)), 0);
    ticks(&mut engine, 1);
    assert_eq!(engine.scene().objects[0].state_prev, state::ACTIVE);
}

#[test]
fn game_over_music_starts_once() {
    let (mut engine, host) = start(&scene("C1_01.SCN", r#""vars": { "0": 10 },"#, "[]", HERO), 0);
    let report = engine.run_tick(&PlayerInput::default()).unwrap();
    assert!(report.game_over);
    ticks(&mut engine, 2);
    assert_eq!(
        host.events(),
        vec![HostEvent::MusicPlay {
            name: GAME_OVER_MUSIC.to_string()
        }]
    );
}

#[test]
fn ending_variable_clears_the_scene() {
    let (mut engine, host) = start(&scene("C1_01.SCN", r#""vars": { "241": 1 },"#, "[]", HERO), 0);
    let report = engine.run_tick(&PlayerInput::default()).unwrap();

    assert!(report.ending);
    assert_eq!(report.scene_switch.as_deref(), Some(ENDING_SCENE));
    assert!(!engine.scene().loaded);
    assert!(engine.scene().objects.is_empty());
    assert_eq!(engine.world().vars()[241], 2);
    assert_eq!(
        host.events(),
        vec![
            HostEvent::MusicStop,
            HostEvent::SoundStop,
            HostEvent::VideoPlay {
                name: FINAL_VIDEO.to_string()
            },
        ]
    );

    let next = engine.run_tick(&PlayerInput::default()).unwrap();
    assert!(!next.ending);
    assert_eq!(next.scene_switch, None);
}

#[test]
fn span_guard_on_inactive_object_lets_the_statement_run() {
    let objects = r#"[{ "name": "hero", "mode": 1 }, { "name": "rock" }]"#;
    let statements = r#"[
        { "conditions": [3105, "rock", 0, 1, 0, 1, 2, 0, 104], "operators": [6000, 1, 0, 1] },
        { "conditions": [3105, "ghost", 0, 1, 0, 1, 2, 0, 104], "operators": [6000, 2, 0, 1] }
    ]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, objects), 0);
    ticks(&mut engine, 2);
    assert_eq!(engine.scene().objects[1].state, state::INACTIVE);
    assert_eq!(engine.world().vars()[1], 1);
    assert_eq!(engine.world().vars()[2], 0);
}

#[test]
fn staged_next_scene_becomes_a_switch_request() {
    let statements = r#"[
        { "operators": [30000, 9] },
        { "conditions": [30000, 2], "operators": [30010, 2] }
    ]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, HERO), 0);
    let first = engine.run_tick(&PlayerInput::default()).unwrap();
    assert_eq!(first.scene_switch, None);
    let second = engine.run_tick(&PlayerInput::default()).unwrap();
    assert_eq!(second.scene_switch.as_deref(), Some("C1_02.SCN"));
}

#[test]
fn fly_scenes_skip_the_first_object_once() {
    let objects = r#"[{ "name": "raft", "mode": 1 }, { "name": "pilot", "mode": 1 }]"#;
    let statements = r#"[{ "operators": [6000, 1, 1, 1] }]"#;
    for (name, after_first) in [("FLY1.SCN", 1), ("C1_01.SCN", 2)] {
        let (mut engine, _) = start(&scene(name, "", statements, objects), 0);
        for object in &mut engine.scene_mut().objects {
            object.state = state::ACTIVE;
            object.state_prev = state::ACTIVE;
        }
        ticks(&mut engine, 1);
        assert_eq!(engine.world().vars()[1], after_first, "{name}");
        ticks(&mut engine, 1);
        assert_eq!(engine.world().vars()[1], after_first + 2, "{name}");
    }
}

#[test]
fn ended_dialogue_is_visible_for_one_tick() {
    let statements = r#"[{ "conditions": [25000, 0, 4], "operators": [6000, 5, 1, 1] }]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, HERO), 0);
    ticks(&mut engine, 1);
    engine.finish_dialogue(4);
    ticks(&mut engine, 2);
    assert_eq!(engine.world().vars()[5], 1);
    assert!(!engine.world().dialogue_ended);
}

#[test]
fn disable_input_variable_clears_held_keys() {
    let statements = r#"[{ "conditions": [500, 39], "operators": [6000, 6, 0, 1] }]"#;
    let input = PlayerInput {
        right: true,
        ..PlayerInput::default()
    };
    for (extra, expected) in [(r#""vars": { "309": 1 },"#, 0), ("", 1)] {
        let (mut engine, _) = start(&scene("C1_01.SCN", extra, statements, HERO), 0);
        engine.run_tick(&input).unwrap();
        engine.run_tick(&input).unwrap();
        assert_eq!(engine.world().vars()[6], expected);
    }
}

#[test]
fn bag_collects_object_bitmaps() {
    let objects = r#"[{ "name": "hero", "mode": 1 }, { "name": "rock", "mode": 1 }]"#;
    let statements = r#"[
        { "conditions": [10], "operators": [10000, "rock"] },
        { "conditions": [10000, "ROCK"], "operators": [6000, 8, 1, 1] }
    ]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, objects), 0);
    ticks(&mut engine, 2);

    let bag = &engine.world().bag;
    assert_eq!(bag.len(), 1);
    assert_eq!(bag.objects()[0].name, "rock");
    assert_eq!(bag.objects()[0].data.len(), 204);
    assert_eq!(engine.world().vars()[8], 2);
}

#[test]
fn script_errors_abort_the_tick() {
    let statements = r#"[{ "operators": [6000, 3, 4, 0] }]"#;
    let (mut engine, _) = start(&scene("C1_01.SCN", "", statements, HERO), 0);
    ticks(&mut engine, 1);
    let err = engine.run_tick(&PlayerInput::default()).unwrap_err();
    match err {
        ScriptError::InObject { object, source, .. } => {
            assert_eq!(object, 0);
            assert!(matches!(*source, ScriptError::DivisionByZero(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
