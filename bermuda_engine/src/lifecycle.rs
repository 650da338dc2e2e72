//! Object activation and end-of-tick commit.
//!
//! Scripts write the "next" fields of an object (`x`, `frame_num`,
//! `motion_num2`, ...). The commit at the end of a tick copies them into the
//! committed fields and advances active objects to their next frame.

use log::{debug, trace};

use crate::error::ScriptResult;
use crate::random::RandomGenerator;
use crate::scene::{mode, state, Scene, FLIP_HORIZONTAL, FLIP_VERTICAL};

/// Activates an inactive object according to its mode. Returns whether the
/// object became active or frozen.
pub fn reinitialize_object(
    scene: &mut Scene,
    rng: &mut RandomGenerator,
    index: usize,
) -> ScriptResult<bool> {
    let object = scene.object(index)?;
    if object.state == state::ACTIVE || object.state == state::FROZEN {
        return Ok(false);
    }
    let new_state = match object.mode {
        mode::ALWAYS => state::ACTIVE,
        mode::RANDOM => {
            if rng.chance(object.mode_rnd_mul) {
                state::ACTIVE
            } else {
                state::INACTIVE
            }
        }
        mode::PUT => state::FROZEN,
        _ => state::INACTIVE,
    };
    if new_state == state::INACTIVE {
        return Ok(false);
    }

    let motion = object.motion_num.wrapping_add(object.motion_init);
    let frame_num = scene
        .motion(motion)?
        .first_frame
        .wrapping_add(object.motion_frame_num);
    let frame = *scene.frame(frame_num)?;

    let object = scene.object_mut(index)?;
    object.x = object.x_init;
    object.y = object.y_init;
    object.z = object.z_init;
    object.z_prev = object.z_init;
    object.flip = object.flip_init;
    object.flip_prev = object.flip_init;
    object.motion_num1 = motion;
    object.motion_num2 = motion;
    object.frame_num = frame_num;
    if object.flip == FLIP_HORIZONTAL {
        object.x = object.x.wrapping_sub(frame.w - 1);
    }
    if object.flip == FLIP_VERTICAL {
        object.y = object.y.wrapping_sub(frame.h - 1);
    }
    if object.state == state::INACTIVE {
        object.x_prev = object.x;
        object.y_prev = object.y;
        object.frame_num_prev = object.frame_num;
    }
    object.state = new_state;
    object.state_prev = new_state;
    debug!(
        "object {} ('{}') activated in state {} at ({}, {})",
        index, object.name, new_state, object.x, object.y
    );
    Ok(true)
}

/// Commits every object: pending clears become inactive, the committed state
/// follows the script state, and active objects step to their next frame.
pub fn commit_objects(scene: &mut Scene) -> ScriptResult<()> {
    for object in &mut scene.objects {
        if object.state == state::CLEAR_PENDING {
            object.state = state::INACTIVE;
        }
    }
    for index in 0..scene.objects.len() {
        let current = scene.objects[index].state;
        if current != state::ACTIVE {
            scene.objects[index].state_prev = current;
            continue;
        }
        let object = &scene.objects[index];
        let prev = *scene.frame(object.frame_num)?;
        let first_frame = scene.motion(object.motion_num2)?.first_frame;
        let frame_num = prev.next_frame.wrapping_add(first_frame);
        let next = *scene.frame(frame_num)?;
        let dx = i32::from(prev.x_pos) - i32::from(next.x_pos);
        let dy = i32::from(prev.y_pos) - i32::from(next.y_pos);

        let object = &mut scene.objects[index];
        object.state_prev = object.state;
        object.motion_num1 = object.motion_num2;
        object.flip_prev = object.flip;
        object.z_prev = object.z;
        object.x_prev = object.x;
        object.y_prev = object.y;
        object.frame_num_prev = object.frame_num;
        object.frame_num = frame_num;
        let x = if object.flip == FLIP_HORIZONTAL {
            i32::from(object.x) + dx + i32::from(prev.w) - i32::from(next.w)
        } else {
            i32::from(object.x) - dx
        };
        object.x = x as i16;
        object.y = (i32::from(object.y) - dy) as i16;
        trace!(
            "object {} committed frame {} next {}",
            index,
            object.frame_num_prev,
            object.frame_num
        );
    }
    Ok(())
}
