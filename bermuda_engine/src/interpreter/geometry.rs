//! Frame-relative coordinate helpers.
//!
//! Scripts never carry absolute coordinates for object parts. They describe a
//! point as a fraction of the current frame size (`mul * extent / div + add`)
//! and the helpers here turn that into scene coordinates, honouring flips.
//! Intermediate math is done in `i32` and truncated to 16 bits where the
//! stored value is a word.

use crate::error::{ScriptError, ScriptResult};
use crate::scene::{FrameHeader, SceneObject, FLIP_HORIZONTAL, FLIP_VERTICAL};

use super::Interpreter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn extent(self, hdr: &FrameHeader) -> i16 {
        match self {
            Axis::X => hdr.w,
            Axis::Y => hdr.h,
        }
    }

    pub fn origin(self, hdr: &FrameHeader) -> i16 {
        match self {
            Axis::X => hdr.x_pos,
            Axis::Y => hdr.y_pos,
        }
    }

    /// Flip value that mirrors along this axis.
    pub fn mirror(self) -> i16 {
        match self {
            Axis::X => FLIP_HORIZONTAL,
            Axis::Y => FLIP_VERTICAL,
        }
    }

    pub fn pos(self, object: &SceneObject) -> i16 {
        match self {
            Axis::X => object.x,
            Axis::Y => object.y,
        }
    }

    pub fn pos_prev(self, object: &SceneObject) -> i16 {
        match self {
            Axis::X => object.x_prev,
            Axis::Y => object.y_prev,
        }
    }

    pub fn init(self, object: &SceneObject) -> i16 {
        match self {
            Axis::X => object.x_init,
            Axis::Y => object.y_init,
        }
    }

    pub fn pos_mut(self, object: &mut SceneObject) -> &mut i16 {
        match self {
            Axis::X => &mut object.x,
            Axis::Y => &mut object.y,
        }
    }
}

fn divide(num: i32, div: i32, what: &'static str) -> ScriptResult<i32> {
    if div == 0 {
        return Err(ScriptError::DivisionByZero(what));
    }
    Ok(num / div)
}

fn modulo(num: i32, div: i32, what: &'static str) -> ScriptResult<i32> {
    if div == 0 {
        return Err(ScriptError::DivisionByZero(what));
    }
    Ok(num % div)
}

/// Snaps `offset` onto the grid of step `step` anchored at `min`.
fn grid_align(min: i16, step: i16, offset: i16) -> ScriptResult<i16> {
    let (min, step) = (i32::from(min), i32::from(step));
    let base = divide(min - step + 1, step, "grid alignment")? * step;
    let mut aligned = (base + modulo(i32::from(offset), step, "grid alignment")?) as i16;
    if i32::from(aligned) < min {
        aligned = (i32::from(aligned) + step) as i16;
    }
    Ok(aligned)
}

/// Vertical placement used by the align operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RowAlign {
    /// Keep the frame's own vertical origin delta.
    Frame,
    /// Snap to a grid derived from two transforms.
    Grid,
    /// Use an absolute coordinate word, after one ignored word.
    Absolute,
}

impl Interpreter<'_> {
    /// Reads `mul, div, add` and scales `extent` with it.
    pub(super) fn scale(&mut self, extent: i16) -> ScriptResult<i16> {
        let mul = i32::from(self.cursor.word()?);
        let div = i32::from(self.cursor.word()?);
        let add = i32::from(self.cursor.word()?);
        Ok((divide(mul * i32::from(extent), div, "transform")? + add) as i16)
    }

    /// Point on the committed frame of `index`, mirrored when flipped.
    pub(super) fn transform(&mut self, axis: Axis, index: usize) -> ScriptResult<i16> {
        let object = self.scene.object(index)?;
        let (pos, flip, frame) = (axis.pos_prev(object), object.flip_prev, object.frame_num_prev);
        let extent = axis.extent(self.scene.frame(frame)?);
        let mut delta = self.scale(extent)?;
        if flip == axis.mirror() {
            delta = (i32::from(extent) - i32::from(delta) - 1) as i16;
        }
        Ok((i32::from(pos) + i32::from(delta)) as i16)
    }

    /// Reads two transforms and a coordinate and checks that the coordinate
    /// lies on the span they cut out of the object's frame.
    pub(super) fn span_contains(&mut self, axis: Axis, index: usize, committed: bool) -> ScriptResult<bool> {
        let object = self.scene.object(index)?;
        let (pos, flip, frame, state) = if committed {
            (axis.pos_prev(object), object.flip_prev, object.frame_num_prev, object.state_prev)
        } else {
            (axis.pos(object), object.flip, object.frame_num, object.state)
        };
        let extent = axis.extent(self.scene.frame(frame)?);
        let mut min = self.scale(extent)?;
        let mut max = self.scale(extent)?;
        let coord = i32::from(self.cursor.word()?);
        if flip == axis.mirror() {
            min = (i32::from(extent) - i32::from(min)) as i16;
            max = (i32::from(extent) - i32::from(max)) as i16;
        }
        if max < min {
            std::mem::swap(&mut min, &mut max);
        }
        let pos = i32::from(pos);
        Ok(state != 0 && pos + i32::from(min) <= coord && pos + i32::from(max) >= coord)
    }

    /// Distance of an object from its lattice of rest positions, in
    /// `0..div`.
    pub(super) fn translate_phase(
        &mut self,
        axis: Axis,
        index: usize,
        bias: i16,
        div: i16,
        shift: i16,
    ) -> ScriptResult<i16> {
        let object = self.scene.object(index)?;
        let motion = self.scene.motion(object.motion_num.wrapping_add(object.motion_init))?;
        let rest = self.scene.frame(motion.first_frame.wrapping_add(object.motion_frame_num))?;
        let current = self.scene.frame(object.frame_num)?;
        let bias = i32::from(bias);

        let offset = if object.flip == axis.mirror() {
            (i32::from(axis.origin(rest)) - i32::from(axis.origin(current))
                + i32::from(axis.extent(rest))
                - i32::from(axis.extent(current))
                + bias) as i16
        } else {
            (i32::from(axis.origin(current)) - i32::from(axis.origin(rest))) as i16
        };
        let anchor = if object.flip_init == axis.mirror() {
            (1 - i32::from(axis.extent(rest)) - bias) as i16
        } else {
            0
        };
        let delta = (i32::from(axis.pos(object))
            - i32::from(axis.init(object))
            - i32::from(anchor)
            - i32::from(offset)
            - i32::from(shift)) as i16;
        let mut phase = modulo(i32::from(delta), i32::from(div), "translate")? as i16;
        if phase < 0 {
            phase = phase.wrapping_add(div);
        }
        Ok(phase)
    }

    /// Switches the running object to another motion and frame, keeping its
    /// artwork anchored. `dx`/`dy` override the new frame's origin offsets.
    pub(super) fn change_motion_frame(
        &mut self,
        other: usize,
        named: bool,
        frame: i16,
        motion: i16,
        dx: Option<i16>,
        dy: Option<i16>,
    ) -> ScriptResult<()> {
        let current = self.cursor.current;
        let object = self.scene.object(current)?;
        if object.state_prev == 0 {
            return Ok(());
        }
        let base = if named {
            self.scene.object(other)?.motion_init
        } else {
            self.scene.animation_of_motion(object.motion_num1)?.first_motion
        };
        let motion_num2 = (i32::from(base) + i32::from(motion) - 1) as i16;
        let frame_num =
            (i32::from(self.scene.motion(motion_num2)?.first_frame) + i32::from(frame) - 1) as i16;
        let prev = *self.scene.frame(object.frame_num_prev)?;
        let next = *self.scene.frame(frame_num)?;

        let x_prev = i32::from(object.x_prev);
        let new_dx = i32::from(dx.unwrap_or(next.x_pos));
        let x = if object.flip_prev == FLIP_HORIZONTAL {
            x_prev + i32::from(prev.x_pos) - new_dx + i32::from(prev.w) - i32::from(next.w)
        } else {
            x_prev - i32::from(prev.x_pos) + new_dx
        };
        let y = i32::from(object.y_prev) - i32::from(prev.y_pos)
            + i32::from(dy.unwrap_or(next.y_pos));

        let object = self.scene.object_mut(current)?;
        object.motion_num2 = motion_num2;
        object.frame_num = frame_num;
        object.x = x as i16;
        object.y = y as i16;
        Ok(())
    }

    /// Places the running object on a motion whose frames tile a grid cut
    /// out of its committed frame. Operands are read in order: two
    /// horizontal transforms, two vertical transforms for [`RowAlign::Grid`],
    /// the motion, the frame when `with_frame`, then two words for
    /// [`RowAlign::Absolute`].
    pub(super) fn align_to_grid(
        &mut self,
        other: usize,
        named: bool,
        with_frame: bool,
        row: RowAlign,
    ) -> ScriptResult<()> {
        let current = self.cursor.current;
        let object = self.scene.object(current)?.clone();
        let committed = *self.scene.frame(object.frame_num_prev)?;

        let (x_min, x_step) = self.grid_span(committed.w)?;
        let (y_min, y_step) = match row {
            RowAlign::Grid => self.grid_span(committed.h)?,
            RowAlign::Frame | RowAlign::Absolute => (0, 0),
        };

        let base = if named {
            self.scene.object(other)?.motion_init
        } else {
            self.scene.animation_of_motion(object.motion_num1)?.first_motion
        };
        let motion_num2 = (i32::from(base) + i32::from(self.cursor.word()?) - 1) as i16;
        let first_frame = self.scene.motion(motion_num2)?.first_frame;
        let frame_num = if with_frame {
            (i32::from(first_frame) + i32::from(self.cursor.word()?) - 1) as i16
        } else {
            first_frame
        };
        let next = *self.scene.frame(frame_num)?;

        let si = (i32::from(next.x_pos) - i32::from(committed.x_pos)) as i16;
        let si = grid_align(x_min, x_step, si)?;

        let di = match row {
            RowAlign::Frame => (i32::from(next.y_pos) - i32::from(committed.y_pos)) as i16,
            RowAlign::Grid => {
                let di = (i32::from(next.y_pos) - i32::from(committed.y_pos)) as i16;
                grid_align(y_min, y_step, di)?
            }
            RowAlign::Absolute => {
                self.cursor.word()?;
                let y = self.cursor.word()?;
                (i32::from(y) - i32::from(committed.y_pos)) as i16
            }
        };

        let x = if object.flip_prev == FLIP_HORIZONTAL {
            i32::from(object.x_prev) - i32::from(si) + i32::from(committed.w) - i32::from(next.w)
        } else {
            i32::from(object.x_prev) + i32::from(si)
        };
        let object = self.scene.object_mut(current)?;
        object.motion_num2 = motion_num2;
        object.frame_num = frame_num;
        object.x = x as i16;
        object.y = (i32::from(object.y_prev) + i32::from(di)) as i16;
        Ok(())
    }

    /// Reads two transforms of `extent`, returning the lower bound and the
    /// distance between them.
    fn grid_span(&mut self, extent: i16) -> ScriptResult<(i16, i16)> {
        let mut min = self.scale(extent)?;
        let mut max = self.scale(extent)?;
        if max < min {
            std::mem::swap(&mut min, &mut max);
        }
        Ok((min, max.wrapping_sub(min)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_alignment_lands_at_or_above_minimum() {
        assert_eq!(grid_align(5, 10, 3).unwrap(), 13);
        assert_eq!(grid_align(5, 10, 7).unwrap(), 7);
        assert_eq!(grid_align(0, 4, -3).unwrap(), 1);
        assert!(grid_align(0, 0, 3).is_err());
    }

    #[test]
    fn axis_accessors_pick_matching_fields() {
        let hdr = FrameHeader {
            next_frame: 0,
            w: 3,
            h: 4,
            x_pos: 5,
            y_pos: 6,
        };
        assert_eq!(Axis::X.extent(&hdr), 3);
        assert_eq!(Axis::Y.origin(&hdr), 6);
        assert_eq!(Axis::X.mirror(), FLIP_HORIZONTAL);

        let mut object = SceneObject {
            x: 1,
            y_prev: 2,
            x_init: 9,
            ..SceneObject::default()
        };
        *Axis::Y.pos_mut(&mut object) = 8;
        assert_eq!(object.y, 8);
        assert_eq!(Axis::X.pos(&object), 1);
        assert_eq!(Axis::Y.pos_prev(&object), 2);
        assert_eq!(Axis::X.init(&object), 9);
    }
}
