//! Rectangular hit regions, ten live categories plus their staged copies.

use serde::Serialize;

use crate::error::{check_index, ScriptResult};

pub const NUM_BOX_CATEGORIES: usize = 20;
pub const NUM_LIVE_CATEGORIES: usize = 10;
pub const BOXES_PER_CATEGORY: usize = 10;

pub const BOX_DISABLED: u8 = 0;
pub const BOX_ENABLED: u8 = 1;
pub const BOX_MIX: u8 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneBox {
    pub x1: i16,
    pub x2: i16,
    pub y1: i16,
    pub y2: i16,
    pub state: u8,
    pub z: i16,
    pub start_color: i16,
    pub end_color: i16,
}

impl SceneBox {
    fn contains(&self, x: i32, y: i32) -> bool {
        i32::from(self.x1) <= x
            && i32::from(self.x2) >= x
            && i32::from(self.y1) <= y
            && i32::from(self.y2) >= y
    }

    /// Overlap with the rectangle spanned by two x and two y coordinates.
    pub fn in_rect(&self, x1: i16, x2: i16, y1: i16, y2: i16) -> bool {
        self.x1 <= x1.max(x2) && self.x2 >= x1.min(x2) && self.y1 <= y1.max(y2) && self.y2 >= y1.min(y2)
    }

    /// Segment test used for line-of-movement checks. Endpoints inside the
    /// box hit; otherwise the segment is intersected with the box edges.
    pub fn intersects(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        if self.state != BOX_ENABLED {
            return false;
        }
        if self.contains(x1, y1) || self.contains(x2, y2) {
            return true;
        }
        // edge products of two 17-bit differences need 64 bits
        let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));
        let (bx1, bx2) = (i64::from(self.x1), i64::from(self.x2));
        let (by1, by2) = (i64::from(self.y1), i64::from(self.y2));
        if bx2 < x1.min(x2) || bx1 > x1.max(x2) || by2 < y1.min(y2) || by1 > y1.max(y2) {
            return false;
        }
        if x1 == x2 || y1 == y2 {
            return true;
        }
        let y_in_range = |iy: i64| by1 <= iy && by2 >= iy && y1.min(y2) <= iy && y1.max(y2) >= iy;
        let x_in_range = |ix: i64| bx1 <= ix && bx2 >= ix && x1.min(x2) <= ix && x1.max(x2) >= ix;
        for bx in [bx1, bx2] {
            if y_in_range(y1 - (y1 - y2) * (x1 - bx) / (x1 - x2)) {
                return true;
            }
        }
        for by in [by1, by2] {
            if x_in_range(x1 - (x1 - x2) * (y1 - by) / (y1 - y2)) {
                return true;
            }
        }
        false
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxTable {
    boxes: Vec<[SceneBox; BOXES_PER_CATEGORY]>,
    counts: [usize; NUM_BOX_CATEGORIES],
}

impl Default for BoxTable {
    fn default() -> Self {
        BoxTable {
            boxes: vec![[SceneBox::default(); BOXES_PER_CATEGORY]; NUM_BOX_CATEGORIES],
            counts: [0; NUM_BOX_CATEGORIES],
        }
    }
}

impl BoxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, category: usize) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }

    /// Appends a box to a category, as scene loading does.
    pub fn push(&mut self, category: usize, scene_box: SceneBox) -> ScriptResult<()> {
        let category = check_index("box category", category as i32, NUM_BOX_CATEGORIES)?;
        let slot = check_index(
            "box",
            self.counts[category] as i32,
            BOXES_PER_CATEGORY,
        )?;
        self.boxes[category][slot] = scene_box;
        self.counts[category] += 1;
        Ok(())
    }

    pub fn get(&self, category: i16, index: i16) -> ScriptResult<&SceneBox> {
        let category = check_index("box category", i32::from(category), NUM_BOX_CATEGORIES)?;
        let index = check_index("box", i32::from(index), BOXES_PER_CATEGORY)?;
        Ok(&self.boxes[category][index])
    }

    pub fn get_mut(&mut self, category: i16, index: i16) -> ScriptResult<&mut SceneBox> {
        let category = check_index("box category", i32::from(category), NUM_BOX_CATEGORIES)?;
        let index = check_index("box", i32::from(index), BOXES_PER_CATEGORY)?;
        Ok(&mut self.boxes[category][index])
    }

    /// Boxes currently counted in a category.
    pub fn category(&self, category: usize) -> &[SceneBox] {
        match self.boxes.get(category) {
            Some(boxes) => &boxes[..self.count(category)],
            None => &[],
        }
    }

    /// Mutable walk over every counted box of the live categories.
    pub fn live_mut(&mut self) -> impl Iterator<Item = &mut SceneBox> + '_ {
        let counts = self.counts;
        self.boxes
            .iter_mut()
            .take(NUM_LIVE_CATEGORIES)
            .enumerate()
            .flat_map(move |(category, boxes)| boxes.iter_mut().take(counts[category]))
    }

    /// Searches a live category and its staged twin.
    pub fn any_in_pair(&self, category: i16, mut hit: impl FnMut(&SceneBox) -> bool) -> ScriptResult<bool> {
        let live = check_index("box category", i32::from(category), NUM_LIVE_CATEGORIES)?;
        Ok(self.category(live).iter().any(&mut hit)
            || self.category(live + NUM_LIVE_CATEGORIES).iter().any(&mut hit))
    }

    pub fn clear_live(&mut self) {
        for count in self.counts.iter_mut().take(NUM_LIVE_CATEGORIES) {
            *count = 0;
        }
    }

    pub fn clear_staged(&mut self) {
        for count in self.counts.iter_mut().skip(NUM_LIVE_CATEGORIES) {
            *count = 0;
        }
    }

    /// Copies every live category over its staged twin.
    pub fn stage_live(&mut self) {
        for category in 0..NUM_LIVE_CATEGORIES {
            let staged = category + NUM_LIVE_CATEGORIES;
            self.boxes[staged] = self.boxes[category];
            self.counts[staged] = self.counts[category];
        }
    }
}
