//! Borland-compatible linear congruential generator.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RandomGenerator {
    state: u32,
}

impl RandomGenerator {
    pub fn new(seed: u16) -> Self {
        RandomGenerator {
            state: u32::from(seed),
        }
    }

    /// Seeds from the wall clock, as the game does once at startup.
    pub fn from_clock() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        Self::new(secs as u16)
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advances the state and returns the next value in `0..0x8000`.
    pub fn draw(&mut self) -> u16 {
        let lo = (self.state & 0xFFFF) as u16;
        let hi = (self.state >> 16) as u16;
        let mut rnd = lo.wrapping_mul(0x15A);
        if hi != 0 {
            rnd = rnd.wrapping_add(hi.wrapping_mul(0x4E35));
        }
        let low = lo.wrapping_mul(0x4E35);
        self.state = ((u32::from(rnd) << 16) | u32::from(low)).wrapping_add(1);
        (self.state & 0x7FFF) as u16
    }

    /// One draw scaled by `weight`; true when the scaled value truncates to zero.
    pub fn chance(&mut self, weight: i16) -> bool {
        let rnd = self.draw() as i16;
        (i32::from(weight) * i32::from(rnd) / 0x8000) & 0xFFFF == 0
    }
}
