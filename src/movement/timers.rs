//! Movement domain: frame-counted timers for buffering and cooldowns.

/// A cooldown timer counted in ticks.
/// By default the timer is ready; [`Cooldown::reset`] puts it on cooldown until
/// [`Cooldown::tick`] has been called `frames` times.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown(u32);

impl Cooldown {
    pub fn reset(&mut self, frames: u32) {
        self.0 = frames;
    }

    pub fn tick(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    pub fn is_ready(&self) -> bool {
        self.0 == 0
    }

    pub fn remaining(&self) -> u32 {
        self.0
    }
}

/// A boolean flag that remembers how many ticks ago it was last set.
/// Used for coyote time and jump buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitiveFlag {
    value: bool,
    since_released: u32,
}

impl Default for CapacitiveFlag {
    fn default() -> Self {
        Self {
            value: false,
            since_released: u32::MAX,
        }
    }
}

impl CapacitiveFlag {
    /// Record this tick's value.
    pub fn tick(&mut self, value: bool) {
        if value {
            self.value = true;
            self.since_released = 0;
        } else {
            // the first cleared tick after a set keeps the count at 0
            if !self.value {
                self.since_released = self.since_released.saturating_add(1);
            }
            self.value = false;
        }
    }

    pub fn is_set(&self) -> bool {
        self.value
    }

    /// Set now, or set at some point in the last `frames` ticks.
    pub fn was_set_within(&self, frames: u32) -> bool {
        self.since_released <= frames
    }

    /// Forget any past set, e.g. once a buffered jump has been consumed.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
