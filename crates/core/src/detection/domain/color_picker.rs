use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detection::domain::detection::Color;
use crate::shared::constants::{COLOR_CHANNEL_MAX, COLOR_CHANNEL_MIN};

/// Assigns an overlay color to each accepted detection.
pub trait ColorPicker: Send {
    fn pick(&mut self, class_id: usize) -> Color;
}

/// Draws every channel uniformly from `[100, 255]` using a single generator
/// that lives as long as the picker.
pub struct SeededColorPicker {
    rng: StdRng,
}

impl SeededColorPicker {
    /// Reproducible sequence of colors for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl ColorPicker for SeededColorPicker {
    fn pick(&mut self, _class_id: usize) -> Color {
        let range = COLOR_CHANNEL_MIN..=COLOR_CHANNEL_MAX;
        Color::new(
            self.rng.gen_range(range.clone()),
            self.rng.gen_range(range.clone()),
            self.rng.gen_range(range),
        )
    }
}

/// Stable color per class id, so the same class keeps its color across
/// frames and runs.
#[derive(Default)]
pub struct ClassColorPicker;

impl ClassColorPicker {
    pub fn new() -> Self {
        Self
    }
}

impl ColorPicker for ClassColorPicker {
    fn pick(&mut self, class_id: usize) -> Color {
        let bytes = splitmix64(class_id as u64).to_le_bytes();
        Color::new(
            channel_in_range(bytes[0]),
            channel_in_range(bytes[1]),
            channel_in_range(bytes[2]),
        )
    }
}

fn channel_in_range(byte: u8) -> u8 {
    let span = (COLOR_CHANNEL_MAX - COLOR_CHANNEL_MIN) as u16 + 1;
    COLOR_CHANNEL_MIN + (byte as u16 % span) as u8
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
