//! Keyboard geometry: letter-key centers, nearest-key lookup, proximity
//!
//! # Components
//! - `layout.rs`: `LayoutSpec` (rows, key sizes, spacing) and the derived `KeyLayout`
//! - `remap.rs`: projection of points from a foreign layout onto the target layout

pub mod layout;
pub mod remap;

pub use layout::{Frame, KeyLayout, LayoutSpec, RowSpec};
pub use remap::{remap_point, remap_trace};

/// Number of letter keys (A-Z).
pub const NUM_KEYS: usize = 26;

/// Proximity falloff: score = 1 / (1 + PROXIMITY_SCALE * distance).
pub const PROXIMITY_SCALE: f64 = 10.0;

/// Index of an uppercase or lowercase ASCII letter in A-Z order.
pub fn letter_index(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        Some((upper as u8 - b'A') as usize)
    } else {
        None
    }
}

/// Uppercase letter for an A-Z index.
pub fn index_letter(index: usize) -> Option<char> {
    if index < NUM_KEYS {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}
