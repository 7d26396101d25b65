//! Letter-key layout geometry
//!
//! A `LayoutSpec` describes rows of keys in layout units (pixels for the
//! desktop keyboard, unit fractions for a phone keyboard). `KeyLayout`
//! derives every letter's center once and normalizes it into the letter-key
//! bounding box, so the rest of the pipeline only sees [0,1]² coordinates.

use super::{index_letter, letter_index, NUM_KEYS, PROXIMITY_SCALE};
use crate::error::{SwipeError, SwipeResult};
use serde::{Deserialize, Serialize};

/// Desktop key width in pixels
pub const KEY_WIDTH: f64 = 68.0;
/// Desktop key height in pixels
pub const KEY_HEIGHT: f64 = 60.0;
/// Gap between neighbouring keys in pixels
pub const KEY_SPACING: f64 = 8.0;

const TAB_WIDTH: f64 = 95.0;
const CAPS_LOCK_WIDTH: f64 = 112.0;
const SHIFT_WIDTH: f64 = 140.0;

/// One row of letter keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowSpec {
    /// Letters in left-to-right order
    pub keys: String,
    /// Left edge of the first key
    pub offset: f64,
    /// Per-row key width; falls back to `LayoutSpec::key_width`
    #[serde(default)]
    pub key_width: Option<f64>,
}

/// Explicit normalization frame. Without one, the letter-key bounding box is used.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x_min: f64,
    pub y_min: f64,
    pub width: f64,
    pub height: f64,
}

/// Row / key-size / spacing description of a keyboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub key_width: f64,
    pub key_height: f64,
    pub key_spacing: f64,
    pub rows: Vec<RowSpec>,
    #[serde(default)]
    pub frame: Option<Frame>,
}

impl LayoutSpec {
    /// Desktop on-screen QWERTY keyboard. Row offsets are the widths of the
    /// special key at the start of each row (Tab, Caps Lock, Shift) plus one gap.
    pub fn qwerty() -> Self {
        let row = |keys: &str, lead: f64| RowSpec {
            keys: keys.to_string(),
            offset: lead + KEY_SPACING,
            key_width: None,
        };
        LayoutSpec {
            key_width: KEY_WIDTH,
            key_height: KEY_HEIGHT,
            key_spacing: KEY_SPACING,
            rows: vec![
                row("QWERTYUIOP", TAB_WIDTH),
                row("ASDFGHJKL", CAPS_LOCK_WIDTH),
                row("ZXCVBNM", SHIFT_WIDTH),
            ],
            frame: None,
        }
    }

    /// Typical phone QWERTY keyboard in screen-normalized coordinates:
    /// every row spans the width minus a 5% margin on each side.
    pub fn mobile() -> Self {
        const MARGIN: f64 = 0.05;
        let span = 1.0 - 2.0 * MARGIN;
        let row = |keys: &str| RowSpec {
            keys: keys.to_string(),
            offset: MARGIN,
            key_width: Some(span / keys.len() as f64),
        };
        LayoutSpec {
            key_width: span / 10.0,
            key_height: 1.0 / 3.0,
            key_spacing: 0.0,
            rows: vec![row("QWERTYUIOP"), row("ASDFGHJKL"), row("ZXCVBNM")],
            frame: Some(Frame {
                x_min: 0.0,
                y_min: 0.0,
                width: 1.0,
                height: 1.0,
            }),
        }
    }
}

/// Immutable letter → center table derived from a `LayoutSpec`.
///
/// Built once at startup and shared by reference with the feature encoder
/// and the remap utilities.
#[derive(Clone, Debug)]
pub struct KeyLayout {
    /// Centers in layout units, indexed A-Z
    pixel_centers: [(f64, f64); NUM_KEYS],
    /// Centers normalized to the unit square, indexed A-Z
    centers: [(f32, f32); NUM_KEYS],
    /// A-Z indices in row order, left to right; nearest-key ties go to the earliest
    scan_order: [usize; NUM_KEYS],
    frame: Frame,
}

impl KeyLayout {
    /// Place every key of `spec` and normalize.
    pub fn from_spec(spec: &LayoutSpec) -> SwipeResult<Self> {
        if spec.key_width <= 0.0 || spec.key_height <= 0.0 || spec.key_spacing < 0.0 {
            return Err(SwipeError::InvalidLayout(format!(
                "key size must be positive and spacing non-negative (w={}, h={}, s={})",
                spec.key_width, spec.key_height, spec.key_spacing
            )));
        }

        let mut placed: [Option<(f64, f64, f64)>; NUM_KEYS] = [None; NUM_KEYS];
        let mut scan_order = [0usize; NUM_KEYS];
        let mut scanned = 0;

        for (row_idx, row) in spec.rows.iter().enumerate() {
            let width = row.key_width.unwrap_or(spec.key_width);
            if width <= 0.0 {
                return Err(SwipeError::InvalidLayout(format!(
                    "row {} has non-positive key width {}",
                    row_idx, width
                )));
            }
            let y_center =
                row_idx as f64 * (spec.key_height + spec.key_spacing) + spec.key_height / 2.0;

            for (i, key) in row.keys.chars().enumerate() {
                let idx = letter_index(key).ok_or_else(|| {
                    SwipeError::InvalidLayout(format!("'{}' is not a letter key", key))
                })?;
                if placed[idx].is_some() {
                    return Err(SwipeError::InvalidLayout(format!(
                        "letter '{}' appears more than once",
                        key.to_ascii_uppercase()
                    )));
                }
                let x_center = row.offset + i as f64 * (width + spec.key_spacing) + width / 2.0;
                placed[idx] = Some((x_center, y_center, width));
                scan_order[scanned] = idx;
                scanned += 1;
            }
        }

        let mut pixel_centers = [(0.0, 0.0); NUM_KEYS];
        let mut widths = [0.0; NUM_KEYS];
        for (idx, slot) in placed.iter().enumerate() {
            let (x, y, w) = slot.ok_or_else(|| {
                SwipeError::InvalidLayout(format!(
                    "letter '{}' has no key",
                    index_letter(idx).unwrap_or('?')
                ))
            })?;
            pixel_centers[idx] = (x, y);
            widths[idx] = w;
        }

        let frame = match spec.frame {
            Some(frame) if frame.width > 0.0 && frame.height > 0.0 => frame,
            Some(frame) => {
                return Err(SwipeError::InvalidLayout(format!(
                    "frame must have positive size, got {}x{}",
                    frame.width, frame.height
                )))
            }
            None => bounding_box(&pixel_centers, &widths, spec.key_height),
        };

        let mut centers = [(0.0f32, 0.0f32); NUM_KEYS];
        for (dst, &(x, y)) in centers.iter_mut().zip(pixel_centers.iter()) {
            *dst = (
                ((x - frame.x_min) / frame.width) as f32,
                ((y - frame.y_min) / frame.height) as f32,
            );
        }

        Ok(KeyLayout {
            pixel_centers,
            centers,
            scan_order,
            frame,
        })
    }

    /// Desktop QWERTY layout the model is trained against.
    pub fn qwerty() -> Self {
        Self::from_spec(&LayoutSpec::qwerty()).expect("built-in QWERTY spec covers A-Z")
    }

    /// Phone layout used as the foreign side of corpus remapping.
    pub fn mobile() -> Self {
        Self::from_spec(&LayoutSpec::mobile()).expect("built-in mobile spec covers A-Z")
    }

    /// Normalized center of a letter key (either case).
    pub fn center(&self, letter: char) -> Option<(f32, f32)> {
        letter_index(letter).map(|idx| self.centers[idx])
    }

    /// Normalized center by A-Z index; `Some` for every index below 26.
    pub fn center_of(&self, index: usize) -> Option<(f32, f32)> {
        self.centers.get(index).copied()
    }

    /// All normalized centers, indexed A-Z.
    pub fn centers(&self) -> &[(f32, f32); NUM_KEYS] {
        &self.centers
    }

    /// Center in layout units, before normalization.
    pub fn pixel_center(&self, letter: char) -> Option<(f64, f64)> {
        letter_index(letter).map(|idx| self.pixel_centers[idx])
    }

    /// Width and height of the normalization frame in layout units.
    pub fn size(&self) -> (f64, f64) {
        (self.frame.width, self.frame.height)
    }

    /// A-Z index of the key whose center is closest to (x, y).
    ///
    /// Ranked by the same f32 score `proximity` reports, so the result is
    /// always a maximum of that vector. Equal scores go to the key that comes
    /// first in row order (top row first, left to right).
    pub fn nearest_key_index(&self, x: f32, y: f32) -> usize {
        let mut best = self.scan_order[0];
        let mut best_score = f32::NEG_INFINITY;
        for &idx in &self.scan_order {
            let (cx, cy) = self.centers[idx];
            let score = proximity_score(squared_distance(x, y, cx, cy));
            if score > best_score {
                best = idx;
                best_score = score;
            }
        }
        best
    }

    /// Letter whose key center is closest to (x, y). Never fails.
    pub fn nearest_key(&self, x: f32, y: f32) -> char {
        index_letter(self.nearest_key_index(x, y)).unwrap_or('A')
    }

    /// 26-dim inverse-distance scores 1 / (1 + 10·d), indexed A-Z, each in (0, 1].
    pub fn proximity(&self, x: f32, y: f32) -> [f32; NUM_KEYS] {
        let mut prox = [0.0f32; NUM_KEYS];
        for (dst, &(cx, cy)) in prox.iter_mut().zip(self.centers.iter()) {
            *dst = proximity_score(squared_distance(x, y, cx, cy));
        }
        prox
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::qwerty()
    }
}

/// 1 / (1 + 10·d) from a squared distance, kept above zero for far points.
fn proximity_score(squared: f64) -> f32 {
    let score = 1.0 / (1.0 + PROXIMITY_SCALE * squared.sqrt());
    (score as f32).max(f32::MIN_POSITIVE)
}

fn squared_distance(x: f32, y: f32, cx: f32, cy: f32) -> f64 {
    let dx = x as f64 - cx as f64;
    let dy = y as f64 - cy as f64;
    dx * dx + dy * dy
}

fn bounding_box(centers: &[(f64, f64); NUM_KEYS], widths: &[f64; NUM_KEYS], height: f64) -> Frame {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (&(x, y), &w) in centers.iter().zip(widths.iter()) {
        x_min = x_min.min(x - w / 2.0);
        x_max = x_max.max(x + w / 2.0);
        y_min = y_min.min(y - height / 2.0);
        y_max = y_max.max(y + height / 2.0);
    }
    Frame {
        x_min,
        y_min,
        width: x_max - x_min,
        height: y_max - y_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_nearest_key_of_center_is_itself() {
        for layout in [KeyLayout::qwerty(), KeyLayout::mobile()] {
            for c in 'A'..='Z' {
                let (x, y) = layout.center(c).unwrap();
                assert_eq!(layout.nearest_key(x, y), c);
            }
        }
    }

    #[test]
    fn test_qwerty_pixel_distance_q_to_p() {
        let layout = KeyLayout::qwerty();
        let (qx, qy) = layout.pixel_center('Q').unwrap();
        let (px, py) = layout.pixel_center('P').unwrap();
        assert_eq!(px - qx, 9.0 * (KEY_WIDTH + KEY_SPACING));
        assert_eq!(px - qx, 684.0);
        assert_eq!(qy, py);
        assert_eq!(qx, 95.0 + 8.0 + 34.0);
    }

    #[test]
    fn test_qwerty_centers_normalized() {
        let layout = KeyLayout::qwerty();
        let (w, h) = layout.size();
        // P's right edge bounds the box; Q's left edge starts it
        assert_eq!(w, 821.0 + 34.0 - 103.0);
        assert_eq!(h, 3.0 * 60.0 + 2.0 * 8.0);
        for &(x, y) in layout.centers() {
            assert!((0.0..=1.0).contains(&x));
            assert!((0.0..=1.0).contains(&y));
        }
        let (qx, _) = layout.center('Q').unwrap();
        assert!((qx - 34.0 / 752.0).abs() < 1e-6);
    }

    #[test]
    fn test_mobile_layout_rows() {
        let layout = KeyLayout::mobile();
        let (qx, qy) = layout.center('q').unwrap();
        assert!((qx - 0.095).abs() < 1e-6);
        assert!((qy - 1.0 / 6.0).abs() < 1e-6);
        let (_, ay) = layout.center('A').unwrap();
        assert!((ay - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_proximity_range_and_argmax() {
        let layout = KeyLayout::qwerty();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let x: f32 = rng.gen_range(-0.5..1.5);
            let y: f32 = rng.gen_range(-0.5..1.5);
            let prox = layout.proximity(x, y);
            assert!(prox.iter().all(|&p| p > 0.0 && p <= 1.0));
            assert_eq!(first_max(&layout, &prox), layout.nearest_key_index(x, y));
        }
    }

    /// Index of the first maximal score, scanning keys in row order.
    fn first_max(layout: &KeyLayout, scores: &[f32; NUM_KEYS]) -> usize {
        layout
            .scan_order
            .iter()
            .fold(layout.scan_order[0], |best, &i| {
                if scores[i] > scores[best] {
                    i
                } else {
                    best
                }
            })
    }

    #[test]
    fn test_nearest_key_agrees_with_proximity_near_midpoints() {
        let layout = KeyLayout::qwerty();
        let mut rng = StdRng::seed_from_u64(19);
        let pairs = [('U', 'I'), ('A', 'S'), ('Q', 'A'), ('V', 'B'), ('O', 'P')];
        for &(a, b) in &pairs {
            let (ax, ay) = layout.center(a).unwrap();
            let (bx, by) = layout.center(b).unwrap();
            for _ in 0..200 {
                let f = 0.5 + rng.gen_range(-1e-6f32..1e-6);
                let (x, y) = (ax + f * (bx - ax), ay + f * (by - ay));
                let prox = layout.proximity(x, y);
                let nearest = layout.nearest_key_index(x, y);
                let max = prox.iter().copied().fold(f32::MIN, f32::max);
                assert_eq!(prox[nearest], max);
                assert_eq!(first_max(&layout, &prox), nearest);
            }
        }
    }

    /// Unit keys in a 32x4 frame, so every center and midpoint is exact in f32.
    fn dyadic_layout(rows: &[&str]) -> KeyLayout {
        let spec = LayoutSpec {
            key_width: 1.0,
            key_height: 1.0,
            key_spacing: 0.0,
            rows: rows
                .iter()
                .map(|keys| RowSpec {
                    keys: keys.to_string(),
                    offset: 0.0,
                    key_width: None,
                })
                .collect(),
            frame: Some(Frame {
                x_min: 0.0,
                y_min: 0.0,
                width: 32.0,
                height: 4.0,
            }),
        };
        KeyLayout::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_exact_ties_follow_row_order() {
        let layout = dyadic_layout(&["QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM"]);
        let (ux, uy) = layout.center('U').unwrap();
        let (ix, iy) = layout.center('I').unwrap();
        assert_eq!(uy, iy);
        let mid = (ux + ix) / 2.0;
        assert_eq!(mid - ux, ix - mid);
        // I sorts before U alphabetically; U comes first in its row
        assert_eq!(layout.nearest_key(mid, uy), 'U');

        // between rows: W (top row) over S
        let (wx, wy) = layout.center('W').unwrap();
        let (sx, sy) = layout.center('S').unwrap();
        assert_eq!(wx, sx);
        assert_eq!(layout.nearest_key(wx, (wy + sy) / 2.0), 'W');

        let reversed = dyadic_layout(&["ZYXWVUTSRQPONMLKJIHGFEDCBA"]);
        let (zx, zy) = reversed.center('Z').unwrap();
        let (yx, _) = reversed.center('Y').unwrap();
        assert_eq!(reversed.nearest_key((zx + yx) / 2.0, zy), 'Z');
    }

    #[test]
    fn test_proximity_extreme_coordinates() {
        let layout = KeyLayout::qwerty();
        for &(x, y) in &[(1e30f32, -1e30f32), (f32::MAX, f32::MAX), (-5.0, 3.0)] {
            let prox = layout.proximity(x, y);
            assert!(prox.iter().all(|&p| p > 0.0 && p <= 1.0));
            let nearest = layout.nearest_key_index(x, y);
            assert!(prox.iter().all(|&p| p <= prox[nearest]));
            assert_eq!(first_max(&layout, &prox), nearest);
        }
        let (hx, hy) = layout.center('H').unwrap();
        assert_eq!(layout.proximity(hx, hy)[7], 1.0);
        assert_eq!(layout.center_of(7), Some((hx, hy)));
        assert_eq!(layout.center_of(NUM_KEYS), None);
    }

    #[test]
    fn test_invalid_specs_rejected() {
        let mut spec = LayoutSpec::qwerty();
        spec.rows.pop();
        assert!(matches!(
            KeyLayout::from_spec(&spec),
            Err(SwipeError::InvalidLayout(_))
        ));

        let mut spec = LayoutSpec::qwerty();
        spec.rows[2].keys.push('Q');
        assert!(KeyLayout::from_spec(&spec).is_err());

        let mut spec = LayoutSpec::qwerty();
        spec.key_width = 0.0;
        assert!(KeyLayout::from_spec(&spec).is_err());
    }

    #[test]
    fn test_spec_json_roundtrip() {
        let spec = LayoutSpec::mobile();
        let json = serde_json::to_string(&spec).unwrap();
        let back: LayoutSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
