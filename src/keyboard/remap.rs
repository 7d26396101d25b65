//! Cross-layout projection
//!
//! Snaps a point recorded on a foreign keyboard to its nearest key there,
//! then replaces it with that key's center on the target keyboard.

use super::layout::KeyLayout;
use crate::features::GesturePoint;

/// Map a foreign-layout point to the matching key center on `target`.
pub fn remap_point(foreign: &KeyLayout, target: &KeyLayout, x: f32, y: f32) -> (f32, f32) {
    let idx = foreign.nearest_key_index(x, y);
    target.centers()[idx]
}

/// Remap every point of a trace, keeping timestamps. Points missing a
/// coordinate are passed through so the encoder can reject the trace.
pub fn remap_trace(
    foreign: &KeyLayout,
    target: &KeyLayout,
    trace: &[GesturePoint],
) -> Vec<GesturePoint> {
    trace
        .iter()
        .map(|p| match (p.x, p.y) {
            (Some(x), Some(y)) => {
                let (rx, ry) = remap_point(foreign, target, x, y);
                GesturePoint {
                    x: Some(rx),
                    y: Some(ry),
                    t: p.t,
                }
            }
            _ => *p,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_lands_on_target_centers() {
        let mobile = KeyLayout::mobile();
        let qwerty = KeyLayout::qwerty();
        for c in 'A'..='Z' {
            let (mx, my) = mobile.center(c).unwrap();
            // nudge off-center, still inside the key
            let (rx, ry) = remap_point(&mobile, &qwerty, mx + 0.01, my - 0.02);
            assert_eq!((rx, ry), qwerty.center(c).unwrap());
        }
    }

    #[test]
    fn test_remap_trace_keeps_time_and_missing_points() {
        let mobile = KeyLayout::mobile();
        let qwerty = KeyLayout::qwerty();
        let trace = vec![
            GesturePoint::new(0.1, 0.15, 0),
            GesturePoint {
                x: None,
                y: Some(0.5),
                t: Some(16),
            },
            GesturePoint::new(0.9, 0.85, 32),
        ];
        let out = remap_trace(&mobile, &qwerty, &trace);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].t, Some(0));
        assert_eq!((out[0].x.unwrap(), out[0].y.unwrap()), qwerty.center('Q').unwrap());
        assert_eq!(out[1], trace[1]);
        assert_eq!(out[2].t, Some(32));
        assert_eq!((out[2].x.unwrap(), out[2].y.unwrap()), qwerty.center('M').unwrap());
    }
}
