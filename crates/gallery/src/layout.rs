use std::f32::consts::TAU;

/// Where one instance sits on the helix before rotation and scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPlacement {
    /// Radians around the cylinder axis.
    pub angle: f32,
    /// Height on the axis, centred on zero.
    pub y: f32,
}

/// Total axial length covered by `count` slots; scrolling wraps at this span.
pub fn total_height(count: usize, spiral_step: f32) -> f32 {
    count as f32 * spiral_step
}

/// Places `count` slots on a helix: `images_per_turn` slots per revolution,
/// `spiral_step` apart along the axis, centred on `y = 0`.
pub fn spiral_layout(count: usize, spiral_step: f32, images_per_turn: f32) -> Vec<SlotPlacement> {
    let per_turn = images_per_turn.max(1.0);
    let half = total_height(count, spiral_step) * 0.5;
    (0..count)
        .map(|index| SlotPlacement {
            angle: index as f32 * TAU / per_turn,
            y: -half + index as f32 * spiral_step,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_slots_span_sixteen_units() {
        let layout = spiral_layout(20, 0.8, 7.0);
        assert_eq!(layout.len(), 20);
        assert!((layout[0].y + 8.0).abs() < 1e-5);
        assert!((layout[19].y - 7.2).abs() < 1e-5);
        assert!((layout[7].angle - TAU).abs() < 1e-5);
        assert!((total_height(20, 0.8) - 16.0).abs() < 1e-5);
    }

    #[test]
    fn neighbours_are_one_step_apart() {
        let layout = spiral_layout(12, 1.25, 5.0);
        for pair in layout.windows(2) {
            assert!((pair[1].y - pair[0].y - 1.25).abs() < 1e-5);
        }
    }

    #[test]
    fn angles_repeat_every_turn() {
        let per_turn = 6usize;
        let layout = spiral_layout(18, 0.5, per_turn as f32);
        for index in 0..layout.len() - per_turn {
            let delta = layout[index + per_turn].angle - layout[index].angle;
            assert!((delta - TAU).abs() < 1e-4);
            let (a, b) = (layout[index].angle, layout[index + per_turn].angle);
            assert!((a.sin() - b.sin()).abs() < 1e-4 && (a.cos() - b.cos()).abs() < 1e-4);
        }
    }

    #[test]
    fn empty_layout_is_empty() {
        assert!(spiral_layout(0, 0.8, 7.0).is_empty());
    }
}
