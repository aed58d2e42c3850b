//! Procedural peg lattice generation.
//!
//! Lays out pegs as a triangular pyramid: layer `y` (0 = top) is a
//! `(y + 1) × (y + 1)` grid, so a board with `L` layers holds
//! `Σ (y + 1)²` pegs. Generation is pure and deterministic — the same
//! inputs produce bit-identical positions and colors, which keeps peg
//! placement testable and the GPU scene reproducible across runs.

use glam::Vec3;

use crate::util::hsv::hsv_to_rgb;

/// A single peg produced by [`generate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PegPlacement {
    /// World-space center of the peg.
    pub position: Vec3,
    /// Layer color in 0–255 channels (rainbow hue by layer index).
    pub color: Vec3,
}

/// Lattice shape parameters.
#[derive(Debug, Clone, Copy)]
pub struct LatticeParams {
    /// Number of pyramid layers, top to bottom. Must be at least 1.
    pub layers: u32,
    /// Vertical extent from the top layer to the bottom layer.
    pub height: f32,
    /// Side length of the square footprint.
    pub side_length: f32,
    /// World position of the pyramid apex region (top layer center).
    pub start: Vec3,
}

/// Number of pegs a lattice with `layers` layers contains.
#[must_use]
pub fn peg_count(layers: u32) -> u32 {
    (1..=layers).map(|n| n * n).sum()
}

/// Generate peg placements for a triangular-pyramid lattice.
///
/// Layer vertical spacing is `height / (layers - 1)`; the degenerate
/// single-layer board places its one peg at `start.y - height`. Each
/// layer's grid is offset inward by `(layers - y) / 2` half-cells relative
/// to the footprint corner, producing the staggered lattice balls thread
/// through. Hue sweeps `y / layers` across 360 degrees at full
/// saturation and value.
#[must_use]
pub fn generate(params: &LatticeParams) -> Vec<PegPlacement> {
    let layers = params.layers.max(1);
    let mut pegs = Vec::with_capacity(peg_count(layers) as usize);

    let dy = if layers == 1 {
        params.height
    } else {
        params.height / (layers - 1) as f32
    };
    let ds = params.side_length / layers as f32;

    for y in 0..layers {
        // One peg at start.y - height when there is nothing to interpolate.
        let position_y = if layers == 1 {
            params.start.y - params.height
        } else {
            params.start.y - y as f32 * dy
        };

        let half_offsets = (layers - y) as f32 / 2.0;
        let corner = params.start
            + Vec3::new(
                -params.side_length / 2.0,
                position_y - params.start.y,
                -params.side_length / 2.0,
            )
            + Vec3::new(half_offsets * (ds / 2.0), 0.0, half_offsets * (ds / 2.0));

        let color = hsv_to_rgb(y as f32 / layers as f32 * 360.0, 1.0, 1.0);

        for x in 0..=y {
            let dx = x as f32 * ds;
            for z in 0..=y {
                let dz = z as f32 * ds;
                pegs.push(PegPlacement {
                    position: corner + Vec3::new(dx, 0.0, dz),
                    color,
                });
            }
        }
    }

    pegs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(layers: u32) -> LatticeParams {
        LatticeParams {
            layers,
            height: 50.0,
            side_length: 100.0,
            start: Vec3::ZERO,
        }
    }

    #[test]
    fn test_peg_count_is_sum_of_squares() {
        assert_eq!(peg_count(1), 1);
        assert_eq!(peg_count(3), 14);
        assert_eq!(peg_count(5), 55);

        for layers in [1, 3, 5, 8] {
            assert_eq!(generate(&params(layers)).len(), peg_count(layers) as usize);
        }
    }

    #[test]
    fn test_single_layer_sits_at_start_minus_height() {
        let start = Vec3::new(2.0, 10.0, -3.0);
        let pegs = generate(&LatticeParams {
            layers: 1,
            height: 50.0,
            side_length: 100.0,
            start,
        });
        assert_eq!(pegs.len(), 1);
        assert_eq!(pegs[0].position.y, start.y - 50.0);
    }

    #[test]
    fn test_layer_spacing() {
        let pegs = generate(&params(5));
        // Layer 1 begins after the single layer-0 peg.
        assert_eq!(pegs[0].position.y, 0.0);
        assert_eq!(pegs[1].position.y, -50.0 / 4.0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate(&params(6));
        let b = generate(&params(6));
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.position.to_array(), pb.position.to_array());
            assert_eq!(pa.color.to_array(), pb.color.to_array());
        }
    }

    #[test]
    fn test_layers_share_color_distinct_between_layers() {
        let pegs = generate(&params(3));
        // Layer 1 spans indices 1..5, layer 2 spans 5..14.
        assert_eq!(pegs[1].color, pegs[4].color);
        assert_ne!(pegs[0].color, pegs[1].color);
        assert_ne!(pegs[1].color, pegs[5].color);
    }
}
