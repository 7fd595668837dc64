use crate::entity::ElementFamily;

/// Surface band decomposition of one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceLayout {
    /// Fraction of each local axis left to the interior core, in `[0, 1]`.
    pub interior_scales: [f64; 3],
    /// Unit-cell-thick boundary layers per axis, at least 1.
    pub band_counts: [u32; 3],
}

/// Computes how deep the interaction cutoff reaches into an element.
///
/// Depths are measured in the element's local coordinates, which span
/// `[-1, 1]` along each axis, so one unit cell is `2 / scale`.
#[derive(Clone, Copy, Debug)]
pub struct GeometryEstimator {
    cutoff: f64,
    one_layer: bool,
}

impl GeometryEstimator {
    pub fn new(cutoff: f64, one_layer: bool) -> Self {
        Self { cutoff, one_layer }
    }

    /// Surface layout of an element from the nodes of its first copy.
    ///
    /// Axes must have non-zero length; the entity store rejects degenerate
    /// elements on insertion.
    pub fn surface_layout(&self, family: ElementFamily, nodes: &[[f64; 3]], scale: [u32; 3]) -> SurfaceLayout {
        let mut interior_scales = [0.0; 3];
        let mut band_counts = [1; 3];

        for (axis, &(a, b)) in family.axis_corners().iter().enumerate() {
            let unit = 2.0 / scale[axis] as f64;
            let dx = nodes[a][0] - nodes[b][0];
            let dy = nodes[a][1] - nodes[b][1];
            let dz = nodes[a][2] - nodes[b][2];
            let length = (dx * dx + dy * dy + dz * dz).sqrt();

            let depth = if self.one_layer {
                unit
            } else {
                // Round down to whole unit cells, then add one so the band always
                // covers the full cutoff.
                let raw = 2.0 * self.cutoff / length;
                let depth = unit * (raw / unit).floor() + unit;
                depth.min(1.0)
            };

            // One unit cell can exceed the whole axis when scale is 1.
            interior_scales[axis] = (1.0 - depth).max(0.0);
            band_counts[axis] = ((depth / unit) as u32).max(1);
        }

        SurfaceLayout { interior_scales, band_counts }
    }
}
