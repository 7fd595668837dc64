use crate::bounds::BoundingBox;
use crate::entity::EntityId;
use crate::error::{CacError, Result};

/// Upper bound on the total number of bins a grid may allocate.
pub const MAX_BIN_COUNT: usize = i32::MAX as usize;

/// A uniform bin lattice over a sub-domain expanded by the interaction range.
///
/// Bins are sized from the interaction range so that point particles find
/// their neighbors in a small, fixed stencil. Elements larger than a bin
/// overlap several bins instead of coarsening the grid.
#[derive(Clone, Debug)]
pub struct BinGrid {
    /// Lower corner of bin (0, 0, 0).
    pub origin: [f64; 3],
    /// Edge length of a bin along each axis.
    pub bin_size: [f64; 3],
    /// Number of bins along each axis, ghost layers included.
    pub counts: [usize; 3],
    /// Bin layers added on each side of the sub-domain.
    pub ghost_layers: [usize; 3],
    pub total: usize,
    pub sub_domain: BoundingBox<3>,
    /// Bin offsets within interaction range, nearest first.
    pub stencil: Vec<(isize, isize, isize)>,
}

impl BinGrid {
    /// Lays out bins over `sub_domain` for interactions up to `range`.
    ///
    /// The default bin size is half the range, rounded so an integral number of
    /// bins tiles the sub-domain exactly.
    pub fn new(sub_domain: &BoundingBox<3>, range: f64, bin_size: Option<f64>) -> Result<Self> {
        if !(range.is_finite() && range > 0.0) {
            return Err(CacError::InvalidConfig(format!("interaction range must be positive, got {}", range)));
        }
        let optimal = bin_size.unwrap_or(0.5 * range);
        if !(optimal.is_finite() && optimal > 0.0) {
            return Err(CacError::InvalidConfig(format!("bin size must be positive, got {}", optimal)));
        }

        let mut origin = [0.0; 3];
        let mut size = [0.0; 3];
        let mut counts = [0usize; 3];
        let mut ghost_layers = [0usize; 3];
        let mut requested: u128 = 1;

        for axis in 0..3 {
            let extent = sub_domain.extent(axis);
            if !(extent.is_finite() && extent > 0.0) || range > extent {
                return Err(CacError::DegenerateDomain { axis, extent, range });
            }

            let inner = (extent / optimal).floor().max(1.0);
            if inner > MAX_BIN_COUNT as f64 {
                return Err(CacError::TooManyBins { requested: u128::MAX });
            }
            let inner = inner as usize;
            size[axis] = extent / inner as f64;
            ghost_layers[axis] = (range / size[axis]).ceil() as usize;
            counts[axis] = inner + 2 * ghost_layers[axis];
            origin[axis] = sub_domain.min[axis] - ghost_layers[axis] as f64 * size[axis];
            requested = requested.saturating_mul(counts[axis] as u128);
        }

        if requested > MAX_BIN_COUNT as u128 {
            return Err(CacError::TooManyBins { requested });
        }

        let stencil = build_stencil(ghost_layers, size, range);

        Ok(BinGrid {
            origin,
            bin_size: size,
            counts,
            ghost_layers,
            total: requested as usize,
            sub_domain: *sub_domain,
            stencil,
        })
    }

    /// Bin coordinate of `x` along `axis`, or `None` outside the grid.
    ///
    /// A coordinate exactly on the far face belongs to the last bin.
    pub fn axis_bin(&self, axis: usize, x: f64) -> Option<usize> {
        let t = (x - self.origin[axis]) / self.bin_size[axis];
        let n = self.counts[axis];
        if !t.is_finite() || t < 0.0 || t > n as f64 {
            return None;
        }
        Some((t as usize).min(n - 1))
    }

    /// Range of bin coordinates touched by `[lo, hi]` along `axis`, clamped to the grid.
    ///
    /// `None` if the interval misses the grid or is not finite.
    pub fn axis_span(&self, axis: usize, lo: f64, hi: f64) -> Option<(usize, usize)> {
        let n = self.counts[axis];
        let t_lo = (lo - self.origin[axis]) / self.bin_size[axis];
        let t_hi = (hi - self.origin[axis]) / self.bin_size[axis];
        if !t_lo.is_finite() || !t_hi.is_finite() || t_hi < 0.0 || t_lo > n as f64 || t_lo > t_hi {
            return None;
        }
        let first = t_lo.clamp(0.0, (n - 1) as f64) as usize;
        let last = t_hi.clamp(0.0, (n - 1) as f64) as usize;
        Some((first, last))
    }

    /// Linear bin index of a point, x fastest.
    pub fn coord2bin(&self, p: &[f64; 3], id: EntityId) -> Result<usize> {
        let mut c = [0usize; 3];
        for axis in 0..3 {
            c[axis] = self
                .axis_bin(axis, p[axis])
                .ok_or(CacError::BinIndexOutOfRange { id, axis })?;
        }
        Ok(self.bin_index(c))
    }

    pub fn bin_index(&self, c: [usize; 3]) -> usize {
        c[0] + c[1] * self.counts[0] + c[2] * self.counts[0] * self.counts[1]
    }

    pub fn bin_coords(&self, index: usize) -> [usize; 3] {
        let plane = self.counts[0] * self.counts[1];
        let z = index / plane;
        let rem = index % plane;
        [rem % self.counts[0], rem / self.counts[0], z]
    }

    /// Neighbor of bin `c` at `offset`, if inside the grid.
    pub fn offset_bin(&self, c: [usize; 3], offset: (isize, isize, isize)) -> Option<usize> {
        let bx = c[0] as isize + offset.0;
        let by = c[1] as isize + offset.1;
        let bz = c[2] as isize + offset.2;
        if bx >= 0 && bx < self.counts[0] as isize &&
           by >= 0 && by < self.counts[1] as isize &&
           bz >= 0 && bz < self.counts[2] as isize {
            Some(self.bin_index([bx as usize, by as usize, bz as usize]))
        } else {
            None
        }
    }
}

fn build_stencil(reach: [usize; 3], size: [f64; 3], range: f64) -> Vec<(isize, isize, isize)> {
    let [rx, ry, rz] = reach.map(|r| r as isize);
    let range_sq = range * range;

    let mut stencil = Vec::new();
    for z in -rz..=rz {
        for y in -ry..=ry {
            for x in -rx..=rx {
                let dist_sq = get_min_dist_sq(x, y, z, size[0], size[1], size[2]);
                if dist_sq < range_sq {
                    stencil.push((x, y, z, dist_sq));
                }
            }
        }
    }
    stencil.sort_unstable_by(|a, b| a.3.partial_cmp(&b.3).unwrap_or(std::cmp::Ordering::Equal));
    stencil.into_iter().map(|(x, y, z, _)| (x, y, z)).collect()
}

/// Smallest squared distance between a point in bin (0, 0, 0) and any point in the offset bin.
fn get_min_dist_sq(dx: isize, dy: isize, dz: isize, cx: f64, cy: f64, cz: f64) -> f64 {
    let mx = if dx > 0 { (dx - 1) as f64 * cx } else if dx < 0 { (-dx - 1) as f64 * cx } else { 0.0 };
    let my = if dy > 0 { (dy - 1) as f64 * cy } else if dy < 0 { (-dy - 1) as f64 * cy } else { 0.0 };
    let mz = if dz > 0 { (dz - 1) as f64 * cz } else if dz < 0 { (-dz - 1) as f64 * cz } else { 0.0 };
    mx * mx + my * my + mz * mz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> BoundingBox<3> {
        BoundingBox::new([0.0; 3], [10.0; 3])
    }

    #[test]
    fn test_grid_layout() {
        let grid = BinGrid::new(&domain(), 2.5, None).unwrap();
        assert_eq!(grid.bin_size, [1.25; 3]);
        assert_eq!(grid.ghost_layers, [2; 3]);
        assert_eq!(grid.counts, [12; 3]);
        assert_eq!(grid.total, 1728);
        assert_eq!(grid.origin, [-2.5; 3]);
    }

    #[test]
    fn test_user_bin_size_tiles_domain() {
        let grid = BinGrid::new(&domain(), 2.5, Some(3.0)).unwrap();
        // floor(10 / 3) = 3 bins, stretched to 10 / 3 each.
        assert!((grid.bin_size[0] - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(grid.ghost_layers, [1; 3]);
        assert_eq!(grid.counts, [5; 3]);
    }

    #[test]
    fn test_degenerate_domains() {
        assert!(matches!(
            BinGrid::new(&domain(), 12.0, None),
            Err(CacError::DegenerateDomain { axis: 0, .. })
        ));
        let flat = BoundingBox::new([0.0; 3], [10.0, 10.0, 0.0]);
        assert!(matches!(
            BinGrid::new(&flat, 1.0, None),
            Err(CacError::DegenerateDomain { axis: 2, .. })
        ));
        assert!(matches!(BinGrid::new(&domain(), 0.0, None), Err(CacError::InvalidConfig(_))));
    }

    #[test]
    fn test_too_many_bins() {
        let huge = BoundingBox::new([0.0; 3], [1.0e6; 3]);
        assert!(matches!(BinGrid::new(&huge, 1.0, None), Err(CacError::TooManyBins { .. })));
    }

    #[test]
    fn test_too_many_bins_on_one_axis() {
        // A single axis already needs more bins than the grid can index.
        let needle = BoundingBox::new([0.0; 3], [1.0e10, 1.0, 1.0]);
        assert_eq!(
            BinGrid::new(&needle, 0.5, None).err(),
            Some(CacError::TooManyBins { requested: u128::MAX })
        );
    }

    #[test]
    fn test_coord2bin() {
        let grid = BinGrid::new(&domain(), 2.5, None).unwrap();
        let id = EntityId(0);
        assert_eq!(grid.coord2bin(&[-2.5, -2.5, -2.5], id).unwrap(), 0);
        assert_eq!(grid.coord2bin(&[0.0, 0.0, 0.0], id).unwrap(), grid.bin_index([2, 2, 2]));
        assert_eq!(grid.coord2bin(&[12.5, 12.5, 12.5], id).unwrap(), grid.total - 1);
        assert_eq!(
            grid.coord2bin(&[5.0, -3.0, 5.0], id),
            Err(CacError::BinIndexOutOfRange { id, axis: 1 })
        );
        assert!(grid.coord2bin(&[5.0, 5.0, f64::NAN], id).is_err());
        assert_eq!(grid.bin_coords(grid.bin_index([3, 7, 11])), [3, 7, 11]);
    }

    #[test]
    fn test_axis_span_clamps() {
        let grid = BinGrid::new(&domain(), 2.5, None).unwrap();
        assert_eq!(grid.axis_span(0, 0.5, 4.5), Some((2, 5)));
        assert_eq!(grid.axis_span(0, -50.0, 50.0), Some((0, 11)));
        assert_eq!(grid.axis_span(0, 20.0, 30.0), None);
        assert_eq!(grid.axis_span(0, f64::NAN, 1.0), None);
    }

    #[test]
    fn test_stencil_nearest_first() {
        let grid = BinGrid::new(&domain(), 2.5, None).unwrap();
        // Every adjacent bin has zero minimum distance and sorts ahead of the rest.
        let (x, y, z) = grid.stencil[0];
        assert!(x.abs() <= 1 && y.abs() <= 1 && z.abs() <= 1);
        assert!(grid.stencil[..27].contains(&(0, 0, 0)));
        assert!(grid.stencil.contains(&(2, 0, 0)));
        assert!(grid.stencil.contains(&(-2, -1, 1)));
        // Even the far corner is within range: 3 * 1.25^2 < 2.5^2.
        assert!(grid.stencil.contains(&(2, 2, 2)));
        assert_eq!(grid.stencil.len(), 125);
    }
}
