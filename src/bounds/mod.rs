/// Generic axis-aligned bounding box for N-dimensional space.
///
/// Used both for the process sub-domain and for the footprint of a single
/// entity. Boxes are closed: points on a face are contained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox<const D: usize> {
    pub min: [f64; D],
    pub max: [f64; D],
}

impl<const D: usize> BoundingBox<D> {
    pub fn new(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; D]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(*first, *first);
        for p in iter {
            for d in 0..D {
                bounds.min[d] = bounds.min[d].min(p[d]);
                bounds.max[d] = bounds.max[d].max(p[d]);
            }
        }
        Some(bounds)
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// True if every axis has a finite, positive extent.
    pub fn has_volume(&self) -> bool {
        (0..D).all(|d| {
            let e = self.extent(d);
            e.is_finite() && e > 0.0
        })
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains_box(&self, other: &Self) -> bool {
        (0..D).all(|d| other.min[d] >= self.min[d] && other.max[d] <= self.max[d])
    }

    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|d| other.min[d] <= self.max[d] && other.max[d] >= self.min[d])
    }
}
