//! # K-d Tree Implementation
//!
//! A static, balanced 2-d tree for nearest neighbour queries over a fixed set of points, as
//! described in [the wikipedia article](https://en.wikipedia.org/wiki/K-d_tree).
//!
//! The tree is built once from a slice of points by recursively splitting on the median along
//! alternating axes, and stores the index of each point in the original slice so that queries can
//! return indices rather than coordinates.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use ordered_float::NotNan;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of dimensions of the tree
pub const DIMS: usize = 2;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A balanced k-d tree over 2D points.
#[derive(Clone, Debug)]
pub struct KdTree {
    root: Option<Box<KdNode>>,

    len: usize,
}

/// A node in the tree, holding one point and splitting space along `axis` at that point.
#[derive(Clone, Debug)]
struct KdNode {
    point: Vector2<f64>,

    /// Index of the point in the slice the tree was built from
    index: usize,

    axis: usize,

    /// Points with a lower or equal coordinate along `axis`
    left: Option<Box<KdNode>>,

    /// Points with a greater or equal coordinate along `axis`
    right: Option<Box<KdNode>>,
}

/// A point waiting to be placed in the tree.
#[derive(Clone, Copy)]
struct Entry {
    coords: [NotNan<f64>; DIMS],
    index: usize,
}

/// Current best candidate during a nearest neighbour search.
#[derive(Clone, Copy)]
struct Best {
    dist_sq: f64,
    index: usize,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum KdTreeError {
    #[error("The point at index {0} ({x}, {y}) has a non-finite coordinate", x = .1[0], y = .1[1])]
    NonFinitePoint(usize, Vector2<f64>),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl KdTree {
    /// Build a new tree from the given points.
    ///
    /// Query results are indices into `points`.
    pub fn build(points: &[Vector2<f64>]) -> Result<Self, KdTreeError> {
        let mut entries = Vec::with_capacity(points.len());

        for (index, point) in points.iter().enumerate() {
            if !point.iter().all(|c| c.is_finite()) {
                return Err(KdTreeError::NonFinitePoint(index, *point));
            }

            let x = NotNan::new(point[0]).map_err(|_| KdTreeError::NonFinitePoint(index, *point))?;
            let y = NotNan::new(point[1]).map_err(|_| KdTreeError::NonFinitePoint(index, *point))?;

            entries.push(Entry {
                coords: [x, y],
                index,
            });
        }

        Ok(Self {
            root: build_node(&mut entries, 0),
            len: points.len(),
        })
    }

    /// Number of points in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the index of the point closest to `target`, or `None` if the tree is empty.
    ///
    /// If several points are equally close the one with the lowest index is returned. A target
    /// with a non-finite coordinate has no nearest point and gives `None`.
    pub fn nearest(&self, target: &Vector2<f64>) -> Option<usize> {
        let root = self.root.as_ref()?;

        if !target.iter().all(|c| c.is_finite()) {
            return None;
        }

        let mut best = Best {
            dist_sq: std::f64::INFINITY,
            index: usize::MAX,
        };

        root.nearest(target, &mut best);

        Some(best.index)
    }
}

impl KdNode {
    fn nearest(&self, target: &Vector2<f64>, best: &mut Best) {
        let dist_sq = (self.point - target).norm_squared();

        if dist_sq < best.dist_sq || (dist_sq == best.dist_sq && self.index < best.index) {
            best.dist_sq = dist_sq;
            best.index = self.index;
        }

        // Signed distance from the splitting plane
        let delta = target[self.axis] - self.point[self.axis];

        let (near, far) = if delta <= 0.0 {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref n) = near {
            n.nearest(target, best);
        }

        // The far side can only hold a closer (or equally close, lower index) point if the
        // splitting plane is within the current best radius.
        if delta * delta <= best.dist_sq {
            if let Some(ref f) = far {
                f.nearest(target, best);
            }
        }
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Recursively build the subtree holding `entries`, splitting along `depth % DIMS`.
fn build_node(entries: &mut [Entry], depth: usize) -> Option<Box<KdNode>> {
    if entries.is_empty() {
        return None;
    }

    let axis = depth % DIMS;
    let median = entries.len() / 2;

    entries.select_nth_unstable_by_key(median, |e| (e.coords[axis], e.index));

    let entry = entries[median];
    let (left, rest) = entries.split_at_mut(median);
    let right = &mut rest[1..];

    Some(Box::new(KdNode {
        point: Vector2::new(entry.coords[0].into_inner(), entry.coords[1].into_inner()),
        index: entry.index,
        axis,
        left: build_node(left, depth + 1),
        right: build_node(right, depth + 1),
    }))
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Brute force nearest neighbour, lowest index wins ties.
    fn linear_nearest(points: &[Vector2<f64>], target: &Vector2<f64>) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for (i, p) in points.iter().enumerate() {
            let d = (p - target).norm_squared();
            match best {
                Some((bd, _)) if d >= bd => (),
                _ => best = Some((d, i)),
            }
        }
        best.map(|b| b.1)
    }

    #[test]
    fn test_empty() {
        let tree = KdTree::build(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.nearest(&Vector2::new(1.0, 2.0)), None);
    }

    #[test]
    fn test_non_finite_rejected() {
        for bad in &[std::f64::NAN, std::f64::INFINITY, std::f64::NEG_INFINITY] {
            let points = vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, *bad)];
            match KdTree::build(&points) {
                Err(KdTreeError::NonFinitePoint(1, _)) => (),
                r => panic!("Expected NonFinitePoint error for {}, got {:?}", bad, r),
            }
        }
    }

    #[test]
    fn test_error_message_single_line() {
        let points = vec![Vector2::new(std::f64::INFINITY, 2.0)];
        let msg = KdTree::build(&points).unwrap_err().to_string();
        assert_eq!(msg, "The point at index 0 (inf, 2) has a non-finite coordinate");
    }

    #[test]
    fn test_non_finite_target() {
        let points = vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)];
        let tree = KdTree::build(&points).unwrap();
        assert_eq!(tree.nearest(&Vector2::new(std::f64::NAN, 0.0)), None);
        assert_eq!(tree.nearest(&Vector2::new(std::f64::INFINITY, 0.0)), None);
        assert_eq!(tree.nearest(&Vector2::new(0.0, std::f64::NEG_INFINITY)), None);
    }

    #[test]
    fn test_straight_line() {
        let points: Vec<_> = (0..10).map(|i| Vector2::new(i as f64, 0.0)).collect();
        let tree = KdTree::build(&points).unwrap();

        assert_eq!(tree.len(), 10);
        assert_eq!(tree.nearest(&Vector2::new(3.2, 1.0)), Some(3));
        assert_eq!(tree.nearest(&Vector2::new(-5.0, 0.0)), Some(0));
        assert_eq!(tree.nearest(&Vector2::new(50.0, -2.0)), Some(9));
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        // A closed loop revisits its first point
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 0.0),
        ];
        let tree = KdTree::build(&points).unwrap();

        assert_eq!(tree.nearest(&Vector2::new(-0.1, 0.0)), Some(0));

        // Equidistant from points 1 and 2
        assert_eq!(tree.nearest(&Vector2::new(1.0, 0.5)), Some(1));
    }

    #[test]
    fn test_matches_linear_search() {
        // Points on a spiral, queried on a grid
        let points: Vec<_> = (0..500)
            .map(|i| {
                let t = i as f64 * 0.05;
                Vector2::new(t * t.cos(), t * t.sin())
            })
            .collect();
        let tree = KdTree::build(&points).unwrap();

        for x in -25..25 {
            for y in -25..25 {
                let target = Vector2::new(x as f64 * 1.1, y as f64 * 0.9);
                assert_eq!(
                    tree.nearest(&target),
                    linear_nearest(&points, &target),
                    "Mismatch at {}",
                    target
                );
            }
        }
    }
}
