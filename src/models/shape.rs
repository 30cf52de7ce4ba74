//! Landmark shapes and training-set normalisation.
//!
//! All operations return new values; no operand is modified to compute a
//! derived quantity.

use nalgebra::{DMatrix, DVector, Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::domain::Rect;
use crate::error::FitError;

/// An ordered set of 2D landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    points: Vec<Point2<f64>>,
}

impl Shape {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build a shape from a `[x0, y0, x1, y1, ...]` feature vector.
    pub fn from_flat(v: &DVector<f64>) -> Result<Self, FitError> {
        if v.len() % 2 != 0 {
            return Err(FitError::dimension("shape feature vector", v.len() + 1, v.len()));
        }
        let points = v
            .as_slice()
            .chunks_exact(2)
            .map(|c| Point2::new(c[0], c[1]))
            .collect();
        Ok(Self { points })
    }

    /// Flatten to `[x0, y0, x1, y1, ...]`.
    pub fn to_flat(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.points.len() * 2,
            self.points.iter().flat_map(|p| [p.x, p.y]),
        )
    }

    pub fn centroid(&self) -> Point2<f64> {
        if self.points.is_empty() {
            return Point2::origin();
        }
        let sum = self
            .points
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / self.points.len() as f64)
    }

    /// Sum of squared point-wise distances to `other`.
    pub fn procrustes_distance(&self, other: &Shape) -> Result<f64, FitError> {
        self.check_len(other, "procrustes distance")?;
        Ok(self
            .points
            .iter()
            .zip(&other.points)
            .map(|(a, b)| (a - b).norm_squared())
            .sum())
    }

    pub fn sum_square_distance_to_point(&self, p: Point2<f64>) -> f64 {
        self.points.iter().map(|&q| (q - p).norm_squared()).sum()
    }

    /// Per-landmark squared coordinate differences `((ax-bx)², (ay-by)²)`.
    pub fn squared_difference(&self, other: &Shape) -> Result<Shape, FitError> {
        self.check_len(other, "squared difference")?;
        let points = self
            .points
            .iter()
            .zip(&other.points)
            .map(|(a, b)| {
                let d = a - b;
                Point2::new(d.x * d.x, d.y * d.y)
            })
            .collect();
        Ok(Shape { points })
    }

    pub fn added(&self, other: &Shape) -> Result<Shape, FitError> {
        self.check_len(other, "shape addition")?;
        let points = self
            .points
            .iter()
            .zip(&other.points)
            .map(|(&a, b)| a + b.coords)
            .collect();
        Ok(Shape { points })
    }

    pub fn translated(&self, shift: Vector2<f64>) -> Shape {
        Shape {
            points: self.points.iter().map(|&p| p + shift).collect(),
        }
    }

    pub fn scaled(&self, factor: f64) -> Shape {
        Shape {
            points: self.points.iter().map(|&p| p * factor).collect(),
        }
    }

    /// `scaled(factor)` followed by `translated(shift)`.
    pub fn recentre_and_scale(&self, shift: Vector2<f64>, factor: f64) -> Shape {
        Shape {
            points: self.points.iter().map(|&p| p * factor + shift).collect(),
        }
    }

    pub fn bound(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::new(0.0, 0.0, 0.0, 0.0);
        }
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Landmarks as an `L x 2` matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.points.len(), 2, |i, j| {
            if j == 0 { self.points[i].x } else { self.points[i].y }
        })
    }

    fn from_matrix(m: &DMatrix<f64>) -> Shape {
        Shape {
            points: (0..m.nrows())
                .map(|i| Point2::new(m[(i, 0)], m[(i, 1)]))
                .collect(),
        }
    }

    fn check_len(&self, other: &Shape, context: &'static str) -> Result<(), FitError> {
        if self.len() != other.len() {
            return Err(FitError::dimension(context, self.len(), other.len()));
        }
        Ok(())
    }
}

/// A training set of shapes with equal landmark counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeCollection {
    shapes: Vec<Shape>,
}

impl ShapeCollection {
    pub fn new(shapes: Vec<Shape>) -> Result<Self, FitError> {
        if let Some(first) = shapes.first() {
            for s in &shapes[1..] {
                if s.len() != first.len() {
                    return Err(FitError::dimension("shape collection", first.len(), s.len()));
                }
            }
        }
        Ok(Self { shapes })
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn num_landmarks(&self) -> usize {
        self.shapes.first().map(Shape::len).unwrap_or(0)
    }

    /// Translate every shape so its centroid sits at the origin.
    pub fn centred(&self) -> ShapeCollection {
        ShapeCollection {
            shapes: self
                .shapes
                .iter()
                .map(|s| s.translated(-s.centroid().coords))
                .collect(),
        }
    }

    /// Centre every shape and rescale it to unit centroid size.
    pub fn normalise_scaling_translation(&self) -> Result<ShapeCollection, FitError> {
        let mut shapes = Vec::with_capacity(self.shapes.len());
        for s in &self.shapes {
            let c = s.centroid();
            let size = s.sum_square_distance_to_point(c).sqrt();
            if !(size.is_finite() && size > 0.0) {
                return Err(FitError::ModelConstructionFailed(
                    "cannot normalise a degenerate (zero-size) shape".to_string(),
                ));
            }
            shapes.push(s.translated(-c.coords).scaled(1.0 / size));
        }
        Ok(ShapeCollection { shapes })
    }

    /// Rotate every shape onto the first one (orthogonal Procrustes).
    ///
    /// Rotation is about the coordinate origin, so the collection should be
    /// centred first.
    pub fn normalise_rotation(&self) -> Result<ShapeCollection, FitError> {
        let Some(first) = self.shapes.first() else {
            return Ok(self.clone());
        };
        let x0 = first.to_matrix();
        let mut shapes = Vec::with_capacity(self.shapes.len());
        shapes.push(first.clone());

        for s in &self.shapes[1..] {
            let xj = s.to_matrix();
            let cross: Matrix2<f64> = (xj.transpose() * &x0).fixed_view::<2, 2>(0, 0).into_owned();
            let svd = cross.svd(true, true);
            let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
                return Err(FitError::ModelConstructionFailed(
                    "rotation SVD did not converge".to_string(),
                ));
            };
            let rotation = u * v_t;
            let rotated = xj * DMatrix::from_column_slice(2, 2, rotation.as_slice());
            shapes.push(Shape::from_matrix(&rotated));
        }
        Ok(ShapeCollection { shapes })
    }

    /// Point-wise mean shape.
    pub fn mean_shape(&self) -> Result<Shape, FitError> {
        let Some(first) = self.shapes.first() else {
            return Err(FitError::ModelConstructionFailed(
                "mean of an empty shape collection".to_string(),
            ));
        };
        let mut sum = first.clone();
        for s in &self.shapes[1..] {
            sum = sum.added(s)?;
        }
        Ok(sum.scaled(1.0 / self.shapes.len() as f64))
    }

    /// Similarity-align the collection onto its first shape.
    ///
    /// Shapes are brought to unit centroid size and rotated onto the first,
    /// then rescaled to the mean centroid size and moved to the centroid of
    /// the mean shape, so the result stays in the input's pixel units.
    pub fn aligned(&self) -> Result<ShapeCollection, FitError> {
        if self.shapes.is_empty() {
            return Ok(self.clone());
        }
        let mean_size = self
            .shapes
            .iter()
            .map(|s| s.sum_square_distance_to_point(s.centroid()).sqrt())
            .sum::<f64>()
            / self.shapes.len() as f64;
        let centre = self.mean_shape()?.centroid();

        let unit = self.normalise_scaling_translation()?.normalise_rotation()?;
        let rescaled = ShapeCollection {
            shapes: unit.shapes.iter().map(|s| s.scaled(mean_size)).collect(),
        };
        Ok(rescaled.translate_by(centre.coords))
    }

    pub fn translate_by(&self, shift: Vector2<f64>) -> ShapeCollection {
        ShapeCollection {
            shapes: self.shapes.iter().map(|s| s.translated(shift)).collect(),
        }
    }

    /// `N x 2L` data matrix, one flattened shape per row.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let cols = self.num_landmarks() * 2;
        let mut m = DMatrix::zeros(self.shapes.len(), cols);
        for (i, s) in self.shapes.iter().enumerate() {
            m.row_mut(i).copy_from(&s.to_flat().transpose());
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square() -> Shape {
        Shape::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ])
    }

    #[test]
    fn flat_round_trip_and_odd_length() {
        let s = square();
        assert_eq!(Shape::from_flat(&s.to_flat()).unwrap(), s);
        assert!(matches!(
            Shape::from_flat(&DVector::zeros(3)),
            Err(FitError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn procrustes_distance_leaves_operands_unchanged() {
        let a = square();
        let b = a.translated(Vector2::new(1.0, 0.0));
        let before = (a.clone(), b.clone());

        assert_abs_diff_eq!(a.procrustes_distance(&b).unwrap(), 4.0);
        let sq = a.squared_difference(&b).unwrap();
        assert!(sq.points().iter().all(|p| p.x == 1.0 && p.y == 0.0));
        assert_eq!((a, b), before);
    }

    #[test]
    fn procrustes_distance_rejects_length_mismatch() {
        let a = square();
        let b = Shape::new(vec![Point2::origin()]);
        assert_eq!(
            a.procrustes_distance(&b),
            Err(FitError::dimension("procrustes distance", 4, 1))
        );
    }

    #[test]
    fn centroid_bound_and_placement() {
        let s = square();
        assert_eq!(s.centroid(), Point2::new(1.0, 1.0));
        assert_eq!(s.bound(), Rect::new(0.0, 0.0, 2.0, 2.0));

        let placed = s.recentre_and_scale(Vector2::new(10.0, 5.0), 2.0);
        assert_eq!(placed.bound(), Rect::new(10.0, 5.0, 4.0, 4.0));
        assert_eq!(placed, s.scaled(2.0).translated(Vector2::new(10.0, 5.0)));
    }

    #[test]
    fn normalised_shapes_have_unit_size_at_origin() {
        let shapes = ShapeCollection::new(vec![square(), square().scaled(3.0)]).unwrap();
        let norm = shapes.normalise_scaling_translation().unwrap();
        for s in norm.shapes() {
            assert_abs_diff_eq!(s.centroid().x, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(
                s.sum_square_distance_to_point(Point2::origin()),
                1.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn rotation_alignment_undoes_a_known_rotation() {
        let base = square().translated(Vector2::new(-1.0, -1.0));
        let theta: f64 = 0.4;
        let (sin, cos) = theta.sin_cos();
        let rotated = Shape::new(
            base.points()
                .iter()
                .map(|p| Point2::new(cos * p.x - sin * p.y, sin * p.x + cos * p.y))
                .collect(),
        );

        let aligned = ShapeCollection::new(vec![base.clone(), rotated])
            .unwrap()
            .normalise_rotation()
            .unwrap();
        assert_eq!(aligned.len(), 2);
        assert!(aligned.shapes()[1].procrustes_distance(&base).unwrap() < 1e-12);
    }

    #[test]
    fn collection_rejects_mixed_lengths_and_builds_matrix() {
        assert!(ShapeCollection::new(vec![square(), Shape::new(vec![Point2::origin()])]).is_err());

        let c = ShapeCollection::new(vec![square(), square().translated(Vector2::new(1.0, 1.0))])
            .unwrap();
        let m = c.to_matrix();
        assert_eq!(m.shape(), (2, 8));
        assert_eq!(m[(1, 0)], 1.0);
        assert_eq!(
            c.translate_by(Vector2::new(0.0, 1.0)).shapes()[0].points()[0],
            Point2::new(0.0, 1.0)
        );
    }

    #[test]
    fn mean_shape_averages_points() {
        let c = ShapeCollection::new(vec![square(), square().translated(Vector2::new(2.0, 0.0))])
            .unwrap();
        let mean = c.mean_shape().unwrap();
        assert_eq!(mean, square().translated(Vector2::new(1.0, 0.0)));
    }

    #[test]
    fn aligned_collapses_similar_copies() {
        let base = square().translated(Vector2::new(-1.0, -1.0));
        let (sin, cos) = 0.3_f64.sin_cos();
        let rotated = Shape::new(
            base.points()
                .iter()
                .map(|p| Point2::new(cos * p.x - sin * p.y, sin * p.x + cos * p.y))
                .collect(),
        );
        let copy = rotated.scaled(3.0).translated(Vector2::new(10.0, 4.0));

        let c = ShapeCollection::new(vec![base.clone(), copy]).unwrap();
        let aligned = c.aligned().unwrap();
        let (a, b) = (&aligned.shapes()[0], &aligned.shapes()[1]);
        assert!(a.procrustes_distance(b).unwrap() < 1e-9);

        // mean centroid size of 2.83 and 8.49 is 5.66; centre is (5, 2)
        let size = a.sum_square_distance_to_point(a.centroid()).sqrt();
        assert_abs_diff_eq!(size, 2.0 * 8.0_f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(a.centroid().x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a.centroid().y, 2.0, epsilon = 1e-9);
    }
}
