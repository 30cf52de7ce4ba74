//! Triangulated landmark mesh.
//!
//! Triangulation itself is an external concern. `Mesh::new` fans out from the
//! first landmark, which is valid for contour-ordered convex outlines; any
//! other triangulation can be supplied through `Mesh::with_triangles`.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::domain::Rect;
use crate::error::FitError;
use crate::models::Shape;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    shape: Shape,
    triangles: Vec<[usize; 3]>,
}

impl Mesh {
    /// Fan triangulation `(0, i, i + 1)` over the landmark order.
    pub fn new(shape: Shape) -> Self {
        let triangles = (1..shape.len().saturating_sub(1))
            .map(|i| [0, i, i + 1])
            .collect();
        Self { shape, triangles }
    }

    pub fn with_triangles(shape: Shape, triangles: Vec<[usize; 3]>) -> Result<Self, FitError> {
        let n = shape.len();
        if let Some(bad) = triangles.iter().find(|t| t.iter().any(|&i| i >= n)) {
            return Err(FitError::ModelConstructionFailed(format!(
                "triangle {bad:?} references a vertex outside 0..{n}"
            )));
        }
        Ok(Self { shape, triangles })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn triangle_points(&self, idx: usize) -> Option<[Point2<f64>; 3]> {
        let t = self.triangles.get(idx)?;
        let p = self.shape.points();
        Some([p[t[0]], p[t[1]], p[t[2]]])
    }

    /// Unique undirected edges, in first-seen order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out: Vec<(usize, usize)> = Vec::new();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let e = (a.min(b), a.max(b));
                if !out.contains(&e) {
                    out.push(e);
                }
            }
        }
        out
    }

    pub fn bound(&self) -> Rect {
        self.shape.bound()
    }

    /// Same triangulation around `p * scale + shift`.
    pub fn placed(&self, scale: f64, shift: Vector2<f64>) -> Mesh {
        Mesh {
            shape: self.shape.recentre_and_scale(shift, scale),
            triangles: self.triangles.clone(),
        }
    }

    /// Same triangulation around a different set of landmarks.
    pub fn realigned(&self, shape: Shape) -> Result<Mesh, FitError> {
        if shape.len() != self.shape.len() {
            return Err(FitError::dimension("mesh realignment", self.shape.len(), shape.len()));
        }
        Ok(Mesh {
            shape,
            triangles: self.triangles.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pentagon() -> Shape {
        Shape::new(
            (0..5)
                .map(|i| {
                    let a = i as f64 * std::f64::consts::TAU / 5.0;
                    Point2::new(a.cos(), a.sin())
                })
                .collect(),
        )
    }

    #[test]
    fn fan_triangulation_covers_polygon() {
        let mesh = Mesh::new(pentagon());
        assert_eq!(mesh.triangles(), &[[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
        // 5 outline edges + 2 diagonals
        assert_eq!(mesh.edges().len(), 7);
        assert!(mesh.triangle_points(3).is_none());
    }

    #[test]
    fn degenerate_shapes_have_no_triangles() {
        assert!(Mesh::new(Shape::new(vec![Point2::origin(); 2])).triangles().is_empty());
    }

    #[test]
    fn invalid_triangle_indices_are_rejected() {
        let err = Mesh::with_triangles(pentagon(), vec![[0, 1, 5]]).unwrap_err();
        assert!(matches!(err, FitError::ModelConstructionFailed(_)));
    }

    #[test]
    fn placement_keeps_triangles() {
        let mesh = Mesh::new(pentagon());
        let placed = mesh.placed(2.0, Vector2::new(3.0, 3.0));
        assert_eq!(placed.triangles(), mesh.triangles());
        assert_eq!(placed.shape().points()[0], Point2::new(5.0, 3.0));
    }
}
