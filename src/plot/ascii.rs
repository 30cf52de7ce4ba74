//! ASCII rendering of a fit for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output
//!
//! Plot elements:
//! - fitted mesh edges: `.`
//! - fitted landmarks: `+`
//! - target landmarks: `o`
//! - target and fitted landmark on the same cell: `*`
//!
//! Rows follow image coordinates, so row 0 is the smallest `y`.

use nalgebra::Point2;

use crate::models::{Mesh, Shape};

pub fn render_shape_overlay(target: &Shape, fitted: &Mesh, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all: Vec<Point2<f64>> = target
        .points()
        .iter()
        .chain(fitted.shape().points())
        .copied()
        .collect();
    let (x_min, x_max) = axis_range(all.iter().map(|p| p.x));
    let (y_min, y_max) = axis_range(all.iter().map(|p| p.y));

    let mut grid = vec![vec![' '; width]; height];
    let cell = |p: &Point2<f64>| {
        (
            map_axis(p.x, x_min, x_max, width),
            map_axis(p.y, y_min, y_max, height),
        )
    };

    // Edges first so landmarks overlay them.
    let fitted_points = fitted.shape().points();
    for (a, b) in fitted.edges() {
        let (x0, y0) = cell(&fitted_points[a]);
        let (x1, y1) = cell(&fitted_points[b]);
        draw_line(&mut grid, x0, y0, x1, y1, '.');
    }
    for p in fitted_points {
        let (x, y) = cell(p);
        grid[y][x] = '+';
    }
    for p in target.points() {
        let (x, y) = cell(p);
        grid[y][x] = if grid[y][x] == '+' || grid[y][x] == '*' { '*' } else { 'o' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Overlay: x=[{x_min:.1}, {x_max:.1}] y=[{y_min:.1}, {y_max:.1}] | o target, + fitted, * both\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return (0.0, 1.0);
    }
    if max - min < 1e-12 {
        return (min - 0.5, max + 0.5);
    }
    (min, max)
}

fn map_axis(v: f64, min: f64, max: f64, cells: usize) -> usize {
    let cells = cells.max(2);
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    if u.is_nan() {
        return 0;
    }
    (u * (cells as f64 - 1.0)).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    fn square() -> Shape {
        Shape::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ])
    }

    fn body(txt: &str) -> String {
        txt.lines().skip(1).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn exact_fit_marks_every_landmark_as_both() {
        let txt = render_shape_overlay(&square(), &Mesh::new(square()), 11, 6);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 1 + 6);
        assert!(lines[0].starts_with("Overlay: x=[0.0, 10.0] y=[0.0, 10.0]"));
        // top edge of the square is row 1 (row 0 is the header)
        assert_eq!(lines[1], "*.........*");
        assert_eq!(lines[6], "*.........*");
        assert_eq!(body(&txt).matches('*').count(), 4);
        assert!(!body(&txt).contains('o'));
    }

    #[test]
    fn offset_fit_shows_both_markers() {
        let fitted = Mesh::new(square().translated(Vector2::new(10.0, 0.0)));
        let txt = render_shape_overlay(&square(), &fitted, 21, 6);
        // two landmarks coincide, two of each are distinct
        let body = body(&txt);
        assert_eq!(body.matches('*').count(), 2);
        assert_eq!(body.matches('o').count(), 2);
        assert_eq!(body.matches('+').count(), 2);
    }

    #[test]
    fn degenerate_ranges_do_not_panic() {
        let point = Shape::new(vec![Point2::new(3.0, 3.0); 3]);
        let txt = render_shape_overlay(&point, &Mesh::new(point.clone()), 10, 5);
        assert_eq!(body(&txt).matches('*').count(), 1);
    }
}
