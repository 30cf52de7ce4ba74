//! Single-channel image resampling.
//!
//! Channels are `DMatrix<f64>` with rows = height and cols = width.

use nalgebra::DMatrix;

/// Bilinear resize of one channel to `rows x cols`.
///
/// Pixel centres are aligned (`(i + 0.5) * src / dst - 0.5`) and samples are
/// clamped to the border, so an unchanged size returns an exact copy.
pub fn resize_channel(src: &DMatrix<f64>, rows: usize, cols: usize) -> DMatrix<f64> {
    let (src_rows, src_cols) = src.shape();
    if (src_rows, src_cols) == (rows, cols) {
        return src.clone();
    }
    if src_rows == 0 || src_cols == 0 || rows == 0 || cols == 0 {
        return DMatrix::zeros(rows, cols);
    }

    let sy = src_rows as f64 / rows as f64;
    let sx = src_cols as f64 / cols as f64;

    DMatrix::from_fn(rows, cols, |i, j| {
        let fy = ((i as f64 + 0.5) * sy - 0.5).clamp(0.0, (src_rows - 1) as f64);
        let fx = ((j as f64 + 0.5) * sx - 0.5).clamp(0.0, (src_cols - 1) as f64);

        let y0 = fy.floor() as usize;
        let x0 = fx.floor() as usize;
        let y1 = (y0 + 1).min(src_rows - 1);
        let x1 = (x0 + 1).min(src_cols - 1);
        let wy = fy - y0 as f64;
        let wx = fx - x0 as f64;

        let top = src[(y0, x0)] * (1.0 - wx) + src[(y0, x1)] * wx;
        let bottom = src[(y1, x0)] * (1.0 - wx) + src[(y1, x1)] * wx;
        top * (1.0 - wy) + bottom * wy
    })
}
