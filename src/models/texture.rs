//! Multi-channel texture images.
//!
//! Each channel is a `DMatrix<f64>` (rows = height, cols = width). The PCA
//! feature layout is channel-major, each channel row-major:
//!
//! ```text
//! [c0(0,0), c0(0,1), ..., c0(h-1,w-1), c1(0,0), ...]
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::resize_channel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    channels: Vec<DMatrix<f64>>,
}

impl Texture {
    /// Merge channels into one texture. All channels must share a size.
    pub fn from_channels(channels: Vec<DMatrix<f64>>) -> Result<Self, FitError> {
        let Some(first) = channels.first() else {
            return Err(FitError::ModelConstructionFailed(
                "texture needs at least one channel".to_string(),
            ));
        };
        let shape = first.shape();
        for c in &channels[1..] {
            if c.shape() != shape {
                return Err(FitError::dimension(
                    "texture channel size",
                    shape.0 * shape.1,
                    c.nrows() * c.ncols(),
                ));
            }
        }
        Ok(Self { channels })
    }

    /// Build a texture from `f(x, y, channel)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        num_channels: usize,
        f: impl Fn(usize, usize, usize) -> f64,
    ) -> Self {
        let channels = (0..num_channels.max(1))
            .map(|c| DMatrix::from_fn(height, width, |y, x| f(x, y, c)))
            .collect();
        Self { channels }
    }

    pub fn zeros(width: usize, height: usize, num_channels: usize) -> Self {
        Self::from_fn(width, height, num_channels, |_, _, _| 0.0)
    }

    pub fn width(&self) -> usize {
        self.channels[0].ncols()
    }

    pub fn height(&self) -> usize {
        self.channels[0].nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[DMatrix<f64>] {
        &self.channels
    }

    pub fn pixel(&self, x: usize, y: usize, channel: usize) -> f64 {
        self.channels[channel][(y, x)]
    }

    pub fn resized(&self, width: usize, height: usize) -> Texture {
        Texture {
            channels: self
                .channels
                .iter()
                .map(|c| resize_channel(c, height, width))
                .collect(),
        }
    }

    pub fn to_feature_vector(&self) -> DVector<f64> {
        let (h, w) = self.channels[0].shape();
        let mut out = DVector::zeros(self.channels.len() * h * w);
        let mut k = 0;
        for c in &self.channels {
            for y in 0..h {
                for x in 0..w {
                    out[k] = c[(y, x)];
                    k += 1;
                }
            }
        }
        out
    }

    pub fn from_feature_vector(
        v: &DVector<f64>,
        width: usize,
        height: usize,
        num_channels: usize,
    ) -> Result<Self, FitError> {
        let plane = width * height;
        let expected = plane * num_channels;
        if v.len() != expected || num_channels == 0 {
            return Err(FitError::dimension("texture feature vector", expected, v.len()));
        }
        let channels = (0..num_channels)
            .map(|c| DMatrix::from_fn(height, width, |y, x| v[c * plane + y * width + x]))
            .collect();
        Ok(Self { channels })
    }

    /// Copy of `self` with `overlay` pasted at pixel `(x, y)`.
    pub fn composited(&self, overlay: &Texture, x: i64, y: i64) -> Result<Texture, FitError> {
        self.check_window(overlay, x, y)?;
        let (x, y) = (x as usize, y as usize);
        let mut channels = self.channels.clone();
        for (dst, src) in channels.iter_mut().zip(&overlay.channels) {
            dst.view_mut((y, x), src.shape()).copy_from(src);
        }
        Ok(Texture { channels })
    }

    /// Sum of squared differences between `overlay` and the window of `self`
    /// whose top-left pixel is `(x, y)`.
    pub fn window_sse(&self, overlay: &Texture, x: i64, y: i64) -> Result<f64, FitError> {
        self.check_window(overlay, x, y)?;
        let (x, y) = (x as usize, y as usize);
        let mut sse = 0.0;
        for (dst, src) in self.channels.iter().zip(&overlay.channels) {
            let window = dst.view((y, x), src.shape());
            sse += window
                .iter()
                .zip(src.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
        }
        Ok(sse)
    }

    fn check_window(&self, overlay: &Texture, x: i64, y: i64) -> Result<(), FitError> {
        if overlay.num_channels() != self.num_channels() {
            return Err(FitError::dimension(
                "texture channels",
                self.num_channels(),
                overlay.num_channels(),
            ));
        }
        let fits = x >= 0
            && y >= 0
            && x as usize + overlay.width() <= self.width()
            && y as usize + overlay.height() <= self.height();
        if !fits {
            return Err(FitError::CandidateOutOfBounds {
                x,
                y,
                width: overlay.width(),
                height: overlay.height(),
                image_width: self.width(),
                image_height: self.height(),
            });
        }
        Ok(())
    }
}
