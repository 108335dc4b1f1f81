//! Colour-mapped PNG previews of dumped depth frames.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{Rgb, RgbImage};
use ndarray::{Array3, ArrayView2, Axis};
use tracing::info;

use crate::DumpError;

/// Viridis control points, dark (near) to bright (far).
const RAMP: [[f32; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

pub fn frame_file_name(index: usize) -> String {
    format!("depth_value_{index:04}.png")
}

/// Maps `t` in `[0, 1]` onto the ramp.
pub fn colormap(t: f32) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (RAMP.len() - 1) as f32;
    let lower = (scaled.floor() as usize).min(RAMP.len() - 2);
    let frac = scaled - lower as f32;
    let (a, b) = (RAMP[lower], RAMP[lower + 1]);
    let channel = |i: usize| (a[i] + (b[i] - a[i]) * frac).round() as u8;
    Rgb([channel(0), channel(1), channel(2)])
}

/// Renders one frame, normalized to its own finite min/max.
pub fn render_frame(frame: ArrayView2<'_, f32>, path: &Path) -> Result<(), DumpError> {
    let (min, max) = frame
        .iter()
        .filter(|value| value.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = max - min;
    let (height, width) = frame.dim();
    let image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let value = frame[[y as usize, x as usize]];
        let t = if span > f32::EPSILON {
            (value - min) / span
        } else {
            0.0
        };
        colormap(t)
    });
    image.save(path)?;
    Ok(())
}

/// Writes `depth_value_NNNN.png` for every frame of `dump` into `dir`.
pub fn render_dump(dump: &Array3<f32>, dir: &Path) -> Result<Vec<PathBuf>, DumpError> {
    fs::create_dir_all(dir).map_err(|source| DumpError::io(dir, source))?;
    let mut written = Vec::with_capacity(dump.len_of(Axis(0)));
    for (index, frame) in dump.axis_iter(Axis(0)).enumerate() {
        let path = dir.join(frame_file_name(index));
        render_frame(frame, &path)?;
        info!(frame = index, path = %path.display(), "rendered depth frame");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn ramp_endpoints_are_exact() {
        assert_eq!(colormap(0.0), Rgb([68, 1, 84]));
        assert_eq!(colormap(1.0), Rgb([253, 231, 37]));
        assert_eq!(colormap(f32::NAN), Rgb([68, 1, 84]));
        assert_eq!(colormap(7.0), Rgb([253, 231, 37]));
    }

    #[test]
    fn renders_one_png_per_frame() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut dump = Array3::<f32>::zeros((2, 3, 4));
        dump[[0, 2, 3]] = 5.0;

        let written = render_dump(&dump, &dir.path().join("vr")).expect("render");
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("vr/depth_value_0001.png"));

        let image = image::open(&written[0]).expect("png").to_rgb8();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(*image.get_pixel(3, 2), Rgb([253, 231, 37]));
        assert_eq!(*image.get_pixel(0, 0), Rgb([68, 1, 84]));
    }
}
