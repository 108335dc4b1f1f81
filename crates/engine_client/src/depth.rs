//! Depth pass decoding.
//!
//! `_depth` passes carry three bytes per pixel, bottom row first. The red channel
//! holds the coarse value and green/blue refine it by successive factors of 256.
//! `_depth_simple` passes carry one byte per pixel.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{domain::DepthFrame, protocol::Images};

use crate::EngineError;

pub const DEPTH_PASS: &str = "_depth";
pub const DEPTH_SIMPLE_PASS: &str = "_depth_simple";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

impl ClipPlanes {
    fn scale(&self) -> f32 {
        (self.far - self.near) / 256.0
    }
}

pub fn is_depth_pass(pass_mask: &str) -> bool {
    pass_mask == DEPTH_PASS || pass_mask == DEPTH_SIMPLE_PASS
}

pub fn decode_depth_pass(
    pass_mask: &str,
    bytes: &[u8],
    width: u32,
    height: u32,
    planes: ClipPlanes,
) -> Result<DepthFrame, EngineError> {
    let channels = if pass_mask == DEPTH_SIMPLE_PASS { 1 } else { 3 };
    let (w, h) = (width as usize, height as usize);
    let expected = w * h * channels;
    if bytes.len() != expected {
        return Err(EngineError::DepthDecode {
            pass_mask: pass_mask.to_string(),
            expected,
            actual: bytes.len(),
        });
    }

    let scale = planes.scale();
    let mut values = Vec::with_capacity(w * h);
    for row in (0..h).rev() {
        let start = row * w * channels;
        let row_bytes = &bytes[start..start + w * channels];
        for pixel in row_bytes.chunks_exact(channels) {
            let normalized = match pixel {
                [r, g, b] => f32::from(*r) + f32::from(*g) / 256.0 + f32::from(*b) / 65_536.0,
                [v] => f32::from(*v) / 256.0,
                _ => unreachable!("chunks_exact yields {channels} bytes"),
            };
            values.push(normalized * scale);
        }
    }
    Ok(DepthFrame::new(width, height, values))
}

/// Decodes every depth-tagged pass in `images`, in pass order.
pub fn depth_frames(images: &Images, planes: ClipPlanes) -> Result<Vec<DepthFrame>, EngineError> {
    images
        .passes
        .iter()
        .filter(|pass| is_depth_pass(&pass.pass_mask))
        .map(|pass| {
            let bytes = STANDARD.decode(&pass.data_b64)?;
            decode_depth_pass(&pass.pass_mask, &bytes, images.width, images.height, planes)
        })
        .collect()
}
