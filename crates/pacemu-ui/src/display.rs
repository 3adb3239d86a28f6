use log::info;
use pacemu_core::render::{BlitCounter, DisplaySink};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

/// Display without a window: keeps the most recent frame and counts blits.
pub struct HeadlessDisplay {
    width: usize,
    height: usize,
    last: Option<Vec<u32>>,
    blits: Arc<BlitCounter>,
}

impl HeadlessDisplay {
    pub fn new(width: usize, height: usize, blits: Arc<BlitCounter>) -> Self {
        Self {
            width,
            height,
            last: None,
            blits,
        }
    }

    pub fn last_frame(&self) -> Option<&[u32]> {
        self.last.as_deref()
    }

    /// Write the last presented frame to `path`. Returns `Ok(false)` when
    /// nothing has been presented yet.
    pub fn save_png(&self, path: &Path) -> Result<bool, png::EncodingError> {
        let Some(frame) = self.last_frame() else {
            return Ok(false);
        };
        write_png(path, self.width, self.height, frame)?;
        info!("Saved screenshot to {}", path.display());
        Ok(true)
    }
}

impl DisplaySink for HeadlessDisplay {
    fn present(&mut self, frame: Vec<u32>) {
        self.last = Some(frame);
        self.blits.record();
    }
}

/// Pack `0x00RRGGBB` pixels into 8-bit RGB.
fn to_rgb(frame: &[u32]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(frame.len() * 3);
    for &px in frame {
        rgb.push((px >> 16) as u8);
        rgb.push((px >> 8) as u8);
        rgb.push(px as u8);
    }
    rgb
}

pub fn write_png(
    path: &Path,
    width: usize,
    height: usize,
    frame: &[u32],
) -> Result<(), png::EncodingError> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&to_rgb(frame))?;
    writer.finish()
}
