use std::{
    io::Write,
    path::{Path, PathBuf},
};

use encode::{EncodingError, FrameEncoder};
use wisp_smoke::SmokeSimulation;

pub mod as_bytes;
pub mod decode;
pub mod encode;

pub use decode::{DecodingError, SmokeDataDecoder, SmokeFrameData, SmokeMetadata};
pub use encode::{write_density_text, SmokeDataEncoder};

pub(crate) const METADATA_FILE: &str = "_meta";

pub trait EncodeFluid {
    fn encode_state<W: Write>(&self, encoder: &mut FrameEncoder<W>) -> Result<(), EncodingError>;
}

/// Density per cell, then tracer positions, then tracer velocities.
impl EncodeFluid for SmokeSimulation {
    fn encode_state<W: Write>(&self, encoder: &mut FrameEncoder<W>) -> Result<(), EncodingError> {
        let shape = self.shape();
        let density = &self.fields().density;
        let tracers = self.tracers();

        encoder.encode_section(shape.cell_count(), shape.cells().map(|c| density[c] as f32))?;
        encoder.encode_section(tracers.len(), tracers.positions().iter().map(|p| p.as_vec3()))?;
        encoder.encode_section(tracers.len(), tracers.velocities().iter().map(|v| v.as_vec3()))?;

        Ok(())
    }
}

/// Frame files are zero-padded so they sort in playback order.
pub(crate) fn frame_path(dir: &Path, num_frames: u64, frame: u64) -> PathBuf {
    let max_digits = num_frames.saturating_sub(1).checked_ilog10().unwrap_or(0) + 1;
    let digits = frame.checked_ilog10().unwrap_or(0) + 1;
    let zeros = max_digits.saturating_sub(digits);

    dir.join(format!("{}{frame}.dat", "0".repeat(zeros as usize)))
}
