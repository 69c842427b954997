use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

use wisp_smoke::SmokeSimulation;

use crate::{frame_path, EncodeFluid, METADATA_FILE};

use super::as_bytes::AsBytes;

/// Writes a recording: one `_meta` file followed by one `.dat` file per frame.
pub struct SmokeDataEncoder {
    /// The directory into which the recording is written.
    path: PathBuf,
    num_frames: u64,
    fps: u32,
    current_frame: u64,
}

impl SmokeDataEncoder {
    pub fn new(path: PathBuf, num_frames: u64, fps: u32) -> Result<SmokeDataEncoder, EncodingError> {
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            num_frames,
            fps,
            current_frame: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.current_frame
    }

    pub fn encode_metadata(&mut self, sim: &SmokeSimulation) -> Result<(), EncodingError> {
        let shape = sim.shape();
        let mut writer = BufWriter::new(File::create(self.path.join(METADATA_FILE))?);

        for n in shape.grid_size.to_array() {
            writer.write_all(&n.to_bytes())?;
        }
        writer.write_all(&(shape.spacing as f32).to_bytes())?;
        writer.write_all(&self.fps.to_bytes())?;
        writer.write_all(&self.num_frames.to_bytes())?;

        writer.flush()?;
        Ok(())
    }

    pub fn encode_frame<F: EncodeFluid>(&mut self, fluid: &F) -> Result<(), EncodingError> {
        if self.current_frame >= self.num_frames {
            return Err(EncodingError::TooManyFrames(self.num_frames));
        }

        let path = frame_path(&self.path, self.num_frames, self.current_frame);
        let mut encoder = FrameEncoder::new(File::create(path)?);

        fluid.encode_state(&mut encoder)?;
        encoder.finish()?;

        self.current_frame += 1;

        Ok(())
    }
}

pub struct FrameEncoder<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: BufWriter::new(writer) }
    }

    /// Writes `len` as a `u64` followed by the encoded values.
    pub fn encode_section<const N: usize, T, I>(&mut self, len: usize, values: I) -> Result<(), EncodingError>
    where
        I: Iterator<Item = T>,
        T: AsBytes<N>,
    {
        self.writer.write_all(&(len as u64).to_bytes())?;

        let mut written = 0;
        for v in values {
            self.writer.write_all(&v.to_bytes())?;
            written += 1;
        }

        if written != len {
            return Err(EncodingError::SectionLength { expected: len, found: written });
        }

        Ok(())
    }

    /// Flushes the buffered section data and hands back the inner writer.
    pub fn finish(self) -> Result<W, EncodingError> {
        self.writer.into_inner().map_err(|e| EncodingError::Io(e.into_error()))
    }
}

/// Writes the density field as plain text, one value per line with x varying fastest.
pub fn write_density_text<W: Write>(sim: &SmokeSimulation, writer: W) -> Result<(), EncodingError> {
    let mut writer = BufWriter::new(writer);
    let density = &sim.fields().density;

    for (i, j, k) in sim.shape().cells() {
        writeln!(writer, "{}", density[(i, j, k)])?;
    }

    writer.flush()?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("section declared {expected} values but {found} were written")]
    SectionLength { expected: usize, found: usize },
    #[error("recording was opened for {0} frames")]
    TooManyFrames(u64),
}
