use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::PathBuf,
};

use glam::Vec3;
use thiserror::Error;

use crate::{as_bytes::AsBytes, frame_path, METADATA_FILE};

/// Reads back a recording written by [`SmokeDataEncoder`](crate::encode::SmokeDataEncoder).
pub struct SmokeDataDecoder {
    /// The directory in which the recording resides.
    path: PathBuf,
    metadata: Option<SmokeMetadata>,
    current_frame: u64,
}

impl SmokeDataDecoder {
    pub fn new(path: PathBuf) -> SmokeDataDecoder {
        Self {
            path,
            metadata: None,
            current_frame: 0,
        }
    }

    pub fn decode_metadata(&mut self) -> Result<SmokeMetadata, DecodingError> {
        let mut reader = BufReader::new(File::open(self.path.join(METADATA_FILE))?);

        let dims = [
            read_value::<4, u32, _>(&mut reader)?,
            read_value::<4, u32, _>(&mut reader)?,
            read_value::<4, u32, _>(&mut reader)?,
        ];
        let spacing = read_value::<4, f32, _>(&mut reader)?;
        let fps = read_value::<4, u32, _>(&mut reader)?;
        let num_frames = read_value::<8, u64, _>(&mut reader)?;

        let metadata = SmokeMetadata {
            dims,
            spacing,
            fps,
            num_frames,
        };
        self.metadata = Some(metadata);

        Ok(metadata)
    }

    /// Decodes the next frame, or `None` once every recorded frame has been read.
    pub fn decode_frame(&mut self) -> Option<Result<SmokeFrameData, DecodingError>> {
        let metadata = match self.metadata {
            Some(metadata) => metadata,
            None => match self.decode_metadata() {
                Ok(metadata) => metadata,
                Err(e) => return Some(Err(e)),
            },
        };

        if self.current_frame >= metadata.num_frames {
            return None;
        }

        let path = frame_path(&self.path, metadata.num_frames, self.current_frame);
        self.current_frame += 1;

        let frame = File::open(path)
            .map_err(DecodingError::from)
            .and_then(|file| SmokeFrameData::read(BufReader::new(file), metadata.cell_count()));

        Some(frame)
    }

    /// Rewinds to the first frame.
    pub fn reset(&mut self) {
        self.current_frame = 0;
    }
}

impl Iterator for SmokeDataDecoder {
    type Item = Result<SmokeFrameData, DecodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_frame()
    }
}

fn read_value<const N: usize, T, R>(reader: &mut R) -> Result<T, DecodingError>
where
    T: AsBytes<N>,
    R: Read,
{
    let mut bytes = [0; N];
    reader.read_exact(&mut bytes)?;

    Ok(T::from_bytes(bytes))
}

fn read_section<const N: usize, T, R>(reader: &mut R) -> Result<Vec<T>, DecodingError>
where
    T: AsBytes<N>,
    R: Read,
{
    let len = read_value::<8, u64, _>(reader)?;
    let byte_len = len
        .checked_mul(N as u64)
        .ok_or_else(|| DecodingError::Malformed(format!("section of {len} values")))?;

    // Bounded by the bytes actually present.
    let mut bytes = Vec::new();
    reader.by_ref().take(byte_len).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < byte_len {
        return Err(DecodingError::Truncated);
    }

    Ok(bytes
        .chunks_exact(N)
        .map(|b| {
            let mut value = [0; N];
            value.copy_from_slice(b);
            T::from_bytes(value)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeMetadata {
    /// Grid size, in cells.
    pub dims: [u32; 3],
    /// Cell size.
    pub spacing: f32,
    pub fps: u32,
    pub num_frames: u64,
}

impl SmokeMetadata {
    pub fn cell_count(&self) -> usize {
        self.dims.iter().map(|&n| n as usize).product()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmokeFrameData {
    /// Density per cell, x varying fastest, then y, then z.
    pub density: Vec<f32>,
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl SmokeFrameData {
    /// Reads one frame holding `cell_count` density values.
    pub fn read<R: Read>(mut reader: R, cell_count: usize) -> Result<Self, DecodingError> {
        let density: Vec<f32> = read_section(&mut reader)?;
        if density.len() != cell_count {
            return Err(DecodingError::Malformed(format!(
                "density section holds {} values for {cell_count} cells",
                density.len()
            )));
        }

        let positions: Vec<Vec3> = read_section(&mut reader)?;
        let velocities: Vec<Vec3> = read_section(&mut reader)?;
        if positions.len() != velocities.len() {
            return Err(DecodingError::Malformed(format!(
                "{} tracer positions but {} velocities",
                positions.len(),
                velocities.len()
            )));
        }

        Ok(Self {
            density,
            positions,
            velocities,
        })
    }

    pub fn total_density(&self) -> f64 {
        self.density.iter().map(|&d| d as f64).sum()
    }
}

#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("recording ends in the middle of a section")]
    Truncated,
    #[error("malformed recording: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for DecodingError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => DecodingError::Truncated,
            _ => DecodingError::Io(e),
        }
    }
}
