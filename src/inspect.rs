use std::error::Error;

use wisp_io::SmokeDataDecoder;

use crate::InspectArgs;

pub fn inspect(args: InspectArgs) -> Result<(), Box<dyn Error>> {
    let mut decoder = SmokeDataDecoder::new(args.path);
    let meta = decoder.decode_metadata()?;

    let [nx, ny, nz] = meta.dims;
    println!("{nx}x{ny}x{nz} cells of size {}", meta.spacing);
    println!("{} frames at {} fps", meta.num_frames, meta.fps);

    for (n, frame) in decoder.enumerate() {
        let frame = frame?;
        let peak = frame.density.iter().copied().fold(0.0f32, f32::max);
        let top = frame.positions.iter().map(|p| p.y).fold(0.0f32, f32::max);

        println!(
            "frame {n:>4}: total density {:>10.3}, peak {peak:.3}, {:>6} tracers, highest at y = {top:.3}",
            frame.total_density(),
            frame.positions.len(),
        );
    }

    Ok(())
}
