use std::path::PathBuf;

use glam::UVec3;
use wisp_io::{encode::EncodingError, write_density_text, SmokeDataDecoder, SmokeDataEncoder};
use wisp_smoke::{GridShape, Obstacle, SmokeParams, SmokeSimulation};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wisp-io-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn simulation() -> SmokeSimulation {
    let shape = GridShape::new(UVec3::new(8, 6, 4), 0.5).unwrap();
    let obstacle = Obstacle::cube(UVec3::new(1, 3, 1), 2, 0.5).unwrap();
    SmokeSimulation::new(shape, Some(obstacle), SmokeParams::default()).unwrap()
}

#[test]
fn recorded_frames_decode_to_the_simulated_state() {
    let dir = scratch_dir("frames");
    let mut sim = simulation();
    let mut encoder = SmokeDataEncoder::new(dir.clone(), 3, 24).unwrap();
    encoder.encode_metadata(&sim).unwrap();

    let mut expected = Vec::new();
    for _ in 0..3 {
        sim.step_frame(1.0 / 24.0);
        encoder.encode_frame(&sim).unwrap();
        expected.push((sim.fields().density.clone(), sim.tracers().clone()));
    }
    assert_eq!(encoder.frames_written(), 3);
    assert!(matches!(encoder.encode_frame(&sim), Err(EncodingError::TooManyFrames(3))));

    let mut decoder = SmokeDataDecoder::new(dir.clone());
    let metadata = decoder.decode_metadata().unwrap();
    assert_eq!(metadata.dims, [8, 6, 4]);
    assert_eq!(metadata.spacing, 0.5);
    assert_eq!(metadata.fps, 24);
    assert_eq!(metadata.num_frames, 3);

    let frames: Vec<_> = decoder.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(frames.len(), 3);

    for (frame, (density, tracers)) in frames.iter().zip(&expected) {
        assert_eq!(frame.density.len(), 8 * 6 * 4);
        assert_eq!(frame.positions.len(), tracers.len());

        // x varies fastest.
        assert_eq!(frame.density[1], density[(1, 0, 0)] as f32);
        assert_eq!(frame.density[8], density[(0, 1, 0)] as f32);
        assert_eq!(frame.density[8 * 6 * 3 + 8 * 2 + 5], density[(5, 2, 3)] as f32);

        for ((p, v), (ep, ev)) in frame.positions.iter().zip(&frame.velocities).zip(tracers.iter()) {
            assert_eq!(*p, ep.as_vec3());
            assert_eq!(*v, ev.as_vec3());
        }
    }
    assert!(frames[2].total_density() > 0.0);

    decoder.reset();
    assert_eq!(decoder.next().unwrap().unwrap(), frames[0]);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn density_text_has_one_value_per_line() {
    let mut sim = simulation();
    sim.inject_sources();

    let mut out = Vec::new();
    write_density_text(&sim, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let values: Vec<f64> = text.lines().map(|l| l.parse().unwrap()).collect();

    assert_eq!(values.len(), 8 * 6 * 4);
    for (n, (i, j, k)) in sim.shape().cells().enumerate() {
        assert_eq!(values[n], sim.fields().density[(i, j, k)]);
    }
    assert!(values.iter().any(|&d| d == 1.0));
}

#[test]
fn missing_frames_are_reported() {
    let dir = scratch_dir("missing");
    let sim = simulation();
    let mut encoder = SmokeDataEncoder::new(dir.clone(), 2, 30).unwrap();
    encoder.encode_metadata(&sim).unwrap();
    encoder.encode_frame(&sim).unwrap();

    let mut decoder = SmokeDataDecoder::new(dir.clone());
    assert!(decoder.next().unwrap().is_ok());
    assert!(decoder.next().unwrap().is_err());
    assert!(decoder.next().is_none());

    std::fs::remove_dir_all(&dir).unwrap();
}
