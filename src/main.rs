mod cli;

use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec2;
use log::{info, warn};
use particle_compute::{
    framepace::FramePacer, ComputeCore, KernelLoader, ParticleSet, SetupError, WgpuBackend,
};
use rand::{rngs::StdRng, SeedableRng};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    // Collect Arguments
    let args = cli::Args::parse();

    let bounds = Vec2::new(args.width, args.height);
    let particles = match args.seed {
        Some(seed) => ParticleSet::random(args.particles, bounds, &mut StdRng::seed_from_u64(seed)),
        None => ParticleSet::random(args.particles, bounds, &mut rand::thread_rng()),
    };

    let backend = WgpuBackend::new()?;
    let loader = KernelLoader::new(&args.data_dir);
    let mut core = ComputeCore::new(backend, loader, particles).with_kernel_file(&args.kernel);

    match core.setup() {
        Ok(()) => {}
        Err(SetupError::Source(err)) => return Err(err.into()),
        // Already logged; keep running with the initial particles.
        Err(_) => warn!("Continuing without compute"),
    }

    let mut framepace = FramePacer::new();
    let mut last_report = Instant::now();
    let mut frame: u64 = 0;

    while args.frames.map_or(true, |frames| frame < frames) {
        framepace.begin_frame();
        core.update();
        frame += 1;

        if last_report.elapsed() >= REPORT_INTERVAL {
            let centroid = core.particles().centroid();
            info!(
                "frame {} | {:.1} fps | centroid ({:.2}, {:.2})",
                frame,
                framepace.framerate(),
                centroid.x,
                centroid.y
            );
            last_report = Instant::now();
        }

        framepace.end_frame(args.framerate);
    }

    let centroid = core.particles().centroid();
    info!(
        "Finished after {} frames, centroid ({:.2}, {:.2})",
        frame, centroid.x, centroid.y
    );
    core.teardown();

    Ok(())
}
