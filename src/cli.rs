use std::path::PathBuf;

use clap::Parser;

/// Moves particles on the GPU and reports their state in the log
#[derive(Parser)]
#[command()]
pub struct Args {
    /// Total particles
    #[arg(short, long, default_value_t = particle_compute::DEFAULT_PARTICLES)]
    pub particles: usize,

    /// The framerate the simulation will run at
    ///
    /// 0 runs the simulation as fast as possible
    #[arg(short, long, default_value_t = 60)]
    pub framerate: u32,

    /// Stop after this many frames, runs until interrupted if omitted
    #[arg(short = 'n', long)]
    pub frames: Option<u64>,

    /// Kernel source file, looked up in the working directory then in `data_dir`
    #[arg(short, long, default_value = particle_compute::DEFAULT_KERNEL_FILE)]
    pub kernel: String,

    /// Fallback directory for the kernel source
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Width of the area particles start in
    #[arg(long, default_value_t = 1024.0)]
    pub width: f32,

    /// Height of the area particles start in
    #[arg(long, default_value_t = 768.0)]
    pub height: f32,

    /// Seed for the initial particle placement
    #[arg(long)]
    pub seed: Option<u64>,
}
