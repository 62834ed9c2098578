//! GPU particle movement: kernel loading, compute setup and a blocking
//! per-frame dispatch that copies the results back into host memory.

pub mod backend;
pub mod compute;
pub mod error;
pub mod framepace;
pub mod gpu;
pub mod loader;
pub mod particle;
pub mod utils;

pub use backend::ComputeBackend;
pub use compute::{ComputeContext, ComputeCore};
pub use error::{DispatchError, SetupError, SourceError};
pub use gpu::WgpuBackend;
pub use loader::KernelLoader;
pub use particle::{Particle, ParticleSet};

pub const DEFAULT_PARTICLES: usize = 1000;
pub const DEFAULT_KERNEL_FILE: &str = "moveParticles.wgsl";
pub const KERNEL_ENTRY_POINT: &str = "moveParticles";

/// Must match `@workgroup_size` in the kernel source.
pub const WORKGROUP_SIZE: u32 = 64;
