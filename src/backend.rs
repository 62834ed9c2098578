//! The device-facing steps of compute setup and dispatch.
//!
//! Each method performs exactly one acquisition or dispatch step, so the
//! caller decides the order, stops at the first failure and owns every
//! handle it receives. Dropping a handle releases it.

use crate::{
    error::{DispatchError, SetupError},
    particle::Particle,
};

pub trait ComputeBackend {
    type Platform;
    type Device;
    type Context;
    type Queue;
    type Program;
    type Kernel;
    type Buffer;

    /// Picks the first available compute platform.
    fn platform(&mut self) -> Result<Self::Platform, SetupError>;

    /// Picks the first GPU-class device of `platform`. Never falls back to a CPU device.
    fn gpu_device(&mut self, platform: &mut Self::Platform) -> Result<Self::Device, SetupError>;

    fn create_context(&mut self, device: &Self::Device) -> Result<Self::Context, SetupError>;

    /// Creates the in-order command queue for `context`.
    fn create_queue(&mut self, context: &mut Self::Context) -> Result<Self::Queue, SetupError>;

    /// Compiles `source`. A failure must carry the complete compiler log.
    fn build_program(
        &mut self,
        context: &Self::Context,
        source: &str,
    ) -> Result<Self::Program, SetupError>;

    fn create_kernel(
        &mut self,
        context: &Self::Context,
        program: &Self::Program,
        entry_point: &str,
    ) -> Result<Self::Kernel, SetupError>;

    /// Allocates a read/write device buffer initialized with `particles`.
    fn create_buffer(
        &mut self,
        context: &Self::Context,
        particles: &[Particle],
    ) -> Result<Self::Buffer, SetupError>;

    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    /// Binds `buffer` as argument 0 of `kernel`.
    fn set_kernel_arg(
        &mut self,
        context: &Self::Context,
        kernel: &mut Self::Kernel,
        buffer: &Self::Buffer,
    ) -> Result<(), DispatchError>;

    /// Submits `kernel` over `work_items` invocations without waiting for it.
    fn enqueue(
        &mut self,
        context: &Self::Context,
        queue: &mut Self::Queue,
        kernel: &Self::Kernel,
        work_items: u32,
    ) -> Result<(), DispatchError>;

    /// Blocks until all work submitted to `queue` has completed. Fails when the
    /// queue still holds work after the wait returns.
    fn finish(
        &mut self,
        context: &Self::Context,
        queue: &mut Self::Queue,
    ) -> Result<(), DispatchError>;

    /// Copies the whole of `buffer` into `out`, blocking until the copy is done.
    /// A copy the device rejected is an error, and `out` is then left untouched.
    fn read_buffer(
        &mut self,
        context: &Self::Context,
        queue: &mut Self::Queue,
        buffer: &Self::Buffer,
        out: &mut [Particle],
    ) -> Result<(), DispatchError>;
}
