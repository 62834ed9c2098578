//! Setup and per-frame dispatch of the particle kernel.

use log::{error, info, warn};

use crate::{
    backend::ComputeBackend,
    error::{DispatchError, SetupError},
    loader::KernelLoader,
    particle::{Particle, ParticleSet},
    DEFAULT_KERNEL_FILE, KERNEL_ENTRY_POINT,
};

/// Every handle a successful setup produced.
pub struct ComputeContext<B: ComputeBackend> {
    // Declared in reverse creation order: fields drop top to bottom.
    buffer: B::Buffer,
    kernel: B::Kernel,
    #[allow(dead_code)]
    program: B::Program,
    queue: B::Queue,
    context: B::Context,
    #[allow(dead_code)]
    device: B::Device,
    #[allow(dead_code)]
    platform: B::Platform,

    work_items: u32,
}

impl<B: ComputeBackend> ComputeContext<B> {
    pub fn work_items(&self) -> u32 {
        self.work_items
    }
}

/// Owns the host particles and, once set up, their device mirror.
pub struct ComputeCore<B: ComputeBackend> {
    backend: B,
    loader: KernelLoader,
    kernel_file: String,

    particles: ParticleSet,
    readback: Vec<Particle>,

    compute: Option<ComputeContext<B>>,
    reported_not_ready: bool,
}

impl<B: ComputeBackend> ComputeCore<B> {
    pub fn new(backend: B, loader: KernelLoader, particles: ParticleSet) -> Self {
        let readback = particles.to_vec();

        Self {
            backend,
            loader,
            kernel_file: DEFAULT_KERNEL_FILE.to_owned(),

            particles,
            readback,

            compute: None,
            reported_not_ready: false,
        }
    }

    pub fn with_kernel_file(mut self, kernel_file: impl Into<String>) -> Self {
        self.kernel_file = kernel_file.into();
        self
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn is_ready(&self) -> bool {
        self.compute.is_some()
    }

    pub fn context(&self) -> Option<&ComputeContext<B>> {
        self.compute.as_ref()
    }

    /// Size in bytes of the device particle buffer, if setup succeeded.
    pub fn buffer_size(&self) -> Option<u64> {
        self.compute
            .as_ref()
            .map(|compute| self.backend.buffer_size(&compute.buffer))
    }

    /// One-time compute initialization. Failures are logged and returned;
    /// after a failure `update` leaves the particles untouched.
    pub fn setup(&mut self) -> Result<(), SetupError> {
        if self.compute.is_some() {
            warn!("Compute context already set up");
            return Ok(());
        }

        match self.build() {
            Ok(compute) => {
                info!(
                    "Compute ready: {} particles, {} byte buffer",
                    compute.work_items,
                    self.particles.byte_len()
                );
                self.compute = Some(compute);
                self.reported_not_ready = false;
                Ok(())
            }
            Err(err) => {
                error!("[{}] {}", err.code(), err);
                if let SetupError::Program { log } = &err {
                    error!("Build log:\n{}", log);
                }
                Err(err)
            }
        }
    }

    // Handles created before a failing step drop on return, newest first.
    fn build(&mut self) -> Result<ComputeContext<B>, SetupError> {
        let source = self.loader.load(&self.kernel_file)?;

        let mut platform = self.backend.platform()?;
        let device = self.backend.gpu_device(&mut platform)?;
        let mut context = self.backend.create_context(&device)?;
        let queue = self.backend.create_queue(&mut context)?;

        let program = self.backend.build_program(&context, &source)?;
        let kernel = self
            .backend
            .create_kernel(&context, &program, KERNEL_ENTRY_POINT)?;

        if self.particles.is_empty() {
            return Err(SetupError::BufferAllocation("particle set is empty".into()));
        }
        let work_items = u32::try_from(self.particles.len()).map_err(|_| {
            SetupError::BufferAllocation(format!(
                "{} particles exceed the dispatch range",
                self.particles.len()
            ))
        })?;

        let buffer = self.backend.create_buffer(&context, &self.particles)?;
        let size = self.backend.buffer_size(&buffer);
        if size != self.particles.byte_len() {
            return Err(SetupError::BufferAllocation(format!(
                "expected {} bytes, device reports {}",
                self.particles.byte_len(),
                size
            )));
        }

        Ok(ComputeContext {
            buffer,
            kernel,
            program,
            queue,
            context,
            device,
            platform,
            work_items,
        })
    }

    /// Runs one bind, enqueue, wait, readback cycle. On error the particles
    /// keep their previous values.
    pub fn dispatch(&mut self) -> Result<(), DispatchError> {
        let Some(compute) = self.compute.as_mut() else {
            return Err(DispatchError::NotReady);
        };

        self.backend
            .set_kernel_arg(&compute.context, &mut compute.kernel, &compute.buffer)?;
        self.backend.enqueue(
            &compute.context,
            &mut compute.queue,
            &compute.kernel,
            compute.work_items,
        )?;
        self.backend
            .finish(&compute.context, &mut compute.queue)?;
        self.backend.read_buffer(
            &compute.context,
            &mut compute.queue,
            &compute.buffer,
            &mut self.readback,
        )?;

        self.particles.replace_with(&mut self.readback);
        Ok(())
    }

    /// Frame entry point. Never fails, only logs.
    pub fn update(&mut self) {
        match self.dispatch() {
            Ok(()) => {}
            Err(DispatchError::NotReady) => {
                if !self.reported_not_ready {
                    warn!("Compute is unavailable, particles will not move");
                    self.reported_not_ready = true;
                }
            }
            Err(err) => error!("[{}] {}", err.code(), err),
        }
    }

    /// Releases every device handle, newest first.
    pub fn teardown(&mut self) {
        if self.compute.take().is_some() {
            info!("Compute context released");
        }
    }
}
