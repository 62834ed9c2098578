#![allow(dead_code)]

use std::{
    fs,
    path::PathBuf,
    sync::{mpsc::Receiver, Arc, Mutex},
};

use particle_compute::{
    ComputeBackend, ComputeCore, DispatchError, KernelLoader, Particle, ParticleSet, SetupError,
};

pub const KERNEL_SOURCE: &str = include_str!("../../data/moveParticles.wgsl");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Platform,
    Device,
    Context,
    Queue,
    Program,
    Kernel,
    Buffer,
    SetArg,
    Enqueue,
    Finish,
    Read,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Call(Step),
    /// The gated wait step was let through.
    Unblocked,
    Released(Step),
}

pub type Log = Arc<Mutex<Vec<Event>>>;

pub fn events(log: &Log) -> Vec<Event> {
    log.lock().unwrap().clone()
}

pub fn calls(log: &Log) -> Vec<Step> {
    events(log)
        .into_iter()
        .filter_map(|event| match event {
            Event::Call(step) => Some(step),
            _ => None,
        })
        .collect()
}

pub fn releases(log: &Log) -> Vec<Step> {
    events(log)
        .into_iter()
        .filter_map(|event| match event {
            Event::Released(step) => Some(step),
            _ => None,
        })
        .collect()
}

pub struct Handle {
    kind: Step,
    log: Log,
}

impl Handle {
    fn new(kind: Step, log: &Log) -> Self {
        Self {
            kind,
            log: log.clone(),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.log.lock().unwrap().push(Event::Released(self.kind));
    }
}

pub struct MockProgram {
    _handle: Handle,
    source: String,
}

pub struct MockKernel {
    _handle: Handle,
    arg: Option<Arc<Mutex<Vec<Particle>>>>,
}

pub struct MockBuffer {
    _handle: Handle,
    data: Arc<Mutex<Vec<Particle>>>,
}

/// Records every step, executes `position += velocity` on enqueue and can
/// fail any single step.
pub struct MockBackend {
    log: Log,
    pub gpu_devices: usize,
    pub fail_at: Option<Step>,
    pub compiler_log: String,
    /// When set, each wait blocks until a message arrives.
    pub gate: Option<Receiver<()>>,
    pub reported_size: Option<u64>,
}

impl MockBackend {
    pub fn new() -> (Self, Log) {
        let log = Log::default();
        let backend = Self {
            log: log.clone(),
            gpu_devices: 1,
            fail_at: None,
            compiler_log: String::new(),
            gate: None,
            reported_size: None,
        };
        (backend, log)
    }

    fn call(&self, step: Step) -> bool {
        self.log.lock().unwrap().push(Event::Call(step));
        self.fail_at == Some(step)
    }
}

impl ComputeBackend for MockBackend {
    type Platform = Handle;
    type Device = Handle;
    type Context = Handle;
    type Queue = Handle;
    type Program = MockProgram;
    type Kernel = MockKernel;
    type Buffer = MockBuffer;

    fn platform(&mut self) -> Result<Handle, SetupError> {
        if self.call(Step::Platform) {
            return Err(SetupError::Platform("no platforms".into()));
        }
        Ok(Handle::new(Step::Platform, &self.log))
    }

    fn gpu_device(&mut self, _platform: &mut Handle) -> Result<Handle, SetupError> {
        if self.call(Step::Device) || self.gpu_devices == 0 {
            return Err(SetupError::Device("no GPU-class device".into()));
        }
        Ok(Handle::new(Step::Device, &self.log))
    }

    fn create_context(&mut self, _device: &Handle) -> Result<Handle, SetupError> {
        if self.call(Step::Context) {
            return Err(SetupError::Context("out of resources".into()));
        }
        Ok(Handle::new(Step::Context, &self.log))
    }

    fn create_queue(&mut self, _context: &mut Handle) -> Result<Handle, SetupError> {
        if self.call(Step::Queue) {
            return Err(SetupError::Queue("out of resources".into()));
        }
        Ok(Handle::new(Step::Queue, &self.log))
    }

    fn build_program(&mut self, _context: &Handle, source: &str) -> Result<MockProgram, SetupError> {
        if self.call(Step::Program) {
            return Err(SetupError::Program {
                log: self.compiler_log.clone(),
            });
        }
        Ok(MockProgram {
            _handle: Handle::new(Step::Program, &self.log),
            source: source.to_owned(),
        })
    }

    fn create_kernel(
        &mut self,
        _context: &Handle,
        program: &MockProgram,
        entry_point: &str,
    ) -> Result<MockKernel, SetupError> {
        let failed = self.call(Step::Kernel);
        if failed || !program.source.contains(&format!("fn {}(", entry_point)) {
            return Err(SetupError::KernelNotFound {
                entry_point: entry_point.to_owned(),
                reason: "no such entry point".into(),
            });
        }
        Ok(MockKernel {
            _handle: Handle::new(Step::Kernel, &self.log),
            arg: None,
        })
    }

    fn create_buffer(
        &mut self,
        _context: &Handle,
        particles: &[Particle],
    ) -> Result<MockBuffer, SetupError> {
        if self.call(Step::Buffer) {
            return Err(SetupError::BufferAllocation("out of device memory".into()));
        }
        Ok(MockBuffer {
            _handle: Handle::new(Step::Buffer, &self.log),
            data: Arc::new(Mutex::new(particles.to_vec())),
        })
    }

    fn buffer_size(&self, buffer: &MockBuffer) -> u64 {
        self.reported_size
            .unwrap_or_else(|| std::mem::size_of_val(buffer.data.lock().unwrap().as_slice()) as u64)
    }

    fn set_kernel_arg(
        &mut self,
        _context: &Handle,
        kernel: &mut MockKernel,
        buffer: &MockBuffer,
    ) -> Result<(), DispatchError> {
        if self.call(Step::SetArg) {
            return Err(DispatchError::SetArgument("invalid mem object".into()));
        }
        kernel.arg = Some(buffer.data.clone());
        Ok(())
    }

    fn enqueue(
        &mut self,
        _context: &Handle,
        _queue: &mut Handle,
        kernel: &MockKernel,
        work_items: u32,
    ) -> Result<(), DispatchError> {
        if self.call(Step::Enqueue) {
            return Err(DispatchError::Enqueue("invalid work size".into()));
        }
        let arg = kernel
            .arg
            .as_ref()
            .ok_or_else(|| DispatchError::Enqueue("argument 0 not set".into()))?;

        let mut data = arg.lock().unwrap();
        for particle in data.iter_mut().take(work_items as usize) {
            particle.position += particle.velocity;
        }
        Ok(())
    }

    fn finish(&mut self, _context: &Handle, _queue: &mut Handle) -> Result<(), DispatchError> {
        if self.call(Step::Finish) {
            return Err(DispatchError::Finish("device lost".into()));
        }
        if let Some(gate) = &self.gate {
            gate.recv()
                .map_err(|_| DispatchError::Finish("gate closed".into()))?;
            self.log.lock().unwrap().push(Event::Unblocked);
        }
        Ok(())
    }

    fn read_buffer(
        &mut self,
        _context: &Handle,
        _queue: &mut Handle,
        buffer: &MockBuffer,
        out: &mut [Particle],
    ) -> Result<(), DispatchError> {
        if self.call(Step::Read) {
            // Scribble over the destination to prove the caller never exposes it.
            out.fill(Particle::new(glam::Vec2::NAN, glam::Vec2::NAN));
            return Err(DispatchError::Readback("transfer failed".into()));
        }
        out.copy_from_slice(&buffer.data.lock().unwrap());
        Ok(())
    }
}

/// A fresh directory holding `moveParticles.wgsl` with `source`.
pub fn kernel_dir(name: &str, source: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "particle_compute-{}-{}",
        std::process::id(),
        name
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(particle_compute::DEFAULT_KERNEL_FILE), source).unwrap();
    dir
}

pub fn loader_for(dir: &PathBuf) -> KernelLoader {
    KernelLoader::new(dir).with_working_dir(dir)
}

pub fn core_with(
    name: &str,
    backend: MockBackend,
    particles: ParticleSet,
) -> ComputeCore<MockBackend> {
    let dir = kernel_dir(name, KERNEL_SOURCE);
    ComputeCore::new(backend, loader_for(&dir), particles)
}
