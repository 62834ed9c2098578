use std::borrow::Cow;

use log::{debug, error, info};
use wgpu::util::DeviceExt;

use crate::{
    backend::ComputeBackend,
    error::{DispatchError, SetupError},
    particle::Particle,
    utils::{select_gpu, workgroup_count},
    WORKGROUP_SIZE,
};

/// Runs the compute steps on wgpu.
///
/// wgpu's async calls are driven on a private current-thread runtime so the
/// caller only ever sees blocking calls.
pub struct WgpuBackend {
    tokio_rt: tokio::runtime::Runtime,
}

pub struct WgpuPlatform {
    pub instance: wgpu::Instance,
    pub backend: wgpu::Backend,
    adapters: Vec<wgpu::Adapter>,
}

pub struct WgpuContext {
    pub device: wgpu::Device,
    queue: Option<wgpu::Queue>,
}

pub struct WgpuQueue {
    pub queue: wgpu::Queue,
    pending: Option<wgpu::SubmissionIndex>,
}

pub struct WgpuKernel {
    pub pipeline: wgpu::ComputePipeline,
    bind_group: Option<wgpu::BindGroup>,
}

pub struct WgpuBuffer {
    pub storage: wgpu::Buffer,
    staging: wgpu::Buffer,
}

impl WgpuBackend {
    pub fn new() -> std::io::Result<Self> {
        let tokio_rt = tokio::runtime::Builder::new_current_thread().build()?;
        Ok(Self { tokio_rt })
    }

    fn pop_error(&self, device: &wgpu::Device) -> Option<wgpu::Error> {
        self.tokio_rt.block_on(device.pop_error_scope())
    }
}

impl ComputeBackend for WgpuBackend {
    type Platform = WgpuPlatform;
    type Device = wgpu::Adapter;
    type Context = WgpuContext;
    type Queue = WgpuQueue;
    type Program = wgpu::ShaderModule;
    type Kernel = WgpuKernel;
    type Buffer = WgpuBuffer;

    fn platform(&mut self) -> Result<WgpuPlatform, SetupError> {
        let instance = wgpu::Instance::default();

        let adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::all())
            .into_iter()
            .collect();
        let backend = match adapters.first() {
            Some(adapter) => adapter.get_info().backend,
            None => {
                return Err(SetupError::Platform(
                    "no backend exposes an adapter".into(),
                ))
            }
        };
        debug!("Platform {:?} with {} adapter(s)", backend, adapters.len());

        Ok(WgpuPlatform {
            instance,
            backend,
            adapters,
        })
    }

    fn gpu_device(&mut self, platform: &mut WgpuPlatform) -> Result<wgpu::Adapter, SetupError> {
        let infos: Vec<wgpu::AdapterInfo> = platform
            .adapters
            .iter()
            .map(|adapter| adapter.get_info())
            .collect();
        let index = select_gpu(&infos).ok_or_else(|| {
            SetupError::Device(format!("no GPU-class device on {:?}", platform.backend))
        })?;

        let adapter = platform.adapters.remove(index);
        let adapter_info = adapter.get_info();
        info!(
            "Using {} ({:?}, {:?})",
            adapter_info.name, adapter_info.device_type, adapter_info.backend
        );

        Ok(adapter)
    }

    fn create_context(&mut self, adapter: &wgpu::Adapter) -> Result<WgpuContext, SetupError> {
        let (device, queue) = self
            .tokio_rt
            .block_on(adapter.request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Compute Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            ))
            .map_err(|err| SetupError::Context(err.to_string()))?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            error!("Uncaptured wgpu error: {}", err)
        }));

        Ok(WgpuContext {
            device,
            queue: Some(queue),
        })
    }

    fn create_queue(&mut self, context: &mut WgpuContext) -> Result<WgpuQueue, SetupError> {
        // wgpu hands out exactly one queue together with the device.
        let queue = context
            .queue
            .take()
            .ok_or_else(|| SetupError::Queue("queue already claimed".into()))?;

        Ok(WgpuQueue {
            queue,
            pending: None,
        })
    }

    fn build_program(
        &mut self,
        context: &WgpuContext,
        source: &str,
    ) -> Result<wgpu::ShaderModule, SetupError> {
        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = context
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Particle Kernel"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            });

        match self.pop_error(&context.device) {
            Some(err) => Err(SetupError::Program {
                log: err.to_string(),
            }),
            None => Ok(module),
        }
    }

    fn create_kernel(
        &mut self,
        context: &WgpuContext,
        program: &wgpu::ShaderModule,
        entry_point: &str,
    ) -> Result<WgpuKernel, SetupError> {
        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = context
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Particle Pipeline"),
                layout: None,
                module: program,
                entry_point,
            });

        match self.pop_error(&context.device) {
            Some(err) => Err(SetupError::KernelNotFound {
                entry_point: entry_point.to_owned(),
                reason: err.to_string(),
            }),
            None => Ok(WgpuKernel {
                pipeline,
                bind_group: None,
            }),
        }
    }

    fn create_buffer(
        &mut self,
        context: &WgpuContext,
        particles: &[Particle],
    ) -> Result<WgpuBuffer, SetupError> {
        let size = std::mem::size_of_val(particles) as u64;
        let limit = context.device.limits().max_storage_buffer_binding_size as u64;
        if size > limit {
            return Err(SetupError::BufferAllocation(format!(
                "{} bytes exceeds the storage binding limit of {} bytes",
                size, limit
            )));
        }

        context.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let storage = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Buffer"),
                contents: bytemuck::cast_slice(particles),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });
        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let validation = self.pop_error(&context.device);
        let out_of_memory = self.pop_error(&context.device);
        if let Some(err) = validation.or(out_of_memory) {
            return Err(SetupError::BufferAllocation(err.to_string()));
        }

        Ok(WgpuBuffer { storage, staging })
    }

    fn buffer_size(&self, buffer: &WgpuBuffer) -> u64 {
        buffer.storage.size()
    }

    fn set_kernel_arg(
        &mut self,
        context: &WgpuContext,
        kernel: &mut WgpuKernel,
        buffer: &WgpuBuffer,
    ) -> Result<(), DispatchError> {
        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Bind Group"),
            layout: &kernel.pipeline.get_bind_group_layout(0),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.storage.as_entire_binding(),
            }],
        });

        if let Some(err) = self.pop_error(&context.device) {
            return Err(DispatchError::SetArgument(err.to_string()));
        }

        kernel.bind_group = Some(bind_group);
        Ok(())
    }

    fn enqueue(
        &mut self,
        context: &WgpuContext,
        queue: &mut WgpuQueue,
        kernel: &WgpuKernel,
        work_items: u32,
    ) -> Result<(), DispatchError> {
        let bind_group = kernel
            .bind_group
            .as_ref()
            .ok_or_else(|| DispatchError::Enqueue("kernel argument 0 is not set".into()))?;

        let work_group_count = workgroup_count(work_items, WORKGROUP_SIZE);
        let max_groups = context.device.limits().max_compute_workgroups_per_dimension;
        if work_group_count > max_groups {
            return Err(DispatchError::Enqueue(format!(
                "{} workgroups exceeds the device limit of {}",
                work_group_count, max_groups
            )));
        }

        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Dispatch"),
            });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            });

            cpass.set_pipeline(&kernel.pipeline);
            cpass.set_bind_group(0, bind_group, &[]);
            cpass.dispatch_workgroups(work_group_count, 1, 1);
        }
        let index = queue.queue.submit(Some(encoder.finish()));

        if let Some(err) = self.pop_error(&context.device) {
            return Err(DispatchError::Enqueue(err.to_string()));
        }

        queue.pending = Some(index);
        Ok(())
    }

    fn finish(
        &mut self,
        context: &WgpuContext,
        queue: &mut WgpuQueue,
    ) -> Result<(), DispatchError> {
        let maintain = match queue.pending.take() {
            Some(index) => wgpu::Maintain::WaitForSubmissionIndex(index),
            None => wgpu::Maintain::Wait,
        };

        // Device loss inside `poll` is fatal in wgpu; an unfinished queue is not.
        if !context.device.poll(maintain).is_queue_empty() {
            return Err(DispatchError::Finish(
                "queue still has work after waiting".into(),
            ));
        }
        Ok(())
    }

    fn read_buffer(
        &mut self,
        context: &WgpuContext,
        queue: &mut WgpuQueue,
        buffer: &WgpuBuffer,
        out: &mut [Particle],
    ) -> Result<(), DispatchError> {
        let size = buffer.staging.size();
        if std::mem::size_of_val(out) as u64 != size {
            return Err(DispatchError::Readback(format!(
                "host array holds {} bytes, device buffer {}",
                std::mem::size_of_val(out),
                size
            )));
        }

        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Readback"),
            });
        encoder.copy_buffer_to_buffer(&buffer.storage, 0, &buffer.staging, 0, size);
        queue.queue.submit(Some(encoder.finish()));

        // A rejected copy leaves stale staging contents that would still map fine.
        if let Some(err) = self.pop_error(&context.device) {
            return Err(DispatchError::Readback(err.to_string()));
        }

        let slice = buffer.staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });

        context.device.poll(wgpu::Maintain::wait());
        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                bytemuck::cast_slice_mut::<Particle, u8>(out).copy_from_slice(&data);

                drop(data);
                buffer.staging.unmap();
                Ok(())
            }
            Ok(Err(err)) => Err(DispatchError::Readback(err.to_string())),
            Err(_) => Err(DispatchError::Readback("map callback was dropped".into())),
        }
    }
}
