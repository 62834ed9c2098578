/// Number of workgroups of `workgroup_size` needed to cover `items` invocations.
pub fn workgroup_count(items: u32, workgroup_size: u32) -> u32 {
    let remainder = items % workgroup_size;
    let mut count = items / workgroup_size;
    if remainder != 0 {
        count += 1;
    }

    count
}

/// Whether an adapter counts as a GPU-class compute device.
pub fn is_gpu_class(device_type: wgpu::DeviceType) -> bool {
    matches!(
        device_type,
        wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::IntegratedGpu
            | wgpu::DeviceType::VirtualGpu
    )
}

/// Index of the adapter to compute on: the first GPU-class adapter of the
/// backend that enumerated first. Other backends and CPU adapters are never picked.
pub fn select_gpu(infos: &[wgpu::AdapterInfo]) -> Option<usize> {
    let backend = infos.first()?.backend;
    infos
        .iter()
        .position(|info| info.backend == backend && is_gpu_class(info.device_type))
}
