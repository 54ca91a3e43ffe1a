use std::error::Error;
use std::sync::Arc;

use crossbeam_channel::Receiver;

/// Shared GPU context for compositing.
///
/// Holds the wgpu device, queue and the source-atop compute pipeline so
/// they are created once at startup and reused for every frame.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Packed params matching the WGSL uniform layout (48 bytes, 12 x u32).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuCompositeParams {
    pub bg_width: u32,
    pub bg_height: u32,
    pub overlay_width: u32,
    pub overlay_x: u32,
    pub overlay_y: u32,
    pub background_x: u32,
    pub background_y: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

pub const WORKGROUP_SIZE: u32 = 16;

impl GpuContext {
    /// Create a new GPU context. Returns `None` if no suitable adapter is available.
    pub fn new() -> Option<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("composite-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .ok()?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("source-atop-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/source_atop.wgsl").into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite-bind-group-layout"),
            entries: &[
                // params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // overlay (read)
                storage(1, true),
                // background window (read-write)
                storage(2, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("composite-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Some(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }
}

/// Pack a rectangular window of an RGB/RGBA buffer into RGBA `u32`s.
/// RGB sources get an opaque alpha.
#[allow(clippy::too_many_arguments)]
pub fn pack_window(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    out: &mut Vec<u32>,
) {
    out.clear();
    out.reserve(w * h);
    for row in 0..h {
        let start = ((y + row) * frame_width + x) * channels;
        for px in data[start..start + w * channels].chunks_exact(channels) {
            let a = if channels == 4 { px[3] } else { 255 };
            out.push(u32::from_le_bytes([px[0], px[1], px[2], a]));
        }
    }
}

/// Write packed RGBA `u32`s back into a window of an RGB/RGBA buffer.
#[allow(clippy::too_many_arguments)]
pub fn unpack_window(
    data: &mut [u8],
    packed: &[u32],
    frame_width: usize,
    channels: usize,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) {
    for row in 0..h {
        let start = ((y + row) * frame_width + x) * channels;
        let dst = &mut data[start..start + w * channels];
        for (px, &value) in dst.chunks_exact_mut(channels).zip(&packed[row * w..(row + 1) * w]) {
            let bytes = value.to_le_bytes();
            px.copy_from_slice(&bytes[..channels]);
        }
    }
}

/// Map a staging slice for reading and block until the GPU is done with it.
pub fn map_for_read(device: &wgpu::Device, slice: wgpu::BufferSlice<'_>) -> Result<(), Box<dyn Error>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    mapping_outcome(&rx)
}

fn mapping_outcome(rx: &Receiver<Result<(), wgpu::BufferAsyncError>>) -> Result<(), Box<dyn Error>> {
    match rx.try_recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("GPU readback mapping failed: {e}").into()),
        Err(_) => Err("GPU readback mapping never completed".into()),
    }
}
