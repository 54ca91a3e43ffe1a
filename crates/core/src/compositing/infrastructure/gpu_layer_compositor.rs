use std::cell::RefCell;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::compositing::domain::layer_compositor::LayerCompositor;
use crate::compositing::domain::overlay_asset::OverlayAsset;
use crate::compositing::domain::placement::Translation;
use crate::shared::frame::Frame;
use crate::shared::geometry::Extent;

use super::gpu_context::{
    map_for_read, pack_window, unpack_window, GpuCompositeParams, GpuContext, WORKGROUP_SIZE,
};

/// Per-call buffers, reused across frames and grown on demand.
struct Scratch {
    capacity: usize,
    window_buf: wgpu::Buffer,
    staging_buf: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// GPU source-atop compositor using a wgpu compute shader.
///
/// The overlay asset is uploaded once at construction and stays resident.
/// Each call uploads only the background window the overlay covers, blends
/// it on the GPU and writes it back into a copy of the background.
pub struct GpuLayerCompositor {
    ctx: Arc<GpuContext>,
    asset: OverlayAsset,
    overlay_buf: wgpu::Buffer,
    params_buf: wgpu::Buffer,
    scratch: RefCell<Option<Scratch>>,
    packed: RefCell<Vec<u32>>,
}

impl GpuLayerCompositor {
    pub fn new(ctx: Arc<GpuContext>, asset: OverlayAsset) -> Self {
        let overlay_buf = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("overlay"),
            contents: bytemuck::cast_slice(&asset.packed()),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let params_buf = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("composite-params"),
            size: std::mem::size_of::<GpuCompositeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            ctx,
            asset,
            overlay_buf,
            params_buf,
            scratch: RefCell::new(None),
            packed: RefCell::new(Vec::new()),
        }
    }

    fn ensure_scratch(&self, pixels: usize) {
        let mut scratch = self.scratch.borrow_mut();
        if scratch.as_ref().is_some_and(|s| s.capacity >= pixels) {
            return;
        }

        let size = (pixels * 4) as u64;
        let window_buf = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("background-window"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buf = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite-bind-group"),
            layout: &self.ctx.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.overlay_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: window_buf.as_entire_binding(),
                },
            ],
        });

        *scratch = Some(Scratch {
            capacity: pixels,
            window_buf,
            staging_buf,
            bind_group,
        });
    }
}

impl LayerCompositor for GpuLayerCompositor {
    fn asset(&self) -> &OverlayAsset {
        &self.asset
    }

    fn source_atop(
        &self,
        background: &Frame,
        at: Translation,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut out = background.clone();
        let overlay_extent = Extent::new(self.asset.width(), self.asset.height());
        let Some(window) = at.clip(overlay_extent, background.extent()) else {
            return Ok(out);
        };

        let fw = background.width() as usize;
        let channels = background.channels() as usize;
        let (wx, wy) = (window.background_x as usize, window.background_y as usize);
        let (ww, wh) = (window.width as usize, window.height as usize);
        let pixels = ww * wh;
        let byte_len = (pixels * 4) as u64;

        self.ensure_scratch(pixels);
        let scratch = self.scratch.borrow();
        let scratch = scratch.as_ref().ok_or("GPU scratch buffers unavailable")?;

        let mut packed = self.packed.borrow_mut();
        pack_window(background.data(), fw, channels, wx, wy, ww, wh, &mut packed);

        // The window buffer is addressed as a standalone image of the window size.
        let params = GpuCompositeParams {
            bg_width: window.width,
            bg_height: window.height,
            overlay_width: self.asset.width(),
            overlay_x: window.overlay_x,
            overlay_y: window.overlay_y,
            background_x: 0,
            background_y: 0,
            window_width: window.width,
            window_height: window.height,
            ..Default::default()
        };
        self.ctx
            .queue
            .write_buffer(&self.params_buf, 0, bytemuck::bytes_of(&params));
        self.ctx
            .queue
            .write_buffer(&scratch.window_buf, 0, bytemuck::cast_slice(&packed));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("composite-encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("source-atop"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.ctx.pipeline);
            pass.set_bind_group(0, &scratch.bind_group, &[]);
            pass.dispatch_workgroups(
                window.width.div_ceil(WORKGROUP_SIZE),
                window.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&scratch.window_buf, 0, &scratch.staging_buf, 0, byte_len);
        self.ctx.queue.submit(Some(encoder.finish()));

        // Read back results
        let slice = scratch.staging_buf.slice(..byte_len);
        map_for_read(&self.ctx.device, slice)?;

        {
            let mapped = slice.get_mapped_range();
            let result: &[u32] = bytemuck::cast_slice(&mapped);
            unpack_window(out.data_mut(), result, fw, channels, wx, wy, ww, wh);
        }
        scratch.staging_buf.unmap();

        Ok(out)
    }
}
