use std::sync::Arc;

use crate::compositing::domain::layer_compositor::LayerCompositor;
use crate::compositing::domain::overlay_asset::OverlayAsset;

use super::cpu_layer_compositor::CpuLayerCompositor;
use super::gpu_context::GpuContext;
use super::gpu_layer_compositor::GpuLayerCompositor;

/// Creates the best available layer compositor.
///
/// With `prefer_gpu` set, probes for a wgpu adapter and returns the GPU
/// compositor when one is found; otherwise uses the CPU implementation.
/// Logs which backend is selected.
pub fn create_layer_compositor(asset: OverlayAsset, prefer_gpu: bool) -> Box<dyn LayerCompositor> {
    let (w, h) = (asset.width(), asset.height());
    if prefer_gpu {
        if let Some(ctx) = GpuContext::new() {
            log::info!("Using GPU backend for compositing ({w}x{h} overlay)");
            return Box::new(GpuLayerCompositor::new(Arc::new(ctx), asset));
        }
        log::info!("No GPU available, using CPU backend for compositing ({w}x{h} overlay)");
    } else {
        log::info!("Using CPU backend for compositing ({w}x{h} overlay)");
    }
    Box::new(CpuLayerCompositor::new(asset))
}

/// Returns true if a GPU adapter is available for compute shaders.
pub fn gpu_available() -> bool {
    GpuContext::new().is_some()
}
