pub mod compositor_factory;
pub mod cpu_layer_compositor;
pub mod gpu_context;
pub mod gpu_layer_compositor;
pub mod overlay_asset_loader;
