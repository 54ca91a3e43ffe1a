pub mod layer_compositor;
pub mod overlay_asset;
pub mod overlay_compositor;
pub mod placement;
