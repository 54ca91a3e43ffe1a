pub mod frame_adapter;
pub mod frame_source;
