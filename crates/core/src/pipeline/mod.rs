pub mod frame_slot;
pub mod live_overlay_use_case;
pub mod pipeline_coordinator;
pub mod pipeline_logger;
