pub mod capture;
pub mod compositing;
pub mod detection;
pub mod pipeline;
pub mod rendering;
pub mod shared;
