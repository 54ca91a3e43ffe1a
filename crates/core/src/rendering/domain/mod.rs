pub mod draw_target;
pub mod render_surface;
