pub mod scaled_buffer_target;
