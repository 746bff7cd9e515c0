pub mod projection_join_test;
pub mod projection_window_test;
pub mod select_projection_test;
