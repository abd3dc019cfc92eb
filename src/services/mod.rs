pub mod duration;
pub mod log_form;
pub mod log_list;
pub mod session;
pub mod submit_guard;
