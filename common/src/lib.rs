pub mod file_format;
pub mod log_setup;
pub mod parallel;
