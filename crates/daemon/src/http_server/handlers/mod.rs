pub mod connector;
mod not_found;
pub mod volume_files;

pub use not_found::not_found_handler;
