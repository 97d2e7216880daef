pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Daemon, Health, Init, Ls, Version};
