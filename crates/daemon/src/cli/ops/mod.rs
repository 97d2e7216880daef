pub mod daemon;
pub mod health;
pub mod init;
pub mod ls;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use ls::Ls;
pub use version::Version;
