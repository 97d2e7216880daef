/**
 * Command dispatcher for the connector protocol.
 *  Validates request parameters into typed commands
 *  and shapes results into protocol responses.
 */
pub mod connector;
/**
 * Filesystem operations on nodes, guarded by
 *  per-volume reader/writer locks.
 */
pub mod fs;
/**
 * Reversible, URL-safe node addressing.
 */
pub mod hash;
/**
 * Virtual files and directories and the
 *  metadata the client sees for them.
 */
pub mod node;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;
/**
 * Registered volumes and the containment-checking
 *  path resolver.
 */
pub mod volume;

pub mod prelude {
    pub use crate::connector::{
        Command, Connector, ConnectorError, ConnectorOptions, ErrorCode, FileResponse, Params,
        Response, UploadedFile,
    };
    pub use crate::fs::{FsError, Filesystem};
    pub use crate::hash::{DecodeError, NodeHash};
    pub use crate::node::{Node, NodeError, NodeInfo};
    pub use crate::version::build_info;
    pub use crate::volume::{
        RegistryError, Volume, VolumeConfig, VolumeError, VolumeRegistry,
    };
}
