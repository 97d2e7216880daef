use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
    // Largest accepted request body, uploads included
    pub body_limit: usize,
    // Mount a file server for every volume with a relative url
    pub serve_volumes: bool,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, body_limit: usize, serve_volumes: bool) -> Self {
        tracing::info!(
            "Creating HTTP server Config: listen_addr={}, body_limit={}, serve_volumes={}",
            listen_addr,
            body_limit,
            serve_volumes
        );
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
            body_limit,
            serve_volumes,
        }
    }
}
