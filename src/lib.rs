use std::io;
use std::net::{IpAddr, TcpListener};
use std::path::PathBuf;
use std::thread::{Builder, JoinHandle};
use thiserror::Error;
use tracing::info;

pub mod config;
pub mod scaffold;
pub mod server;

pub use config::Config;

pub struct ServerHandle {
    pub ip: IpAddr, pub port: u16, pub handle: JoinHandle<()>
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Root path does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("Error on bind {address}:{source}")]
    Bind { address: String, source: io::Error },
    #[error("Error starting listener thread:{0}")]
    Spawn(#[source] io::Error)
}

/// Binds the configured address and runs the accept loop on its own thread.
///
/// Binding port 0 picks a free port; it is reported in the handle and passed
/// to delegated programs.
pub fn start_server(mut config: Config) -> Result<ServerHandle, ServerError> {
    if !config.web_root.exists() {
        return Err(ServerError::MissingRoot(config.web_root));
    }

    let address = config.address();
    let listener = TcpListener::bind(&address)
        .map_err(|source| ServerError::Bind { address: address.clone(), source })?;
    let local = listener.local_addr()
        .map_err(|source| ServerError::Bind { address, source })?;
    config.port = local.port();
    info!("Listening on {} (root={})", local, config.web_root.display());

    let handle = Builder::new()
        .name("listener".to_string())
        .spawn(move || server::serve(listener, config))
        .map_err(ServerError::Spawn)?;
    Ok(ServerHandle { ip: local.ip(), port: local.port(), handle })
}
