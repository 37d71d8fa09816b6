use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::Builder;
use tracing::{debug, error, info, info_span, warn};
use crate::config::Config;
use self::file_system::FileSystemAdapter;
use self::handlers::{handle_client, report};
use self::http::ParseOptions;

struct Shared {
    adapter: FileSystemAdapter,
    options: ParseOptions,
    config: Config
}

/// Accepts connections forever, one thread per connection.
///
/// `config.port` must already be the port `listener` is bound to.
pub fn serve(listener: TcpListener, config: Config) {
    let shared = Arc::new(Shared {
        adapter: FileSystemAdapter::new(&config),
        options: ParseOptions::from_config(&config),
        config
    });
    info!("Serving {}", shared.adapter.root().display());

    for stream_ref in listener.incoming() {
        match stream_ref {
            Ok(stream) => {
                let local_rc = Arc::clone(&shared);
                let spawned = Builder::new()
                    .name("connection".to_string())
                    .spawn(move || handle_connection(stream, &local_rc));
                if let Err(e) = spawned {
                    error!("Error spawning handler:{}", e);
                }
            },
            Err(e) => warn!("Error with stream:{}", e)
        }
    }
}

fn handle_connection(stream: TcpStream, shared: &Shared) {
    let peer = stream.peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let span = info_span!("connection", %peer);
    let _entered = span.enter();
    debug!("connection opened");

    if let Err(e) = stream.set_read_timeout(shared.config.read_timeout) {
        warn!("Error setting read timeout:{}", e);
    }
    report(handle_client(stream, &shared.adapter, &shared.options));

    debug!("connection closed");
}

pub mod http;
pub mod content_manager;
pub mod file_system;
pub mod cgi;
pub mod handlers;
