//! TCP ingress: one listener per configured gate.
//!
//! The gate owns the listening socket and protocol admission only. Accepted
//! connections are handed to the matching protocol loop without pre-reading
//! the stream — any peek here would corrupt stream-based protocols. Modbus
//! is the implicit protocol of a gate that enables it; a gate that enables
//! only raw ingest routes every connection to the ingest loop.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use authority::Authority;
use memcore::Store;

use crate::config::ListenerConfig;
use crate::error::Result;
use crate::transport::{modbus, rawingest};

/// Protocol selected for an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Modbus,
    RawIngest,
}

fn classify(gate: &ListenerConfig) -> Protocol {
    if gate.protocols.modbus {
        Protocol::Modbus
    } else {
        Protocol::RawIngest
    }
}

/// Bind the gate's listener and serve it forever.
pub async fn serve_gate(
    gate: ListenerConfig,
    store: Arc<Store>,
    auth: Arc<Authority>,
) -> Result<()> {
    let listener = TcpListener::bind(&gate.listen).await?;
    info!("ingress {} listening on {}", gate.id, gate.listen);

    run_gate(listener, gate, store, auth).await
}

/// Accept loop over an already-bound listener. Split from [`serve_gate`] so
/// tests can bind an ephemeral port first.
pub async fn run_gate(
    listener: TcpListener,
    gate: ListenerConfig,
    store: Arc<Store>,
    auth: Arc<Authority>,
) -> Result<()> {
    let protocol = classify(&gate);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("ingress {}: accept error: {e}", gate.id);
                continue;
            }
        };

        let store = Arc::clone(&store);
        let auth = Arc::clone(&auth);

        tokio::spawn(async move {
            handle(protocol, stream, store, auth).await;
        });

        tracing::debug!("ingress {}: accepted {peer} as {protocol:?}", gate.id);
    }
}

async fn handle(protocol: Protocol, stream: TcpStream, store: Arc<Store>, auth: Arc<Authority>) {
    match protocol {
        Protocol::Modbus => modbus::handle_connection(stream, store, auth).await,
        Protocol::RawIngest => rawingest::handle_connection(stream, store).await,
    }
}
