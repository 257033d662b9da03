//! Two "nodes" sharing sessions through one store.
//!
//! Each simulated request lands on whichever node is next in line, the
//! way a round-robin load balancer would spread them. The visit counter
//! keeps climbing because every node reads and writes the same remote
//! hash.
//!
//! ```text
//! cargo run -p visit-counter              # needs Redis on localhost:6379
//! cargo run -p visit-counter -- --memory  # shared in-process store
//! RSM_REDIS_HOST=redis.internal cargo run -p visit-counter
//! ```

use std::sync::Arc;

use rsm::prelude::*;
use serde::{Deserialize, Serialize};

const REQUESTS: usize = 6;

// ---------------------------------------------------------------------------
// Session payload
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct Visits {
    count: u64,
    last_node: String,
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

/// One request: find (or create) the session, bump the counter.
async fn handle_request<S: SessionStore>(
    node: &str,
    manager: &SessionManager<S>,
    cookie: Option<&str>,
) -> Result<String, RsmError> {
    let found = match cookie {
        Some(id) => manager.find_session(id).await?,
        None => None,
    };
    let mut session = match found {
        Some(session) => session,
        None => manager.create_session(None).await?,
    };
    manager.access(&mut session).await?;

    let mut visits: Visits = session.attribute_as("visits").await?.unwrap_or_default();
    visits.count += 1;
    visits.last_node = node.to_string();
    session.set_attribute_as("visits", &visits).await?;
    session.end_access();

    tracing::info!(node, session_id = %session.id(), count = visits.count, "request served");
    Ok(session.id().to_string())
}

async fn run<S: SessionStore>(nodes: [(&str, SessionManager<S>); 2]) -> Result<(), RsmError> {
    let mut cookie: Option<String> = None;

    for i in 0..REQUESTS {
        let (name, manager) = &nodes[i % nodes.len()];
        let id = handle_request(name, manager, cookie.as_deref()).await?;
        cookie = Some(id);
    }

    // Log out from the node that did NOT create the session.
    if let Some(id) = cookie {
        let (name, manager) = &nodes[1];
        manager.remove_session_by_id(&id).await?;
        tracing::info!(node = *name, session_id = %id, "logged out");

        let gone = nodes[0].1.find_session(&id).await?.is_none();
        tracing::info!(gone, "session visible from node-a after logout");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    rsm::logging::init();

    let use_memory = std::env::args().any(|arg| arg == "--memory");
    let mut config = RsmConfig::default();
    config.store.key_prefix = "visit-counter:".into();
    if let Ok(host) = std::env::var("RSM_REDIS_HOST") {
        config.store.host = host;
    }

    let result = if use_memory {
        let store = Arc::new(MemoryStore::new());
        match (
            config.clone().build_with_store(store.clone()),
            config.build_with_store(store),
        ) {
            (Ok(a), Ok(b)) => run([("node-a", a), ("node-b", b)]).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    } else {
        // Separate stores, separate pools: two independent clients of
        // the same Redis server.
        match (config.clone().build(), config.build()) {
            (Ok(a), Ok(b)) => run([("node-a", a), ("node-b", b)]).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, unavailable = e.is_store_unavailable(), "demo failed");
        std::process::exit(1);
    }
}
