//! Fanout server binary.
//!
//! Wires the demo worker roster onto an in-memory channel, builds the
//! supervisor from environment configuration, and serves the HTTP boundary.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fanout_core::WorkerId;
use fanout_server::{http, AppState, Config};
use fanout_supervisor::{DenyList, RuleDecomposer, Supervisor, WorkerDirectory};
use fanout_transport::InMemoryChannel;
use fanout_worker::{Capability, FarmInventory, OrderDesk, PageSummarizer, WorkerAgent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fanout=info")),
        )
        .init();

    let config = Config::from_env();
    info!(addr = %config.http_bind_addr, "fanout server starting");

    let channel = Arc::new(InMemoryChannel::new());
    spawn_roster(&channel).await;

    let directory = WorkerDirectory::new()
        .register("brazil", "farm", ["brazil"])
        .register("colombia", "farm", ["colombia"])
        .register("vietnam", "farm", ["vietnam"])
        .register("order-desk", "desk", ["order"])
        .register("scraper-0", "scraper", [])
        .register("scraper-1", "scraper", []);

    let mut supervisor = Supervisor::new(
        Arc::clone(&channel) as Arc<dyn fanout_transport::Channel>,
        Arc::new(RuleDecomposer::new(directory, "farm")),
    )
    .with_config(config.run_config());

    if !config.denied_workers.is_empty() {
        info!(denied = ?config.denied_workers, "identity deny-list active");
        supervisor = supervisor.with_authorizer(Arc::new(DenyList::new(
            config.denied_workers.iter().map(|w| WorkerId::new(w.as_str())),
        )));
    }

    let state = AppState::new(supervisor);
    let router = http::create_router(state);

    let listener = TcpListener::bind(&config.http_bind_addr).await?;
    info!(addr = %config.http_bind_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}

/// Attach the demo workers: three farm inventories, an order desk, and two
/// page summarizers behind the scraper role.
async fn spawn_roster(channel: &Arc<InMemoryChannel>) {
    for (region, yield_lbs) in [("brazil", 800u32), ("colombia", 5000), ("vietnam", 3000)] {
        spawn_worker(channel, region, Arc::new(FarmInventory::new(region, yield_lbs))).await;
    }
    spawn_worker(channel, "order-desk", Arc::new(OrderDesk)).await;
    spawn_worker(channel, "scraper-0", Arc::new(PageSummarizer)).await;
    spawn_worker(channel, "scraper-1", Arc::new(PageSummarizer)).await;
}

async fn spawn_worker(channel: &Arc<InMemoryChannel>, id: &str, capability: Arc<dyn Capability>) {
    let mailbox = channel.attach_worker(WorkerId::new(id)).await;
    WorkerAgent::new(id, capability).spawn(mailbox);
    info!(worker = id, "worker attached");
}
