use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::web::server::ServerError;
use crate::{config, policy_routing, qos_apply, stores};

const POLICY_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

fn spawn_policy_routing_worker() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POLICY_RECONCILE_INTERVAL);
        loop {
            interval.tick().await;
            tokio::task::spawn_blocking(policy_routing::reconcile)
                .await
                .ok();
        }
    })
}

/// Long-running entrypoint: loads every store, starts the background
/// controllers, then blocks on the HTTP control API.
pub async fn run() -> Result<(), RunError> {
    config::init()?;
    stores::interfaces::init()?;
    stores::portforward::init()?;
    stores::wan::init()?;
    stores::routes::init()?;
    stores::vpn_policy::init()?;
    stores::qos::init()?;

    for (interface, entry) in stores::qos::all() {
        qos_apply::apply(&interface, &entry);
    }

    let agent_config = config::get_config()?;

    let _multiwan = crate::multiwan::spawn();
    let _policy_routing = spawn_policy_routing_worker();

    crate::web::server::run(
        &agent_config.agent.web.address,
        agent_config.agent.web.http,
        agent_config.agent.web.https,
    )
    .await?;
    Ok(())
}
