//! Multi-WAN Controller: periodic health probing plus failover / load-balance
//! default-route installation. Runs as a background task started from
//! `commands::agent::run`.

use std::sync::Mutex;
use std::time::Duration;

use once_cell::sync::Lazy;
use softrouter_lib::types::wan::{LinkState, WanLink, WanMode, WanStore};

use crate::executor;
use crate::stores;

const TICK_INTERVAL: Duration = Duration::from_secs(10);
const PING_TIMEOUT_SECS: &str = "2";

/// (gateway, interface) of the default route this controller last
/// installed in failover mode, so a tick that finds the same winning
/// link doesn't re-issue an identical `ip route replace`.
static INSTALLED_FAILOVER_ROUTE: Lazy<Mutex<Option<(String, String)>>> =
    Lazy::new(|| Mutex::new(None));

fn probe(link: &WanLink) -> LinkState {
    let args = [
        "ping",
        "-I",
        link.interface.as_str(),
        "-c",
        "1",
        "-W",
        PING_TIMEOUT_SECS,
        link.check_target.as_str(),
    ];
    match executor::run(&args) {
        Ok(_) => LinkState::Online,
        Err(_) => LinkState::Offline,
    }
}

/// Chooses the link to route through in failover mode: enabled, online,
/// lowest `priority`. `None` if no link qualifies.
pub fn select_failover_link(store: &WanStore) -> Option<&WanLink> {
    store
        .online_enabled()
        .min_by_key(|l| l.priority)
}

/// Installs the default route through `link`, skipping the call
/// entirely when it already points at the same gateway/interface.
fn install_failover_route(link: &WanLink) {
    let current = (link.gateway.clone(), link.interface.clone());
    {
        let mut installed = INSTALLED_FAILOVER_ROUTE
            .lock()
            .expect("installed failover route mutex poisoned");
        if installed.as_ref() == Some(&current) {
            return;
        }
        *installed = Some(current);
    }
    executor::run_best_effort(&[
        "ip",
        "route",
        "replace",
        "default",
        "via",
        &link.gateway,
        "dev",
        &link.interface,
    ]);
}

fn install_load_balance_routes(links: &[&WanLink]) {
    if links.is_empty() {
        return;
    }
    let mut args: Vec<String> = vec![
        "route".into(),
        "replace".into(),
        "default".into(),
        "scope".into(),
        "global".into(),
    ];
    for link in links {
        args.push("nexthop".into());
        args.push("via".into());
        args.push(link.gateway.clone());
        args.push("dev".into());
        args.push(link.interface.clone());
        args.push("weight".into());
        args.push(link.weight.to_string());
    }
    let arg_refs: Vec<&str> = std::iter::once("ip")
        .chain(args.iter().map(|s| s.as_str()))
        .collect();
    executor::run_best_effort(&arg_refs);
}

async fn tick() {
    let mut store = stores::wan::get();

    for link in store.interfaces.iter_mut() {
        if !link.enabled {
            continue;
        }
        let link_clone = link.clone();
        let state = tokio::task::spawn_blocking(move || probe(&link_clone))
            .await
            .unwrap_or(LinkState::Unknown);
        if state != link.observed_state {
            log::info!(
                "WAN link {} transitioned {:?} -> {:?}",
                link.interface,
                link.observed_state,
                state
            );
        }
        link.observed_state = state;
    }

    if let Err(e) = stores::wan::replace(store.clone()) {
        log::warn!("failed to persist WAN health state: {}", e);
    }

    match store.mode {
        WanMode::Failover => {
            if let Some(link) = select_failover_link(&store) {
                install_failover_route(link);
            }
        }
        WanMode::LoadBalance => {
            *INSTALLED_FAILOVER_ROUTE
                .lock()
                .expect("installed failover route mutex poisoned") = None;
            let online: Vec<&WanLink> = store.online_enabled().collect();
            install_load_balance_routes(&online);
        }
    }
}

/// Runs a single probe-and-route round outside the regular cadence, for
/// callers (the `/api/wan` handler) that want the new link set evaluated
/// immediately instead of waiting for the next tick.
pub fn trigger_probe() {
    tokio::spawn(tick());
}

/// Spawns the controller's periodic loop. Stops only when the process
/// exits; in-flight probes when that happens are discarded, never
/// awaited to completion.
pub fn spawn() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            tick().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(interface: &str, priority: u16, state: LinkState) -> WanLink {
        WanLink {
            interface: interface.into(),
            display_name: String::new(),
            gateway: "10.0.0.1".into(),
            check_target: "1.1.1.1".into(),
            priority,
            weight: 1,
            enabled: true,
            observed_state: state,
        }
    }

    #[test]
    fn failover_picks_lowest_priority_online_link() {
        let store = WanStore {
            mode: WanMode::Failover,
            interfaces: vec![
                link("wan0", 2, LinkState::Online),
                link("wan1", 1, LinkState::Online),
                link("wan2", 0, LinkState::Offline),
            ],
        };
        let chosen = select_failover_link(&store).unwrap();
        assert_eq!(chosen.interface, "wan1");
    }

    #[test]
    fn failover_returns_none_when_all_offline() {
        let store = WanStore {
            mode: WanMode::Failover,
            interfaces: vec![link("wan0", 1, LinkState::Offline)],
        };
        assert!(select_failover_link(&store).is_none());
    }

    #[test]
    fn install_failover_route_tracks_last_installed_gateway() {
        let a = link("wan0", 0, LinkState::Online);
        install_failover_route(&a);
        assert_eq!(
            *INSTALLED_FAILOVER_ROUTE
                .lock()
                .unwrap(),
            Some((a.gateway.clone(), a.interface.clone()))
        );

        let mut b = a.clone();
        b.interface = "wan1".into();
        install_failover_route(&b);
        assert_eq!(
            *INSTALLED_FAILOVER_ROUTE.lock().unwrap(),
            Some((b.gateway.clone(), b.interface.clone()))
        );
    }

    #[test]
    fn disabled_links_are_never_selected() {
        let mut l = link("wan0", 1, LinkState::Online);
        l.enabled = false;
        let store = WanStore {
            mode: WanMode::Failover,
            interfaces: vec![l, link("wan1", 5, LinkState::Online)],
        };
        let chosen = select_failover_link(&store).unwrap();
        assert_eq!(chosen.interface, "wan1");
    }
}
