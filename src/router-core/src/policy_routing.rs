//! Policy-based routing for the VPN uplink (table 100 / `tun1`).
//!
//! Reconciliation uses a rebuild-don't-diff protocol: every call deletes
//! all rules pointing at the table, then re-adds from the current policy
//! set. Avoids tracking rule identity at the cost of O(n) churn, which is
//! acceptable because policies number in the tens.

use softrouter_lib::types::vpn_policy::{VpnPolicy, VPN_POLICY_TABLE, VPN_TUNNEL_INTERFACE};

use crate::executor;
use crate::stores;

fn tunnel_is_up() -> bool {
    executor::run(&["ip", "link", "show", VPN_TUNNEL_INTERFACE])
        .map(|out| {
            let text = String::from_utf8_lossy(&out.stdout);
            text.contains("UP") || text.contains("LOWER_UP")
        })
        .unwrap_or(false)
}

fn flush_table_rules() {
    let table = VPN_POLICY_TABLE.to_string();
    while executor::run(&["ip", "rule", "del", "lookup", &table]).is_ok() {}
}

fn install_default_route() {
    executor::run_best_effort(&[
        "ip",
        "route",
        "replace",
        "default",
        "dev",
        VPN_TUNNEL_INTERFACE,
        "table",
        &VPN_POLICY_TABLE.to_string(),
    ]);
}

fn install_policy_rule(policy: &VpnPolicy) {
    executor::run_best_effort(&[
        "ip",
        "rule",
        "add",
        "from",
        &policy.source,
        "lookup",
        &VPN_POLICY_TABLE.to_string(),
    ]);
}

/// Rebuilds table-100 routing and its `ip rule`s from scratch. Idempotent:
/// calling twice in a row with unchanged state is a no-op on the kernel
/// after the first call's churn settles.
pub fn reconcile() {
    flush_table_rules();

    if !tunnel_is_up() {
        log::debug!("VPN tunnel {} is down; policy routing left empty", VPN_TUNNEL_INTERFACE);
        return;
    }

    let policies = stores::vpn_policy::all();
    install_default_route();
    for policy in &policies {
        install_policy_rule(policy);
    }
    executor::run_best_effort(&["ip", "route", "flush", "cache"]);
    log::info!(
        "policy routing reconciled: {} polic{} active",
        policies.len(),
        if policies.len() == 1 { "y" } else { "ies" }
    );
}
