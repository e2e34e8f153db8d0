//! QoS Applier: CAKE egress shaping plus an IFB-redirect for ingress
//! shaping, since `tc` has no native ingress qdisc with queueing.

use softrouter_lib::types::qos::{QosEntry, QosMode};

use crate::executor;

fn ifb_name(interface: &str) -> String {
    format!("ifb4{interface}")
}

/// Idempotent best-effort teardown, run before every apply so re-applying
/// a changed config never leaves stale qdiscs/devices behind.
pub fn remove(interface: &str) {
    executor::run_best_effort(&["tc", "qdisc", "del", "dev", interface, "root"]);
    executor::run_best_effort(&["tc", "qdisc", "del", "dev", interface, "ingress"]);
    executor::run_best_effort(&["ip", "link", "del", &ifb_name(interface)]);
}

pub fn apply(interface: &str, entry: &QosEntry) {
    remove(interface);

    match entry.mode {
        QosMode::None => {
            log::info!("QoS disabled on {interface}");
        }
        QosMode::Cake => {
            apply_egress_cake(interface, entry);
            apply_ingress_redirect_cake(interface, entry);
        }
        QosMode::Htb => {
            apply_egress_htb(interface, entry);
            apply_ingress_redirect_htb(interface, entry);
        }
    }
}

fn apply_egress_cake(interface: &str, entry: &QosEntry) {
    let mut args = vec![
        "tc".to_string(),
        "qdisc".into(),
        "add".into(),
        "dev".into(),
        interface.into(),
        "root".into(),
        "cake".into(),
        "bandwidth".into(),
        entry.upload_rate.clone(),
        "besteffort".into(),
    ];
    if let Some(overhead) = entry.overhead_bytes {
        args.push("overhead".into());
        args.push(overhead.to_string());
    }
    let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    if let Err(e) = executor::run(&refs) {
        log::warn!("failed to apply egress CAKE on {interface}: {e}");
    }
}

/// Creates the IFB device and redirects ingress traffic on `interface`
/// into it. Shared by the CAKE and HTB ingress paths; the caller attaches
/// whichever root qdisc matches the configured mode afterward.
fn setup_ifb_redirect(interface: &str) -> String {
    let ifb = ifb_name(interface);
    executor::run_best_effort(&["ip", "link", "add", &ifb, "type", "ifb"]);
    executor::run_best_effort(&["ip", "link", "set", &ifb, "up"]);
    executor::run_best_effort(&["tc", "qdisc", "add", "dev", interface, "ingress"]);
    executor::run_best_effort(&[
        "tc",
        "filter",
        "add",
        "dev",
        interface,
        "parent",
        "ffff:",
        "matchall",
        "action",
        "mirred",
        "egress",
        "redirect",
        "dev",
        &ifb,
    ]);
    ifb
}

fn apply_ingress_redirect_cake(interface: &str, entry: &QosEntry) {
    let ifb = setup_ifb_redirect(interface);
    if let Err(e) = executor::run(&[
        "tc",
        "qdisc",
        "add",
        "dev",
        &ifb,
        "root",
        "cake",
        "bandwidth",
        &entry.download_rate,
        "besteffort",
    ]) {
        log::warn!("failed to apply ingress CAKE on {ifb}: {e}");
    }
}

fn apply_egress_htb(interface: &str, entry: &QosEntry) {
    executor::run_best_effort(&[
        "tc", "qdisc", "add", "dev", interface, "root", "handle", "1:", "htb", "default", "10",
    ]);
    if let Err(e) = executor::run(&[
        "tc", "class", "add", "dev", interface, "parent", "1:", "classid", "1:10", "htb", "rate",
        &entry.upload_rate, "ceil", &entry.upload_rate,
    ]) {
        log::warn!("failed to apply egress HTB class on {interface}: {e}");
    }
}

fn apply_ingress_redirect_htb(interface: &str, entry: &QosEntry) {
    let ifb = setup_ifb_redirect(interface);
    executor::run_best_effort(&[
        "tc", "qdisc", "add", "dev", &ifb, "root", "handle", "1:", "htb", "default", "10",
    ]);
    if let Err(e) = executor::run(&[
        "tc", "class", "add", "dev", &ifb, "parent", "1:", "classid", "1:10", "htb", "rate",
        &entry.download_rate, "ceil", &entry.download_rate,
    ]) {
        log::warn!("failed to apply ingress HTB class on {ifb}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifb_name_is_prefixed_and_stable() {
        assert_eq!(ifb_name("eth0"), "ifb4eth0");
        assert_eq!(ifb_name("wan1"), "ifb4wan1");
    }
}
