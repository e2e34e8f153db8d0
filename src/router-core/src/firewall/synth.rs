//! Builds the full nftables ruleset text from the current configuration.
//! Pure string synthesis — no process is spawned here; [`super::commit`]
//! is the only caller that hands the result to the executor.

use softrouter_lib::types::config::SystemConfig;
use softrouter_lib::types::portforward::PortForwardRule;

use crate::executor;

/// Line the control-plane rate-limit block is inserted after. Kept as a
/// literal marker rather than a line index so synthesis order can shift
/// without breaking the injector.
const INJECTION_MARKER: &str = "ip6 nexthdr icmpv6 accept";

pub struct SynthInput {
    pub wan_interfaces: Vec<String>,
    pub lan_interfaces: Vec<String>,
    pub port_forwards: Vec<PortForwardRule>,
    pub system: SystemConfig,
    pub tls_port: u16,
}

/// Attempts to find a WAN interface from the kernel's default route when
/// none is labeled. Grounded on the executor's allow-listed `ip` access;
/// returns `None` if nothing can be parsed.
pub fn detect_default_wan() -> Option<String> {
    let output = executor::run_stdout(&["ip", "route", "show", "default"]).ok()?;
    let line = output.lines().next()?;
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok == "dev" {
            return tokens.next().map(|s| s.to_string());
        }
    }
    None
}

pub fn synthesize(input: &SynthInput) -> String {
    let mut out = String::new();
    out.push_str("flush ruleset\n\n");

    synth_softrouter_table(&mut out, input);
    out.push('\n');
    synth_nat_table(&mut out, input);

    inject_rate_limits(&out, input.tls_port)
}

fn synth_softrouter_table(out: &mut String, input: &SynthInput) {
    out.push_str("table inet softrouter {\n");

    out.push_str("    chain input {\n");
    out.push_str("        type filter hook input priority filter; policy drop;\n");
    out.push_str("        iif lo accept\n");
    out.push_str("        ct state established,related accept\n");
    out.push_str("        ct state invalid drop\n");
    out.push_str("        ip protocol icmp accept\n");
    out.push_str(&format!("        {}\n", INJECTION_MARKER));
    out.push_str("        tcp dport 22 accept\n");
    out.push_str("        udp dport 53 accept\n");
    out.push_str("        tcp dport 53 accept\n");
    for lan in &input.lan_interfaces {
        out.push_str(&format!("        iifname \"{lan}\" accept\n"));
    }
    for wan in &input.wan_interfaces {
        out.push_str(&format!("        iifname \"{wan}\" ct status dnat accept\n"));
    }
    out.push_str("        limit rate 5/minute log prefix \"softrouter-input-drop: \" drop\n");
    out.push_str("    }\n\n");

    out.push_str("    chain forward {\n");
    out.push_str("        type filter hook forward priority filter; policy drop;\n");
    out.push_str("        ct state established,related accept\n");
    for lan in &input.lan_interfaces {
        for wan in &input.wan_interfaces {
            out.push_str(&format!(
                "        iifname \"{lan}\" oifname \"{wan}\" accept\n"
            ));
        }
    }
    for wan in &input.wan_interfaces {
        out.push_str(&format!("        iifname \"{wan}\" ct status dnat accept\n"));
    }
    out.push_str("        limit rate 5/minute log prefix \"softrouter-forward-drop: \" drop\n");
    out.push_str("    }\n");

    out.push_str("}\n");
}

fn synth_nat_table(out: &mut String, input: &SynthInput) {
    out.push_str("table ip nat {\n");

    out.push_str("    chain prerouting {\n");
    out.push_str("        type nat hook prerouting priority dstnat;\n");
    for lan in &input.lan_interfaces {
        out.push_str(&format!(
            "        iifname \"{lan}\" tcp dport 80 dnat to 127.0.0.1:8090\n"
        ));
        out.push_str(&format!(
            "        iifname \"{}\" tcp dport 443 dnat to 127.0.0.1:{}\n",
            lan, input.tls_port
        ));
    }
    for rule in &input.port_forwards {
        for wan in &input.wan_interfaces {
            out.push_str(&format!(
                "        iifname \"{}\" {} dport {} dnat to {}:{}\n",
                wan,
                rule.protocol.as_str(),
                rule.external_port,
                rule.internal_ip,
                rule.internal_port
            ));
        }
    }
    if input.system.web_access.allow_wan {
        for wan in &input.wan_interfaces {
            out.push_str(&format!(
                "        iifname \"{}\" tcp dport {} dnat to 127.0.0.1:8090\n",
                wan, input.system.web_access.wan_port_http
            ));
            out.push_str(&format!(
                "        iifname \"{}\" tcp dport {} dnat to 127.0.0.1:{}\n",
                wan, input.system.web_access.wan_port_https, input.tls_port
            ));
        }
    }
    out.push_str("    }\n\n");

    out.push_str("    chain postrouting {\n");
    out.push_str("        type nat hook postrouting priority srcnat;\n");
    for wan in &input.wan_interfaces {
        out.push_str(&format!("        oifname \"{wan}\" masquerade\n"));
    }
    out.push_str(&format!(
        "        ip saddr {} ip daddr {} masquerade\n",
        input.system.protected_subnet, input.system.protected_subnet
    ));
    out.push_str("    }\n");

    out.push_str("}\n");
}

/// Inserts the control-plane connection rate limits immediately after
/// [`INJECTION_MARKER`]. Returns the ruleset unmodified, with a warning,
/// if the marker can't be found.
fn inject_rate_limits(ruleset: &str, tls_port: u16) -> String {
    let block = format!(
        "\
        limit rate 10/minute burst 20 packets tcp dport 22 accept\n\
        \x20\x20\x20\x20\x20\x20\x20\x20limit rate 100/minute burst 50 packets tcp dport {{ 80, 8090 }} accept\n\
        \x20\x20\x20\x20\x20\x20\x20\x20limit rate 100/minute burst 50 packets tcp dport {{ 443, {tls_port} }} accept\n\
        \x20\x20\x20\x20\x20\x20\x20\x20limit rate 60/second burst 100 packets udp dport 53 accept\n\
        \x20\x20\x20\x20\x20\x20\x20\x20limit rate 60/second burst 100 packets tcp dport 53 accept"
    );

    let marker_line = format!("        {}", INJECTION_MARKER);
    match ruleset.find(&marker_line) {
        Some(pos) => {
            let insert_at = pos + marker_line.len() + 1; // after the marker's newline
            let mut result = String::with_capacity(ruleset.len() + block.len() + 16);
            result.push_str(&ruleset[..insert_at]);
            result.push_str("        ");
            result.push_str(&block);
            result.push('\n');
            result.push_str(&ruleset[insert_at..]);
            result
        }
        None => {
            log::warn!("rate-limit injection marker not found; ruleset applied unmodified");
            ruleset.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softrouter_lib::types::config::SystemConfig;
    use softrouter_lib::types::portforward::Protocol;
    use uuid::Uuid;

    fn base_input() -> SynthInput {
        SynthInput {
            wan_interfaces: vec!["eth0".into()],
            lan_interfaces: vec!["eth1".into()],
            port_forwards: vec![],
            system: SystemConfig {
                protected_subnet: "192.168.1.0/24".into(),
                ..Default::default()
            },
            tls_port: 8443,
        }
    }

    #[test]
    fn emits_masquerade_and_lan_accept() {
        let ruleset = synthesize(&base_input());
        assert!(ruleset.contains("oifname \"eth0\" masquerade"));
        assert!(ruleset.contains("iifname \"eth1\" accept"));
        assert!(ruleset.starts_with("flush ruleset"));
    }

    #[test]
    fn emits_port_forward_dnat() {
        let mut input = base_input();
        input.port_forwards.push(PortForwardRule {
            id: Uuid::new_v4(),
            description: "ssh".into(),
            protocol: Protocol::Tcp,
            external_port: 2222,
            internal_ip: "10.0.0.5".into(),
            internal_port: 22,
            enabled: true,
        });
        let ruleset = synthesize(&input);
        assert!(ruleset.contains("iifname \"eth0\" tcp dport 2222 dnat to 10.0.0.5:22"));
    }

    #[test]
    fn emits_lan_https_dnat_to_configured_tls_port() {
        let ruleset = synthesize(&base_input());
        assert!(ruleset.contains("iifname \"eth1\" tcp dport 443 dnat to 127.0.0.1:8443"));
    }

    #[test]
    fn wan_webui_dnat_requires_allow_wan() {
        let mut input = base_input();
        input.system.web_access.allow_wan = true;
        let ruleset = synthesize(&input);
        assert!(ruleset.contains(&format!(
            "iifname \"eth0\" tcp dport {} dnat to 127.0.0.1:8090",
            input.system.web_access.wan_port_http
        )));
        assert!(ruleset.contains(&format!(
            "iifname \"eth0\" tcp dport {} dnat to 127.0.0.1:8443",
            input.system.web_access.wan_port_https
        )));
    }

    #[test]
    fn rate_limit_injection_lands_after_marker() {
        let ruleset = synthesize(&base_input());
        let marker_pos = ruleset.find(INJECTION_MARKER).unwrap();
        let ssh_limit_pos = ruleset.find("limit rate 10/minute").unwrap();
        assert!(ssh_limit_pos > marker_pos);
    }

    #[test]
    fn idempotent_synthesis_is_byte_identical() {
        let input = base_input();
        assert_eq!(synthesize(&input), synthesize(&input));
    }
}
