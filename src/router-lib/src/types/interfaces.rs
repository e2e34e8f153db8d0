use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role assigned to a kernel network interface. Drives ruleset synthesis:
/// `Wan` interfaces get masquerade + forward-accept, `Lan`/`Dmz`/`Guest`
/// get input-accept, `Management` is reserved for future use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum InterfaceLabel {
    Wan,
    Lan,
    Dmz,
    Guest,
    Management,
    Trunk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceMetadata {
    pub label: InterfaceLabel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

/// Keyed by kernel interface name (`eth0`, `eth0.100`, …).
pub type InterfaceMetadataStore = BTreeMap<String, InterfaceMetadata>;

/// A link as reported by `ip -j link show`, used to cross-reference the
/// metadata store against what the kernel actually has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelInterface {
    pub name: String,
    pub operstate: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}
