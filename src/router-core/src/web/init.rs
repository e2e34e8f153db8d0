//! First-boot gating. Mirrors the sentinel-file pattern the teacher uses
//! to keep setup-wizard-only endpoints locked once a config exists.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use softrouter_lib::types::api::InterfaceListEntry;
use softrouter_lib::types::config::{AgentWebHttp, AgentWebHttps, Password};
use softrouter_lib::types::interfaces::KernelInterface;

use crate::{config, executor, stores};

fn sentinel_path() -> Option<std::path::PathBuf> {
    config::config_dir().ok().map(|d| d.join("first_boot_complete"))
}

pub fn is_initialized() -> bool {
    sentinel_path().map(|p| p.exists()).unwrap_or(false)
}

#[derive(Debug, Serialize)]
struct InitStatus {
    initialized: bool,
}

pub fn get_init_status() -> HttpResponse {
    HttpResponse::Ok().json(InitStatus {
        initialized: is_initialized(),
    })
}

#[derive(Debug, Deserialize)]
struct InitRequest {
    address: String,
    http_port: u16,
    https_port: Option<u16>,
    password: Option<String>,
    protected_subnet: Option<String>,
}

pub fn post_init(body: web::Bytes) -> HttpResponse {
    if is_initialized() {
        return HttpResponse::BadRequest().body("agent already initialized");
    }
    let payload: InitRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };

    let password_hash = match payload.password {
        Some(ref p) if !p.is_empty() => match hash_password(p) {
            Ok(h) => h,
            Err(e) => return HttpResponse::InternalServerError().body(e),
        },
        _ => String::new(),
    };

    let result = config::update_config(|cfg| {
        cfg.agent.web.address = payload.address.clone();
        cfg.agent.web.http = AgentWebHttp {
            enabled: true,
            port: payload.http_port,
        };
        if let Some(https_port) = payload.https_port {
            cfg.agent.web.https = AgentWebHttps {
                enabled: true,
                port: https_port,
                tls_cert: cfg.agent.web.https.tls_cert.clone(),
                tls_key: cfg.agent.web.https.tls_key.clone(),
            };
        }
        cfg.agent.web.password = Password {
            enabled: !password_hash.is_empty(),
            hash: password_hash.clone(),
        };
        if let Some(subnet) = &payload.protected_subnet {
            cfg.agent.system.protected_subnet = subnet.clone();
        }
    });
    if let Err(e) = result {
        return HttpResponse::InternalServerError().body(e.to_string());
    }

    if let Some(path) = sentinel_path() {
        if let Err(e) = std::fs::write(&path, b"") {
            return HttpResponse::InternalServerError().body(e.to_string());
        }
    }

    HttpResponse::Ok().finish()
}

fn hash_password(password: &str) -> Result<String, String> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::Argon2;
    use rand_core::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| e.to_string())
}

/// Cross-references the interface metadata store against `ip -j link show`
/// / `ip -j addr show` so the control plane reports both configured labels
/// and what the kernel actually has up.
pub fn list_interfaces() -> HttpResponse {
    let kernel = match enumerate_kernel_interfaces() {
        Ok(k) => k,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    let metadata = stores::interfaces::all();

    let mut entries: Vec<InterfaceListEntry> = Vec::new();
    for iface in &kernel {
        let meta = metadata.get(&iface.name);
        entries.push(InterfaceListEntry {
            name: iface.name.clone(),
            label: meta.map(|m| format!("{:?}", m.label)),
            description: meta.map(|m| m.description.clone()).unwrap_or_default(),
            color: meta.map(|m| m.color.clone()).unwrap_or_default(),
            kernel: Some(iface.clone()),
        });
    }
    for (name, meta) in &metadata {
        if kernel.iter().any(|k| &k.name == name) {
            continue;
        }
        entries.push(InterfaceListEntry {
            name: name.clone(),
            label: Some(format!("{:?}", meta.label)),
            description: meta.description.clone(),
            color: meta.color.clone(),
            kernel: None,
        });
    }

    HttpResponse::Ok().json(entries)
}

fn enumerate_kernel_interfaces() -> Result<Vec<KernelInterface>, executor::ExecutorError> {
    let link_json = executor::run_stdout(&["ip", "-j", "link", "show"])?;
    let addr_json = executor::run_stdout(&["ip", "-j", "addr", "show"])?;

    let links: Vec<Value> = serde_json::from_str(&link_json).unwrap_or_default();
    let addrs: Vec<Value> = serde_json::from_str(&addr_json).unwrap_or_default();

    let mut result = Vec::new();
    for link in &links {
        let name = match link.get("ifname").and_then(Value::as_str) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let operstate = link
            .get("operstate")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let addresses = addrs
            .iter()
            .find(|a| a.get("ifname").and_then(Value::as_str) == Some(name.as_str()))
            .and_then(|a| a.get("addr_info"))
            .and_then(Value::as_array)
            .map(|infos| {
                infos
                    .iter()
                    .filter_map(|i| i.get("local").and_then(Value::as_str))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        result.push(KernelInterface {
            name,
            operstate,
            addresses,
        });
    }
    Ok(result)
}
