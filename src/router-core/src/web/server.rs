use std::fs::File;
use std::io::BufReader;

use actix_web::{middleware, App, HttpServer};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use softrouter_lib::types::config::{AgentWebHttp, AgentWebHttps};
use thiserror::Error;

use super::api;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls configuration error: {0}")]
    Tls(String),
    #[error("neither HTTP nor HTTPS is enabled")]
    NoSchemeEnabled,
}

fn load_tls_config(cert_path: &str, key_path: &str) -> Result<ServerConfig, ServerError> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .ok();

    let cert_file = File::open(cert_path)?;
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut BufReader::new(cert_file))
            .collect::<Result<_, _>>()
            .map_err(|e| ServerError::Tls(e.to_string()))?;

    let key_file = File::open(key_path)?;
    let mut key_reader = BufReader::new(key_file);
    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut key_reader);
    let key = keys
        .next()
        .ok_or_else(|| ServerError::Tls("no private key found".into()))?
        .map_err(|e| ServerError::Tls(e.to_string()))?;

    ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, PrivateKeyDer::Pkcs8(key))
        .map_err(|e| ServerError::Tls(e.to_string()))
}

/// Builds the actix `App` with every route registered. A macro rather
/// than a function because `HttpServer::new` needs a fresh `App` per
/// worker thread and the concrete type involves an unnameable
/// `impl ServiceFactory` once the dev-only CORS layer is folded in.
macro_rules! build_app {
    () => {{
        let app = App::new().wrap(middleware::Compress::default());

        #[cfg(debug_assertions)]
        let app = app.wrap(actix_cors::Cors::permissive());

        app.service(api::get_version)
            .service(api::post_token)
            .service(api::get_init_status)
            .service(api::post_init)
            .service(api::get_interfaces)
            .service(api::post_interface_label)
            .service(api::post_interface_vlan)
            .service(api::delete_interface_vlan)
            .service(api::post_interface_address)
            .service(api::post_interface_state)
            .service(api::get_port_forwarding)
            .service(api::post_port_forwarding)
            .service(api::patch_port_forwarding)
            .service(api::delete_port_forwarding)
            .service(api::get_wan)
            .service(api::post_wan)
            .service(api::get_routes)
            .service(api::post_routes)
            .service(api::delete_routes)
            .service(api::get_vpn_policies)
            .service(api::post_vpn_policies)
            .service(api::delete_vpn_policies)
            .service(api::get_qos)
            .service(api::post_qos)
            .service(api::delete_qos)
            .service(api::post_firewall_confirm)
            .service(api::get_system_audit)
    }};
}

pub async fn run(
    address: &str,
    http: AgentWebHttp,
    https: AgentWebHttps,
) -> Result<(), ServerError> {
    let mut servers = Vec::new();

    if http.enabled {
        let bind = format!("{address}:{}", http.port);
        log::info!("HTTP control API listening on {bind}");
        let server = HttpServer::new(|| build_app!()).bind(&bind)?.run();
        servers.push(Box::pin(server) as std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>>>>);
    }

    if https.enabled {
        let tls_config = load_tls_config(&https.tls_cert, &https.tls_key)?;
        let bind = format!("{address}:{}", https.port);
        log::info!("HTTPS control API listening on {bind}");
        let server = HttpServer::new(|| build_app!())
            .bind_rustls_0_23(&bind, tls_config)?
            .run();
        servers.push(Box::pin(server) as std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>>>>);
    }

    if servers.is_empty() {
        return Err(ServerError::NoSchemeEnabled);
    }

    futures_util::future::try_join_all(servers).await?;
    Ok(())
}
