use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::{rng, RngCore};
use serde::{Deserialize, Serialize};
use softrouter_lib::types::api::{
    AuditEntry, IpAddressRequest, LabelRequest, LinkStateRequest, VlanCreateRequest,
    VlanCreateResponse,
};
use softrouter_lib::types::interfaces::InterfaceLabel;
use softrouter_lib::types::misc::VERSION_BUILD_INFO;
use softrouter_lib::types::portforward::{NewPortForwardRule, PortForwardRuleUpdate};
use softrouter_lib::types::routes::NewStaticRoute;
use softrouter_lib::types::vpn_policy::VpnPolicy;
use softrouter_lib::types::wan::WanStore;
use softrouter_lib::types::qos::QosEntry;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{config, executor, firewall, interface_ops, policy_routing, qos_apply, stores};

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Claims {
    sub: String,
    exp: u64,
}

static JWT_SECRETS: Lazy<(EncodingKey, DecodingKey)> = Lazy::new(|| {
    let mut key = [0u8; 32];
    rng().fill_bytes(&mut key);
    (
        EncodingKey::from_secret(&key),
        DecodingKey::from_secret(&key),
    )
});

fn enforce_auth(req: &HttpRequest) -> Result<(), HttpResponse> {
    let config = config::get_config().map_err(|_| HttpResponse::InternalServerError().body("config unavailable"))?;
    if !config.agent.web.password.enabled {
        return Ok(());
    }
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    match token {
        Some(token) => {
            let validation = Validation::new(Algorithm::HS256);
            match decode::<Claims>(token, &JWT_SECRETS.1, &validation) {
                Ok(_) => Ok(()),
                Err(_) => Err(HttpResponse::Unauthorized().body("invalid token")),
            }
        }
        None => Err(HttpResponse::Unauthorized().body("Authorization header missing or invalid")),
    }
}

macro_rules! auth_or_return {
    ($req:expr) => {
        if let Err(e) = enforce_auth(&$req) {
            return e;
        }
    };
}

#[get("/api/version")]
pub async fn get_version(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    HttpResponse::Ok().json(&VERSION_BUILD_INFO)
}

#[post("/api/token")]
pub async fn post_token(body: web::Bytes) -> impl Responder {
    let config = match config::get_config() {
        Ok(c) => c,
        Err(_) => return HttpResponse::InternalServerError().body("config unavailable"),
    };
    if !config.agent.web.password.enabled {
        return HttpResponse::NoContent().finish();
    }

    #[derive(Deserialize)]
    struct LoginBody {
        client_id: String,
        password: String,
    }
    let login: LoginBody = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };

    let parsed_hash = match PasswordHash::new(&config.agent.web.password.hash) {
        Ok(h) => h,
        Err(e) => {
            log::error!("invalid password hash in configuration: {e}");
            return HttpResponse::InternalServerError().body("server configuration error");
        }
    };
    if Argon2::default()
        .verify_password(login.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return HttpResponse::Unauthorized().body("invalid credentials");
    }

    let expiration = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() + 3600,
        Err(_) => return HttpResponse::InternalServerError().body("clock error"),
    };
    let claims = Claims {
        sub: login.client_id,
        exp: expiration,
    };
    match encode(&Header::default(), &claims, &JWT_SECRETS.0) {
        Ok(token) => HttpResponse::Ok().body(token),
        Err(_) => HttpResponse::InternalServerError().body("token creation error"),
    }
}

// --- first-boot (no auth) ---

#[get("/api/init/status")]
pub async fn get_init_status() -> impl Responder {
    super::init::get_init_status()
}

#[post("/api/init")]
pub async fn post_init(body: web::Bytes) -> impl Responder {
    super::init::post_init(body)
}

// --- interfaces ---

#[get("/api/interfaces")]
pub async fn get_interfaces(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    super::init::list_interfaces()
}

#[post("/api/interfaces/label")]
pub async fn post_interface_label(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let payload: LabelRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    let label = match payload.label.as_str() {
        "Wan" | "wan" => InterfaceLabel::Wan,
        "Lan" | "lan" => InterfaceLabel::Lan,
        "Dmz" | "dmz" => InterfaceLabel::Dmz,
        "Guest" | "guest" => InterfaceLabel::Guest,
        "Management" | "management" => InterfaceLabel::Management,
        "Trunk" | "trunk" => InterfaceLabel::Trunk,
        other => return HttpResponse::BadRequest().body(format!("unknown label: {other}")),
    };
    if let Err(e) = stores::interfaces::label(
        &payload.interface_name,
        label,
        payload.description,
        payload.color,
    ) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    match firewall::commit::apply() {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
    }
}

#[post("/api/interfaces/vlan")]
pub async fn post_interface_vlan(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let payload: VlanCreateRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    match interface_ops::create_vlan(&payload.parent_interface, payload.vlan_id) {
        Ok(interface) => HttpResponse::Ok().json(VlanCreateResponse { interface }),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct VlanQuery {
    pub interface: String,
}

#[delete("/api/interfaces/vlan")]
pub async fn delete_interface_vlan(req: HttpRequest, query: web::Query<VlanQuery>) -> impl Responder {
    auth_or_return!(req);
    match interface_ops::delete_vlan(&query.interface) {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

#[post("/api/interfaces/ip")]
pub async fn post_interface_address(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let payload: IpAddressRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    let action = match payload.action {
        softrouter_lib::types::api::IpAction::Add => interface_ops::AddrAction::Add,
        softrouter_lib::types::api::IpAction::Del => interface_ops::AddrAction::Del,
    };
    match interface_ops::set_address(&payload.interface_name, &payload.ip_address, action) {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

#[post("/api/interfaces/state")]
pub async fn post_interface_state(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let payload: LinkStateRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    let state = match payload.state {
        softrouter_lib::types::api::LinkDesiredState::Up => interface_ops::LinkState::Up,
        softrouter_lib::types::api::LinkDesiredState::Down => interface_ops::LinkState::Down,
    };
    match interface_ops::set_link_state(&payload.interface_name, state) {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

// --- port forwarding ---

#[get("/api/port-forwarding")]
pub async fn get_port_forwarding(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    HttpResponse::Ok().json(stores::portforward::all())
}

#[post("/api/port-forwarding")]
pub async fn post_port_forwarding(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let new_rule: NewPortForwardRule = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    let rule = match stores::portforward::add(new_rule) {
        Ok(r) => r,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    match firewall::commit::apply() {
        Ok(_) => HttpResponse::Ok().json(rule),
        Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct IdQuery {
    pub id: Uuid,
}

#[patch("/api/port-forwarding")]
pub async fn patch_port_forwarding(
    req: HttpRequest,
    query: web::Query<IdQuery>,
    body: web::Bytes,
) -> impl Responder {
    auth_or_return!(req);
    let patch: PortForwardRuleUpdate = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    let rule = match stores::portforward::update(query.id, patch) {
        Ok(r) => r,
        Err(e) => return HttpResponse::NotFound().body(e.to_string()),
    };
    match firewall::commit::apply() {
        Ok(_) => HttpResponse::Ok().json(rule),
        Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
    }
}

#[delete("/api/port-forwarding")]
pub async fn delete_port_forwarding(req: HttpRequest, query: web::Query<IdQuery>) -> impl Responder {
    auth_or_return!(req);
    if let Err(e) = stores::portforward::remove(query.id) {
        return HttpResponse::NotFound().body(e.to_string());
    }
    match firewall::commit::apply() {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
    }
}

// --- multi-WAN ---

#[get("/api/wan")]
pub async fn get_wan(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    HttpResponse::Ok().json(stores::wan::get())
}

#[post("/api/wan")]
pub async fn post_wan(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let store: WanStore = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    if let Err(e) = stores::wan::replace(store) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    crate::multiwan::trigger_probe();
    HttpResponse::Ok().finish()
}

// --- static routes ---

#[get("/api/routing")]
pub async fn get_routes(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    HttpResponse::Ok().json(stores::routes::all())
}

#[post("/api/routing")]
pub async fn post_routes(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let new_route: NewStaticRoute = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    let route = match stores::routes::add(new_route) {
        Ok(r) => r,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    let mut args = vec!["ip".to_string(), "route".into(), "replace".into(), route.destination_cidr.clone(), "via".into(), route.gateway.clone()];
    if let Some(metric) = route.metric {
        args.push("metric".into());
        args.push(metric.to_string());
    }
    let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    if let Err(e) = executor::run(&refs) {
        log::warn!("failed to apply static route {}: {}", route.id, e);
    }
    HttpResponse::Ok().json(route)
}

#[delete("/api/routing")]
pub async fn delete_routes(req: HttpRequest, query: web::Query<IdQuery>) -> impl Responder {
    auth_or_return!(req);
    let route = match stores::routes::remove(query.id) {
        Ok(r) => r,
        Err(e) => return HttpResponse::NotFound().body(e.to_string()),
    };
    executor::run_best_effort(&["ip", "route", "del", &route.destination_cidr]);
    HttpResponse::Ok().finish()
}

// --- VPN policy routing ---

#[get("/api/vpn/client/policies")]
pub async fn get_vpn_policies(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    HttpResponse::Ok().json(stores::vpn_policy::all())
}

#[post("/api/vpn/client/policies")]
pub async fn post_vpn_policies(req: HttpRequest, body: web::Bytes) -> impl Responder {
    auth_or_return!(req);
    let policy: VpnPolicy = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    if let Err(e) = stores::vpn_policy::add(policy) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    policy_routing::reconcile();
    HttpResponse::Ok().finish()
}

#[derive(Deserialize)]
pub struct IpQuery {
    pub ip: String,
}

#[delete("/api/vpn/client/policies")]
pub async fn delete_vpn_policies(req: HttpRequest, query: web::Query<IpQuery>) -> impl Responder {
    auth_or_return!(req);
    if let Err(e) = stores::vpn_policy::remove(&query.ip) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    policy_routing::reconcile();
    HttpResponse::Ok().finish()
}

// --- QoS ---

#[derive(Deserialize)]
pub struct InterfaceQuery {
    pub interface: String,
}

#[get("/api/qos")]
pub async fn get_qos(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    HttpResponse::Ok().json(stores::qos::all())
}

#[post("/api/qos")]
pub async fn post_qos(
    req: HttpRequest,
    query: web::Query<InterfaceQuery>,
    body: web::Bytes,
) -> impl Responder {
    auth_or_return!(req);
    let entry: QosEntry = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return HttpResponse::BadRequest().body(format!("invalid JSON: {e}")),
    };
    if let Err(e) = stores::qos::set(&query.interface, entry.clone()) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    qos_apply::apply(&query.interface, &entry);
    HttpResponse::Ok().finish()
}

#[delete("/api/qos")]
pub async fn delete_qos(req: HttpRequest, query: web::Query<InterfaceQuery>) -> impl Responder {
    auth_or_return!(req);
    if let Err(e) = stores::qos::remove(&query.interface) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    qos_apply::remove(&query.interface);
    HttpResponse::Ok().finish()
}

// --- commit confirmation ---

#[post("/api/firewall/confirm")]
pub async fn post_firewall_confirm(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    match firewall::commit::confirm() {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

// --- audit ring ---

#[get("/api/system/audit")]
pub async fn get_system_audit(req: HttpRequest) -> impl Responder {
    auth_or_return!(req);
    let entries: Vec<AuditEntry> = executor::audit_snapshot();
    HttpResponse::Ok().json(entries)
}
