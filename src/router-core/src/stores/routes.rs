use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::routes::{NewStaticRoute, StaticRoute};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{self, ConfigError};

static STORE: OnceCell<RwLock<Vec<StaticRoute>>> = OnceCell::new();

#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no static route with id {0}")]
    NotFound(Uuid),
}

fn path() -> Result<std::path::PathBuf, ConfigError> {
    Ok(config::config_dir()?.join("routes.json"))
}

pub fn init() -> Result<(), ConfigError> {
    if STORE.get().is_some() {
        return Ok(());
    }
    let loaded = config::load_json_or_default(&path()?, Vec::new());
    let _ = STORE.set(RwLock::new(loaded));
    Ok(())
}

pub fn all() -> Vec<StaticRoute> {
    STORE
        .get()
        .expect("route store not initialized")
        .read()
        .expect("route store lock poisoned")
        .clone()
}

pub fn add(new_route: NewStaticRoute) -> Result<StaticRoute, RouteError> {
    let route = StaticRoute {
        id: Uuid::new_v4(),
        destination_cidr: new_route.destination_cidr,
        gateway: new_route.gateway,
        metric: new_route.metric,
        comment: new_route.comment,
    };
    let lock = STORE.get().expect("route store not initialized");
    let mut guard = lock.write().expect("route store lock poisoned");
    guard.push(route.clone());
    config::write_atomic(&path()?, &*guard)?;
    Ok(route)
}

pub fn remove(id: Uuid) -> Result<StaticRoute, RouteError> {
    let lock = STORE.get().expect("route store not initialized");
    let mut guard = lock.write().expect("route store lock poisoned");
    let idx = guard
        .iter()
        .position(|r| r.id == id)
        .ok_or(RouteError::NotFound(id))?;
    let removed = guard.remove(idx);
    config::write_atomic(&path()?, &*guard)?;
    Ok(removed)
}
