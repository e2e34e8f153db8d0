use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticRoute {
    pub id: Uuid,
    pub destination_cidr: String,
    pub gateway: String,
    #[serde(default)]
    pub metric: Option<u32>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaticRoute {
    pub destination_cidr: String,
    pub gateway: String,
    #[serde(default)]
    pub metric: Option<u32>,
    #[serde(default)]
    pub comment: String,
}
