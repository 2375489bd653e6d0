use serde::Deserialize;

use crate::config::Config;
use crate::fields::FieldMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Option<Config>,
    pub fields: FieldMap,
}
