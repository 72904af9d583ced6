use jsonwebtoken::DecodingKey;
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::reports::ReportsService;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub jwt_decoding_key: DecodingKey,
    pub reports: Arc<ReportsService>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig, reports: Arc<ReportsService>) -> Self {
        let jwt_decoding_key = DecodingKey::from_secret(config.auth.jwt_secret.as_bytes());
        Self {
            conn,
            config,
            jwt_decoding_key,
            reports,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
