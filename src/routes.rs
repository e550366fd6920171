use actix_web::{error::JsonPayloadError, web, HttpRequest};
use tracing::debug;

use crate::{
    error::ApiError,
    handlers::{health_check, recommendations_config},
};

/// Configure all routes for the API
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health_check)
        .configure(recommendations_config);
}

/// Body extraction failures become the same structured 400 as validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        debug!("Rejected request body: {}", err);
        ApiError::InvalidInput(format!("Invalid request body: {}", err)).into()
    })
}
