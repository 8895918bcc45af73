// auth-server/src/api/mod.rs
pub mod auth;

use actix_web::{error, web, HttpResponse};
use common::messages::ErrorResponse;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(auth::api_index)
            .service(auth::save_proof)
            .service(auth::check_proof)
            .service(auth::clear_proof)
    );
}

/// Report body parse failures as `400 {detail}` like other validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| {
            let detail = err.to_string();
            tracing::warn!("Rejected request body: {}", detail);
            error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(ErrorResponse { detail }),
            )
            .into()
        })
}
