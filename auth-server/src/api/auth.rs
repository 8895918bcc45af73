// auth-server/src/api/auth.rs
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use common::messages::{
    CheckProofResponse, ErrorResponse, SaveProofRequest, SaveProofResponse, StatusResponse,
};
use common::models::WalletAddress;
use common::utils::redact;
use serde_json::json;

use crate::session_store::SessionStore;

#[get("")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "NFT Gate Auth Server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn bad_request(detail: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse { detail: detail.into() })
}

fn parse_wallet(raw: &str) -> Result<WalletAddress, HttpResponse> {
    WalletAddress::parse(raw).map_err(|e| {
        tracing::warn!("Rejected malformed wallet address {:?}: {}", raw, e);
        bad_request(format!("Invalid wallet address: {}", e))
    })
}

// Called by the signing popup right after the wallet signs
#[post("/auth/save")]
pub async fn save_proof(
    body: web::Json<SaveProofRequest>,
    store: web::Data<SessionStore>,
) -> impl Responder {
    let proof = match body.into_inner().into_proof() {
        Ok(proof) => proof,
        Err(detail) => {
            tracing::warn!("Rejected proof submission: {}", detail);
            return bad_request(detail);
        }
    };

    tracing::debug!(
        "Saving proof for {} (signature {})",
        proof.wallet,
        redact(&proof.signature)
    );
    let record = store.put(proof);

    HttpResponse::Created().json(SaveProofResponse {
        status: "success".to_string(),
        session_id: record.wallet.to_string(),
        message: "Authentication data saved".to_string(),
    })
}

// Polled by the gate until the popup has saved a proof
#[get("/auth/check/{wallet}")]
pub async fn check_proof(
    path: web::Path<(String,)>,
    store: web::Data<SessionStore>,
) -> impl Responder {
    let wallet = match parse_wallet(&path.0) {
        Ok(wallet) => wallet,
        Err(response) => return response,
    };

    // Expired and never-submitted proofs are reported identically
    match store.get(&wallet) {
        Some(record) => HttpResponse::Ok().json(CheckProofResponse::found(&record)),
        None => HttpResponse::Ok().json(CheckProofResponse::absent()),
    }
}

// Called by the gate after consuming a proof, and on logout
#[delete("/auth/clear/{wallet}")]
pub async fn clear_proof(
    path: web::Path<(String,)>,
    store: web::Data<SessionStore>,
) -> impl Responder {
    let wallet = match parse_wallet(&path.0) {
        Ok(wallet) => wallet,
        Err(response) => return response,
    };

    store.clear(&wallet);
    HttpResponse::Ok().json(StatusResponse::success("Session cleared"))
}
