mod support;

use actix_web::{web, App, HttpResponse, HttpServer};
use common::messages::{CheckProofResponse, ErrorResponse, SaveProofRequest, SaveProofResponse, StatusResponse};
use common::models::{SignedProof, WalletAddress};
use dashmap::DashMap;
use gate::{AuthServerClient, HandoffError, ProofSource};
use std::time::Duration;

use support::{key, signed_proof};

type Proofs = web::Data<DashMap<WalletAddress, SignedProof>>;

async fn save(body: web::Json<SaveProofRequest>, proofs: Proofs) -> HttpResponse {
    match body.into_inner().into_proof() {
        Ok(proof) => {
            let wallet = proof.wallet.clone();
            proofs.insert(wallet.clone(), proof);
            HttpResponse::Created().json(SaveProofResponse {
                status: "success".to_string(),
                session_id: wallet.to_string(),
                message: "Authentication data saved".to_string(),
            })
        },
        Err(detail) => HttpResponse::BadRequest().json(ErrorResponse { detail }),
    }
}

async fn check(path: web::Path<String>, proofs: Proofs) -> HttpResponse {
    let Ok(wallet) = WalletAddress::parse(&path) else {
        return HttpResponse::BadRequest().json(ErrorResponse {
            detail: "Invalid wallet address".to_string(),
        });
    };

    let body = match proofs.get(&wallet) {
        Some(entry) => CheckProofResponse {
            authenticated: true,
            wallet: Some(entry.wallet.to_string()),
            signature: Some(entry.signature.clone()),
            message: Some(entry.message.clone()),
        },
        None => CheckProofResponse::absent(),
    };
    HttpResponse::Ok().json(body)
}

async fn clear(path: web::Path<String>, proofs: Proofs) -> HttpResponse {
    if let Ok(wallet) = WalletAddress::parse(&path) {
        proofs.remove(&wallet);
    }
    HttpResponse::Ok().json(StatusResponse::success("Session cleared"))
}

/// Serve the auth endpoints on an ephemeral port and return the base URL
fn start_auth_server(proofs: Proofs) -> String {
    let server = HttpServer::new(move || {
        App::new().app_data(proofs.clone()).service(
            web::scope("/api/auth")
                .route("/save", web::post().to(save))
                .route("/check/{wallet}", web::get().to(check))
                .route("/clear/{wallet}", web::delete().to(clear)),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

fn client(base_url: &str) -> AuthServerClient {
    AuthServerClient::new(base_url, Duration::from_secs(5)).unwrap()
}

#[actix_web::test]
async fn test_save_fetch_discard_round() {
    let proofs: Proofs = web::Data::new(DashMap::new());
    let client = client(&start_auth_server(proofs.clone()));
    let proof = signed_proof(&key(7));

    let saved = client.save(&proof).await.unwrap();
    assert_eq!(saved.status, "success");
    assert_eq!(saved.session_id, proof.wallet.to_string());

    let fetched = client.fetch(&proof.wallet).await.unwrap();
    assert_eq!(fetched, Some(proof.clone()));

    client.discard(&proof.wallet).await.unwrap();
    assert!(proofs.is_empty());
    assert_eq!(client.fetch(&proof.wallet).await.unwrap(), None);
}

#[actix_web::test]
async fn test_absent_proof_is_none() {
    let proofs: Proofs = web::Data::new(DashMap::new());
    let client = client(&start_auth_server(proofs));

    let wallet = WalletAddress::parse("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23").unwrap();
    assert_eq!(client.fetch(&wallet).await.unwrap(), None);
    // Clearing nothing still succeeds
    client.discard(&wallet).await.unwrap();
}

#[actix_web::test]
async fn test_rejected_save_carries_detail() {
    let proofs: Proofs = web::Data::new(DashMap::new());
    let client = client(&start_auth_server(proofs.clone()));

    let mut proof = signed_proof(&key(7));
    proof.message = String::new();

    match client.save(&proof).await {
        Err(HandoffError::Status { status, detail }) => {
            assert_eq!(status, 400);
            assert!(detail.contains("required"), "unexpected detail {:?}", detail);
        },
        other => panic!("expected a 400, got {:?}", other),
    }
    assert!(proofs.is_empty());
}

#[actix_web::test]
async fn test_proof_for_other_wallet_is_malformed() {
    let proofs: Proofs = web::Data::new(DashMap::new());
    let asked = signed_proof(&key(7)).wallet;
    proofs.insert(asked.clone(), signed_proof(&key(8)));
    let client = client(&start_auth_server(proofs));

    assert!(matches!(client.fetch(&asked).await, Err(HandoffError::Malformed(_))));
}
