// auth-server/src/main.rs
mod api;
mod middleware;
mod session_store;
mod static_files;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};

use middleware::RateLimiter;
use session_store::SessionStore;
use static_files::SigningPage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    setup_tracing();

    let config = Config::from_env();
    let server_addr = config.auth_server_addr.clone();

    // Process-wide proof store; contents are lost on restart
    let store = SessionStore::new(config.session.ttl());
    let limiter = RateLimiter::from_config(&config.rate_limit);
    let signing_page = SigningPage::from(&config.static_files);

    tracing::info!(
        "Starting auth server on {} (proof TTL {}s, chain {}, contract {})",
        server_addr,
        store.ttl().num_seconds(),
        config.chain.name,
        config.chain.contract_address
    );

    let store_data = web::Data::new(store);

    HttpServer::new(move || {
        // Popup and gate run on different origins
        let cors = Cors::permissive();

        App::new()
            .wrap(limiter.clone())
            .wrap(cors)
            .app_data(store_data.clone())
            .app_data(api::json_config())
            .configure(api::configure)
            .configure(|cfg| static_files::configure(cfg, signing_page.clone()))
    })
    .bind(&server_addr)?
    .run()
    .await
}
