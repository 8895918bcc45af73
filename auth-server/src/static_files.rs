// auth-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::{web, HttpRequest, HttpResponse};
use common::config::StaticFilesConfig;
use common::messages::ErrorResponse;
use std::path::PathBuf;

/// Location of the wallet signing page opened in the popup
#[derive(Clone, Debug)]
pub struct SigningPage {
    pub root_path: PathBuf,
    pub index_file: String,
}

impl From<&StaticFilesConfig> for SigningPage {
    fn from(config: &StaticFilesConfig) -> Self {
        Self {
            root_path: PathBuf::from(&config.path),
            index_file: config.index.clone(),
        }
    }
}

async fn signing_page(req: HttpRequest, page: web::Data<SigningPage>) -> HttpResponse {
    let index_path = page.root_path.join(&page.index_file);
    match NamedFile::open(&index_path) {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            tracing::error!("Signing page {} unavailable: {}", index_path.display(), e);
            HttpResponse::NotFound().json(ErrorResponse {
                detail: "Signing page not found".to_string(),
            })
        }
    }
}

/// Serve the signing page at `/` and its assets under `/static`
pub fn configure(cfg: &mut web::ServiceConfig, page: SigningPage) {
    cfg.app_data(web::Data::new(page.clone()))
        .service(
            Files::new("/static", &page.root_path)
                .prefer_utf8(true)
                .use_etag(true)
                .use_last_modified(true)
        )
        .route("/", web::get().to(signing_page));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_missing_page_is_not_found() {
        let page = SigningPage {
            root_path: PathBuf::from("./does-not-exist"),
            index_file: "index.html".to_string(),
        };
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, page))).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_serves_index() {
        let dir = std::env::temp_dir().join(format!("signing-page-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>sign</html>").unwrap();

        let page = SigningPage {
            root_path: dir.clone(),
            index_file: "index.html".to_string(),
        };
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, page))).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"<html>sign</html>");

        std::fs::remove_dir_all(dir).ok();
    }
}
