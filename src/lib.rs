use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpResponse, HttpServer, Responder};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod dataverse;
pub mod equipment;
pub mod report;
pub mod state;

pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Indus Control equipment API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn run() -> std::io::Result<()> {
    env_logger::init();

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::equipment::handlers::get_all_equipment,
            crate::equipment::handlers::get_equipment_by_id,
            crate::equipment::handlers::create_equipment,
            crate::equipment::handlers::update_equipment,
            crate::equipment::handlers::delete_equipment,
            crate::equipment::handlers::get_equipment_pdf,
            crate::equipment::handlers::get_equipment_docx,
            crate::equipment::handlers::get_equipment_word_pdf
        ),
        components(
            schemas(
                dataverse::model::EquipmentRecord,
                dataverse::model::NewEquipment,
                equipment::handlers::EquipmentListResponse,
                equipment::handlers::EquipmentResponse,
                equipment::handlers::DeleteResponse,
                report::service::OutputFormat,
                report::service::RenderStrategy,
                ErrorResponse,
            )
        ),
        tags(
            (name = "Equipment Service", description = "Equipment CRUD endpoints."),
            (name = "Report Service", description = "Verification report generation endpoints.")
        )
    )]
    struct ApiDoc;

    dotenvy::dotenv().ok(); // Load .env file
    let app_state = match AppState::from_env() {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialize. Check TENANT_ID/CLIENT_ID/CLIENT_SECRET/DATAVERSE_URL in .env. Error: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("indus_equipment_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    log::info!("Starting server at http://0.0.0.0:8080");

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(
                web::scope("/api")
                    .service(web::resource("/health").route(web::get().to(health)))
                    .service(
                        web::resource("/equipment")
                            .route(web::get().to(equipment::handlers::get_all_equipment))
                            .route(web::post().to(equipment::handlers::create_equipment)),
                    )
                    .service(
                        web::resource("/equipment/{id}/pdf")
                            .route(web::get().to(equipment::handlers::get_equipment_pdf)),
                    )
                    .service(
                        web::resource("/equipment/{id}/docx")
                            .route(web::get().to(equipment::handlers::get_equipment_docx)),
                    )
                    .service(
                        web::resource("/equipment/{id}/word-pdf")
                            .route(web::get().to(equipment::handlers::get_equipment_word_pdf)),
                    )
                    .service(
                        web::resource("/equipment/{id}")
                            .route(web::get().to(equipment::handlers::get_equipment_by_id))
                            .route(web::patch().to(equipment::handlers::update_equipment))
                            .route(web::delete().to(equipment::handlers::delete_equipment)),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
