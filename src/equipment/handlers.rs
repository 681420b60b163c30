use actix_web::http::header;
use actix_web::{
    web::{self, Path},
    HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dataverse::{DataverseError, EquipmentFilters, EquipmentRecord, NewEquipment};
use crate::report::{
    OutputFormat, RenderStrategy, RenderedDocument, ReportError, ReportRequest,
};
use crate::state::AppState;
use crate::ErrorResponse;

#[derive(Serialize, ToSchema)]
pub struct EquipmentListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<EquipmentRecord>,
}

#[derive(Serialize, ToSchema)]
pub struct EquipmentResponse {
    pub success: bool,
    pub data: EquipmentRecord,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Render strategy override; defaults to what this deployment supports.
    pub strategy: Option<RenderStrategy>,
}

/// Map a Dataverse failure to a response with a stable error code.
fn dataverse_error_response(err: &DataverseError) -> HttpResponse {
    let message = err.to_string();
    match err {
        DataverseError::AuthenticationFailed { .. } => HttpResponse::BadGateway()
            .json(ErrorResponse::new("AuthenticationFailed", &message)),
        DataverseError::RequestFailed { status: 404, .. } => {
            HttpResponse::NotFound().json(ErrorResponse::not_found("Equipment not found"))
        }
        DataverseError::RequestFailed { .. } => HttpResponse::BadGateway()
            .json(ErrorResponse::new("RemoteRequestFailed", &message)),
        DataverseError::Unavailable(_) => HttpResponse::ServiceUnavailable()
            .json(ErrorResponse::new("RemoteUnavailable", &message)),
        DataverseError::BadResponse(_) => HttpResponse::BadGateway()
            .json(ErrorResponse::new("RemoteRequestFailed", &message)),
    }
}

/// Map a report failure to a response. The stable code comes from the root
/// cause; the message keeps the record-id wrapper for diagnosability.
fn report_error_response(err: &ReportError) -> HttpResponse {
    let message = err.to_string();
    match err.root() {
        ReportError::Dataverse(inner) => dataverse_error_response(inner),
        ReportError::TemplateBinding { .. } => HttpResponse::InternalServerError()
            .json(ErrorResponse::new("TemplateBindingError", &message)),
        ReportError::ConversionEnvironmentUnavailable { .. } => HttpResponse::ServiceUnavailable()
            .json(ErrorResponse::new("ConversionEnvironmentUnavailable", &message)),
        ReportError::CapabilityUnavailable { .. } => HttpResponse::NotImplemented()
            .json(ErrorResponse::new("CapabilityUnavailable", &message)),
        ReportError::RenderFailed { .. } => HttpResponse::BadGateway()
            .json(ErrorResponse::new("RenderFailed", &message)),
        ReportError::TemplateIo(_) | ReportError::TemplateInvalid { .. } => {
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&message))
        }
        ReportError::Record { .. } => {
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&message))
        }
    }
}

/// Serve a finished document as a download. Errors abort before this point,
/// so a response either carries the complete document or none of it.
fn document_response(document: RenderedDocument) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, document.content_type))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ))
        .body(document.bytes)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Equipment Service",
    get,
    path = "/equipment",
    params(EquipmentFilters),
    responses(
        (status = 200, description = "Matching equipment, newest first", body = EquipmentListResponse),
        (status = 502, description = "Upstream request failed", body = ErrorResponse)
    )
)]
pub async fn get_all_equipment(
    filters: web::Query<EquipmentFilters>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.records.list(&filters).await {
        Ok(records) => HttpResponse::Ok().json(EquipmentListResponse {
            success: true,
            count: records.len(),
            data: records,
        }),
        Err(e) => {
            log::error!("Listing equipment failed: {e}");
            dataverse_error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Equipment Service",
    get,
    path = "/equipment/{id}",
    responses(
        (status = 200, description = "Equipment found", body = EquipmentResponse),
        (status = 404, description = "Equipment not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Equipment record identifier")
    )
)]
pub async fn get_equipment_by_id(
    id: Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.records.get(&id).await {
        Ok(record) => HttpResponse::Ok().json(EquipmentResponse {
            success: true,
            data: record,
        }),
        Err(e) => dataverse_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Equipment Service",
    post,
    path = "/equipment",
    request_body = NewEquipment,
    responses(
        (status = 201, description = "Equipment created", body = EquipmentResponse),
        (status = 502, description = "Upstream request failed", body = ErrorResponse)
    )
)]
pub async fn create_equipment(
    payload: web::Json<NewEquipment>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.records.create(&payload).await {
        Ok(record) => HttpResponse::Created().json(EquipmentResponse {
            success: true,
            data: record,
        }),
        Err(e) => dataverse_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Equipment Service",
    patch,
    path = "/equipment/{id}",
    request_body = NewEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = EquipmentResponse),
        (status = 404, description = "Equipment not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Equipment record identifier")
    )
)]
pub async fn update_equipment(
    id: Path<String>,
    payload: web::Json<NewEquipment>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.records.update(&id, &payload).await {
        Ok(record) => HttpResponse::Ok().json(EquipmentResponse {
            success: true,
            data: record,
        }),
        Err(e) => dataverse_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Equipment Service",
    delete,
    path = "/equipment/{id}",
    responses(
        (status = 200, description = "Equipment deleted", body = DeleteResponse),
        (status = 404, description = "Equipment not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Equipment record identifier")
    )
)]
pub async fn delete_equipment(
    id: Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    match data.records.delete(&id).await {
        Ok(()) => HttpResponse::Ok().json(DeleteResponse {
            success: true,
            message: "Equipment deleted successfully".to_string(),
        }),
        Err(e) => dataverse_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    get,
    path = "/equipment/{id}/pdf",
    params(
        ("id" = String, Path, description = "Equipment record identifier"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "PDF verification report", content_type = "application/pdf"),
        (status = 501, description = "No capable backend configured", body = ErrorResponse)
    )
)]
pub async fn get_equipment_pdf(
    id: Path<String>,
    query: web::Query<ReportQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = ReportRequest {
        record_id: id.into_inner(),
        format: OutputFormat::Pdf,
        strategy: query
            .strategy
            .unwrap_or_else(|| data.reports.default_pdf_strategy()),
    };
    match data.reports.generate(&request).await {
        Ok(document) => document_response(document),
        Err(e) => {
            log::error!("Report generation failed: {e}");
            report_error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    get,
    path = "/equipment/{id}/docx",
    params(
        ("id" = String, Path, description = "Equipment record identifier")
    ),
    responses(
        (status = 200, description = "Word verification report",
         content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 500, description = "Template binding failed", body = ErrorResponse)
    )
)]
pub async fn get_equipment_docx(id: Path<String>, data: web::Data<AppState>) -> impl Responder {
    let request = ReportRequest {
        record_id: id.into_inner(),
        format: OutputFormat::Docx,
        strategy: RenderStrategy::OfficeAutomation,
    };
    match data.reports.generate(&request).await {
        Ok(document) => document_response(document),
        Err(e) => {
            log::error!("Report generation failed: {e}");
            report_error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    get,
    path = "/equipment/{id}/word-pdf",
    params(
        ("id" = String, Path, description = "Equipment record identifier")
    ),
    responses(
        (status = 200, description = "PDF rendered from the Word template", content_type = "application/pdf"),
        (status = 503, description = "Office conversion environment unavailable", body = ErrorResponse)
    )
)]
pub async fn get_equipment_word_pdf(
    id: Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    let request = ReportRequest {
        record_id: id.into_inner(),
        format: OutputFormat::Pdf,
        strategy: RenderStrategy::OfficeAutomation,
    };
    match data.reports.generate(&request).await {
        Ok(document) => document_response(document),
        Err(e) => {
            log::error!("Report generation failed: {e}");
            report_error_response(&e)
        }
    }
}
