//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::adapters::spreadsheet::{read_sheet, write_error_report, write_sample_template};
use crate::web::{jobs::JobState, jobs::JobStatus, middleware::Role, state::AppState};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use chrono::Utc;
use results_portal_core::admin::{self, AdminError, EntityKind, ResultForm};
use results_portal_core::domain::ExamUpdate;
use results_portal_core::lookup::{find_published_result, LookupError};
use results_portal_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        start_import_handler,
        import_status_handler,
        import_errors_handler,
        import_template_handler,
        search_results_handler,
        create_result_handler,
        get_result_handler,
        update_result_handler,
        delete_result_handler,
        list_sessions_handler,
        create_session_handler,
        update_session_handler,
        delete_session_handler,
        list_classes_handler,
        create_class_handler,
        update_class_handler,
        delete_class_handler,
        list_exams_handler,
        create_exam_handler,
        update_exam_handler,
        delete_exam_handler,
    ),
    components(
        schemas(StartImportResponse, JobStatus, JobState, CreateExamRequest, SessionRequest, ClassRequest)
    ),
    tags(
        (name = "Results Portal API", description = "Bulk result imports, admin records and the public result search.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload sent after an upload has been accepted.
#[derive(Serialize, ToSchema)]
pub struct StartImportResponse {
    import_id: Uuid,
    total_rows: usize,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Include soft-deleted records.
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Roll number or registration number.
    identifier: String,
    session_id: Option<Uuid>,
    /// Date of birth (`YYYY-MM-DD`) or mobile number.
    guard: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateExamRequest {
    exam_name: String,
    exam_date: String,
    class_id: Option<Uuid>,
    session_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct SessionRequest {
    name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ClassRequest {
    name: String,
    session_id: Option<Uuid>,
}

type HandlerError = (StatusCode, String);

fn port_error(e: PortError) -> HandlerError {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Unauthorized => StatusCode::FORBIDDEN,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Store error: {:?}", e);
        return (status, "Internal server error".to_string());
    }
    (status, e.to_string())
}

fn admin_error(e: AdminError) -> HandlerError {
    match e {
        AdminError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
        AdminError::Duplicate => (StatusCode::CONFLICT, e.to_string()),
        AdminError::Port(e) => port_error(e),
    }
}

fn xlsx_download(file_name: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
}

//=========================================================================================
// Import Handlers
//=========================================================================================

/// Upload a results spreadsheet and start importing it.
///
/// Accepts a multipart/form-data request with a `file` part (.xlsx, .xls,
/// .ods or .csv). The import runs in the background; follow it with
/// `GET /imports/{id}` or the `/imports/{id}/ws` feed.
#[utoipa::path(
    post,
    path = "/imports",
    request_body(content_type = "multipart/form-data", description = "The spreadsheet to import."),
    responses(
        (status = 202, description = "Import started", body = StartImportResponse),
        (status = 400, description = "Missing file or unreadable spreadsheet"),
        (status = 403, description = "Caller is not admin or staff"),
        (status = 413, description = "File exceeds the upload limit")
    ),
    params(
        ("x-user-role" = String, Header, description = "admin or staff")
    )
)]
pub async fn start_import_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(role): Extension<Role>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (e.status(), format!("Failed to read multipart data: {}", e.body_text()))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.xlsx").to_string();
        // Over the body limit this fails with 413.
        let data = field.bytes().await.map_err(|e| {
            (e.status(), format!("Failed to read file bytes: {}", e.body_text()))
        })?;
        upload = Some((name, data));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        )
    })?;
    if data.len() > app_state.config.max_upload_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "File is larger than {} bytes",
                app_state.config.max_upload_bytes
            ),
        ));
    }

    let sheet = read_sheet(&file_name, &data).map_err(|e| {
        warn!("Rejected upload '{}': {}", file_name, e);
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;
    let total_rows = sheet.rows.len();

    info!("{:?} uploaded '{}' ({} bytes)", role, file_name, data.len());
    let import_id = app_state
        .jobs
        .spawn_import(app_state.importer.clone(), sheet, file_name)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartImportResponse {
            import_id,
            total_rows,
        }),
    ))
}

/// Current progress, and the report once finished, of an import.
#[utoipa::path(
    get,
    path = "/imports/{id}",
    responses(
        (status = 200, description = "Import status", body = JobStatus),
        (status = 404, description = "Unknown import")
    ),
    params(("id" = Uuid, Path, description = "Import id"))
)]
pub async fn import_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(import_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    app_state
        .jobs
        .status(import_id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Import {} not found", import_id)))
}

/// Download a finished import's errors as a spreadsheet.
#[utoipa::path(
    get,
    path = "/imports/{id}/errors.xlsx",
    responses(
        (status = 200, description = "Spreadsheet with an Errors sheet"),
        (status = 404, description = "Unknown import, or no errors to report"),
        (status = 409, description = "Import still running")
    ),
    params(("id" = Uuid, Path, description = "Import id"))
)]
pub async fn import_errors_handler(
    State(app_state): State<Arc<AppState>>,
    Path(import_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let status = app_state
        .jobs
        .status(import_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Import {} not found", import_id)))?;
    let report = status.report.ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            "Import is still running".to_string(),
        )
    })?;
    if report.errors.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            "Import finished without errors".to_string(),
        ));
    }

    let bytes = write_error_report(&report.errors).map_err(|e| {
        error!("Failed to build error report for {}: {}", import_id, e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(xlsx_download(&format!("import-{}-errors.xlsx", import_id), bytes))
}

/// Download the blank upload template.
#[utoipa::path(
    get,
    path = "/imports/template.xlsx",
    responses(
        (status = 200, description = "Template spreadsheet")
    )
)]
pub async fn import_template_handler() -> Result<impl IntoResponse, HandlerError> {
    let bytes = write_sample_template().map_err(|e| {
        error!("Failed to build template: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(xlsx_download("results-template.xlsx", bytes))
}

//=========================================================================================
// Result Handlers
//=========================================================================================

/// Public search for a published result.
#[utoipa::path(
    get,
    path = "/results/search",
    params(SearchParams),
    responses(
        (status = 200, description = "The matching result with its exam, class and session"),
        (status = 400, description = "Identifier missing"),
        (status = 404, description = "No published result, or no exams in the session")
    )
)]
pub async fn search_results_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, HandlerError> {
    let found = find_published_result(
        app_state.store.as_ref(),
        &params.identifier,
        params.session_id,
        params.guard.as_deref(),
    )
    .await
    .map_err(|e| match e {
        LookupError::MissingIdentifier => (StatusCode::BAD_REQUEST, e.to_string()),
        LookupError::NoExamsInSession | LookupError::NotFound => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        LookupError::Port(e) => port_error(e),
    })?;
    Ok(Json(found))
}

/// Add one result by hand.
#[utoipa::path(
    post,
    path = "/results",
    request_body(content_type = "application/json", description = "The result form"),
    responses(
        (status = 201, description = "Result saved"),
        (status = 400, description = "Missing or invalid field"),
        (status = 409, description = "Same exam + roll number already exists")
    )
)]
pub async fn create_result_handler(
    State(app_state): State<Arc<AppState>>,
    Json(form): Json<ResultForm>,
) -> Result<impl IntoResponse, HandlerError> {
    let saved = admin::save_result(app_state.store.as_ref(), form, None)
        .await
        .map_err(admin_error)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Load one result for the edit form.
#[utoipa::path(
    get,
    path = "/results/{id}",
    params(("id" = Uuid, Path, description = "Result id")),
    responses(
        (status = 200, description = "The result"),
        (status = 404, description = "Unknown result")
    )
)]
pub async fn get_result_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let result = app_state.store.get_result(id).await.map_err(port_error)?;
    Ok(Json(result))
}

/// Edit an existing result.
#[utoipa::path(
    put,
    path = "/results/{id}",
    request_body(content_type = "application/json", description = "The result form"),
    params(("id" = Uuid, Path, description = "Result id")),
    responses(
        (status = 200, description = "Result updated"),
        (status = 404, description = "Unknown result"),
        (status = 409, description = "Another active result holds this exam + roll number")
    )
)]
pub async fn update_result_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(form): Json<ResultForm>,
) -> Result<impl IntoResponse, HandlerError> {
    let saved = admin::save_result(app_state.store.as_ref(), form, Some(id))
        .await
        .map_err(admin_error)?;
    Ok(Json(saved))
}

async fn deactivate(
    app_state: &AppState,
    kind: EntityKind,
    id: Uuid,
) -> Result<StatusCode, HandlerError> {
    admin::deactivate(app_state.store.as_ref(), kind, id)
        .await
        .map_err(admin_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete a result.
#[utoipa::path(
    delete,
    path = "/results/{id}",
    params(("id" = Uuid, Path, description = "Result id")),
    responses((status = 204, description = "Marked inactive"), (status = 404, description = "Unknown result"))
)]
pub async fn delete_result_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    deactivate(&app_state, EntityKind::Result, id).await
}

//=========================================================================================
// Session, Class and Exam Handlers
//=========================================================================================

/// List sessions, newest name first.
#[utoipa::path(
    get,
    path = "/sessions",
    params(ListParams),
    responses((status = 200, description = "Sessions"))
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, HandlerError> {
    let sessions = app_state
        .store
        .list_sessions(!params.include_inactive)
        .await
        .map_err(port_error)?;
    Ok(Json(sessions))
}

/// Create a session, or return the one that already has this name.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = SessionRequest,
    responses(
        (status = 201, description = "Session created or found"),
        (status = 400, description = "Name missing")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = admin::save_session(app_state.store.as_ref(), &req.name, None)
        .await
        .map_err(admin_error)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Rename a session.
#[utoipa::path(
    put,
    path = "/sessions/{id}",
    request_body = SessionRequest,
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session renamed"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Another session has this name")
    )
)]
pub async fn update_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = admin::save_session(app_state.store.as_ref(), &req.name, Some(id))
        .await
        .map_err(admin_error)?;
    Ok(Json(session))
}

/// Soft-delete a session.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses((status = 204, description = "Marked inactive"), (status = 404, description = "Unknown session"))
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    deactivate(&app_state, EntityKind::Session, id).await
}

/// List classes by name.
#[utoipa::path(
    get,
    path = "/classes",
    params(ListParams),
    responses((status = 200, description = "Classes"))
)]
pub async fn list_classes_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, HandlerError> {
    let classes = app_state
        .store
        .list_classes(!params.include_inactive)
        .await
        .map_err(port_error)?;
    Ok(Json(classes))
}

/// Save a class by name. An existing class with this name is moved to the
/// given session instead of being duplicated.
#[utoipa::path(
    post,
    path = "/classes",
    request_body = ClassRequest,
    responses(
        (status = 200, description = "Class saved"),
        (status = 400, description = "Name missing")
    )
)]
pub async fn create_class_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ClassRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let class = admin::save_class(app_state.store.as_ref(), &req.name, req.session_id, None)
        .await
        .map_err(admin_error)?;
    Ok(Json(class))
}

/// Rename a class or move it to another session.
#[utoipa::path(
    put,
    path = "/classes/{id}",
    request_body = ClassRequest,
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class updated"),
        (status = 404, description = "Unknown class"),
        (status = 409, description = "Another class has this name")
    )
)]
pub async fn update_class_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClassRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let class = admin::save_class(app_state.store.as_ref(), &req.name, req.session_id, Some(id))
        .await
        .map_err(admin_error)?;
    Ok(Json(class))
}

/// Soft-delete a class.
#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Class id")),
    responses((status = 204, description = "Marked inactive"), (status = 404, description = "Unknown class"))
)]
pub async fn delete_class_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    deactivate(&app_state, EntityKind::Class, id).await
}

/// List exams, latest date first. `is_upcoming` is recomputed from the date.
#[utoipa::path(
    get,
    path = "/exams",
    params(ListParams),
    responses((status = 200, description = "Exams"))
)]
pub async fn list_exams_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut exams = app_state
        .store
        .list_exams(!params.include_inactive)
        .await
        .map_err(port_error)?;
    let today = Utc::now().date_naive();
    for exam in &mut exams {
        exam.refresh_upcoming(today);
    }
    Ok(Json(exams))
}

/// Create an exam, or return the existing one with the same name and date.
#[utoipa::path(
    post,
    path = "/exams",
    request_body = CreateExamRequest,
    responses(
        (status = 201, description = "Exam created or found"),
        (status = 400, description = "Name or date missing")
    )
)]
pub async fn create_exam_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let exam = admin::create_exam(
        app_state.store.as_ref(),
        &req.exam_name,
        &req.exam_date,
        req.class_id,
        req.session_id,
        Utc::now().date_naive(),
    )
    .await
    .map_err(admin_error)?;
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Edit an exam, including its upcoming flag.
#[utoipa::path(
    put,
    path = "/exams/{id}",
    request_body(content_type = "application/json", description = "exam_name, exam_date, class_id, is_upcoming"),
    params(("id" = Uuid, Path, description = "Exam id")),
    responses((status = 200, description = "Exam updated"), (status = 404, description = "Unknown exam"))
)]
pub async fn update_exam_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<ExamUpdate>,
) -> Result<impl IntoResponse, HandlerError> {
    let exam = app_state
        .store
        .update_exam(id, update)
        .await
        .map_err(port_error)?;
    Ok(Json(exam))
}

/// Soft-delete an exam.
#[utoipa::path(
    delete,
    path = "/exams/{id}",
    params(("id" = Uuid, Path, description = "Exam id")),
    responses((status = 204, description = "Marked inactive"), (status = 404, description = "Unknown exam"))
)]
pub async fn delete_exam_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    deactivate(&app_state, EntityKind::Exam, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use results_portal_core::MemoryStore;

    fn app_state() -> Arc<AppState> {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            _ => None,
        })
        .unwrap();
        Arc::new(AppState::new(Arc::new(MemoryStore::new()), Arc::new(config)))
    }

    async fn exam_id(state: &Arc<AppState>) -> Uuid {
        let req = CreateExamRequest {
            exam_name: "GK 2026".to_string(),
            exam_date: "2026-02-08".to_string(),
            class_id: None,
            session_id: None,
        };
        create_exam_handler(State(state.clone()), Json(req))
            .await
            .unwrap();
        state.store.list_exams(true).await.unwrap()[0].id
    }

    fn form(exam_id: Uuid) -> ResultForm {
        ResultForm {
            exam_id: Some(exam_id),
            class_name: "Class 5".to_string(),
            roll_no: "501".to_string(),
            student_name: "Amit Kumar".to_string(),
            mobile: Some("9876543210".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn saved_result_is_found_by_public_search() {
        let state = app_state();
        let exam_id = exam_id(&state).await;

        let created = create_result_handler(State(state.clone()), Json(form(exam_id)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        let params = SearchParams {
            identifier: "501".to_string(),
            session_id: None,
            guard: Some("9876543210".to_string()),
        };
        let found = search_results_handler(State(state.clone()), Query(params))
            .await
            .unwrap()
            .into_response();
        assert_eq!(found.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_result_is_a_conflict() {
        let state = app_state();
        let exam_id = exam_id(&state).await;
        create_result_handler(State(state.clone()), Json(form(exam_id)))
            .await
            .unwrap();

        let err = create_result_handler(State(state.clone()), Json(form(exam_id)))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);
        assert_eq!(err.1, "Same exam + roll number already exists.");
    }

    #[tokio::test]
    async fn search_maps_lookup_failures_to_statuses() {
        let state = app_state();
        let blank = SearchParams {
            identifier: " ".to_string(),
            session_id: None,
            guard: None,
        };
        let missing = SearchParams {
            identifier: "999".to_string(),
            session_id: None,
            guard: None,
        };

        let err = search_results_handler(State(state.clone()), Query(blank))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        let err = search_results_handler(State(state.clone()), Query(missing))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_unknown_records_is_not_found() {
        let state = app_state();
        let err = delete_exam_handler(State(state.clone()), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn class_form_saves_then_updates_by_name() {
        let state = app_state();
        let session = create_session_handler(
            State(state.clone()),
            Json(SessionRequest {
                name: "2026".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(session.status(), StatusCode::CREATED);
        let session_id = state.store.list_sessions(true).await.unwrap()[0].id;

        let req = || ClassRequest {
            name: "Class 5".to_string(),
            session_id: Some(session_id),
        };
        create_class_handler(State(state.clone()), Json(req()))
            .await
            .unwrap();
        create_class_handler(State(state.clone()), Json(req()))
            .await
            .unwrap();
        let classes = state.store.list_classes(true).await.unwrap();
        assert_eq!(classes.len(), 1);

        let renamed = ClassRequest {
            name: "Class 5A".to_string(),
            session_id: None,
        };
        update_class_handler(State(state.clone()), Path(classes[0].id), Json(renamed))
            .await
            .unwrap();
        let class = state.store.get_class(classes[0].id).await.unwrap();
        assert_eq!(class.name, "Class 5A");
        assert_eq!(class.session_id, None);

        let blank = ClassRequest {
            name: " ".to_string(),
            session_id: None,
        };
        let err = create_class_handler(State(state.clone()), Json(blank))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn renaming_a_session_onto_another_is_a_conflict() {
        let state = app_state();
        for name in ["2025", "2026"] {
            create_session_handler(
                State(state.clone()),
                Json(SessionRequest {
                    name: name.to_string(),
                }),
            )
            .await
            .unwrap();
        }
        let sessions = state.store.list_sessions(true).await.unwrap();
        assert_eq!(sessions[0].name, "2026");

        let err = update_session_handler(
            State(state.clone()),
            Path(sessions[0].id),
            Json(SessionRequest {
                name: "2025".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn saved_result_loads_for_editing() {
        let state = app_state();
        let exam_id = exam_id(&state).await;
        create_result_handler(State(state.clone()), Json(form(exam_id)))
            .await
            .unwrap();
        let saved = state
            .store
            .find_active_result(exam_id, "501")
            .await
            .unwrap()
            .unwrap();

        let loaded = get_result_handler(State(state.clone()), Path(saved.id))
            .await
            .unwrap()
            .into_response();
        assert_eq!(loaded.status(), StatusCode::OK);

        let err = get_result_handler(State(state.clone()), Path(Uuid::new_v4()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_import_is_not_found() {
        let state = app_state();
        let err = import_status_handler(State(state.clone()), Path(Uuid::new_v4()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
