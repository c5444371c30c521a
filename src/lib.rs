use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;

// Routing segregated by access level (public, admin).
pub mod routes;
use auth::{AuthUser, check_admin};
use error::AdminError;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::{AppConfig, DeletePolicy};
pub use flash::{FlashState, FlashStore};
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::departments::list_departments, handlers::departments::add_department_form,
        handlers::departments::add_department, handlers::departments::edit_department_form,
        handlers::departments::edit_department, handlers::departments::delete_department_confirm,
        handlers::departments::delete_department,
        handlers::roles::list_roles, handlers::roles::add_role_form, handlers::roles::add_role,
        handlers::roles::edit_role_form, handlers::roles::edit_role,
        handlers::roles::delete_role_confirm, handlers::roles::delete_role,
        handlers::employees::list_employees, handlers::employees::assign_employee_form,
        handlers::employees::assign_employee,
        handlers::account::register, handlers::account::login
    ),
    components(
        schemas(
            models::Employee, models::Department, models::Role, models::EntityForm,
            models::AssignmentForm, models::ConfirmForm, models::RegisterForm, models::LoginForm,
            models::Flash, models::FlashLevel, models::FieldError, models::DepartmentList,
            models::RoleList, models::EmployeeList, models::EntityFormView,
            models::DeleteConfirmView, models::AssignView, models::RegisterView,
            models::TokenResponse, error::ErrorBody,
        )
    ),
    tags(
        (name = "departments", description = "Department administration"),
        (name = "roles", description = "Role administration"),
        (name = "employees", description = "Employee listing and assignment"),
        (name = "account", description = "Registration and login")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Entity store.
    pub repo: RepositoryState,
    /// Pending flash messages, keyed by principal.
    pub flash: FlashState,
    /// Immutable configuration loaded at startup.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            flash: FlashState::default(),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for FlashState {
    fn from_ref(app_state: &AppState) -> FlashState {
        app_state.flash.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// admin_guard
///
/// Route layer for the `/admin` tree. Authentication failures are rejected by
/// the `AuthUser` extractor (401); authenticated non-admins get 403 before the
/// handler's own extractors (path, form body) run.
async fn admin_guard(
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    check_admin(&user)?;
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles routes, middleware and shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_guard,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Generates a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, correlated by its x-request-id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
