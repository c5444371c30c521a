use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use super::rerender;
use crate::{
    AppState,
    auth::issue_token,
    error::{AdminError, ErrorBody},
    models::{
        Employee, FieldError, LoginForm, NewEmployee, RegisterForm, RegisterView, TokenResponse,
        hash_password,
    },
    repository::RepoError,
};

/// register
///
/// [Public Route] Creates a regular (non-admin) employee account. Admin
/// accounts are provisioned directly in the database.
#[utoipa::path(
    post,
    path = "/register",
    tag = "account",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Registered", body = Employee),
        (status = 409, description = "Email or username taken", body = ErrorBody),
        (status = 422, description = "Form re-rendered with errors", body = RegisterView)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AdminError> {
    let form = RegisterForm {
        email: form.email.trim().to_lowercase(),
        username: form.username.trim().to_string(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        ..form
    };

    if let Err(errors) = form.validate() {
        return Ok(rerender(RegisterView {
            title: "Register".to_string(),
            email: form.email,
            username: form.username,
            first_name: form.first_name,
            last_name: form.last_name,
            errors: FieldError::from_validation(&errors),
        }));
    }

    let new_employee = NewEmployee {
        password_hash: hash_password(&form.password)?,
        email: form.email,
        username: form.username,
        first_name: form.first_name,
        last_name: form.last_name,
        is_admin: false,
    };

    match state.repo.create_employee(new_employee).await {
        Ok(employee) => {
            tracing::info!(employee_id = employee.id, "employee registered");
            Ok((StatusCode::CREATED, Json(employee)).into_response())
        }
        Err(RepoError::Duplicate(constraint)) => {
            let field = if constraint.contains("username") { "username" } else { "email" };
            Err(AdminError::Conflict(format!(
                "An account with that {} already exists.",
                field
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// login
///
/// [Public Route] Exchanges email + password for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    tag = "account",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid email or password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AdminError> {
    let email = form.email.trim().to_lowercase();
    let employee = state
        .repo
        .find_employee_by_email(&email)
        .await?
        .filter(|e| e.verify_password(&form.password))
        .ok_or_else(|| {
            tracing::info!("login rejected");
            AdminError::Unauthorized
        })?;

    let token = issue_token(&state.config, employee.id)?;
    tracing::info!(employee_id = employee.id, "employee logged in");
    Ok(Json(TokenResponse { token }))
}
