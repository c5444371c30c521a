use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use validator::Validate;

use super::{ROLES_PATH, confirm_view, confirmation_missing, entity_form_view, rerender};
use crate::{
    AppState,
    auth::{AuthUser, check_admin},
    error::{AdminError, ErrorBody},
    models::{
        ConfirmForm, DeleteConfirmView, EntityForm, EntityFormView, FieldError, Flash, Role,
        RoleList,
    },
    repository::RepoError,
};

pub const ADDED: &str = "You have successfully added a new role.";
pub const EDITED: &str = "You have successfully edited the role.";
pub const DELETED: &str = "You have successfully deleted the role.";
pub const DUPLICATE: &str = "Error: role name already exists.";

async fn find_role(state: &AppState, id: i32) -> Result<Role, AdminError> {
    state
        .repo
        .get_role(id)
        .await?
        .ok_or_else(|| AdminError::NotFound("Role".to_string()))
}

/// list_roles
///
/// [Admin Route] Every role, plus any pending flash messages.
#[utoipa::path(
    get,
    path = "/admin/roles",
    tag = "roles",
    responses(
        (status = 200, description = "Roles", body = RoleList),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn list_roles(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RoleList>, AdminError> {
    check_admin(&user)?;
    let roles = state.repo.list_roles().await?;
    Ok(Json(RoleList {
        title: "Roles".to_string(),
        flashes: state.flash.drain(user.id),
        roles,
    }))
}

/// add_role_form
///
/// [Admin Route] Blank add page.
#[utoipa::path(
    get,
    path = "/admin/roles/add",
    tag = "roles",
    responses((status = 200, description = "Empty form", body = EntityFormView))
)]
pub async fn add_role_form(user: AuthUser) -> Result<Json<EntityFormView>, AdminError> {
    check_admin(&user)?;
    Ok(Json(entity_form_view(
        "Add Role",
        None,
        &EntityForm::default(),
        vec![],
    )))
}

/// add_role
///
/// [Admin Route] Same flow as `add_department`.
#[utoipa::path(
    post,
    path = "/admin/roles/add",
    tag = "roles",
    request_body(content = EntityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the role list"),
        (status = 422, description = "Form re-rendered with errors", body = EntityFormView)
    )
)]
pub async fn add_role(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<EntityForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;

    let form = form.normalized();
    if let Err(errors) = form.validate() {
        let errors = FieldError::from_validation(&errors);
        return Ok(rerender(entity_form_view("Add Role", None, &form, errors)));
    }

    match state.repo.create_role(form).await {
        Ok(role) => {
            tracing::info!(id = role.id, name = %role.name, "role added");
            state.flash.push(user.id, Flash::success(ADDED));
        }
        Err(RepoError::Duplicate(constraint)) => {
            tracing::info!(%constraint, "role name already taken");
            state.flash.push(user.id, Flash::error(DUPLICATE));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(ROLES_PATH).into_response())
}

/// edit_role_form
///
/// [Admin Route] Edit page pre-filled with the stored values.
#[utoipa::path(
    get,
    path = "/admin/roles/edit/{id}",
    tag = "roles",
    params(("id" = i32, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Pre-filled form", body = EntityFormView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn edit_role_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EntityFormView>, AdminError> {
    check_admin(&user)?;
    let role = find_role(&state, id).await?;
    let current = EntityForm {
        name: role.name,
        description: role.description,
    };
    Ok(Json(entity_form_view("Edit Role", Some(id), &current, vec![])))
}

/// edit_role
///
/// [Admin Route] Overwrites name and description of one role.
#[utoipa::path(
    post,
    path = "/admin/roles/edit/{id}",
    tag = "roles",
    params(("id" = i32, Path, description = "Role ID")),
    request_body(content = EntityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the role list"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Form re-rendered with errors", body = EntityFormView)
    )
)]
pub async fn edit_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<EntityForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;
    let role = find_role(&state, id).await?;

    let form = form.normalized();
    if let Err(errors) = form.validate() {
        let current = EntityForm {
            name: role.name,
            description: role.description,
        };
        let errors = FieldError::from_validation(&errors);
        return Ok(rerender(entity_form_view("Edit Role", Some(id), &current, errors)));
    }

    match state.repo.update_role(id, form).await {
        Ok(role) => {
            tracing::info!(id, name = %role.name, "role edited");
            state.flash.push(user.id, Flash::success(EDITED));
        }
        Err(RepoError::Duplicate(constraint)) => {
            tracing::info!(id, %constraint, "role rename collided");
            state.flash.push(user.id, Flash::error(DUPLICATE));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(ROLES_PATH).into_response())
}

/// delete_role_confirm
#[utoipa::path(
    get,
    path = "/admin/roles/delete/{id}",
    tag = "roles",
    params(("id" = i32, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Confirmation page", body = DeleteConfirmView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_role_confirm(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteConfirmView>, AdminError> {
    check_admin(&user)?;
    let role = find_role(&state, id).await?;
    let employees = state.repo.employees_in_role(id).await?;
    Ok(Json(confirm_view(
        "Delete Role",
        id,
        &role.name,
        employees.len(),
        state.config.delete_policy,
        vec![],
    )))
}

/// delete_role
///
/// [Admin Route] Removes a role once confirmed.
#[utoipa::path(
    post,
    path = "/admin/roles/delete/{id}",
    tag = "roles",
    params(("id" = i32, Path, description = "Role ID")),
    request_body(content = ConfirmForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the role list"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Still referenced (restrict policy)", body = ErrorBody),
        (status = 422, description = "Confirmation missing", body = DeleteConfirmView)
    )
)]
pub async fn delete_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(confirmation): Form<ConfirmForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;
    let role = find_role(&state, id).await?;

    if !confirmation.confirm {
        let employees = state.repo.employees_in_role(id).await?;
        return Ok(rerender(confirm_view(
            "Delete Role",
            id,
            &role.name,
            employees.len(),
            state.config.delete_policy,
            confirmation_missing(),
        )));
    }

    state
        .repo
        .delete_role(id, state.config.delete_policy)
        .await?;
    tracing::info!(id, name = %role.name, "role deleted");
    state.flash.push(user.id, Flash::success(DELETED));

    Ok(Redirect::to(ROLES_PATH).into_response())
}
