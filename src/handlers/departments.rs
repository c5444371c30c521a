use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use validator::Validate;

use super::{
    DEPARTMENTS_PATH, confirm_view, confirmation_missing, entity_form_view, rerender,
};
use crate::{
    AppState,
    auth::{AuthUser, check_admin},
    error::{AdminError, ErrorBody},
    models::{
        ConfirmForm, DeleteConfirmView, Department, DepartmentList, EntityForm, EntityFormView,
        FieldError, Flash,
    },
    repository::RepoError,
};

pub const ADDED: &str = "You have successfully added a new department.";
pub const EDITED: &str = "You have successfully edited the department.";
pub const DELETED: &str = "You have successfully deleted the department.";
pub const DUPLICATE: &str = "Error: department name already exists.";

async fn find_department(state: &AppState, id: i32) -> Result<Department, AdminError> {
    state
        .repo
        .get_department(id)
        .await?
        .ok_or_else(|| AdminError::NotFound("Department".to_string()))
}

/// list_departments
///
/// [Admin Route] Every department, plus any pending flash messages.
#[utoipa::path(
    get,
    path = "/admin/departments",
    tag = "departments",
    responses(
        (status = 200, description = "Departments", body = DepartmentList),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn list_departments(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DepartmentList>, AdminError> {
    check_admin(&user)?;
    let departments = state.repo.list_departments().await?;
    Ok(Json(DepartmentList {
        title: "Departments".to_string(),
        flashes: state.flash.drain(user.id),
        departments,
    }))
}

/// add_department_form
///
/// [Admin Route] Blank add page.
#[utoipa::path(
    get,
    path = "/admin/departments/add",
    tag = "departments",
    responses((status = 200, description = "Empty form", body = EntityFormView))
)]
pub async fn add_department_form(user: AuthUser) -> Result<Json<EntityFormView>, AdminError> {
    check_admin(&user)?;
    Ok(Json(entity_form_view(
        "Add Department",
        None,
        &EntityForm::default(),
        vec![],
    )))
}

/// add_department
///
/// [Admin Route] Inserts a department. A taken name is reported through a
/// flash message, exactly like success, and both redirect to the list. Any
/// other store failure is a 500.
#[utoipa::path(
    post,
    path = "/admin/departments/add",
    tag = "departments",
    request_body(content = EntityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the department list"),
        (status = 422, description = "Form re-rendered with errors", body = EntityFormView)
    )
)]
pub async fn add_department(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<EntityForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;

    let form = form.normalized();
    if let Err(errors) = form.validate() {
        let errors = FieldError::from_validation(&errors);
        return Ok(rerender(entity_form_view("Add Department", None, &form, errors)));
    }

    match state.repo.create_department(form).await {
        Ok(department) => {
            tracing::info!(id = department.id, name = %department.name, "department added");
            state.flash.push(user.id, Flash::success(ADDED));
        }
        Err(RepoError::Duplicate(constraint)) => {
            tracing::info!(%constraint, "department name already taken");
            state.flash.push(user.id, Flash::error(DUPLICATE));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(DEPARTMENTS_PATH).into_response())
}

/// edit_department_form
///
/// [Admin Route] Edit page pre-filled with the stored values.
#[utoipa::path(
    get,
    path = "/admin/departments/edit/{id}",
    tag = "departments",
    params(("id" = i32, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Pre-filled form", body = EntityFormView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn edit_department_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EntityFormView>, AdminError> {
    check_admin(&user)?;
    let department = find_department(&state, id).await?;
    let current = EntityForm {
        name: department.name,
        description: department.description,
    };
    Ok(Json(entity_form_view("Edit Department", Some(id), &current, vec![])))
}

/// edit_department
///
/// [Admin Route] Overwrites name and description of one department.
#[utoipa::path(
    post,
    path = "/admin/departments/edit/{id}",
    tag = "departments",
    params(("id" = i32, Path, description = "Department ID")),
    request_body(content = EntityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the department list"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Form re-rendered with errors", body = EntityFormView)
    )
)]
pub async fn edit_department(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<EntityForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;
    let department = find_department(&state, id).await?;

    let form = form.normalized();
    if let Err(errors) = form.validate() {
        // The edit page always shows the stored values.
        let current = EntityForm {
            name: department.name,
            description: department.description,
        };
        let errors = FieldError::from_validation(&errors);
        return Ok(rerender(entity_form_view("Edit Department", Some(id), &current, errors)));
    }

    match state.repo.update_department(id, form).await {
        Ok(department) => {
            tracing::info!(id, name = %department.name, "department edited");
            state.flash.push(user.id, Flash::success(EDITED));
        }
        Err(RepoError::Duplicate(constraint)) => {
            tracing::info!(id, %constraint, "department rename collided");
            state.flash.push(user.id, Flash::error(DUPLICATE));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(DEPARTMENTS_PATH).into_response())
}

/// delete_department_confirm
///
/// [Admin Route] Confirmation page. Shows how many employees still reference
/// the department and which orphan policy will apply.
#[utoipa::path(
    get,
    path = "/admin/departments/delete/{id}",
    tag = "departments",
    params(("id" = i32, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Confirmation page", body = DeleteConfirmView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_department_confirm(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteConfirmView>, AdminError> {
    check_admin(&user)?;
    let department = find_department(&state, id).await?;
    let employees = state.repo.employees_in_department(id).await?;
    Ok(Json(confirm_view(
        "Delete Department",
        id,
        &department.name,
        employees.len(),
        state.config.delete_policy,
        vec![],
    )))
}

/// delete_department
///
/// [Admin Route] Removes a department once `confirm=true` is submitted.
/// Referencing employees are handled by the configured orphan policy.
#[utoipa::path(
    post,
    path = "/admin/departments/delete/{id}",
    tag = "departments",
    params(("id" = i32, Path, description = "Department ID")),
    request_body(content = ConfirmForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the department list"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Still referenced (restrict policy)", body = ErrorBody),
        (status = 422, description = "Confirmation missing", body = DeleteConfirmView)
    )
)]
pub async fn delete_department(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(confirmation): Form<ConfirmForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;
    let department = find_department(&state, id).await?;

    if !confirmation.confirm {
        let employees = state.repo.employees_in_department(id).await?;
        return Ok(rerender(confirm_view(
            "Delete Department",
            id,
            &department.name,
            employees.len(),
            state.config.delete_policy,
            confirmation_missing(),
        )));
    }

    state
        .repo
        .delete_department(id, state.config.delete_policy)
        .await?;
    tracing::info!(id, name = %department.name, "department deleted");
    state.flash.push(user.id, Flash::success(DELETED));

    Ok(Redirect::to(DEPARTMENTS_PATH).into_response())
}
