use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use super::{EMPLOYEES_PATH, rerender};
use crate::{
    AppState,
    auth::{AuthUser, check_admin},
    error::{AdminError, ErrorBody},
    models::{AssignView, AssignmentForm, Employee, EmployeeList, FieldError, Flash},
    repository::RepoError,
};

pub const ASSIGNED: &str = "You have successfully assigned a department and role.";

/// list_employees
///
/// [Admin Route] Every employee. Credentials are never part of the payload.
#[utoipa::path(
    get,
    path = "/admin/employees",
    tag = "employees",
    responses(
        (status = 200, description = "Employees", body = EmployeeList),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn list_employees(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<EmployeeList>, AdminError> {
    check_admin(&user)?;
    let employees = state.repo.list_employees().await?;
    Ok(Json(EmployeeList {
        title: "Employees".to_string(),
        flashes: state.flash.drain(user.id),
        employees,
    }))
}

/// Loads the target and rejects administrators, who are never assignable.
async fn find_assignable(state: &AppState, id: i32) -> Result<Employee, AdminError> {
    let employee = state
        .repo
        .get_employee(id)
        .await?
        .ok_or_else(|| AdminError::NotFound("Employee".to_string()))?;
    if employee.is_admin {
        tracing::warn!(employee_id = id, "refused to assign department/role to an administrator");
        return Err(AdminError::Forbidden);
    }
    Ok(employee)
}

/// Builds the assignment page with department and role choices read live
/// from the store.
async fn assign_view(
    state: &AppState,
    employee: Employee,
    selection: &AssignmentForm,
    errors: Vec<FieldError>,
) -> Result<AssignView, AdminError> {
    Ok(AssignView {
        title: "Assign Employee".to_string(),
        employee,
        departments: state.repo.list_departments().await?,
        roles: state.repo.list_roles().await?,
        department_id: selection.department_id,
        role_id: selection.role_id,
        errors,
    })
}

/// assign_employee_form
///
/// [Admin Route] Assignment page pre-selected with the current references.
#[utoipa::path(
    get,
    path = "/admin/employees/assign/{id}",
    tag = "employees",
    params(("id" = i32, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Assignment page", body = AssignView),
        (status = 403, description = "Target is an administrator", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn assign_employee_form(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AssignView>, AdminError> {
    check_admin(&user)?;
    let employee = find_assignable(&state, id).await?;
    let current = AssignmentForm {
        department_id: employee.department_id,
        role_id: employee.role_id,
    };
    Ok(Json(assign_view(&state, employee, &current, vec![]).await?))
}

/// assign_employee
///
/// [Admin Route] Overwrites the employee's department and role.
///
/// *Validation*: a selected department or role must exist; otherwise the page
/// is re-rendered and nothing is written.
#[utoipa::path(
    post,
    path = "/admin/employees/assign/{id}",
    tag = "employees",
    params(("id" = i32, Path, description = "Employee ID")),
    request_body(content = AssignmentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the employee list"),
        (status = 403, description = "Target is an administrator", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Unknown department or role", body = AssignView)
    )
)]
pub async fn assign_employee(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<AssignmentForm>,
) -> Result<Response, AdminError> {
    check_admin(&user)?;
    let employee = find_assignable(&state, id).await?;

    let mut errors = Vec::new();
    if let Some(department_id) = form.department_id {
        if state.repo.get_department(department_id).await?.is_none() {
            errors.push(FieldError::new("department_id", "Not a valid choice."));
        }
    }
    if let Some(role_id) = form.role_id {
        if state.repo.get_role(role_id).await?.is_none() {
            errors.push(FieldError::new("role_id", "Not a valid choice."));
        }
    }
    if !errors.is_empty() {
        return Ok(rerender(assign_view(&state, employee, &form, errors).await?));
    }

    match state.repo.assign_employee(id, form.clone()).await {
        Ok(updated) => {
            tracing::info!(
                employee_id = id,
                department_id = ?updated.department_id,
                role_id = ?updated.role_id,
                "employee assigned"
            );
            state.flash.push(user.id, Flash::success(ASSIGNED));
        }
        // The choice vanished between the check above and the write.
        Err(RepoError::MissingReference(constraint)) => {
            let field = if constraint.contains("role") { "role_id" } else { "department_id" };
            let errors = vec![FieldError::new(field, "Not a valid choice.")];
            return Ok(rerender(assign_view(&state, employee, &form, errors).await?));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(EMPLOYEES_PATH).into_response())
}
