/// Handler Module Index
///
/// One submodule per screen group. Every admin handler follows the same
/// sequence: access guard, load (404 if absent), validate (422 re-render),
/// one repository write, flash, 303 redirect to the list.
pub mod account;
pub mod departments;
pub mod employees;
pub mod roles;

pub use account::{login, register};
pub use departments::{
    add_department, add_department_form, delete_department, delete_department_confirm,
    edit_department, edit_department_form, list_departments,
};
pub use employees::{assign_employee, assign_employee_form, list_employees};
pub use roles::{
    add_role, add_role_form, delete_role, delete_role_confirm, edit_role, edit_role_form,
    list_roles,
};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::models::{DeleteConfirmView, EntityForm, EntityFormView, FieldError};

pub const DEPARTMENTS_PATH: &str = "/admin/departments";
pub const ROLES_PATH: &str = "/admin/roles";
pub const EMPLOYEES_PATH: &str = "/admin/employees";

/// Re-renders a form page with its validation errors. No state was changed.
pub(crate) fn rerender<T: Serialize>(view: T) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(view)).into_response()
}

/// Builds the add (`id = None`) or edit page for a department or role.
pub(crate) fn entity_form_view(
    title: &str,
    id: Option<i32>,
    form: &EntityForm,
    errors: Vec<FieldError>,
) -> EntityFormView {
    EntityFormView {
        title: title.to_string(),
        action: if id.is_some() { "Edit" } else { "Add" }.to_string(),
        id,
        name: form.name.clone(),
        description: form.description.clone(),
        errors,
    }
}

pub(crate) fn confirm_view(
    title: &str,
    id: i32,
    name: &str,
    employee_count: usize,
    policy: impl ToString,
    errors: Vec<FieldError>,
) -> DeleteConfirmView {
    DeleteConfirmView {
        title: title.to_string(),
        id,
        name: name.to_string(),
        employee_count,
        policy: policy.to_string(),
        errors,
    }
}

pub(crate) fn confirmation_missing() -> Vec<FieldError> {
    vec![FieldError::new("confirm", "Please confirm the deletion.")]
}
