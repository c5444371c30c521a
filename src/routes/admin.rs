use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Department, role and employee administration. Nested under `/admin`.
///
/// Access Control:
/// The router is wrapped in the admin guard layer (see `create_router`), and
/// every handler repeats `check_admin` as its first statement.
///
/// Each page pairs a GET (render the list, form or confirmation) with a POST
/// (submit). List pages answer POST exactly like GET. Deletion only happens
/// on POST with `confirm=true`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Departments ---
        .route(
            "/departments",
            get(handlers::list_departments).post(handlers::list_departments),
        )
        .route(
            "/departments/add",
            get(handlers::add_department_form).post(handlers::add_department),
        )
        .route(
            "/departments/edit/{id}",
            get(handlers::edit_department_form).post(handlers::edit_department),
        )
        .route(
            "/departments/delete/{id}",
            get(handlers::delete_department_confirm).post(handlers::delete_department),
        )
        // --- Roles ---
        .route(
            "/roles",
            get(handlers::list_roles).post(handlers::list_roles),
        )
        .route(
            "/roles/add",
            get(handlers::add_role_form).post(handlers::add_role),
        )
        .route(
            "/roles/edit/{id}",
            get(handlers::edit_role_form).post(handlers::edit_role),
        )
        .route(
            "/roles/delete/{id}",
            get(handlers::delete_role_confirm).post(handlers::delete_role),
        )
        // --- Employees ---
        .route(
            "/employees",
            get(handlers::list_employees).post(handlers::list_employees),
        )
        .route(
            "/employees/assign/{id}",
            get(handlers::assign_employee_form).post(handlers::assign_employee),
        )
}
