use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

// --- Core Application Schemas (Mapped to Database) ---

/// ModelError
///
/// Failures raised by the domain types themselves, independent of the store.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The credential is write-only; only the salted hash is ever kept.
    #[error("password is not a readable attribute")]
    PasswordNotReadable,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Employee
///
/// A row of the `employees` table. An employee optionally belongs to one
/// department and optionally holds one role. Administrators never hold either.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Employee {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    // PHC-formatted argon2 hash. Never serialized.
    #[serde(skip)]
    pub(crate) password_hash: String,
    pub department_id: Option<i32>,
    pub role_id: Option<i32>,
    pub is_admin: bool,
}

impl Employee {
    /// Always fails: the plaintext password is never stored.
    pub fn password(&self) -> Result<&str, ModelError> {
        Err(ModelError::PasswordNotReadable)
    }

    /// Replaces the stored credential with a freshly salted hash of `password`.
    pub fn set_password(&mut self, password: &str) -> Result<(), ModelError> {
        self.password_hash = hash_password(password)?;
        Ok(())
    }

    /// Checks `password` against the stored hash. A malformed hash never verifies.
    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Hashes a plaintext password with argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String, ModelError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ModelError::Hash(e.to_string()))
}

/// Department
///
/// A row of the `departments` table. Names are unique across departments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// Role
///
/// A row of the `roles` table. Names are unique across roles.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// NewEmployee
///
/// Insert payload for the `employees` table. The hash is computed before the
/// value reaches the repository.
#[derive(Debug, Clone, Default)]
pub struct NewEmployee {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

// --- Request Payloads (Form Schemas) ---

/// EntityForm
///
/// The name/description form shared by departments and roles. Submitted as
/// `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct EntityForm {
    #[validate(length(min = 1, max = 60, message = "Name is required (at most 60 characters)."))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Description must be at most 200 characters."))]
    pub description: String,
}

impl EntityForm {
    /// Trims surrounding whitespace so a blank name fails the length check.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

/// AssignmentForm
///
/// Department and role selection for one employee. An empty select value
/// clears the reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AssignmentForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub department_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub role_id: Option<i32>,
}

/// ConfirmForm
///
/// Explicit confirmation required by the delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: bool,
}

/// RegisterForm
///
/// Self-service registration. New accounts are never administrators.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterForm {
    #[validate(
        email(message = "A valid email address is required."),
        length(max = 60, message = "Email must be at most 60 characters.")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 60, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, max = 60, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 60, message = "Last name is required."))]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match."))]
    pub confirm_password: String,
}

/// LoginForm
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// --- View Models (Output) ---

/// FlashLevel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum FlashLevel {
    Success,
    Error,
}

/// Flash
///
/// A one-time status message shown on the page the user is redirected to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// FieldError
///
/// One failed validation rule, attached to the re-rendered form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flattens validator output into a stable, field-sorted list.
    pub fn from_validation(errors: &ValidationErrors) -> Vec<FieldError> {
        let mut out: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                let field = field.to_string();
                failures
                    .iter()
                    .map(|failure| {
                        let message = failure
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| failure.code.to_string());
                        FieldError::new(field.clone(), message)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }
}

/// DepartmentList
///
/// Output schema for GET /admin/departments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DepartmentList {
    pub title: String,
    pub flashes: Vec<Flash>,
    pub departments: Vec<Department>,
}

/// RoleList
///
/// Output schema for GET /admin/roles.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleList {
    pub title: String,
    pub flashes: Vec<Flash>,
    pub roles: Vec<Role>,
}

/// EmployeeList
///
/// Output schema for GET /admin/employees.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EmployeeList {
    pub title: String,
    pub flashes: Vec<Flash>,
    pub employees: Vec<Employee>,
}

/// EntityFormView
///
/// The add/edit page for a department or role. The edit page is always
/// pre-filled with the stored values; a failed add echoes what was submitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EntityFormView {
    pub title: String,
    /// "Add" or "Edit".
    pub action: String,
    pub id: Option<i32>,
    pub name: String,
    pub description: String,
    pub errors: Vec<FieldError>,
}

/// DeleteConfirmView
///
/// The confirmation page shown before a department or role is removed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteConfirmView {
    pub title: String,
    pub id: i32,
    pub name: String,
    /// Employees that currently reference the entity.
    pub employee_count: usize,
    /// The configured orphan policy, e.g. "restrict".
    pub policy: String,
    pub errors: Vec<FieldError>,
}

/// AssignView
///
/// The assignment page: the employee plus the live department and role choices.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignView {
    pub title: String,
    pub employee: Employee,
    pub departments: Vec<Department>,
    pub roles: Vec<Role>,
    pub department_id: Option<i32>,
    pub role_id: Option<i32>,
    pub errors: Vec<FieldError>,
}

/// RegisterView
///
/// Re-rendered registration form after a validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterView {
    pub title: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub errors: Vec<FieldError>,
}

/// TokenResponse
///
/// Bearer token issued by POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}
