use crate::{
    config::DeletePolicy,
    models::{AssignmentForm, Department, Employee, EntityForm, NewEmployee, Role},
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgRow};
use std::sync::Arc;

/// RepoError
///
/// Store-level failure classification. Unique and foreign-key violations are
/// recognised from the driver's error kind; everything else stays a
/// `Database` error so callers can tell "name taken" apart from "store down".
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Carries the violated constraint name, e.g. `departments_name_key`.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("In use: {0}")]
    InUse(String),

    #[error("Missing reference: {0}")]
    MissingReference(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            if db.is_unique_violation() {
                return RepoError::Duplicate(constraint);
            }
            if db.is_foreign_key_violation() {
                return RepoError::MissingReference(constraint);
            }
        }
        RepoError::Database(err)
    }
}

/// Repository Trait
///
/// The persistence contract used by every handler. Each write method is one
/// all-or-nothing transaction. `Send + Sync + async_trait` make
/// `Arc<dyn Repository>` shareable across axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Departments ---
    async fn list_departments(&self) -> Result<Vec<Department>, RepoError>;
    async fn get_department(&self, id: i32) -> Result<Option<Department>, RepoError>;
    async fn create_department(&self, form: EntityForm) -> Result<Department, RepoError>;
    /// Overwrites name and description. `NotFound` if the row is gone.
    async fn update_department(&self, id: i32, form: EntityForm) -> Result<Department, RepoError>;
    /// Deletes the row, applying `policy` to referencing employees.
    async fn delete_department(&self, id: i32, policy: DeletePolicy) -> Result<(), RepoError>;
    async fn employees_in_department(&self, id: i32) -> Result<Vec<Employee>, RepoError>;

    // --- Roles ---
    async fn list_roles(&self) -> Result<Vec<Role>, RepoError>;
    async fn get_role(&self, id: i32) -> Result<Option<Role>, RepoError>;
    async fn create_role(&self, form: EntityForm) -> Result<Role, RepoError>;
    async fn update_role(&self, id: i32, form: EntityForm) -> Result<Role, RepoError>;
    async fn delete_role(&self, id: i32, policy: DeletePolicy) -> Result<(), RepoError>;
    async fn employees_in_role(&self, id: i32) -> Result<Vec<Employee>, RepoError>;

    // --- Employees ---
    async fn list_employees(&self) -> Result<Vec<Employee>, RepoError>;
    async fn get_employee(&self, id: i32) -> Result<Option<Employee>, RepoError>;
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepoError>;
    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepoError>;
    /// Overwrites both references. `NotFound` if the employee is gone.
    async fn assign_employee(&self, id: i32, assignment: AssignmentForm) -> Result<Employee, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const EMPLOYEE_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, department_id, role_id, is_admin";

/// The two name/description tables share their SQL shape.
#[derive(Clone, Copy, Debug)]
enum Catalog {
    Departments,
    Roles,
}

impl Catalog {
    fn table(self) -> &'static str {
        match self {
            Catalog::Departments => "departments",
            Catalog::Roles => "roles",
        }
    }

    /// The `employees` column referencing this table.
    fn employee_column(self) -> &'static str {
        match self {
            Catalog::Departments => "department_id",
            Catalog::Roles => "role_id",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Catalog::Departments => "Department",
            Catalog::Roles => "Role",
        }
    }
}

/// A foreign-key violation raised by deleting a catalog row means an employee
/// still points at it, not that a reference is missing.
fn still_referenced(catalog: Catalog, err: RepoError) -> RepoError {
    match err {
        RepoError::MissingReference(constraint) => {
            tracing::info!(table = catalog.table(), %constraint, "delete raced an assignment");
            RepoError::InUse(format!(
                "{} is still assigned to at least one employee.",
                catalog.label()
            ))
        }
        other => other,
    }
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_entries<T>(&self, catalog: Catalog) -> Result<Vec<T>, RepoError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "SELECT id, name, description FROM {} ORDER BY id",
            catalog.table()
        );
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_entry<T>(&self, catalog: Catalog, id: i32) -> Result<Option<T>, RepoError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "SELECT id, name, description FROM {} WHERE id = $1",
            catalog.table()
        );
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Inserts inside a transaction. On a unique violation the `?` returns
    /// early and the uncommitted transaction is rolled back on drop.
    async fn create_entry<T>(&self, catalog: Catalog, form: EntityForm) -> Result<T, RepoError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) RETURNING id, name, description",
            catalog.table()
        );
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(&form.name)
            .bind(&form.description)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn update_entry<T>(&self, catalog: Catalog, id: i32, form: EntityForm) -> Result<T, RepoError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "UPDATE {} SET name = $1, description = $2 WHERE id = $3 RETURNING id, name, description",
            catalog.table()
        );
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(&form.name)
            .bind(&form.description)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(catalog.label().to_string()))?;
        tx.commit().await?;
        Ok(row)
    }

    /// delete_entry
    ///
    /// Counts referencing employees, applies the orphan policy and removes the
    /// row, all in one transaction.
    async fn delete_entry(&self, catalog: Catalog, id: i32, policy: DeletePolicy) -> Result<(), RepoError> {
        let column = catalog.employee_column();
        let mut tx = self.pool.begin().await?;

        let referencing: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM employees WHERE {} = $1",
            column
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referencing > 0 {
            match policy {
                DeletePolicy::Restrict => {
                    return Err(RepoError::InUse(format!(
                        "{} is still assigned to {} employee(s).",
                        catalog.label(),
                        referencing
                    )));
                }
                DeletePolicy::Nullify => {
                    sqlx::query(&format!(
                        "UPDATE employees SET {col} = NULL WHERE {col} = $1",
                        col = column
                    ))
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                DeletePolicy::Cascade => {
                    sqlx::query(&format!("DELETE FROM employees WHERE {} = $1", column))
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        // An employee assigned after the count still blocks the delete via the FK.
        let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", catalog.table()))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| still_referenced(catalog, RepoError::from(e)))?;
        if deleted.rows_affected() == 0 {
            return Err(RepoError::NotFound(catalog.label().to_string()));
        }

        tx.commit().await?;
        tracing::info!(table = catalog.table(), id, %policy, referencing, "row deleted");
        Ok(())
    }

    async fn employees_in(&self, catalog: Catalog, id: i32) -> Result<Vec<Employee>, RepoError> {
        let sql = format!(
            "SELECT {} FROM employees WHERE {} = $1 ORDER BY id",
            EMPLOYEE_COLUMNS,
            catalog.employee_column()
        );
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_departments(&self) -> Result<Vec<Department>, RepoError> {
        self.list_entries(Catalog::Departments).await
    }

    async fn get_department(&self, id: i32) -> Result<Option<Department>, RepoError> {
        self.get_entry(Catalog::Departments, id).await
    }

    async fn create_department(&self, form: EntityForm) -> Result<Department, RepoError> {
        self.create_entry(Catalog::Departments, form).await
    }

    async fn update_department(&self, id: i32, form: EntityForm) -> Result<Department, RepoError> {
        self.update_entry(Catalog::Departments, id, form).await
    }

    async fn delete_department(&self, id: i32, policy: DeletePolicy) -> Result<(), RepoError> {
        self.delete_entry(Catalog::Departments, id, policy).await
    }

    async fn employees_in_department(&self, id: i32) -> Result<Vec<Employee>, RepoError> {
        self.employees_in(Catalog::Departments, id).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepoError> {
        self.list_entries(Catalog::Roles).await
    }

    async fn get_role(&self, id: i32) -> Result<Option<Role>, RepoError> {
        self.get_entry(Catalog::Roles, id).await
    }

    async fn create_role(&self, form: EntityForm) -> Result<Role, RepoError> {
        self.create_entry(Catalog::Roles, form).await
    }

    async fn update_role(&self, id: i32, form: EntityForm) -> Result<Role, RepoError> {
        self.update_entry(Catalog::Roles, id, form).await
    }

    async fn delete_role(&self, id: i32, policy: DeletePolicy) -> Result<(), RepoError> {
        self.delete_entry(Catalog::Roles, id, policy).await
    }

    async fn employees_in_role(&self, id: i32) -> Result<Vec<Employee>, RepoError> {
        self.employees_in(Catalog::Roles, id).await
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, RepoError> {
        let sql = format!("SELECT {} FROM employees ORDER BY id", EMPLOYEE_COLUMNS);
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_employee(&self, id: i32) -> Result<Option<Employee>, RepoError> {
        let sql = format!("SELECT {} FROM employees WHERE id = $1", EMPLOYEE_COLUMNS);
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepoError> {
        let sql = format!("SELECT {} FROM employees WHERE email = $1", EMPLOYEE_COLUMNS);
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepoError> {
        let sql = format!(
            "INSERT INTO employees (email, username, first_name, last_name, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            EMPLOYEE_COLUMNS
        );
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, Employee>(&sql)
            .bind(&employee.email)
            .bind(&employee.username)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.password_hash)
            .bind(employee.is_admin)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn assign_employee(&self, id: i32, assignment: AssignmentForm) -> Result<Employee, RepoError> {
        let sql = format!(
            "UPDATE employees SET department_id = $1, role_id = $2 WHERE id = $3 RETURNING {}",
            EMPLOYEE_COLUMNS
        );
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, Employee>(&sql)
            .bind(assignment.department_id)
            .bind(assignment.role_id)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound("Employee".to_string()))?;
        tx.commit().await?;
        Ok(row)
    }
}
