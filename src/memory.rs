use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    config::DeletePolicy,
    models::{AssignmentForm, Department, Employee, EntityForm, NewEmployee, Role},
    repository::{RepoError, Repository},
};

/// MemoryRepository
///
/// In-process implementation of `Repository` with the same constraint
/// behaviour as the Postgres schema (unique names, unique email/username,
/// foreign-key checks on assignment). Used by the test suites and for running
/// the service without a database.
///
/// Every method takes the single lock once, so each call is atomic just like
/// a committed transaction.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

#[derive(Debug, Default)]
struct Tables {
    departments: BTreeMap<i32, Department>,
    roles: BTreeMap<i32, Role>,
    employees: BTreeMap<i32, Employee>,
    next_department: i32,
    next_role: i32,
    next_employee: i32,
}

/// Shared shape of the department and role rows.
trait Entry: Clone {
    fn build(id: i32, form: EntityForm) -> Self;
    fn name(&self) -> &str;
}

impl Entry for Department {
    fn build(id: i32, form: EntityForm) -> Self {
        Department {
            id,
            name: form.name,
            description: form.description,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Entry for Role {
    fn build(id: i32, form: EntityForm) -> Self {
        Role {
            id,
            name: form.name,
            description: form.description,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn insert_entry<T: Entry>(
    rows: &mut BTreeMap<i32, T>,
    next: &mut i32,
    form: EntityForm,
    constraint: &str,
) -> Result<T, RepoError> {
    if rows.values().any(|row| row.name() == form.name) {
        return Err(RepoError::Duplicate(constraint.to_string()));
    }
    *next += 1;
    let row = T::build(*next, form);
    rows.insert(*next, row.clone());
    Ok(row)
}

fn replace_entry<T: Entry>(
    rows: &mut BTreeMap<i32, T>,
    id: i32,
    form: EntityForm,
    constraint: &str,
    label: &str,
) -> Result<T, RepoError> {
    if !rows.contains_key(&id) {
        return Err(RepoError::NotFound(label.to_string()));
    }
    if rows.iter().any(|(other, row)| *other != id && row.name() == form.name) {
        return Err(RepoError::Duplicate(constraint.to_string()));
    }
    let row = T::build(id, form);
    rows.insert(id, row.clone());
    Ok(row)
}

/// Applies the orphan policy to employees whose `reference` points at `id`.
fn release_employees(
    employees: &mut BTreeMap<i32, Employee>,
    id: i32,
    policy: DeletePolicy,
    label: &str,
    reference: fn(&mut Employee) -> &mut Option<i32>,
) -> Result<(), RepoError> {
    let referencing: Vec<i32> = employees
        .iter_mut()
        .filter_map(|(key, e)| (*reference(e) == Some(id)).then_some(*key))
        .collect();
    if referencing.is_empty() {
        return Ok(());
    }
    match policy {
        DeletePolicy::Restrict => Err(RepoError::InUse(format!(
            "{} is still assigned to {} employee(s).",
            label,
            referencing.len()
        ))),
        DeletePolicy::Nullify => {
            for key in referencing {
                if let Some(e) = employees.get_mut(&key) {
                    *reference(e) = None;
                }
            }
            Ok(())
        }
        DeletePolicy::Cascade => {
            for key in referencing {
                employees.remove(&key);
            }
            Ok(())
        }
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a driver-level error, the way a
    /// lost database connection would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inserts an employee with a plaintext password, hashing it first.
    pub fn seed_employee(
        &self,
        email: &str,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<Employee, RepoError> {
        let mut employee = Employee {
            email: email.to_string(),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Test".to_string(),
            is_admin,
            ..Employee::default()
        };
        employee
            .set_password(password)
            .map_err(|e| RepoError::Database(sqlx::Error::Protocol(e.to_string())))?;
        let mut tables = self.lock()?;
        insert_employee(&mut tables, employee)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

fn insert_employee(tables: &mut Tables, mut employee: Employee) -> Result<Employee, RepoError> {
    if tables.employees.values().any(|e| e.email == employee.email) {
        return Err(RepoError::Duplicate("employees_email_key".to_string()));
    }
    if tables.employees.values().any(|e| e.username == employee.username) {
        return Err(RepoError::Duplicate("employees_username_key".to_string()));
    }
    tables.next_employee += 1;
    employee.id = tables.next_employee;
    tables.employees.insert(employee.id, employee.clone());
    Ok(employee)
}

fn department_ref(e: &mut Employee) -> &mut Option<i32> {
    &mut e.department_id
}

fn role_ref(e: &mut Employee) -> &mut Option<i32> {
    &mut e.role_id
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_departments(&self) -> Result<Vec<Department>, RepoError> {
        Ok(self.lock()?.departments.values().cloned().collect())
    }

    async fn get_department(&self, id: i32) -> Result<Option<Department>, RepoError> {
        Ok(self.lock()?.departments.get(&id).cloned())
    }

    async fn create_department(&self, form: EntityForm) -> Result<Department, RepoError> {
        let mut tables = self.lock()?;
        let Tables {
            departments,
            next_department,
            ..
        } = &mut *tables;
        insert_entry(departments, next_department, form, "departments_name_key")
    }

    async fn update_department(&self, id: i32, form: EntityForm) -> Result<Department, RepoError> {
        let mut tables = self.lock()?;
        replace_entry(&mut tables.departments, id, form, "departments_name_key", "Department")
    }

    async fn delete_department(&self, id: i32, policy: DeletePolicy) -> Result<(), RepoError> {
        let mut tables = self.lock()?;
        if !tables.departments.contains_key(&id) {
            return Err(RepoError::NotFound("Department".to_string()));
        }
        release_employees(&mut tables.employees, id, policy, "Department", department_ref)?;
        tables.departments.remove(&id);
        Ok(())
    }

    async fn employees_in_department(&self, id: i32) -> Result<Vec<Employee>, RepoError> {
        Ok(self
            .lock()?
            .employees
            .values()
            .filter(|e| e.department_id == Some(id))
            .cloned()
            .collect())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepoError> {
        Ok(self.lock()?.roles.values().cloned().collect())
    }

    async fn get_role(&self, id: i32) -> Result<Option<Role>, RepoError> {
        Ok(self.lock()?.roles.get(&id).cloned())
    }

    async fn create_role(&self, form: EntityForm) -> Result<Role, RepoError> {
        let mut tables = self.lock()?;
        let Tables {
            roles, next_role, ..
        } = &mut *tables;
        insert_entry(roles, next_role, form, "roles_name_key")
    }

    async fn update_role(&self, id: i32, form: EntityForm) -> Result<Role, RepoError> {
        let mut tables = self.lock()?;
        replace_entry(&mut tables.roles, id, form, "roles_name_key", "Role")
    }

    async fn delete_role(&self, id: i32, policy: DeletePolicy) -> Result<(), RepoError> {
        let mut tables = self.lock()?;
        if !tables.roles.contains_key(&id) {
            return Err(RepoError::NotFound("Role".to_string()));
        }
        release_employees(&mut tables.employees, id, policy, "Role", role_ref)?;
        tables.roles.remove(&id);
        Ok(())
    }

    async fn employees_in_role(&self, id: i32) -> Result<Vec<Employee>, RepoError> {
        Ok(self
            .lock()?
            .employees
            .values()
            .filter(|e| e.role_id == Some(id))
            .cloned()
            .collect())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, RepoError> {
        Ok(self.lock()?.employees.values().cloned().collect())
    }

    async fn get_employee(&self, id: i32) -> Result<Option<Employee>, RepoError> {
        Ok(self.lock()?.employees.get(&id).cloned())
    }

    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, RepoError> {
        Ok(self
            .lock()?
            .employees
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepoError> {
        let mut tables = self.lock()?;
        let row = Employee {
            email: employee.email,
            username: employee.username,
            first_name: employee.first_name,
            last_name: employee.last_name,
            password_hash: employee.password_hash,
            is_admin: employee.is_admin,
            ..Employee::default()
        };
        insert_employee(&mut tables, row)
    }

    async fn assign_employee(&self, id: i32, assignment: AssignmentForm) -> Result<Employee, RepoError> {
        let mut tables = self.lock()?;
        if let Some(d) = assignment.department_id {
            if !tables.departments.contains_key(&d) {
                return Err(RepoError::MissingReference("employees_department_id_fkey".to_string()));
            }
        }
        if let Some(r) = assignment.role_id {
            if !tables.roles.contains_key(&r) {
                return Err(RepoError::MissingReference("employees_role_id_fkey".to_string()));
            }
        }
        let employee = tables
            .employees
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound("Employee".to_string()))?;
        employee.department_id = assignment.department_id;
        employee.role_id = assignment.role_id;
        Ok(employee.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str) -> EntityForm {
        EntityForm {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_name_leaves_single_row() {
        let repo = MemoryRepository::new();
        repo.create_department(form("Engineering")).await.unwrap();

        let err = repo.create_department(form("Engineering")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(ref c) if c == "departments_name_key"));
        assert_eq!(repo.list_departments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rename_onto_existing_name_is_rejected() {
        let repo = MemoryRepository::new();
        repo.create_role(form("Engineer")).await.unwrap();
        let manager = repo.create_role(form("Manager")).await.unwrap();

        let err = repo.update_role(manager.id, form("Engineer")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
        assert_eq!(repo.get_role(manager.id).await.unwrap().unwrap().name, "Manager");

        // Keeping its own name is not a conflict.
        assert!(repo.update_role(manager.id, form("Manager")).await.is_ok());
    }

    #[tokio::test]
    async fn delete_policies_treat_referencing_employees_differently() {
        for (policy, survivors, cleared) in [
            (DeletePolicy::Nullify, 1, true),
            (DeletePolicy::Cascade, 0, false),
        ] {
            let repo = MemoryRepository::new();
            let dept = repo.create_department(form("Ops")).await.unwrap();
            let emp = repo.seed_employee("a@x.io", "a", "password1", false).unwrap();
            repo.assign_employee(
                emp.id,
                AssignmentForm {
                    department_id: Some(dept.id),
                    role_id: None,
                },
            )
            .await
            .unwrap();

            repo.delete_department(dept.id, policy).await.unwrap();
            let remaining = repo.list_employees().await.unwrap();
            assert_eq!(remaining.len(), survivors);
            if cleared {
                assert_eq!(remaining[0].department_id, None);
            }
        }
    }

    #[tokio::test]
    async fn restrict_policy_keeps_everything() {
        let repo = MemoryRepository::new();
        let role = repo.create_role(form("Ops")).await.unwrap();
        let emp = repo.seed_employee("a@x.io", "a", "password1", false).unwrap();
        repo.assign_employee(
            emp.id,
            AssignmentForm {
                department_id: None,
                role_id: Some(role.id),
            },
        )
        .await
        .unwrap();

        let err = repo.delete_role(role.id, DeletePolicy::Restrict).await.unwrap_err();
        assert!(matches!(err, RepoError::InUse(_)));
        assert!(repo.get_role(role.id).await.unwrap().is_some());
        assert_eq!(repo.employees_in_role(role.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_reports_database_error() {
        let repo = MemoryRepository::new();
        repo.set_unavailable(true);
        assert!(matches!(
            repo.list_roles().await,
            Err(RepoError::Database(sqlx::Error::PoolTimedOut))
        ));
    }
}
