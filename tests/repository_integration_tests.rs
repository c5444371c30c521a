use chrono::Utc;
use sqlx::PgPool;
use staff_admin::{
    DeletePolicy,
    models::{AssignmentForm, EntityForm, NewEmployee, hash_password},
    repository::{PostgresRepository, RepoError, Repository},
};
use tokio::test;

// --- Test Context and Setup ---

/// Holds the database pool for one test.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Names are unique per call so tests can share one database.
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn entity(name: &str) -> EntityForm {
    EntityForm {
        name: name.to_string(),
        description: "created by tests".to_string(),
    }
}

async fn create_test_employee(repo: &PostgresRepository, is_admin: bool) -> i32 {
    let handle = unique("emp");
    repo.create_employee(NewEmployee {
        email: format!("{}@test.com", handle),
        username: handle.clone(),
        first_name: "Test".to_string(),
        last_name: "Employee".to_string(),
        password_hash: hash_password("password123").unwrap(),
        is_admin,
    })
    .await
    .expect("Failed to create test employee")
    .id
}

// --- Tests ---

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_duplicate_department_name_is_classified() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let name = unique("Engineering");

    repo.create_department(entity(&name)).await.unwrap();
    let err = repo.create_department(entity(&name)).await.unwrap_err();

    assert!(matches!(err, RepoError::Duplicate(ref c) if c == "departments_name_key"));
    let count = repo
        .list_departments()
        .await
        .unwrap()
        .into_iter()
        .filter(|d| d.name == name)
        .count();
    assert_eq!(count, 1);
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_update_and_missing_rows() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let role = repo.create_role(entity(&unique("Analyst"))).await.unwrap();

    let renamed = unique("Senior Analyst");
    let updated = repo.update_role(role.id, entity(&renamed)).await.unwrap();
    assert_eq!(updated.id, role.id);
    assert_eq!(updated.name, renamed);

    assert!(matches!(
        repo.update_role(-1, entity("ghost")).await,
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        repo.delete_role(-1, DeletePolicy::Restrict).await,
        Err(RepoError::NotFound(_))
    ));
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_delete_policies() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let dept = repo.create_department(entity(&unique("Ops"))).await.unwrap();
    let emp = create_test_employee(&repo, false).await;
    repo.assign_employee(
        emp,
        AssignmentForm {
            department_id: Some(dept.id),
            role_id: None,
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        repo.delete_department(dept.id, DeletePolicy::Restrict).await,
        Err(RepoError::InUse(_))
    ));
    assert!(repo.get_department(dept.id).await.unwrap().is_some());
    assert_eq!(repo.employees_in_department(dept.id).await.unwrap().len(), 1);

    repo.delete_department(dept.id, DeletePolicy::Nullify)
        .await
        .unwrap();
    assert_eq!(repo.get_employee(emp).await.unwrap().unwrap().department_id, None);

    let role = repo.create_role(entity(&unique("Temp"))).await.unwrap();
    repo.assign_employee(
        emp,
        AssignmentForm {
            department_id: None,
            role_id: Some(role.id),
        },
    )
    .await
    .unwrap();
    repo.delete_role(role.id, DeletePolicy::Cascade).await.unwrap();
    assert!(repo.get_employee(emp).await.unwrap().is_none());
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_assignment_to_missing_reference_is_classified() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let emp = create_test_employee(&repo, false).await;

    let err = repo
        .assign_employee(
            emp,
            AssignmentForm {
                department_id: Some(-5),
                role_id: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RepoError::MissingReference(ref c) if c == "employees_department_id_fkey"));
}

#[test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_employee_lookup_by_email_keeps_hash() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_test_employee(&repo, true).await;
    let employee = repo.get_employee(id).await.unwrap().unwrap();

    let found = repo
        .find_employee_by_email(&employee.email)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.id, id);
    assert!(found.is_admin);
    assert!(found.verify_password("password123"));
}
