use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use staff_admin::{
    AppConfig, AppState, DeletePolicy, MemoryRepository, create_router,
    models::{AssignView, AssignmentForm, DeleteConfirmView, EntityForm},
    repository::Repository,
};
use std::sync::Arc;
use tower::ServiceExt;

// --- Setup ---

struct TestRouter {
    app: Router,
    repo: Arc<MemoryRepository>,
    admin_id: i32,
    staff_id: i32,
}

fn setup(policy: DeletePolicy) -> TestRouter {
    let repo = Arc::new(MemoryRepository::new());
    let admin_id = repo
        .seed_employee("admin@corp.io", "admin", "admin-password", true)
        .unwrap()
        .id;
    let staff_id = repo
        .seed_employee("staff@corp.io", "staff", "staff-password", false)
        .unwrap()
        .id;
    let config = AppConfig {
        delete_policy: policy,
        ..AppConfig::default()
    };
    TestRouter {
        app: create_router(AppState::new(repo.clone(), config)),
        repo,
        admin_id,
        staff_id,
    }
}

fn form_request(uri: &str, user_id: i32, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-user-id", user_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, user_id: i32) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_guard_blocks_non_admin_delete() {
    let t = setup(DeletePolicy::Cascade);
    let dept = t
        .repo
        .create_department(EntityForm {
            name: "Ops".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(form_request(
            &format!("/admin/departments/delete/{}", dept.id),
            t.staff_id,
            "confirm=true",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(t.repo.get_department(dept.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_confirmation_page_counts_references() {
    let t = setup(DeletePolicy::Nullify);
    let role = t
        .repo
        .create_role(EntityForm {
            name: "Clerk".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    t.repo
        .assign_employee(
            t.staff_id,
            AssignmentForm {
                department_id: None,
                role_id: Some(role.id),
            },
        )
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(get_request(
            &format!("/admin/roles/delete/{}", role.id),
            t.admin_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let view: DeleteConfirmView = read_json(response).await;
    assert_eq!(view.employee_count, 1);
    assert_eq!(view.policy, "nullify");
}

#[tokio::test]
async fn test_restricted_delete_returns_conflict_body() {
    let t = setup(DeletePolicy::Restrict);
    let dept = t
        .repo
        .create_department(EntityForm {
            name: "Ops".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    t.repo
        .assign_employee(
            t.staff_id,
            AssignmentForm {
                department_id: Some(dept.id),
                role_id: None,
            },
        )
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(form_request(
            &format!("/admin/departments/delete/{}", dept.id),
            t.admin_id,
            "confirm=true",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["code"], "in_use");
    assert_eq!(
        body["message"],
        "Department is still assigned to 1 employee(s)."
    );
}

#[tokio::test]
async fn test_assign_page_lists_live_choices() {
    let t = setup(DeletePolicy::Restrict);
    t.repo
        .create_department(EntityForm {
            name: "Ops".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(get_request(
            &format!("/admin/employees/assign/{}", t.staff_id),
            t.admin_id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let view: AssignView = read_json(response).await;
    assert_eq!(view.employee.id, t.staff_id);
    assert_eq!(view.departments.len(), 1);
    assert!(view.roles.is_empty());
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let t = setup(DeletePolicy::Restrict);

    let response = t
        .app
        .oneshot(get_request("/admin/departments/edit/77", t.admin_id))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["message"], "Department not found.");
}

#[tokio::test]
async fn test_store_outage_during_authentication_is_unauthorized() {
    let t = setup(DeletePolicy::Restrict);
    t.repo.set_unavailable(true);

    let response = t
        .app
        .oneshot(get_request("/admin/roles", t.admin_id))
        .await
        .unwrap();

    // The principal cannot be resolved, so the request never reaches a handler.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_pages_accept_post() {
    let t = setup(DeletePolicy::Restrict);

    for uri in ["/admin/departments", "/admin/roles", "/admin/employees"] {
        let response = t
            .app
            .clone()
            .oneshot(form_request(uri, t.admin_id, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let response = t
        .app
        .oneshot(form_request("/admin/employees", t.admin_id, ""))
        .await
        .unwrap();
    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["employees"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_register_with_overlong_email_rerenders() {
    let t = setup(DeletePolicy::Restrict);
    let body = format!(
        "email={}%40example.com&username=longmail&first_name=Long&last_name=Mail\
         &password=long-enough&confirm_password=long-enough",
        "a".repeat(60)
    );

    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(t.repo.list_employees().await.unwrap().len(), 2);
}
