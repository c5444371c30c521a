use staff_admin::models::{
    AssignmentForm, Employee, EntityForm, FieldError, Flash, FlashLevel, ModelError, RegisterForm,
};
use validator::Validate;

// --- Credential Handling ---

#[test]
fn test_employee_password_is_write_only() {
    let mut employee = Employee {
        email: "ann@corp.io".to_string(),
        username: "ann".to_string(),
        ..Employee::default()
    };
    employee.set_password("correct horse").unwrap();

    assert!(matches!(
        employee.password(),
        Err(ModelError::PasswordNotReadable)
    ));
    assert!(employee.verify_password("correct horse"));
    assert!(!employee.verify_password("wrong horse"));
}

#[test]
fn test_employee_json_never_contains_the_hash() {
    let mut employee = Employee {
        id: 3,
        email: "ann@corp.io".to_string(),
        username: "ann".to_string(),
        ..Employee::default()
    };
    employee.set_password("correct horse").unwrap();

    let json = serde_json::to_value(&employee).unwrap();

    assert!(json.get("password_hash").is_none());
    assert!(!json.to_string().contains("argon2"));
    assert_eq!(json["email"], "ann@corp.io");
}

#[test]
fn test_unset_password_never_verifies() {
    let employee = Employee::default();
    assert!(!employee.verify_password(""));
}

// --- Entity Forms ---

#[test]
fn test_entity_form_requires_a_name() {
    let blank = EntityForm {
        name: "   ".to_string(),
        description: "desc".to_string(),
    }
    .normalized();

    assert_eq!(blank.name, "");
    let errors = FieldError::from_validation(&blank.validate().unwrap_err());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "name");
}

#[test]
fn test_entity_form_length_limits() {
    let form = EntityForm {
        name: "x".repeat(61),
        description: "y".repeat(201),
    };

    let errors = FieldError::from_validation(&form.validate().unwrap_err());
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["description", "name"]);
}

#[test]
fn test_entity_form_trims_and_accepts() {
    let form = EntityForm {
        name: "  Engineering ".to_string(),
        description: " Builds things\n".to_string(),
    }
    .normalized();

    assert!(form.validate().is_ok());
    assert_eq!(form.name, "Engineering");
    assert_eq!(form.description, "Builds things");
}

#[test]
fn test_entity_form_description_is_optional() {
    let form: EntityForm = serde_json::from_str(r#"{"name":"Ops"}"#).unwrap();
    assert_eq!(form.description, "");
    assert!(form.validate().is_ok());
}

// --- Registration ---

fn register_form() -> RegisterForm {
    RegisterForm {
        email: "new@corp.io".to_string(),
        username: "newbie".to_string(),
        first_name: "New".to_string(),
        last_name: "Hire".to_string(),
        password: "long-enough".to_string(),
        confirm_password: "long-enough".to_string(),
    }
}

#[test]
fn test_register_form_valid() {
    assert!(register_form().validate().is_ok());
}

#[test]
fn test_register_form_reports_each_failure() {
    let form = RegisterForm {
        email: "not-an-email".to_string(),
        password: "short".to_string(),
        confirm_password: "different".to_string(),
        ..register_form()
    };

    let errors = FieldError::from_validation(&form.validate().unwrap_err());
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["confirm_password", "email", "password"]);
    assert_eq!(errors[0].message, "Passwords must match.");
}

#[test]
fn test_register_form_rejects_email_longer_than_column() {
    let form = RegisterForm {
        email: format!("{}@example.com", "a".repeat(60)),
        ..register_form()
    };

    let errors = FieldError::from_validation(&form.validate().unwrap_err());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "email");
    assert_eq!(errors[0].message, "Email must be at most 60 characters.");

    // Exactly 60 characters still fits.
    let fits = RegisterForm {
        email: format!("{}@example.com", "a".repeat(48)),
        ..register_form()
    };
    assert_eq!(fits.email.chars().count(), 60);
    assert!(fits.validate().is_ok());
}

// --- Assignment Form Decoding ---

#[test]
fn test_assignment_form_empty_select_means_none() {
    let form: AssignmentForm = serde_json::from_str(r#"{"department_id":"","role_id":"4"}"#).unwrap();
    assert_eq!(form.department_id, None);
    assert_eq!(form.role_id, Some(4));

    let missing: AssignmentForm = serde_json::from_str("{}").unwrap();
    assert_eq!((missing.department_id, missing.role_id), (None, None));

    assert!(serde_json::from_str::<AssignmentForm>(r#"{"role_id":"abc"}"#).is_err());
}

// --- Flash Messages ---

#[test]
fn test_flash_serializes_lowercase_level() {
    let json = serde_json::to_value(Flash::error("nope")).unwrap();
    assert_eq!(json["level"], "error");
    assert_eq!(Flash::success("ok").level, FlashLevel::Success);
}
