use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use roster_db::{Employee, EmployeePatch, Lookup, NewEmployee};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const INVALID_REQUEST_FORMAT: &str = "Invalid request format";
const INVALID_EMPLOYEE_ID: &str = "Invalid employee ID";
const EMPLOYEE_NOT_FOUND: &str = "Employee not found";

/// `POST /employees`
pub async fn create_employee(
    State(state): State<SharedState>,
    payload: Result<Json<NewEmployee>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    info!(operation = "create_employee", "processing create employee request");

    let Json(new) = payload.map_err(|rejection| invalid_body("create_employee", rejection))?;
    if let Err(message) = new.validate() {
        warn!(operation = "create_employee", "validation failed: {}", message);
        return Err(ApiError::bad_request(message));
    }

    let employee = state.employees.create(&new).map_err(|e| {
        error!(
            operation = "create_employee",
            employee_first_name = %new.first_name,
            employee_last_name = %new.last_name,
            "database operation failed: {}",
            e
        );
        ApiError::internal("Failed to create employee")
    })?;

    info!(
        operation = "create_employee",
        employee_id = employee.id,
        "employee created"
    );
    Ok((StatusCode::CREATED, Json(employee)))
}

/// `GET /employees/{id}`
pub async fn get_employee(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Employee>> {
    let id = parse_id("get_employee", &raw_id)?;
    info!(operation = "get_employee", employee_id = id, "processing get employee request");

    match state.employees.find(id) {
        Lookup::Found(employee) => {
            info!(operation = "get_employee", employee_id = id, "employee retrieved");
            Ok(Json(employee))
        }
        Lookup::NotFound => {
            warn!(operation = "get_employee", employee_id = id, "employee not found");
            Err(ApiError::not_found(EMPLOYEE_NOT_FOUND))
        }
        Lookup::Error(e) => {
            error!(
                operation = "get_employee",
                employee_id = id,
                "database operation failed: {}",
                e
            );
            Err(ApiError::internal("Failed to retrieve employee"))
        }
    }
}

/// `PUT /employees/{id}`. Only non-empty fields in the body are changed.
pub async fn update_employee(
    State(state): State<SharedState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<EmployeePatch>, JsonRejection>,
) -> ApiResult<Json<Employee>> {
    let id = parse_id("update_employee", &raw_id)?;
    info!(operation = "update_employee", employee_id = id, "processing update employee request");

    let Json(patch) = payload.map_err(|rejection| invalid_body("update_employee", rejection))?;

    match state.employees.update(id, &patch) {
        Lookup::Found(employee) => {
            info!(operation = "update_employee", employee_id = id, "employee updated");
            Ok(Json(employee))
        }
        Lookup::NotFound => {
            warn!(operation = "update_employee", employee_id = id, "employee not found");
            Err(ApiError::not_found(EMPLOYEE_NOT_FOUND))
        }
        Lookup::Error(e) => {
            error!(
                operation = "update_employee",
                employee_id = id,
                "database operation failed: {}",
                e
            );
            Err(ApiError::internal("Failed to update employee"))
        }
    }
}

fn parse_id(operation: &str, raw: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| {
        warn!(operation, employee_id = %raw, "invalid employee id");
        ApiError::bad_request(INVALID_EMPLOYEE_ID)
    })
}

fn invalid_body(operation: &str, rejection: JsonRejection) -> ApiError {
    warn!(operation, "invalid request body: {}", rejection.body_text());
    ApiError::bad_request(INVALID_REQUEST_FORMAT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::{failing_app, send, test_app};

    #[tokio::test]
    async fn create_returns_created_employee() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/employees",
            Some(json!({"first_name": "John", "last_name": "Doe"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["first_name"], "John");
        assert_eq!(body["last_name"], "Doe");
        assert!(body["id"].as_i64().unwrap() > 0);
        assert!(body["created_at"].is_string());
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/employees",
            Some(json!("{\"first_name\": \"John\", \"last_name\":}")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request format");
    }

    #[tokio::test]
    async fn create_requires_first_name() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/employees",
            Some(json!({"last_name": "Doe"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "first_name is required");
    }

    #[tokio::test]
    async fn create_requires_last_name() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/employees",
            Some(json!({"first_name": "John", "last_name": ""})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "last_name is required");
    }

    #[tokio::test]
    async fn create_reports_database_failure() {
        let app = failing_app();
        let (status, body) = send(
            &app,
            "POST",
            "/employees",
            Some(json!({"first_name": "John", "last_name": "Doe"})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to create employee");
    }

    #[tokio::test]
    async fn get_returns_stored_employee() {
        let app = test_app();
        let (_, created) = send(
            &app,
            "POST",
            "/employees",
            Some(json!({"first_name": "Ada", "last_name": "Lovelace"})),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(&app, "GET", &format!("/employees/{id}"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, created);
    }

    #[tokio::test]
    async fn get_missing_employee_is_404() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/employees/999", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Employee not found");
    }

    #[tokio::test]
    async fn get_with_non_numeric_id_is_400() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/employees/abc", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid employee ID");
    }

    #[tokio::test]
    async fn get_reports_database_failure() {
        let app = failing_app();
        let (status, body) = send(&app, "GET", "/employees/1", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to retrieve employee");
    }

    #[tokio::test]
    async fn update_changes_given_fields() {
        let app = test_app();
        let (_, created) = send(
            &app,
            "POST",
            "/employees",
            Some(json!({"first_name": "Grace", "last_name": "Brewster"})),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/employees/{id}"),
            Some(json!({"last_name": "Hopper"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        assert_eq!(body["first_name"], "Grace");
        assert_eq!(body["last_name"], "Hopper");
    }

    #[tokio::test]
    async fn update_missing_employee_is_404() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "PUT",
            "/employees/42",
            Some(json!({"first_name": "Nobody"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Employee not found");
    }

    #[tokio::test]
    async fn update_rejects_malformed_json() {
        let app = test_app();
        let (status, body) = send(&app, "PUT", "/employees/1", Some(json!("not json"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request format");
    }

    #[tokio::test]
    async fn update_reports_database_failure() {
        let app = failing_app();
        let (status, body) = send(
            &app,
            "PUT",
            "/employees/1",
            Some(json!({"first_name": "X"})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to update employee");
    }
}
