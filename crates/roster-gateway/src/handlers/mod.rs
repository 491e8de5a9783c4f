pub mod employees;
pub mod health;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use roster_common::{Error, Result};
    use roster_db::{
        Employee, EmployeePatch, EmployeeRepository, EmployeeStore, Lookup, NewEmployee,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::router::build_router;
    use crate::state::AppState;

    /// Repository whose every call fails, for exercising error paths.
    pub struct FailingRepository;

    impl EmployeeRepository for FailingRepository {
        fn create(&self, _new: &NewEmployee) -> Result<Employee> {
            Err(Error::Database("connection refused".into()))
        }

        fn find(&self, _id: i64) -> Lookup<Employee> {
            Lookup::Error(Error::Database("connection refused".into()))
        }

        fn update(&self, _id: i64, _patch: &EmployeePatch) -> Lookup<Employee> {
            Lookup::Error(Error::Database("connection refused".into()))
        }

        fn ping(&self) -> Result<()> {
            Err(Error::Database("connection refused".into()))
        }
    }

    pub fn shipped_migrations() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../migrations")
    }

    pub fn test_app() -> Router {
        let store = EmployeeStore::in_memory(&shipped_migrations()).unwrap();
        build_router(Arc::new(AppState::new(Arc::new(store))))
    }

    pub fn failing_app() -> Router {
        build_router(Arc::new(AppState::new(Arc::new(FailingRepository))))
    }

    /// Send one request and decode the JSON response. A `Value::String`
    /// body is sent verbatim so tests can post malformed JSON.
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(Value::String(raw)) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(raw)),
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
