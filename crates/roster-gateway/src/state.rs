use std::sync::Arc;

use roster_db::EmployeeRepository;

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub employees: Arc<dyn EmployeeRepository>,
}

impl AppState {
    pub fn new(employees: Arc<dyn EmployeeRepository>) -> Self {
        Self { employees }
    }
}

pub type SharedState = Arc<AppState>;
