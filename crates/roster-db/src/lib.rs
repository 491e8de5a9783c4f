mod datetime;
pub mod employees;
pub mod lookup;
pub mod migrations;

pub use employees::{Employee, EmployeePatch, EmployeeRepository, EmployeeStore, NewEmployee};
pub use lookup::Lookup;
pub use migrations::{
    Migration, MigrationError, MigrationReport, MigrationRunner, MigrationState, MigrationStatus,
};
