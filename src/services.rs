pub mod auth;
pub mod automation_service;
pub mod constraint_service;
pub mod delivery;
pub mod executor_service;
pub mod job_service;
pub mod notification_service;
pub mod scheduler_service;
