pub mod automation_repo;
pub use automation_repo::AutomationRepository;
pub mod job_repo;
pub use job_repo::JobRepository;
pub mod constraint_repo;
pub use constraint_repo::ConstraintRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod search_repo;
pub use search_repo::PgRecentSearchStore;
