pub mod auth;
pub mod automation;
pub mod constraint;
pub mod job;
pub mod notification;
