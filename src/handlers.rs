pub mod automations;
pub mod constraints;
pub mod events;
pub mod jobs;
pub mod notifications;
pub mod searches;
