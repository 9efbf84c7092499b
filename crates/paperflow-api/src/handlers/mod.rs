pub mod callbacks;
pub mod documents;
pub mod executions;
pub mod jobs;
