pub mod context;
pub mod decision;
pub mod error;
pub mod escalation;
pub mod proposal;
pub mod rules;
pub mod scoring;
