pub mod calendar;
pub mod config;
pub mod corrections;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod records;
pub mod sources;
pub mod vaccination;
pub mod weekly;
