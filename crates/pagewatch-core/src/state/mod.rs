//! Notification state kept between invocations, for transition-only alerts.

mod model;
mod repository;

pub use model::NotifyState;
pub use repository::StateStore;
