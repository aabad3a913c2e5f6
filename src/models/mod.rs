// Module exports for models

pub mod entity_binding;
pub mod mode;
pub mod schedule;
pub mod settings;
