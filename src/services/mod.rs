// Service module exports

pub mod database;
pub mod editor;
pub mod notice;
pub mod planning;
pub mod selection;
pub mod sync;
