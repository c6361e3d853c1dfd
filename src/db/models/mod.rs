// src/db/models/mod.rs

//! Row models for the templates and machines tables

mod machine;
mod template;

pub use machine::MachineRecord;
pub use template::TemplateRecord;
