pub mod commands;
pub mod console;
pub mod diff_utils;
pub mod editblock;
pub mod exceptions;
pub mod fs;
pub mod llm;
pub mod models;
pub mod repository;
pub mod settings;
pub mod utils;
