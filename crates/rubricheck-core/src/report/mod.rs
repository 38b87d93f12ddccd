pub mod console;
pub mod insights;
pub mod json;
pub mod progress;
