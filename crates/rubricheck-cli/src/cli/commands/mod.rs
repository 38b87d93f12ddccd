pub mod dispatch;
pub mod grade;
pub mod validate;

pub use dispatch::dispatch;
