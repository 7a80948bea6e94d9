pub mod service;

pub use service::{ImportHandle, ImportService};
