pub mod suite_error;

pub use suite_error::SuiteError;
