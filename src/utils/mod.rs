pub mod output;
pub mod validation;
