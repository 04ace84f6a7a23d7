pub mod catalog;
pub mod cmd_cut;
pub mod cmd_errors;
pub mod cmd_space;
pub mod constants;
pub mod conversion;
pub mod error_model;
pub mod extinction;
pub mod fitting;
pub mod isochrone;
pub mod partition;
pub mod ridge_line;
