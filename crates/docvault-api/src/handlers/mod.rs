pub mod diagnostics;
pub mod documents;
pub mod sign_in;
pub mod upload;
