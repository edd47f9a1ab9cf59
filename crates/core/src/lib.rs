//! Domain types for the KRN project portfolio admin.
//!
//! Pure data and rules only: project records, validation, the project form
//! wizard and the list/gallery view models. No I/O lives here.

pub mod error;
pub mod form_wizard;
pub mod gallery;
pub mod project;
pub mod types;
