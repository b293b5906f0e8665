//! Built-in function libraries for vellum documents.
//!
//! Each module exports one [`Library`]; [`standard_libraries`] returns the
//! full set to load into a pipeline:
//!
//! ```
//! use vellum_core::{Pipeline, PipelineOptions};
//! use vellum_stdlib::standard_libraries;
//!
//! let mut pipeline = Pipeline::new(standard_libraries(), PipelineOptions::default());
//! let resources = pipeline.execute(".sum {2} {3}").unwrap();
//! assert!(resources[0].content.contains("5"));
//! ```

pub mod collections;
pub mod data;
pub mod document;
pub mod flow;
pub mod math;
pub mod optionality;
pub mod text;

use vellum_core::Library;

/// Prefix of the libraries holding user-defined functions and variables.
pub(crate) const CUSTOM_LIBRARY_PREFIX: &str = "__func__";

/// All standard libraries, in registration order.
pub fn standard_libraries() -> Vec<Library> {
    vec![
        flow::library(),
        math::library(),
        text::library(),
        collections::library(),
        data::library(),
        document::library(),
        optionality::library(),
    ]
}
