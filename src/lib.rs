//! fataar-attrs - declare-styleable conflict fix-up for merged Android archives
//!
//! When several Android library archives are merged into one, two of them may declare a
//! `declare-styleable` with the same name but different `format`s for one of its attrs, which
//! the resource compiler rejects. This crate runs between resource generation and resource
//! packaging for a build variant and strips the conflicting `format` attributes named by an
//! explicit exclusion policy.
//!
//! ## Flow
//!
//! - [`locator::locate`] finds every directory named after the variant under the exploded
//!   archive directory (a match is never searched for nested matches)
//! - [`policy::ExclusionPolicy::is_eligible`] applies the optional `group:artifact` owner filter
//! - [`resolver::process_one`] rewrites `res/values/values.xml` in each eligible root
//! - [`hook::hook_resource_process`] registers all of this as a step in a host task graph
//!
//! Failures are isolated per root: a broken document is logged and left alone, and the
//! remaining roots are still processed.

pub mod document;
pub mod error;
pub mod hook;
pub mod locator;
pub mod logging;
pub mod policy;
pub mod resolver;

// Re-export commonly used items
pub use document::{Document, Element, XmlError};
pub use error::ResolveError;
pub use hook::{
    capitalize, exploded_aar_dir, hook_resource_process, StepGraph, TaskScheduler, VariantTasks,
};
pub use locator::locate;
pub use policy::{ExclusionPolicy, PolicyError};
pub use resolver::{
    process_one, resolve, resolve_variant, strip_excluded_formats, values_document_path, Outcome,
    ResolveOptions, ResolveReport, RootReport, WriteMode,
};
