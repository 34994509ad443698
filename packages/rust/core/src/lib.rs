//! Route graph generation for the catalog.
//!
//! Ties the catalog loader, category index, and similarity resolver together
//! and turns their output into route descriptors plus the data artifacts the
//! renderer loads for each page.

pub mod emitter;
pub mod pipeline;
