//! Template definitions and their process-wide cache
//!
//! Templates are identified by name. A [`TemplateCache`] hands out shared
//! definitions and makes sure that concurrent requests for the same name
//! result in a single fetch through the configured [`TemplateFetcher`].

mod cache;
mod definition;
mod fetch;

pub use cache::*;
pub use definition::*;
pub use fetch::*;
