//! Ticket text templates.
//!
//! Subject and description are plain strings with `%{name}` placeholders.
//! Each template is parsed once at startup; binding a record substitutes
//! every placeholder with the matching field and renders unknown fields as
//! an empty string.
//!
//! # Example
//!
//! ```
//! use redmine_ticket_sink::template::{BindingContext, TemplateExpander};
//! use serde_json::json;
//!
//! let subject = TemplateExpander::new("%{tag}: %{message}");
//!
//! let mut context = BindingContext::new();
//! context.insert("tag".to_string(), json!("app.error"));
//!
//! assert_eq!(subject.bind(&context), "app.error: ");
//! ```

mod expander;

pub use expander::{render_value, BindingContext, TemplateExpander};
