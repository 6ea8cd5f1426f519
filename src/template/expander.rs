//! `%{name}` placeholder expansion

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Field name to value mapping a template is bound against
pub type BindingContext = Map<String, Value>;

lazy_static! {
    /// `%{` followed by anything up to the first `}`
    static ref PLACEHOLDER: Regex = Regex::new(r"%\{([^}]+)\}").unwrap();
}

/// A parsed template with its placeholder names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExpander {
    template: String,
    /// Distinct placeholder names in order of first appearance
    placeholders: Vec<String>,
}

impl TemplateExpander {
    /// Parse a template string.
    ///
    /// Any string is accepted. Unterminated markers such as `%{name` are not
    /// placeholders and stay in the output as literal text.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut placeholders: Vec<String> = Vec::new();

        for caps in PLACEHOLDER.captures_iter(&template) {
            let name = &caps[1];
            if !placeholders.iter().any(|known| known == name) {
                placeholders.push(name.to_string());
            }
        }

        Self {
            template,
            placeholders,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Render the template against `context`.
    ///
    /// Placeholders missing from the context render as an empty string.
    /// The context is only read.
    pub fn bind(&self, context: &BindingContext) -> String {
        if self.placeholders.is_empty() {
            return self.template.clone();
        }

        // Every match here was recorded by `new`, both use the same pattern.
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures<'_>| {
                context
                    .get(&caps[1])
                    .map(render_value)
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// String form of a record value inside rendered text
pub fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        // Arrays and objects render as JSON
        _ => Cow::Owned(value.to_string()),
    }
}
