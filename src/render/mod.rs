//! # Content rendering
//!
//! Turns stored product content into HTML. Content arrives either as document
//! JSON (encoded as a string or already decoded) or, for old records, as HTML.
//! Rendering goes through three states, never going back:
//!
//! 1. the input is read as a [`Document`] and rendered node by node,
//! 2. if that fails and the raw text looks like markup, it is passed through
//!    the [legacy migration](crate::legacy) and shown as-is,
//! 3. otherwise an error placeholder is shown instead of a partial tree.
mod markup;
pub mod media;
mod nodes;

pub use markup::{Element, Markup};
pub use nodes::render_document;

use crate::legacy;
use crate::model::{ContentError, Document};
use log::*;
use serde_json::Value;
use std::fmt;

/// Content handed to the renderer
#[derive(Debug, Clone, Copy)]
pub enum ContentInput<'a> {
    /// No content stored
    Missing,
    /// JSON text, or legacy HTML
    Encoded(&'a str),
    /// Content that was already decoded along with its envelope
    Value(&'a Value),
    Document(&'a Document),
}

impl<'a> From<Option<&'a str>> for ContentInput<'a> {
    fn from(opt: Option<&'a str>) -> Self {
        opt.map_or(ContentInput::Missing, ContentInput::Encoded)
    }
}

impl<'a> From<&'a Value> for ContentInput<'a> {
    fn from(value: &'a Value) -> Self {
        ContentInput::Value(value)
    }
}

impl<'a> From<&'a Document> for ContentInput<'a> {
    fn from(doc: &'a Document) -> Self {
        ContentInput::Document(doc)
    }
}

/// The outcome of rendering some content
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// There was nothing to render
    Empty,
    Document(Markup),
    /// Migrated legacy markup, shown without further processing
    Legacy(String),
    /// The content could not be read
    Failed,
}

impl Rendered {
    pub fn is_failed(&self) -> bool {
        matches!(self, Rendered::Failed)
    }

    /// The markup including the placeholders for empty and broken content
    pub fn into_markup(self) -> Markup {
        match self {
            Rendered::Empty => Element::new("div")
                .class("content-empty")
                .child(Markup::text("No content available yet."))
                .into(),
            Rendered::Document(markup) => markup,
            Rendered::Legacy(html) => Element::new("div")
                .class("legacy-content")
                .child(Markup::Raw(html))
                .into(),
            Rendered::Failed => Element::new("div")
                .class("content-error")
                .child(Markup::text("This content failed to load."))
                .into(),
        }
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.clone().into_markup(), f)
    }
}

/// Render content, degrading instead of failing
pub fn render_content(input: ContentInput<'_>) -> Rendered {
    match input {
        ContentInput::Missing => Rendered::Empty,
        ContentInput::Document(doc) => Rendered::Document(render_document(doc)),
        ContentInput::Encoded(raw) => render_encoded(raw),
        ContentInput::Value(Value::Null) => Rendered::Empty,
        ContentInput::Value(Value::String(raw)) => render_encoded(raw),
        ContentInput::Value(value) => match Document::from_value(value.clone()) {
            Ok(doc) => Rendered::Document(render_document(&doc)),
            Err(err) => {
                warn!("Stored content is not a document: {}", err);
                Rendered::Failed
            }
        },
    }
}

fn render_encoded(raw: &str) -> Rendered {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Rendered::Empty;
    }
    match raw.parse::<Document>() {
        Ok(doc) => Rendered::Document(render_document(&doc)),
        Err(err) => fallback(raw, err),
    }
}

fn fallback(raw: &str, err: ContentError) -> Rendered {
    if raw.trim_start().starts_with('<') {
        warn!("Content is not document JSON, migrating as legacy HTML ({})", err);
        if legacy::needs_migration(raw) {
            debug!("Legacy content has image sources tagged as video");
        }
        Rendered::Legacy(legacy::migrate(raw).into_owned())
    } else {
        warn!("Content failed to parse: {}", err);
        Rendered::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SAMPLE: &str = r#"{"type": "doc", "content": [
        {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Welcome"}]},
        {"type": "paragraph", "content": [
            {"type": "text", "text": "Read "},
            {"type": "text", "text": "this", "marks": [{"type": "italic"}]},
            {"type": "hardBreak"},
            {"type": "text", "text": "now"}
        ]},
        {"type": "bulletList", "content": [
            {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]}
        ]}
    ]}"#;

    #[test]
    fn test_render_sample() {
        let html = render_content(ContentInput::Encoded(SAMPLE)).to_string();
        assert_eq!(
            html,
            concat!(
                "<div class=\"rich-content\">",
                "<h2 class=\"text-2xl font-semibold\">Welcome</h2>",
                "<p>Read <em>this</em><br>now</p>",
                "<ul><li><p>a</p></li></ul>",
                "</div>"
            )
        );
    }

    #[test]
    fn test_idempotent() {
        let doc: Document = SAMPLE.parse().unwrap();
        let first = render_content(ContentInput::Document(&doc));
        let second = render_content(ContentInput::Document(&doc));
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_value_and_string_agree() {
        let value: Value = serde_json::from_str(SAMPLE).unwrap();
        let encoded = Value::String(SAMPLE.to_owned());
        assert_eq!(
            render_content(ContentInput::Value(&value)),
            render_content(ContentInput::Value(&encoded))
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(render_content(ContentInput::Missing), Rendered::Empty);
        assert_eq!(render_content(ContentInput::Value(&Value::Null)), Rendered::Empty);
        assert_eq!(render_content(Option::<&str>::None.into()), Rendered::Empty);
        assert_eq!(render_content(ContentInput::Encoded("  ")), Rendered::Empty);
        assert_eq!(render_content(ContentInput::Encoded("null")), Rendered::Empty);
        assert_eq!(render_content(ContentInput::Encoded(" null\n")), Rendered::Empty);
        let encoded_null = Value::String(String::from("null"));
        assert_eq!(render_content(ContentInput::Value(&encoded_null)), Rendered::Empty);
        assert!(Rendered::Empty.to_string().contains("content-empty"));
    }

    #[test]
    fn test_legacy_fallback() {
        let rendered = render_content(ContentInput::Encoded(r#"  <video src="a.png"></video>"#));
        match &rendered {
            Rendered::Legacy(html) => {
                assert!(html.contains(r#"<img src="a.png">"#));
                assert!(!html.contains("<video"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rendered.to_string().starts_with("<div class=\"legacy-content\">"));
    }

    #[test]
    fn test_broken_content() {
        let rendered = render_content(ContentInput::Encoded("{\"type\": \"doc\", \"content\": ["));
        assert!(rendered.is_failed());
        assert_eq!(
            rendered.to_string(),
            "<div class=\"content-error\">This content failed to load.</div>"
        );

        let not_a_doc = json!({"type": "paragraph"});
        assert!(render_content(ContentInput::Value(&not_a_doc)).is_failed());
        assert!(render_content(ContentInput::Encoded("plain words")).is_failed());
    }

    #[test]
    fn test_unknown_node_in_document() {
        let value = json!({"type": "doc", "content": [
            {"type": "customWidget", "content": [{"type": "text", "text": "kept"}]}
        ]});
        assert_eq!(
            render_content(ContentInput::Value(&value)).to_string(),
            "<div class=\"rich-content\">kept</div>"
        );
    }
}
