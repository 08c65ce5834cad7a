//! # The document model
//!
//! Product and bio content is stored as the JSON serialization of an editor
//! document: a `doc` node whose children are block nodes, down to `text`
//! leaves that carry inline marks. Node types the renderer does not know are
//! kept as [`Node::Unknown`] instead of failing the whole document.
pub mod de;

use de::Dimension;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Error when reading a document
#[derive(Debug, Error, Display)]
pub enum ContentError {
    /// Invalid document JSON: {0}
    Json(#[from] serde_json::Error),
    /// Invalid attributes on `{0}` node: {1}
    Attrs(&'static str, serde_json::Error),
    /// Expected a `doc` node at the root, found `{0}`
    NotADocument(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HeadingAttrs {
    #[serde(default, deserialize_with = "de::lenient_u32")]
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OrderedListAttrs {
    #[serde(default, deserialize_with = "de::lenient_u32")]
    pub start: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CodeBlockAttrs {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub language: Option<String>,
}

/// Horizontal placement of an embedded image
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Default for Alignment {
    fn default() -> Self {
        Self::Center
    }
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }

    /// The image margin that produces this alignment
    pub fn margin(self) -> &'static str {
        match self {
            Self::Left => "0 auto 0 0",
            Self::Center => "0 auto",
            Self::Right => "0 0 0 auto",
        }
    }
}

fn lenient_alignment<'de, D>(deserializer: D) -> Result<Alignment, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("left") => Alignment::Left,
        Some("right") => Alignment::Right,
        _ => Alignment::Center,
    })
}

/// Attributes of an `imageUpload` node
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MediaAttrs {
    #[serde(default, deserialize_with = "de::deserialize_or_default")]
    pub src: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient_alignment")]
    pub alignment: Alignment,
    #[serde(default, deserialize_with = "de::lenient_dimension")]
    pub width: Option<Dimension>,
    #[serde(default, deserialize_with = "de::lenient_dimension")]
    pub height: Option<Dimension>,
}

/// Attributes of a `videoUpload` node
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAttrs {
    #[serde(flatten)]
    pub media: MediaAttrs,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub is_external: Option<bool>,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub controls: Option<bool>,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub autoplay: Option<bool>,
    #[serde(default, deserialize_with = "de::lenient_bool")]
    pub r#loop: Option<bool>,
}

/// An inline annotation on a text node
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawMark", into = "RawMark")]
pub enum Mark {
    Bold,
    Italic,
    Code,
    Link { href: Option<String> },
    /// A mark we have no rendering for
    Other(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawMark {
    #[serde(rename = "type")]
    kind: String,
    #[serde(
        default,
        skip_serializing_if = "Map::is_empty",
        deserialize_with = "de::deserialize_or_default"
    )]
    attrs: Map<String, Value>,
}

impl TryFrom<RawMark> for Mark {
    type Error = ContentError;

    fn try_from(raw: RawMark) -> Result<Self, Self::Error> {
        Ok(match raw.kind.as_str() {
            "bold" => Mark::Bold,
            "italic" => Mark::Italic,
            "code" => Mark::Code,
            "link" => {
                let href = match raw.attrs.get("href") {
                    Some(Value::String(href)) if !href.is_empty() => Some(href.clone()),
                    _ => None,
                };
                Mark::Link { href }
            }
            _ => Mark::Other(raw.kind),
        })
    }
}

impl From<Mark> for RawMark {
    fn from(mark: Mark) -> Self {
        let mut attrs = Map::new();
        let kind = match mark {
            Mark::Bold => "bold".to_owned(),
            Mark::Italic => "italic".to_owned(),
            Mark::Code => "code".to_owned(),
            Mark::Link { href } => {
                if let Some(href) = href {
                    attrs.insert("href".to_owned(), Value::String(href));
                }
                "link".to_owned()
            }
            Mark::Other(kind) => kind,
        };
        RawMark { kind, attrs }
    }
}

/// A node in a content document
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum Node {
    Doc {
        content: Fragment,
    },
    Paragraph {
        content: Fragment,
    },
    Heading {
        attrs: HeadingAttrs,
        content: Fragment,
    },
    BulletList {
        content: Fragment,
    },
    OrderedList {
        attrs: OrderedListAttrs,
        content: Fragment,
    },
    ListItem {
        content: Fragment,
    },
    Blockquote {
        content: Fragment,
    },
    CodeBlock {
        attrs: CodeBlockAttrs,
        content: Fragment,
    },
    ImageUpload {
        attrs: MediaAttrs,
    },
    VideoUpload {
        attrs: VideoAttrs,
    },
    HorizontalRule,
    HardBreak,
    Text {
        text: String,
        marks: Vec<Mark>,
    },
    /// A node type without a dedicated rendering
    Unknown {
        kind: String,
        attrs: Map<String, Value>,
        content: Fragment,
    },
}

pub type Fragment = Vec<Node>;

/// The wire shape shared by every node
#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(
        default,
        skip_serializing_if = "Map::is_empty",
        deserialize_with = "de::deserialize_or_default"
    )]
    attrs: Map<String, Value>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "de::deserialize_or_default"
    )]
    content: Fragment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "de::deserialize_or_default"
    )]
    marks: Vec<Mark>,
}

fn parse_attrs<T>(kind: &'static str, attrs: Map<String, Value>) -> Result<T, ContentError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(Value::Object(attrs)).map_err(|e| ContentError::Attrs(kind, e))
}

fn attrs_map<T: Serialize>(attrs: &T) -> Map<String, Value> {
    match serde_json::to_value(attrs) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .collect(),
        _ => Map::new(),
    }
}

impl TryFrom<RawNode> for Node {
    type Error = ContentError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let RawNode {
            kind,
            attrs,
            content,
            text,
            marks,
        } = raw;
        Ok(match kind.as_str() {
            "doc" => Node::Doc { content },
            "paragraph" => Node::Paragraph { content },
            "heading" => Node::Heading {
                attrs: parse_attrs("heading", attrs)?,
                content,
            },
            "bulletList" => Node::BulletList { content },
            "orderedList" => Node::OrderedList {
                attrs: parse_attrs("orderedList", attrs)?,
                content,
            },
            "listItem" => Node::ListItem { content },
            "blockquote" => Node::Blockquote { content },
            "codeBlock" => Node::CodeBlock {
                attrs: parse_attrs("codeBlock", attrs)?,
                content,
            },
            "imageUpload" => Node::ImageUpload {
                attrs: parse_attrs("imageUpload", attrs)?,
            },
            "videoUpload" => Node::VideoUpload {
                attrs: parse_attrs("videoUpload", attrs)?,
            },
            "horizontalRule" => Node::HorizontalRule,
            "hardBreak" => Node::HardBreak,
            "text" => Node::Text {
                text: text.unwrap_or_default(),
                marks,
            },
            _ => Node::Unknown {
                kind,
                attrs,
                content,
            },
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let kind = node.kind().to_owned();
        let mut raw = RawNode {
            kind,
            attrs: Map::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        };
        match node {
            Node::Doc { content }
            | Node::Paragraph { content }
            | Node::BulletList { content }
            | Node::ListItem { content }
            | Node::Blockquote { content } => raw.content = content,
            Node::Heading { attrs, content } => {
                raw.attrs = attrs_map(&attrs);
                raw.content = content;
            }
            Node::OrderedList { attrs, content } => {
                raw.attrs = attrs_map(&attrs);
                raw.content = content;
            }
            Node::CodeBlock { attrs, content } => {
                raw.attrs = attrs_map(&attrs);
                raw.content = content;
            }
            Node::ImageUpload { attrs } => raw.attrs = attrs_map(&attrs),
            Node::VideoUpload { attrs } => raw.attrs = attrs_map(&attrs),
            Node::HorizontalRule | Node::HardBreak => {}
            Node::Text { text, marks } => {
                raw.text = Some(text);
                raw.marks = marks;
            }
            Node::Unknown { attrs, content, .. } => {
                raw.attrs = attrs;
                raw.content = content;
            }
        }
        raw
    }
}

impl Node {
    /// A plain text node
    pub fn text<S: Into<String>>(text: S) -> Self {
        Node::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// The `type` tag of this node
    pub fn kind(&self) -> &str {
        match self {
            Node::Doc { .. } => "doc",
            Node::Paragraph { .. } => "paragraph",
            Node::Heading { .. } => "heading",
            Node::BulletList { .. } => "bulletList",
            Node::OrderedList { .. } => "orderedList",
            Node::ListItem { .. } => "listItem",
            Node::Blockquote { .. } => "blockquote",
            Node::CodeBlock { .. } => "codeBlock",
            Node::ImageUpload { .. } => "imageUpload",
            Node::VideoUpload { .. } => "videoUpload",
            Node::HorizontalRule => "horizontalRule",
            Node::HardBreak => "hardBreak",
            Node::Text { .. } => "text",
            Node::Unknown { kind, .. } => kind,
        }
    }

    /// The child nodes, empty for leaves
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Doc { content }
            | Node::Paragraph { content }
            | Node::Heading { content, .. }
            | Node::BulletList { content }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::Blockquote { content }
            | Node::CodeBlock { content, .. }
            | Node::Unknown { content, .. } => content,
            Node::ImageUpload { .. }
            | Node::VideoUpload { .. }
            | Node::HorizontalRule
            | Node::HardBreak
            | Node::Text { .. } => &[],
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { text, .. } => out.push_str(text),
            Node::HardBreak => out.push(' '),
            other => {
                for child in other.children() {
                    child.collect_text(out);
                }
                out.push(' ');
            }
        }
    }
}

/// Words per minute assumed for read-time estimates
const WORDS_PER_MINUTE: usize = 200;

/// A content document, always rooted in a `doc` node
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Node", into = "Node")]
pub struct Document {
    content: Fragment,
}

impl TryFrom<Node> for Document {
    type Error = ContentError;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Doc { content } => Ok(Document { content }),
            other => Err(ContentError::NotADocument(other.kind().to_owned())),
        }
    }
}

impl From<Document> for Node {
    fn from(doc: Document) -> Node {
        Node::Doc {
            content: doc.content,
        }
    }
}

impl FromStr for Document {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl Document {
    pub fn new(content: Fragment) -> Self {
        Self { content }
    }

    /// Decode an already parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, ContentError> {
        Ok(serde_json::from_value(value)?)
    }

    /// The top-level block nodes
    pub fn content(&self) -> &[Node] {
        &self.content
    }

    /// The concatenated text of all nodes, blocks separated by spaces
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.content {
            node.collect_text(&mut out);
        }
        out
    }

    pub fn word_count(&self) -> usize {
        self.plain_text().split_whitespace().count()
    }

    /// Estimated reading time in whole minutes, at least one
    pub fn read_time_minutes(&self) -> usize {
        let words = self.word_count();
        ((words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_string() {
        assert_eq!(
            serde_json::from_str::<MediaAttrs>(r#"{"src": "", "alt": null}"#).unwrap(),
            MediaAttrs::default()
        );
    }

    #[test]
    fn test_parse_document() {
        let doc: Document = r#"{
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Intro"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "see ", "marks": [{"type": "bold"}]},
                    {"type": "text", "text": "here", "marks": [{"type": "link", "attrs": {"href": "https://a.example"}}]}
                ]},
                {"type": "customWidget", "attrs": {"x": 1}, "content": [{"type": "text", "text": "inner"}]}
            ]
        }"#
        .parse()
        .unwrap();

        let content = doc.content();
        assert_eq!(content.len(), 3);
        assert_eq!(
            content[0],
            Node::Heading {
                attrs: HeadingAttrs { level: Some(2) },
                content: vec![Node::text("Intro")],
            }
        );
        match &content[1].children()[1] {
            Node::Text { marks, .. } => assert_eq!(
                marks,
                &vec![Mark::Link {
                    href: Some(String::from("https://a.example"))
                }]
            ),
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(content[2].kind(), "customWidget");
        assert_eq!(content[2].children(), &[Node::text("inner")]);
    }

    #[test]
    fn test_video_attrs() {
        let node: Node = serde_json::from_str(
            r#"{"type": "videoUpload", "attrs": {
                "src": "clip.mp4", "controls": false, "isExternal": null,
                "alignment": "right", "width": 640, "caption": ""
            }}"#,
        )
        .unwrap();
        match node {
            Node::VideoUpload { attrs } => {
                assert_eq!(attrs.media.src, "clip.mp4");
                assert_eq!(attrs.media.alignment, Alignment::Right);
                assert_eq!(attrs.media.width, Some(Dimension::Pixels(640.0)));
                assert_eq!(attrs.media.caption, None);
                assert_eq!(attrs.controls, Some(false));
                assert_eq!(attrs.is_external, None);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_root_must_be_doc() {
        let err = r#"{"type": "paragraph", "content": []}"#
            .parse::<Document>()
            .unwrap_err();
        assert!(err.to_string().contains("paragraph"), "{}", err);
    }

    #[test]
    fn test_serialize_keeps_wire_shape() {
        let doc = Document::new(vec![Node::Paragraph {
            content: vec![Node::Text {
                text: String::from("hi"),
                marks: vec![Mark::Italic],
            }],
        }]);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "doc",
                "content": [{"type": "paragraph", "content": [
                    {"type": "text", "text": "hi", "marks": [{"type": "italic"}]}
                ]}]
            })
        );
    }

    #[test]
    fn test_read_time() {
        let words = vec!["word"; 401].join(" ");
        let doc = Document::new(vec![Node::Paragraph {
            content: vec![Node::text(words)],
        }]);
        assert_eq!(doc.word_count(), 401);
        assert_eq!(doc.read_time_minutes(), 3);
        assert_eq!(Document::new(Vec::new()).read_time_minutes(), 1);
    }
}
