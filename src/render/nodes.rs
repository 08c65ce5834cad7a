//! One rendering rule per node type
use super::markup::{Element, Markup};
use super::media::VideoSource;
use crate::model::{Document, HeadingAttrs, Mark, MediaAttrs, Node, VideoAttrs};

/// Height of an embedded player when the document does not say
const DEFAULT_FRAME_HEIGHT: &str = "400";
/// Embedded players never get smaller than this
const MIN_FRAME_HEIGHT: &str = "300px";

pub fn render_document(doc: &Document) -> Markup {
    Element::new("div")
        .class("rich-content")
        .children(render_fragment(doc.content()))
        .into()
}

pub fn render_fragment(nodes: &[Node]) -> Vec<Markup> {
    nodes.iter().map(render_node).collect()
}

pub fn render_node(node: &Node) -> Markup {
    match node {
        Node::Doc { content } => Element::new("div")
            .class("rich-content")
            .children(render_fragment(content))
            .into(),
        Node::Paragraph { content } => block("p", content),
        Node::Heading { attrs, content } => {
            let level = heading_level(attrs);
            Element::new(heading_tag(level))
                .class(heading_class(level))
                .children(render_fragment(content))
                .into()
        }
        Node::BulletList { content } => block("ul", content),
        Node::OrderedList { attrs, content } => {
            let mut list = Element::new("ol");
            if let Some(start) = attrs.start.filter(|&start| start != 1) {
                list = list.attr("start", start.to_string());
            }
            list.children(render_fragment(content)).into()
        }
        Node::ListItem { content } => block("li", content),
        Node::Blockquote { content } => block("blockquote", content),
        Node::CodeBlock { attrs, content } => {
            let mut code = Element::new("code");
            if let Some(language) = &attrs.language {
                code = code.class(&format!("language-{}", language));
            }
            Element::new("pre")
                .child(code.children(render_fragment(content)))
                .into()
        }
        Node::ImageUpload { attrs } => render_image(attrs),
        Node::VideoUpload { attrs } => render_video(attrs),
        Node::HorizontalRule => Element::new("hr").into(),
        Node::HardBreak => Element::new("br").into(),
        Node::Text { text, marks } => render_text(text, marks),
        Node::Unknown { content, .. } => Markup::Fragment(render_fragment(content)),
    }
}

fn block(tag: &'static str, content: &[Node]) -> Markup {
    Element::new(tag).children(render_fragment(content)).into()
}

pub fn heading_level(attrs: &HeadingAttrs) -> u32 {
    attrs.level.filter(|&level| level > 0).unwrap_or(1)
}

fn heading_tag(level: u32) -> &'static str {
    match level {
        0 | 1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    }
}

/// Levels beyond 3 all share the smallest size
pub fn heading_class(level: u32) -> &'static str {
    match level {
        1 => "text-3xl font-bold",
        2 => "text-2xl font-semibold",
        3 => "text-xl font-semibold",
        _ => "text-lg font-medium",
    }
}

fn caption(text: &Option<String>) -> Option<Markup> {
    text.as_ref().map(|text| {
        Element::new("figcaption")
            .class("media-caption")
            .child(Markup::text(text.as_str()))
            .into()
    })
}

fn render_image(attrs: &MediaAttrs) -> Markup {
    let width = attrs.width.as_ref().map_or_else(|| "auto".to_owned(), |w| w.css());
    let height = attrs.height.as_ref().map_or_else(|| "auto".to_owned(), |h| h.css());
    let img = Element::new("img")
        .attr("src", attrs.src.as_str())
        .attr("alt", attrs.alt.as_deref().unwrap_or(""))
        .attr(
            "style",
            format!(
                "display: block; max-width: 100%; width: {}; height: {}; margin: {}",
                width,
                height,
                attrs.alignment.margin()
            ),
        );
    Element::new("figure")
        .class("image-block")
        .attr("style", format!("text-align: {}", attrs.alignment.as_str()))
        .child(img)
        .children(caption(&attrs.caption))
        .into()
}

fn render_video(attrs: &VideoAttrs) -> Markup {
    let media = &attrs.media;
    let external = attrs.is_external.unwrap_or(false);
    let player: Markup = match VideoSource::resolve(&media.src, external) {
        VideoSource::Native(src) => {
            let width = media.width.as_ref().map_or_else(|| "100%".to_owned(), |w| w.css());
            let height = media.height.as_ref().map_or_else(|| "auto".to_owned(), |h| h.css());
            let mut video = Element::new("video").attr("src", src);
            if attrs.controls != Some(false) {
                video = video.flag("controls");
            }
            if attrs.autoplay == Some(true) {
                video = video.flag("autoplay");
            }
            if attrs.r#loop == Some(true) {
                video = video.flag("loop");
            }
            video
                .attr("style", format!("width: {}; height: {}", width, height))
                .into()
        }
        VideoSource::Frame(src) => {
            let height = media
                .height
                .as_ref()
                .map_or_else(|| DEFAULT_FRAME_HEIGHT.to_owned(), |h| h.attr());
            Element::new("iframe")
                .attr("src", src.into_owned())
                .attr("width", "100%")
                .attr("height", height)
                .attr(
                    "style",
                    format!("width: 100%; min-height: {}; border: 0", MIN_FRAME_HEIGHT),
                )
                .attr(
                    "allow",
                    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture",
                )
                .flag("allowfullscreen")
                .into()
        }
    };
    Element::new("figure")
        .class("video-block")
        .attr("style", format!("text-align: {}", media.alignment.as_str()))
        .child(player)
        .children(caption(&media.caption))
        .into()
}

/// Marks wrap the text in array order, each around the previous result
fn render_text(text: &str, marks: &[Mark]) -> Markup {
    marks
        .iter()
        .fold(Markup::text(text), |inner, mark| match mark {
            Mark::Bold => Element::new("strong").child(inner).into(),
            Mark::Italic => Element::new("em").child(inner).into(),
            Mark::Code => Element::new("code").child(inner).into(),
            Mark::Link { href } => {
                let mut link = Element::new("a");
                if let Some(href) = href {
                    link = link.attr("href", href.as_str());
                }
                link.attr("target", "_blank")
                    .attr("rel", "noopener noreferrer")
                    .child(inner)
                    .into()
            }
            Mark::Other(_) => inner,
        })
}
