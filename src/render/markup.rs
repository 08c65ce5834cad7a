//! Presentational element tree and its HTML serialization
use std::fmt::{self, Write};

/// Output of the renderer, mirrors the structure of the input document
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(Element),
    /// Text, escaped when written
    Text(String),
    /// Markup that is written as-is
    Raw(String),
    /// Children without a wrapping element
    Fragment(Vec<Markup>),
}

/// An HTML element with ordered attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    /// `None` values are written as bare boolean attributes
    pub attrs: Vec<(&'static str, Option<String>)>,
    pub children: Vec<Markup>,
}

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr<S: Into<String>>(mut self, name: &'static str, value: S) -> Self {
        self.attrs.push((name, Some(value.into())));
        self
    }

    pub fn flag(mut self, name: &'static str) -> Self {
        self.attrs.push((name, None));
        self
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn child<M: Into<Markup>>(mut self, child: M) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = Markup>,
    {
        self.children.extend(children);
        self
    }

    /// The value of an attribute, `Some("")` for boolean ones
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag)
    }
}

impl From<Element> for Markup {
    fn from(el: Element) -> Self {
        Markup::Element(el)
    }
}

impl Markup {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Markup::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Markup::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Depth-first search for the first element with this tag
    pub fn find(&self, tag: &str) -> Option<&Element> {
        match self {
            Markup::Element(el) if el.tag == tag => Some(el),
            Markup::Element(el) => el.children.iter().find_map(|c| c.find(tag)),
            Markup::Fragment(items) => items.iter().find_map(|c| c.find(tag)),
            Markup::Text(_) | Markup::Raw(_) => None,
        }
    }

    /// Serialize into a fresh string
    pub fn to_html(&self) -> String {
        self.to_string()
    }

    fn write_html<W: Write>(&self, w: &mut W) -> fmt::Result {
        match self {
            Markup::Text(text) => write_escaped(w, text),
            Markup::Raw(html) => w.write_str(html),
            Markup::Fragment(items) => {
                for item in items {
                    item.write_html(w)?;
                }
                Ok(())
            }
            Markup::Element(el) => {
                write!(w, "<{}", el.tag)?;
                for (name, value) in &el.attrs {
                    match value {
                        Some(value) => {
                            write!(w, " {}=\"", name)?;
                            write_escaped(w, value)?;
                            w.write_char('"')?;
                        }
                        None => write!(w, " {}", name)?,
                    }
                }
                w.write_char('>')?;
                if el.is_void() {
                    return Ok(());
                }
                for child in &el.children {
                    child.write_html(w)?;
                }
                write!(w, "</{}>", el.tag)
            }
        }
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_html(f)
    }
}

fn write_escaped<W: Write>(w: &mut W, text: &str) -> fmt::Result {
    for c in text.chars() {
        match c {
            '&' => w.write_str("&amp;")?,
            '<' => w.write_str("&lt;")?,
            '>' => w.write_str("&gt;")?,
            '"' => w.write_str("&quot;")?,
            '\'' => w.write_str("&#39;")?,
            c => w.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escaping() {
        let markup: Markup = Element::new("a")
            .attr("href", "https://x.example/?a=1&b=\"2\"")
            .child(Markup::text("<script>"))
            .into();
        assert_eq!(
            markup.to_html(),
            "<a href=\"https://x.example/?a=1&amp;b=&quot;2&quot;\">&lt;script&gt;</a>"
        );
    }

    #[test]
    fn test_void_and_flags() {
        let markup = Markup::Fragment(vec![
            Element::new("video").attr("src", "a.mp4").flag("controls").into(),
            Element::new("br").into(),
            Markup::Raw(String::from("<b>kept</b>")),
        ]);
        assert_eq!(
            markup.to_html(),
            "<video src=\"a.mp4\" controls></video><br><b>kept</b>"
        );
        let video = markup.find("video").unwrap();
        assert_eq!(video.get_attr("controls"), Some(""));
        assert_eq!(video.get_attr("autoplay"), None);
    }
}
