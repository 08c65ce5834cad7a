//! # Legacy content migration
//!
//! Older uploads stored images as `videoUpload` nodes, and some of that content
//! was persisted as HTML instead of document JSON. Such markup shows up as
//! `<video>` tags pointing at image files, sometimes wrapped in a
//! `video-block` figure. [`migrate`] rewrites exactly those two shapes and
//! leaves every other byte of the input alone.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static MISTAGGED_VIDEO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<video\b[^>]*?\ssrc\s*=\s*["']([^"']+\.(?:png|jpe?g|gif|webp|bmp|svg))["'][^>]*?/?>(?:\s*</video>)?"#,
    )
    .expect("valid regex")
});

static VIDEO_FIGURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?i)<figure\b([^>]*?)\sclass\s*=\s*["']([^"']*?)\bvideo-block\b([^"']*)["']([^>]*)>\s*"#,
        r#"(?:<img\s+src\s*=\s*["']([^"']+\.(?:png|jpe?g|gif|webp|bmp|svg))["']\s*/?>"#,
        r#"|<video\b[^>]*?\ssrc\s*=\s*["']([^"']+\.(?:png|jpe?g|gif|webp|bmp|svg))["'][^>]*?/?>(?:\s*</video>)?)"#,
        r#"\s*</figure>"#,
    ))
    .expect("valid regex")
});

fn fix_figure(caps: &Captures) -> String {
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
    let src = caps.get(5).or_else(|| caps.get(6)).map_or("", |m| m.as_str());
    format!(
        "<figure{} class=\"{}image-block{}\"{}><img src=\"{}\"></figure>",
        group(1),
        group(2),
        group(3),
        group(4),
        src
    )
}

/// Whether the markup contains a `<video>` tag with an image source
pub fn needs_migration(raw: &str) -> bool {
    MISTAGGED_VIDEO.is_match(raw)
}

/// Rewrite mis-tagged image videos and their `video-block` figures
pub fn migrate(raw: &str) -> Cow<'_, str> {
    let images = MISTAGGED_VIDEO.replace_all(raw, "<img src=\"${1}\">");
    let figures = match VIDEO_FIGURE.replace_all(&images, fix_figure) {
        Cow::Borrowed(_) => None,
        Cow::Owned(fixed) => Some(fixed),
    };
    match figures {
        Some(fixed) => Cow::Owned(fixed),
        None => images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_video_to_img() {
        let out = migrate(r#"<video src="a.png"></video>"#);
        assert_eq!(out, r#"<img src="a.png">"#);
        assert!(!out.contains("<video"));
    }

    #[test]
    fn test_case_and_attributes() {
        let out = migrate(r#"<p>x</p><VIDEO controls src='/up/B.JPEG' width="300"/>"#);
        assert_eq!(out, r#"<p>x</p><img src="/up/B.JPEG">"#);
    }

    #[test]
    fn test_figure_rewrite() {
        let out = migrate(
            r#"<figure class="media video-block"> <video src="c.webp" controls></video> </figure>"#,
        );
        assert_eq!(out, r#"<figure class="media image-block"><img src="c.webp"></figure>"#);
    }

    #[test]
    fn test_real_videos_untouched() {
        let raw = r#"<figure class="video-block"><video src="clip.mp4" controls></video></figure><video data-src="x.png" src="y.mov"></video>"#;
        assert!(!needs_migration(raw));
        assert!(matches!(migrate(raw), Cow::Borrowed(_)));
    }

    #[test]
    fn test_figure_with_more_content_keeps_class() {
        let raw = r#"<figure class="video-block"><video src="a.gif"></video><figcaption>c</figcaption></figure>"#;
        assert_eq!(
            migrate(raw),
            r#"<figure class="video-block"><img src="a.gif"><figcaption>c</figcaption></figure>"#
        );
    }
}
