//! Embedding of hosted videos
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)").expect("valid regex")
});

static VIMEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com/(\d+)").expect("valid regex"));

/// A video host we know how to embed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    Vimeo,
}

impl Platform {
    /// Recognise the host by substring
    pub fn detect(src: &str) -> Option<Self> {
        if src.contains("youtube.com") || src.contains("youtu.be") {
            Some(Self::YouTube)
        } else if src.contains("vimeo.com") {
            Some(Self::Vimeo)
        } else {
            None
        }
    }

    pub fn video_id(self, src: &str) -> Option<&str> {
        let re = match self {
            Self::YouTube => &*YOUTUBE_ID,
            Self::Vimeo => &*VIMEO_ID,
        };
        re.captures(src)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn embed_url(self, id: &str) -> String {
        match self {
            Self::YouTube => format!("https://www.youtube.com/embed/{}", id),
            Self::Vimeo => format!("https://player.vimeo.com/video/{}", id),
        }
    }
}

/// How a `videoUpload` source is presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource<'a> {
    /// A file the browser can play itself
    Native(&'a str),
    /// A player page shown in a frame
    Frame(Cow<'a, str>),
}

impl<'a> VideoSource<'a> {
    /// Classify a source; `external` forces a frame for unknown hosts
    pub fn resolve(src: &'a str, external: bool) -> Self {
        match Platform::detect(src) {
            Some(platform) => match platform.video_id(src) {
                Some(id) => VideoSource::Frame(Cow::Owned(platform.embed_url(id))),
                None => VideoSource::Frame(Cow::Borrowed(src)),
            },
            None if external => VideoSource::Frame(Cow::Borrowed(src)),
            None => VideoSource::Native(src),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube() {
        assert_eq!(
            VideoSource::resolve("https://www.youtube.com/watch?v=abc123", false),
            VideoSource::Frame(Cow::Borrowed("https://www.youtube.com/embed/abc123"))
        );
        assert_eq!(
            VideoSource::resolve("https://youtu.be/xyz_9?t=42", false),
            VideoSource::Frame(Cow::Borrowed("https://www.youtube.com/embed/xyz_9"))
        );
        assert_eq!(
            Platform::YouTube.video_id("https://www.youtube.com/watch?v=abc&list=PL1#t"),
            Some("abc")
        );
    }

    #[test]
    fn test_vimeo() {
        assert_eq!(
            VideoSource::resolve("https://vimeo.com/76979871", false),
            VideoSource::Frame(Cow::Borrowed("https://player.vimeo.com/video/76979871"))
        );
        // matched host without an id keeps the source
        assert_eq!(
            VideoSource::resolve("https://vimeo.com/channels/staffpicks", false),
            VideoSource::Frame(Cow::Borrowed("https://vimeo.com/channels/staffpicks"))
        );
    }

    #[test]
    fn test_native_and_external() {
        assert_eq!(
            VideoSource::resolve("https://cdn.example/clip.mp4", false),
            VideoSource::Native("https://cdn.example/clip.mp4")
        );
        assert_eq!(
            VideoSource::resolve("https://player.example/embed/1", true),
            VideoSource::Frame(Cow::Borrowed("https://player.example/embed/1"))
        );
    }
}
