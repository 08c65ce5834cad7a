use super::bio::BioDraft;
use urlencoding::encode;

/// The address a preview frame loads to show `draft`
///
/// Profile fields travel as plain strings; theme, blocks and settings are
/// JSON documents. Every value is percent-encoded.
pub fn preview_address(base: &str, draft: &BioDraft) -> Result<String, serde_json::Error> {
    let profile = &draft.profile;
    let mut params: Vec<(&str, String)> = Vec::new();
    let fields = [
        ("displayName", &profile.display_name),
        ("bio", &profile.bio),
        ("avatarUrl", &profile.avatar_url),
        ("location", &profile.location),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            params.push((key, value.clone()));
        }
    }
    params.push(("theme", serde_json::to_string(&draft.customization.theme)?));
    params.push(("blocks", serde_json::to_string(&draft.blocks)?));
    params.push((
        "settings",
        serde_json::to_string(&draft.customization.settings)?,
    ));
    params.push(("device", draft.device.to_string()));

    let query: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, encode(value)))
        .collect();
    Ok(format!(
        "{}/bio/{}/preview?{}",
        base.trim_end_matches('/'),
        encode(&draft.username),
        query.join("&")
    ))
}

/// The embedded page showing the preview
///
/// Only navigates when the address actually changes, so the page does not
/// reload for edits that end up producing the same preview.
#[derive(Debug, Default)]
pub struct PreviewFrame {
    current: Option<String>,
}

impl PreviewFrame {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Point the frame at `address`, returns whether it moved
    pub fn navigate(&mut self, address: String) -> bool {
        if self.current.as_deref() == Some(address.as_str()) {
            false
        } else {
            self.current = Some(address);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::bio::{BioProfile, DeviceMode};
    use serde_json::Value;
    use std::collections::HashMap;

    fn query_of(address: &str) -> HashMap<String, String> {
        let query = address.splitn(2, '?').nth(1).unwrap();
        query
            .split('&')
            .map(|pair| {
                let mut kv = pair.splitn(2, '=');
                let key = kv.next().unwrap().to_owned();
                let value = urlencoding::decode(kv.next().unwrap()).unwrap();
                (key, value)
            })
            .collect()
    }

    #[test]
    fn test_address_fields() {
        let mut draft = BioDraft::new("alice");
        draft.profile = BioProfile {
            display_name: Some(String::from("Alice & Co")),
            bio: None,
            avatar_url: Some(String::from("https://cdn.example/a.png?s=1")),
            location: None,
        };
        draft.customization.theme.text_color = Some(String::from("#fff"));
        draft.device = DeviceMode::Desktop;

        let address = preview_address("https://app.example/", &draft).unwrap();
        assert!(address.starts_with("https://app.example/bio/alice/preview?displayName=Alice%20%26%20Co&"));

        let query = query_of(&address);
        assert_eq!(query["displayName"], "Alice & Co");
        assert_eq!(query["avatarUrl"], "https://cdn.example/a.png?s=1");
        assert!(!query.contains_key("bio"));
        assert_eq!(query["device"], "desktop");
        let theme: Value = serde_json::from_str(&query["theme"]).unwrap();
        assert_eq!(theme["textColor"], "#fff");
        let blocks: Value = serde_json::from_str(&query["blocks"]).unwrap();
        assert_eq!(blocks, Value::Array(Vec::new()));
        let settings: Value = serde_json::from_str(&query["settings"]).unwrap();
        assert_eq!(settings["showAvatar"], true);
    }

    #[test]
    fn test_frame_navigates_on_change_only() {
        let mut frame = PreviewFrame::default();
        assert!(frame.navigate(String::from("/a")));
        assert!(!frame.navigate(String::from("/a")));
        assert!(frame.navigate(String::from("/b")));
        assert_eq!(frame.current(), Some("/b"));
    }
}
