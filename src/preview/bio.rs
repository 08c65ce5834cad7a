//! The bio page draft being edited
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A link, text or media block on the bio page
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub position: u32,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioSettings {
    #[serde(default = "default_active")]
    pub show_avatar: bool,
    #[serde(default = "default_active")]
    pub show_social_icons: bool,
    #[serde(default)]
    pub hide_branding: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl Default for BioSettings {
    fn default() -> Self {
        Self {
            show_avatar: true,
            show_social_icons: true,
            hide_branding: false,
            layout: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Customization {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub settings: BioSettings,
}

/// Which device silhouette the preview is framed in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    Mobile,
    Desktop,
}

impl Default for DeviceMode {
    fn default() -> Self {
        Self::Mobile
    }
}

/// Fixed viewport of a device frame
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
}

impl DeviceMode {
    pub fn frame(self) -> Frame {
        match self {
            Self::Mobile => Frame {
                width: 375,
                height: 812,
            },
            Self::Desktop => Frame {
                width: 1280,
                height: 800,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(Self::Mobile),
            "desktop" => Ok(Self::Desktop),
            other => Err(other.to_owned()),
        }
    }
}

/// The bio being edited, as one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BioDraft {
    pub username: String,
    pub profile: BioProfile,
    pub blocks: Vec<BioBlock>,
    pub customization: Customization,
    pub device: DeviceMode,
}

/// The bio as the backend returns it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBio {
    #[serde(flatten)]
    pub profile: BioProfile,
    #[serde(default)]
    pub blocks: Vec<BioBlock>,
    #[serde(default)]
    pub customization: Customization,
}

/// A single change made in the editor
#[derive(Debug, Clone, PartialEq)]
pub enum BioEdit {
    Profile(BioProfile),
    Blocks(Vec<BioBlock>),
    Theme(Theme),
    Settings(BioSettings),
    Device(DeviceMode),
    /// New order of blocks by id
    Reorder(Vec<String>),
}

impl BioDraft {
    pub fn new<S: Into<String>>(username: S) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Start from what the backend has stored
    pub fn from_stored<S: Into<String>>(username: S, stored: StoredBio) -> Self {
        let mut draft = Self {
            username: username.into(),
            profile: stored.profile,
            blocks: stored.blocks,
            customization: stored.customization,
            device: DeviceMode::default(),
        };
        draft.blocks.sort_by_key(|b| b.position);
        draft
    }

    pub fn apply(&mut self, edit: BioEdit) {
        match edit {
            BioEdit::Profile(profile) => self.profile = profile,
            BioEdit::Blocks(blocks) => self.blocks = blocks,
            BioEdit::Theme(theme) => self.customization.theme = theme,
            BioEdit::Settings(settings) => self.customization.settings = settings,
            BioEdit::Device(device) => self.device = device,
            BioEdit::Reorder(ids) => self.reorder(&ids),
        }
    }

    /// Named blocks first in the given order, the rest keep theirs
    fn reorder(&mut self, ids: &[String]) {
        let rank = |block: &BioBlock| {
            ids.iter()
                .position(|id| *id == block.id)
                .unwrap_or(ids.len())
        };
        self.blocks.sort_by_key(|b| rank(b));
        for (position, block) in self.blocks.iter_mut().enumerate() {
            block.position = position as u32;
        }
    }
}
