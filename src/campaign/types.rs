use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which presentation component a campaign renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Popup,
    PermissionPrompt,
    InlineComponent,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Popup => "Popup",
            ComponentKind::PermissionPrompt => "PermissionPrompt",
            ComponentKind::InlineComponent => "InlineComponent",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    /// Accepts the wire name (`PermissionPrompt`) or its snake_case form
    /// (`permission_prompt`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "popup" => Ok(ComponentKind::Popup),
            "permissionprompt" => Ok(ComponentKind::PermissionPrompt),
            "inlinecomponent" => Ok(ComponentKind::InlineComponent),
            _ => Err(format!(
                "unknown component kind '{}' (expected Popup, PermissionPrompt or InlineComponent)",
                s
            )),
        }
    }
}

/// When a campaign becomes eligible.
///
/// Only `screen_enter` is understood. Documents carrying any other trigger
/// type still load, but never match a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    ScreenEnter { screen: String },
    #[serde(other)]
    Unsupported,
}

impl Trigger {
    pub fn screen_enter(screen: impl Into<String>) -> Self {
        Trigger::ScreenEnter {
            screen: screen.into(),
        }
    }

    /// True when this trigger fires on entering `screen`.
    pub fn fires_on(&self, screen: &str) -> bool {
        matches!(self, Trigger::ScreenEnter { screen: s } if s == screen)
    }
}

/// A button or link attached to a campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignAction {
    pub label: String,
    /// Action identifier reported back through analytics (e.g. "open_url").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupProps {
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_action: Option<CampaignAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_action: Option<CampaignAction>,
    /// Styling hints and any other keys the host app understands.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionPromptProps {
    /// Platform permission being requested (e.g. "notifications").
    pub permission: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deny_label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineComponentProps {
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<CampaignAction>,
    /// Whether the banner shows a close affordance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissible: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Variant-specific display payload, tied to its component kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignContent {
    Popup(PopupProps),
    PermissionPrompt(PermissionPromptProps),
    InlineComponent(InlineComponentProps),
}

impl CampaignContent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            CampaignContent::Popup(_) => ComponentKind::Popup,
            CampaignContent::PermissionPrompt(_) => ComponentKind::PermissionPrompt,
            CampaignContent::InlineComponent(_) => ComponentKind::InlineComponent,
        }
    }
}

/// A remotely managed piece of content.
///
/// On the wire the component kind is a flat `component` field next to
/// `props`:
///
/// ```json
/// {"id": "welcome_popup", "component": "Popup",
///  "trigger": {"type": "screen_enter", "screen": "Home"},
///  "props": {"title": "Hi"}, "active": true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireCampaign", into = "WireCampaign")]
pub struct Campaign {
    pub id: String,
    pub trigger: Trigger,
    pub content: CampaignContent,
    pub active: bool,
}

impl Campaign {
    pub fn kind(&self) -> ComponentKind {
        self.content.kind()
    }

    /// Screen-and-kind match, ignoring dismissal.
    pub fn targets(&self, screen: &str, kind: ComponentKind) -> bool {
        self.active && self.kind() == kind && self.trigger.fires_on(screen)
    }
}

#[derive(Serialize, Deserialize)]
struct WireCampaign {
    id: String,
    component: ComponentKind,
    trigger: Trigger,
    #[serde(default)]
    props: Value,
    /// A document without the flag is a draft and never shown.
    #[serde(default)]
    active: bool,
}

impl TryFrom<WireCampaign> for Campaign {
    type Error = serde_json::Error;

    fn try_from(wire: WireCampaign) -> Result<Self, Self::Error> {
        let props = match wire.props {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let content = match wire.component {
            ComponentKind::Popup => CampaignContent::Popup(serde_json::from_value(props)?),
            ComponentKind::PermissionPrompt => {
                CampaignContent::PermissionPrompt(serde_json::from_value(props)?)
            }
            ComponentKind::InlineComponent => {
                CampaignContent::InlineComponent(serde_json::from_value(props)?)
            }
        };
        Ok(Campaign {
            id: wire.id,
            trigger: wire.trigger,
            content,
            active: wire.active,
        })
    }
}

impl From<Campaign> for WireCampaign {
    fn from(campaign: Campaign) -> Self {
        let component = campaign.kind();
        let props = match campaign.content {
            CampaignContent::Popup(p) => serde_json::to_value(p),
            CampaignContent::PermissionPrompt(p) => serde_json::to_value(p),
            CampaignContent::InlineComponent(p) => serde_json::to_value(p),
        }
        .unwrap_or(Value::Null);
        WireCampaign {
            id: campaign.id,
            component,
            trigger: campaign.trigger,
            props,
            active: campaign.active,
        }
    }
}

/// Body of the store's list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignList {
    pub campaigns: Vec<Campaign>,
}
