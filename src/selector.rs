//! Campaign index: decides what renders on a screen.
//!
//! Every function here is pure. Given the same campaign list, dismissal set
//! and screen the result is the same, and results keep the campaign list's
//! order. When several campaigns of a singleton kind target one screen the
//! earliest in the list wins.

use std::collections::HashSet;

use crate::campaign::{Campaign, ComponentKind};

/// True if `campaign` should render as `kind` on `screen`.
pub fn is_eligible(
    campaign: &Campaign,
    dismissed: &HashSet<String>,
    screen: &str,
    kind: ComponentKind,
) -> bool {
    campaign.targets(screen, kind) && !dismissed.contains(&campaign.id)
}

/// First eligible campaign of `kind` for `screen`.
pub fn select_first<'a>(
    campaigns: &'a [Campaign],
    dismissed: &HashSet<String>,
    screen: &str,
    kind: ComponentKind,
) -> Option<&'a Campaign> {
    campaigns
        .iter()
        .find(|c| is_eligible(c, dismissed, screen, kind))
}

/// Every eligible campaign of `kind` for `screen`, in list order.
pub fn select_all<'a>(
    campaigns: &'a [Campaign],
    dismissed: &HashSet<String>,
    screen: &str,
    kind: ComponentKind,
) -> Vec<&'a Campaign> {
    campaigns
        .iter()
        .filter(|c| is_eligible(c, dismissed, screen, kind))
        .collect()
}

pub fn select_popup<'a>(
    campaigns: &'a [Campaign],
    dismissed: &HashSet<String>,
    screen: &str,
) -> Option<&'a Campaign> {
    select_first(campaigns, dismissed, screen, ComponentKind::Popup)
}

pub fn select_permission_prompt<'a>(
    campaigns: &'a [Campaign],
    dismissed: &HashSet<String>,
    screen: &str,
) -> Option<&'a Campaign> {
    select_first(campaigns, dismissed, screen, ComponentKind::PermissionPrompt)
}

pub fn select_inline_component<'a>(
    campaigns: &'a [Campaign],
    dismissed: &HashSet<String>,
    screen: &str,
) -> Option<&'a Campaign> {
    select_first(campaigns, dismissed, screen, ComponentKind::InlineComponent)
}

/// Inline campaigns for `screen`.
///
/// With `ids`, the result is further restricted to those ids. Ordering still
/// follows the campaign list, not the allow-list.
pub fn select_inline_components<'a>(
    campaigns: &'a [Campaign],
    dismissed: &HashSet<String>,
    screen: &str,
    ids: Option<&[String]>,
) -> Vec<&'a Campaign> {
    let mut selected = select_all(campaigns, dismissed, screen, ComponentKind::InlineComponent);
    if let Some(ids) = ids {
        selected.retain(|c| ids.iter().any(|id| id == &c.id));
    }
    selected
}
