//! Read-only cosmetic lookup

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use super::json::load_json;

/// Cosmetic categories in display priority: only the first applied one shows
const PRIORITY: [&str; 3] = ["effects", "masks", "borders"];

/// Older documents call masks "hats"
const LEGACY_MASKS: &str = "hats";

/// The single visible cosmetic for one participant; at most one field is set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveCosmetics {
    pub border: String,
    pub mask: String,
    pub effect: String,
}

impl ActiveCosmetics {
    pub fn is_empty(&self) -> bool {
        self.border.is_empty() && self.mask.is_empty() && self.effect.is_empty()
    }
}

/// Cosmetic state queried by participant id
pub trait CosmeticLookup {
    fn active(&self, username: &str) -> ActiveCosmetics;
}

/// Lookup for rosters without cosmetics
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCosmetics;

impl CosmeticLookup for NoCosmetics {
    fn active(&self, _username: &str) -> ActiveCosmetics {
        ActiveCosmetics::default()
    }
}

/// `customizations.json`, read once:
/// `{username: {"applied": {"borders": "", "masks": "", "effects": ""}, ...}}`
#[derive(Debug, Clone, Default)]
pub struct CustomizationFile {
    users: BTreeMap<String, Value>,
}

impl CustomizationFile {
    pub fn load(path: &Path) -> Self {
        Self {
            users: load_json(path),
        }
    }

    fn applied<'a>(&'a self, username: &str) -> BTreeMap<&'a str, &'a str> {
        let applied = self
            .users
            .get(username)
            .and_then(|user| user.get("applied"))
            .and_then(Value::as_object);

        let mut choices = BTreeMap::new();
        if let Some(applied) = applied {
            for (category, value) in applied {
                if let Some(name) = value.as_str().filter(|name| !name.is_empty()) {
                    choices.insert(category.as_str(), name);
                }
            }
            if !applied.contains_key("masks") {
                if let Some(name) = choices.remove(LEGACY_MASKS) {
                    choices.insert("masks", name);
                }
            }
        }
        choices
    }
}

impl CosmeticLookup for CustomizationFile {
    fn active(&self, username: &str) -> ActiveCosmetics {
        let choices = self.applied(username);
        let Some((category, name)) = PRIORITY
            .iter()
            .find_map(|category| choices.get(category).map(|name| (*category, *name)))
        else {
            return ActiveCosmetics::default();
        };

        let mut active = ActiveCosmetics::default();
        match category {
            "effects" => active.effect = name.to_string(),
            "masks" => active.mask = name.to_string(),
            _ => active.border = name.to_string(),
        }
        active
    }
}
