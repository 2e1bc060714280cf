//! Plugin manifest: the capabilities a plugin contributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A navigation entry contributed to the admin menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Display label.
    pub label: String,
    /// Frontend route.
    pub route: String,
    /// Icon name.
    #[serde(default)]
    pub icon: Option<String>,
    /// Permission required to see the entry.
    #[serde(default)]
    pub permission: Option<String>,
}

/// Structured definition of what a plugin provides.
///
/// Known sections are typed; any other section is kept verbatim in
/// `extra` so manifests from newer publishers survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Menu entries added to the admin UI.
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    /// JSON schema describing the tenant-editable settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_schema: Option<Value>,
    /// Permissions the plugin needs; granted on install.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Unrecognized manifest sections.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sections_are_preserved() {
        let raw = serde_json::json!({
            "menu_items": [{ "label": "Barcodes", "route": "/library/barcodes" }],
            "permissions": ["library.read"],
            "widgets": [{ "id": "due-today" }]
        });
        let manifest: PluginManifest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(manifest.menu_items[0].route, "/library/barcodes");
        assert_eq!(manifest.permissions, vec!["library.read"]);
        assert!(manifest.extra.contains_key("widgets"));
        assert_eq!(serde_json::to_value(&manifest).unwrap()["widgets"], raw["widgets"]);
    }
}
