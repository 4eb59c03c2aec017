//! Stamp and background selection.

use serde::{Deserialize, Serialize};
use stampcard_core::ArtifactRef;

/// `stampSettings/{uid}`: the stamp a user presses onto other boards and
/// the background of their own board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampSettings {
    #[serde(default, rename = "selectedStampImageUri")]
    pub selected_stamp: Option<ArtifactRef>,

    #[serde(default, rename = "selectedBackgroundImageUri")]
    pub selected_background: Option<ArtifactRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_field_names() {
        let settings = StampSettings {
            selected_stamp: Some(ArtifactRef::new("sumi.png")),
            selected_background: None,
        };
        let encoded = serde_json::to_value(&settings).unwrap();
        assert_eq!(encoded, json!({"selectedStampImageUri": "sumi.png", "selectedBackgroundImageUri": null}));

        let decoded: StampSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(decoded, StampSettings::default());
    }
}
