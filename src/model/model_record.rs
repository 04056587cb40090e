// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

const VISUAL_WRAPPER_OPEN: &str = "<mxGraphModel>";
const VISUAL_WRAPPER_CLOSE: &str = "</mxGraphModel>";

/// Persisted threat/visual model text of one project.
///
/// Every update overwrites the whole record; the `*_is_updated` flags only say whether the most
/// recent update carried non-blank text for that half.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    #[serde(default)]
    pub threat_model: String,
    #[serde(default)]
    pub visual_model: String,
    #[serde(default)]
    pub visual_is_updated: bool,
    #[serde(default)]
    pub threat_is_updated: bool,
}

impl ModelRecord {
    pub fn from_incoming(threat_model: &str, visual_model: &str) -> Self {
        Self {
            threat_model: threat_model.to_owned(),
            visual_model: strip_visual_wrapper(visual_model),
            visual_is_updated: !visual_model.trim().is_empty(),
            threat_is_updated: !threat_model.trim().is_empty(),
        }
    }
}

/// Drops the outer `<mxGraphModel>` wrapper the diagram editor puts around its XML.
pub fn strip_visual_wrapper(visual_model: &str) -> String {
    visual_model
        .replacen(VISUAL_WRAPPER_OPEN, "", 1)
        .replacen(VISUAL_WRAPPER_CLOSE, "", 1)
}

#[cfg(test)]
mod tests {
    use super::{strip_visual_wrapper, ModelRecord};

    #[test]
    fn flags_follow_blankness_of_incoming_text() {
        let record = ModelRecord::from_incoming("T", "");
        assert!(record.threat_is_updated);
        assert!(!record.visual_is_updated);

        let record = ModelRecord::from_incoming("  \n", "<root/>");
        assert!(!record.threat_is_updated);
        assert!(record.visual_is_updated);
    }

    #[test]
    fn strips_wrapper_and_leaves_bare_xml_alone() {
        assert_eq!(strip_visual_wrapper("<mxGraphModel><root/></mxGraphModel>"), "<root/>");
        assert_eq!(strip_visual_wrapper("<root/>"), "<root/>");
    }

    #[test]
    fn record_keeps_stripped_visual_text() {
        let record = ModelRecord::from_incoming("", "<mxGraphModel><root/></mxGraphModel>");
        assert_eq!(record.visual_model, "<root/>");
    }

    #[test]
    fn default_record_is_empty() {
        let record = ModelRecord::default();
        assert!(record.threat_model.is_empty());
        assert!(record.visual_model.is_empty());
        assert!(!record.threat_is_updated && !record.visual_is_updated);
    }
}
