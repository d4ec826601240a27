//! Exchange file record: one preset, flattened and self-contained

use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::model::{bytes, PresetDetails};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRecord {
    pub name: String,
    pub text_setting: TextSettingRecord,
    pub visual_simulation: VisualSimulationRecord,
    pub user: UserRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSettingRecord {
    pub text_field_data: String,
    pub text_size: f64,
    pub text_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSimulationRecord {
    pub blurriness: f64,
    /// Embedded image, base64 in the file
    #[serde(default, with = "bytes::option", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub name: String,
    pub is_from_countryside: bool,
}

impl PresetRecord {
    /// Project a preset and everything it links to into a record.
    /// The pair code and background code come from the background color
    /// link, the text code from the text color link.
    pub fn from_details(details: &PresetDetails) -> Self {
        let background = details.background_color.as_ref();
        Self {
            name: details.preset.name.clone(),
            text_setting: TextSettingRecord {
                text_field_data: details.text_setting.text.clone(),
                text_size: details.text_setting.size,
                text_weight: details.text_setting.weight,
                color_code: background.map(|c| c.code.clone()),
                background_color_code: background.map(|c| c.background_code.clone()),
                text_color_code: details.text_color.as_ref().map(|c| c.text_code.clone()),
            },
            visual_simulation: VisualSimulationRecord {
                blurriness: details.visual_simulation.blurriness,
                image_data: details.image.as_ref().map(|image| image.bytes.clone()),
            },
            user: UserRecord {
                name: details.user.name.clone(),
                is_from_countryside: details.user.is_from_countryside,
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, TransferError> {
        serde_json::to_vec_pretty(self).map_err(TransferError::Encode)
    }

    /// Parse a record. Either the whole record is valid or nothing is returned.
    pub fn from_json(data: &[u8]) -> Result<Self, TransferError> {
        serde_json::from_slice(data).map_err(TransferError::Decode)
    }
}
