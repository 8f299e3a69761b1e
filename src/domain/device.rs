//! Device classification for incoming requests.
//!
//! A request is rendered either with the standard or the mobile variant of a
//! renderer. Classification is derived from the `User-Agent` header and may
//! be overridden with an explicit `type=standard|mobile` query parameter
//! (used by theme previews).

use serde::Deserialize;

/// User-agent fragments that mark a client as mobile.
const MOBILE_MARKERS: &[&str] = &[
    "mobile", "android", "iphone", "ipod", "blackberry", "windows phone", "opera mini",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Standard,
    Mobile,
}

impl DeviceType {
    /// Classify a client from its `User-Agent` header value.
    ///
    /// Unknown or absent agents are treated as standard clients.
    pub fn classify(user_agent: Option<&str>) -> Self {
        let Some(agent) = user_agent else {
            return DeviceType::Standard;
        };
        let agent = agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| agent.contains(marker)) {
            DeviceType::Mobile
        } else {
            DeviceType::Standard
        }
    }

    /// Resolve an explicit `type=` request parameter.
    ///
    /// Anything other than `standard` selects the mobile rendition.
    pub fn from_param(param: &str) -> Self {
        if param == "standard" {
            DeviceType::Standard
        } else {
            DeviceType::Mobile
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Standard => "standard",
            DeviceType::Mobile => "mobile",
        }
    }
}
