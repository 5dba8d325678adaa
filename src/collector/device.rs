//! Page context captured at session start

use serde::{Deserialize, Serialize};

/// Viewports narrower than this are classified as mobile
pub const MOBILE_MAX_WIDTH_PX: u32 = 768;

const MOBILE_UA_MARKERS: [&str; 7] = [
    "mobi",
    "android",
    "iphone",
    "ipod",
    "windows phone",
    "blackberry",
    "opera mini",
];

/// Coarse device classification recorded on `session_start`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }

    /// Classify from a User-Agent header
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_UA_MARKERS.iter().any(|marker| ua.contains(marker)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    /// Classify from the viewport width in CSS pixels
    pub fn from_viewport_width(width_px: u32) -> Self {
        if width_px < MOBILE_MAX_WIDTH_PX {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Where and how the session landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub device_class: DeviceClass,
    /// Referring URL, if the host exposed one
    pub referrer: Option<String>,
    /// Path of the first page in the session
    pub landing_page: String,
}

impl PageContext {
    pub fn new(landing_page: impl Into<String>) -> Self {
        Self {
            device_class: DeviceClass::default(),
            referrer: None,
            landing_page: landing_page.into(),
        }
    }

    pub fn with_device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = device_class;
        self
    }

    /// Empty referrers are treated as absent
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        let referrer = referrer.into();
        self.referrer = if referrer.is_empty() { None } else { Some(referrer) };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_classification() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
        let pixel = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120.0 Mobile Safari/537.36";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Safari/605.1.15";

        assert_eq!(DeviceClass::from_user_agent(iphone), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(pixel), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(mac), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_user_agent(""), DeviceClass::Desktop);
    }

    #[test]
    fn test_viewport_classification() {
        assert_eq!(DeviceClass::from_viewport_width(375), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_viewport_width(767), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_viewport_width(768), DeviceClass::Desktop);
    }

    #[test]
    fn test_empty_referrer_is_absent() {
        let page = PageContext::new("/spreads/celtic-cross").with_referrer("");
        assert_eq!(page.referrer, None);

        let page = page.with_referrer("https://search.example/");
        assert_eq!(page.referrer.as_deref(), Some("https://search.example/"));
    }
}
