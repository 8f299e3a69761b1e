//! Cache keys for rendered content.

use std::fmt;

use crate::domain::{ComponentType, DeviceType};

/// Key for memoized page bytes: one rendition per weblog, template,
/// device class and locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub weblog: String,
    pub template: String,
    pub device: DeviceType,
    pub locale: Option<String>,
}

impl PageKey {
    pub fn new(
        weblog: impl Into<String>,
        template: impl Into<String>,
        device: DeviceType,
        locale: Option<String>,
    ) -> Self {
        Self {
            weblog: weblog.into(),
            template: template.into(),
            device,
            locale,
        }
    }

    pub fn for_component(
        weblog: &str,
        component: ComponentType,
        template: &str,
        device: DeviceType,
        locale: Option<&str>,
    ) -> Self {
        Self::new(
            weblog,
            format!("{}/{}", component.as_str(), template),
            device,
            locale.map(str::to_string),
        )
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.weblog,
            self.template,
            self.device.as_str(),
            self.locale.as_deref().unwrap_or("-")
        )
    }
}
