//! Domain entities and the narrow collaborator contracts the render
//! pipeline consumes.

pub mod device;
pub mod error;
pub mod themes;
pub mod weblog;

pub use device::DeviceType;
pub use error::DomainError;
pub use themes::{
    CUSTOM_THEME, ComponentType, MessageBundles, TemplateLanguage, Theme, ThemeSource,
    ThemeTemplate,
};
pub use weblog::{Weblog, WeblogRepo};
