//! Application services: the render pipeline and its collaborators.

pub mod error;
pub mod model;
pub mod newsfeed;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod templates;
pub mod theme_reload;

pub use error::RenderError;
pub use model::{
    MessagesModel, Model, ModelLoader, ModelLoaderRegistry, ModelSeed, RequestModel, SearchModel,
    WeblogModel,
};
pub use newsfeed::{FeedEntry, NewsfeedModel, NewsfeedService};
pub use pipeline::{PipelineOptions, RenderPipeline};
pub use render::{RenderedPage, Renderer, RendererRegistry};
pub use request::{RenderParams, RenderRequest};
pub use theme_reload::ThemeReloadCoordinator;
