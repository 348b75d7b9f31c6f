pub mod seo;

pub use seo::{SeoConfig, WebhookConfig};
