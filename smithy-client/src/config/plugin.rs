//! Client plugins.

use crate::builder::ClientBuilder;

/// Reusable client configuration.
///
/// A plugin is applied at most once per builder, keyed by [`name`](Self::name).
/// It may add interceptors, auth schemes or context values, and may apply
/// other plugins through [`ClientBuilder::apply_plugin`].
pub trait ClientPlugin: Send + Sync {
    /// Identity used to deduplicate applications. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn configure_client(&self, builder: &mut ClientBuilder);
}
