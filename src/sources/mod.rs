pub mod cached;
pub mod direct_url;
pub mod smart_source;
pub mod youtube;

use async_trait::async_trait;

use crate::{
    audio::track::{Track, UserId},
    error::ResolveError,
};

pub use cached::CachedResolver;
pub use direct_url::DirectUrlResolver;
pub use smart_source::SmartResolver;
pub use youtube::YtDlpResolver;

/// Convierte una consulta (URL o texto de búsqueda) en una [`Track`].
///
/// El núcleo no reintenta: si la política de reintentos hace falta, es cosa
/// de la implementación.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, ResolveError>;

    /// Verifica si la consulta es válida para esta fuente
    fn accepts(&self, query: &str) -> bool;

    /// Nombre de la fuente
    fn source_name(&self) -> &'static str;
}
