//! Response compression layer.

use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};

/// Predicate used by [`build_compression_layer`].
pub type CompressionPredicate = tower_http::compression::predicate::And<DefaultPredicate, NotForContentType>;

/// Builds a gzip compression layer that leaves ZIP archives alone.
pub fn build_compression_layer() -> CompressionLayer<CompressionPredicate> {
    CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::new("application/zip")))
}
