pub mod error;
pub mod geo;
pub mod resolver;
pub mod selector;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{CheckError, Result};
pub use geo::{maps_link, CityRegistry, GeoBox};
pub use resolver::{ResolveRequest, Resolver};
pub use selector::{SelectQuery, Selector};
pub use source::{CacheTtls, CachedSource, LocationSource};
