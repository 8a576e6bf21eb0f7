pub mod aws;
pub mod builder;
pub mod codec;
pub mod error;
pub mod http;
pub mod normalize;
pub mod resolver;
pub mod response;
pub mod store;

pub use builder::{BuilderConfig, ResponseBuilder};
pub use codec::{Codec, GzipCodec};
pub use error::EnvelopeError;
pub use http::HttpFetcher;
pub use normalize::RawInvocationResult;
pub use resolver::ResponseResolver;
pub use response::{Encoding, Response, ResponseOptions};
pub use store::{Fetcher, MemoryStore, ObjectStore};
