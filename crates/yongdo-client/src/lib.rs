//! Network side of yongdo: address resolution and zoning service probing
//! against the Korean public-data APIs.

pub mod credential;
mod error;
pub mod prober;
pub mod query;
pub mod resolver;
pub mod response;
pub mod transport;

pub use credential::{Credential, KeyVariant};
pub use error::{ProbeError, ResolveError, TransportError};
pub use prober::{AttemptStatus, ZoningAnswer, ZoningProber, ZoningQueryResult};
pub use query::{PreEncoded, QueryString};
pub use resolver::{AddressResolver, ResolvedParcel};
pub use transport::{
    HttpResponse, ReqwestTransport, Retry, RetryPolicy, Transport, TransportConfig,
    geocoder_transport, zoning_transport,
};
