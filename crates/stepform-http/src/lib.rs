//! # stepform-http
//!
//! HTTP-facing seams for stepform: the location/query codec used for
//! deep-linking into form steps, and the [`Transport`] trait through which
//! forms talk to their widget-definition and validation endpoints.

pub mod location;
pub mod querydict;
pub mod transport;

pub use location::Location;
pub use querydict::{encode_query, parse_query, QueryDict, QueryMap};
pub use transport::{api_url, ApiTransport, Method, Transport, TransportError};
