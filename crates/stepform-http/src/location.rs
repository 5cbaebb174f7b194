//! The page location a form lives on.
//!
//! Forms read the current location to pre-fill fields when a user deep-links
//! into a step, and write a location string into every request so the server
//! can build links back to the exact step.

use url::Url;

use stepform_core::{StepformError, StepformResult};

use crate::querydict::{encode_query, parse_query, QueryMap};

/// A parsed page location.
///
/// # Examples
///
/// ```
/// use stepform_http::Location;
///
/// let loc = Location::parse("https://example.com/signup?step=2&tags[]=a&tags[]=b#top").unwrap();
/// assert_eq!(loc.origin(), "https://example.com");
/// assert_eq!(loc.pathname(), "/signup");
/// assert_eq!(loc.query().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    href: String,
    origin: String,
    pathname: String,
    query: QueryMap,
    hash: QueryMap,
}

impl Location {
    /// Parses an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::ImproperlyConfigured`] if `href` is not an
    /// absolute URL.
    pub fn parse(href: &str) -> StepformResult<Self> {
        let url = Url::parse(href).map_err(|e| {
            StepformError::ImproperlyConfigured(format!("Invalid location '{href}': {e}"))
        })?;

        Ok(Self {
            href: url.to_string(),
            origin: url.origin().ascii_serialization(),
            pathname: url.path().to_string(),
            query: parse_query(url.query().unwrap_or(""), false),
            hash: parse_query(url.fragment().unwrap_or(""), false),
        })
    }

    /// Returns the full URL.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Returns the scheme, host, and port.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the path component.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Returns the decoded query, including empty parameters.
    pub const fn query(&self) -> &QueryMap {
        &self.query
    }

    /// Returns the decoded query without empty parameters.
    pub fn non_empty_query(&self) -> QueryMap {
        self.query
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns the decoded fragment, parsed with the query rules.
    pub const fn hash(&self) -> &QueryMap {
        &self.hash
    }

    /// Builds `origin + pathname + "?" + query` for the given query.
    pub fn with_query(&self, query: &QueryMap) -> String {
        format!("{}{}?{}", self.origin, self.pathname, encode_query(query))
    }
}
