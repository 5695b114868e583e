use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{Error, Result};

/// A URL to check, with its hostname derived once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    url: String,
    hostname: String,
}

impl Endpoint {
    pub fn parse(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let parsed = Url::parse(&url).map_err(|source| Error::InvalidUrl {
            url: url.clone(),
            source,
        })?;

        // Bare IPv6 literal, without the brackets used inside URLs.
        let hostname = match parsed.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(Error::MissingHost(url)),
        };

        Ok(Self { url, hostname })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// One entry of the endpoint source file. Fields other than `url` are ignored.
#[derive(Debug, Deserialize)]
struct EndpointRecord {
    url: String,
}

/// Load endpoints from a JSON array of `{"url": ...}` objects.
pub fn load_endpoints(path: impl AsRef<Path>) -> Result<Vec<Endpoint>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_endpoints(&content).map_err(|e| match e {
        ParseError::Json(source) => Error::Json {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Endpoint(e) => e,
    })
}

#[derive(Debug)]
enum ParseError {
    Json(serde_json::Error),
    Endpoint(Error),
}

fn parse_endpoints(content: &str) -> std::result::Result<Vec<Endpoint>, ParseError> {
    let records: Vec<EndpointRecord> = serde_json::from_str(content).map_err(ParseError::Json)?;
    records
        .into_iter()
        .map(|record| Endpoint::parse(record.url).map_err(ParseError::Endpoint))
        .collect()
}

/// Hostnames of `endpoints` in input order, duplicates kept so results can be
/// zipped back onto the endpoints.
pub fn hostnames(endpoints: &[Endpoint]) -> Vec<String> {
    endpoints.iter().map(|e| e.hostname.clone()).collect()
}
