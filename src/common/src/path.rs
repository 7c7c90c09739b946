//! Parsing of the metadata service connection path.
//!
//! The path is a comma separated list of `host:port` endpoints, optionally
//! prefixed with `cluster://` and followed by a query string:
//!
//! ```text
//! cluster://10.0.0.1:2379,10.0.0.2:2379?disable_gc=true&keyspace_name=tenant_7
//! ```

use url::form_urlencoded;

/// Scheme accepted in front of the endpoint list.
pub const CLUSTER_SCHEME: &str = "cluster";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("unsupported scheme '{0}', expected '{CLUSTER_SCHEME}'")]
    UnsupportedScheme(String),
    #[error("connection path has no endpoints")]
    NoEndpoints,
    #[error("invalid endpoint '{0}', expected host:port")]
    InvalidEndpoint(String),
    #[error("invalid value '{0}' for disable_gc, expected true or false")]
    InvalidDisableGc(String),
}

/// A parsed connection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPath {
    pub endpoints: Vec<String>,
    pub disable_gc: bool,
    pub keyspace_name: Option<String>,
}

pub fn parse_path(path: &str) -> Result<ConnectionPath, PathError> {
    let path = path.trim();
    let rest = match path.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(CLUSTER_SCHEME) => rest,
        Some((scheme, _)) => return Err(PathError::UnsupportedScheme(scheme.to_string())),
        None => path,
    };

    let (authority, query) = match rest.split_once('?') {
        Some((authority, query)) => (authority, query),
        None => (rest, ""),
    };
    // A trailing path segment carries no meaning for the endpoint list.
    let authority = authority.split('/').next().unwrap_or_default();

    let endpoints = authority
        .split(',')
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .map(|endpoint| validate_endpoint(endpoint).map(|()| endpoint.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    if endpoints.is_empty() {
        return Err(PathError::NoEndpoints);
    }

    let mut disable_gc = false;
    let mut keyspace_name = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "disable_gc" => {
                disable_gc = match value.to_lowercase().as_str() {
                    "true" => true,
                    "false" | "" => false,
                    _ => return Err(PathError::InvalidDisableGc(value.into_owned())),
                }
            }
            "keyspace_name" => keyspace_name = Some(value.into_owned()),
            other => log::debug!("Ignoring unknown connection path parameter '{other}'"),
        }
    }

    Ok(ConnectionPath {
        endpoints,
        disable_gc,
        keyspace_name,
    })
}

fn validate_endpoint(endpoint: &str) -> Result<(), PathError> {
    let invalid = || PathError::InvalidEndpoint(endpoint.to_string());
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(())
}
