//! Registry module: endpoints and image reference helpers
//!
//! The copy tool does all registry traffic. This module only describes the
//! two sides of a transfer (transport prefix, TLS verification, credentials)
//! and performs the string manipulation needed to build references.

pub mod auth;
pub mod client;

pub use auth::{AuthFile, Credentials};
pub use client::{SkopeoClient, SkopeoClientBuilder};

/// Default registry when a reference has no host component
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// One side of a copy as the tool sees it
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Transport prefix such as `docker://`
    pub transport: String,
    pub tls_verify: bool,
    pub credentials: Option<Credentials>,
}

impl Endpoint {
    pub fn new(transport: impl Into<String>, tls_verify: bool) -> Self {
        Self {
            transport: transport.into(),
            tls_verify,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Prefix a bare reference with this endpoint's transport
    pub fn locate(&self, reference: &str) -> String {
        if reference.starts_with(&self.transport) {
            reference.to_string()
        } else {
            format!("{}{}", self.transport, reference)
        }
    }
}

/// Registry host of a reference, `docker.io` when none is present
pub fn registry_host(reference: &str) -> String {
    let reference = strip_transport(reference);
    match reference.split_once('/') {
        Some((first, _)) if looks_like_host(first) => first.to_string(),
        _ => DEFAULT_REGISTRY.to_string(),
    }
}

fn looks_like_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn strip_transport(reference: &str) -> &str {
    match reference.find("://") {
        Some(pos) => &reference[pos + 3..],
        None => reference,
    }
}

/// Split `repo[:tag][@digest]` into repository and tag.
///
/// Only a `:` after the last `/` separates a tag, so registry ports survive.
pub fn split_tag(reference: &str) -> (&str, Option<&str>) {
    let reference = match reference.split_once('@') {
        Some((name, _digest)) => name,
        None => reference,
    };
    let name_start = reference.rfind('/').map(|p| p + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(pos) => {
            let colon = name_start + pos;
            (&reference[..colon], Some(&reference[colon + 1..]))
        }
        None => (reference, None),
    }
}

/// Replace (or add) the tag of a reference
pub fn with_tag(reference: &str, tag: &str) -> String {
    let (repository, _) = split_tag(reference);
    format!("{}:{}", repository, tag)
}

/// Join a destination namespace with an image name
pub fn join_namespace(namespace: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if namespace.is_empty() || namespace.ends_with('/') {
        format!("{}{}", namespace, name)
    } else {
        format!("{}/{}", namespace, name)
    }
}
