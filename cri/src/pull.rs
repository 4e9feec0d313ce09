//! Registry mirror and credential resolution for image pulls.
//!
//! Hosts configured under `[registry.mirrors]` expand into scheme-qualified
//! endpoint lists, and pull credentials come from the request or from the
//! per-registry config, scoped to the endpoint being tried.

use berth_core::{BerthConfig, BerthError, RegistryConfig, Result, KEY_MODEL_NODE};
use berth_oci::{RegistryCredentials, UnpackOpt};
use url::Url;

use crate::api::{AuthConfig, PodSandboxConfig};
use crate::labels::RUNTIME_HANDLER_ANNOTATION;

/// Canonical endpoint host for the Docker Hub registry alias.
const DOCKER_HUB_HOST: &str = "registry-1.docker.io";

/// Returns the host portion of an authority, with any port and any IPv6
/// brackets removed.
fn host_without_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
        return host;
    }
    match host.rfind(':') {
        // A second colon means a bare IPv6 literal, not a port separator.
        Some(idx) if !host[..idx].contains(':') => &host[..idx],
        _ => host,
    }
}

/// Picks the scheme used for endpoints that do not carry one: plain HTTP for
/// loopback hosts, HTTPS everywhere else.
pub fn default_scheme(host: &str) -> &'static str {
    match host_without_port(host) {
        "localhost" | "127.0.0.1" | "::1" => "http",
        _ => "https",
    }
}

/// Maps registry aliases to the host actually serving the registry API.
fn default_host(host: &str) -> &str {
    if host == "docker.io" {
        DOCKER_HUB_HOST
    } else {
        host
    }
}

/// The `host[:port]` authority of a parsed URL.
pub(crate) fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Qualifies a mirror endpoint with a scheme if it lacks one, keeping any
/// path the entry carries; already qualified entries pass through untouched.
fn add_default_scheme(endpoint: &str) -> Result<String> {
    if endpoint.contains("://") {
        return Ok(endpoint.to_string());
    }
    let probe = Url::parse(&format!("dummy://{endpoint}")).map_err(|err| {
        BerthError::MalformedEndpoint {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    })?;
    if probe.host_str().map_or(true, str::is_empty) {
        return Err(BerthError::MalformedEndpoint {
            endpoint: endpoint.to_string(),
            message: "missing host".to_string(),
        });
    }
    Ok(format!("{}://{}", default_scheme(&authority(&probe)), endpoint))
}

/// Resolves the ordered endpoint list to try when pulling from `host`.
///
/// Mirrors configured for the host take precedence over the `"*"` wildcard
/// entry. The registry's own endpoint is appended last unless one of the
/// mirrors already points at it.
pub fn registry_endpoints(registry: &RegistryConfig, host: &str) -> Result<Vec<String>> {
    let mirror = registry
        .mirrors
        .get(host)
        .or_else(|| registry.mirrors.get("*"));
    let configured = mirror.map(|m| m.endpoints.as_slice()).unwrap_or_default();

    let mut endpoints = Vec::with_capacity(configured.len() + 1);
    for endpoint in configured {
        endpoints.push(add_default_scheme(endpoint)?);
    }

    for endpoint in &endpoints {
        let url = Url::parse(endpoint).map_err(|err| BerthError::MalformedEndpoint {
            endpoint: endpoint.clone(),
            message: err.to_string(),
        })?;
        if authority(&url) == host {
            // The mirror list already covers the registry itself.
            return Ok(endpoints);
        }
    }

    let fallback = default_host(host);
    endpoints.push(format!("{}://{}", default_scheme(fallback), fallback));
    Ok(endpoints)
}

/// The authority a credential's server address scopes it to.
fn server_authority(address: &str) -> Result<String> {
    let parsed = if address.contains("://") {
        Url::parse(address)
    } else {
        Url::parse(&format!("dummy://{address}"))
    };
    let url = parsed.map_err(|err| {
        BerthError::InvalidAuth(format!("server address {address:?}: {err}"))
    })?;
    Ok(authority(&url))
}

/// Extracts the credentials to present to `host` from a CRI auth config.
///
/// Credentials carrying a server address apply only to that authority; a
/// mismatch yields anonymous access rather than an error. An identity token
/// wins over an encoded auth blob, which wins over a username and password.
pub fn parse_auth(auth: Option<&AuthConfig>, host: &str) -> Result<RegistryCredentials> {
    let auth = match auth {
        Some(auth) => auth,
        None => return Ok(RegistryCredentials::anonymous()),
    };
    if !auth.server_address.is_empty() && server_authority(&auth.server_address)? != host {
        return Ok(RegistryCredentials::anonymous());
    }
    if !auth.identity_token.is_empty() {
        return Ok(RegistryCredentials::basic("", &auth.identity_token));
    }
    if !auth.auth.is_empty() {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&auth.auth)
            .map_err(|err| BerthError::InvalidAuth(format!("decode auth blob: {err}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|err| BerthError::InvalidAuth(format!("decode auth blob: {err}")))?;
        let (username, secret) = decoded.split_once(':').ok_or_else(|| {
            BerthError::InvalidAuth(format!("invalid decoded auth {decoded:?}"))
        })?;
        return Ok(RegistryCredentials::basic(
            username,
            secret.trim_end_matches('\0'),
        ));
    }
    if !auth.username.is_empty() {
        return Ok(RegistryCredentials::basic(&auth.username, &auth.password));
    }
    Ok(RegistryCredentials::anonymous())
}

/// Resolves the credentials for one endpoint: auth supplied on the request
/// wins, otherwise the `[registry.configs]` entry for the endpoint host is
/// consulted. Config keys may carry an explicit scheme prefix.
pub fn resolve_credentials(
    registry: &RegistryConfig,
    endpoint_host: &str,
    request_auth: Option<&AuthConfig>,
) -> Result<RegistryCredentials> {
    if request_auth.is_some() {
        return parse_auth(request_auth, endpoint_host);
    }
    let entry = registry
        .configs
        .get(endpoint_host)
        .or_else(|| registry.configs.get(&format!("https://{endpoint_host}")))
        .or_else(|| registry.configs.get(&format!("http://{endpoint_host}")));
    let auth = match entry.and_then(|config| config.auth.as_ref()) {
        Some(auth) => auth,
        None => return Ok(RegistryCredentials::anonymous()),
    };
    let config_auth = AuthConfig {
        username: auth.username.clone(),
        password: auth.password.clone(),
        auth: auth.auth.clone(),
        identity_token: auth.identity_token.clone(),
        ..Default::default()
    };
    parse_auth(Some(&config_auth), endpoint_host)
}

/// Unpack options implied by the image decryption configuration.
pub fn encrypted_images_pull_opts(config: &BerthConfig) -> Vec<UnpackOpt> {
    if config.image_decryption.key_model == KEY_MODEL_NODE {
        vec![UnpackOpt::Decrypt]
    } else {
        Vec::new()
    }
}

/// Picks the snapshotter for a pull, honoring a runtime handler annotation on
/// the pod sandbox when one is present.
pub fn snapshotter_from_sandbox_config(
    config: &BerthConfig,
    image_ref: &str,
    sandbox_config: Option<&PodSandboxConfig>,
) -> Result<String> {
    let sandbox_config = match sandbox_config {
        Some(sandbox_config) => sandbox_config,
        None => return Ok(config.snapshotter.clone()),
    };
    let handler = match sandbox_config.annotations.get(RUNTIME_HANDLER_ANNOTATION) {
        Some(handler) => handler,
        None => return Ok(config.snapshotter.clone()),
    };
    let runtime = config
        .runtimes
        .get(handler)
        .ok_or_else(|| BerthError::RuntimeNotFound(handler.clone()))?;
    if runtime.snapshotter.is_empty() {
        return Ok(config.snapshotter.clone());
    }
    tracing::info!(
        image = %image_ref,
        handler = %handler,
        snapshotter = %runtime.snapshotter,
        "Using runtime handler snapshotter for image pull"
    );
    Ok(runtime.snapshotter.clone())
}
