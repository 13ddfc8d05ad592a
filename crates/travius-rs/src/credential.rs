//! Per-request API credential resolution.
//!
//! Every upstream call is made with a [`Credential`] resolved for that single
//! request. Nothing here caches a key or shares one across organizations.
//! Three strategies implement [`CredentialResolver`]:
//!
//! - [`StaticResolver`]: one key from configuration (`OPENAI_API_KEY`).
//! - [`DirectoryResolver`]: looks the organization up in an internal
//!   directory service over HTTP.
//! - [`RequestResolver`]: the caller supplies the key in the request body.
//!
//! Which one runs is decided by [`CredentialSource`], chosen at startup.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Minimum trimmed key length accepted as "present and well-formed".
///
/// This is a sanity check against blank or truncated values, not a format
/// validation of any provider's key scheme.
pub const MIN_KEY_LEN: usize = 20;

/// Number of leading characters shown by [`Credential::prefix`].
const PREFIX_LEN: usize = 7;

// ── Credential ─────────────────────────────────────────────────────

/// An opaque upstream API key.
///
/// `Debug` never prints the value. Use [`prefix`](Self::prefix) for
/// diagnostics and [`expose`](Self::expose) only when building the
/// `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// Apply the minimum-length sanity check.
    pub fn validated(self) -> Result<Self, CredentialError> {
        if self.0.chars().count() < MIN_KEY_LEN {
            Err(CredentialError::NotRegistered)
        } else {
            Ok(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw key. Only the HTTP client should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short, non-reversible rendering for logs: the first few characters
    /// followed by `...`.
    pub fn prefix(&self) -> String {
        let head: String = self.0.chars().take(PREFIX_LEN).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.prefix())
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Why a credential could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("orgId is required")]
    MissingOrgId,

    #[error("organization not found: {0}")]
    OrgNotFound(String),

    #[error("API key is missing or invalid for this organization")]
    NotRegistered,

    #[error("credential configuration missing: {0}")]
    Config(String),

    #[error("credential lookup failed: {0}")]
    Lookup(String),
}

impl CredentialError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CredentialError::MissingOrgId => "MISSING_FIELD",
            CredentialError::OrgNotFound(_) => "ORG_NOT_FOUND",
            CredentialError::NotRegistered => "ORG_API_KEY_NOT_REGISTERED",
            CredentialError::Config(_) => "CREDENTIAL_CONFIG_MISSING",
            CredentialError::Lookup(_) => "CREDENTIAL_LOOKUP_FAILED",
        }
    }

    /// HTTP status class for this failure.
    pub fn status(&self) -> u16 {
        match self {
            CredentialError::MissingOrgId => 400,
            CredentialError::OrgNotFound(_) => 404,
            CredentialError::NotRegistered => 403,
            CredentialError::Config(_) => 500,
            CredentialError::Lookup(_) => 502,
        }
    }
}

// ── Resolver trait ─────────────────────────────────────────────────

/// Boxed future returned by [`CredentialResolver::resolve`].
pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Credential, CredentialError>> + Send + 'a>>;

/// Resolves the credential for one request.
///
/// Uses a boxed future so the trait stays dyn-compatible and the server can
/// hold an `Arc<dyn CredentialResolver>` picked at startup.
pub trait CredentialResolver: Send + Sync {
    /// Resolve a key for `org_id`, or from `supplied` for strategies that
    /// accept a caller-provided key.
    fn resolve<'a>(&'a self, org_id: Option<&'a str>, supplied: Option<&'a str>)
    -> ResolveFuture<'a>;

    /// The strategy this resolver implements.
    fn source(&self) -> CredentialSource;
}

/// Which [`CredentialResolver`] strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CredentialSource {
    /// A single key from configuration.
    #[default]
    Env,
    /// Per-organization lookup in the directory service.
    Directory,
    /// Key supplied in the request body.
    Request,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env => write!(f, "env"),
            CredentialSource::Directory => write!(f, "directory"),
            CredentialSource::Request => write!(f, "request"),
        }
    }
}

/// Inputs for [`build_resolver`]. Values that a strategy does not need may
/// be left `None`.
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    pub api_key: Option<String>,
    pub directory_url: Option<String>,
    pub directory_token: Option<String>,
}

/// Build the resolver for `source`.
///
/// Missing settings are not an error here. They surface as
/// [`CredentialError::Config`] on the request that needs them, so a
/// misconfigured deployment still starts and answers with a clear code.
pub fn build_resolver(
    source: CredentialSource,
    settings: ResolverSettings,
) -> Arc<dyn CredentialResolver> {
    match source {
        CredentialSource::Env => Arc::new(StaticResolver::new(settings.api_key)),
        CredentialSource::Directory => Arc::new(DirectoryResolver::new(
            settings.directory_url,
            settings.directory_token,
        )),
        CredentialSource::Request => Arc::new(RequestResolver),
    }
}

// ── Static ─────────────────────────────────────────────────────────

/// Serves one configured key to every organization.
#[derive(Clone)]
pub struct StaticResolver {
    key: Option<String>,
}

impl StaticResolver {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl CredentialResolver for StaticResolver {
    fn resolve<'a>(
        &'a self,
        _org_id: Option<&'a str>,
        _supplied: Option<&'a str>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let key = self
                .key
                .as_deref()
                .ok_or_else(|| CredentialError::Config("OPENAI_API_KEY is not set".into()))?;
            Credential::new(key).validated()
        })
    }

    fn source(&self) -> CredentialSource {
        CredentialSource::Env
    }
}

// ── Request-supplied ───────────────────────────────────────────────

/// Uses the key the caller put in the request body.
#[derive(Clone, Copy, Default)]
pub struct RequestResolver;

impl CredentialResolver for RequestResolver {
    fn resolve<'a>(
        &'a self,
        _org_id: Option<&'a str>,
        supplied: Option<&'a str>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let key = supplied.ok_or(CredentialError::NotRegistered)?;
            Credential::new(key).validated()
        })
    }

    fn source(&self) -> CredentialSource {
        CredentialSource::Request
    }
}

// ── Directory service ──────────────────────────────────────────────

/// Record returned by `GET {directory}/orgs/{orgId}/credential`.
#[derive(Deserialize, Debug)]
struct DirectoryRecord {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

/// Looks organizations up in the internal directory service.
///
/// | Directory answer | Result |
/// |---|---|
/// | 200 with a usable `apiKey` | the credential |
/// | 200 with a missing, empty, or short `apiKey` | [`CredentialError::NotRegistered`] |
/// | 404 | [`CredentialError::OrgNotFound`] |
/// | anything else, or no answer | [`CredentialError::Lookup`] |
pub struct DirectoryResolver {
    client: reqwest::Client,
    base_url: Option<String>,
    token: Option<String>,
}

impl DirectoryResolver {
    pub fn new(base_url: Option<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.filter(|u| !u.trim().is_empty()),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn lookup_url(&self, org_id: &str) -> Result<reqwest::Url, CredentialError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| CredentialError::Config("DIRECTORY_URL is not set".into()))?;
        let mut url = reqwest::Url::parse(base)
            .map_err(|e| CredentialError::Config(format!("DIRECTORY_URL is invalid: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CredentialError::Config("DIRECTORY_URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["orgs", org_id, "credential"]);
        Ok(url)
    }
}

impl CredentialResolver for DirectoryResolver {
    fn resolve<'a>(
        &'a self,
        org_id: Option<&'a str>,
        _supplied: Option<&'a str>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let org_id = org_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or(CredentialError::MissingOrgId)?;
            let url = self.lookup_url(org_id)?;
            let token = self
                .token
                .as_deref()
                .ok_or_else(|| CredentialError::Config("DIRECTORY_TOKEN is not set".into()))?;

            debug!("Directory lookup for org {org_id}");
            let resp = self
                .client
                .get(url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| CredentialError::Lookup(format!("request failed: {e}")))?;

            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(CredentialError::OrgNotFound(org_id.to_string()));
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!("Directory lookup for org {org_id} returned HTTP {status}: {body}");
                return Err(CredentialError::Lookup(format!("HTTP {status}")));
            }

            let record: DirectoryRecord = resp
                .json()
                .await
                .map_err(|e| CredentialError::Lookup(format!("unreadable record: {e}")))?;
            let credential = Credential::new(record.api_key.unwrap_or_default()).validated()?;
            debug!("Resolved credential {} for org {org_id}", credential.prefix());
            Ok(credential)
        })
    }

    fn source(&self) -> CredentialSource {
        CredentialSource::Directory
    }
}
