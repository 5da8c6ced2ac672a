//! Record sources polled for the current set of documented APIs
//!
//! Two sources are supported: a Kubernetes ConfigMap read through the API
//! server, and a local directory of record files (which is also what a
//! ConfigMap looks like when mounted as a volume). In both cases every entry
//! is one JSON-encoded [`ApiRecord`]; entries that fail to decode are logged
//! and skipped so one bad entry never hides the others.

use crate::core::record::ApiRecord;
use crate::core::service::{ConfigMapSourceConfig, ServiceError, SourceConfig};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Mount point of the pod's service-account credentials
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// A supplier of the full current set of API records
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// Load every record currently published by the source
    async fn load(&self) -> Result<Vec<ApiRecord>, ServiceError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Build the source selected by `config`
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn SpecSource>, ServiceError> {
    match config {
        SourceConfig::ConfigMap(cm) => Ok(Arc::new(ConfigMapSource::new(cm)?)),
        SourceConfig::Directory(dir) => Ok(Arc::new(DirectorySource::new(dir.clone()))),
    }
}

/// Encoding of a record entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFormat {
    Json,
    Yaml,
}

/// Decode one entry, logging and discarding it on failure
fn decode_entry(key: &str, raw: &str, format: EntryFormat) -> Option<ApiRecord> {
    debug!("Processing data key: {}", key);
    let decoded = match format {
        EntryFormat::Json => serde_json::from_str::<ApiRecord>(raw).map_err(|e| e.to_string()),
        EntryFormat::Yaml => serde_yaml::from_str::<ApiRecord>(raw).map_err(|e| e.to_string()),
    };

    match decoded {
        Ok(record) => {
            debug!(
                "Decoded API info for key '{}': name='{}', url='{}'",
                key, record.name, record.url
            );
            Some(record)
        }
        Err(e) => {
            error!(
                "Failed to unmarshal API info for key '{}': {}. Raw data: {}",
                key, e, raw
            );
            None
        }
    }
}

/// Minimal view of a ConfigMap object
#[derive(Debug, Deserialize)]
struct ConfigMapObject {
    #[serde(default)]
    data: BTreeMap<String, String>,
}

/// Where the API server lives and how to authenticate against it
#[derive(Debug, Default)]
struct ClusterAccess {
    api_url: String,
    token: Option<String>,
    token_file: Option<PathBuf>,
    ca_pem: Option<Vec<u8>>,
    insecure: bool,
}

/// Reads records from a ConfigMap through the Kubernetes API server
pub struct ConfigMapSource {
    client: reqwest::Client,
    api_url: String,
    namespace: String,
    name: String,
    token: Option<String>,
    token_file: Option<PathBuf>,
}

impl ConfigMapSource {
    /// Create a ConfigMap source.
    ///
    /// Without an explicit API URL the in-cluster environment is used: the
    /// `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT` variables plus the
    /// service-account token and CA bundle. Outside a cluster the current
    /// context of the kubeconfig is used instead.
    pub fn new(config: &ConfigMapSourceConfig) -> Result<Self, ServiceError> {
        if let Some(url) = &config.api_url {
            let access = ClusterAccess {
                api_url: url.trim_end_matches('/').to_string(),
                token_file: config.token_file.clone(),
                ca_pem: read_optional_ca(config.ca_file.as_deref())?,
                ..ClusterAccess::default()
            };
            return Self::with_access(config, access);
        }

        if let Some(access) = in_cluster_access(config)? {
            return Self::with_access(config, access);
        }

        let path = config
            .kubeconfig
            .clone()
            .or_else(default_kubeconfig_path)
            .ok_or_else(|| {
                ServiceError::Config(
                    "Not running in a cluster and no kubeconfig found; pass an API server URL"
                        .to_string(),
                )
            })?;
        warn!(
            "Not running in a cluster, using kubeconfig {}",
            path.display()
        );
        Self::from_kubeconfig(config, &path)
    }

    /// Create a ConfigMap source from the current context of a kubeconfig file.
    ///
    /// An explicit token file or CA bundle in `config` overrides the kubeconfig's own.
    pub fn from_kubeconfig(
        config: &ConfigMapSourceConfig,
        path: &Path,
    ) -> Result<Self, ServiceError> {
        let access = kubeconfig_access(path, config)?;
        Self::with_access(config, access)
    }

    fn with_access(
        config: &ConfigMapSourceConfig,
        access: ClusterAccess,
    ) -> Result<Self, ServiceError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(30));
        if let Some(pem) = &access.ca_pem {
            let certificate = reqwest::Certificate::from_pem(pem)
                .map_err(|e| ServiceError::Config(format!("Invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }
        if access.insecure {
            warn!("TLS verification of {} is disabled", access.api_url);
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| ServiceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: access.api_url,
            namespace: config.namespace.clone(),
            name: config.name.clone(),
            token: access.token,
            token_file: access.token_file,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v1/namespaces/{}/configmaps/{}",
            self.api_url, self.namespace, self.name
        )
    }

    /// Token files are re-read on every poll since projected tokens rotate.
    async fn bearer_token(&self) -> Result<Option<String>, ServiceError> {
        match (&self.token_file, &self.token) {
            (Some(path), _) => {
                let token = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ServiceError::Source(format!(
                        "Failed to read token file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(Some(token.trim().to_string()))
            }
            (None, token) => Ok(token.clone()),
        }
    }
}

fn read_optional_ca(path: Option<&Path>) -> Result<Option<Vec<u8>>, ServiceError> {
    path.map(|path| {
        std::fs::read(path).map_err(|e| {
            ServiceError::Config(format!(
                "Failed to read CA bundle {}: {}",
                path.display(),
                e
            ))
        })
    })
    .transpose()
}

/// Access through the pod's service account, or `None` outside a cluster
fn in_cluster_access(
    config: &ConfigMapSourceConfig,
) -> Result<Option<ClusterAccess>, ServiceError> {
    let host = match std::env::var("KUBERNETES_SERVICE_HOST") {
        Ok(host) if !host.is_empty() => host,
        _ => return Ok(None),
    };
    let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

    let api_url = if host.contains(':') {
        format!("https://[{}]:{}", host, port)
    } else {
        format!("https://{}:{}", host, port)
    };

    let service_account = Path::new(SERVICE_ACCOUNT_DIR);
    let ca_file = config
        .ca_file
        .clone()
        .unwrap_or_else(|| service_account.join("ca.crt"));

    Ok(Some(ClusterAccess {
        api_url,
        token_file: Some(
            config
                .token_file
                .clone()
                .unwrap_or_else(|| service_account.join("token")),
        ),
        ca_pem: read_optional_ca(Some(ca_file.as_path()))?,
        ..ClusterAccess::default()
    }))
}

/// First entry of `$KUBECONFIG`, else `~/.kube/config`
fn default_kubeconfig_path() -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        if let Some(path) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Some(path);
        }
    }
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

/// The parts of a kubeconfig needed to reach a cluster with a bearer token
#[derive(Debug, Deserialize)]
struct Kubeconfig {
    #[serde(rename = "current-context", default)]
    current_context: String,
    #[serde(default)]
    clusters: Vec<Named<KubeCluster>>,
    #[serde(default)]
    contexts: Vec<Named<KubeContext>>,
    #[serde(default)]
    users: Vec<Named<KubeUser>>,
}

#[derive(Debug, Deserialize)]
struct Named<T> {
    name: String,
    #[serde(alias = "cluster", alias = "context", alias = "user")]
    item: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeCluster {
    server: String,
    certificate_authority: Option<PathBuf>,
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct KubeContext {
    cluster: String,
    #[serde(default)]
    user: String,
}

#[derive(Debug, Default, Deserialize)]
struct KubeUser {
    token: Option<String>,
    #[serde(rename = "tokenFile")]
    token_file: Option<PathBuf>,
    #[serde(rename = "client-certificate-data")]
    client_certificate_data: Option<String>,
    #[serde(rename = "client-certificate")]
    client_certificate: Option<PathBuf>,
}

fn find_named<'a, T>(entries: &'a [Named<T>], name: &str) -> Option<&'a T> {
    entries
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| &entry.item)
}

fn kubeconfig_access(
    path: &Path,
    config: &ConfigMapSourceConfig,
) -> Result<ClusterAccess, ServiceError> {
    let invalid = |reason: String| {
        ServiceError::Config(format!("Invalid kubeconfig {}: {}", path.display(), reason))
    };

    let raw = std::fs::read_to_string(path).map_err(|e| {
        ServiceError::Config(format!(
            "Failed to read kubeconfig {}: {}",
            path.display(),
            e
        ))
    })?;
    let kubeconfig: Kubeconfig = serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

    let context = find_named(&kubeconfig.contexts, &kubeconfig.current_context).ok_or_else(|| {
        invalid(format!(
            "current context '{}' not found",
            kubeconfig.current_context
        ))
    })?;
    let cluster = find_named(&kubeconfig.clusters, &context.cluster)
        .ok_or_else(|| invalid(format!("cluster '{}' not found", context.cluster)))?;
    let default_user = KubeUser::default();
    let user = find_named(&kubeconfig.users, &context.user).unwrap_or(&default_user);

    if user.client_certificate.is_some() || user.client_certificate_data.is_some() {
        warn!(
            "Client certificate authentication for user '{}' is not supported; only bearer tokens are sent",
            context.user
        );
    }

    // Relative paths in a kubeconfig are relative to the file itself
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let relative_to_file = |p: &PathBuf| base_dir.join(p);

    let ca_pem = match (&config.ca_file, &cluster.certificate_authority_data) {
        (Some(ca_file), _) => read_optional_ca(Some(ca_file.as_path()))?,
        (None, Some(data)) => Some(
            base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .map_err(|e| invalid(format!("bad certificate-authority-data: {}", e)))?,
        ),
        (None, None) => {
            let ca_file = cluster.certificate_authority.as_ref().map(relative_to_file);
            read_optional_ca(ca_file.as_deref())?
        }
    };

    let token_file = config
        .token_file
        .clone()
        .or_else(|| user.token_file.as_ref().map(relative_to_file));

    Ok(ClusterAccess {
        api_url: cluster.server.trim_end_matches('/').to_string(),
        token: user.token.clone(),
        token_file,
        ca_pem,
        insecure: cluster.insecure_skip_tls_verify,
    })
}

#[async_trait]
impl SpecSource for ConfigMapSource {
    async fn load(&self) -> Result<Vec<ApiRecord>, ServiceError> {
        info!(
            "Attempting to load ConfigMap '{}' from namespace '{}'",
            self.name, self.namespace
        );

        let mut request = self.client.get(self.endpoint());
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            ServiceError::Source(format!(
                "Failed to get ConfigMap '{}' in namespace '{}': {}",
                self.name, self.namespace, e
            ))
        })?;

        if !response.status().is_success() {
            return Err(ServiceError::Source(format!(
                "Failed to get ConfigMap '{}' in namespace '{}': HTTP {}",
                self.name,
                self.namespace,
                response.status()
            )));
        }

        let config_map: ConfigMapObject = response.json().await.map_err(|e| {
            ServiceError::Source(format!("Failed to parse ConfigMap '{}': {}", self.name, e))
        })?;

        if config_map.data.is_empty() {
            warn!("No data found in ConfigMap '{}'", self.name);
            return Ok(Vec::new());
        }

        Ok(config_map
            .data
            .iter()
            .filter_map(|(key, raw)| decode_entry(key, raw, EntryFormat::Json))
            .collect())
    }

    fn describe(&self) -> String {
        format!(
            "ConfigMap '{}' in namespace '{}'",
            self.name, self.namespace
        )
    }
}

/// Reads one record per file from a directory
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn format_for(path: &Path) -> EntryFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => EntryFormat::Yaml,
            _ => EntryFormat::Json,
        }
    }
}

#[async_trait]
impl SpecSource for DirectorySource {
    async fn load(&self) -> Result<Vec<ApiRecord>, ServiceError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            ServiceError::Source(format!(
                "Failed to read spec directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        // Mounted ConfigMaps keep their payload behind hidden `..data` links
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push((file_name, path)),
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        files.sort();

        let mut records = Vec::with_capacity(files.len());
        for (key, path) in files {
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => {
                    if let Some(record) = decode_entry(&key, &raw, Self::format_for(&path)) {
                        records.push(record);
                    }
                }
                Err(e) => error!("Failed to read {}: {}", path.display(), e),
            }
        }

        Ok(records)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}
