use crate::errors::ConfigurationError;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;
use url::{Host, Url};

/// Hostname used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 8080;
/// User name used when none is configured.
pub const DEFAULT_USER: &str = "admin";
/// Password used when none is configured.
pub const DEFAULT_PASSWORD: &str = "";
/// Path prefix under which the database instance is deployed.
pub const DEFAULT_PREFIX: &str = "exist";
/// Collection every query and resource path is scoped to when none is configured.
pub const DEFAULT_ROOT_COLLECTION: &str = "/db";

const REST_SEGMENT: &str = "rest";

type Result<T> = std::result::Result<T, ConfigurationError>;

/// Transport scheme of the REST interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// Port assumed when a URL names the scheme but no port.
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What deleting a document that does not exist amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// A missing document fails with [`ResourceError::NotFound`].
    ///
    /// [`ResourceError::NotFound`]: crate::ResourceError::NotFound
    #[default]
    Strict,
    /// A missing document is silently accepted.
    Lenient,
}

/// Connection parameters of one database instance, scoped to a root collection.
///
/// Values are validated by [`ConfigBuilder::build`], so a `Config` is always usable for building URLs.
///
/// # Examples
///
/// ```
/// # use existdb::Config;
/// let config = Config::default();
/// assert_eq!("http://localhost:8080/exist/rest", config.base_url());
/// assert_eq!("http://localhost:8080/exist/rest/db", config.root_collection_url());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    scheme: Scheme,
    host: String,
    port: u16,
    user: String,
    password: String,
    prefix: String,
    root_collection: String,
    timeout: Option<Duration>,
    delete_policy: DeletePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: Scheme::default(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_owned(),
            password: DEFAULT_PASSWORD.to_owned(),
            prefix: DEFAULT_PREFIX.to_owned(),
            root_collection: DEFAULT_ROOT_COLLECTION.to_owned(),
            timeout: None,
            delete_policy: DeletePolicy::default(),
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("prefix", &self.prefix)
            .field("root_collection", &self.root_collection)
            .field("timeout", &self.timeout)
            .field("delete_policy", &self.delete_policy)
            .finish()
    }
}

impl Config {
    /// Starts from the defaults and lets individual parameters be overridden.
    ///
    /// # Examples
    ///
    /// ```
    /// # use existdb::{Config, ConfigurationError};
    /// # fn main() -> Result<(), ConfigurationError> {
    /// let config = Config::builder()
    ///     .https(true)
    ///     .host("example.org")
    ///     .port(443)
    ///     .root_collection("/db/manifests")
    ///     .build()?;
    /// assert_eq!("https://example.org:443/exist/rest/db/manifests", config.root_collection_url());
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reads the parameters from an URL of the form
    /// `existdb[+http|+https]://[<user>[:<password>]@]<host>[:<port>][/<prefix>]`.
    ///
    /// The bare `existdb` scheme means `https`. Omitted ports default to `80` or `443` depending on the scheme and
    /// omitted credentials are empty. The whole URL path is taken as the instance prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// # use existdb::{Config, ConfigurationError, Scheme};
    /// # fn main() -> Result<(), ConfigurationError> {
    /// let config = Config::from_url("existdb+http://admin:@localhost:8080/exist")?;
    /// assert_eq!(Scheme::Http, config.scheme());
    /// assert_eq!("http://localhost:8080/exist/rest", config.base_url());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_url(source: &str) -> Result<Self> {
        let url = Url::parse(source).map_err(|e| ConfigurationError::InvalidUrl {
            url: source.to_owned(),
            reason: e.to_string(),
        })?;

        let scheme = match url.scheme() {
            "existdb" | "existdb+https" => Scheme::Https,
            "existdb+http" => Scheme::Http,
            other => {
                return Err(ConfigurationError::UnsupportedScheme {
                    scheme: other.to_owned(),
                })
            }
        };
        let host = url.host_str().ok_or_else(|| ConfigurationError::InvalidUrl {
            url: source.to_owned(),
            reason: "missing host".to_owned(),
        })?;

        Config::builder()
            .scheme(scheme)
            .host(host)
            .port(url.port().unwrap_or_else(|| scheme.default_port()))
            .user(url.username())
            .password(url.password().unwrap_or_default())
            .prefix(url.path())
            .build()
    }

    /// The transport scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The database hostname.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The database port number.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The user name sent with every request.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The password sent with every request.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The path prefix of the instance, without surrounding slashes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The collection used as root for all queries and document paths. Always starts with `/`.
    pub fn root_collection(&self) -> &str {
        &self.root_collection
    }

    /// Per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Behaviour of deleting documents that are already gone.
    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Changes the root collection. Already resolved resources keep their paths.
    pub fn set_root_collection(&mut self, path: &str) -> Result<()> {
        self.root_collection = normalize_root_collection(path)?;
        Ok(())
    }

    /// The URL of the REST interface: scheme, host, port, prefix and the fixed `rest` segment.
    pub fn base_url(&self) -> String {
        match self.prefix.is_empty() {
            true => format!("{}://{}:{}/{}", self.scheme, self.host, self.port, REST_SEGMENT),
            false => format!(
                "{}://{}:{}/{}/{}",
                self.scheme, self.host, self.port, self.prefix, REST_SEGMENT
            ),
        }
    }

    /// The URL pointing to the configured root collection.
    pub fn root_collection_url(&self) -> String {
        match self.root_collection.as_str() {
            "/" => self.base_url(),
            root => format!("{}{}", self.base_url(), root),
        }
    }

    /// Builds the URL of an absolute database path, percent-encoding each segment.
    pub(crate) fn url_for(&self, absolute_path: &str) -> Result<Url> {
        let base_url = self.base_url();
        let invalid = |reason: &str| ConfigurationError::InvalidUrl {
            url: base_url.clone(),
            reason: reason.to_owned(),
        };
        let mut url = Url::parse(&base_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base"))?
            .pop_if_empty()
            .extend(absolute_path.split('/').filter(|s| !s.is_empty()));

        Ok(url)
    }
}

/// Builds a validated [`Config`]. Every parameter not set keeps its default.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the transport scheme.
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    /// Selects `https` when `true`, `http` otherwise.
    pub fn https(self, enabled: bool) -> Self {
        self.scheme(if enabled { Scheme::Https } else { Scheme::Http })
    }

    /// Sets the hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the user name.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Sets the instance path prefix. Surrounding slashes are ignored; an empty prefix is allowed.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Sets the root collection. It must start with `/`.
    pub fn root_collection(mut self, path: impl Into<String>) -> Self {
        self.config.root_collection = path.into();
        self
    }

    /// Aborts every HTTP exchange that takes longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Sets how deleting a missing document is treated.
    pub fn delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.config.delete_policy = policy;
        self
    }

    /// Validates and normalizes the parameters.
    pub fn build(self) -> Result<Config> {
        let mut config = self.config;

        let host = Host::parse(&config.host).map_err(|e| ConfigurationError::InvalidHost {
            host: config.host.clone(),
            reason: e.to_string(),
        })?;
        config.host = host.to_string();

        if config.port == 0 {
            return Err(ConfigurationError::InvalidPort { port: config.port });
        }

        config.prefix = normalize_prefix(&config.prefix)?;
        config.root_collection = normalize_root_collection(&config.root_collection)?;

        Ok(config)
    }
}

fn normalize_prefix(prefix: &str) -> Result<String> {
    let trimmed = prefix.trim_matches('/');
    let forbidden = |c: char| c.is_whitespace() || matches!(c, '?' | '#' | '@' | ':');

    if trimmed.contains(forbidden) || trimmed.split('/').any(|s| s.is_empty() && !trimmed.is_empty()) {
        return Err(ConfigurationError::InvalidPrefix {
            prefix: prefix.to_owned(),
        });
    }

    Ok(trimmed.to_owned())
}

fn normalize_root_collection(path: &str) -> Result<String> {
    let invalid = || ConfigurationError::InvalidRootCollection { path: path.to_owned() };

    if !path.starts_with('/') {
        return Err(invalid());
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(invalid());
    }

    Ok(format!("/{}", segments.join("/")))
}
