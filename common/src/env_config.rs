use std::{env, str::FromStr, sync::Arc, time::Duration};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Built once at startup and shared through `web::Data<Arc<Config>>`.
/// It holds the database connection and pool settings, JWT configuration,
/// server host and port, CORS and logging preferences, blob storage
/// locations and the OTP delivery mode.
pub struct Config {
    // development or production
    pub environment: String,
    /// Name shown on the root route.
    pub project_name: String,
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Connection pool and retry settings.
    pub db: DbConfig,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS. `*` allows any origin.
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// File the logger appends to.
    pub log_file: String,
    /// Where uploaded blobs live and how they are addressed publicly.
    pub storage: StorageConfig,
    /// One-time passcode settings.
    pub otp: OtpConfig,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to sign JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Upper bound of pooled connections.
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// How many times a transient database error is retried.
    pub retry_max: u32,
    /// Base delay before the first retry.
    pub retry_backoff: Duration,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Directory that contains the uploads directory.
    pub root_dir: String,
    /// Name of the uploads directory, also the public path prefix.
    pub uploads_dir: String,
    /// Public base URL blobs are served from, without trailing slash.
    pub base_url: String,
    /// Maximum accepted size of a single uploaded file in bytes.
    pub max_file_size: usize,
}

#[derive(Clone, Debug)]
pub struct OtpConfig {
    /// When false every OTP is `static_code`.
    pub live: bool,
    pub static_code: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            project_name: "Vehicle Marketplace".to_string(),
            database_url: String::new(),
            db: DbConfig::default(),
            jwt_config: JwtConfig::default(),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            num_workers: 4,
            cors_allowed_origin: "*".to_string(),
            console_logging_enabled: true,
            log_file: "logs/server.log".to_string(),
            storage: StorageConfig::default(),
            otp: OtpConfig::default(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            secret: String::new(),
            expiration_hours: 24 * 15,
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            max_connections: 32,
            acquire_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(30),
            retry_max: 3,
            retry_backoff: Duration::from_millis(3000),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            root_dir: "public".to_string(),
            uploads_dir: "uploads".to_string(),
            base_url: "http://localhost:3000".to_string(),
            max_file_size: 16 * 1024 * 1024,
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        OtpConfig {
            live: false,
            static_code: "123456".to_string(),
        }
    }
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// - `JWT_SECRET`: Required. The secret key for JWT signing.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 360 hours (15 days).
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or `JWT_EXPIRATION_HOURS` is not a number.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "360".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT signing (via `JwtConfig::from_env()`)
    ///
    /// Everything else falls back to the values of `Config::default()`.
    /// `APP_BASE_URL` overrides the base URL otherwise assembled from
    /// `APP_PROTOCOL`, `APP_URL` and `APP_PORT`.
    ///
    /// # Panics
    ///
    /// Panics if required variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let protocol = env::var("APP_PROTOCOL").unwrap_or_else(|_| "http".to_string());
        let host = env::var("APP_URL").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("APP_PORT").unwrap_or_else(|_| "3000".to_string());
        let base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| format!("{}://{}:{}", protocol, host, port));

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            project_name: env::var("PROJECT_NAME").unwrap_or(defaults.project_name),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            db: DbConfig {
                max_connections: parse_or("DB_MAX_CONNECTIONS", defaults.db.max_connections),
                acquire_timeout: Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", 60)),
                idle_timeout: Duration::from_secs(parse_or("DB_IDLE_TIMEOUT_SECS", 30)),
                retry_max: parse_or("DB_RETRY_MAX", defaults.db.retry_max),
                retry_backoff: Duration::from_millis(parse_or("DB_RETRY_BACKOFF_MS", 3000)),
            },
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or(defaults.server_host),
            // PORT wins over APP_PORT so hosted platforms can inject it
            server_port: parse_or("PORT", port.parse().unwrap_or(defaults.server_port)),
            num_workers: parse_or("WORKERS", defaults.num_workers),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or(defaults.cors_allowed_origin),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            storage: StorageConfig {
                root_dir: env::var("STORAGE_ROOT").unwrap_or(defaults.storage.root_dir),
                uploads_dir: defaults.storage.uploads_dir,
                base_url: base_url.trim_end_matches('/').to_string(),
                max_file_size: parse_or("UPLOAD_MAX_FILE_SIZE", defaults.storage.max_file_size),
            },
            otp: OtpConfig {
                live: env_flag("IS_LIVE_OTP"),
                static_code: env::var("STATIC_OTP").unwrap_or(defaults.otp.static_code),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Accepts `1` and `true` as enabled.
fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}
