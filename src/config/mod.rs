use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub service: ServiceConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub registrar: RegistrarConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Naming conventions used when deriving authorities from the route table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub api_prefix: String,
    pub resource_suffix: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// No URL means the in-memory store is used
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrarConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub admin_email: Option<String>,
    #[serde(skip_serializing)]
    pub admin_credential_hash: Option<String>,
    pub seed_menus: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Service overrides
        if let Ok(v) = env::var("SERVICE_NAME") {
            self.service.service_name = v;
        }
        if let Ok(v) = env::var("API_PREFIX") {
            self.service.api_prefix = crate::catalog::normalize_prefix(&v);
        }
        if let Ok(v) = env::var("RESOURCE_SUFFIX") {
            self.service.resource_suffix = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.service.port = v.parse().unwrap_or(self.service.port);
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_DEFAULT_PAGE_SIZE") {
            self.filter.default_page_size = v.parse().unwrap_or(self.filter.default_page_size);
        }
        if let Ok(v) = env::var("FILTER_MAX_PAGE_SIZE") {
            self.filter.max_page_size = v.parse().unwrap_or(self.filter.max_page_size);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        if let Ok(v) = env::var("REGISTRAR_TIMEOUT_SECS") {
            self.registrar.timeout_secs = v.parse().unwrap_or(self.registrar.timeout_secs);
        }

        // Bootstrap overrides
        if let Ok(v) = env::var("ADMIN_EMAIL") {
            self.bootstrap.admin_email = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("ADMIN_CREDENTIAL_HASH") {
            self.bootstrap.admin_credential_hash = Some(v);
        }
        if let Ok(v) = env::var("BOOTSTRAP_SEED_MENUS") {
            self.bootstrap.seed_menus = v.parse().unwrap_or(self.bootstrap.seed_menus);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            service: ServiceConfig::default(),
            filter: FilterConfig {
                default_page_size: 20,
                max_page_size: 1000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                // Development only; staging and production must set JWT_SECRET
                jwt_secret: "development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            registrar: RegistrarConfig { timeout_secs: 30 },
            bootstrap: BootstrapConfig {
                admin_email: Some("admin@localhost".to_string()),
                admin_credential_hash: None,
                seed_menus: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            service: ServiceConfig::default(),
            filter: FilterConfig {
                default_page_size: 20,
                max_page_size: 500,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            registrar: RegistrarConfig { timeout_secs: 15 },
            bootstrap: BootstrapConfig {
                admin_email: None,
                admin_credential_hash: None,
                seed_menus: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            service: ServiceConfig::default(),
            filter: FilterConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                enable_cors: false,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
            registrar: RegistrarConfig { timeout_secs: 10 },
            bootstrap: BootstrapConfig {
                admin_email: None,
                admin_credential_hash: None,
                seed_menus: false,
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "auth".to_string(),
            api_prefix: "/api".to_string(),
            resource_suffix: "Resource".to_string(),
            port: 3000,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
