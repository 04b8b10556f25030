use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 可选配置文件 (config/app.toml)
pub const CONFIG_FILE: &str = "config/app";

/// 未配置时使用的签名密钥, 启动时会告警
pub const DEFAULT_TOKEN_SECRET: &str = "change-me";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub access: AccessConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 超过该秒数的语句以 WARN 级别记录
    pub slow_statement_secs: u64,
    pub run_migrations: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig").field("token_secret", &"***").finish()
    }
}

/// 权限配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// 受保护的资源名, 写操作需要用户 access 中包含该名称
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,
    /// 拥有全部权限的邮箱
    #[serde(default)]
    pub superadmins: Vec<String>,
}

/// 空列表不会进入默认值层, 缺省时在反序列化阶段补齐
fn default_protected() -> Vec<String> {
    ["admin", "stock", "services", "fournisseurs", "options"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/logistique_bc".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 30,
                slow_statement_secs: 1,
                run_migrations: true,
            },
            auth: AuthConfig {
                token_secret: DEFAULT_TOKEN_SECRET.to_string(),
            },
            access: AccessConfig {
                protected: default_protected(),
                superadmins: Vec::new(),
            },
            log: LogConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 < config/app.toml < APP__SECTION__KEY < DATABASE_URL 等直接变量
    pub fn load() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::build(File::with_name(CONFIG_FILE).required(false), vars)
    }

    /// 从 TOML 文本和给定的环境变量表加载
    pub fn from_toml_str(toml: &str, vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(File::from_str(toml, FileFormat::Toml), vars)
    }

    fn build<S>(file: S, vars: HashMap<String, String>) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let direct = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();
        let port = direct("SERVER_PORT").and_then(|p| p.parse::<i64>().ok());

        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("access.protected")
                    .with_list_parse_key("access.superadmins")
                    .source(Some(vars.clone())),
            )
            .set_override_option("database.url", direct("DATABASE_URL"))?
            .set_override_option("server.host", direct("SERVER_HOST"))?
            .set_override_option("server.port", port)?
            .set_override_option("auth.token_secret", direct("TOKEN_SECRET"))?
            .build()?
            .try_deserialize()
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.token_secret == DEFAULT_TOKEN_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml_str("", HashMap::new()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.access.protected.len(), 5);
        assert!(config.access.superadmins.is_empty());
        assert!(config.uses_default_secret());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = AppConfig::build(File::with_name("config/absent").required(false), HashMap::new()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.access.superadmins.is_empty());
        assert_eq!(config.access.protected, default_protected());
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = r#"
            [server]
            port = 9000

            [access]
            superadmins = ["chef@example.com"]

            [log]
            level = "debug"
        "#;
        let config = AppConfig::from_toml_str(toml, HashMap::new()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.access.superadmins, vec!["chef@example.com".to_string()]);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn prefixed_env_overrides_file() {
        let toml = "[database]\nmax_connections = 4\n";
        let env = vars(&[
            ("APP__DATABASE__MAX_CONNECTIONS", "20"),
            ("APP__ACCESS__PROTECTED", "admin,stock"),
        ]);
        let config = AppConfig::from_toml_str(toml, env).unwrap();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.access.protected, vec!["admin".to_string(), "stock".to_string()]);
    }

    #[test]
    fn direct_variables_win() {
        let toml = "[database]\nurl = \"postgres://file/db\"\n";
        let env = vars(&[
            ("DATABASE_URL", "postgres://env/db"),
            ("SERVER_PORT", "3001"),
            ("TOKEN_SECRET", "s3cret"),
        ]);
        let config = AppConfig::from_toml_str(toml, env).unwrap();
        assert_eq!(config.database.url, "postgres://env/db");
        assert_eq!(config.server.port, 3001);
        assert!(!config.uses_default_secret());
        assert!(!format!("{:?}", config.auth).contains("s3cret"));
    }
}
