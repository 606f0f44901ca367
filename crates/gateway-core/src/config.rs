//! 설정 관리.
//!
//! 모든 설정은 환경 변수에서 읽습니다. `.env` 파일은 실행 진입점에서
//! `dotenvy`로 로드합니다.

use thiserror::Error;

/// 설정 로드 에러.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 필수 환경 변수 누락
    #[error("필수 환경 변수가 설정되지 않았습니다: {0}")]
    MissingVar(&'static str),

    /// 환경 변수 값 파싱 실패
    #[error("환경 변수 {name} 파싱 실패: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// 게이트웨이 전체 설정.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정 (없으면 인메모리 저장소 사용)
    pub database: Option<DatabaseConfig>,
    /// 자격증명 암호화 마스터 시크릿
    pub master_secret: String,
    /// 세션 유효 기간 (시간)
    pub session_ttl_hours: u64,
}

/// HTTP 서버 설정.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL
    pub url: String,
    /// 최대 연결 수
    pub max_connections: u32,
}

impl GatewayConfig {
    /// 환경 변수에서 설정을 로드합니다.
    ///
    /// `MASTER_ENCRYPTION_SECRET`은 필수입니다. 마스터 시크릿 없이
    /// 기동하면 자격증명을 복호화할 수 없으므로 여기서 즉시 실패합니다.
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_secret = std::env::var("MASTER_ENCRYPTION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingVar("MASTER_ENCRYPTION_SECRET"))?;

        let server = ServerConfig {
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: env_parse("SERVER_PORT", 3000)?,
        };

        let database = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|url| {
                Ok(DatabaseConfig {
                    url,
                    max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10)?,
                })
            })
            .transpose()?;

        Ok(Self {
            server,
            database,
            master_secret,
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", 24)?,
        })
    }
}

fn env_or(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    parse_var(name, std::env::var(name).ok(), default)
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_when_unset() {
        let port: u16 = parse_var("SERVER_PORT", None, 3000).unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn test_parse_var_reads_value() {
        let port: u16 = parse_var("SERVER_PORT", Some("8080".to_string()), 3000).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_var_invalid_value() {
        let result: Result<u16, _> =
            parse_var("SERVER_PORT", Some("not-a-number".to_string()), 3000);
        assert!(matches!(result, Err(ConfigError::InvalidVar { .. })));
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
    }
}
