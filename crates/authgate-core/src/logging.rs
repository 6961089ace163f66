//! tracing 구독자 초기화.
//!
//! `[logging]` 설정으로 필터와 출력 형식을 정합니다.
//! `RUST_LOG`가 비어 있지 않으면 설정의 필터 대신 사용합니다.
//!
//! 비밀번호, 토큰, 서명 키는 어떤 필드로도 기록하지 않습니다.

use serde::Deserialize;
use tracing_subscriber::{
    filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 여러 줄, 색상 포함 (개발용)
    #[default]
    Pretty,
    /// 한 줄 JSON, 이벤트 필드를 최상위로 펼침 (로그 수집용)
    Json,
    Compact,
}

/// 로깅 초기화 에러.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("잘못된 로그 필터: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("전역 구독자가 이미 설치되어 있습니다: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// 필터 결정. 비어 있지 않은 `env` 값이 설정의 지시어보다 우선합니다.
fn resolve_filter(directives: &str, env: Option<&str>) -> Result<EnvFilter, ParseError> {
    match env.map(str::trim).filter(|v| !v.is_empty()) {
        Some(from_env) => EnvFilter::try_new(from_env),
        None => EnvFilter::try_new(directives),
    }
}

fn format_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// 전역 tracing 구독자를 설치합니다. 프로세스당 한 번만 호출할 수 있습니다.
///
/// ```no_run
/// use authgate_core::{init_logging, LoggingConfig};
///
/// init_logging(&LoggingConfig::default()).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(&config.level, env.as_deref())?;

    tracing_subscriber::registry()
        .with(format_layer(config))
        .with(filter)
        .try_init()?;

    tracing::info!(
        format = ?config.format,
        from_env = env.is_some(),
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_configured_directives() {
        let filter = resolve_filter("authgate_api=info", Some("authgate_api=trace")).unwrap();
        assert_eq!(filter.to_string(), "authgate_api=trace");

        let filter = resolve_filter("authgate_api=info", Some("  ")).unwrap();
        assert_eq!(filter.to_string(), "authgate_api=info");
    }

    #[test]
    fn test_invalid_directive_is_an_error() {
        assert!(resolve_filter("authgate_api=loud", None).is_err());
    }

    #[test]
    fn test_format_layer_for_every_format() {
        for format in [LogFormat::Pretty, LogFormat::Json, LogFormat::Compact] {
            let config = LoggingConfig {
                format,
                source_location: true,
                ..LoggingConfig::default()
            };
            let _layer = format_layer(&config);
        }
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        // 첫 호출은 다른 테스트가 먼저 설치했으면 실패할 수 있음
        let _ = init_logging(&config);
        let second = init_logging(&config);

        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
