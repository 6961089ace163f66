//! 라우트 접근 정책.
//!
//! 순서가 있는 규칙 목록입니다. 요청의 메서드와 경로에 처음 일치하는 규칙이
//! 적용되고, 일치하는 규칙이 없으면 인증을 요구합니다.
//!
//! # 경로 패턴
//!
//! - `/exact` - 정확히 일치
//! - `/prefix/*` - prefix 아래 한 단계
//! - `/prefix/**` - prefix 자신과 그 아래 모든 경로

use authgate_core::{AccessConfig, AccessKind, Role, RoleSet};
use axum::http::Method;

/// 정책 구성 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("잘못된 경로 패턴: {0}")]
    InvalidPattern(String),
    #[error("잘못된 HTTP 메서드: {0}")]
    InvalidMethod(String),
    #[error("잘못된 역할 이름: {0}")]
    InvalidRole(String),
    #[error("역할이 지정되지 않은 규칙: {0}")]
    MissingRoles(String),
}

/// 경로 패턴.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// `prefix/*`
    OneSegment(String),
    /// `prefix/**`
    AnyDepth(String),
}

impl PathPattern {
    /// 패턴 문자열 파싱.
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        if !pattern.starts_with('/') {
            return Err(PolicyError::InvalidPattern(pattern.to_string()));
        }

        let (parsed, literal) = if let Some(prefix) = pattern.strip_suffix("/**") {
            (PathPattern::AnyDepth(prefix.to_string()), prefix)
        } else if let Some(prefix) = pattern.strip_suffix("/*") {
            (PathPattern::OneSegment(prefix.to_string()), prefix)
        } else {
            let exact = normalize(pattern);
            (PathPattern::Exact(exact.to_string()), exact)
        };

        if literal.contains('*') {
            return Err(PolicyError::InvalidPattern(pattern.to_string()));
        }

        Ok(parsed)
    }

    /// 경로가 패턴에 일치하는지 확인.
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::OneSegment(prefix) => path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|segment| !segment.is_empty() && !segment.contains('/')),
            PathPattern::AnyDepth(prefix) => {
                prefix.is_empty()
                    || path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// 규칙이 요구하는 접근 수준.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// 인증 없이 허용
    Permit,
    /// 인증만 요구
    Authenticated,
    /// 인증 + 역할 전부 요구
    Roles(RoleSet),
}

/// 단일 라우트 규칙.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// 적용 메서드 (없으면 전체)
    pub method: Option<Method>,
    /// 경로 패턴
    pub pattern: PathPattern,
    /// 접근 수준
    pub access: Access,
}

impl RouteRule {
    /// 새 규칙 생성.
    pub fn new(method: Option<Method>, pattern: &str, access: Access) -> Result<Self, PolicyError> {
        Ok(Self {
            method,
            pattern: PathPattern::parse(pattern)?,
            access,
        })
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().map_or(true, |m| m == method) && self.pattern.matches(path)
    }
}

static FALLBACK: Access = Access::Authenticated;

/// 순서 있는 라우트 규칙 목록.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<RouteRule>,
}

impl AccessPolicy {
    /// 규칙 목록으로 생성.
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// 규칙 추가.
    #[must_use]
    pub fn with_rule(mut self, rule: RouteRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// 인증 없이 허용하는 규칙 추가.
    pub fn permit(self, pattern: &str) -> Result<Self, PolicyError> {
        Ok(self.with_rule(RouteRule::new(None, pattern, Access::Permit)?))
    }

    /// 인증을 요구하는 규칙 추가.
    pub fn authenticated(self, method: Option<Method>, pattern: &str) -> Result<Self, PolicyError> {
        Ok(self.with_rule(RouteRule::new(method, pattern, Access::Authenticated)?))
    }

    /// 역할을 요구하는 규칙 추가.
    pub fn require_roles(
        self,
        pattern: &str,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<Self, PolicyError> {
        let roles: RoleSet = roles.into_iter().collect();
        if roles.is_empty() {
            return Err(PolicyError::MissingRoles(pattern.to_string()));
        }
        Ok(self.with_rule(RouteRule::new(None, pattern, Access::Roles(roles))?))
    }

    /// 기본 정책.
    ///
    /// 로그인/토큰 엔드포인트, 헬스 체크, 메트릭, API 문서는 허용하고
    /// `/admin/**`은 `ADMIN` 역할을 요구합니다. 나머지는 인증이 필요합니다.
    pub fn default_policy() -> Self {
        let rule = |method, pattern, access| RouteRule {
            method,
            pattern,
            access,
        };

        Self::new(vec![
            rule(
                Some(Method::PUT),
                PathPattern::Exact("/auth/credential".to_string()),
                Access::Authenticated,
            ),
            rule(None, PathPattern::AnyDepth("/auth".to_string()), Access::Permit),
            rule(None, PathPattern::Exact("/login".to_string()), Access::Permit),
            rule(None, PathPattern::AnyDepth("/health".to_string()), Access::Permit),
            rule(None, PathPattern::Exact("/metrics".to_string()), Access::Permit),
            rule(None, PathPattern::AnyDepth("/swagger-ui".to_string()), Access::Permit),
            rule(None, PathPattern::AnyDepth("/api-docs".to_string()), Access::Permit),
            rule(
                None,
                PathPattern::AnyDepth("/admin".to_string()),
                Access::Roles([Role::admin()].into_iter().collect()),
            ),
        ])
    }

    /// 설정에서 정책 구성. 규칙이 비어 있으면 기본 정책.
    pub fn from_config(config: &AccessConfig) -> Result<Self, PolicyError> {
        if config.rules.is_empty() {
            return Ok(Self::default_policy());
        }

        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let method = rule
                .method
                .as_deref()
                .map(|m| {
                    Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                        .map_err(|_| PolicyError::InvalidMethod(m.to_string()))
                })
                .transpose()?;

            let access = match rule.access {
                AccessKind::Permit => Access::Permit,
                AccessKind::Authenticated => Access::Authenticated,
                AccessKind::Roles => {
                    let roles = rule
                        .roles
                        .iter()
                        .map(|r| Role::parse(r).ok_or_else(|| PolicyError::InvalidRole(r.clone())))
                        .collect::<Result<RoleSet, _>>()?;
                    if roles.is_empty() {
                        return Err(PolicyError::MissingRoles(rule.pattern.clone()));
                    }
                    Access::Roles(roles)
                }
            };

            rules.push(RouteRule::new(method, &rule.pattern, access)?);
        }

        Ok(Self::new(rules))
    }

    /// 요청에 적용될 접근 수준.
    pub fn resolve(&self, method: &Method, path: &str) -> &Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| &rule.access)
            .unwrap_or(&FALLBACK)
    }

    /// 규칙 목록.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::AccessRuleConfig;

    #[test]
    fn test_pattern_exact() {
        let p = PathPattern::parse("/me").unwrap();
        assert!(p.matches("/me"));
        assert!(p.matches("/me/"));
        assert!(!p.matches("/me/x"));
        assert!(!p.matches("/meow"));
    }

    #[test]
    fn test_pattern_one_segment() {
        let p = PathPattern::parse("/users/*").unwrap();
        assert!(p.matches("/users/42"));
        assert!(!p.matches("/users"));
        assert!(!p.matches("/users/42/roles"));
        assert!(!p.matches("/usersX/42"));
    }

    #[test]
    fn test_pattern_any_depth() {
        let p = PathPattern::parse("/admin/**").unwrap();
        assert!(p.matches("/admin"));
        assert!(p.matches("/admin/status"));
        assert!(p.matches("/admin/a/b/c"));
        assert!(!p.matches("/administrator"));

        let all = PathPattern::parse("/**").unwrap();
        assert!(all.matches("/"));
        assert!(all.matches("/anything/at/all"));
    }

    #[test]
    fn test_pattern_rejects_invalid() {
        assert!(PathPattern::parse("admin").is_err());
        assert!(PathPattern::parse("/a/*/b").is_err());
        assert!(PathPattern::parse("/a*").is_err());
    }

    #[test]
    fn test_first_match_wins() {
        let policy = AccessPolicy::default()
            .permit("/public/**")
            .unwrap()
            .require_roles("/public/secret", [Role::admin()])
            .unwrap();

        assert_eq!(policy.resolve(&Method::GET, "/public/secret"), &Access::Permit);
    }

    #[test]
    fn test_method_specific_rule() {
        let policy = AccessPolicy::default()
            .authenticated(Some(Method::POST), "/reports")
            .unwrap()
            .permit("/reports")
            .unwrap();

        assert_eq!(policy.resolve(&Method::POST, "/reports"), &Access::Authenticated);
        assert_eq!(policy.resolve(&Method::GET, "/reports"), &Access::Permit);
    }

    #[test]
    fn test_fallback_is_authenticated() {
        let policy = AccessPolicy::default();
        assert_eq!(policy.resolve(&Method::GET, "/anything"), &Access::Authenticated);
    }

    #[test]
    fn test_default_policy() {
        let policy = AccessPolicy::default_policy();

        assert_eq!(policy.resolve(&Method::POST, "/login"), &Access::Permit);
        assert_eq!(policy.resolve(&Method::POST, "/auth/login"), &Access::Permit);
        assert_eq!(policy.resolve(&Method::POST, "/auth/refresh-token"), &Access::Permit);
        assert_eq!(policy.resolve(&Method::GET, "/health/ready"), &Access::Permit);
        assert_eq!(policy.resolve(&Method::GET, "/metrics"), &Access::Permit);
        assert_eq!(
            policy.resolve(&Method::PUT, "/auth/credential"),
            &Access::Authenticated
        );
        assert_eq!(policy.resolve(&Method::GET, "/me"), &Access::Authenticated);
        assert_eq!(
            policy.resolve(&Method::GET, "/admin/status"),
            &Access::Roles([Role::admin()].into_iter().collect())
        );
    }

    #[test]
    fn test_from_config() {
        let config = AccessConfig {
            rules: vec![
                AccessRuleConfig {
                    method: Some("get".to_string()),
                    pattern: "/reports/*".to_string(),
                    access: AccessKind::Roles,
                    roles: vec!["auditor".to_string(), "ROLE_USER".to_string()],
                },
                AccessRuleConfig {
                    method: None,
                    pattern: "/status".to_string(),
                    access: AccessKind::Permit,
                    roles: vec![],
                },
            ],
        };

        let policy = AccessPolicy::from_config(&config).unwrap();
        assert_eq!(policy.rules().len(), 2);

        let expected: RoleSet = ["AUDITOR", "USER"].into_iter().filter_map(Role::parse).collect();
        assert_eq!(
            policy.resolve(&Method::GET, "/reports/q3"),
            &Access::Roles(expected)
        );
        assert_eq!(
            policy.resolve(&Method::POST, "/reports/q3"),
            &Access::Authenticated
        );
        assert_eq!(policy.resolve(&Method::GET, "/status"), &Access::Permit);
    }

    #[test]
    fn test_from_config_empty_uses_default() {
        let policy = AccessPolicy::from_config(&AccessConfig::default()).unwrap();
        assert_eq!(policy.rules().len(), AccessPolicy::default_policy().rules().len());
    }

    #[test]
    fn test_from_config_errors() {
        let bad_role = AccessConfig {
            rules: vec![AccessRuleConfig {
                method: None,
                pattern: "/x".to_string(),
                access: AccessKind::Roles,
                roles: vec!["not a role".to_string()],
            }],
        };
        assert!(matches!(
            AccessPolicy::from_config(&bad_role),
            Err(PolicyError::InvalidRole(_))
        ));

        let bad_method = AccessConfig {
            rules: vec![AccessRuleConfig {
                method: Some("GE T".to_string()),
                pattern: "/x".to_string(),
                access: AccessKind::Permit,
                roles: vec![],
            }],
        };
        assert!(matches!(
            AccessPolicy::from_config(&bad_method),
            Err(PolicyError::InvalidMethod(_))
        ));
    }
}
