//! Bot token resolution.
//!
//! A token comes from the first non-empty source in an ordered list. The
//! explicit per-call token is always consulted first; the configured
//! sources follow in order. Resolution is pure: environment lookups go
//! through an injected function so tests never touch the real env.

use secrecy::{ExposeSecret, SecretString};

pub const PRIMARY_TOKEN_ENV: &str = "SLACK_BOT_TOKEN";
pub const FALLBACK_TOKEN_ENV: &str = "SLACK_TOKEN";

/// One place a token may be found.
#[derive(Clone)]
pub enum TokenSource {
    /// Read the named environment variable at resolution time.
    Env(String),
    /// A fixed token, e.g. from `--slack-token`.
    Fixed {
        label: String,
        token: SecretString,
    },
}

impl TokenSource {
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env(name.into())
    }

    pub fn fixed(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self::Fixed {
            label: label.into(),
            token: SecretString::from(token.into()),
        }
    }

    /// Human-readable name for error messages.
    pub fn label(&self) -> &str {
        match self {
            Self::Env(name) => name,
            Self::Fixed { label, .. } => label,
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
            Self::Fixed { label, .. } => f
                .debug_struct("Fixed")
                .field("label", label)
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// `SLACK_BOT_TOKEN`, then `SLACK_TOKEN`.
pub fn default_token_sources() -> Vec<TokenSource> {
    vec![
        TokenSource::env(PRIMARY_TOKEN_ENV),
        TokenSource::env(FALLBACK_TOKEN_ENV),
    ]
}

/// Return the first non-empty token: `explicit`, then each source in order.
pub fn resolve_token<L>(
    explicit: Option<&str>,
    sources: &[TokenSource],
    lookup: L,
) -> Option<SecretString>
where
    L: Fn(&str) -> Option<String>,
{
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(SecretString::from(token.to_string()));
    }

    sources.iter().find_map(|source| match source {
        TokenSource::Env(name) => lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(SecretString::from),
        TokenSource::Fixed { token, .. } => {
            let value = token.expose_secret().trim();
            (!value.is_empty()).then(|| SecretString::from(value.to_string()))
        }
    })
}

/// Lookup backed by the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Last four characters of a token, for logs.
pub fn token_hint(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn resolved(token: Option<SecretString>) -> Option<String> {
        token.map(|t| t.expose_secret().to_string())
    }

    #[test]
    fn test_explicit_token_wins() {
        let lookup = lookup_from(&[("SLACK_BOT_TOKEN", "xoxb-env")]);
        let token = resolve_token(Some("xoxb-explicit"), &default_token_sources(), lookup);
        assert_eq!(resolved(token).as_deref(), Some("xoxb-explicit"));
    }

    #[test]
    fn test_primary_before_fallback() {
        let lookup = lookup_from(&[("SLACK_BOT_TOKEN", "xoxb-primary"), ("SLACK_TOKEN", "xoxb-fallback")]);
        let token = resolve_token(None, &default_token_sources(), lookup);
        assert_eq!(resolved(token).as_deref(), Some("xoxb-primary"));
    }

    #[test]
    fn test_fallback_used_when_primary_blank() {
        let lookup = lookup_from(&[("SLACK_BOT_TOKEN", "  "), ("SLACK_TOKEN", "xoxb-fallback")]);
        let token = resolve_token(Some(""), &default_token_sources(), lookup);
        assert_eq!(resolved(token).as_deref(), Some("xoxb-fallback"));
    }

    #[test]
    fn test_nothing_resolves() {
        let token = resolve_token(None, &default_token_sources(), lookup_from(&[]));
        assert!(token.is_none());
    }

    #[test]
    fn test_fixed_source() {
        let sources = vec![
            TokenSource::fixed("--slack-token", "xoxb-cli"),
            TokenSource::env(PRIMARY_TOKEN_ENV),
        ];
        let lookup = lookup_from(&[("SLACK_BOT_TOKEN", "xoxb-env")]);
        assert_eq!(
            resolved(resolve_token(None, &sources, lookup)).as_deref(),
            Some("xoxb-cli")
        );
    }

    #[test]
    fn test_token_hint() {
        assert_eq!(token_hint("xoxb-1234-abcd"), "...abcd");
        assert_eq!(token_hint("abc"), "****");
    }

    #[test]
    fn test_debug_hides_fixed_token() {
        let source = TokenSource::fixed("cli", "xoxb-secret");
        assert!(!format!("{source:?}").contains("xoxb-secret"));
    }
}
