use crate::error::AppError;

/// SSRF policy for the URL guard.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Require https URLs (http is rejected).
    pub enforce_https: bool,
    /// Allow loopback/localhost hosts. Off by default.
    pub allow_localhost: bool,
    /// When non-empty, only these hosts (exact or dot-suffix) are fetchable.
    pub allowed_hosts: Vec<String>,
    /// Hosts rejected outright (exact or dot-suffix).
    pub blocked_hosts: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enforce_https: true,
            allow_localhost: false,
            allowed_hosts: Vec::new(),
            blocked_hosts: Vec::new(),
        }
    }
}

impl SecurityConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGESIFT_ENFORCE_HTTPS` (default `true`)
    /// - `PAGESIFT_ALLOW_LOCALHOST` (default `false`)
    /// - `PAGESIFT_ALLOWED_HOSTS` (comma-separated, optional)
    /// - `PAGESIFT_BLOCKED_HOSTS` (comma-separated, optional)
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            enforce_https: parse_bool(env_var("PAGESIFT_ENFORCE_HTTPS"), true)?,
            allow_localhost: parse_bool(env_var("PAGESIFT_ALLOW_LOCALHOST"), false)?,
            allowed_hosts: parse_list(env_var("PAGESIFT_ALLOWED_HOSTS")),
            blocked_hosts: parse_list(env_var("PAGESIFT_BLOCKED_HOSTS")),
        })
    }
}

/// HTTP fetch limits.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Hard cap on response body size; transfers are aborted beyond it.
    pub max_content_length_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_redirects: 3,
            user_agent: "pagesift/0.1 (+https://github.com/pagesift)".to_string(),
            max_content_length_bytes: 2 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGESIFT_FETCH_TIMEOUT_MS` (default 15000)
    /// - `PAGESIFT_FETCH_MAX_REDIRECTS` (default 3)
    /// - `PAGESIFT_USER_AGENT`
    /// - `PAGESIFT_MAX_CONTENT_BYTES` (default 2 MiB)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            timeout_ms: parse_number(env_var("PAGESIFT_FETCH_TIMEOUT_MS"), defaults.timeout_ms)?,
            max_redirects: parse_number(
                env_var("PAGESIFT_FETCH_MAX_REDIRECTS"),
                defaults.max_redirects,
            )?,
            user_agent: env_var("PAGESIFT_USER_AGENT").unwrap_or(defaults.user_agent),
            max_content_length_bytes: parse_number(
                env_var("PAGESIFT_MAX_CONTENT_BYTES"),
                defaults.max_content_length_bytes,
            )?,
        })
    }
}

/// Extraction engine limits and heuristics.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Global cap on items per page, regardless of the caller's `maxItems`.
    pub max_items_per_page: usize,
    /// Selector list used to split a page when no selector was supplied.
    pub fallback_selector: String,
    /// Global cap on characters kept per item content.
    pub max_content_chars: usize,
    /// Re-target with `fallback_selector` when the implicit default selected
    /// the whole document as one node. Heuristic: may mis-split ambiguous
    /// pages.
    pub auto_split: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_items_per_page: 50,
            fallback_selector: "article, li, section".to_string(),
            max_content_chars: 4000,
            auto_split: true,
        }
    }
}

impl ExtractConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGESIFT_MAX_ITEMS_PER_PAGE` (default 50)
    /// - `PAGESIFT_FALLBACK_SELECTOR` (default `article, li, section`)
    /// - `PAGESIFT_MAX_CONTENT_CHARS` (default 4000)
    /// - `PAGESIFT_AUTO_SPLIT` (default `true`)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            max_items_per_page: parse_number(
                env_var("PAGESIFT_MAX_ITEMS_PER_PAGE"),
                defaults.max_items_per_page,
            )?,
            fallback_selector: env_var("PAGESIFT_FALLBACK_SELECTOR")
                .unwrap_or(defaults.fallback_selector),
            max_content_chars: parse_number(
                env_var("PAGESIFT_MAX_CONTENT_CHARS"),
                defaults.max_content_chars,
            )?,
            auto_split: parse_bool(env_var("PAGESIFT_AUTO_SPLIT"), defaults.auto_split)?,
        })
    }
}

/// AI analysis limits and provider selection.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// At most this many items are serialized into one prompt.
    pub max_items_per_prompt: usize,
    /// Per-item content is truncated to this many characters before
    /// serialization.
    pub max_characters_per_item: usize,
    /// Provider name: `openai` or `gemini`.
    pub provider: String,
    pub model: String,
    pub api_key: String,
    /// Override the provider API base URL (OpenAI-compatible endpoints).
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            max_items_per_prompt: 20,
            max_characters_per_item: 4000,
            provider: "openai".to_string(),
            model: String::new(),
            api_key: String::new(),
            base_url: None,
            temperature: 0.2,
            max_output_tokens: 8192,
        }
    }
}

impl AiConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PAGESIFT_AI_MAX_ITEMS_PER_PROMPT` (default 20)
    /// - `PAGESIFT_AI_MAX_CHARS_PER_ITEM` (default 4000)
    /// - `PAGESIFT_AI_PROVIDER` (default `openai`)
    /// - `PAGESIFT_AI_MODEL` (required)
    /// - `PAGESIFT_AI_API_KEY` (required)
    /// - `PAGESIFT_AI_BASE_URL` (optional)
    /// - `PAGESIFT_AI_TEMPERATURE` (default 0.2)
    /// - `PAGESIFT_AI_MAX_OUTPUT_TOKENS` (default 8192)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let model = env_var("PAGESIFT_AI_MODEL")
            .ok_or_else(|| AppError::Config("PAGESIFT_AI_MODEL not set".into()))?;
        let api_key = env_var("PAGESIFT_AI_API_KEY")
            .ok_or_else(|| AppError::Config("PAGESIFT_AI_API_KEY not set".into()))?;
        Ok(Self {
            max_items_per_prompt: parse_number(
                env_var("PAGESIFT_AI_MAX_ITEMS_PER_PROMPT"),
                defaults.max_items_per_prompt,
            )?,
            max_characters_per_item: parse_number(
                env_var("PAGESIFT_AI_MAX_CHARS_PER_ITEM"),
                defaults.max_characters_per_item,
            )?,
            provider: env_var("PAGESIFT_AI_PROVIDER")
                .map(|p| p.to_lowercase())
                .unwrap_or(defaults.provider),
            model,
            api_key,
            base_url: env_var("PAGESIFT_AI_BASE_URL"),
            temperature: parse_number(env_var("PAGESIFT_AI_TEMPERATURE"), defaults.temperature)?,
            max_output_tokens: parse_number(
                env_var("PAGESIFT_AI_MAX_OUTPUT_TOKENS"),
                defaults.max_output_tokens,
            )?,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a comma-separated host list: trimmed, lowercased, empties dropped.
pub fn parse_list(value: Option<String>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(raw) => raw
            .split(',')
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect(),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool, AppError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(AppError::Config(format!(
                "invalid boolean '{other}': expected true or false"
            ))),
        },
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, default: T) -> Result<T, AppError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::Config(format!("invalid numeric value '{raw}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_trims_and_lowercases() {
        let parsed = parse_list(Some(" Example.com , , api.EXAMPLE.org ".into()));
        assert_eq!(parsed, vec!["example.com", "api.example.org"]);
    }

    #[test]
    fn parse_list_empty_input() {
        assert!(parse_list(None).is_empty());
        assert!(parse_list(Some("  ".into())).is_empty());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool(Some("TRUE".into()), false).unwrap());
        assert!(!parse_bool(Some("0".into()), true).unwrap());
        assert!(parse_bool(None, true).unwrap());
        assert!(parse_bool(Some("maybe".into()), true).is_err());
    }

    #[test]
    fn parse_number_falls_back_and_validates() {
        assert_eq!(parse_number::<u64>(None, 42).unwrap(), 42);
        assert_eq!(parse_number::<u64>(Some("7".into()), 42).unwrap(), 7);
        assert!(parse_number::<u64>(Some("seven".into()), 42).is_err());
    }

    #[test]
    fn defaults_are_fail_closed() {
        let security = SecurityConfig::default();
        assert!(security.enforce_https);
        assert!(!security.allow_localhost);
        assert!(security.allowed_hosts.is_empty());
    }
}
