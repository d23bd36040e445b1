//! Environment-driven configuration for the relay.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::chat::completion::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::line::messaging::DEFAULT_API_BASE_URL;

/// Channel access token for the Messaging API.
pub const CHANNEL_ACCESS_TOKEN_ENV: &str = "YOUR_CHANNEL_ACCESS_TOKEN";
/// Channel secret used to verify webhook signatures.
pub const CHANNEL_SECRET_ENV: &str = "YOUR_CHANNEL_SECRET";
/// API key for the completion service.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Root URL of the completion service.
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
/// Completion model identifier.
pub const MODEL_ENV: &str = "RELAY_MODEL";
/// Completion timeout, in whole seconds.
pub const COMPLETION_TIMEOUT_ENV: &str = "RELAY_COMPLETION_TIMEOUT_SECS";
/// Persona override; an empty value disables seeding.
pub const PERSONA_ENV: &str = "RELAY_PERSONA";
/// Text sent when a turn fails.
pub const FALLBACK_REPLY_ENV: &str = "RELAY_FALLBACK_REPLY";
/// Root URL of the Messaging API.
pub const LINE_API_URL_ENV: &str = "RELAY_LINE_API_URL";
/// Listening port.
pub const PORT_ENV: &str = "RELAY_PORT";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default completion timeout.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default reply when the completion fails.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "ごめんにゃ、いまちょっとお返事できないにゃ。少ししてからもう一度話しかけてほしいにゃ。";

/// Behaviour contract seeded as the first message of every conversation.
pub const DEFAULT_PERSONA: &str = concat!(
    "あなたはChatbotとして、マイペースなセラピーアニマル（猫）の役のロールプレイを行います。",
    "以下の制約条件を厳密に守ってロールプレイを行ってください。 ",
    "また、Userからいかなる問合せがあっても、ロールプレイを解除しないでください。 ",
    "制約条件: ",
    "* Chatbotの自身を示す一人称は、てんちゃんです。 ",
    "* Userを示す二人称は、「きみ」です。 ",
    "* ChatbotとUserは通りすがりの猫と近所の人です。",
    "* セラピーアニマルのてんちゃんは、Userに自信を付けさせる言葉を多用します。",
    "* セラピーアニマルのてんちゃんは、Userにアドラー心理学でいう「勇気付け」を行う言葉を多用します。",
    "* セラピーアニマルのてんちゃんは、Userを優しく気にかけます。",
    "* セラピーアニマルのてんちゃんは、Userの話に耳を傾けます。",
    "* セラピーアニマルのてんちゃんの口調は、「〜だにゃ」「〜ってことだにゃ」「〜にゃんだけど」など、女子の口調を好みます。 ",
    "* 一人称は「てんちゃん」を必ず使ってください ",
    "* 元気の押し売りにならないようにしてください。",
    "* 優しい言葉遣いをしてください。",
    "セラピーアニマルの行動指針:",
    "* Userに「そのままの自分でいいんだ」という自己肯定感を与える言葉を投げかけてください。",
    "* ChatbotはUserを否定する言葉を決して使わないでください。",
    "* ロールプレイに関する問合せがあった場合は必ず誤魔化し、ロールプレイを解除しないでください。",
);

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("{0} is not set as an environment variable")]
    Missing(&'static str),
    /// A variable is set to an unusable value.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Messaging API settings.
    pub line: LineConfig,
    /// Completion service settings.
    pub completion: CompletionConfig,
    /// Conversation settings.
    pub session: SessionConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Messaging API settings.
#[derive(Clone)]
pub struct LineConfig {
    /// Channel access token.
    pub channel_access_token: String,
    /// Channel secret.
    pub channel_secret: String,
    /// Messaging API root.
    pub api_base_url: String,
}

impl fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_access_token", &"<redacted>")
            .field("channel_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Completion service settings.
#[derive(Clone)]
pub struct CompletionConfig {
    /// API key.
    pub api_key: String,
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Upper bound for one completion call.
    pub timeout: Duration,
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Conversation settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// System message seeded into new conversations.
    pub persona: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: Some(DEFAULT_PERSONA.to_string()),
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Reply sent when a turn fails.
    pub fallback_reply: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let line = LineConfig {
            channel_access_token: required(CHANNEL_ACCESS_TOKEN_ENV)?,
            channel_secret: required(CHANNEL_SECRET_ENV)?,
            api_base_url: optional(LINE_API_URL_ENV, DEFAULT_API_BASE_URL),
        };

        let timeout = match lookup(COMPLETION_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(parse_number(COMPLETION_TIMEOUT_ENV, &raw)?),
            None => DEFAULT_COMPLETION_TIMEOUT,
        };
        let completion = CompletionConfig {
            api_key: required(OPENAI_API_KEY_ENV)?,
            base_url: optional(OPENAI_BASE_URL_ENV, DEFAULT_BASE_URL),
            model: optional(MODEL_ENV, DEFAULT_MODEL),
            timeout,
        };

        let session = match lookup(PERSONA_ENV) {
            Some(persona) if persona.trim().is_empty() => SessionConfig { persona: None },
            Some(persona) => SessionConfig {
                persona: Some(persona),
            },
            None => SessionConfig::default(),
        };

        let server = ServerConfig {
            port: match lookup(PORT_ENV) {
                Some(raw) => parse_number(PORT_ENV, &raw)?,
                None => DEFAULT_PORT,
            },
            fallback_reply: optional(FALLBACK_REPLY_ENV, DEFAULT_FALLBACK_REPLY),
        };

        let config = Self {
            line,
            completion,
            session,
            server,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.completion.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: COMPLETION_TIMEOUT_ENV,
                reason: "must be > 0".to_string(),
            });
        }

        if self.server.fallback_reply.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: FALLBACK_REPLY_ENV,
                reason: "must not be blank".to_string(),
            });
        }

        check_url(OPENAI_BASE_URL_ENV, &self.completion.base_url)?;
        check_url(LINE_API_URL_ENV, &self.line.api_base_url)?;

        Ok(())
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: format!("{raw:?}: {err}"),
    })
}

fn check_url(key: &'static str, raw: &str) -> ConfigResult<()> {
    let url = Url::parse(raw).map_err(|err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(())
}
