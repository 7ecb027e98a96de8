use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DiscordError {
    #[error("Discord authentication failed")]
    #[diagnostic(
        code(cmdkit::discord::auth_failed),
        help("Check that your Discord bot token is valid and has not been regenerated")
    )]
    AuthenticationFailed {
        #[source]
        cause: serenity::Error,
        token_preview: String, // First/last few chars of token for debugging
    },

    #[error("Missing Discord token")]
    #[diagnostic(
        code(cmdkit::discord::missing_token),
        help("Set {variable} in the environment or in a .env file")
    )]
    MissingToken { variable: String },

    #[error("Discord API request failed")]
    #[diagnostic(
        code(cmdkit::discord::api_request_failed),
        help("Discord rejected the {operation} request")
    )]
    ApiRequest {
        operation: String,
        #[source]
        cause: serenity::Error,
    },

    #[error("Invalid command id")]
    #[diagnostic(
        code(cmdkit::discord::invalid_command_id),
        help("'{id}' is not a Discord snowflake")
    )]
    InvalidCommandId { id: String },

    #[error("Malformed command payload")]
    #[diagnostic(
        code(cmdkit::discord::malformed_payload),
        help("Discord returned a command that could not be converted")
    )]
    MalformedPayload {
        #[source]
        cause: serde_json::Error,
    },

    #[error("Gateway client failed")]
    #[diagnostic(
        code(cmdkit::discord::gateway_failed),
        help("The gateway connection stopped with an error")
    )]
    Gateway {
        #[source]
        cause: serenity::Error,
    },
}

pub type Result<T> = std::result::Result<T, DiscordError>;

// Helper functions for creating common errors
impl DiscordError {
    pub fn auth_failed(cause: serenity::Error, token: &str) -> Self {
        // Show first 6 and last 4 characters of token for debugging
        let chars: Vec<char> = token.chars().collect();
        let token_preview = if chars.len() > 10 {
            let head: String = chars[..6].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "***".to_string()
        };

        Self::AuthenticationFailed {
            cause,
            token_preview,
        }
    }

    pub fn api(operation: impl Into<String>, cause: serenity::Error) -> Self {
        Self::ApiRequest {
            operation: operation.into(),
            cause,
        }
    }

    /// Classify a client start failure; an invalid token becomes an auth error
    pub fn from_start(cause: serenity::Error, token: &str) -> Self {
        match cause {
            serenity::Error::Gateway(serenity::gateway::GatewayError::InvalidAuthentication) => {
                Self::auth_failed(cause, token)
            }
            cause => Self::Gateway { cause },
        }
    }
}
