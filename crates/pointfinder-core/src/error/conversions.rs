//! From trait implementations for PointfinderError conversions

use super::types::PointfinderError;

impl From<std::io::Error> for PointfinderError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for PointfinderError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<reqwest::Error> for PointfinderError {
    fn from(error: reqwest::Error) -> Self {
        let url = error.url().map(|u| u.to_string());
        match error.status() {
            Some(status) => Self::Http {
                status_code: status.as_u16(),
                message: error.to_string(),
                url,
            },
            // Anything that failed before a status line arrived is a transport
            // problem: connect, DNS, TLS, timeout or a dropped body.
            None if error.is_decode() => Self::json(error.to_string()),
            None => Self::Network {
                message: error.to_string(),
                url,
            },
        }
    }
}

impl From<url::ParseError> for PointfinderError {
    fn from(error: url::ParseError) -> Self {
        Self::config_with_context(error.to_string(), "Parsing URL")
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PointfinderError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::transport(error.to_string())
    }
}

impl From<toml::de::Error> for PointfinderError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.to_string(), "Parsing TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PointfinderError = io.into();
        assert!(matches!(err, PointfinderError::Io { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: PointfinderError = parse.into();
        assert_eq!(err.error_code(), "JSON_ERROR");
    }

    #[test]
    fn test_url_error_conversion() {
        let parse = url::Url::parse("not a url").unwrap_err();
        let err: PointfinderError = parse.into();
        assert!(matches!(err, PointfinderError::Config { .. }));
    }
}
