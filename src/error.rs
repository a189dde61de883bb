use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Ошибка конфигурации: {0}")]
    Config(String),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка разбора JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Проба недоступна: {0}")]
    Probe(String),

    #[error("Команда '{command}' не завершилась за {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl PulseError {
    pub fn probe<T>(msg: impl Into<String>) -> Result<T> {
        Err(PulseError::Probe(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! pulse_error {
    (probe, $($arg:tt)*) => {
        $crate::error::PulseError::Probe(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::PulseError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_helper_wraps_message() {
        let result: Result<()> = PulseError::probe("pgrep не найден");
        match result {
            Err(PulseError::Probe(msg)) => assert_eq!(msg, "pgrep не найден"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn timeout_error_mentions_command() {
        let err = PulseError::CommandTimeout {
            command: "ps".to_string(),
            timeout: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("'ps'"));
    }

    #[test]
    fn config_error_has_context() {
        let err = PulseError::Config("стиль 'x' не найден".to_string());
        assert_eq!(err.to_string(), "Ошибка конфигурации: стиль 'x' не найден");
    }

    #[test]
    fn macro_builds_internal_error() {
        let err = pulse_error!(internal, "tick {}", 3);
        assert!(matches!(err, PulseError::Internal(ref m) if m == "tick 3"));
    }
}
