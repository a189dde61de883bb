use crate::error::{PulseError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::trace_if_enabled;

/// Вывод завершившейся команды
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Запускает внешнюю утилиту с жёстким таймаутом.
///
/// Дочерний процесс создаётся с `kill_on_drop`, поэтому по таймауту он
/// убивается вместе с отменённым future. Повторов нет: следующий тик и есть повтор.
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        trace_if_enabled!("Запуск {} ({} аргументов)", program, args.len());

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("{} не запустился: {}", program, e);
                return Err(PulseError::Io(e));
            }
            Err(_) => {
                return Err(PulseError::CommandTimeout {
                    command: program.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Как `run`, но ненулевой код возврата считается ошибкой
    pub async fn run_checked(&self, program: &str, args: &[String]) -> Result<String> {
        let output = self.run(program, args).await?;
        if !output.success {
            return PulseError::probe(format!(
                "{} завершился с кодом {:?}: {}",
                program, output.code, output.stderr
            ));
        }
        Ok(output.stdout)
    }
}
