use super::command::CommandRunner;
use super::r#trait::ProcessProbe;
use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::events::ProcessReading;
use std::collections::BTreeSet;
use tracing::debug;

/// Ищет процессы через `pgrep -f` и суммирует мгновенный %CPU через `ps`
pub struct PgrepProcessProbe {
    runner: CommandRunner,
    pattern: String,
    own_pid: u32,
}

impl PgrepProcessProbe {
    pub fn new(config: &Config) -> Self {
        Self {
            runner: CommandRunner::new(config.command_timeout()),
            pattern: combined_pattern(&config.probe.process_patterns),
            own_pid: std::process::id(),
        }
    }

    async fn find_pids(&self) -> Result<BTreeSet<u32>> {
        let output = self
            .runner
            .run("pgrep", &["-f".to_string(), self.pattern.clone()])
            .await?;

        // pgrep: 0 - есть совпадения, 1 - нет совпадений, остальное - ошибка
        let mut pids = match output.code {
            Some(0) => parse_pid_lines(&output.stdout),
            Some(1) => BTreeSet::new(),
            code => {
                return PulseError::probe(format!(
                    "pgrep -f '{}' завершился с кодом {:?}: {}",
                    self.pattern, code, output.stderr
                ))
            }
        };

        pids.remove(&self.own_pid);
        Ok(pids)
    }

    async fn cpu_percent(&self, pids: &BTreeSet<u32>) -> Result<f64> {
        let pid_list = pids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let output = self
            .runner
            .run(
                "ps",
                &["-o".to_string(), "%cpu=".to_string(), "-p".to_string(), pid_list],
            )
            .await?;

        // ps возвращает 1, если часть процессов успела завершиться; остальные строки валидны
        if !output.success && output.stdout.trim().is_empty() {
            return PulseError::probe(format!("ps завершился с кодом {:?}: {}", output.code, output.stderr));
        }

        Ok(parse_cpu_lines(&output.stdout))
    }

    async fn try_measure(&self) -> Result<ProcessReading> {
        let pids = self.find_pids().await?;
        if pids.is_empty() {
            return Ok(ProcessReading::empty());
        }

        let cpu = self.cpu_percent(&pids).await?;
        Ok(ProcessReading::new(pids, cpu))
    }
}

#[async_trait::async_trait]
impl ProcessProbe for PgrepProcessProbe {
    async fn measure(&self) -> ProcessReading {
        match self.try_measure().await {
            Ok(reading) => reading,
            Err(e) => {
                debug!("Проба процессов деградировала: {}", e);
                ProcessReading::empty()
            }
        }
    }
}

/// Все шаблоны одним запросом: альтернатива в расширенном регулярном выражении pgrep
pub fn combined_pattern(patterns: &[String]) -> String {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

/// Разбирает вывод pgrep: по одному pid в строке
pub fn parse_pid_lines(stdout: &str) -> BTreeSet<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}

/// Суммирует колонку %CPU; нечисловые строки пропускаются, отрицательные обнуляются
pub fn parse_cpu_lines(stdout: &str) -> f64 {
    stdout
        .lines()
        .filter_map(|line| {
            // Некоторые локали печатают десятичную запятую
            line.trim().replace(',', ".").parse::<f64>().ok()
        })
        .filter(|value| value.is_finite())
        .map(|value| value.max(0.0))
        .sum()
}
