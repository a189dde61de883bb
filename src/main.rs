use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::Config;
use events::Scope;
use services::{create_probes, ActivityContext, DefaultActivityContext, Poller, StatusRenderer};

#[derive(Parser, Debug)]
#[command(name = "codex-pulse")]
#[command(about = "Гибридный детектор активности Codex с подавлением дребезга")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "codex-pulse.toml")]
    config: String,

    /// Режим сухого запуска (сценарные пробы вместо реальных)
    #[arg(long)]
    dry_run: bool,

    /// Выполнить один тик и напечатать диагностику в JSON
    #[arg(long)]
    once: bool,

    /// Область отображения: "all" или путь рабочей области
    #[arg(long)]
    scope: Option<Scope>,

    /// Стиль индикатора
    #[arg(long)]
    style: Option<String>,

    /// Рисовать строку состояния в терминале
    #[arg(long)]
    status_line: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let mut config = Config::load(&args.config)?;
    config.apply_cli_overrides(args.log_level.clone(), args.scope.clone(), args.style.clone());
    config.validate()?;

    // Инициализация системы логирования
    init_tracing(&config.logging.level, &config.logging.format)?;

    info!("Запуск codex-pulse v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - пробы работают по сценарию");
    } else {
        utils::permissions::check_environment(&config).await;
    }

    let config = Arc::new(config);
    let context: Arc<dyn ActivityContext> = Arc::new(DefaultActivityContext::new());
    let probes = create_probes(config.clone(), args.dry_run);
    let mut poller = Poller::new(&config, probes, context.clone());

    if args.once {
        let snapshot = poller.tick().await;
        println!("{}", poller.diagnostics(&snapshot).to_json_pretty()?);
        return Ok(());
    }

    info!("Все компоненты инициализированы");

    let poller_handle = tokio::spawn(async move {
        if let Err(e) = poller.run().await {
            error!("Ошибка в Poller: {}", e);
        }
    });

    let renderer_handle = if args.status_line {
        let renderer = StatusRenderer::new(&config, context.clone())?;
        Some(tokio::spawn(async move {
            if let Err(e) = renderer.run().await {
                error!("Ошибка в StatusRenderer: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Все сервисы запущены");

    // Ожидание сигнала завершения
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Получен сигнал завершения (Ctrl+C)");
        }
        Err(err) => {
            error!("Ошибка при ожидании сигнала завершения: {}", err);
        }
    }

    if args.status_line {
        eprintln!();
    }
    info!("Завершение работы...");

    let last = context.latest();
    info!("Последнее состояние: {}", last);
    for row in context.workspace_rows() {
        info!("  {} ({}): {}", row.label, row.root, if row.busy { "busy" } else { "idle" });
    }

    poller_handle.abort();
    if let Some(handle) = &renderer_handle {
        handle.abort();
    }

    // Ожидаем завершения задач (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = poller_handle.await;
        if let Some(handle) = renderer_handle {
            let _ = handle.await;
        }
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("codex-pulse завершил работу");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    // Логи идут в stderr: stdout занят выводом --once
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
