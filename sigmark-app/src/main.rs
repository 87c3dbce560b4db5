use std::path::PathBuf;

use sigmark_config::{AppConfig, ConfigError};
use sigmark_core::geometry::Size2;
use sigmark_io::SigningBackend;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod demo;

use demo::DemoOptions;

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut force_dry_run = false;
    let mut options = DemoOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--document" => {
                let Some(id) = args.next() else {
                    eprintln!("`--document` 需要提供文档 ID");
                    std::process::exit(1);
                };
                options.document_id = id;
            }
            "--pages" => {
                let Some(count) = args.next().and_then(|raw| raw.parse::<u32>().ok()) else {
                    eprintln!("`--pages` 需要提供正整数");
                    std::process::exit(1);
                };
                options.page_count = count;
            }
            "--page-size" => {
                let parsed = args.next().and_then(|raw| {
                    let (w, h) = raw.split_once('x')?;
                    Some(Size2::new(w.parse().ok()?, h.parse().ok()?))
                });
                let Some(size) = parsed else {
                    eprintln!("`--page-size` 格式应为 <宽>x<高>，例如 612x792");
                    std::process::exit(1);
                };
                options.page_size = size;
            }
            "--dry-run" => force_dry_run = true,
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let mut config = load_configuration(config_override);
    init_logging(&config);
    info!("启动签名放置演示");

    if force_dry_run {
        config.service.base_url = None;
    }
    let backend = match SigningBackend::from_config(&config.service) {
        Ok(backend) => backend,
        Err(err) => {
            error!(error = %err, "无法创建签名服务客户端");
            std::process::exit(1);
        }
    };
    if backend.is_dry_run() {
        info!("未配置签名服务地址，以演练模式运行");
    }

    match demo::run_demo(&config, &options, &backend).await {
        Ok(report) if report.is_complete() => {
            info!(page = report.page, saved = report.saved.len(), "文档签名完成");
        }
        Ok(report) => {
            let failure = report.into_result().err();
            if let Some(err) = failure {
                error!(error = %err, "部分签名保存失败，可重试");
            }
            std::process::exit(2);
        }
        Err(err) => {
            error!(error = %err, "签名流程失败");
            std::process::exit(1);
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
