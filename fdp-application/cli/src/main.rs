//! FDP CLI 应用

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "fdp")]
#[command(about = "OCloudView FDP - 防火墙设备自动化部署平台", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行完整部署流程
    Run {
        /// 运行配置文件 (YAML)
        #[arg(short, long)]
        config: String,

        /// 运行报告输出路径 (JSON)
        #[arg(long)]
        report: Option<String>,
    },

    /// 加载并校验运行配置，不产生任何远程操作
    Validate {
        /// 运行配置文件 (YAML)
        #[arg(short, long)]
        config: String,
    },

    /// 外部系统连通性检查
    Probe {
        #[command(subcommand)]
        target: ProbeTarget,
    },

    /// 重新渲染已保存的运行报告
    Report {
        /// 报告文件路径 (JSON)
        path: String,

        /// 输出格式 (summary / json / yaml)
        #[arg(long, default_value = "summary")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ProbeTarget {
    /// 实验平台登录检查
    Lab {
        /// 运行配置文件 (YAML)
        #[arg(short, long)]
        config: String,
    },

    /// 管理控制器认证检查
    Controller {
        /// 运行配置文件 (YAML)
        #[arg(short, long)]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run { config, report } => commands::run::execute(&config, report.as_deref()).await,
        Commands::Validate { config } => commands::run::validate(&config),
        Commands::Probe { target } => match target {
            ProbeTarget::Lab { config } => commands::probe::lab(&config).await,
            ProbeTarget::Controller { config } => commands::probe::controller(&config).await,
        },
        Commands::Report { path, format } => commands::report::render(&path, &format),
    }
}
