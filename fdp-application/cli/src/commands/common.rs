//! 子命令共用工具

use anyhow::{Context, Result};
use std::sync::Arc;

use fdp_controller::{ControllerClient, ControllerConfig};
use fdp_labplatform::{LabClient, LabConfig};
use fdp_orchestrator::RunConfig;

/// 加载并校验运行配置
pub fn load_config(path: &str) -> Result<RunConfig> {
    RunConfig::from_yaml(path).with_context(|| format!("加载运行配置失败: {}", path))
}

/// 按配置构建实验平台客户端
pub fn lab_client(config: &RunConfig) -> Result<Arc<LabClient>> {
    let client = LabClient::new(
        &config.lab.base_url,
        &config.lab.lab_path,
        LabConfig::default(),
    )
    .context("构建实验平台客户端失败")?;
    Ok(Arc::new(client))
}

/// 按配置构建管理控制器客户端
pub fn controller_client(config: &RunConfig) -> Result<Arc<ControllerClient>> {
    let controller_config = ControllerConfig {
        domain: config.controller.domain.clone(),
        ..Default::default()
    };
    let client = ControllerClient::new(
        &config.controller.base_url,
        &config.controller.username,
        &config.controller.password,
        controller_config,
    )
    .context("构建管理控制器客户端失败")?;
    Ok(Arc::new(client))
}

/// 打印运行报告摘要
pub fn print_summary(report: &fdp_orchestrator::RunReport) {
    println!("运行开始: {}", report.start_time);
    if let Some(end_time) = report.end_time {
        println!("运行结束: {} (耗时 {:?})", end_time, report.duration);
    }
    println!();

    for (name, device) in &report.devices {
        println!("设备 {}: {:?}", name, device.state);
        for outcome in &device.stages {
            let mark = match outcome.status {
                fdp_common::OutcomeStatus::Success => "+",
                fdp_common::OutcomeStatus::Failed => "!",
                fdp_common::OutcomeStatus::Skipped => "-",
            };
            let mut line = format!("  [{}] {}", mark, outcome.stage);
            if let Some(detail) = &outcome.detail {
                line.push_str(&format!(" ({})", detail));
            }
            if let Some(error) = &outcome.error {
                line.push_str(&format!(" 错误: {}", error));
            }
            println!("{}", line);
        }
    }

    let failures = report.failures();
    println!();
    if failures.is_empty() {
        println!("全部阶段成功");
    } else {
        println!("失败 {} 条:", failures.len());
        for (owner, outcome) in failures {
            println!(
                "  {} / {}: {}",
                owner,
                outcome.stage,
                outcome.error.as_deref().unwrap_or("<无详情>")
            );
        }
    }
}
