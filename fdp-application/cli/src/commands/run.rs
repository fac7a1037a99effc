//! run / validate 子命令

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

use fdp_orchestrator::adapter::{ControllerAdapter, LabAdapter, RfbConsoleProvisioner};
use fdp_orchestrator::{PipelineEngine, RunContext};

use super::common;

/// 执行完整部署
pub async fn execute(config_path: &str, report_path: Option<&str>) -> Result<()> {
    let config = common::load_config(config_path)?;
    info!(
        "配置加载完成: {} 台设备, {} 个区域, HA: {}",
        config.devices.len(),
        config.zones.len(),
        config.ha.is_some()
    );

    let lab_client = common::lab_client(&config)?;
    let controller_client = common::controller_client(&config)?;

    let lab = Arc::new(LabAdapter::new(
        Arc::clone(&lab_client),
        &config.lab.username,
        &config.lab.password,
    ));
    let controller = Arc::new(ControllerAdapter::new(Arc::clone(&controller_client)));
    let console = Arc::new(RfbConsoleProvisioner::new(
        &config.diagnostics_dir,
        config.timing.clone(),
    ));

    let ctx = Arc::new(RunContext::new(config));
    let engine = PipelineEngine::new(ctx, lab, controller, console);

    let report = engine.run().await?;

    if let Some(path) = report_path {
        let json = report.to_json().context("序列化运行报告失败")?;
        std::fs::write(path, json).with_context(|| format!("写入运行报告失败: {}", path))?;
        info!("运行报告已写入: {}", path);
    }

    common::print_summary(&report);

    if !report.is_success() {
        bail!("部署存在失败，详见报告");
    }
    Ok(())
}

/// 只加载并校验配置
pub fn validate(config_path: &str) -> Result<()> {
    let config = common::load_config(config_path)?;

    println!("配置校验通过:");
    println!("  设备: {}", config.devices.len());
    for device in &config.devices {
        println!(
            "    {} (管理地址 {})",
            device.profile.name, device.profile.mgmt_ip
        );
    }
    println!("  区域: {}", config.zones.len());
    for (index, zone) in config.zones.iter().enumerate() {
        println!("    [{}] {}", index, zone.name);
    }
    println!("  接口规划: {}", config.interfaces.len());
    for plan in &config.interfaces {
        println!(
            "    {} -> {} (zone_index {})",
            plan.name, plan.ifname, plan.zone_index
        );
    }
    match &config.ha {
        Some(ha) => println!("  HA: {} ({} / {})", ha.name, ha.primary, ha.secondary),
        None => println!("  HA: 未配置"),
    }
    Ok(())
}
