//! 报告渲染子命令

use anyhow::{bail, Context, Result};

use fdp_orchestrator::RunReport;

use super::common;

/// 重新渲染已保存的运行报告
pub fn render(path: &str, format: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("读取报告失败: {}", path))?;
    let report: RunReport =
        serde_json::from_str(&content).with_context(|| format!("解析报告失败: {}", path))?;

    match format {
        "summary" => common::print_summary(&report),
        "json" => println!("{}", report.to_json().context("序列化失败")?),
        "yaml" => println!("{}", report.to_yaml().context("序列化失败")?),
        other => bail!("未知的输出格式: {}", other),
    }
    Ok(())
}
