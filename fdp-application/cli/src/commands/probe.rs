//! 连通性检查子命令
//!
//! 只做一次认证往返，用于部署前确认外部系统可达。

use anyhow::{Context, Result};

use super::common;

/// 实验平台登录检查
pub async fn lab(config_path: &str) -> Result<()> {
    let config = common::load_config(config_path)?;
    let client = common::lab_client(&config)?;

    client
        .login(&config.lab.username, &config.lab.password)
        .await
        .context("实验平台登录失败")?;

    println!("实验平台连通正常: {}", config.lab.base_url);
    let _ = client.logout().await;
    Ok(())
}

/// 管理控制器认证检查
pub async fn controller(config_path: &str) -> Result<()> {
    let config = common::load_config(config_path)?;
    let client = common::controller_client(&config)?;

    client
        .authenticate()
        .await
        .context("管理控制器认证失败")?;

    println!("管理控制器连通正常: {}", config.controller.base_url);
    Ok(())
}
