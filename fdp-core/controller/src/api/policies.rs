//! 访问策略 API
//!
//! 设备注册负载必须引用一个已有的访问策略；此模块按名称查找
//! 策略 ID。

use reqwest::Method;
use tracing::info;

use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};
use crate::step::RestStep;

/// 访问策略 API
pub struct PolicyApi<'a> {
    client: &'a ControllerClient,
}

impl<'a> PolicyApi<'a> {
    /// 创建新的策略 API 实例
    pub(crate) fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 按名称查找访问策略 ID
    pub async fn find_by_name(&self, name: &str) -> Result<String> {
        let step = RestStep::new("policy_list", Method::GET, "/policy/accesspolicies");
        let response = self.client.execute(step).await?;

        let items = response.body["items"].as_array().cloned().unwrap_or_default();
        for policy in items {
            if policy["name"].as_str() == Some(name) {
                if let Some(id) = policy["id"].as_str() {
                    info!("访问策略 {} 的 ID: {}", name, id);
                    return Ok(id.to_string());
                }
            }
        }

        Err(ControllerError::NotFound(format!("访问策略 {}", name)))
    }
}
