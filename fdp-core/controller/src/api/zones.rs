//! 安全区域 API
//!
//! 安全区域是控制器全局资源，每次运行只创建一轮，创建顺序
//! 决定 zone_index 到区域 ID 的对应关系。

use reqwest::Method;
use tracing::info;

use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};
use crate::step::RestStep;

/// 安全区域 API
pub struct ZoneApi<'a> {
    client: &'a ControllerClient,
}

impl<'a> ZoneApi<'a> {
    /// 创建新的区域 API 实例
    pub(crate) fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 创建安全区域，返回控制器分配的区域 ID
    ///
    /// # Arguments
    /// * `name` - 区域名称
    /// * `interface_mode` - 接口模式（通常为 ROUTED）
    pub async fn create(&self, name: &str, interface_mode: &str) -> Result<String> {
        info!("创建安全区域: {}", name);

        let payload = serde_json::json!({
            "type": "SecurityZone",
            "name": name,
            "interfaceMode": interface_mode,
        });

        let step = RestStep::new("zone_create", Method::POST, "/object/securityzones")
            .with_payload(payload);
        let response = self.client.execute(step).await?;

        response.body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ControllerError::ParseError(format!("安全区域 {} 响应缺少 id 字段", name))
            })
    }
}
