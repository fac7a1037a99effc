//! 主机/网络对象 API

use reqwest::Method;
use tracing::info;

use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};
use crate::step::RestStep;

/// 网络对象 API
pub struct ObjectApi<'a> {
    client: &'a ControllerClient,
}

impl<'a> ObjectApi<'a> {
    /// 创建新的对象 API 实例
    pub(crate) fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 创建主机对象，返回对象 ID
    pub async fn create_host(&self, name: &str, address: &str) -> Result<String> {
        info!("创建主机对象: {} = {}", name, address);

        let payload = serde_json::json!({
            "type": "Host",
            "name": name,
            "value": address,
        });

        let step =
            RestStep::new("host_object_create", Method::POST, "/object/hosts").with_payload(payload);
        let response = self.client.execute(step).await?;

        response.body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ControllerError::ParseError(format!("主机对象 {} 响应缺少 id 字段", name))
            })
    }

    /// 按名称查找内置网络对象 ID（如 any-ipv4）
    pub async fn find_network_by_name(&self, name: &str) -> Result<String> {
        let step = RestStep::new("network_object_list", Method::GET, "/object/networks");
        let response = self.client.execute(step).await?;

        let items = response.body["items"].as_array().cloned().unwrap_or_default();
        for obj in items {
            if obj["name"].as_str() == Some(name) {
                if let Some(id) = obj["id"].as_str() {
                    return Ok(id.to_string());
                }
            }
        }

        Err(ControllerError::NotFound(format!("网络对象 {}", name)))
    }
}
