//! 网络管理 API
//!
//! 提供实验内桥接网络的创建与查询。管理网络由实验预置，
//! 部署流程只读取其名称；HA 同步网络则由每次运行创建。

use reqwest::Method;
use tracing::info;

use crate::client::LabClient;
use crate::error::{LabError, Result};

/// 网络管理 API
pub struct NetworkApi<'a> {
    client: &'a LabClient,
}

impl<'a> NetworkApi<'a> {
    /// 创建新的网络 API 实例
    pub(crate) fn new(client: &'a LabClient) -> Self {
        Self { client }
    }

    /// 创建桥接网络，返回平台分配的网络 ID
    ///
    /// # Arguments
    /// * `name` - 网络名称（如 `ha_connection`）
    pub async fn create_bridge(&self, name: &str) -> Result<String> {
        info!("创建桥接网络: {}", name);

        let payload = serde_json::json!({
            "type": "bridge",
            "name": name,
            "left": 100,
            "top": 100,
            "visibility": 1
        });

        let url = self.client.lab_url("/networks");
        let response = self.client.request(Method::POST, &url, Some(payload)).await?;

        let id = &response["data"]["id"];
        let network_id = if let Some(id) = id.as_str() {
            id.to_string()
        } else if let Some(id) = id.as_i64() {
            id.to_string()
        } else {
            return Err(LabError::ParseError(
                "网络创建响应缺少 data.id 字段".to_string(),
            ));
        };

        info!("桥接网络创建成功: {} (id={})", name, network_id);
        Ok(network_id)
    }

    /// 查询网络名称
    pub async fn name(&self, network_id: &str) -> Result<String> {
        let url = self.client.lab_url(&format!("/networks/{}", network_id));
        let response = self
            .client
            .request::<serde_json::Value>(Method::GET, &url, None)
            .await?;

        response["data"]["name"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LabError::ParseError("网络详情缺少 name 字段".to_string()))
    }
}
