//! 节点管理 API
//!
//! 提供节点全生命周期操作：
//! - 创建节点（自动附加客户端 UUID）
//! - 启动节点与状态查询
//! - 查询以太网接口列表
//! - 将接口连接到指定网络
//! - 查询控制台端点

use reqwest::Method;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::LabClient;
use crate::error::{LabError, Result};
use crate::models::{ConsoleEndpoint, NodeStatus};

/// 节点管理 API
pub struct NodeApi<'a> {
    client: &'a LabClient,
}

impl<'a> NodeApi<'a> {
    /// 创建新的节点 API 实例
    pub(crate) fn new(client: &'a LabClient) -> Self {
        Self { client }
    }

    /// 创建节点
    ///
    /// 平台要求每个节点携带唯一 UUID；此处在提交前为负载补充
    /// 客户端生成的 UUID，返回平台分配的节点 ID。
    pub async fn create(&self, payload: &serde_json::Value) -> Result<String> {
        let mut payload = payload.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "uuid".to_string(),
                serde_json::Value::String(Uuid::new_v4().to_string()),
            );
        }

        let url = self.client.lab_url("/nodes");
        let response = self.client.request(Method::POST, &url, Some(payload)).await?;

        let node_id = extract_id(&response)?;
        info!("实验平台节点创建成功: id={}", node_id);
        Ok(node_id)
    }

    /// 启动节点
    pub async fn start(&self, node_id: &str) -> Result<()> {
        info!("启动节点: {}", node_id);

        let url = self.client.lab_url(&format!("/nodes/{}/start", node_id));
        self.client
            .request::<serde_json::Value>(Method::GET, &url, None)
            .await?;
        Ok(())
    }

    /// 查询节点运行状态
    pub async fn status(&self, node_id: &str) -> Result<NodeStatus> {
        let url = self.client.lab_url(&format!("/nodes/{}", node_id));
        let response = self
            .client
            .request::<serde_json::Value>(Method::GET, &url, None)
            .await?;

        let code = response["data"]["status"]
            .as_i64()
            .ok_or_else(|| LabError::ParseError("节点详情缺少 status 字段".to_string()))?;

        debug!("节点 {} 状态码: {}", node_id, code);
        Ok(NodeStatus::from_code(code))
    }

    /// 查询节点以太网接口名称列表（按接口索引排序）
    pub async fn interfaces(&self, node_id: &str) -> Result<Vec<String>> {
        let url = self.client.lab_url(&format!("/nodes/{}/interfaces", node_id));
        let response = self
            .client
            .request::<serde_json::Value>(Method::GET, &url, None)
            .await?;

        let ethernet = response["data"]["ethernet"]
            .as_array()
            .ok_or_else(|| LabError::ParseError("接口详情缺少 ethernet 列表".to_string()))?;

        Ok(ethernet
            .iter()
            .filter_map(|intf| intf["name"].as_str().map(|s| s.to_string()))
            .collect())
    }

    /// 将节点接口连接到网络
    ///
    /// # Arguments
    /// * `node_id` - 节点 ID
    /// * `connections` - 接口索引 → 网络 ID 的映射
    pub async fn connect_interfaces(
        &self,
        node_id: &str,
        connections: &HashMap<u32, String>,
    ) -> Result<()> {
        let body: serde_json::Map<String, serde_json::Value> = connections
            .iter()
            .map(|(index, network_id)| {
                (
                    index.to_string(),
                    serde_json::Value::String(network_id.clone()),
                )
            })
            .collect();

        info!("连接节点 {} 接口: {:?}", node_id, body);

        let url = self.client.lab_url(&format!("/nodes/{}/interfaces", node_id));
        self.client
            .request(Method::PUT, &url, Some(serde_json::Value::Object(body)))
            .await?;
        Ok(())
    }

    /// 查询节点控制台端点
    pub async fn console_endpoint(&self, node_id: &str) -> Result<ConsoleEndpoint> {
        let url = self.client.lab_url(&format!("/nodes/{}", node_id));
        let response = self
            .client
            .request::<serde_json::Value>(Method::GET, &url, None)
            .await?;

        let name = response["data"]["name"].as_str().unwrap_or(node_id);
        let console_url = response["data"]["url"]
            .as_str()
            .ok_or_else(|| LabError::ParseError("节点详情缺少 url 字段".to_string()))?;

        ConsoleEndpoint::parse(name, console_url).ok_or_else(|| {
            LabError::ParseError(format!("无法解析控制台地址: {}", console_url))
        })
    }
}

/// 从平台响应中提取 `data.id`
///
/// 平台对不同资源返回数字或字符串两种 ID 形式，统一转为字符串。
fn extract_id(response: &serde_json::Value) -> Result<String> {
    let id = &response["data"]["id"];
    if let Some(id) = id.as_str() {
        return Ok(id.to_string());
    }
    if let Some(id) = id.as_i64() {
        return Ok(id.to_string());
    }
    Err(LabError::ParseError("响应缺少 data.id 字段".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_id_number_and_string() {
        let numeric = serde_json::json!({"data": {"id": 7}});
        assert_eq!(extract_id(&numeric).unwrap(), "7");

        let string = serde_json::json!({"data": {"id": "7"}});
        assert_eq!(extract_id(&string).unwrap(), "7");

        let missing = serde_json::json!({"data": {}});
        assert!(extract_id(&missing).is_err());
    }
}
