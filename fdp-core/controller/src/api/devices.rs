//! 设备记录与物理接口 API
//!
//! 设备注册是异步操作：POST 仅提交注册请求（202），设备随后才
//! 出现在设备记录中并逐步进入健康/已部署状态，就绪轮询由
//! 流水线完成。

use reqwest::Method;
use tracing::{debug, info};

use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};
use crate::models::{DeviceHealth, DeviceSummary, InterfaceSummary};
use crate::step::RestStep;

/// 设备记录 API
pub struct DeviceApi<'a> {
    client: &'a ControllerClient,
}

impl<'a> DeviceApi<'a> {
    /// 创建新的设备 API 实例
    pub(crate) fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 提交设备注册
    ///
    /// # Arguments
    /// * `payload` - 注册负载（名称、管理地址、注册密钥、访问策略）
    pub async fn register(&self, payload: serde_json::Value) -> Result<()> {
        let name = payload["name"].as_str().unwrap_or("<unnamed>").to_string();
        info!("提交设备注册: {}", name);

        let step = RestStep::new("device_register", Method::POST, "/devices/devicerecords")
            .with_payload(payload);
        let response = self.client.execute(step).await?;

        debug!("设备 {} 注册已受理: HTTP {}", name, response.status);
        Ok(())
    }

    /// 查询设备记录列表
    pub async fn list(&self) -> Result<Vec<DeviceSummary>> {
        let step = RestStep::new("device_list", Method::GET, "/devices/devicerecords");
        let response = self.client.execute(step).await?;

        let items = response.body["items"].as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|dev| {
                Some(DeviceSummary {
                    id: dev["id"].as_str()?.to_string(),
                    name: dev["name"].as_str()?.to_string(),
                })
            })
            .collect())
    }

    /// 查询设备健康与部署状态
    pub async fn health(&self, device_id: &str) -> Result<DeviceHealth> {
        let step = RestStep::new(
            "device_details",
            Method::GET,
            "/devices/devicerecords/{device_id}",
        )
        .with_param("device_id", device_id);
        let response = self.client.execute(step).await?;

        Ok(DeviceHealth {
            health_status: response.body["healthStatus"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            deployment_status: response.body["deploymentStatus"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// 查询设备物理接口列表
    pub async fn physical_interfaces(&self, device_id: &str) -> Result<Vec<InterfaceSummary>> {
        let step = RestStep::new(
            "device_interfaces",
            Method::GET,
            "/devices/devicerecords/{device_id}/physicalinterfaces",
        )
        .with_param("device_id", device_id);
        let response = self.client.execute(step).await?;

        let items = response.body["items"].as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|intf| {
                Some(InterfaceSummary {
                    id: intf["id"].as_str()?.to_string(),
                    name: intf["name"].as_str()?.to_string(),
                })
            })
            .collect())
    }

    /// 查询单个物理接口的完整对象
    ///
    /// 接口更新采用读-改-写：先取完整对象，改写后整体 PUT。
    pub async fn interface_detail(
        &self,
        device_id: &str,
        interface_id: &str,
    ) -> Result<serde_json::Value> {
        let step = RestStep::new(
            "interface_detail",
            Method::GET,
            "/devices/devicerecords/{device_id}/physicalinterfaces/{interface_id}",
        )
        .with_param("device_id", device_id)
        .with_param("interface_id", interface_id);
        let response = self.client.execute(step).await?;

        if response.body.is_null() {
            return Err(ControllerError::NotFound(format!(
                "接口 {} (设备 {})",
                interface_id, device_id
            )));
        }
        Ok(response.body)
    }

    /// 更新物理接口
    pub async fn update_interface(
        &self,
        device_id: &str,
        interface_id: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let step = RestStep::new(
            "interface_update",
            Method::PUT,
            "/devices/devicerecords/{device_id}/physicalinterfaces/{interface_id}",
        )
        .with_param("device_id", device_id)
        .with_param("interface_id", interface_id)
        .with_payload(payload);
        self.client.execute(step).await?;
        Ok(())
    }
}
