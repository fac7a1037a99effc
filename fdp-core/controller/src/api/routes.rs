//! 静态路由 API

use reqwest::Method;
use tracing::info;

use crate::client::ControllerClient;
use crate::error::Result;
use crate::step::RestStep;

/// 静态路由 API
pub struct RouteApi<'a> {
    client: &'a ControllerClient,
}

impl<'a> RouteApi<'a> {
    /// 创建新的路由 API 实例
    pub(crate) fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 为设备创建 IPv4 静态路由，返回路由 ID（控制器可能不回传）
    pub async fn create_static(
        &self,
        device_id: &str,
        payload: serde_json::Value,
    ) -> Result<Option<String>> {
        let name = payload["name"].as_str().unwrap_or("<unnamed>").to_string();
        info!("创建静态路由: {} (设备 {})", name, device_id);

        let step = RestStep::new(
            "static_route_create",
            Method::POST,
            "/devices/devicerecords/{device_id}/routing/ipv4staticroutes",
        )
        .with_param("device_id", device_id)
        .with_payload(payload);
        let response = self.client.execute(step).await?;

        Ok(response.body["id"].as_str().map(|s| s.to_string()))
    }
}
