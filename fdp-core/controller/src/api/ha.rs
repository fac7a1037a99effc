//! HA 对 API
//!
//! HA 对创建同样是异步的：提交后 HA 资源要先出现在列表中，
//! 再经历同步过程进入 active/standby。两段轮询都由流水线完成。

use reqwest::Method;
use tracing::info;

use crate::client::ControllerClient;
use crate::error::Result;
use crate::models::HaStatus;
use crate::step::RestStep;

/// HA 对 API
pub struct HaApi<'a> {
    client: &'a ControllerClient,
}

impl<'a> HaApi<'a> {
    /// 创建新的 HA API 实例
    pub(crate) fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 提交 HA 对创建
    pub async fn create(&self, payload: serde_json::Value) -> Result<()> {
        let name = payload["name"].as_str().unwrap_or("<unnamed>").to_string();
        info!("提交 HA 对创建: {}", name);

        let step =
            RestStep::new("ha_create", Method::POST, "/devicehapairs").with_payload(payload);
        self.client.execute(step).await?;
        Ok(())
    }

    /// 按名称查找 HA 对 ID
    ///
    /// 创建完成前资源不存在，返回 `Ok(None)`。
    pub async fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        let step = RestStep::new("ha_list", Method::GET, "/devicehapairs");
        let response = self.client.execute(step).await?;

        let items = response.body["items"].as_array().cloned().unwrap_or_default();
        for pair in items {
            if pair["name"].as_str() == Some(name) {
                if let Some(id) = pair["id"].as_str() {
                    return Ok(Some(id.to_string()));
                }
            }
        }
        Ok(None)
    }

    /// 查询 HA 对状态
    pub async fn status(&self, ha_id: &str) -> Result<HaStatus> {
        let step = RestStep::new("ha_status", Method::GET, "/devicehapairs/{ha_id}")
            .with_param("ha_id", ha_id);
        let response = self.client.execute(step).await?;

        let meta = &response.body["metadata"];
        Ok(HaStatus {
            primary: meta["primaryStatus"]["currentStatus"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            secondary: meta["secondaryStatus"]["currentStatus"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            active_device_id: meta["primaryStatus"]["device"]["id"]
                .as_str()
                .map(|s| s.to_string()),
            active_device_name: meta["primaryStatus"]["device"]["name"]
                .as_str()
                .map(|s| s.to_string()),
        })
    }
}
