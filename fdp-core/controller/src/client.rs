//! 管理控制器客户端核心实现

use reqwest::Client;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::{
    devices::DeviceApi, ha::HaApi, objects::ObjectApi, policies::PolicyApi, routes::RouteApi,
    zones::ZoneApi,
};
use crate::error::{ControllerError, Result};
use crate::step::{RestStep, RetryPolicy, StepExecutor, StepResponse};

/// 管理控制器客户端配置
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// 连接超时（秒）
    pub connect_timeout: u64,

    /// 请求超时（秒）
    pub request_timeout: u64,

    /// 是否验证 SSL 证书
    pub verify_ssl: bool,

    /// 控制器域（资源路径的一部分）
    pub domain: String,

    /// 步骤执行器重试策略
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 30,
            verify_ssl: false,
            domain: "default".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// 管理控制器客户端
pub struct ControllerClient {
    /// API 基础 URL
    base_url: String,

    /// HTTP 客户端
    http_client: Client,

    /// 认证凭据（401 重认证时复用）
    username: String,
    password: String,

    /// 访问令牌
    access_token: Arc<RwLock<Option<String>>>,

    /// 配置
    config: ControllerConfig,
}

impl ControllerClient {
    /// 创建新的控制器客户端
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        config: ControllerConfig,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| ControllerError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            username: username.to_string(),
            password: password.to_string(),
            access_token: Arc::new(RwLock::new(None)),
            config,
        })
    }

    /// 认证并缓存访问令牌
    ///
    /// 控制器在 `generatetoken` 响应头中返回令牌，后续所有请求
    /// 随头部下发。
    pub async fn authenticate(&self) -> Result<()> {
        info!("管理控制器认证: {}", self.username);

        let url = format!("{}/api/platform/v1/auth/generatetoken", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| ControllerError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ControllerError::AuthError(format!(
                "认证失败 [{}]: {}",
                status, body
            )));
        }

        let token = response
            .headers()
            .get("X-auth-access-token")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ControllerError::AuthError("响应头中未找到访问令牌".to_string())
            })?;

        *self.access_token.write().await = Some(token);

        info!("管理控制器认证成功");
        Ok(())
    }

    /// 获取当前访问令牌
    pub async fn token(&self) -> Result<String> {
        let token = self.access_token.read().await;
        token
            .clone()
            .ok_or_else(|| ControllerError::AuthError("未认证，请先调用 authenticate".to_string()))
    }

    /// 执行一个 REST 步骤（带重试与 401 重认证）
    pub async fn execute(&self, step: RestStep) -> Result<StepResponse> {
        StepExecutor::new(self).execute(step).await
    }

    /// 获取访问策略 API
    pub fn policies(&self) -> PolicyApi<'_> {
        PolicyApi::new(self)
    }

    /// 获取设备记录 API
    pub fn devices(&self) -> DeviceApi<'_> {
        DeviceApi::new(self)
    }

    /// 获取 HA 对 API
    pub fn ha(&self) -> HaApi<'_> {
        HaApi::new(self)
    }

    /// 获取安全区域 API
    pub fn zones(&self) -> ZoneApi<'_> {
        ZoneApi::new(self)
    }

    /// 获取网络对象 API
    pub fn objects(&self) -> ObjectApi<'_> {
        ObjectApi::new(self)
    }

    /// 获取静态路由 API
    pub fn routes(&self) -> RouteApi<'_> {
        RouteApi::new(self)
    }

    /// 拼接配置域内的资源 URL
    pub(crate) fn config_url(&self, path: &str) -> String {
        debug!("控制器资源路径: {}", path);
        format!(
            "{}/api/config/v1/domain/{}{}",
            self.base_url, self.config.domain, path
        )
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_client_creation() {
        let client = ControllerClient::new(
            "https://192.168.0.201",
            "api-user",
            "api-pass",
            ControllerConfig::default(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_config_url() {
        let client = ControllerClient::new(
            "https://192.168.0.201/",
            "api-user",
            "api-pass",
            ControllerConfig::default(),
        )
        .unwrap();
        assert_eq!(
            client.config_url("/devices/devicerecords"),
            "https://192.168.0.201/api/config/v1/domain/default/devices/devicerecords"
        );
    }
}
