//! 实验平台客户端核心实现

use reqwest::{Client, Method};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{NetworkApi, NodeApi};
use crate::error::{LabError, Result};

/// 实验平台客户端配置
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// 连接超时（秒）
    pub connect_timeout: u64,

    /// 请求超时（秒）
    pub request_timeout: u64,

    /// 是否验证 SSL 证书
    pub verify_ssl: bool,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 30,
            verify_ssl: false,
        }
    }
}

/// 实验平台客户端
///
/// 会话状态保存在 `reqwest` 的 cookie store 中，登录成功后
/// 所有请求自动携带会话 Cookie。
pub struct LabClient {
    /// API 基础 URL
    base_url: String,

    /// 实验文件路径（形如 `deploy/firewalls.unl`）
    lab_path: String,

    /// HTTP 客户端（启用 cookie store）
    http_client: Client,
}

impl LabClient {
    /// 创建新的实验平台客户端
    pub fn new(base_url: &str, lab_path: &str, config: LabConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .cookie_store(true)
            .build()
            .map_err(|e| LabError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            lab_path: lab_path.trim_matches('/').to_string(),
            http_client,
        })
    }

    /// 认证登录
    ///
    /// # Arguments
    /// * `username` - 用户名
    /// * `password` - 密码
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        info!("实验平台登录: {}", username);

        let login_url = format!("{}/api/auth/login", self.base_url);
        let login_data = serde_json::json!({
            "username": username,
            "password": password,
            "html5": "-1"
        });

        let response = self
            .http_client
            .post(&login_url)
            .json(&login_data)
            .send()
            .await
            .map_err(|e| LabError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabError::AuthError(format!(
                "实验平台登录失败 [{}]: {}",
                status, body
            )));
        }

        info!("实验平台登录成功");
        Ok(())
    }

    /// 注销登出
    pub async fn logout(&self) -> Result<()> {
        info!("实验平台登出");
        let url = format!("{}/api/auth/logout", self.base_url);
        let _ = self.http_client.get(&url).send().await;
        Ok(())
    }

    /// 获取节点管理 API
    pub fn node(&self) -> NodeApi<'_> {
        NodeApi::new(self)
    }

    /// 获取网络管理 API
    pub fn network(&self) -> NetworkApi<'_> {
        NetworkApi::new(self)
    }

    /// 拼接实验作用域内的 API 路径
    pub(crate) fn lab_url(&self, suffix: &str) -> String {
        format!(
            "{}/api/labs/{}{}",
            self.base_url,
            self.lab_path,
            suffix
        )
    }

    /// 发送 HTTP 请求并返回解析后的 JSON
    pub(crate) async fn request<T: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<T>,
    ) -> Result<serde_json::Value> {
        debug!("实验平台 API 请求: {} {}", method, url);

        let mut request = self.http_client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LabError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "无法读取错误响应".to_string());
            warn!("实验平台 API 请求失败: {} - {}", status, error_text);
            return Err(LabError::ApiError(status.as_u16(), error_text));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| LabError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_client_creation() {
        let client = LabClient::new(
            "https://192.168.0.119/",
            "/deploy/firewalls.unl/",
            LabConfig::default(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_lab_url() {
        let client = LabClient::new(
            "https://192.168.0.119",
            "deploy/firewalls.unl",
            LabConfig::default(),
        )
        .unwrap();
        assert_eq!(
            client.lab_url("/nodes/7/start"),
            "https://192.168.0.119/api/labs/deploy/firewalls.unl/nodes/7/start"
        );
    }
}
