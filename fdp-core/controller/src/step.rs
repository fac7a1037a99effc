//! REST 步骤执行器
//!
//! 流水线的每个阶段都通过这里发出单次 HTTP 请求：
//! - URL 模板中的 `{placeholder}` 由标识符表解析出的参数替换
//! - 瞬时失败（连接错误、5xx、429）按指数退避重试，直至预算耗尽
//! - 4xx 客户端错误不重试；401 触发一次重新认证后重放
//! - 变更类步骤携带稳定的关联 ID 头，重放不会在支持去重的
//!   控制器上产生重复资源

use reqwest::Method;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,

    /// 首次重试延迟（毫秒）
    pub initial_delay_ms: u64,

    /// 最大重试延迟（毫秒）
    pub max_delay_ms: u64,

    /// 退避倍率
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 计算第 `attempt` 次重试前的延迟（attempt 从 0 开始）
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

/// 单个 REST 步骤
#[derive(Debug, Clone)]
pub struct RestStep {
    /// 步骤名称（日志与诊断用）
    pub name: String,

    /// HTTP 方法
    pub method: Method,

    /// 资源路径模板（配置域内，支持 `{placeholder}`）
    pub path: String,

    /// 模板参数
    pub params: HashMap<String, String>,

    /// JSON 负载
    pub payload: Option<serde_json::Value>,

    /// 关联 ID（同一逻辑步骤的所有重放共享）
    pub correlation_id: String,
}

impl RestStep {
    /// 创建新的 REST 步骤
    pub fn new(name: &str, method: Method, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
            params: HashMap::new(),
            payload: None,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    /// 设置模板参数
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// 设置 JSON 负载
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// 解析路径模板
    ///
    /// 所有 `{placeholder}` 必须有对应参数，残留占位符说明
    /// 标识符表缺项，按客户端错误处理。
    pub fn resolve_path(&self) -> Result<String> {
        let mut path = self.path.clone();
        for (key, value) in &self.params {
            path = path.replace(&format!("{{{}}}", key), value);
        }

        if path.contains('{') {
            return Err(ControllerError::OperationFailed(format!(
                "步骤 {} 的路径存在未解析的占位符: {}",
                self.name, path
            )));
        }
        Ok(path)
    }
}

/// 步骤响应
#[derive(Debug, Clone)]
pub struct StepResponse {
    /// HTTP 状态码
    pub status: u16,

    /// 解析后的响应体（空响应体为 Null）
    pub body: serde_json::Value,
}

/// 一次请求的分类结果
enum Attempt {
    Done(StepResponse),
    Unauthorized,
    Transient(String),
}

/// REST 步骤执行器
pub struct StepExecutor<'a> {
    client: &'a ControllerClient,
}

impl<'a> StepExecutor<'a> {
    /// 创建新的步骤执行器
    pub fn new(client: &'a ControllerClient) -> Self {
        Self { client }
    }

    /// 执行步骤
    ///
    /// 除远程调用外无其他副作用，可安全重放。
    pub async fn execute(&self, step: RestStep) -> Result<StepResponse> {
        let url = self.client.config_url(&step.resolve_path()?);
        let policy = self.client.retry_policy().clone();

        let mut reauthenticated = false;
        let mut last_error = String::new();

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                let delay = policy.calculate_delay(attempt - 1);
                debug!(
                    "步骤 {} 第 {} 次重试，退避 {:?}",
                    step.name,
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&url, &step).await? {
                Attempt::Done(response) => {
                    debug!("步骤 {} 完成: HTTP {}", step.name, response.status);
                    return Ok(response);
                }
                Attempt::Unauthorized => {
                    if reauthenticated {
                        return Err(ControllerError::AuthError(format!(
                            "步骤 {} 重新认证后仍返回 401",
                            step.name
                        )));
                    }
                    warn!("步骤 {} 收到 401，重新认证后重放", step.name);
                    self.client.authenticate().await?;
                    reauthenticated = true;
                    // 重认证不消耗瞬时重试预算之外的等待
                }
                Attempt::Transient(message) => {
                    warn!(
                        "步骤 {} 瞬时失败 ({}/{}): {}",
                        step.name,
                        attempt + 1,
                        policy.max_attempts,
                        message
                    );
                    last_error = message;
                }
            }
        }

        Err(ControllerError::RetriesExhausted {
            attempts: policy.max_attempts,
            last: last_error,
        })
    }

    /// 发出一次请求并分类结果
    async fn send_once(&self, url: &str, step: &RestStep) -> Result<Attempt> {
        let token = self.client.token().await?;

        let mut request = self
            .client
            .http_client()
            .request(step.method.clone(), url)
            .header("X-auth-access-token", &token)
            .header("X-Correlation-Id", &step.correlation_id)
            .header("Content-Type", "application/json");

        if let Some(payload) = &step.payload {
            request = request.json(payload);
        }

        let response = match request.send().await {
            Ok(response) => response,
            // 连接失败、超时等传输层错误：瞬时
            Err(e) => return Ok(Attempt::Transient(e.to_string())),
        };

        let status = response.status();
        let status_code = status.as_u16();

        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ControllerError::ParseError(e.to_string()))?;
            let body = if text.trim().is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_str(&text)
                    .map_err(|e| ControllerError::ParseError(format!("{}: {}", e, text)))?
            };
            return Ok(Attempt::Done(StepResponse {
                status: status_code,
                body,
            }));
        }

        let body = response.text().await.unwrap_or_default();

        if status_code == 401 {
            return Ok(Attempt::Unauthorized);
        }
        // 429 为显式限流响应，服务端 5xx 同样视为瞬时
        if status_code == 429 || status.is_server_error() {
            return Ok(Attempt::Transient(format!("HTTP {}: {}", status_code, body)));
        }

        Err(ControllerError::ClientError(status_code, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_delay_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(4000));
        // 超过上限后截断
        assert_eq!(policy.calculate_delay(10), Duration::from_millis(30_000));
    }

    #[test]
    fn test_resolve_path() {
        let step = RestStep::new(
            "interface_update",
            Method::PUT,
            "/devices/devicerecords/{device_id}/physicalinterfaces/{interface_id}",
        )
        .with_param("device_id", "dev-1")
        .with_param("interface_id", "intf-9");

        assert_eq!(
            step.resolve_path().unwrap(),
            "/devices/devicerecords/dev-1/physicalinterfaces/intf-9"
        );
    }

    #[test]
    fn test_resolve_path_missing_param() {
        let step = RestStep::new(
            "device_details",
            Method::GET,
            "/devices/devicerecords/{device_id}",
        );
        assert!(step.resolve_path().is_err());
    }

    #[test]
    fn test_correlation_id_stable_across_clones() {
        let step = RestStep::new("zone_create", Method::POST, "/object/securityzones");
        let replay = step.clone();
        assert_eq!(step.correlation_id, replay.correlation_id);
    }
}
