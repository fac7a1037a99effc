//! 编排引擎错误定义
//!
//! 错误分级：
//! - `ConfigError` 为致命错误，在任何远程副作用之前中止整个运行
//! - 控制台与阶段级错误是设备/对级别的，记录到结果后运行继续
//! - 汇合与等待超时同样按设备/对处理

use thiserror::Error;

/// 编排引擎错误类型
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 配置缺失或不一致（致命，发生在任何远程操作之前）
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("实验平台错误: {0}")]
    LabError(String),

    /// 控制台自动化失败（设备级），内含失败状态与最后识别文本
    #[error("控制台自动化失败: {0}")]
    ConsoleError(String),

    #[error("控制器错误: {0}")]
    ControllerError(String),

    /// 异步资源未在预算内到达终态（注册、HA 同步等）
    #[error("等待超时: {0}")]
    Timeout(String),

    /// 标识符表只允许追加，重复写入说明阶段被错误地重放
    #[error("标识符冲突: {0}")]
    IdentifierConflict(String),

    #[error("标识符缺失: {0}")]
    IdentifierMissing(String),

    /// worker 任务本身失败（panic 或被取消）
    #[error("worker 失败: {0}")]
    WorkerFailed(String),
}

/// 编排引擎结果类型
pub type Result<T> = std::result::Result<T, OrchestratorError>;
