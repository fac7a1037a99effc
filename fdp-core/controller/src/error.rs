//! 管理控制器错误定义

use thiserror::Error;

/// 管理控制器错误类型
#[derive(Error, Debug)]
pub enum ControllerError {
    /// 传输层失败（连接被拒、超时等），属于可重试的瞬时错误
    #[error("HTTP 错误: {0}")]
    HttpError(String),

    #[error("认证错误: {0}")]
    AuthError(String),

    /// 4xx 客户端错误（401 除外）：负载或标识符有误，重试无意义
    #[error("客户端错误 [{0}]: {1}")]
    ClientError(u16, String),

    /// 瞬时错误重试预算耗尽
    #[error("重试耗尽（共 {attempts} 次尝试）: {last}")]
    RetriesExhausted {
        /// 已消耗的尝试次数
        attempts: u32,
        /// 最后一次失败的描述
        last: String,
    },

    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("等待超时: {0}")]
    Timeout(String),

    #[error("操作失败: {0}")]
    OperationFailed(String),
}

/// 管理控制器结果类型
pub type Result<T> = std::result::Result<T, ControllerError>;
