//! 控制台自动化错误定义

use thiserror::Error;

/// 控制台自动化错误类型
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("连接失败: {0}")]
    ConnectionFailed(String),

    #[error("发送失败: {0}")]
    SendFailed(String),

    #[error("接收失败: {0}")]
    ReceiveFailed(String),

    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("屏幕捕获失败: {0}")]
    CaptureFailed(String),

    #[error("提示超时: 状态 {state}，最后识别文本: {last_seen:?}")]
    PromptTimeout {
        /// 超时时所处的状态
        state: String,
        /// 最后一次识别到的屏幕文本
        last_seen: String,
    },
}

/// 控制台自动化结果类型
pub type Result<T> = std::result::Result<T, ConsoleError>;
