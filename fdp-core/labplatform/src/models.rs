//! 实验平台数据模型

use serde::{Deserialize, Serialize};

/// 节点运行状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// 已停止
    Stopped,
    /// 运行中
    Running,
    /// 平台返回的其他状态码
    Other(i64),
}

impl NodeStatus {
    /// 从平台状态码转换
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Stopped,
            2 => Self::Running,
            other => Self::Other(other),
        }
    }

    /// 转换为平台状态码
    pub fn code(&self) -> i64 {
        match self {
            Self::Stopped => 0,
            Self::Running => 2,
            Self::Other(code) => *code,
        }
    }
}

/// 节点控制台端点
///
/// 平台在节点详情中以 `telnet://host:port` 形式返回控制台地址；
/// 图形控制台复用同一端口。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEndpoint {
    /// 节点名称
    pub name: String,

    /// 控制台主机
    pub host: String,

    /// 控制台端口
    pub port: u16,
}

impl ConsoleEndpoint {
    /// 从节点详情中的 url 字段解析控制台端点
    ///
    /// 支持 `telnet://host:port` 与 `host:port` 两种形式。
    pub fn parse(name: &str, url: &str) -> Option<Self> {
        let trimmed = url.trim();
        let without_scheme = trimmed
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(trimmed);

        let (host, port) = without_scheme.rsplit_once(':')?;
        let port = port.trim_end_matches('/').parse::<u16>().ok()?;
        if host.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_status_codes() {
        assert_eq!(NodeStatus::from_code(0), NodeStatus::Stopped);
        assert_eq!(NodeStatus::from_code(2), NodeStatus::Running);
        assert_eq!(NodeStatus::from_code(3), NodeStatus::Other(3));
        assert_eq!(NodeStatus::Running.code(), 2);
    }

    #[test]
    fn test_console_endpoint_parse() {
        let ep = ConsoleEndpoint::parse("fw-1", "telnet://192.168.0.119:32769").unwrap();
        assert_eq!(ep.host, "192.168.0.119");
        assert_eq!(ep.port, 32769);

        let ep = ConsoleEndpoint::parse("fw-2", "192.168.0.119:40001").unwrap();
        assert_eq!(ep.port, 40001);

        assert!(ConsoleEndpoint::parse("fw-3", "not-a-url").is_none());
    }
}
