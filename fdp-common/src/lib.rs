//! FDP 通用类型定义
//!
//! 此 crate 包含编排引擎、控制台自动化与各 REST 客户端之间共享的类型。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 部署流水线阶段
///
/// 阶段顺序即依赖顺序：同一设备上，后一阶段必须等待前一阶段
/// 产生终态结果后才能开始。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 实验平台节点创建与启动
    NodeCreate,
    /// 控制台初始配置
    ConsoleSetup,
    /// 注册到管理控制器
    Register,
    /// HA 配对
    HaPair,
    /// 安全区域创建
    SecurityZones,
    /// 接口配置
    Interfaces,
    /// 网关对象与默认路由
    Routing,
}

impl Stage {
    /// 阶段的显示名称（用于报告与日志）
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeCreate => "node_create",
            Self::ConsoleSetup => "console_setup",
            Self::Register => "register",
            Self::HaPair => "ha_pair",
            Self::SecurityZones => "security_zones",
            Self::Interfaces => "interfaces",
            Self::Routing => "routing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 设备生命周期状态
///
/// `Failed` 为吸收态：设备一旦失败即退出后续所有阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// 节点已在实验平台创建
    Created,
    /// 控制台初始配置完成，管理地址可达
    ConsoleConfigured,
    /// 已在管理控制器注册
    Registered,
    /// HA 配对完成
    HaPaired,
    /// 安全区域阶段完成
    Zoned,
    /// 接口配置完成
    Interfaced,
    /// 路由配置完成
    Routed,
    /// 全部阶段完成
    Ready,
    /// 失败（吸收态）
    Failed,
}

impl DeviceState {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// 阶段结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// 成功
    Success,

    /// 失败
    Failed,

    /// 跳过（前置阶段失败导致）
    Skipped,
}

/// 控制器分配的资源类别
///
/// 与设备名一起构成标识符表的键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// 实验平台节点 ID
    LabNode,
    /// 实验平台网络 ID
    LabNetwork,
    /// 实验平台控制台端口
    ConsolePort,
    /// 控制器设备记录 ID
    Device,
    /// HA 故障切换接口 ID
    FailoverInterface,
    /// HA 对 ID
    HaPair,
    /// 安全区域 ID
    SecurityZone,
    /// 物理接口 ID
    Interface,
    /// 网关主机对象 ID
    HostObject,
    /// 静态路由 ID
    StaticRoute,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_name() {
        assert_eq!(Stage::NodeCreate.name(), "node_create");
        assert_eq!(Stage::HaPair.to_string(), "ha_pair");
    }

    #[test]
    fn test_device_state_terminal() {
        assert!(DeviceState::Ready.is_terminal());
        assert!(DeviceState::Failed.is_terminal());
        assert!(!DeviceState::Registered.is_terminal());
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Stage::SecurityZones).unwrap();
        assert_eq!(json, "\"security_zones\"");
        let status: OutcomeStatus = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(status, OutcomeStatus::Skipped);
    }
}
