//! 管理控制器数据模型
//!
//! 控制器响应体是松散 JSON，这里只为流水线真正消费的字段
//! 建立类型，其余保持 `serde_json::Value`。

use serde::{Deserialize, Serialize};

/// 设备记录摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// 控制器分配的设备 ID
    pub id: String,

    /// 设备名称
    pub name: String,
}

/// 设备健康与部署状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceHealth {
    /// 健康状态（green / yellow / recovered / red ...）
    pub health_status: String,

    /// 部署状态（DEPLOYED / NOT_DEPLOYED ...）
    pub deployment_status: String,
}

impl DeviceHealth {
    /// 注册是否到达就绪终态
    pub fn is_ready(&self) -> bool {
        let healthy = matches!(
            self.health_status.to_lowercase().as_str(),
            "green" | "yellow" | "recovered"
        );
        healthy && self.deployment_status.to_uppercase() == "DEPLOYED"
    }

    /// 是否处于未部署的不健康状态
    pub fn is_undeployed(&self) -> bool {
        self.health_status.to_lowercase() == "red"
            && self.deployment_status.to_uppercase() == "NOT_DEPLOYED"
    }
}

/// HA 对状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaStatus {
    /// 主设备当前状态（active / standby / failed ...）
    pub primary: String,

    /// 备设备当前状态
    pub secondary: String,

    /// 当前活动设备 ID
    pub active_device_id: Option<String>,

    /// 当前活动设备名称
    pub active_device_name: Option<String>,
}

impl HaStatus {
    /// HA 是否已建立（主 active、备 standby）
    pub fn is_established(&self) -> bool {
        self.primary.to_lowercase() == "active" && self.secondary.to_lowercase() == "standby"
    }

    /// 任一侧是否失败
    pub fn is_failed(&self) -> bool {
        self.primary.to_lowercase() == "failed" || self.secondary.to_lowercase() == "failed"
    }
}

/// 物理接口摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceSummary {
    /// 接口 ID
    pub id: String,

    /// 接口名称（如 GigabitEthernet0/1）
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_health_ready() {
        let health = DeviceHealth {
            health_status: "Green".to_string(),
            deployment_status: "deployed".to_string(),
        };
        assert!(health.is_ready());

        let pending = DeviceHealth {
            health_status: "red".to_string(),
            deployment_status: "NOT_DEPLOYED".to_string(),
        };
        assert!(!pending.is_ready());
        assert!(pending.is_undeployed());
    }

    #[test]
    fn test_ha_status() {
        let ok = HaStatus {
            primary: "Active".to_string(),
            secondary: "Standby".to_string(),
            active_device_id: Some("dev-1".to_string()),
            active_device_name: Some("fw-1".to_string()),
        };
        assert!(ok.is_established());
        assert!(!ok.is_failed());

        let failed = HaStatus {
            primary: "failed".to_string(),
            secondary: "unknown".to_string(),
            active_device_id: None,
            active_device_name: None,
        };
        assert!(failed.is_failed());
    }
}
