//! 协作方接口
//!
//! 流水线只通过这三个 trait 访问外部系统：实验平台、管理控制器、
//! 控制台自动化。生产实现见 [`adapter`](crate::adapter)，测试用
//! 内存假实现即可驱动完整流水线。

use async_trait::async_trait;
use std::collections::HashMap;

use fdp_console::DeviceProfile;
use fdp_controller::{DeviceHealth, DeviceSummary, HaStatus, InterfaceSummary};
use fdp_labplatform::{ConsoleEndpoint, NodeStatus};

use crate::error::Result;

/// 实验平台操作
#[async_trait]
pub trait LabOps: Send + Sync {
    /// 登录平台
    async fn login(&self) -> Result<()>;

    /// 创建桥接网络，返回网络 ID
    async fn create_network(&self, name: &str) -> Result<String>;

    /// 创建节点，返回节点 ID
    async fn create_node(&self, payload: &serde_json::Value) -> Result<String>;

    /// 启动节点
    async fn start_node(&self, node_id: &str) -> Result<()>;

    /// 查询节点状态
    async fn node_status(&self, node_id: &str) -> Result<NodeStatus>;

    /// 连接节点接口到网络（接口索引 → 网络 ID）
    async fn connect_interfaces(
        &self,
        node_id: &str,
        connections: &HashMap<u32, String>,
    ) -> Result<()>;

    /// 查询节点控制台端点
    async fn console_endpoint(&self, node_id: &str) -> Result<ConsoleEndpoint>;
}

/// 管理控制器操作
#[async_trait]
pub trait ControllerOps: Send + Sync {
    /// 认证
    async fn authenticate(&self) -> Result<()>;

    /// 按名称查找访问策略 ID
    async fn find_access_policy(&self, name: &str) -> Result<String>;

    /// 提交设备注册
    async fn register_device(&self, payload: serde_json::Value) -> Result<()>;

    /// 查询设备记录列表
    async fn list_devices(&self) -> Result<Vec<DeviceSummary>>;

    /// 查询设备健康与部署状态
    async fn device_health(&self, device_id: &str) -> Result<DeviceHealth>;

    /// 查询设备物理接口列表
    async fn physical_interfaces(&self, device_id: &str) -> Result<Vec<InterfaceSummary>>;

    /// 查询接口完整对象
    async fn interface_detail(
        &self,
        device_id: &str,
        interface_id: &str,
    ) -> Result<serde_json::Value>;

    /// 更新物理接口
    async fn update_interface(
        &self,
        device_id: &str,
        interface_id: &str,
        payload: serde_json::Value,
    ) -> Result<()>;

    /// 提交 HA 对创建
    async fn create_ha_pair(&self, payload: serde_json::Value) -> Result<()>;

    /// 按名称查找 HA 对 ID（创建完成前返回 None）
    async fn find_ha_pair(&self, name: &str) -> Result<Option<String>>;

    /// 查询 HA 对状态
    async fn ha_status(&self, ha_id: &str) -> Result<HaStatus>;

    /// 创建安全区域，返回区域 ID
    async fn create_zone(&self, name: &str, interface_mode: &str) -> Result<String>;

    /// 创建主机对象，返回对象 ID
    async fn create_host_object(&self, name: &str, address: &str) -> Result<String>;

    /// 按名称查找网络对象 ID
    async fn find_network_object(&self, name: &str) -> Result<String>;

    /// 创建静态路由
    async fn create_static_route(
        &self,
        device_id: &str,
        payload: serde_json::Value,
    ) -> Result<Option<String>>;
}

/// 控制台自动化
#[async_trait]
pub trait ConsoleProvisioner: Send + Sync {
    /// 对一台设备执行完整控制台对话
    ///
    /// 失败错误信息中包含失败状态与最后识别文本。
    async fn run_dialogue(
        &self,
        profile: &DeviceProfile,
        endpoint: &ConsoleEndpoint,
        enroll_command: &str,
    ) -> Result<()>;
}
