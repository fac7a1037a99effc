//! 运行配置
//!
//! 一次运行由一个 YAML 配置文件驱动。所有字段在任何设备操作之前
//! 完成校验：缺失、不一致的配置直接以 `ConfigError` 中止，
//! 不产生任何远程副作用。

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use fdp_console::DeviceProfile;

use crate::error::{OrchestratorError, Result};

/// 实验平台设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSettings {
    /// 平台基础 URL
    pub base_url: String,

    /// 实验文件路径
    pub lab_path: String,

    /// 平台用户名
    pub username: String,

    /// 平台密码
    pub password: String,

    /// 节点创建负载模板（name 字段由每台设备覆盖）
    pub node_payload: serde_json::Value,

    /// 管理接口在节点接口列表中的索引
    pub mgmt_interface_index: u32,

    /// 管理网络 ID（实验预置）
    pub mgmt_network_id: String,

    /// HA 故障切换接口索引
    #[serde(default = "default_ha_interface_index")]
    pub ha_interface_index: u32,

    /// HA 同步网络名称（每次运行创建）
    #[serde(default = "default_ha_network_name")]
    pub ha_network_name: String,
}

fn default_ha_interface_index() -> u32 {
    7
}

fn default_ha_network_name() -> String {
    "ha_connection".to_string()
}

/// 管理控制器设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// 控制器基础 URL
    pub base_url: String,

    /// API 用户名
    pub username: String,

    /// API 密码
    pub password: String,

    /// 控制器域
    #[serde(default = "default_domain")]
    pub domain: String,

    /// 注册设备引用的访问策略名称
    pub access_policy: String,

    /// 设备注册密钥（设备与控制器之间的共享秘密）
    pub registration_key: String,

    /// 设备侧可达的控制器管理地址（注册命令使用）
    pub manager_address: String,

    /// 注册命令模板（`{address}` / `{key}` 占位符）
    #[serde(default = "default_enroll_template")]
    pub enroll_command_template: String,
}

fn default_domain() -> String {
    "default".to_string()
}

fn default_enroll_template() -> String {
    "configure manager add {address} {key}".to_string()
}

/// 接口地址
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpec {
    /// IPv4 地址
    pub address: String,

    /// 掩码
    pub netmask: String,
}

/// 设备条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// 控制台初始配置档案
    #[serde(flatten)]
    pub profile: DeviceProfile,

    /// 各物理接口的地址（键为接口名）
    #[serde(default)]
    pub interface_addresses: HashMap<String, AddressSpec>,
}

/// HA 设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaSettings {
    /// HA 对名称
    pub name: String,

    /// 主设备名
    pub primary: String,

    /// 备设备名
    pub secondary: String,

    /// 故障切换物理接口名（不参与通用接口阶段）
    pub failover_interface: String,

    /// 故障切换链路逻辑名
    #[serde(default = "default_failover_name")]
    pub logical_name: String,

    /// 主设备故障切换链路地址
    pub primary_ip: String,

    /// 备设备故障切换链路地址
    pub secondary_ip: String,

    /// 故障切换链路掩码
    pub netmask: String,
}

fn default_failover_name() -> String {
    "HA-LINK".to_string()
}

/// 安全区域条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneEntry {
    /// 区域名称
    pub name: String,

    /// 接口模式
    #[serde(default = "default_interface_mode")]
    pub interface_mode: String,
}

fn default_interface_mode() -> String {
    "ROUTED".to_string()
}

/// 接口规划条目
///
/// `zone_index` 指向 `zones` 列表的位置；`zone_name` 可选，仅用于
/// 交叉校验，名实不符按致命配置错误处理，绝不猜测意图。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfacePlan {
    /// 物理接口名
    pub name: String,

    /// 逻辑接口名
    pub ifname: String,

    /// 目标安全区域在 zones 列表中的索引
    pub zone_index: usize,

    /// 目标安全区域名称（可选交叉校验）
    #[serde(default)]
    pub zone_name: Option<String>,
}

/// 路由设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSettings {
    /// 路由名称
    #[serde(default = "default_route_name")]
    pub route_name: String,

    /// 网关主机对象名称前缀（按设备追加后缀保证唯一）
    #[serde(default = "default_gateway_prefix")]
    pub gateway_object_prefix: String,

    /// 目的网络对象名称（控制器内置）
    #[serde(default = "default_network_object")]
    pub network_object: String,

    /// 出接口逻辑名
    pub egress_ifname: String,

    /// 路由度量
    #[serde(default = "default_metric")]
    pub metric: u32,
}

fn default_route_name() -> String {
    "default-route".to_string()
}

fn default_gateway_prefix() -> String {
    "gw".to_string()
}

fn default_network_object() -> String {
    "any-ipv4".to_string()
}

fn default_metric() -> u32 {
    1
}

/// 时间与预算参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// 控制台轮询间隔（秒）
    #[serde(default = "default_console_tick")]
    pub console_tick_secs: u64,

    /// 控制台注入后静置（秒）
    #[serde(default = "default_console_settle")]
    pub console_settle_secs: u64,

    /// 启动提示轮询预算
    #[serde(default = "default_boot_budget")]
    pub boot_tick_budget: u32,

    /// 普通提示轮询预算
    #[serde(default = "default_prompt_budget")]
    pub prompt_tick_budget: u32,

    /// 节点启动状态轮询次数
    #[serde(default = "default_node_start_attempts")]
    pub node_start_attempts: u32,

    /// 节点启动状态轮询间隔（秒）
    #[serde(default = "default_node_start_poll")]
    pub node_start_poll_secs: u64,

    /// 设备记录出现的轮询间隔（秒）
    #[serde(default = "default_record_poll")]
    pub record_poll_secs: u64,

    /// 设备记录出现的等待预算（秒）
    #[serde(default = "default_record_wait")]
    pub record_wait_secs: u64,

    /// 健康/部署状态轮询间隔（秒）
    #[serde(default = "default_health_poll")]
    pub health_poll_secs: u64,

    /// 健康/部署状态等待预算（秒）
    #[serde(default = "default_health_wait")]
    pub health_wait_secs: u64,

    /// HA 状态轮询间隔（秒）
    #[serde(default = "default_ha_poll")]
    pub ha_poll_secs: u64,

    /// HA 建立等待预算（秒）
    #[serde(default = "default_ha_wait")]
    pub ha_wait_secs: u64,

    /// worker 数量上限（默认与设备数相同）
    #[serde(default)]
    pub worker_cap: Option<usize>,
}

fn default_console_tick() -> u64 {
    5
}
fn default_console_settle() -> u64 {
    2
}
fn default_boot_budget() -> u32 {
    120
}
fn default_prompt_budget() -> u32 {
    36
}
fn default_node_start_attempts() -> u32 {
    10
}
fn default_node_start_poll() -> u64 {
    5
}
fn default_record_poll() -> u64 {
    10
}
fn default_record_wait() -> u64 {
    600
}
fn default_health_poll() -> u64 {
    30
}
fn default_health_wait() -> u64 {
    1800
}
fn default_ha_poll() -> u64 {
    10
}
fn default_ha_wait() -> u64 {
    1800
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            console_tick_secs: default_console_tick(),
            console_settle_secs: default_console_settle(),
            boot_tick_budget: default_boot_budget(),
            prompt_tick_budget: default_prompt_budget(),
            node_start_attempts: default_node_start_attempts(),
            node_start_poll_secs: default_node_start_poll(),
            record_poll_secs: default_record_poll(),
            record_wait_secs: default_record_wait(),
            health_poll_secs: default_health_poll(),
            health_wait_secs: default_health_wait(),
            ha_poll_secs: default_ha_poll(),
            ha_wait_secs: default_ha_wait(),
            worker_cap: None,
        }
    }
}

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 实验平台设置
    pub lab: LabSettings,

    /// 管理控制器设置
    pub controller: ControllerSettings,

    /// 设备列表
    pub devices: Vec<DeviceEntry>,

    /// HA 设置（缺省则不配对）
    #[serde(default)]
    pub ha: Option<HaSettings>,

    /// 安全区域列表（顺序即 zone_index 语义）
    pub zones: Vec<ZoneEntry>,

    /// 接口规划
    pub interfaces: Vec<InterfacePlan>,

    /// 路由设置
    pub route: RouteSettings,

    /// 时间与预算参数
    #[serde(default)]
    pub timing: TimingSettings,

    /// 诊断输出目录（控制台截图等）
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: String,
}

fn default_diagnostics_dir() -> String {
    "./diagnostics".to_string()
}

impl RunConfig {
    /// 从 YAML 文件加载并校验
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OrchestratorError::ConfigError(format!("读取配置文件 {:?} 失败: {}", path, e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// 从 YAML 字符串加载并校验
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| OrchestratorError::ConfigError(format!("解析配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置一致性
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(OrchestratorError::ConfigError(msg));

        if self.devices.is_empty() {
            return fail("设备列表为空".to_string());
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            let p = &device.profile;
            if !names.insert(p.name.clone()) {
                return fail(format!("设备名重复: {}", p.name));
            }
            for (field, value) in [
                ("mgmt_ip", &p.mgmt_ip),
                ("netmask", &p.netmask),
                ("gateway", &p.gateway),
                ("hostname", &p.hostname),
                ("admin_password", &p.admin_password),
            ] {
                if value.is_empty() {
                    return fail(format!("设备 {} 缺少 {}", p.name, field));
                }
            }
        }

        if self.zones.is_empty() {
            return fail("安全区域列表为空".to_string());
        }
        let mut zone_names = HashSet::new();
        for zone in &self.zones {
            if !zone_names.insert(zone.name.clone()) {
                return fail(format!("安全区域名重复: {}", zone.name));
            }
        }

        // zone_index 与 zone_name 的交叉校验：名实不符即失败，不猜测
        for plan in &self.interfaces {
            let zone = match self.zones.get(plan.zone_index) {
                Some(zone) => zone,
                None => {
                    return fail(format!(
                        "接口 {} 的 zone_index {} 超出区域列表（共 {} 个）",
                        plan.name,
                        plan.zone_index,
                        self.zones.len()
                    ))
                }
            };
            if let Some(expected) = &plan.zone_name {
                if expected != &zone.name {
                    return fail(format!(
                        "接口 {} 的 zone_index {} 指向区域 {}，与 zone_name {} 不一致",
                        plan.name, plan.zone_index, zone.name, expected
                    ));
                }
            }
        }

        // 每台设备必须为每个规划接口提供地址
        for device in &self.devices {
            for plan in &self.interfaces {
                if !device.interface_addresses.contains_key(&plan.name) {
                    return fail(format!(
                        "设备 {} 缺少接口 {} 的地址",
                        device.profile.name, plan.name
                    ));
                }
            }
        }

        if !self
            .interfaces
            .iter()
            .any(|plan| plan.ifname == self.route.egress_ifname)
        {
            return fail(format!(
                "路由出接口 {} 不在接口规划中",
                self.route.egress_ifname
            ));
        }

        if let Some(ha) = &self.ha {
            if ha.primary == ha.secondary {
                return fail("HA 主备不能是同一台设备".to_string());
            }
            for member in [&ha.primary, &ha.secondary] {
                if !names.contains(member) {
                    return fail(format!("HA 成员 {} 不在设备列表中", member));
                }
            }
            // 故障切换接口由 HA 引导负载专用，不得进入通用接口阶段
            if self
                .interfaces
                .iter()
                .any(|plan| plan.name == ha.failover_interface)
            {
                return fail(format!(
                    "故障切换接口 {} 不能出现在接口规划中",
                    ha.failover_interface
                ));
            }
        }

        if let Some(cap) = self.timing.worker_cap {
            if cap == 0 {
                return fail("worker_cap 必须大于 0".to_string());
            }
        }

        Ok(())
    }

    /// 按设备名查找设备条目
    pub fn device(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices.iter().find(|d| d.profile.name == name)
    }

    /// 构建设备侧的管理器注册命令
    pub fn enroll_command(&self) -> String {
        self.controller
            .enroll_command_template
            .replace("{address}", &self.controller.manager_address)
            .replace("{key}", &self.controller.registration_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_yaml() -> String {
        r#"
lab:
  base_url: "https://192.168.0.119"
  lab_path: "deploy/firewalls.unl"
  username: admin
  password: lab-pass
  node_payload:
    type: qemu
    template: firewall
    count: 1
  mgmt_interface_index: 0
  mgmt_network_id: "21"

controller:
  base_url: "https://192.168.0.201"
  username: api-user
  password: api-pass
  access_policy: Initial_policy
  registration_key: regkey42
  manager_address: "192.168.0.201"

devices:
  - name: fw-1
    mgmt_ip: 192.168.0.31
    netmask: 255.255.255.0
    gateway: 192.168.0.1
    hostname: fw-1.lab.local
    dns: 192.168.0.10
    domain: lab.local
    admin_password: "S3cret!"
    interface_addresses:
      GigabitEthernet0/0: { address: 10.0.0.1, netmask: 255.255.255.0 }
      GigabitEthernet0/1: { address: 10.0.1.1, netmask: 255.255.255.0 }
  - name: fw-2
    mgmt_ip: 192.168.0.32
    netmask: 255.255.255.0
    gateway: 192.168.0.1
    hostname: fw-2.lab.local
    dns: 192.168.0.10
    domain: lab.local
    admin_password: "S3cret!"
    interface_addresses:
      GigabitEthernet0/0: { address: 10.0.0.2, netmask: 255.255.255.0 }
      GigabitEthernet0/1: { address: 10.0.1.2, netmask: 255.255.255.0 }

zones:
  - name: OUTSIDE
  - name: INSIDE

interfaces:
  - name: GigabitEthernet0/0
    ifname: outside
    zone_index: 0
    zone_name: OUTSIDE
  - name: GigabitEthernet0/1
    ifname: inside
    zone_index: 1

route:
  egress_ifname: outside
"#
        .to_string()
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = RunConfig::from_yaml_str(&sample_yaml()).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.zones.len(), 2);
        assert_eq!(config.timing.record_wait_secs, 600);
        assert_eq!(
            config.enroll_command(),
            "configure manager add 192.168.0.201 regkey42"
        );
    }

    #[test]
    fn test_zone_index_out_of_range() {
        let yaml = sample_yaml().replace("zone_index: 1", "zone_index: 5");
        let err = RunConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, OrchestratorError::ConfigError(_)));
    }

    #[test]
    fn test_zone_name_mismatch_is_fatal() {
        // 索引 0 指向 OUTSIDE，却声明 zone_name 为 INSIDE：不猜测，直接失败
        let yaml = sample_yaml().replace("zone_name: OUTSIDE", "zone_name: INSIDE");
        let err = RunConfig::from_yaml_str(&yaml).unwrap_err();
        match err {
            OrchestratorError::ConfigError(msg) => assert!(msg.contains("不一致")),
            other => panic!("期望 ConfigError，得到 {:?}", other),
        }
    }

    #[test]
    fn test_missing_interface_address() {
        let yaml = sample_yaml().replace(
            "      GigabitEthernet0/1: { address: 10.0.1.2, netmask: 255.255.255.0 }\n",
            "",
        );
        assert!(RunConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_duplicate_device_name() {
        let yaml = sample_yaml().replace("name: fw-2", "name: fw-1");
        assert!(RunConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_ha_failover_interface_excluded_from_plan() {
        let yaml = format!(
            "{}\nha:\n  name: fw-ha\n  primary: fw-1\n  secondary: fw-2\n  failover_interface: GigabitEthernet0/1\n  primary_ip: 172.16.0.1\n  secondary_ip: 172.16.0.2\n  netmask: 255.255.255.252\n",
            sample_yaml()
        );
        // G0/1 在接口规划中，作为故障切换接口必须被拒绝
        let err = RunConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, OrchestratorError::ConfigError(_)));
    }

    #[test]
    fn test_route_egress_must_exist() {
        let yaml = sample_yaml().replace("egress_ifname: outside", "egress_ifname: dmz");
        assert!(RunConfig::from_yaml_str(&yaml).is_err());
    }
}
