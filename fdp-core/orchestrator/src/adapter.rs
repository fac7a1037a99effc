//! 协作方接口的生产实现
//!
//! 把具体客户端（实验平台、管理控制器、RFB 控制台）适配到
//! 流水线的 [`ops`](crate::ops) 接口上，并把各 crate 的错误折算
//! 进编排错误分级。

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fdp_console::{
    ConsoleSession, DeviceProfile, DialogueTiming, OcrReader, PromptAutomaton, RfbTransport,
    SessionConfig,
};
use fdp_controller::{ControllerClient, DeviceHealth, DeviceSummary, HaStatus, InterfaceSummary};
use fdp_labplatform::{ConsoleEndpoint, LabClient, NodeStatus};

use crate::config::TimingSettings;
use crate::error::{OrchestratorError, Result};
use crate::ops::{ConsoleProvisioner, ControllerOps, LabOps};

/// 实验平台适配器
pub struct LabAdapter {
    client: Arc<LabClient>,
    username: String,
    password: String,
}

impl LabAdapter {
    /// 包装实验平台客户端
    pub fn new(client: Arc<LabClient>, username: &str, password: &str) -> Self {
        Self {
            client,
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[async_trait]
impl LabOps for LabAdapter {
    async fn login(&self) -> Result<()> {
        self.client
            .login(&self.username, &self.password)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }

    async fn create_network(&self, name: &str) -> Result<String> {
        self.client
            .network()
            .create_bridge(name)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }

    async fn create_node(&self, payload: &serde_json::Value) -> Result<String> {
        self.client
            .node()
            .create(payload)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }

    async fn start_node(&self, node_id: &str) -> Result<()> {
        self.client
            .node()
            .start(node_id)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }

    async fn node_status(&self, node_id: &str) -> Result<NodeStatus> {
        self.client
            .node()
            .status(node_id)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }

    async fn connect_interfaces(
        &self,
        node_id: &str,
        connections: &HashMap<u32, String>,
    ) -> Result<()> {
        self.client
            .node()
            .connect_interfaces(node_id, connections)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }

    async fn console_endpoint(&self, node_id: &str) -> Result<ConsoleEndpoint> {
        self.client
            .node()
            .console_endpoint(node_id)
            .await
            .map_err(|e| OrchestratorError::LabError(e.to_string()))
    }
}

/// 管理控制器适配器
pub struct ControllerAdapter {
    client: Arc<ControllerClient>,
}

impl ControllerAdapter {
    /// 包装控制器客户端
    pub fn new(client: Arc<ControllerClient>) -> Self {
        Self { client }
    }

    fn map_err(e: fdp_controller::ControllerError) -> OrchestratorError {
        OrchestratorError::ControllerError(e.to_string())
    }
}

#[async_trait]
impl ControllerOps for ControllerAdapter {
    async fn authenticate(&self) -> Result<()> {
        self.client.authenticate().await.map_err(Self::map_err)
    }

    async fn find_access_policy(&self, name: &str) -> Result<String> {
        self.client
            .policies()
            .find_by_name(name)
            .await
            .map_err(Self::map_err)
    }

    async fn register_device(&self, payload: serde_json::Value) -> Result<()> {
        self.client
            .devices()
            .register(payload)
            .await
            .map_err(Self::map_err)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        self.client.devices().list().await.map_err(Self::map_err)
    }

    async fn device_health(&self, device_id: &str) -> Result<DeviceHealth> {
        self.client
            .devices()
            .health(device_id)
            .await
            .map_err(Self::map_err)
    }

    async fn physical_interfaces(&self, device_id: &str) -> Result<Vec<InterfaceSummary>> {
        self.client
            .devices()
            .physical_interfaces(device_id)
            .await
            .map_err(Self::map_err)
    }

    async fn interface_detail(
        &self,
        device_id: &str,
        interface_id: &str,
    ) -> Result<serde_json::Value> {
        self.client
            .devices()
            .interface_detail(device_id, interface_id)
            .await
            .map_err(Self::map_err)
    }

    async fn update_interface(
        &self,
        device_id: &str,
        interface_id: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.client
            .devices()
            .update_interface(device_id, interface_id, payload)
            .await
            .map_err(Self::map_err)
    }

    async fn create_ha_pair(&self, payload: serde_json::Value) -> Result<()> {
        self.client.ha().create(payload).await.map_err(Self::map_err)
    }

    async fn find_ha_pair(&self, name: &str) -> Result<Option<String>> {
        self.client
            .ha()
            .find_by_name(name)
            .await
            .map_err(Self::map_err)
    }

    async fn ha_status(&self, ha_id: &str) -> Result<HaStatus> {
        self.client.ha().status(ha_id).await.map_err(Self::map_err)
    }

    async fn create_zone(&self, name: &str, interface_mode: &str) -> Result<String> {
        self.client
            .zones()
            .create(name, interface_mode)
            .await
            .map_err(Self::map_err)
    }

    async fn create_host_object(&self, name: &str, address: &str) -> Result<String> {
        self.client
            .objects()
            .create_host(name, address)
            .await
            .map_err(Self::map_err)
    }

    async fn find_network_object(&self, name: &str) -> Result<String> {
        self.client
            .objects()
            .find_network_by_name(name)
            .await
            .map_err(Self::map_err)
    }

    async fn create_static_route(
        &self,
        device_id: &str,
        payload: serde_json::Value,
    ) -> Result<Option<String>> {
        self.client
            .routes()
            .create_static(device_id, payload)
            .await
            .map_err(Self::map_err)
    }
}

/// RFB 控制台自动化实现
pub struct RfbConsoleProvisioner {
    /// 诊断输出目录
    diagnostics_dir: PathBuf,

    /// 时间与预算参数
    timing: TimingSettings,
}

impl RfbConsoleProvisioner {
    /// 创建控制台自动化实现
    pub fn new(diagnostics_dir: impl Into<PathBuf>, timing: TimingSettings) -> Self {
        Self {
            diagnostics_dir: diagnostics_dir.into(),
            timing,
        }
    }
}

#[async_trait]
impl ConsoleProvisioner for RfbConsoleProvisioner {
    async fn run_dialogue(
        &self,
        profile: &DeviceProfile,
        endpoint: &ConsoleEndpoint,
        enroll_command: &str,
    ) -> Result<()> {
        let transport = RfbTransport::connect(&endpoint.host, endpoint.port)
            .await
            .map_err(|e| OrchestratorError::ConsoleError(e.to_string()))?;

        let reader = OcrReader::new(&self.diagnostics_dir, &profile.name);

        let dialogue_timing = DialogueTiming {
            tick_interval: Duration::from_secs(self.timing.console_tick_secs),
            settle: Duration::from_secs(self.timing.console_settle_secs),
            boot_tick_budget: self.timing.boot_tick_budget,
            prompt_tick_budget: self.timing.prompt_tick_budget,
        };
        let automaton = PromptAutomaton::new(fdp_console::dialogue::standard_dialogue(
            profile,
            &dialogue_timing,
        ));

        let session_config = SessionConfig {
            tick_interval: dialogue_timing.tick_interval,
            enroll_command: Some(enroll_command.to_string()),
            enroll_prompt: ">".to_string(),
            enroll_tick_budget: self.timing.prompt_tick_budget,
        };

        let mut session = ConsoleSession::new(
            &profile.name,
            Box::new(transport),
            Box::new(reader),
            automaton,
            session_config,
        );

        session
            .run()
            .await
            .map_err(|e| OrchestratorError::ConsoleError(e.to_string()))
    }
}
