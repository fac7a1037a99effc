//! 配置流水线引擎
//!
//! 按固定阶段序执行部署：每个阶段从标识符表解析输入，并把产出的
//! 标识符写回表中。阶段 2–3 按设备扇出并在阶段 4 之前汇合；
//! 阶段 4–8 在每个 HA 组内单线程推进，仅接口配置按设备扇出。
//!
//! 失败策略：
//! - 控制台失败的设备退出后续所有阶段，但不中止其他设备
//! - HA 配对失败只影响该对的故障切换接口，基础配置照常进行
//! - 所有失败都进入运行报告，绝不静默吞掉

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use fdp_common::{DeviceState, OutcomeStatus, ResourceKind, Stage};
use fdp_labplatform::NodeStatus;

use crate::context::RunContext;
use crate::coordinator::Coordinator;
use crate::error::{OrchestratorError, Result};
use crate::ops::{ConsoleProvisioner, ControllerOps, LabOps};
use crate::report::{RunReport, StageOutcome};

/// 阶段 2–3 worker 的汇总结果
struct ProvisionResult {
    /// 按尝试顺序记录的阶段结果
    outcomes: Vec<StageOutcome>,

    /// 控制台配置是否成功（进入阶段 4 的门槛）
    configured: bool,
}

/// 配置流水线引擎
pub struct PipelineEngine {
    ctx: Arc<RunContext>,
    lab: Arc<dyn LabOps>,
    controller: Arc<dyn ControllerOps>,
    console: Arc<dyn ConsoleProvisioner>,
    coordinator: Coordinator,
}

impl PipelineEngine {
    /// 创建流水线引擎
    ///
    /// worker 池容量默认取设备数，可由配置封顶。
    pub fn new(
        ctx: Arc<RunContext>,
        lab: Arc<dyn LabOps>,
        controller: Arc<dyn ControllerOps>,
        console: Arc<dyn ConsoleProvisioner>,
    ) -> Self {
        let device_count = ctx.config.devices.len().max(1);
        let cap = ctx
            .config
            .timing
            .worker_cap
            .map(|cap| cap.min(device_count))
            .unwrap_or(device_count);

        Self {
            ctx,
            lab,
            controller,
            console,
            coordinator: Coordinator::new(cap),
        }
    }

    /// 执行完整流水线
    ///
    /// 仅认证（阶段 1）失败会使整个运行出错返回；其余失败都
    /// 落入报告，运行对未受影响的设备继续。
    pub async fn run(&self) -> Result<RunReport> {
        let config = &self.ctx.config;
        let device_names: Vec<String> = config
            .devices
            .iter()
            .map(|d| d.profile.name.clone())
            .collect();
        let mut report = RunReport::new(&device_names);

        info!("部署开始: {} 台设备", device_names.len());

        // 阶段 1：认证
        self.lab.login().await?;
        self.controller.authenticate().await?;

        // HA 同步网络每次运行创建一次
        if config.ha.is_some() {
            let name = config.lab.ha_network_name.clone();
            let network_id = self.lab.create_network(&name).await?;
            self.ctx
                .ids
                .insert(&name, ResourceKind::LabNetwork, &network_id)
                .await?;
        }

        // 阶段 2–3：节点创建 + 控制台配置，按设备扇出后汇合
        let configured = self.provision_stage(&device_names, &mut report).await;
        info!(
            "控制台配置完成: {}/{} 台设备可进入注册",
            configured.len(),
            device_names.len()
        );

        // 阶段 4：注册并轮询至就绪
        let registered = self.register_stage(&configured, &mut report).await;
        if registered.is_empty() {
            // 没有设备进入控制器阶段，不创建任何全局资源
            warn!("没有设备完成注册，控制器配置阶段全部跳过");
            self.attach_identifiers(&device_names, &mut report).await;
            report.finalize();
            return Ok(report);
        }

        // 阶段 5：HA 配对（按对失败隔离）
        self.ha_stage(&registered, &mut report).await;

        // 阶段 6：安全区域（控制器全局，只创建一轮）
        let zone_ids = match self.zone_stage(&registered, &mut report).await {
            Some(zone_ids) => zone_ids,
            None => {
                // 区域失败导致接口/路由无从谈起
                for device in &registered {
                    report.skip_remaining(
                        device,
                        &[Stage::Interfaces, Stage::Routing],
                        "安全区域创建失败",
                    );
                }
                report.finalize();
                return Ok(report);
            }
        };

        // 阶段 7：接口配置，按设备扇出
        let interfaced = self
            .interface_stage(&registered, &zone_ids, &mut report)
            .await;

        // 阶段 8：网关对象与默认路由，顺序执行
        self.route_stage(&interfaced, &mut report).await;

        // 终态整理
        for device in &device_names {
            if report.state(device) == Some(DeviceState::Routed) {
                report.set_state(device, DeviceState::Ready);
            }
        }
        self.attach_identifiers(&device_names, &mut report).await;
        report.finalize();

        let failures = report.failures().len();
        if failures > 0 {
            warn!("部署结束: {} 条失败记录", failures);
        } else {
            info!("部署结束: 全部成功");
        }
        Ok(report)
    }

    /// 阶段 2–3：按设备创建节点并执行控制台配置
    ///
    /// 返回控制台配置成功的设备集合（保持配置文件中的顺序）。
    async fn provision_stage(
        &self,
        device_names: &[String],
        report: &mut RunReport,
    ) -> Vec<String> {
        let ctx = Arc::clone(&self.ctx);
        let lab = Arc::clone(&self.lab);
        let console = Arc::clone(&self.console);

        let outcomes = self
            .coordinator
            .run_per_device(device_names.to_vec(), move |device| {
                let ctx = Arc::clone(&ctx);
                let lab = Arc::clone(&lab);
                let console = Arc::clone(&console);
                async move { Self::provision_device(ctx, lab, console, device).await }
            })
            .await;

        let mut configured = Vec::new();
        for device in device_names {
            match outcomes.get(device) {
                Some(Ok(result)) => {
                    for outcome in &result.outcomes {
                        report.record(device, outcome.clone());
                    }
                    if result.configured {
                        report.set_state(device, DeviceState::ConsoleConfigured);
                        configured.push(device.clone());
                    } else {
                        report.set_state(device, DeviceState::Failed);
                        self.skip_after_console(device, report);
                    }
                }
                Some(Err(e)) => {
                    report.record(
                        device,
                        StageOutcome::failed(Stage::NodeCreate, e.to_string()),
                    );
                    report.set_state(device, DeviceState::Failed);
                    self.skip_after_console(device, report);
                }
                None => {
                    report.record(
                        device,
                        StageOutcome::failed(
                            Stage::NodeCreate,
                            "worker 异常退出，未返回结果".to_string(),
                        ),
                    );
                    report.set_state(device, DeviceState::Failed);
                    self.skip_after_console(device, report);
                }
            }
        }
        configured
    }

    /// 标记控制台失败设备的后续阶段为跳过
    fn skip_after_console(&self, device: &str, report: &mut RunReport) {
        let mut stages = vec![Stage::Register];
        if self.is_ha_member(device) {
            stages.push(Stage::HaPair);
        }
        stages.push(Stage::Interfaces);
        stages.push(Stage::Routing);
        report.skip_remaining(device, &stages, "控制台配置未完成");
    }

    fn is_ha_member(&self, device: &str) -> bool {
        self.ctx
            .config
            .ha
            .as_ref()
            .map(|ha| ha.primary == device || ha.secondary == device)
            .unwrap_or(false)
    }

    /// 单设备的节点创建 + 控制台配置（worker 内执行）
    async fn provision_device(
        ctx: Arc<RunContext>,
        lab: Arc<dyn LabOps>,
        console: Arc<dyn ConsoleProvisioner>,
        device: String,
    ) -> Result<ProvisionResult> {
        let mut outcomes = Vec::new();

        let node_id = match Self::create_and_start_node(&ctx, &lab, &device).await {
            Ok(node_id) => {
                outcomes.push(StageOutcome::success(
                    Stage::NodeCreate,
                    Some(format!("节点 {}", node_id)),
                ));
                node_id
            }
            Err(e) => {
                outcomes.push(StageOutcome::failed(Stage::NodeCreate, e.to_string()));
                return Ok(ProvisionResult {
                    outcomes,
                    configured: false,
                });
            }
        };

        match Self::configure_console(&ctx, &lab, &console, &device, &node_id).await {
            Ok(()) => {
                outcomes.push(StageOutcome::success(Stage::ConsoleSetup, None));
                Ok(ProvisionResult {
                    outcomes,
                    configured: true,
                })
            }
            Err(e) => {
                // 失败结果携带最后识别文本（含在错误信息中）
                outcomes.push(StageOutcome::failed(Stage::ConsoleSetup, e.to_string()));
                Ok(ProvisionResult {
                    outcomes,
                    configured: false,
                })
            }
        }
    }

    /// 创建节点、连接接口并等待节点进入运行态
    async fn create_and_start_node(
        ctx: &RunContext,
        lab: &Arc<dyn LabOps>,
        device: &str,
    ) -> Result<String> {
        let config = &ctx.config;

        let mut payload = config.lab.node_payload.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "name".to_string(),
                serde_json::Value::String(device.to_string()),
            );
        }

        let node_id = lab.create_node(&payload).await?;
        ctx.ids
            .insert(device, ResourceKind::LabNode, &node_id)
            .await?;
        info!("设备 {} 节点创建成功: {}", device, node_id);

        // 管理网络 + （HA 成员）故障切换网络
        let mut connections = HashMap::new();
        connections.insert(
            config.lab.mgmt_interface_index,
            config.lab.mgmt_network_id.clone(),
        );
        let is_member = config
            .ha
            .as_ref()
            .map(|ha| ha.primary == device || ha.secondary == device)
            .unwrap_or(false);
        if is_member {
            if let Some(network_id) = ctx
                .ids
                .get(&config.lab.ha_network_name, ResourceKind::LabNetwork)
                .await
            {
                connections.insert(config.lab.ha_interface_index, network_id);
            }
        }
        lab.connect_interfaces(&node_id, &connections).await?;

        // 启动并轮询至运行态；观察到停止态时补发一次启动
        lab.start_node(&node_id).await?;
        let poll = Duration::from_secs(config.timing.node_start_poll_secs);
        for attempt in 0..config.timing.node_start_attempts {
            match lab.node_status(&node_id).await? {
                NodeStatus::Running => return Ok(node_id),
                NodeStatus::Stopped => {
                    warn!(
                        "设备 {} 节点处于停止态，补发启动 ({}/{})",
                        device,
                        attempt + 1,
                        config.timing.node_start_attempts
                    );
                    lab.start_node(&node_id).await?;
                }
                NodeStatus::Other(code) => {
                    info!("设备 {} 节点状态码 {}，继续等待", device, code);
                }
            }
            tokio::time::sleep(poll).await;
        }

        Err(OrchestratorError::Timeout(format!(
            "设备 {} 节点未在预算内进入运行态",
            device
        )))
    }

    /// 解析控制台端点并执行对话
    async fn configure_console(
        ctx: &RunContext,
        lab: &Arc<dyn LabOps>,
        console: &Arc<dyn ConsoleProvisioner>,
        device: &str,
        node_id: &str,
    ) -> Result<()> {
        let endpoint = lab.console_endpoint(node_id).await?;
        ctx.ids
            .insert(
                device,
                ResourceKind::ConsolePort,
                &format!("{}:{}", endpoint.host, endpoint.port),
            )
            .await?;

        let entry = ctx
            .config
            .device(device)
            .ok_or_else(|| OrchestratorError::ConfigError(format!("未知设备 {}", device)))?;

        console
            .run_dialogue(&entry.profile, &endpoint, &ctx.config.enroll_command())
            .await
    }

    /// 阶段 4：注册到管理控制器并轮询至就绪
    ///
    /// 返回注册成功的设备集合。
    async fn register_stage(
        &self,
        configured: &[String],
        report: &mut RunReport,
    ) -> Vec<String> {
        if configured.is_empty() {
            return Vec::new();
        }
        let config = &self.ctx.config;
        let timing = &config.timing;

        // 访问策略按名称解析一次，写入每台设备的注册负载
        let policy_id = match self
            .controller
            .find_access_policy(&config.controller.access_policy)
            .await
        {
            Ok(policy_id) => policy_id,
            Err(e) => {
                for device in configured {
                    report.record(
                        device,
                        StageOutcome::failed(
                            Stage::Register,
                            format!("访问策略解析失败: {}", e),
                        ),
                    );
                    report.set_state(device, DeviceState::Failed);
                    self.skip_post_register(device, report);
                }
                return Vec::new();
            }
        };

        // 提交注册
        let mut submitted = Vec::new();
        for device in configured {
            let Some(entry) = config.device(device) else {
                continue;
            };
            let payload = serde_json::json!({
                "type": "Device",
                "name": device,
                "hostName": entry.profile.mgmt_ip,
                "regKey": config.controller.registration_key,
                "accessPolicy": { "id": policy_id, "type": "AccessPolicy" },
            });

            match self.controller.register_device(payload).await {
                Ok(()) => submitted.push(device.clone()),
                Err(e) => {
                    report.record(device, StageOutcome::failed(Stage::Register, e.to_string()));
                    report.set_state(device, DeviceState::Failed);
                    self.skip_post_register(device, report);
                }
            }
        }

        // 等待设备出现在设备记录中（注册在控制器侧是异步的）
        let mut missing: HashSet<String> = submitted.iter().cloned().collect();
        let record_budget = Duration::from_secs(timing.record_wait_secs);
        let record_poll = Duration::from_secs(timing.record_poll_secs);
        let start = Instant::now();
        loop {
            match self.controller.list_devices().await {
                Ok(records) => {
                    for record in records {
                        if missing.contains(&record.name) {
                            if self
                                .ctx
                                .ids
                                .insert(&record.name, ResourceKind::Device, &record.id)
                                .await
                                .is_ok()
                            {
                                missing.remove(&record.name);
                            }
                        }
                    }
                }
                Err(e) => warn!("设备记录查询失败: {}", e),
            }
            if missing.is_empty() || start.elapsed() >= record_budget {
                break;
            }
            tokio::time::sleep(record_poll).await;
        }

        for device in &missing {
            report.record(
                device,
                StageOutcome::failed(
                    Stage::Register,
                    format!("设备未在 {} 秒内出现在设备记录中", timing.record_wait_secs),
                ),
            );
            report.set_state(device, DeviceState::Failed);
            self.skip_post_register(device, report);
        }

        // 轮询健康/部署状态直至就绪
        let with_records: Vec<String> = submitted
            .iter()
            .filter(|d| !missing.contains(*d))
            .cloned()
            .collect();
        let mut ready: HashSet<String> = HashSet::new();
        let health_budget = Duration::from_secs(timing.health_wait_secs);
        let health_poll = Duration::from_secs(timing.health_poll_secs);
        let start = Instant::now();
        loop {
            for device in &with_records {
                if ready.contains(device) {
                    continue;
                }
                let Some(device_id) = self.ctx.ids.get(device, ResourceKind::Device).await else {
                    continue;
                };
                match self.controller.device_health(&device_id).await {
                    Ok(health) => {
                        if health.is_ready() {
                            ready.insert(device.clone());
                        } else if health.is_undeployed() {
                            info!("设备 {} 尚未部署，继续等待", device);
                        }
                    }
                    Err(e) => warn!("设备 {} 状态查询失败: {}", device, e),
                }
            }
            if ready.len() == with_records.len() || start.elapsed() >= health_budget {
                break;
            }
            tokio::time::sleep(health_poll).await;
        }

        let mut registered = Vec::new();
        for device in &with_records {
            if ready.contains(device) {
                let detail = self.ctx.ids.get(device, ResourceKind::Device).await;
                report.record(device, StageOutcome::success(Stage::Register, detail));
                report.set_state(device, DeviceState::Registered);
                registered.push(device.clone());
            } else {
                report.record(
                    device,
                    StageOutcome::failed(
                        Stage::Register,
                        format!("设备未在 {} 秒内进入就绪状态", timing.health_wait_secs),
                    ),
                );
                report.set_state(device, DeviceState::Failed);
                self.skip_post_register(device, report);
            }
        }
        registered
    }

    /// 标记注册失败设备的后续阶段为跳过
    fn skip_post_register(&self, device: &str, report: &mut RunReport) {
        let mut stages = Vec::new();
        if self.is_ha_member(device) {
            stages.push(Stage::HaPair);
        }
        stages.push(Stage::Interfaces);
        stages.push(Stage::Routing);
        report.skip_remaining(device, &stages, "注册未完成");
    }

    /// 阶段 5：HA 配对
    ///
    /// 失败是按对的：配对失败的两台设备仍参与区域/接口/路由的
    /// 基础配置（故障切换接口在配置校验时就被排除在通用接口之外）。
    async fn ha_stage(&self, registered: &[String], report: &mut RunReport) {
        let Some(ha) = self.ctx.config.ha.clone() else {
            return;
        };

        let members = [ha.primary.clone(), ha.secondary.clone()];
        let absent: Vec<&String> = members
            .iter()
            .filter(|m| !registered.contains(m))
            .collect();
        if !absent.is_empty() {
            for member in &members {
                if registered.contains(member) {
                    report.record(
                        member,
                        StageOutcome {
                            stage: Stage::HaPair,
                            status: OutcomeStatus::Skipped,
                            detail: Some(format!("HA 成员 {:?} 未就绪", absent)),
                            error: None,
                        },
                    );
                }
            }
            return;
        }

        match self.pair_devices(&ha).await {
            Ok(ha_id) => {
                for member in &members {
                    report.record(
                        member,
                        StageOutcome::success(Stage::HaPair, Some(ha_id.clone())),
                    );
                    report.set_state(member, DeviceState::HaPaired);
                }
            }
            Err(e) => {
                warn!("HA 对 {} 配置失败: {}", ha.name, e);
                for member in &members {
                    report.record(member, StageOutcome::failed(Stage::HaPair, e.to_string()));
                    // 配对失败不触发设备级失败：基础配置继续
                }
            }
        }
    }

    /// 提交 HA 配对并轮询至建立
    async fn pair_devices(&self, ha: &crate::config::HaSettings) -> Result<String> {
        let timing = &self.ctx.config.timing;

        // 故障切换接口 ID 来自两台成员设备的接口列表
        let mut failover_ids = HashMap::new();
        for member in [&ha.primary, &ha.secondary] {
            let device_id = self.ctx.ids.require(member, ResourceKind::Device).await?;
            let interfaces = self.controller.physical_interfaces(&device_id).await?;
            let interface = interfaces
                .iter()
                .find(|i| i.name == ha.failover_interface)
                .ok_or_else(|| {
                    OrchestratorError::ControllerError(format!(
                        "设备 {} 没有接口 {}",
                        member, ha.failover_interface
                    ))
                })?;
            self.ctx
                .ids
                .insert(member, ResourceKind::FailoverInterface, &interface.id)
                .await?;
            failover_ids.insert(member.clone(), interface.id.clone());
        }

        let primary_id = self.ctx.ids.require(&ha.primary, ResourceKind::Device).await?;
        let secondary_id = self
            .ctx
            .ids
            .require(&ha.secondary, ResourceKind::Device)
            .await?;

        let payload = serde_json::json!({
            "type": "DeviceHAPair",
            "name": ha.name,
            "primary": { "id": primary_id, "name": ha.primary },
            "secondary": { "id": secondary_id, "name": ha.secondary },
            "haBootstrap": {
                "lanFailover": {
                    "logicalName": ha.logical_name,
                    "activeIP": ha.primary_ip,
                    "standbyIP": ha.secondary_ip,
                    "subnetMask": ha.netmask,
                    "useSameLinkForFailovers": true,
                    "interfaceObject": {
                        "id": failover_ids[&ha.primary],
                        "type": "PhysicalInterface",
                        "name": ha.failover_interface,
                    },
                },
                "statefulFailover": {
                    "interfaceObject": {
                        "id": failover_ids[&ha.secondary],
                        "type": "PhysicalInterface",
                        "name": ha.failover_interface,
                    },
                },
            },
        });

        self.controller.create_ha_pair(payload).await?;

        // 先等 HA 资源出现，再等主备进入 active/standby
        let budget = Duration::from_secs(timing.ha_wait_secs);
        let poll = Duration::from_secs(timing.ha_poll_secs);
        let start = Instant::now();
        let ha_id = loop {
            if let Some(ha_id) = self.controller.find_ha_pair(&ha.name).await? {
                break ha_id;
            }
            if start.elapsed() >= budget {
                return Err(OrchestratorError::Timeout(format!(
                    "HA 对 {} 未在 {} 秒内出现",
                    ha.name, timing.ha_wait_secs
                )));
            }
            tokio::time::sleep(poll).await;
        };
        self.ctx
            .ids
            .insert(&ha.name, ResourceKind::HaPair, &ha_id)
            .await?;

        loop {
            let status = self.controller.ha_status(&ha_id).await?;
            if status.is_established() {
                info!("HA 对 {} 已建立", ha.name);
                return Ok(ha_id);
            }
            if status.is_failed() {
                return Err(OrchestratorError::ControllerError(format!(
                    "HA 对 {} 同步失败: primary={}, secondary={}",
                    ha.name, status.primary, status.secondary
                )));
            }
            if start.elapsed() >= budget {
                return Err(OrchestratorError::Timeout(format!(
                    "HA 对 {} 未在 {} 秒内建立",
                    ha.name, timing.ha_wait_secs
                )));
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// 阶段 6：创建安全区域
    ///
    /// 控制器全局资源，整个运行只创建一轮；创建顺序即 zone_index
    /// 的语义，ID 按顺序缓存供接口阶段查表。
    async fn zone_stage(
        &self,
        registered: &[String],
        report: &mut RunReport,
    ) -> Option<Vec<String>> {
        let mut zone_ids = Vec::new();
        for zone in &self.ctx.config.zones {
            match self
                .controller
                .create_zone(&zone.name, &zone.interface_mode)
                .await
            {
                Ok(zone_id) => {
                    if let Err(e) = self
                        .ctx
                        .ids
                        .insert(&zone.name, ResourceKind::SecurityZone, &zone_id)
                        .await
                    {
                        report.record_run(StageOutcome::failed(
                            Stage::SecurityZones,
                            e.to_string(),
                        ));
                        return None;
                    }
                    zone_ids.push(zone_id);
                }
                Err(e) => {
                    report.record_run(StageOutcome::failed(
                        Stage::SecurityZones,
                        format!("区域 {} 创建失败: {}", zone.name, e),
                    ));
                    return None;
                }
            }
        }

        report.record_run(StageOutcome::success(
            Stage::SecurityZones,
            Some(zone_ids.join(",")),
        ));
        for device in registered {
            report.set_state(device, DeviceState::Zoned);
        }
        Some(zone_ids)
    }

    /// 阶段 7：接口配置，按设备扇出
    ///
    /// zone_index 查表：第 k 个接口规划绑定到阶段 6 创建的第 k 个
    /// 区域 ID。返回接口配置成功的设备集合。
    async fn interface_stage(
        &self,
        registered: &[String],
        zone_ids: &[String],
        report: &mut RunReport,
    ) -> Vec<String> {
        if registered.is_empty() {
            return Vec::new();
        }

        let ctx = Arc::clone(&self.ctx);
        let controller = Arc::clone(&self.controller);
        let zone_ids = zone_ids.to_vec();

        let outcomes = self
            .coordinator
            .run_per_device(registered.to_vec(), move |device| {
                let ctx = Arc::clone(&ctx);
                let controller = Arc::clone(&controller);
                let zone_ids = zone_ids.clone();
                async move { Self::configure_interfaces(ctx, controller, zone_ids, device).await }
            })
            .await;

        let mut interfaced = Vec::new();
        for device in registered {
            match outcomes.get(device) {
                Some(Ok(())) => {
                    report.record(device, StageOutcome::success(Stage::Interfaces, None));
                    report.set_state(device, DeviceState::Interfaced);
                    interfaced.push(device.clone());
                }
                Some(Err(e)) => {
                    report.record(
                        device,
                        StageOutcome::failed(Stage::Interfaces, e.to_string()),
                    );
                    report.set_state(device, DeviceState::Failed);
                    report.skip_remaining(device, &[Stage::Routing], "接口配置失败");
                }
                None => {
                    report.record(
                        device,
                        StageOutcome::failed(Stage::Interfaces, "worker 异常退出".to_string()),
                    );
                    report.set_state(device, DeviceState::Failed);
                    report.skip_remaining(device, &[Stage::Routing], "接口配置失败");
                }
            }
        }
        interfaced
    }

    /// 单设备的接口配置（worker 内执行）
    async fn configure_interfaces(
        ctx: Arc<RunContext>,
        controller: Arc<dyn ControllerOps>,
        zone_ids: Vec<String>,
        device: String,
    ) -> Result<()> {
        let config = &ctx.config;
        let device_id = ctx.ids.require(&device, ResourceKind::Device).await?;
        let entry = config
            .device(&device)
            .ok_or_else(|| OrchestratorError::ConfigError(format!("未知设备 {}", device)))?;

        let interfaces = controller.physical_interfaces(&device_id).await?;

        for plan in &config.interfaces {
            let interface = interfaces
                .iter()
                .find(|i| i.name == plan.name)
                .ok_or_else(|| {
                    OrchestratorError::ControllerError(format!(
                        "设备 {} 没有接口 {}",
                        device, plan.name
                    ))
                })?;

            // 地址在配置校验阶段已保证存在
            let address = entry.interface_addresses.get(&plan.name).ok_or_else(|| {
                OrchestratorError::ConfigError(format!(
                    "设备 {} 缺少接口 {} 的地址",
                    device, plan.name
                ))
            })?;

            // 读-改-写：取完整接口对象，改写后整体提交
            let mut detail = controller
                .interface_detail(&device_id, &interface.id)
                .await?;
            if let Some(obj) = detail.as_object_mut() {
                obj.remove("links");
                obj.remove("metadata");
                obj.insert(
                    "ifname".to_string(),
                    serde_json::Value::String(plan.ifname.clone()),
                );
                obj.insert("enabled".to_string(), serde_json::Value::Bool(true));
                obj.insert(
                    "securityZone".to_string(),
                    serde_json::json!({
                        "id": zone_ids[plan.zone_index],
                        "type": "SecurityZone",
                    }),
                );
                obj.insert(
                    "ipv4".to_string(),
                    serde_json::json!({
                        "static": {
                            "address": address.address,
                            "netmask": address.netmask,
                        }
                    }),
                );
            }

            controller
                .update_interface(&device_id, &interface.id, detail)
                .await?;

            ctx.ids
                .insert(
                    &format!("{}/{}", device, plan.ifname),
                    ResourceKind::Interface,
                    &interface.id,
                )
                .await?;
            info!("设备 {} 接口 {} 配置完成", device, plan.name);
        }

        Ok(())
    }

    /// 阶段 8：网关主机对象与默认路由
    ///
    /// 目的网络对象（如 any-ipv4）每次运行只解析一次并缓存。
    async fn route_stage(&self, interfaced: &[String], report: &mut RunReport) {
        if interfaced.is_empty() {
            return;
        }
        let config = &self.ctx.config;

        let network_id = match self
            .controller
            .find_network_object(&config.route.network_object)
            .await
        {
            Ok(network_id) => network_id,
            Err(e) => {
                for device in interfaced {
                    report.record(
                        device,
                        StageOutcome::failed(
                            Stage::Routing,
                            format!("目的网络对象解析失败: {}", e),
                        ),
                    );
                    report.set_state(device, DeviceState::Failed);
                }
                return;
            }
        };

        for device in interfaced {
            match self.route_device(device, &network_id).await {
                Ok(()) => {
                    report.record(device, StageOutcome::success(Stage::Routing, None));
                    report.set_state(device, DeviceState::Routed);
                }
                Err(e) => {
                    report.record(device, StageOutcome::failed(Stage::Routing, e.to_string()));
                    report.set_state(device, DeviceState::Failed);
                }
            }
        }
    }

    /// 单设备的网关对象 + 默认路由
    async fn route_device(&self, device: &str, network_id: &str) -> Result<()> {
        let config = &self.ctx.config;
        let device_id = self.ctx.ids.require(device, ResourceKind::Device).await?;
        let entry = config
            .device(device)
            .ok_or_else(|| OrchestratorError::ConfigError(format!("未知设备 {}", device)))?;

        // 主机对象按设备命名，避免同名冲突
        let host_name = format!("{}-{}", config.route.gateway_object_prefix, device);
        let host_id = self
            .controller
            .create_host_object(&host_name, &entry.profile.gateway)
            .await?;
        self.ctx
            .ids
            .insert(device, ResourceKind::HostObject, &host_id)
            .await?;

        let payload = serde_json::json!({
            "type": "IPv4StaticRoute",
            "name": config.route.route_name,
            "interfaceName": config.route.egress_ifname,
            "selectedNetworks": [
                { "id": network_id, "type": "Network", "name": config.route.network_object },
            ],
            "gateway": {
                "object": { "id": host_id, "type": "Host", "name": host_name },
            },
            "metricValue": config.route.metric,
        });

        if let Some(route_id) = self.controller.create_static_route(&device_id, payload).await? {
            self.ctx
                .ids
                .insert(device, ResourceKind::StaticRoute, &route_id)
                .await?;
        }
        info!("设备 {} 默认路由配置完成", device);
        Ok(())
    }

    /// 把标识符表快照摊回各设备报告
    async fn attach_identifiers(&self, device_names: &[String], report: &mut RunReport) {
        let snapshot = self.ctx.ids.snapshot().await;
        for ((owner, kind), id) in snapshot {
            let device = owner.split('/').next().unwrap_or(&owner).to_string();
            if device_names.contains(&device) {
                let key = if owner.contains('/') {
                    format!("{:?}({})", kind, owner)
                } else {
                    format!("{:?}", kind)
                };
                report.set_identifier(&device, &key, &id);
            }
        }
    }
}
