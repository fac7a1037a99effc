//! 运行报告
//!
//! 每台设备在其尝试过的每个阶段上恰好有一条终态结果；失败结果
//! 携带足够的诊断上下文（最后控制台文本、最后 HTTP 状态/响应体），
//! 不需要重跑即可定位。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use fdp_common::{DeviceState, OutcomeStatus, Stage};

/// 阶段结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    /// 阶段
    pub stage: Stage,

    /// 结果状态
    pub status: OutcomeStatus,

    /// 附加说明（成功时的资源 ID、跳过原因等）
    pub detail: Option<String>,

    /// 失败诊断（错误信息，含最后控制台文本或 HTTP 响应）
    pub error: Option<String>,
}

/// 设备报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    /// 设备名
    pub name: String,

    /// 终态生命周期状态
    pub state: DeviceState,

    /// 各阶段结果（按阶段发生顺序）
    pub stages: Vec<StageOutcome>,

    /// 分配到的标识符（资源类别 → ID）
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
}

impl DeviceReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: DeviceState::Created,
            stages: Vec::new(),
            identifiers: BTreeMap::new(),
        }
    }
}

/// 运行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// 开始时间
    pub start_time: DateTime<Utc>,

    /// 结束时间
    pub end_time: Option<DateTime<Utc>>,

    /// 总耗时
    #[serde(skip)]
    pub duration: Duration,

    /// 各设备报告
    pub devices: BTreeMap<String, DeviceReport>,

    /// 运行级（非设备）阶段结果，如安全区域创建
    pub run_outcomes: Vec<StageOutcome>,
}

impl RunReport {
    /// 用设备名列表创建报告
    pub fn new(device_names: &[String]) -> Self {
        let devices = device_names
            .iter()
            .map(|name| (name.clone(), DeviceReport::new(name)))
            .collect();
        Self {
            start_time: Utc::now(),
            end_time: None,
            duration: Duration::from_secs(0),
            devices,
            run_outcomes: Vec::new(),
        }
    }

    /// 记录一台设备某阶段的终态结果
    ///
    /// 同一设备同一阶段只允许一条终态，重复记录保留首条并告警。
    pub fn record(&mut self, device: &str, outcome: StageOutcome) {
        let Some(report) = self.devices.get_mut(device) else {
            warn!("记录了未知设备 {} 的阶段结果", device);
            return;
        };
        if report.stages.iter().any(|o| o.stage == outcome.stage) {
            warn!("设备 {} 阶段 {} 已有终态结果，忽略重复记录", device, outcome.stage);
            return;
        }
        report.stages.push(outcome);
    }

    /// 记录运行级阶段结果
    pub fn record_run(&mut self, outcome: StageOutcome) {
        if self.run_outcomes.iter().any(|o| o.stage == outcome.stage) {
            warn!("运行级阶段 {} 已有终态结果，忽略重复记录", outcome.stage);
            return;
        }
        self.run_outcomes.push(outcome);
    }

    /// 更新设备生命周期状态
    ///
    /// `Failed` 是吸收态，一旦进入不再改写。
    pub fn set_state(&mut self, device: &str, state: DeviceState) {
        if let Some(report) = self.devices.get_mut(device) {
            if report.state != DeviceState::Failed {
                report.state = state;
            }
        }
    }

    /// 查询设备状态
    pub fn state(&self, device: &str) -> Option<DeviceState> {
        self.devices.get(device).map(|d| d.state)
    }

    /// 为设备补充分配到的标识符
    pub fn set_identifier(&mut self, device: &str, kind: &str, id: &str) {
        if let Some(report) = self.devices.get_mut(device) {
            report.identifiers.insert(kind.to_string(), id.to_string());
        }
    }

    /// 将设备后续未尝试的阶段标记为跳过
    pub fn skip_remaining(&mut self, device: &str, stages: &[Stage], reason: &str) {
        for stage in stages {
            self.record(
                device,
                StageOutcome {
                    stage: *stage,
                    status: OutcomeStatus::Skipped,
                    detail: Some(reason.to_string()),
                    error: None,
                },
            );
        }
    }

    /// 完成报告
    pub fn finalize(&mut self) {
        self.end_time = Some(Utc::now());
        if let Some(end_time) = self.end_time {
            self.duration = (end_time - self.start_time)
                .to_std()
                .unwrap_or(Duration::from_secs(0));
        }
    }

    /// 运行是否整体成功（所有设备 Ready，运行级阶段无失败）
    pub fn is_success(&self) -> bool {
        let devices_ready = self
            .devices
            .values()
            .all(|d| d.state == DeviceState::Ready);
        let run_ok = self
            .run_outcomes
            .iter()
            .all(|o| o.status != OutcomeStatus::Failed);
        devices_ready && run_ok
    }

    /// 汇总所有失败结果
    pub fn failures(&self) -> Vec<(String, &StageOutcome)> {
        let mut failures = Vec::new();
        for outcome in &self.run_outcomes {
            if outcome.status == OutcomeStatus::Failed {
                failures.push(("<run>".to_string(), outcome));
            }
        }
        for (name, device) in &self.devices {
            for outcome in &device.stages {
                if outcome.status == OutcomeStatus::Failed {
                    failures.push((name.clone(), outcome));
                }
            }
        }
        failures
    }

    /// 导出为 JSON
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 导出为 YAML
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl StageOutcome {
    /// 成功结果
    pub fn success(stage: Stage, detail: Option<String>) -> Self {
        Self {
            stage,
            status: OutcomeStatus::Success,
            detail,
            error: None,
        }
    }

    /// 失败结果
    pub fn failed(stage: Stage, error: String) -> Self {
        Self {
            stage,
            status: OutcomeStatus::Failed,
            detail: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_terminal_outcome_per_stage() {
        let mut report = RunReport::new(&["fw-1".to_string()]);

        report.record("fw-1", StageOutcome::success(Stage::NodeCreate, None));
        report.record(
            "fw-1",
            StageOutcome::failed(Stage::NodeCreate, "重复".to_string()),
        );

        let device = &report.devices["fw-1"];
        assert_eq!(device.stages.len(), 1);
        assert_eq!(device.stages[0].status, OutcomeStatus::Success);
    }

    #[test]
    fn test_failed_state_is_absorbing() {
        let mut report = RunReport::new(&["fw-1".to_string()]);

        report.set_state("fw-1", DeviceState::Failed);
        report.set_state("fw-1", DeviceState::Ready);

        assert_eq!(report.state("fw-1"), Some(DeviceState::Failed));
    }

    #[test]
    fn test_skip_remaining_and_failures() {
        let mut report = RunReport::new(&["fw-1".to_string()]);

        report.record(
            "fw-1",
            StageOutcome::failed(Stage::ConsoleSetup, "提示超时".to_string()),
        );
        report.skip_remaining(
            "fw-1",
            &[Stage::Register, Stage::Interfaces, Stage::Routing],
            "控制台配置失败",
        );
        report.set_state("fw-1", DeviceState::Failed);
        report.finalize();

        assert!(!report.is_success());
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.devices["fw-1"].stages.len(), 4);
    }
}
