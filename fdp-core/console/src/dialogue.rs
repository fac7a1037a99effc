//! 初始配置对话表
//!
//! 将设备初始配置对话声明为 (状态, 提示模式, 应答, 静置时间, 轮询预算)
//! 的固定表，状态机按表驱动，无需连接真实控制台即可逐状态测试。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::automaton::ConsoleState;
use crate::transport::SpecialKey;

/// 设备初始配置档案
///
/// 全部字段来自运行配置，在任何远程操作之前已完成校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// 设备名称
    pub name: String,

    /// 管理接口 IPv4 地址
    pub mgmt_ip: String,

    /// 管理接口掩码
    pub netmask: String,

    /// 默认网关
    pub gateway: String,

    /// 完全限定主机名
    pub hostname: String,

    /// DNS 服务器（逗号分隔）
    pub dns: String,

    /// 搜索域
    pub domain: String,

    /// 管理员口令
    pub admin_password: String,

    /// 地址配置方式（manual / dhcp）
    #[serde(default = "default_addressing_mode")]
    pub addressing_mode: String,
}

fn default_addressing_mode() -> String {
    "manual".to_string()
}

/// 对话应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// 输入一行文本并回车
    Line(String),
    /// 单个按键
    Key(SpecialKey),
}

/// 对话表中的一行
#[derive(Debug, Clone)]
pub struct DialogueStep {
    /// 此行对应的状态
    pub state: ConsoleState,

    /// 提示模式（小写子串，命中任意一个即视为匹配）
    pub patterns: Vec<&'static str>,

    /// 匹配后的应答
    pub response: Response,

    /// 应答后的静置时间
    pub settle: Duration,

    /// 本状态的轮询预算（超过即判定失败）
    pub tick_budget: u32,
}

/// 对话时间参数
#[derive(Debug, Clone)]
pub struct DialogueTiming {
    /// 轮询间隔
    pub tick_interval: Duration,

    /// 默认静置时间
    pub settle: Duration,

    /// 启动阶段轮询预算（设备冷启动最慢）
    pub boot_tick_budget: u32,

    /// 普通提示轮询预算
    pub prompt_tick_budget: u32,
}

impl Default for DialogueTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            settle: Duration::from_secs(2),
            boot_tick_budget: 120,
            prompt_tick_budget: 36,
        }
    }
}

/// 构建标准初始配置对话表
///
/// 状态顺序固定，对应设备安装向导的提问顺序。模式按识别噪声
/// 容忍原则选取：只要求小写子串命中，不要求整行一致。
pub fn standard_dialogue(profile: &DeviceProfile, timing: &DialogueTiming) -> Vec<DialogueStep> {
    let line = |s: &str| Response::Line(s.to_string());

    vec![
        DialogueStep {
            state: ConsoleState::AwaitBoot,
            patterns: vec!["press <enter>", "setup wizard"],
            response: Response::Key(SpecialKey::Enter),
            settle: timing.settle,
            tick_budget: timing.boot_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitModePrompt,
            patterns: vec!["dhcp or manual", "addressing mode"],
            response: line(&profile.addressing_mode),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitIpPrompt,
            patterns: vec!["ipv4 address for the management interface", "management ip address"],
            response: line(&profile.mgmt_ip),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitMaskPrompt,
            patterns: vec!["netmask"],
            response: line(&profile.netmask),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitGatewayPrompt,
            patterns: vec!["gateway"],
            response: line(&profile.gateway),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitHostnamePrompt,
            patterns: vec!["fully qualified hostname", "hostname"],
            response: line(&profile.hostname),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitDnsPrompt,
            patterns: vec!["dns server"],
            response: line(&profile.dns),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitDomainPrompt,
            patterns: vec!["search domain", "domain"],
            response: line(&profile.domain),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitPasswordPrompt,
            patterns: vec!["enter new password"],
            response: line(&profile.admin_password),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
        DialogueStep {
            state: ConsoleState::AwaitConfirmPassword,
            patterns: vec!["confirm new password", "retype new password"],
            response: line(&profile.admin_password),
            settle: timing.settle,
            tick_budget: timing.prompt_tick_budget,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DeviceProfile {
        DeviceProfile {
            name: "fw-1".to_string(),
            mgmt_ip: "192.168.0.31".to_string(),
            netmask: "255.255.255.0".to_string(),
            gateway: "192.168.0.1".to_string(),
            hostname: "fw-1.lab.local".to_string(),
            dns: "192.168.0.10".to_string(),
            domain: "lab.local".to_string(),
            admin_password: "S3cret!".to_string(),
            addressing_mode: default_addressing_mode(),
        }
    }

    #[test]
    fn test_dialogue_state_order() {
        let table = standard_dialogue(&profile(), &DialogueTiming::default());
        let states: Vec<ConsoleState> = table.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![
                ConsoleState::AwaitBoot,
                ConsoleState::AwaitModePrompt,
                ConsoleState::AwaitIpPrompt,
                ConsoleState::AwaitMaskPrompt,
                ConsoleState::AwaitGatewayPrompt,
                ConsoleState::AwaitHostnamePrompt,
                ConsoleState::AwaitDnsPrompt,
                ConsoleState::AwaitDomainPrompt,
                ConsoleState::AwaitPasswordPrompt,
                ConsoleState::AwaitConfirmPassword,
            ]
        );
    }

    #[test]
    fn test_dialogue_responses_use_profile_values() {
        let p = profile();
        let table = standard_dialogue(&p, &DialogueTiming::default());

        assert_eq!(table[2].response, Response::Line(p.mgmt_ip.clone()));
        assert_eq!(table[4].response, Response::Line(p.gateway.clone()));
        // 口令与确认口令使用同一值
        assert_eq!(table[8].response, table[9].response);
    }

    #[test]
    fn test_boot_budget_larger_than_prompt_budget() {
        let timing = DialogueTiming::default();
        let table = standard_dialogue(&profile(), &timing);
        assert!(table[0].tick_budget > table[1].tick_budget);
    }
}
