//! 提示状态机
//!
//! 每个轮询周期接收一次识别文本：命中当前状态的提示模式则给出
//! 应答并前进；在本状态的轮询预算内始终未命中则进入 `Failed`
//! 吸收态，并携带最后一次识别文本作为诊断上下文。
//!
//! 不变式：
//! - 状态只能沿对话表顺序前进，或进入 `Failed`，不存在回退
//! - 同一状态内的重复命中是空操作（per-state acted 标志，仅在
//!   状态前进时清除），避免重复注入破坏输入域

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::dialogue::{DialogueStep, Response};

/// 控制台自动化状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleState {
    AwaitBoot,
    AwaitModePrompt,
    AwaitIpPrompt,
    AwaitMaskPrompt,
    AwaitGatewayPrompt,
    AwaitHostnamePrompt,
    AwaitDnsPrompt,
    AwaitDomainPrompt,
    AwaitPasswordPrompt,
    AwaitConfirmPassword,
    /// 对话完成（终态）
    Configured,
    /// 失败（吸收态）
    Failed,
}

impl fmt::Display for ConsoleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 一次轮询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// 未命中，继续等待
    Wait,

    /// 命中当前提示，需要注入应答
    Inject {
        /// 待注入的应答
        response: Response,
        /// 注入后的静置时间
        settle: Duration,
    },

    /// 对话完成
    Configured,

    /// 失败（提示超时）
    Failed {
        /// 失败时所处的状态
        state: ConsoleState,
        /// 最后一次识别文本
        last_seen: String,
    },
}

/// 提示状态机
///
/// 单设备实例，整个生命周期运行在该设备自己的 worker 上。
pub struct PromptAutomaton {
    /// 对话表
    steps: Vec<DialogueStep>,

    /// 当前状态在对话表中的下标
    index: usize,

    /// 当前状态是否已注入过应答
    acted: bool,

    /// 当前状态内未命中的轮询次数
    ticks_in_state: u32,

    /// 最后一次识别文本
    last_seen: String,

    /// 是否已进入失败吸收态
    failed: bool,
}

impl PromptAutomaton {
    /// 用对话表创建状态机
    pub fn new(steps: Vec<DialogueStep>) -> Self {
        Self {
            steps,
            index: 0,
            acted: false,
            ticks_in_state: 0,
            last_seen: String::new(),
            failed: false,
        }
    }

    /// 当前状态
    pub fn state(&self) -> ConsoleState {
        if self.failed {
            ConsoleState::Failed
        } else if self.index >= self.steps.len() {
            ConsoleState::Configured
        } else {
            self.steps[self.index].state
        }
    }

    /// 是否已到终态
    pub fn is_terminal(&self) -> bool {
        matches!(self.state(), ConsoleState::Configured | ConsoleState::Failed)
    }

    /// 最后一次识别文本
    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    /// 接收一次识别文本
    ///
    /// 调用方在得到 `Inject` 后负责执行注入与静置，随后调用
    /// [`advance`](Self::advance) 使状态前进。注入与前进之间再次
    /// 观察到同一提示不会产生第二次注入。
    pub fn observe(&mut self, text: &str) -> TickOutcome {
        if self.failed {
            return TickOutcome::Failed {
                state: ConsoleState::Failed,
                last_seen: self.last_seen.clone(),
            };
        }
        if self.index >= self.steps.len() {
            return TickOutcome::Configured;
        }

        self.last_seen = text.to_string();
        let step = &self.steps[self.index];

        if Self::matches(text, &step.patterns) {
            if self.acted {
                // 同一提示的重复命中：空操作
                return TickOutcome::Wait;
            }
            self.acted = true;
            return TickOutcome::Inject {
                response: step.response.clone(),
                settle: step.settle,
            };
        }

        self.ticks_in_state += 1;
        if self.ticks_in_state >= step.tick_budget {
            let state = step.state;
            self.failed = true;
            return TickOutcome::Failed {
                state,
                last_seen: self.last_seen.clone(),
            };
        }

        TickOutcome::Wait
    }

    /// 注入完成后前进到下一状态
    ///
    /// 清除 acted 标志并重置轮询计数；在终态上调用是空操作。
    pub fn advance(&mut self) {
        if self.failed || self.index >= self.steps.len() {
            return;
        }
        self.index += 1;
        self.acted = false;
        self.ticks_in_state = 0;
    }

    /// 识别文本是否命中提示模式
    ///
    /// 屏幕识别有噪声，匹配采用大小写不敏感的子串包含。
    fn matches(text: &str, patterns: &[&'static str]) -> bool {
        if text.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        patterns.iter().any(|p| lower.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{standard_dialogue, DeviceProfile, DialogueTiming};
    use crate::transport::SpecialKey;

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
            addressing_mode: "manual".to_string(),
        }
    }

    fn automaton() -> PromptAutomaton {
        PromptAutomaton::new(standard_dialogue(&profile(), &DialogueTiming::default()))
    }

    /// 每个状态对应的一段带噪声的屏幕文本
    const SCREENS: &[&str] = &[
        "Firewall image v7.2\nPress <ENTER> to begin setup",
        "Configure IPv4 via DHCP or manually? [manual]:",
        "Enter an IPv4 address for the management interface:",
        "Enter an IPv4 netmask for the management interface:",
        "Enter the IPv4 default gateway:",
        "Enter a fully qualified hostname:",
        "Enter a comma-separated list of DNS servers:",
        "Enter a comma-separated list of search domains:",
        "Enter new password:",
        "Confirm new password:",
    ];

    #[test]
    fn test_happy_path_is_monotonic() {
        let mut sm = automaton();
        let mut visited = Vec::new();

        for screen in SCREENS {
            visited.push(sm.state());
            match sm.observe(screen) {
                TickOutcome::Inject { .. } => sm.advance(),
                other => panic!("期望 Inject，得到 {:?}", other),
            }
        }

        assert_eq!(sm.state(), ConsoleState::Configured);
        assert!(sm.is_terminal());

        // 状态序列严格按对话表顺序前进，无回退
        assert_eq!(
            visited,
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
    fn test_boot_prompt_injects_enter() {
        let mut sm = automaton();
        match sm.observe("press <enter> to begin setup") {
            TickOutcome::Inject { response, .. } => {
                assert_eq!(response, Response::Key(SpecialKey::Enter));
            }
            other => panic!("期望 Inject，得到 {:?}", other),
        }
    }

    #[test]
    fn test_repeated_prompt_is_noop() {
        let mut sm = automaton();

        assert!(matches!(
            sm.observe("Press <ENTER> to begin setup"),
            TickOutcome::Inject { .. }
        ));
        // advance 之前再次看到同一提示：不再注入
        assert_eq!(
            sm.observe("Press <ENTER> to begin setup"),
            TickOutcome::Wait
        );
        sm.advance();
        assert_eq!(sm.state(), ConsoleState::AwaitModePrompt);
    }

    #[test]
    fn test_timeout_at_gateway_prompt() {
        let mut sm = automaton();

        // 推进到网关提示状态
        for screen in &SCREENS[..4] {
            match sm.observe(screen) {
                TickOutcome::Inject { .. } => sm.advance(),
                other => panic!("期望 Inject，得到 {:?}", other),
            }
        }
        assert_eq!(sm.state(), ConsoleState::AwaitGatewayPrompt);

        // 持续喂入不匹配文本直到预算耗尽
        let budget = DialogueTiming::default().prompt_tick_budget;
        let mut outcome = TickOutcome::Wait;
        for _ in 0..budget {
            outcome = sm.observe("garbled ### text");
        }

        match outcome {
            TickOutcome::Failed { state, last_seen } => {
                assert_eq!(state, ConsoleState::AwaitGatewayPrompt);
                assert_eq!(last_seen, "garbled ### text");
            }
            other => panic!("期望 Failed，得到 {:?}", other),
        }

        // Failed 是吸收态：即使后续出现正确提示也不再前进
        assert!(matches!(
            sm.observe("Enter the IPv4 default gateway:"),
            TickOutcome::Failed { .. }
        ));
        assert_eq!(sm.state(), ConsoleState::Failed);
    }

    #[test]
    fn test_empty_text_counts_toward_budget() {
        let mut sm = automaton();
        let budget = DialogueTiming::default().boot_tick_budget;

        for i in 0..budget {
            let outcome = sm.observe("");
            if i + 1 < budget {
                assert_eq!(outcome, TickOutcome::Wait);
            } else {
                assert!(matches!(outcome, TickOutcome::Failed { .. }));
            }
        }
    }

    #[test]
    fn test_match_is_case_insensitive_and_fuzzy() {
        let mut sm = automaton();
        // 识别噪声：前后有杂字符、大小写混乱
        let noisy = "##  pRESS <Enter> TO begin setup  %%";
        assert!(matches!(sm.observe(noisy), TickOutcome::Inject { .. }));
    }
}
