//! 控制台会话执行器
//!
//! 将传输、信号读取器与提示状态机组合为单设备的轮询循环。
//! 会话在对话完成或失败时结束并释放连接，不跨设备复用。

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::automaton::{PromptAutomaton, TickOutcome};
use crate::dialogue::Response;
use crate::error::{ConsoleError, Result};
use crate::reader::SignalReader;
use crate::transport::{ConsoleTransport, SpecialKey};

/// 会话配置
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 轮询间隔
    pub tick_interval: Duration,

    /// 对话完成后下发的管理器注册命令（可选）
    pub enroll_command: Option<String>,

    /// 注册命令等待的命令行提示符
    pub enroll_prompt: String,

    /// 等待命令行提示符的轮询预算
    pub enroll_tick_budget: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            enroll_command: None,
            enroll_prompt: ">".to_string(),
            enroll_tick_budget: 36,
        }
    }
}

/// 控制台会话
pub struct ConsoleSession {
    /// 设备标签（日志用）
    device: String,

    /// 控制台传输
    transport: Box<dyn ConsoleTransport>,

    /// 信号读取器
    reader: Box<dyn SignalReader>,

    /// 提示状态机
    automaton: PromptAutomaton,

    /// 会话配置
    config: SessionConfig,
}

impl ConsoleSession {
    /// 创建新的控制台会话
    pub fn new(
        device: &str,
        transport: Box<dyn ConsoleTransport>,
        reader: Box<dyn SignalReader>,
        automaton: PromptAutomaton,
        config: SessionConfig,
    ) -> Self {
        Self {
            device: device.to_string(),
            transport,
            reader,
            automaton,
            config,
        }
    }

    /// 执行完整对话
    ///
    /// 成功返回 `Ok(())`；提示超时返回
    /// [`ConsoleError::PromptTimeout`]，携带失败状态与最后识别文本。
    /// 无论成败，返回前都会断开控制台连接。
    pub async fn run(&mut self) -> Result<()> {
        info!("设备 {} 控制台对话开始", self.device);

        let result = self.drive_dialogue().await;

        // 会话结束即释放连接；断开失败不覆盖对话结果
        if let Err(e) = self.transport.disconnect().await {
            warn!("设备 {} 断开控制台失败: {}", self.device, e);
        }

        match &result {
            Ok(()) => info!("设备 {} 控制台配置完成", self.device),
            Err(e) => warn!("设备 {} 控制台配置失败: {}", self.device, e),
        }
        result
    }

    async fn drive_dialogue(&mut self) -> Result<()> {
        loop {
            let text = self.reader.read_text(self.transport.as_mut()).await;

            match self.automaton.observe(&text) {
                TickOutcome::Wait => {
                    tokio::time::sleep(self.config.tick_interval).await;
                }
                TickOutcome::Inject { response, settle } => {
                    debug!(
                        "设备 {} 状态 {} 命中提示，注入应答",
                        self.device,
                        self.automaton.state()
                    );
                    self.apply(&response).await?;
                    tokio::time::sleep(settle).await;
                    self.automaton.advance();
                    // 最后一个状态前进后即为 Configured，无需再读一帧
                    if self.automaton.is_terminal() {
                        break;
                    }
                }
                TickOutcome::Configured => break,
                TickOutcome::Failed { state, last_seen } => {
                    return Err(ConsoleError::PromptTimeout {
                        state: state.to_string(),
                        last_seen,
                    });
                }
            }
        }

        if let Some(command) = self.config.enroll_command.clone() {
            self.enroll(&command).await?;
        }

        Ok(())
    }

    /// 对话完成后等待命令行提示符并下发注册命令
    async fn enroll(&mut self, command: &str) -> Result<()> {
        info!("设备 {} 下发管理器注册命令", self.device);

        let mut last_seen = String::new();
        for _ in 0..self.config.enroll_tick_budget {
            let text = self.reader.read_text(self.transport.as_mut()).await;
            if text.contains(&self.config.enroll_prompt) {
                self.transport.send_text(command).await?;
                self.transport.send_key(SpecialKey::Enter).await?;
                tokio::time::sleep(self.config.tick_interval).await;
                return Ok(());
            }
            last_seen = text;
            tokio::time::sleep(self.config.tick_interval).await;
        }

        Err(ConsoleError::PromptTimeout {
            state: "ManagerEnroll".to_string(),
            last_seen,
        })
    }

    /// 执行一条应答
    async fn apply(&mut self, response: &Response) -> Result<()> {
        match response {
            Response::Line(text) => {
                self.transport.send_text(text).await?;
                self.transport.send_key(SpecialKey::Enter).await?;
            }
            Response::Key(key) => {
                self.transport.send_key(*key).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::ConsoleState;
    use crate::dialogue::{standard_dialogue, DeviceProfile, DialogueTiming};
    use async_trait::async_trait;
    use image::RgbaImage;
    use std::sync::{Arc, Mutex};

    /// 记录注入动作的脚本化传输
    struct ScriptedTransport {
        injected: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ConsoleTransport for ScriptedTransport {
        async fn capture_frame(&mut self) -> Result<RgbaImage> {
            Ok(RgbaImage::new(4, 4))
        }

        async fn send_text(&mut self, text: &str) -> Result<()> {
            self.injected.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_key(&mut self, key: SpecialKey) -> Result<()> {
            self.injected.lock().unwrap().push(format!("<{:?}>", key));
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// 按脚本逐条返回屏幕文本的读取器
    struct ScriptedReader {
        screens: Vec<String>,
        cursor: usize,
    }

    #[async_trait]
    impl SignalReader for ScriptedReader {
        async fn read_text(&mut self, _transport: &mut dyn ConsoleTransport) -> String {
            let text = self
                .screens
                .get(self.cursor)
                .cloned()
                .unwrap_or_default();
            self.cursor += 1;
            text
        }
    }

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

    fn timing() -> DialogueTiming {
        DialogueTiming {
            tick_interval: Duration::from_millis(1),
            settle: Duration::from_millis(1),
            boot_tick_budget: 5,
            prompt_tick_budget: 5,
        }
    }

    fn session(screens: Vec<String>, enroll: Option<String>) -> (ConsoleSession, Arc<Mutex<Vec<String>>>) {
        let injected = Arc::new(Mutex::new(Vec::new()));
        let p = profile();
        let t = timing();
        let session = ConsoleSession::new(
            &p.name,
            Box::new(ScriptedTransport {
                injected: Arc::clone(&injected),
            }),
            Box::new(ScriptedReader { screens, cursor: 0 }),
            PromptAutomaton::new(standard_dialogue(&p, &t)),
            SessionConfig {
                tick_interval: t.tick_interval,
                enroll_command: enroll,
                enroll_prompt: ">".to_string(),
                enroll_tick_budget: 5,
            },
        );
        (session, injected)
    }

    fn happy_screens() -> Vec<String> {
        vec![
            "Press <ENTER> to begin setup".to_string(),
            "Configure IPv4 via DHCP or manually?".to_string(),
            "Enter an IPv4 address for the management interface:".to_string(),
            "Enter an IPv4 netmask:".to_string(),
            "Enter the IPv4 default gateway:".to_string(),
            "Enter a fully qualified hostname:".to_string(),
            "Enter a comma-separated list of DNS servers:".to_string(),
            "Enter a comma-separated list of search domains:".to_string(),
            "Enter new password:".to_string(),
            "Confirm new password:".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_full_dialogue_injects_profile_values() {
        let (mut session, injected) = session(happy_screens(), None);

        session.run().await.unwrap();

        let injected = injected.lock().unwrap();
        // 回车 + 9 个(文本, 回车)对
        assert!(injected.contains(&"192.168.0.31".to_string()));
        assert!(injected.contains(&"255.255.255.0".to_string()));
        assert!(injected.contains(&"S3cret!".to_string()));
        assert_eq!(injected[0], "<Enter>");
    }

    #[tokio::test]
    async fn test_enroll_command_sent_at_shell_prompt() {
        let mut screens = happy_screens();
        screens.push("firewall > ".to_string());
        let (mut session, injected) =
            session(screens, Some("enroll 192.168.0.201 regkey42".to_string()));

        session.run().await.unwrap();

        let injected = injected.lock().unwrap();
        assert!(injected.contains(&"enroll 192.168.0.201 regkey42".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_reports_state_and_last_seen() {
        // 网关提示永远不出现
        let screens = vec![
            "Press <ENTER> to begin setup".to_string(),
            "Configure IPv4 via DHCP or manually?".to_string(),
            "Enter an IPv4 address for the management interface:".to_string(),
            "Enter an IPv4 netmask:".to_string(),
        ];
        let (mut session, _) = session(screens, None);

        let err = session.run().await.unwrap_err();
        match err {
            ConsoleError::PromptTimeout { state, .. } => {
                assert_eq!(state, ConsoleState::AwaitGatewayPrompt.to_string());
            }
            other => panic!("期望 PromptTimeout，得到 {:?}", other),
        }
    }
}
