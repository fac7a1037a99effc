//! FDP 控制台自动化模块
//!
//! 将一台刚创建的虚拟设备从未配置的启动提示推进到管理地址可达的
//! 最小配置状态。控制台没有结构化协议，所有状态推断都来自屏幕：
//!
//! - **控制台传输** (`RfbTransport`): 远程帧缓冲连接，提供屏幕捕获
//!   与按键注入
//! - **信号读取器** (`OcrReader`): 捕获当前屏幕并做文本识别，尽力而为
//! - **提示状态机** (`PromptAutomaton`): 按声明式对话表匹配提示并
//!   注入配置值
//! - **会话执行器** (`ConsoleSession`): 将以上三者组合为单设备的
//!   轮询循环
//!
//! 每台设备一个会话，运行在各自的 worker 上，彼此不共享任何可变状态。

pub mod automaton;
pub mod dialogue;
pub mod error;
pub mod reader;
pub mod rfb;
pub mod session;
pub mod transport;

pub use automaton::{ConsoleState, PromptAutomaton, TickOutcome};
pub use dialogue::{DeviceProfile, DialogueStep, DialogueTiming, Response};
pub use error::{ConsoleError, Result};
pub use reader::{OcrReader, SignalReader};
pub use rfb::RfbTransport;
pub use session::{ConsoleSession, SessionConfig};
pub use transport::{ConsoleTransport, SpecialKey};
