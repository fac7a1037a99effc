//! 控制台传输抽象
//!
//! 定义屏幕捕获与按键注入的统一接口。生产实现为 RFB 连接；
//! 测试中可用脚本化实现替代。

use async_trait::async_trait;
use image::RgbaImage;

use crate::error::Result;
use crate::rfb::keymap;

/// 非字符按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    Enter,
    Escape,
    Tab,
    Backspace,
}

impl SpecialKey {
    /// 转换为 X11 keysym
    pub fn keysym(self) -> u32 {
        match self {
            Self::Enter => keymap::keysym::ENTER,
            Self::Escape => keymap::keysym::ESCAPE,
            Self::Tab => keymap::keysym::TAB,
            Self::Backspace => keymap::keysym::BACKSPACE,
        }
    }
}

/// 控制台传输 trait
///
/// 每个连接只属于一台设备，不跨 worker 共享。
#[async_trait]
pub trait ConsoleTransport: Send {
    /// 捕获当前屏幕帧
    async fn capture_frame(&mut self) -> Result<RgbaImage>;

    /// 逐字符注入文本（不含回车）
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// 注入单个非字符按键
    async fn send_key(&mut self, key: SpecialKey) -> Result<()>;

    /// 断开连接
    async fn disconnect(&mut self) -> Result<()>;
}
