//! 控制台信号读取器
//!
//! 捕获当前屏幕并做文本识别。识别是尽力而为的：捕获失败、识别器
//! 不可用或输出为空都返回空字符串，由调用方视为"尚未匹配"，
//! 而不是错误。

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::transport::ConsoleTransport;

/// 信号读取器 trait
#[async_trait]
pub trait SignalReader: Send {
    /// 读取当前屏幕文本
    ///
    /// 任何失败都返回空字符串，不产生错误。
    async fn read_text(&mut self, transport: &mut dyn ConsoleTransport) -> String;
}

/// 基于外部识别器的信号读取器
///
/// 预处理（灰度、放大、对比度增强）后写入 PNG，调用 `tesseract`
/// 识别。处理后的截图保留在诊断目录中，便于失败后排查。
pub struct OcrReader {
    /// 截图与识别中间文件目录
    diagnostics_dir: PathBuf,

    /// 设备标签（用于文件命名）
    device_label: String,

    /// 识别器可执行文件
    tesseract_cmd: String,
}

impl OcrReader {
    /// 创建新的信号读取器
    pub fn new(diagnostics_dir: impl Into<PathBuf>, device_label: &str) -> Self {
        Self {
            diagnostics_dir: diagnostics_dir.into(),
            device_label: device_label.to_string(),
            tesseract_cmd: "tesseract".to_string(),
        }
    }

    /// 覆盖识别器命令
    pub fn with_tesseract_cmd(mut self, cmd: &str) -> Self {
        self.tesseract_cmd = cmd.to_string();
        self
    }

    /// 处理后截图的路径
    pub fn screen_path(&self) -> PathBuf {
        self.diagnostics_dir
            .join(format!("screen_{}.png", self.device_label))
    }
}

#[async_trait]
impl SignalReader for OcrReader {
    async fn read_text(&mut self, transport: &mut dyn ConsoleTransport) -> String {
        let frame = match transport.capture_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("设备 {} 屏幕捕获失败: {}", self.device_label, e);
                return String::new();
            }
        };

        // 预处理：灰度 -> 放大 2 倍 -> 对比度增强
        let gray = imageops::grayscale(&frame);
        let resized = imageops::resize(
            &gray,
            gray.width() * 2,
            gray.height() * 2,
            FilterType::Triangle,
        );
        let processed = imageops::contrast(&resized, 30.0);

        if let Err(e) = std::fs::create_dir_all(&self.diagnostics_dir) {
            warn!("创建诊断目录失败: {}", e);
            return String::new();
        }

        let path = self.screen_path();
        if let Err(e) = processed.save(&path) {
            warn!("保存截图失败 {:?}: {}", path, e);
            return String::new();
        }

        // 调用外部识别器：tesseract <png> stdout --psm 6
        let output = Command::new(&self.tesseract_cmd)
            .arg(&path)
            .arg("stdout")
            .args(["--psm", "6"])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout).to_string();
                debug!(
                    "设备 {} 识别到 {} 个字符",
                    self.device_label,
                    text.chars().count()
                );
                text
            }
            Ok(output) => {
                warn!(
                    "识别器退出异常: {} - {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                );
                String::new()
            }
            Err(e) => {
                warn!("无法执行识别器 {}: {}", self.tesseract_cmd, e);
                String::new()
            }
        }
    }
}
