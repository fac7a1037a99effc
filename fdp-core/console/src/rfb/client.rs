//! RFB 客户端实现
//!
//! 支持协议 3.3 与 3.8 握手（仅无认证的安全类型，实验平台控制台
//! 不设密码）、Raw 编码的帧缓冲更新与按键注入。
//! RFB 线上字节序为大端。

use async_trait::async_trait;
use image::RgbaImage;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::error::{ConsoleError, Result};
use crate::transport::{ConsoleTransport, SpecialKey};

use super::keymap;

/// 服务端像素格式
#[derive(Debug, Clone, Copy)]
struct PixelFormat {
    bits_per_pixel: u8,
    big_endian: bool,
    true_colour: bool,
    red_max: u16,
    green_max: u16,
    blue_max: u16,
    red_shift: u8,
    green_shift: u8,
    blue_shift: u8,
}

impl PixelFormat {
    fn from_bytes(buf: &[u8; 16]) -> Self {
        Self {
            bits_per_pixel: buf[0],
            big_endian: buf[2] != 0,
            true_colour: buf[3] != 0,
            red_max: u16::from_be_bytes([buf[4], buf[5]]),
            green_max: u16::from_be_bytes([buf[6], buf[7]]),
            blue_max: u16::from_be_bytes([buf[8], buf[9]]),
            red_shift: buf[10],
            green_shift: buf[11],
            blue_shift: buf[12],
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel as usize) / 8
    }

    /// 将一个像素值按格式展开为 RGB 分量
    fn decode(&self, value: u32) -> (u8, u8, u8) {
        fn scale(component: u32, max: u16) -> u8 {
            if max == 0 {
                0
            } else {
                ((component * 255) / max as u32) as u8
            }
        }

        let r = (value >> self.red_shift) & self.red_max as u32;
        let g = (value >> self.green_shift) & self.green_max as u32;
        let b = (value >> self.blue_shift) & self.blue_max as u32;
        (
            scale(r, self.red_max),
            scale(g, self.green_max),
            scale(b, self.blue_max),
        )
    }
}

/// RFB 控制台传输
pub struct RfbTransport {
    /// TCP 读取端
    reader: BufReader<ReadHalf<TcpStream>>,
    /// TCP 写入端
    writer: WriteHalf<TcpStream>,
    /// 帧缓冲宽度
    width: u16,
    /// 帧缓冲高度
    height: u16,
    /// 服务端像素格式
    pixel_format: PixelFormat,
    /// 本地帧缓冲（RGBA）
    framebuffer: Vec<u8>,
    /// 按键间隔（毫秒）
    key_delay_ms: u64,
    /// 服务端桌面名称
    name: String,
}

impl RfbTransport {
    /// 连接到节点控制台
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        debug!("连接到控制台: {}", addr);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| ConsoleError::ConnectionFailed(format!("无法连接控制台 {}: {}", addr, e)))?;

        let (read_half, write_half) = tokio::io::split(stream);
        let mut transport = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            width: 0,
            height: 0,
            pixel_format: PixelFormat {
                bits_per_pixel: 32,
                big_endian: false,
                true_colour: true,
                red_max: 255,
                green_max: 255,
                blue_max: 255,
                red_shift: 16,
                green_shift: 8,
                blue_shift: 0,
            },
            framebuffer: Vec::new(),
            key_delay_ms: 50,
            name: String::new(),
        };

        transport.perform_handshake().await?;
        transport.set_encodings().await?;

        debug!(
            "控制台已连接: {} ({}x{})",
            transport.name, transport.width, transport.height
        );
        Ok(transport)
    }

    /// 执行 RFB 握手
    async fn perform_handshake(&mut self) -> Result<()> {
        // 1. 版本协商
        let mut version_buf = [0u8; 12];
        self.reader
            .read_exact(&mut version_buf)
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(format!("读取协议版本失败: {}", e)))?;

        let version = String::from_utf8_lossy(&version_buf);
        if !version.starts_with("RFB ") {
            return Err(ConsoleError::ParseError(format!(
                "无效的协议版本: {:?}",
                version
            )));
        }
        let minor: u8 = version
            .get(8..11)
            .and_then(|s| s.trim_start_matches('0').parse().ok())
            .unwrap_or(3);
        trace!("服务端协议版本: {}", version.trim_end());

        // 回应协商结果：服务端 >= 3.7 时使用 3.8，否则退回 3.3
        let reply = if minor >= 7 {
            b"RFB 003.008\n"
        } else {
            b"RFB 003.003\n"
        };
        self.write_all(reply).await?;

        // 2. 安全协商（仅支持无认证类型）
        if minor >= 7 {
            let count = self.read_u8().await?;
            if count == 0 {
                let reason = self.read_reason().await?;
                return Err(ConsoleError::ConnectionFailed(format!(
                    "服务端拒绝连接: {}",
                    reason
                )));
            }
            let mut types = vec![0u8; count as usize];
            self.reader
                .read_exact(&mut types)
                .await
                .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;

            if !types.contains(&1) {
                return Err(ConsoleError::ConnectionFailed(format!(
                    "服务端不支持无认证连接: {:?}",
                    types
                )));
            }
            self.write_all(&[1u8]).await?;

            // SecurityResult
            let result = self.read_u32().await?;
            if result != 0 {
                let reason = self.read_reason().await?;
                return Err(ConsoleError::ConnectionFailed(format!(
                    "安全协商失败: {}",
                    reason
                )));
            }
        } else {
            let security_type = self.read_u32().await?;
            if security_type != 1 {
                return Err(ConsoleError::ConnectionFailed(format!(
                    "服务端要求认证 (类型 {})，不受支持",
                    security_type
                )));
            }
        }

        // 3. ClientInit（共享连接）
        self.write_all(&[1u8]).await?;

        // 4. ServerInit
        self.width = self.read_u16().await?;
        self.height = self.read_u16().await?;

        let mut pf_buf = [0u8; 16];
        self.reader
            .read_exact(&mut pf_buf)
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;
        self.pixel_format = PixelFormat::from_bytes(&pf_buf);

        if !self.pixel_format.true_colour {
            warn!("服务端使用调色板像素格式，颜色解码可能不准确");
        }

        let name_len = self.read_u32().await? as usize;
        let mut name_buf = vec![0u8; name_len];
        self.reader
            .read_exact(&mut name_buf)
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;
        self.name = String::from_utf8_lossy(&name_buf).to_string();

        self.framebuffer = vec![0u8; self.width as usize * self.height as usize * 4];
        Ok(())
    }

    /// 发送 SetEncodings（仅 Raw）
    async fn set_encodings(&mut self) -> Result<()> {
        let mut msg = Vec::with_capacity(8);
        msg.push(2u8); // SetEncodings
        msg.push(0u8);
        msg.extend_from_slice(&1u16.to_be_bytes());
        msg.extend_from_slice(&0i32.to_be_bytes()); // Raw
        self.write_all(&msg).await
    }

    /// 请求一次完整帧缓冲更新并读取到本地帧缓冲
    async fn refresh_framebuffer(&mut self) -> Result<()> {
        let mut req = Vec::with_capacity(10);
        req.push(3u8); // FramebufferUpdateRequest
        req.push(0u8); // incremental = 0，始终请求完整帧
        req.extend_from_slice(&0u16.to_be_bytes());
        req.extend_from_slice(&0u16.to_be_bytes());
        req.extend_from_slice(&self.width.to_be_bytes());
        req.extend_from_slice(&self.height.to_be_bytes());
        self.write_all(&req).await?;

        // 读取服务端消息，直到收到一次 FramebufferUpdate
        loop {
            let msg_type = self.read_u8().await?;
            match msg_type {
                // FramebufferUpdate
                0 => {
                    let _ = self.read_u8().await?;
                    let num_rects = self.read_u16().await?;
                    for _ in 0..num_rects {
                        self.read_rectangle().await?;
                    }
                    return Ok(());
                }
                // SetColourMapEntries
                1 => {
                    let _ = self.read_u8().await?;
                    let _first = self.read_u16().await?;
                    let count = self.read_u16().await?;
                    let mut discard = vec![0u8; count as usize * 6];
                    self.reader
                        .read_exact(&mut discard)
                        .await
                        .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;
                }
                // Bell
                2 => {}
                // ServerCutText
                3 => {
                    let mut pad = [0u8; 3];
                    self.reader
                        .read_exact(&mut pad)
                        .await
                        .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;
                    let len = self.read_u32().await? as usize;
                    let mut discard = vec![0u8; len];
                    self.reader
                        .read_exact(&mut discard)
                        .await
                        .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;
                }
                other => {
                    return Err(ConsoleError::ParseError(format!(
                        "未知的服务端消息类型: {}",
                        other
                    )));
                }
            }
        }
    }

    /// 读取一个矩形并写入本地帧缓冲
    async fn read_rectangle(&mut self) -> Result<()> {
        let x = self.read_u16().await? as usize;
        let y = self.read_u16().await? as usize;
        let w = self.read_u16().await? as usize;
        let h = self.read_u16().await? as usize;
        let encoding = self.read_i32().await?;

        if encoding != 0 {
            return Err(ConsoleError::ParseError(format!(
                "不支持的编码类型: {}",
                encoding
            )));
        }

        let bpp = self.pixel_format.bytes_per_pixel();
        let mut pixels = vec![0u8; w * h * bpp];
        self.reader
            .read_exact(&mut pixels)
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(format!("读取像素数据失败: {}", e)))?;

        let fb_width = self.width as usize;
        for row in 0..h {
            if y + row >= self.height as usize {
                break;
            }
            for col in 0..w {
                if x + col >= fb_width {
                    break;
                }
                let src = (row * w + col) * bpp;
                let value = match bpp {
                    1 => pixels[src] as u32,
                    2 => {
                        let raw = [pixels[src], pixels[src + 1]];
                        if self.pixel_format.big_endian {
                            u16::from_be_bytes(raw) as u32
                        } else {
                            u16::from_le_bytes(raw) as u32
                        }
                    }
                    4 => {
                        let raw = [pixels[src], pixels[src + 1], pixels[src + 2], pixels[src + 3]];
                        if self.pixel_format.big_endian {
                            u32::from_be_bytes(raw)
                        } else {
                            u32::from_le_bytes(raw)
                        }
                    }
                    other => {
                        return Err(ConsoleError::ParseError(format!(
                            "不支持的像素宽度: {} 字节",
                            other
                        )));
                    }
                };

                let (r, g, b) = self.pixel_format.decode(value);
                let dst = ((y + row) * fb_width + (x + col)) * 4;
                self.framebuffer[dst] = r;
                self.framebuffer[dst + 1] = g;
                self.framebuffer[dst + 2] = b;
                self.framebuffer[dst + 3] = 255;
            }
        }

        trace!("帧缓冲矩形: ({}, {}) {}x{}", x, y, w, h);
        Ok(())
    }

    /// 发送按键事件（按下或释放）
    async fn key_event(&mut self, keysym: u32, down: bool) -> Result<()> {
        let mut msg = Vec::with_capacity(8);
        msg.push(4u8); // KeyEvent
        msg.push(down as u8);
        msg.extend_from_slice(&0u16.to_be_bytes());
        msg.extend_from_slice(&keysym.to_be_bytes());
        self.write_all(&msg).await
    }

    /// 发送完整按键（按下 + 释放）
    async fn key_press(&mut self, keysym: u32) -> Result<()> {
        self.key_event(keysym, true).await?;
        tokio::time::sleep(tokio::time::Duration::from_millis(self.key_delay_ms)).await;
        self.key_event(keysym, false).await?;
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .write_all(data)
            .await
            .map_err(|e| ConsoleError::SendFailed(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ConsoleError::SendFailed(e.to_string()))
    }

    async fn read_u8(&mut self) -> Result<u8> {
        self.reader
            .read_u8()
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))
    }

    async fn read_u16(&mut self) -> Result<u16> {
        self.reader
            .read_u16()
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))
    }

    async fn read_u32(&mut self) -> Result<u32> {
        self.reader
            .read_u32()
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))
    }

    async fn read_i32(&mut self) -> Result<i32> {
        self.reader
            .read_i32()
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))
    }

    /// 读取带长度前缀的失败原因文本
    async fn read_reason(&mut self) -> Result<String> {
        let len = self.read_u32().await? as usize;
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact(&mut buf)
            .await
            .map_err(|e| ConsoleError::ReceiveFailed(e.to_string()))?;
        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

#[async_trait]
impl ConsoleTransport for RfbTransport {
    async fn capture_frame(&mut self) -> Result<RgbaImage> {
        self.refresh_framebuffer().await?;

        RgbaImage::from_raw(
            self.width as u32,
            self.height as u32,
            self.framebuffer.clone(),
        )
        .ok_or_else(|| ConsoleError::CaptureFailed("帧缓冲尺寸不一致".to_string()))
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            if let Some(keysym) = keymap::char_keysym(ch) {
                self.key_press(keysym).await?;
                tokio::time::sleep(tokio::time::Duration::from_millis(self.key_delay_ms)).await;
            } else {
                warn!("文本中存在无法映射的字符: {:?}", ch);
            }
        }
        Ok(())
    }

    async fn send_key(&mut self, key: SpecialKey) -> Result<()> {
        trace!("发送按键: {:?}", key);
        self.key_press(key.keysym()).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| ConsoleError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_decode_rgb888() {
        let pf = PixelFormat {
            bits_per_pixel: 32,
            big_endian: false,
            true_colour: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        };
        assert_eq!(pf.decode(0x00FF8040), (255, 128, 64));
    }

    #[test]
    fn test_pixel_format_decode_rgb565() {
        let pf = PixelFormat {
            bits_per_pixel: 16,
            big_endian: false,
            true_colour: true,
            red_max: 31,
            green_max: 63,
            blue_max: 31,
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
        };
        // 全白
        assert_eq!(pf.decode(0xFFFF), (255, 255, 255));
        // 全黑
        assert_eq!(pf.decode(0x0000), (0, 0, 0));
    }

    #[test]
    fn test_pixel_format_from_bytes() {
        let buf: [u8; 16] = [
            32, 24, 0, 1, // bpp, depth, big_endian, true_colour
            0, 255, 0, 255, 0, 255, // max r/g/b
            16, 8, 0, // shift r/g/b
            0, 0, 0, // padding
        ];
        let pf = PixelFormat::from_bytes(&buf);
        assert_eq!(pf.bits_per_pixel, 32);
        assert!(pf.true_colour);
        assert!(!pf.big_endian);
        assert_eq!(pf.red_max, 255);
        assert_eq!(pf.red_shift, 16);
    }
}
