//! RFB 控制台传输
//!
//! 实验平台为每个节点暴露一个远程帧缓冲控制台。此模块实现
//! 自动化所需的最小子集：握手、Raw 编码的帧缓冲更新、按键事件。

pub mod client;
pub mod keymap;

pub use client::RfbTransport;
