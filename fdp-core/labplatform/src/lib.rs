//! 实验平台客户端模块
//!
//! 提供与网络设备仿真实验平台 REST API 交互的客户端实现。
//!
//! # 功能
//!
//! - **节点管理** (`NodeApi`): 创建节点、启动节点、查询状态、连接接口、
//!   查询控制台端口
//! - **网络管理** (`NetworkApi`): 创建桥接网络、查询管理网络
//!
//! 平台使用会话 Cookie 认证：`login` 成功后，后续请求由
//! `reqwest` 的 cookie store 自动携带会话。
//!
//! # 示例
//!
//! ```ignore
//! use fdp_labplatform::{LabClient, LabConfig};
//!
//! let client = LabClient::new("https://lab-server", "deploy/firewalls.unl", LabConfig::default())?;
//! client.login("admin", "password").await?;
//!
//! let node_id = client.node().create(&payload).await?;
//! client.node().start(&node_id).await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod models;

pub use client::{LabClient, LabConfig};
pub use error::{LabError, Result};

pub use api::{network::NetworkApi, node::NodeApi};

pub use models::{ConsoleEndpoint, NodeStatus};
