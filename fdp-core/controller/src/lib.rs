//! 管理控制器客户端模块
//!
//! 提供与防火墙管理控制器 REST API 交互的客户端实现。
//!
//! # 功能
//!
//! - **令牌认证**: 所有调用之前先 `generatetoken`，令牌随每次请求下发；
//!   收到 401 时自动重新认证一次
//! - **步骤执行器** (`StepExecutor`): 单次 REST 操作的统一执行入口，
//!   瞬时失败（连接错误、5xx、限流）按指数退避重试，4xx 客户端错误
//!   不重试
//! - **资源 API**: 访问策略、设备记录、HA 对、安全区域、物理接口、
//!   主机/网络对象、静态路由
//!
//! 控制器端资源以服务端分配的 UUID 标识，标识符提取由调用方完成。

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod step;

pub use client::{ControllerClient, ControllerConfig};
pub use error::{ControllerError, Result};
pub use step::{RestStep, RetryPolicy, StepExecutor, StepResponse};

pub use api::{
    devices::DeviceApi, ha::HaApi, objects::ObjectApi, policies::PolicyApi, routes::RouteApi,
    zones::ZoneApi,
};

pub use models::{DeviceHealth, DeviceSummary, HaStatus, InterfaceSummary};
