//! FDP 编排引擎
//!
//! 执行固定的依赖有序部署流水线：
//!
//! 1. 实验平台与管理控制器认证
//! 2. 创建并启动设备节点（按设备扇出）
//! 3. 控制台初始配置（按设备扇出，逐设备门控于阶段 2）
//! 4. 注册到管理控制器并轮询至就绪
//! 5. HA 配对（可选，按对失败隔离）
//! 6. 创建安全区域（控制器全局，只创建一轮）
//! 7. 接口配置（按设备扇出）
//! 8. 网关对象与默认路由
//!
//! 后续阶段的负载依赖前序阶段返回的标识符，统一经由
//! [`IdentifierTable`](context::IdentifierTable) 串接。并发协调器
//! 负责阶段 2–3 的按设备扇出与阶段 4 之前的汇合屏障。

pub mod adapter;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod ops;
pub mod pipeline;
pub mod report;

pub use config::RunConfig;
pub use context::{IdentifierTable, RunContext};
pub use coordinator::Coordinator;
pub use error::{OrchestratorError, Result};
pub use ops::{ConsoleProvisioner, ControllerOps, LabOps};
pub use pipeline::PipelineEngine;
pub use report::{DeviceReport, RunReport, StageOutcome};
