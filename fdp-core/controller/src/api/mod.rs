//! 管理控制器 API 模块
//!
//! 提供控制器资源 API 封装，包括：
//! - 访问策略 (PolicyApi)
//! - 设备记录与物理接口 (DeviceApi)
//! - HA 对 (HaApi)
//! - 安全区域 (ZoneApi)
//! - 主机/网络对象 (ObjectApi)
//! - 静态路由 (RouteApi)

pub mod devices;
pub mod ha;
pub mod objects;
pub mod policies;
pub mod routes;
pub mod zones;

pub use devices::DeviceApi;
pub use ha::HaApi;
pub use objects::ObjectApi;
pub use policies::PolicyApi;
pub use routes::RouteApi;
pub use zones::ZoneApi;
