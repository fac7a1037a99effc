//! 运行上下文与标识符表
//!
//! 一次运行构造一个上下文，初始化后除标识符表外只读。
//! 标识符表是唯一被多个线程写入的结构，所有写入同步进行，
//! 且在一次运行内只允许追加。

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use fdp_common::ResourceKind;

use crate::config::RunConfig;
use crate::error::{OrchestratorError, Result};

/// 标识符表
///
/// (持有者, 资源类别) → 控制器/平台分配的 ID。持有者通常是设备名；
/// 全局资源（安全区域、HA 网络）以资源自身名称为持有者；同一设备的
/// 多个接口以 `设备名/接口名` 复合持有者区分。
pub struct IdentifierTable {
    inner: RwLock<HashMap<(String, ResourceKind), String>>,
}

impl IdentifierTable {
    /// 创建空表
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// 追加一条标识符
    ///
    /// 表在一次运行内只增不改，重复写入视为流水线错误。
    pub async fn insert(&self, owner: &str, kind: ResourceKind, id: &str) -> Result<()> {
        let mut table = self.inner.write().await;
        let key = (owner.to_string(), kind);
        if table.contains_key(&key) {
            return Err(OrchestratorError::IdentifierConflict(format!(
                "{} / {:?} 已存在",
                owner, kind
            )));
        }
        debug!("记录标识符: {} / {:?} = {}", owner, kind, id);
        table.insert(key, id.to_string());
        Ok(())
    }

    /// 查询标识符
    pub async fn get(&self, owner: &str, kind: ResourceKind) -> Option<String> {
        let table = self.inner.read().await;
        table.get(&(owner.to_string(), kind)).cloned()
    }

    /// 查询标识符，缺失视为错误
    pub async fn require(&self, owner: &str, kind: ResourceKind) -> Result<String> {
        self.get(owner, kind).await.ok_or_else(|| {
            OrchestratorError::IdentifierMissing(format!("{} / {:?}", owner, kind))
        })
    }

    /// 导出快照（用于最终报告）
    pub async fn snapshot(&self) -> HashMap<(String, ResourceKind), String> {
        self.inner.read().await.clone()
    }
}

impl Default for IdentifierTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 运行上下文
///
/// 配置在构造时完成校验，运行期间只读；标识符表随阶段推进追加。
pub struct RunContext {
    /// 运行配置
    pub config: RunConfig,

    /// 标识符表
    pub ids: IdentifierTable,
}

impl RunContext {
    /// 用已校验的配置构造上下文
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            ids: IdentifierTable::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_require() {
        let table = IdentifierTable::new();
        table
            .insert("fw-1", ResourceKind::Device, "dev-1")
            .await
            .unwrap();

        assert_eq!(
            table.require("fw-1", ResourceKind::Device).await.unwrap(),
            "dev-1"
        );
        assert!(table.require("fw-2", ResourceKind::Device).await.is_err());
    }

    #[tokio::test]
    async fn test_append_only() {
        let table = IdentifierTable::new();
        table
            .insert("INSIDE", ResourceKind::SecurityZone, "zone-1")
            .await
            .unwrap();

        let err = table
            .insert("INSIDE", ResourceKind::SecurityZone, "zone-2")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::IdentifierConflict(_)));

        // 原值不受影响
        assert_eq!(
            table
                .require("INSIDE", ResourceKind::SecurityZone)
                .await
                .unwrap(),
            "zone-1"
        );
    }

    #[tokio::test]
    async fn test_same_owner_different_kind() {
        let table = IdentifierTable::new();
        table
            .insert("fw-1", ResourceKind::LabNode, "7")
            .await
            .unwrap();
        table
            .insert("fw-1", ResourceKind::Device, "dev-1")
            .await
            .unwrap();

        assert_eq!(table.snapshot().await.len(), 2);
    }
}
