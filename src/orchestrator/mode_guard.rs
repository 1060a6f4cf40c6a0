//! 模式切换保护
//!
//! 另一种模式还有未过期的会话时，切换前必须确认；确认后两种会话都会被清除。

use crate::error::AppResult;
use crate::infrastructure::SessionStore;
use crate::models::SessionMode;
use crate::workflow::Confirmer;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// 另一种模式没有会话，直接切换
    Switched,
    /// 用户确认后清除了全部会话再切换
    ClearedAndSwitched,
    /// 用户取消，什么都没有改变
    Declined,
}

impl SwitchOutcome {
    pub fn switched(self) -> bool {
        self != SwitchOutcome::Declined
    }
}

pub struct ModeSwitchGuard {
    store: SessionStore,
}

impl ModeSwitchGuard {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    pub fn switch_to(
        &self,
        target: SessionMode,
        confirmer: &dyn Confirmer,
    ) -> AppResult<SwitchOutcome> {
        let other = target.other();
        let Some(existing) = self.store.load(other) else {
            return Ok(SwitchOutcome::Switched);
        };

        let prompt = format!(
            "You have an active {} session ({}). Switching to {} mode will discard it. Continue?",
            other, existing.primary_id, target
        );
        if !confirmer.confirm(&prompt) {
            info!("↩️ 已取消切换到 {} 模式", target);
            return Ok(SwitchOutcome::Declined);
        }

        self.store.clear_all()?;
        info!("🔀 已清除全部会话，切换到 {} 模式", target);
        Ok(SwitchOutcome::ClearedAndSwitched)
    }

    /// 启动时要恢复的模式：最近保存的会话优先
    pub fn resume_mode(&self) -> Option<SessionMode> {
        self.store.active_session().map(|record| record.mode)
    }
}
