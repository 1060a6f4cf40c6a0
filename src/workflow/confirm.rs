/// 需要用户确认的操作（清除会话、切换模式）通过它询问
pub trait Confirmer: Send + Sync {
    /// 返回 true 表示用户同意
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// 总是同意，用于 `--yes`
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
