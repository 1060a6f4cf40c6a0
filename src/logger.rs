//! 日志初始化
//!
//! 默认读取 `RUST_LOG`，未设置时使用 `info`（详细模式下为 `debug`）

use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅器
///
/// 可以被多次调用（测试中常见），重复初始化会被忽略
pub fn init() {
    init_with_verbose(false);
}

pub fn init_with_verbose(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
