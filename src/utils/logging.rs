/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use crate::error::{AppError, AppResult};
use std::fs;
use tracing::info;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n博客生成会话日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `api_base_url`: 内容服务地址
/// - `session_dir`: 会话目录
pub fn log_startup(api_base_url: &str, session_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 博客生成流程");
    info!("🌐 服务地址: {}", api_base_url);
    info!("💾 会话目录: {}", session_dir);
    info!("{}", "=".repeat(60));
}

/// 记录批量任务的最终统计
///
/// # 参数
/// - `job_id`: 任务ID
/// - `processed`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 关键词总数
/// - `progress`: 服务端给出的进度百分比
pub fn print_batch_summary(job_id: &str, processed: u32, failed: u32, total: u32, progress: f64) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量任务 {} 统计", job_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", processed, total);
    info!("❌ 失败: {}", failed);
    info!("📈 进度: {}%", progress);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("welding", 20), "welding");
        assert_eq!(truncate_text("automated welding", 9), "automated...");
        // 按字符而不是字节截断
        assert_eq!(truncate_text("焊接自动化技术", 2), "焊接...");
    }

    #[test]
    fn test_log_file_error_keeps_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("run.log");
        let path = path.to_string_lossy().to_string();

        let err = init_log_file(&path).unwrap_err();
        match err {
            AppError::File(crate::error::FileError::WriteFailed { path: failed, .. }) => {
                assert_eq!(failed, path)
            }
            other => panic!("应该是写入失败: {:?}", other),
        }
    }
}
