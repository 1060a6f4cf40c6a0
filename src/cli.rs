//! 命令行参数定义

use crate::models::{OutputFormat, SessionMode};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "blog_workflow", version, about = "Drive the SEO blog generation workflow")]
pub struct Cli {
    /// 所有确认提示都自动回答 yes
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 恢复最近一次的会话并显示当前进度
    Resume,
    /// 手动模式：逐步生成一篇博客
    #[command(subcommand)]
    Manual(ManualCommand),
    /// 批量模式：上传表格并监控任务
    #[command(subcommand)]
    Batch(BatchCommand),
    /// 切换模式（另一种模式有会话时需要确认）
    Switch {
        #[arg(value_enum)]
        mode: ModeArg,
    },
}

#[derive(Debug, Subcommand)]
pub enum ManualCommand {
    /// 第 1 步：提交主关键词和 4-5 个辅助关键词
    Submit {
        #[arg(short, long = "main")]
        main_keyword: String,
        /// 逗号分隔
        #[arg(short, long, value_delimiter = ',', num_args = 1..)]
        keywords: Vec<String>,
    },
    /// 历史关键词组
    History,
    /// 从历史中选择关键词组，直接进入第 2 步
    Select { keyword_set_id: String },
    /// 第 2 步：抓取内容
    Scrape,
    /// 第 3 步：搜索图片
    Images,
    /// 第 4 步：执行下一个草稿步骤
    Draft {
        /// 一直执行到草稿完成
        #[arg(long)]
        all: bool,
    },
    /// 第 5 步：集成图片（最多 4 张）
    Integrate { image_ids: Vec<String> },
    /// 第 6 步：生成元数据
    Metadata,
    /// 下载最终 HTML
    Download {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 清除会话，回到第 1 步
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum BatchCommand {
    /// 上传 .xlsx / .xls 表格
    Upload { file: PathBuf },
    /// 监控当前批量任务直到结束
    Monitor {
        /// 结束后导出 CSV
        #[arg(long)]
        export: bool,
    },
    /// 最近的批量任务
    Jobs,
    /// 预览一个已完成的条目
    Preview { keyword: String },
    /// 下载已完成的条目
    Download {
        /// 关键词；不指定时下载全部成功条目
        keyword: Option<String>,
        #[arg(short, long, default_value = "html")]
        format: OutputFormat,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// 导出当前任务的结果 CSV
    Export,
    /// 清除批量会话
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Manual,
    Batch,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Manual => SessionMode::Manual,
            ModeArg::Batch => SessionMode::Batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual_submit() {
        let cli = Cli::try_parse_from([
            "blog_workflow",
            "manual",
            "submit",
            "--main",
            "Automated Welding",
            "--keywords",
            "robotic welding,welding automation,industrial welding,smart welding",
        ])
        .unwrap();

        match cli.command {
            Command::Manual(ManualCommand::Submit {
                main_keyword,
                keywords,
            }) => {
                assert_eq!(main_keyword, "Automated Welding");
                assert_eq!(keywords.len(), 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_batch_download_format() {
        let cli = Cli::try_parse_from(["blog_workflow", "-y", "batch", "download", "--format", "json"])
            .unwrap();
        assert!(cli.yes);
        match cli.command {
            Command::Batch(BatchCommand::Download {
                keyword, format, ..
            }) => {
                assert!(keyword.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(Cli::try_parse_from(["blog_workflow", "batch", "download", "--format", "pdf"]).is_err());
    }
}
