use anyhow::Result;
use blog_workflow::cli::Cli;
use blog_workflow::workflow::{AssumeYes, Confirmer};
use blog_workflow::{logger, App, Config};
use clap::Parser;
use std::io::{self, BufRead, Write};

/// 从标准输入读取 y/N
struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logger::init_with_verbose(cli.verbose || config.verbose_logging);

    let confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirmer)
    };

    // 初始化并运行应用
    App::initialize(config, confirmer).await?.run(cli.command).await?;

    Ok(())
}
