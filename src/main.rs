use clap::Parser;
use mortgage_assistant::app::commands;
use mortgage_assistant::config::Command;
use mortgage_assistant::utils::error::ErrorSeverity;
use mortgage_assistant::utils::{logger, validation::Validate};
use mortgage_assistant::{AssistantSession, CliConfig, RatesConfig};

async fn run(config: &CliConfig) -> mortgage_assistant::Result<Option<String>> {
    let rates = RatesConfig::load(config.config.as_deref())?;

    if let Command::Chat(args) = &config.command {
        let backend = commands::chat_backend(args)?;
        let session = AssistantSession::new(backend, &rates).with_max_history(args.max_history);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        commands::run_chat(session, &rates, stdin, &mut stdout).await?;
        return Ok(None);
    }

    commands::execute(config, &rates).await.map(Some)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let result = run(&config).await;

    match result {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
