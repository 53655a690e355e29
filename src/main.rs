use anyhow::Result;
use quiz_bank_ingest::utils::logging;
use quiz_bank_ingest::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init_log_file(&config.output_log_file)?;
    logging::init(config.verbose_logging, Some(&config.output_log_file))?;

    // 初始化并运行应用
    let _summary = App::initialize(config).await?.run().await?;

    Ok(())
}
