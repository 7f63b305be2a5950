use anyhow::Result;
use log::LevelFilter;

use richtext::commands::USAGE;
use richtext::{input, CommandProcessor, Config, Invocation};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only command output.
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Warn);
        logger.filter_module("richtext", LevelFilter::Info);
        logger.filter_module("richtext_core", LevelFilter::Info);
    }
    logger.init();

    let invocation = match Invocation::parse(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("richtext: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = Config::load().await?;
    let max_input_bytes = config.limits.max_input_bytes;
    let processor = CommandProcessor::new(config)?;

    let input = if invocation.command.reads_input() {
        input::read_input(invocation.file.as_deref(), max_input_bytes).await?
    } else {
        if invocation.file.is_some() {
            log::warn!("--file is ignored by this command");
        }
        String::new()
    };

    match processor.execute_command(&invocation.command, &input).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(err) => {
            log::error!("Command failed: {}", err);
            Err(err)
        }
    }
}
