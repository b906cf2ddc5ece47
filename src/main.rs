// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use project_chat_export::{
    ChatHttpClient, CommandLineInput, ConsoleReporter, Destination, ExportReport, PipelineConfig,
    ProjectExporter,
};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("chat_project_export.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    // stderr, so `--pipe` output on stdout stays clean
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("⏹  Stopping after the current batch...");
            token.cancel();
        }
    });
}

/// Runs one export as configured.
async fn execute_export(config: &PipelineConfig) -> anyhow::Result<ExportReport> {
    let client = ChatHttpClient::new(&config.base_url, &config.cookie)
        .context("Failed to create the HTTP client")?
        .with_list_limit(config.list_limit);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let reporter = if matches!(config.output.destination, Destination::Stdout) {
        ConsoleReporter::quiet()
    } else {
        ConsoleReporter::new()
    };

    let exporter = ProjectExporter::new(
        Box::new(config.session_resolver()),
        Arc::new(client),
        Arc::new(reporter),
        config.output.clone(),
    )
    .with_batching(config.batching.clone())
    .with_retry_policy(config.retry)
    .with_cancellation(cancel);

    Ok(exporter.run().await?)
}

/// Reports completion to the user with stats and written files.
fn report_completion(config: &PipelineConfig, report: &ExportReport) {
    if matches!(config.output.destination, Destination::Stdout) {
        return;
    }

    println!(
        "📄 Exported {} of {} conversations from project {}",
        report.exported, report.total, report.identifiers.project
    );
    println!("   {}", report.stats);

    for failure in &report.failures {
        eprintln!("⚠️  {}", failure);
    }

    if let Destination::Directory(dir) = &config.output.destination {
        println!(
            "✓ {} files saved to {}",
            report.files.len(),
            dir.display()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = PipelineConfig::resolve(cli)?;
    let report = execute_export(&config).await?;
    report_completion(&config, &report);

    Ok(())
}
