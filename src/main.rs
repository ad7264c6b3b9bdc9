//! autotranslate 命令行入口
//!
//! 读取 HTML 文件，经 HTTP 翻译后端执行一次扫描，输出翻译后的 HTML。

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use tracing::{error, info, warn};

use dom_autotranslate::env::{self, EnvVar};
use dom_autotranslate::parsers::html::{html_to_dom, serialize_document, LiveDocument};
use dom_autotranslate::translation::{
    ConfigManager, DomScanner, OriginalTextRegistry, SweepOrchestrator, SweepOutcome,
    TranslationService,
};

#[derive(Parser, Debug)]
#[command(
    name = "autotranslate",
    version,
    about = "Translate the visible text of an HTML document",
    after_help = "Use --env-docs to list the AUTOTRANSLATE_* environment variables."
)]
struct Cli {
    /// HTML file to translate ("-" reads stdin)
    #[arg(required_unless_present_any = ["env_docs", "write_config"])]
    input: Option<PathBuf>,

    /// Target language code, e.g. "fr" or "pt-BR"
    #[arg(short, long, required_unless_present_any = ["env_docs", "write_config"])]
    to: Option<String>,

    /// Base language of the document (overrides the configured base_lang)
    #[arg(short, long)]
    from: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Translation API endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Character encoding of the input and output document
    #[arg(short = 'E', long, default_value = "UTF-8")]
    encoding: String,

    /// Print the supported environment variables and exit
    #[arg(long)]
    env_docs: bool,

    /// Write a configuration file with the default values and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn init_tracing() {
    let level = env::core::LogLevel::get().unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "dom_autotranslate={level},autotranslate={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(input: &Path) -> io::Result<Vec<u8>> {
    if input.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(input)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    run(cli).map_err(|e| {
        error!("{}", e);
        e
    })
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.env_docs {
        print!("{}", env::generate_env_docs());
        return Ok(());
    }

    if let Some(path) = &cli.write_config {
        ConfigManager::generate_example_config(path)?;
        info!("已写入默认配置: {}", path.display());
        return Ok(());
    }

    let (Some(input), Some(target_lang)) = (cli.input.as_ref(), cli.to.as_deref()) else {
        return Err("an input file and --to are required".into());
    };

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path)?,
        None => ConfigManager::load()?,
    };
    let mut config = manager.into_config();
    if let Some(from) = &cli.from {
        config.base_lang = from.clone();
    }
    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    config.validate()?;

    let bytes = read_input(input)?;
    let document = Rc::new(LiveDocument::new(html_to_dom(&bytes, cli.encoding.clone())));

    let service = TranslationService::from_config(&config)?.with_failure_observer(|failure| {
        warn!(
            "保留原文 {:?} ({}): {}",
            failure.text, failure.target_lang, failure.error
        )
    });
    let orchestrator = SweepOrchestrator::new(
        document.clone(),
        DomScanner::from_config(&config),
        Rc::new(service),
        Rc::new(OriginalTextRegistry::new()),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(orchestrator.sweep(target_lang));

    match &outcome {
        SweepOutcome::Applied(report) => info!(
            "{} → {}: 扫描 {} 个节点, 写回 {}, 失败 {}",
            config.base_lang, target_lang, report.scanned, report.applied, report.failed
        ),
        SweepOutcome::Restored { .. } => {
            info!("目标语言与基础语言 {} 相同，文档保持不变", config.base_lang)
        }
        SweepOutcome::NothingToTranslate => info!("文档中没有可翻译的文本"),
        SweepOutcome::Dropped => warn!("扫描被丢弃"),
    }

    let html = serialize_document(document.dom(), &cli.encoding)?;
    match &cli.output {
        Some(path) => fs::write(path, html)?,
        None => io::stdout().write_all(&html)?,
    }

    Ok(())
}
