//! transpool — 以批处理、限流并发与多轮重试翻译 JSON 字符串表或多语言翻译文件的命令行工具
//!
//! Usage:
//!   transpool translate --from <code> --to <code> --input <file> [OPTIONS]
//!   transpool version
//!   transpool help

use anyhow::{bail, Context};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use transpool::progress::{CompositeProgress, TracingProgress};
use transpool::transform::GoogleWebConfig;
use transpool::store::{FileFormat, StringMap};
use transpool::{
    CaseMatch, EchoTransform, GoogleWebTransform, JsonStringTable, ProgressObserver, ReadStore,
    RetryOrchestrator, RunConfig, RunSummary, TextTransform, TranslationsFile,
};

const LINE_CLEAR: &str = "\x1b[2K";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "translate" => cmd_translate(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"transpool — 批量翻译 JSON 字符串表

USAGE:
    transpool <COMMAND> [OPTIONS]

COMMANDS:
    translate                   Translate a Strings.json or Translations.json file
    version                     Show version information
    help                        Show this help message

TRANSLATE OPTIONS:
    --from <code>               Source language code (default: auto)
    --to <code>                 Target language code (required)
    --input <file>              Source JSON file (required)
    --output <file>             Target JSON file (default: Strings_<to>.json or
                                Translations_<to>.json next to the input)
    --peer <file>               JSON file to copy already translated strings from
                                (Translations.json uses its own target language)
    --save-source               Write results back into the input Translations.json
    --save-strings              Also write the target strings as Strings_<to>.json
    --config <file>             YAML run configuration
    --limit <n>                 Stop after submitting n strings
    --dry-run                   Copy strings without calling the translation service

ENVIRONMENT:
    RUST_LOG                        Log filter (default: info)
    TRANSPOOL_POOL_CAPACITY         Concurrent requests
    TRANSPOOL_BYTE_BUDGET           Bytes per request
    TRANSPOOL_MAX_BATCH_COUNT       Strings per request
    TRANSPOOL_MAX_ATTEMPTS          Passes over the source file
    TRANSPOOL_ITEM_LIMIT            Same as --limit
    TRANSPOOL_LIVENESS_TIMEOUT_SECS Seconds between "still waiting" reports
    TRANSPOOL_HTTP_TIMEOUT_SECS     HTTP request timeout
    TRANSPOOL_PROXY_URL             Proxy for the translation service"#
    );
}

fn cmd_version() {
    println!("transpool {}", env!("CARGO_PKG_VERSION"));
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn sibling(input: &Path, name: String) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    dir.join(name)
}

/// Single status line, rewritten in place after every harvested batch.
#[derive(Default)]
struct ConsoleProgress {
    done: AtomicUsize,
    fault: AtomicUsize,
}

impl ConsoleProgress {
    /// Add a harvest to the running totals of the current attempt.
    fn record(&self, done: usize, fault: usize) -> (usize, usize) {
        let total_done = self.done.fetch_add(done, Ordering::Relaxed) + done;
        let total_fault = self.fault.fetch_add(fault, Ordering::Relaxed) + fault;
        (total_done, total_fault)
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, done: usize, fault: usize) {
        let (total_done, total_fault) = self.record(done, fault);
        print!("{LINE_CLEAR}Translated total {total_done} strings (fault {total_fault}).\r");
        let _ = std::io::stdout().flush();
    }

    fn on_attempt(&self, attempt: u32) {
        self.done.store(0, Ordering::Relaxed);
        self.fault.store(0, Ordering::Relaxed);
        if attempt > 1 {
            println!("{LINE_CLEAR}Attempt {attempt}...");
        }
    }
}

struct TranslateOptions {
    source: String,
    target: String,
    input: PathBuf,
    output: Option<PathBuf>,
    peer: Option<PathBuf>,
    dry_run: bool,
    save_source: bool,
    save_strings: bool,
    config: RunConfig,
}

impl TranslateOptions {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let Some(target) = flag_value(args, "--to") else {
            bail!("please provide a target language code (--to <code>)");
        };
        let Some(input) = flag_value(args, "--input").map(PathBuf::from) else {
            bail!("please provide a source file (--input <file>)");
        };
        if !input.is_file() {
            bail!("source file {} was not found", input.display());
        }

        let mut config = match flag_value(args, "--config") {
            Some(path) => RunConfig::from_path(path)?,
            None => RunConfig::default(),
        };
        config = config.with_env_overrides();
        if let Some(limit) = flag_value(args, "--limit") {
            let limit = limit
                .parse::<usize>()
                .with_context(|| format!("--limit expects a number, got {limit:?}"))?;
            config = config.with_item_limit(limit);
        }

        Ok(Self {
            source: flag_value(args, "--from").unwrap_or("auto").to_string(),
            target: target.to_string(),
            input,
            output: flag_value(args, "--output").map(PathBuf::from),
            peer: flag_value(args, "--peer").map(PathBuf::from),
            dry_run: has_flag(args, "--dry-run"),
            save_source: has_flag(args, "--save-source"),
            save_strings: has_flag(args, "--save-strings"),
            config,
        })
    }

    fn orchestrator(&self, source: &str) -> anyhow::Result<RetryOrchestrator> {
        let transform: Arc<dyn TextTransform> = if self.dry_run {
            Arc::new(EchoTransform::new())
        } else {
            Arc::new(GoogleWebTransform::new(GoogleWebConfig::from_env())?)
        };
        let observer = CompositeProgress::new()
            .add_observer(Arc::new(ConsoleProgress::default()))
            .add_observer(Arc::new(TracingProgress::new()));
        Ok(RetryOrchestrator::builder()
            .with_config(self.config.clone().with_locales(source, &self.target))
            .with_transform(transform)
            .with_observer(Arc::new(observer))
            .with_post_processor(Arc::new(CaseMatch))
            .build()?)
    }

    fn load_peer(&self) -> anyhow::Result<Option<JsonStringTable>> {
        match &self.peer {
            Some(path) => Ok(Some(
                JsonStringTable::load(path)
                    .with_context(|| format!("cannot load peer {}", path.display()))?,
            )),
            None => Ok(None),
        }
    }
}

async fn cmd_translate(args: &[String]) -> anyhow::Result<()> {
    let options = TranslateOptions::parse(args)?;
    let content = std::fs::read_to_string(&options.input)
        .with_context(|| format!("cannot read {}", options.input.display()))?;
    let format = FileFormat::detect(&content)
        .with_context(|| format!("{} is not a JSON object", options.input.display()))?;
    match format {
        FileFormat::StringTable => translate_string_table(&options).await,
        FileFormat::Translations => translate_translations_file(&options).await,
    }
}

fn print_summary(summary: &RunSummary, percent: f64) {
    println!(
        "{} strings were translated and {} copied ({:.1}% of total text) in {} attempts.",
        summary.translated, summary.cloned, percent, summary.attempts
    );
    if summary.pending > 0 {
        println!("{} strings are still pending.", summary.pending);
    }
}

fn nothing_done(summary: &RunSummary) -> bool {
    summary.translated + summary.cloned == 0
}

async fn translate_string_table(options: &TranslateOptions) -> anyhow::Result<()> {
    let output = options.output.clone().unwrap_or_else(|| {
        sibling(&options.input, format!("Strings_{}.json", options.target))
    });
    let source_table = JsonStringTable::load(&options.input)
        .with_context(|| format!("cannot load {}", options.input.display()))?;
    let items = source_table.entries().to_work_items();
    let mut target_table = JsonStringTable::load(&output)
        .with_context(|| format!("cannot load {}", output.display()))?;
    let peer = options.load_peer()?;
    println!(
        "Total {} strings in source language ({} in target language).",
        items.len(),
        target_table.len()
    );

    let orchestrator = options.orchestrator(&options.source)?;
    let peer_ref = peer.as_ref().map(|p| p as &dyn ReadStore);
    let summary = orchestrator.run(&items, &mut target_table, peer_ref).await?;
    println!("{LINE_CLEAR}");

    if nothing_done(&summary) {
        println!("Nothing to do!");
        return Ok(());
    }
    let saved = target_table.save(None)?;
    print_summary(&summary, summary.completion_percent());
    println!(
        "{} strings in the result JSON file {}.",
        target_table.len(),
        saved.display()
    );
    Ok(())
}

async fn translate_translations_file(options: &TranslateOptions) -> anyhow::Result<()> {
    let target = options.target.as_str();
    let mut file = TranslationsFile::load(&options.input)
        .with_context(|| format!("cannot load {}", options.input.display()))?;

    let source = if options.source == "auto" {
        file.complete_language(target)
            .map(str::to_string)
            .with_context(|| {
                format!("{} has no fully translated language to use as source (--from <code>)", options.input.display())
            })?
    } else {
        options.source.clone()
    };
    let Some(source_entry) = file.language(&source) else {
        bail!("source language {source:?} is not in {}", options.input.display());
    };
    let items = source_entry.strings.to_work_items();
    let estimated = source_entry.estimated_total();
    println!("Total {} strings in source language {source}.", items.len());
    if source_entry.percentage < 100 && estimated > items.len() {
        println!("Estimated {estimated} strings in total ({}% present).", source_entry.percentage);
    }

    let peer: StringMap = match options.load_peer()? {
        Some(table) => table.entries().clone(),
        None => file.strings(target).cloned().unwrap_or_default(),
    };
    println!("{} strings already in target language {target}.", peer.len());

    let output = options.output.clone().unwrap_or_else(|| {
        sibling(&options.input, format!("Translations_{target}.json"))
    });
    let mut out_file = TranslationsFile::load(&output)
        .with_context(|| format!("cannot load {}", output.display()))?;
    if out_file.language(target).is_none() {
        let seed = file.language(target).map(|e| e.emptied()).unwrap_or_default();
        out_file.set_language(target, seed);
    }

    let orchestrator = options.orchestrator(&source)?;
    let summary = if options.save_source {
        orchestrator
            .run(&items, file.strings_mut(target), Some(&peer as &dyn ReadStore))
            .await?
    } else {
        orchestrator
            .run(&items, out_file.strings_mut(target), Some(&peer as &dyn ReadStore))
            .await?
    };
    println!("{LINE_CLEAR}");

    if nothing_done(&summary) {
        println!("Nothing to do!");
        return Ok(());
    }

    let percent = summary.percent_of(estimated);
    if options.save_source {
        file.language_mut(target).percentage = percent as u32;
        let strings = file.strings(target).cloned().unwrap_or_default();
        let entry = out_file.language_mut(target);
        entry.strings = strings;
        entry.percentage = percent as u32;
        if options.dry_run {
            println!("Dry run: {} left unchanged.", options.input.display());
        } else {
            file.save(None)?;
            println!("Updated {}.", options.input.display());
        }
    } else {
        out_file.language_mut(target).percentage = percent as u32;
    }
    let saved = out_file.save(None)?;
    print_summary(&summary, percent);
    println!("Saved {target} translations to {}.", saved.display());

    if options.save_strings {
        let strings = out_file.strings(target).cloned().unwrap_or_default();
        let path = sibling(&options.input, format!("Strings_{target}.json"));
        let saved = JsonStringTable::from_entries(strings).save(Some(&path))?;
        println!("Saved {target} strings to {}.", saved.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_progress_resets_per_attempt() {
        let progress = ConsoleProgress::default();
        progress.on_attempt(1);
        assert_eq!(progress.record(3, 1), (3, 1));
        assert_eq!(progress.record(2, 0), (5, 1));

        progress.on_attempt(2);
        assert_eq!(progress.record(1, 0), (1, 0));
    }

    #[test]
    fn test_sibling_path() {
        let path = sibling(Path::new("/data/Translations.json"), "Strings_de.json".to_string());
        assert_eq!(path, PathBuf::from("/data/Strings_de.json"));
        let bare = sibling(Path::new("Translations.json"), "Translations_de.json".to_string());
        assert_eq!(bare, PathBuf::from("Translations_de.json"));
    }
}
