use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

use page_archiver::{
    ArchiveCommand, FetcherConfig, HttpFetcher, HttpRequest, PageArchiver, ResponseClassifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = ArchiveCommand::parse();

    // Scheme-less input gets a default scheme before reaching the archiver.
    let url = if args.url.starts_with("http://") || args.url.starts_with("https://") {
        args.url.clone()
    } else {
        format!("https://{}", args.url)
    };

    let fetcher = HttpFetcher::new(FetcherConfig {
        timeout: Duration::from_secs(args.timeout),
        user_agent: args.user_agent.clone(),
        max_redirects: args.max_redirects,
    })?;

    let mut archiver = PageArchiver::new(fetcher, &args.cache_dir)?;
    if !args.quiet {
        archiver = archiver.with_progress();
    }

    if args.json {
        let summary = archiver.fetch(&url).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("🚀 Archiving page: {}", url.blue());
    println!("📁 Cache directory: {:?}", args.cache_dir);

    let request = HttpRequest::new(&url, "GET");
    let response = request.send(&archiver).await;

    let classifier = ResponseClassifier::new();
    let (response, handled) = classifier.classify(response);

    println!();
    println!("📡 Status: {}", response.status_code);
    if let Some(handler) = response.headers.get("X-Handled-By") {
        println!("🔗 Handled by: {}", handler);
    }
    if !handled {
        println!("{}", "⚠️  Response passed through unclassified".yellow());
    }
    if let Some(cache_dir) = response.headers.get("X-Cache-Dir") {
        println!("📂 Cache location: {}", cache_dir);
    }
    if let Some(index_path) = response.headers.get("X-Index-Path") {
        println!("{} {}", "✅ Snapshot ready at:".green(), index_path);
    } else {
        println!(
            "{}",
            "⚠️  No snapshot was saved; showing the upstream response".yellow()
        );
    }

    Ok(())
}
