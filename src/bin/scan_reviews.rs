use reviewtrust_lib::models::{ClassificationResult, ReviewInput};
use reviewtrust_lib::services::{
    dedupe_reviews, drop_non_review_content, BatchClassifier, BatchSummary, ConfigStore,
    ScannedReview,
};
use reviewtrust_lib::ConsoleOutput;
use serde::Deserialize;

/// stdout carries the summary, so log lines go to stderr
const LOG_OUTPUT: ConsoleOutput = ConsoleOutput::Stderr;

/// Accepted input files: scraped reviews or a ready-made request body
#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Scanned(Vec<ScannedReview>),
    Request { reviews: Vec<ReviewInput> },
}

#[derive(Debug, Default, PartialEq)]
struct Prepared {
    texts: Vec<String>,
    filtered: usize,
    duplicates: usize,
}

/// Scraped input is cleaned of non-review text first, then de-duplicated.
/// A ready-made request body is sent as-is.
fn prepare_texts(input: InputFile, filter: bool, dedupe: bool) -> Prepared {
    match input {
        InputFile::Scanned(reviews) => {
            let total = reviews.len();
            let reviews = if filter { drop_non_review_content(reviews) } else { reviews };
            let filtered = total - reviews.len();

            let kept = reviews.len();
            let reviews = if dedupe { dedupe_reviews(reviews) } else { reviews };
            let duplicates = kept - reviews.len();

            Prepared {
                texts: reviews.into_iter().map(|r| r.text).collect(),
                filtered,
                duplicates,
            }
        }
        InputFile::Request { reviews } => Prepared {
            texts: reviews.iter().map(|r| r.text().to_string()).collect(),
            ..Prepared::default()
        },
    }
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

async fn classify_remote(endpoint: &str, texts: &[String]) -> Result<Vec<ClassificationResult>, String> {
    let body = serde_json::json!({
        "reviews": texts.iter().map(|t| serde_json::json!({"review_text": t})).collect::<Vec<_>>(),
    });

    let response = reqwest::Client::new()
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(format!("service returned {}: {}", status.as_u16(), text));
    }

    response
        .json()
        .await
        .map_err(|e| format!("unexpected response: {}", e))
}

async fn classify_local(texts: &[String]) -> Result<Vec<ClassificationResult>, String> {
    let config = ConfigStore::from_env().resolve()?;
    let state = reviewtrust_lib::build_state(&config)
        .await
        .map_err(|e| e.to_string())?;
    let model = state
        .model
        .get()
        .cloned()
        .ok_or_else(|| "classifier could not be loaded (see log)".to_string())?;

    let reviews: Vec<ReviewInput> = texts.iter().map(ReviewInput::new).collect();
    BatchClassifier::new(model, state.explainer, state.options)
        .classify(&reviews)
        .await
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin scan_reviews -- <reviews.json> [--endpoint <url>] [--no-filter] [--no-dedupe] [--out <json_path>]\n\nNotes:\n  - Input is either [{{\"author\", \"text\"}}] or {{\"reviews\": [{{\"review_text\"}}]}}.\n  - Without --endpoint the configured model and provider are used in-process."
        );
        return Ok(());
    }

    let path = args[1].clone();
    let endpoint = parse_arg_value(&args, "--endpoint");
    let out_path = parse_arg_value(&args, "--out");
    let dedupe = !has_flag(&args, "--no-dedupe");
    let filter = !has_flag(&args, "--no-filter");

    if endpoint.is_none() {
        reviewtrust_lib::init_logging_to(LOG_OUTPUT);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| format!("read file failed: {}", e))?;
    let input: InputFile =
        serde_json::from_str(&content).map_err(|e| format!("parse input failed: {}", e))?;

    let prepared = prepare_texts(input, filter, dedupe);
    if prepared.filtered > 0 {
        println!("Skipped {} non-review entries", prepared.filtered);
    }
    if prepared.duplicates > 0 {
        println!("Removed {} duplicate reviews", prepared.duplicates);
    }
    let texts = prepared.texts;

    if texts.is_empty() {
        return Err("input contains no reviews".to_string());
    }

    println!("File: {}", path);
    println!("Reviews: {}", texts.len());
    println!("Mode: {}", endpoint.as_deref().unwrap_or("(in-process)"));
    println!();

    let results = match endpoint {
        Some(ref url) => classify_remote(url, &texts).await?,
        None => classify_local(&texts).await?,
    };

    let summary = BatchSummary::from_results(&texts, &results);
    println!(
        "Trust score: {}%  ({} of {} reviews suspicious)",
        summary.trust_score, summary.suspicious_count, summary.total_reviews
    );
    for s in &summary.suspicious_reviews {
        println!(
            "[R{:04}] confidence={} {} | {} | flags={}  {}",
            s.index,
            s.confidence,
            s.reason_category,
            s.reason_description,
            s.flags.join(","),
            preview(&s.review_text, 80)
        );
    }

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    match out_path {
        Some(out_path) => {
            std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
            println!();
            println!("Wrote JSON: {}", out_path);
        }
        None => {
            println!();
            println!("{}", json);
        }
    }

    Ok(())
}
