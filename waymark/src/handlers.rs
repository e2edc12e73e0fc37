use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pager::Pager;
use std::fs;
use std::sync::Arc;
use url::Url;
use waymark_core::intent::{IntentChoice, IntentError, IntentResolver};
use waymark_core::protocol::TargetDescriptor;
use waymark_core::report::generate_crawl_report;
use waymark_scanner::enumerate::{EnumerateOptions, Enumeration, enumerate};
use waymark_scanner::result::ElementDescriptor;
use waymark_scanner::{CrawlLimits, CrawlStart, Document, SiteCrawler};

/// Resolve the credential cookie from either an inline value or a file
/// path (tilde-expanded). `None` when neither was supplied.
pub fn load_cookie_value(
    cookie: Option<&str>,
    cookies_file: Option<&str>,
) -> Result<Option<String>, String> {
    if let Some(cookie) = cookie {
        return Ok(Some(cookie.to_string()));
    }
    let Some(path) = cookies_file else {
        return Ok(None);
    };
    let expanded = shellexpand::tilde(path);
    let content = fs::read_to_string(expanded.as_ref())
        .map_err(|e| format!("Failed to read cookies file {}: {}", path, e))?;
    let value = content.trim().to_string();
    if value.is_empty() {
        return Err(format!("Cookies file {} is empty", path));
    }
    Ok(Some(value))
}

fn cookie_from_args(args: &ArgMatches) -> Result<Option<String>, String> {
    load_cookie_value(
        args.get_one::<String>("cookie").map(String::as_str),
        args.get_one::<String>("cookies-file").map(String::as_str),
    )
}

/// The navigation steps shown to the user: the link labels leading to
/// the target's page, then the target itself.
pub fn guide_steps(choice: &IntentChoice) -> Vec<String> {
    let mut steps = choice.navigation_path.clone();
    if !choice.target.text.is_empty() && steps.last() != Some(&choice.target.text) {
        steps.push(choice.target.text.clone());
    }
    steps
}

/// Score how well an element's label answers the query. `None` means no
/// plausible relation at all.
pub fn score_match(query: &str, text: &str) -> Option<f32> {
    let query = query.trim().to_lowercase();
    let text = text.trim().to_lowercase();
    if query.is_empty() || text.is_empty() {
        return None;
    }
    if query == text {
        return Some(1.0);
    }
    if text.contains(&query) || query.contains(&text) {
        return Some(0.85);
    }
    let query_words: Vec<&str> = query.split_whitespace().collect();
    let shared = query_words
        .iter()
        .filter(|word| text.split_whitespace().any(|t| t == **word))
        .count();
    if shared == 0 {
        return None;
    }
    Some(0.4 + 0.4 * shared as f32 / query_words.len() as f32)
}

/// Deterministic stand-in for the LLM intent resolver: ranks elements by
/// lexical affinity with the query. Elements discovered behind links are
/// intermediate hops by definition.
pub struct KeywordResolver;

impl IntentResolver for KeywordResolver {
    async fn choose(
        &self,
        query: &str,
        elements: &[ElementDescriptor],
    ) -> Result<Vec<IntentChoice>, IntentError> {
        let mut scored: Vec<(f32, &ElementDescriptor)> = elements
            .iter()
            .filter_map(|el| score_match(query, &el.text).map(|score| (score, el)))
            .collect();
        // stable sort keeps enumeration order among equals
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(3)
            .map(|(confidence, el)| IntentChoice {
                target: TargetDescriptor::from_element(el),
                confidence,
                is_intermediate: el.depth.unwrap_or(0) > 0,
                message: None,
                navigation_path: el.navigation_path.clone().unwrap_or_default(),
            })
            .collect())
    }
}

fn build_crawler(
    timeout: u64,
    cookie: Option<&str>,
    show_progress: bool,
) -> (SiteCrawler, Option<ProgressBar>) {
    let mut crawler = SiteCrawler::with_timeout(timeout);
    if let Some(cookie) = cookie {
        crawler = crawler.with_cookie_header(cookie);
    }
    let mut bar = None;
    if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message("Starting crawl...");
        let pb_clone = pb.clone();
        crawler = crawler.with_progress_callback(Arc::new(move |current, total| {
            pb_clone.set_message(format!("Crawling... {}/{} pages analyzed", current, total));
            pb_clone.tick();
        }));
        bar = Some(pb);
    }
    (crawler, bar)
}

pub async fn handle_crawl(args: &ArgMatches) {
    let url = args.get_one::<Url>("url").unwrap().clone();
    let json = args.get_flag("json");

    let cookie = match cookie_from_args(args) {
        Ok(cookie) => cookie,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(10);
    let (crawler, bar) = build_crawler(timeout, cookie.as_deref(), !json);
    let limits = CrawlLimits {
        max_depth: args.get_one::<usize>("max-depth").copied().unwrap_or(2),
        max_pages: args.get_one::<usize>("max-pages").copied().unwrap_or(30),
    };

    match crawler.crawl(CrawlStart { url, live: None }, limits).await {
        Ok(outcome) => {
            if let Some(bar) = bar {
                bar.finish_with_message(format!(
                    "Crawl complete! {} pages analyzed",
                    outcome.pages.len()
                ));
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
            } else {
                // Display report in pager
                Pager::with_pager("less -R").setup();
                print!("{}", generate_crawl_report(&outcome));
            }
        }
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_scan(args: &ArgMatches) {
    if let Err(e) = run_scan(args).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_scan(args: &ArgMatches) -> anyhow::Result<()> {
    let url = args.get_one::<Url>("url").unwrap().clone();
    let cookie = cookie_from_args(args).map_err(anyhow::Error::msg)?;
    let scan = fetch_and_enumerate(&url, cookie.as_deref()).await?;

    if args.get_flag("json") {
        println!(
            "{}",
            serde_json::json!({
                "elements": scan.elements,
                "searchInputs": scan.search_inputs,
            })
        );
        return Ok(());
    }

    println!(
        "{} {} clickable elements on {}\n",
        "→".blue(),
        scan.elements.len().to_string().bright_white(),
        url.as_str().bright_white()
    );
    for el in &scan.elements {
        let mut line = format!("  [{}] {}", el.element_type.cyan(), el.text);
        if let Some(href) = &el.href {
            line.push_str(&format!(" {}", href.bright_black()));
        }
        println!("{}", line);
    }
    if !scan.search_inputs.is_empty() {
        println!("\n{} search inputs:", "→".blue());
        for input in &scan.search_inputs {
            println!(
                "  [{}] placeholder: {:?} name: {:?}",
                input.input_type.cyan(),
                input.placeholder.as_deref().unwrap_or("-"),
                input.name.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(())
}

pub async fn handle_guide(args: &ArgMatches) {
    if let Err(e) = run_guide(args).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_guide(args: &ArgMatches) -> anyhow::Result<()> {
    let query = args.get_one::<String>("QUERY").unwrap();
    let url = args.get_one::<Url>("url").unwrap().clone();
    let cookie = cookie_from_args(args).map_err(anyhow::Error::msg)?;

    let elements: Vec<ElementDescriptor> = if args.get_flag("deep") {
        let (crawler, bar) = build_crawler(10, cookie.as_deref(), true);
        let limits = CrawlLimits {
            max_depth: args.get_one::<usize>("max-depth").copied().unwrap_or(2),
            max_pages: args.get_one::<usize>("max-pages").copied().unwrap_or(30),
        };
        let outcome = crawler
            .crawl(CrawlStart { url, live: None }, limits)
            .await
            .context("site crawl failed")?;
        if let Some(bar) = bar {
            bar.finish_with_message(format!(
                "Crawl complete! {} pages analyzed",
                outcome.pages.len()
            ));
        }
        outcome.elements
    } else {
        fetch_and_enumerate(&url, cookie.as_deref()).await?.elements
    };

    if elements.is_empty() {
        bail!("no clickable elements found on the page");
    }

    let candidates = KeywordResolver.choose(query, &elements).await?;
    let Some(best) = candidates.first() else {
        println!(
            "{} Nothing here matches \"{}\". Try different wording.",
            "✗".yellow().bold(),
            query
        );
        return Ok(());
    };

    println!(
        "{} Best match: {} {}",
        "✓".green().bold(),
        format!("\"{}\"", best.target.text).bright_white().bold(),
        format!("({:.0}% match)", best.confidence * 100.0).bright_black(),
    );

    let steps = guide_steps(best);
    if steps.len() > 1 {
        println!("\n  Path:");
        for (i, step) in steps.iter().enumerate() {
            println!("    {}. {}", i + 1, step.bright_white());
        }
    }

    let tooltip = if best.is_intermediate {
        "Click here, then search again on the next page"
    } else {
        "Click here"
    };
    println!("\n  {} {}", "👆".bold(), tooltip);

    if candidates.len() > 1 {
        println!("\n  Other candidates:");
        for candidate in &candidates[1..] {
            println!(
                "    - {} {}",
                candidate.target.text,
                format!("({:.0}%)", candidate.confidence * 100.0).bright_black()
            );
        }
    }
    Ok(())
}

async fn fetch_and_enumerate(url: &Url, cookie: Option<&str>) -> anyhow::Result<Enumeration> {
    let mut request = reqwest::Client::builder()
        .user_agent("Waymark/0.2 (+https://github.com/waymarkhq/waymark)")
        .build()?
        .get(url.clone());
    if let Some(cookie) = cookie {
        request = request.header(reqwest::header::COOKIE, cookie);
    }
    let body = request
        .send()
        .await
        .context("fetch failed")?
        .error_for_status()
        .context("page returned an error status")?
        .text()
        .await?;

    let doc = Document::parse(&body);
    Ok(enumerate(
        &doc,
        &EnumerateOptions {
            base_url: Some(url.clone()),
            page_url: Some(url.to_string()),
            ..Default::default()
        },
    ))
}
