// Crawl report rendering for terminal output.

use chrono::Local;
use waymark_scanner::result::CrawlOutcome;

/// Render a crawl outcome as a human-readable report.
pub fn generate_crawl_report(outcome: &CrawlOutcome) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Crawl id: {}\n", outcome.crawl_id));
    report.push_str(&format!(
        "  Generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("  Pages analyzed: {}\n", outcome.pages.len()));
    report.push_str(&format!(
        "  Clickable elements found: {}\n",
        outcome.elements.len()
    ));

    let max_depth = outcome.pages.iter().map(|p| p.depth).max().unwrap_or(0);
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for depth in 0..=max_depth {
        let at_depth: Vec<_> = outcome.pages.iter().filter(|p| p.depth == depth).collect();
        if at_depth.is_empty() {
            continue;
        }
        report.push_str(&format!(
            "## \x1b[36mdepth {}\x1b[0m ({} pages)\n",
            depth,
            at_depth.len()
        ));
        for page in at_depth {
            report.push_str(&format!(
                "  {} \x1b[90m({} elements)\x1b[0m\n",
                page.url,
                page.elements.len()
            ));
            if !page.path.is_empty() {
                let trail: Vec<&str> = page.path.iter().map(|s| s.link_text.as_str()).collect();
                report.push_str(&format!("    \x1b[90mvia {}\x1b[0m\n", trail.join(" > ")));
            }
        }
        report.push('\n');
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use waymark_scanner::result::{PathStep, SitemapEntry};

    #[test]
    fn report_groups_pages_by_depth_with_their_trails() {
        let outcome = CrawlOutcome {
            crawl_id: Uuid::nil(),
            pages: vec![
                SitemapEntry {
                    url: "https://site.test/".into(),
                    depth: 0,
                    path: vec![],
                    elements: vec![],
                },
                SitemapEntry {
                    url: "https://site.test/shop".into(),
                    depth: 1,
                    path: vec![PathStep {
                        url: "https://site.test/".into(),
                        link_text: "Shop".into(),
                    }],
                    elements: vec![],
                },
            ],
            elements: vec![],
        };
        let report = generate_crawl_report(&outcome);
        assert!(report.contains("Pages analyzed: 2"));
        assert!(report.contains("depth 0"));
        assert!(report.contains("depth 1"));
        assert!(report.contains("via Shop"));
    }
}
