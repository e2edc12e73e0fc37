use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("waymark")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("waymark")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Map the clickable surface of a site with a bounded breadth-first crawl \
                    starting from one page.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to start crawling from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-d --"max-depth" <DEPTH>)
                        .required(false)
                        .help("How many link hops to follow from the start page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(-p --"max-pages" <PAGES>)
                        .required(false)
                        .help("Stop once this many pages have been analyzed")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"cookie" <COOKIE>)
                        .required(false)
                        .help("Cookie header value sent with every fetch")
                        .conflicts_with("cookies-file"),
                )
                .arg(
                    arg!(--"cookies-file" <PATH>)
                        .required(false)
                        .help("File holding the Cookie header value (supports ~)")
                        .conflicts_with("cookie"),
                )
                .arg(
                    arg!(--"timeout" <SECS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(arg!(--"json" "Emit the raw crawl outcome as JSON").required(false)),
        )
        .subcommand(
            command!("scan")
                .about("Enumerate the clickable elements and search inputs of a single page.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to analyze")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"cookie" <COOKIE>)
                        .required(false)
                        .help("Cookie header value sent with the fetch")
                        .conflicts_with("cookies-file"),
                )
                .arg(
                    arg!(--"cookies-file" <PATH>)
                        .required(false)
                        .help("File holding the Cookie header value (supports ~)")
                        .conflicts_with("cookie"),
                )
                .arg(arg!(--"json" "Emit elements and search inputs as JSON").required(false)),
        )
        .subcommand(
            command!("guide")
                .about(
                    "Find the control matching a query and print the navigation steps \
                    leading to it.",
                )
                .arg(arg!(<QUERY> "What the user is trying to do"))
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page the user is on")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"deep" "Crawl linked pages before matching, not just the start page")
                        .required(false),
                )
                .arg(
                    arg!(-d --"max-depth" <DEPTH>)
                        .required(false)
                        .help("Crawl depth when --deep is set")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(-p --"max-pages" <PAGES>)
                        .required(false)
                        .help("Crawl page cap when --deep is set")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"cookie" <COOKIE>)
                        .required(false)
                        .help("Cookie header value sent with every fetch")
                        .conflicts_with("cookies-file"),
                )
                .arg(
                    arg!(--"cookies-file" <PATH>)
                        .required(false)
                        .help("File holding the Cookie header value (supports ~)")
                        .conflicts_with("cookie"),
                ),
        )
}
