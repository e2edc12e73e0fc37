pub mod agent;
pub mod highlight;
pub mod intent;
pub mod protocol;
pub mod registry;
pub mod report;
pub mod resolve;

pub use agent::PageAgent;
pub use highlight::{HighlightTracker, FRAME_INTERVAL, RERESOLVE_THROTTLE};
pub use intent::{IntentChoice, IntentError, IntentResolver};
pub use protocol::{AgentRequest, AgentResponse, TargetDescriptor};
pub use registry::{PageState, ScanRegistry, SharedPage};
pub use report::generate_crawl_report;

/// CLI banner.
pub fn print_banner() {
    println!(
        r#"
__      ____ _ _   _ _ __ ___   __ _ _ __| | __
\ \ /\ / / _` | | | | '_ ` _ \ / _` | '__| |/ /
 \ V  V / (_| | |_| | | | | | | (_| | |  |   <
  \_/\_/ \__,_|\__, |_| |_| |_|\__,_|_|  |_|\_\
               |___/                 v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
