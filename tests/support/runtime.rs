use std::time::Duration;

use cyclearb::app::{Config, Runtime};
use cyclearb::shutdown::Shutdown;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Engine settings tuned for fast tests; append venues and fishing after it.
pub fn engine_section(trading_enabled: bool, loop_finder_running: bool) -> String {
    format!(
        r#"
[engine]
coins_of_interest = ["X", "Y", "BTC", "USDT"]
evaluation_interval_ms = 20
discovery_interval_ms = 200
fishing_interval_ms = 20
discovery_workers = 2
trading_enabled = {trading_enabled}
loop_finder_running = {loop_finder_running}
"#
    )
}

/// A paper venue quoting X/Y and Y/X with a 10% round trip.
pub const ROUND_TRIP_VENUE: &str = r#"
[[venues]]
name = "alpha"
poll_period_ms = 10

[venues.paper.balances]
X = 1000
Y = 100000

[[venues.paper.pairs]]
base = "X"
quote = "Y"
bids = [[10, 100]]
asks = [[11, 100]]

[[venues.paper.pairs]]
base = "Y"
quote = "X"
bids = [[0.11, 2000]]
asks = [[0.12, 2000]]
"#;

pub async fn start(toml: &str) -> Runtime {
    let config = Config::parse(toml).expect("valid test config");
    Runtime::start(&config, Shutdown::new())
        .await
        .expect("engine starts")
}

pub async fn stop(runtime: Runtime) {
    runtime.shutdown();
    tokio::time::timeout(TIMEOUT, runtime.wait_exit())
        .await
        .expect("engine exits");
}
