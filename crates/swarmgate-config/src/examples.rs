// crates/swarmgate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `swarmgate.toml`. Kept valid by the config test suite.

/// Returns a canonical example `swarmgate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[timeouts]
request_timeout_ms = 30000

[tokens]
refresh_margin_ms = 30000
default_ttl_ms = 300000

[testdata]
# producer_address = "tcp://master:5557"

[log]
sink = "stderr"

[[scenarios]]
name = "do some posts"
identifier = "001"

[scenarios.testdata]
order = "sequential"
cyclic = false
sources = [
  { type = "inline", records = [{ username = "alice" }, { username = "bob" }] },
  { type = "json_lines_file", path = "users.jsonl" },
]

[scenarios.validation]
fail_ratio = 0.1
avg_response_time_ms = 500.0
response_time_percentile = { percentile = 0.99, threshold_ms = 2000 }

[[scenarios]]
name = "browse catalog"

[scenarios.testdata]
order = "random"
cyclic = true
sources = [{ type = "json_file", path = "products.json" }]
"#,
    )
}
