//! Config loading and validation tests for swarmgate-config.
// crates/swarmgate-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Validate defaults, loading from disk, and derived views.
// Purpose: Ensure minimal config is valid and invariants are enforced.
// =============================================================================

use std::time::Duration;

use serde_json::json;
use swarmgate_config::LogSinkKind;
use swarmgate_config::SwarmgateConfig;
use swarmgate_config::config_toml_example;
use swarmgate_testdata::DataSource;
use swarmgate_testdata::PoolOrder;

mod common;

use common::TestResult;
use common::assert_invalid;
use common::config_from_toml;
use common::write_file;

#[test]
fn empty_config_uses_defaults() -> TestResult {
    let config = config_from_toml("").map_err(|err| err.to_string())?;
    if config.request_timeout() != Duration::from_secs(30) {
        return Err("request timeout should default to 30 s".to_string());
    }
    let policy = config.token_policy();
    if policy.refresh_margin_ms != 30_000 || policy.default_ttl_ms != 300_000 {
        return Err("unexpected token policy defaults".to_string());
    }
    if config.log.sink != LogSinkKind::Stderr {
        return Err("log sink should default to stderr".to_string());
    }
    if !config.pool_plans().is_empty() || config.testdata.producer_address.is_some() {
        return Err("empty config should carry no test data".to_string());
    }
    Ok(())
}

#[test]
fn canonical_example_is_valid() -> TestResult {
    let config = config_from_toml(&config_toml_example()).map_err(|err| err.to_string())?;
    let plans = config.pool_plans();
    if plans.len() != 2 {
        return Err(format!("expected 2 pool plans, got {}", plans.len()));
    }
    if plans[1].order != PoolOrder::Random || !plans[1].cyclic {
        return Err("second scenario should be a random cyclic pool".to_string());
    }
    let catalog = config.catalog().map_err(|err| err.to_string())?;
    let identifiers: Vec<&str> = catalog.iter().map(|s| s.identifier.as_str()).collect();
    if identifiers != ["001", "002"] {
        return Err(format!("unexpected identifiers {}", identifiers.join(",")));
    }
    Ok(())
}

#[test]
fn load_reads_file_and_resolves_relative_sources() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    write_file(&dir, "users.jsonl", "{\"username\":\"carol\"}\n")?;
    let path = write_file(
        &dir,
        "swarmgate.toml",
        r#"
[[scenarios]]
name = "login"

[scenarios.testdata]
sources = [
  { type = "inline", records = [{ username = "alice" }] },
  { type = "json_lines_file", path = "users.jsonl" },
]
"#,
    )?;
    let config = SwarmgateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let plans = config.pool_plans();
    let Some(plan) = plans.first() else {
        return Err("expected one pool plan".to_string());
    };
    if plan.scenario.as_str() != "login" {
        return Err(format!("unexpected scenario {}", plan.scenario));
    }
    match &plan.sources[..] {
        [DataSource::Inline { records }, DataSource::JsonLinesFile { path }] => {
            if records != &vec![json!({ "username": "alice" })] {
                return Err("inline records were not preserved".to_string());
            }
            if path != &dir.path().join("users.jsonl") {
                return Err(format!("relative source not resolved: {}", path.display()));
            }
            let loaded = plan.sources[1].load().map_err(|err| err.to_string())?;
            if loaded != vec![json!({ "username": "carol" })] {
                return Err("json lines source did not load".to_string());
            }
        }
        _ => return Err("unexpected source kinds".to_string()),
    }
    Ok(())
}

#[test]
fn load_rejects_missing_and_oversized_files() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    assert_invalid(SwarmgateConfig::load(Some(&dir.path().join("missing.toml"))), "io error")?;
    let big = write_file(&dir, "big.toml", &"#".repeat(2 * 1024 * 1024))?;
    assert_invalid(SwarmgateConfig::load(Some(&big)), "size limit")?;
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    assert_invalid(config_from_toml("[timeouts]\nrequest_timeout = 5\n"), "parse error")
}

#[test]
fn request_timeout_is_bounded() -> TestResult {
    assert_invalid(
        config_from_toml("[timeouts]\nrequest_timeout_ms = 10\n"),
        "timeouts.request_timeout_ms",
    )
}

#[test]
fn refresh_margin_must_fit_ttl() -> TestResult {
    assert_invalid(
        config_from_toml("[tokens]\nrefresh_margin_ms = 600000\n"),
        "tokens.refresh_margin_ms",
    )
}

#[test]
fn scenario_names_must_be_unique() -> TestResult {
    assert_invalid(
        config_from_toml("[[scenarios]]\nname = \"a\"\n[[scenarios]]\nname = \"a\"\n"),
        "duplicate scenario name",
    )
}

#[test]
fn scenario_identifiers_must_be_unique() -> TestResult {
    assert_invalid(
        config_from_toml(
            "[[scenarios]]\nname = \"a\"\n[[scenarios]]\nname = \"b\"\nidentifier = \"001\"\n",
        ),
        "duplicate scenario identifier",
    )
}

#[test]
fn padded_scenario_identifier_is_rejected() -> TestResult {
    assert_invalid(
        config_from_toml("[[scenarios]]\nname = \"a\"\nidentifier = \" 001\"\n"),
        "single non-empty word",
    )?;
    assert_invalid(
        config_from_toml("[[scenarios]]\nname = \"a\"\nidentifier = \"001 \"\n"),
        "single non-empty word",
    )
}

#[test]
fn empty_scenario_name_is_rejected() -> TestResult {
    assert_invalid(config_from_toml("[[scenarios]]\nname = \"  \"\n"), "non-empty")
}

#[test]
fn thresholds_are_range_checked() -> TestResult {
    assert_invalid(
        config_from_toml("[[scenarios]]\nname = \"a\"\n[scenarios.validation]\nfail_ratio = 1.5\n"),
        "fail_ratio",
    )?;
    assert_invalid(
        config_from_toml(
            "[[scenarios]]\nname = \"a\"\n[scenarios.validation]\nresponse_time_percentile = { \
             percentile = 0.0, threshold_ms = 10 }\n",
        ),
        "percentile",
    )
}

#[test]
fn file_sink_requires_path() -> TestResult {
    assert_invalid(config_from_toml("[log]\nsink = \"file\"\n"), "log.path")
}

#[test]
fn file_sink_writes_json_lines() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = write_file(&dir, "swarmgate.toml", "[log]\nsink = \"file\"\npath = \"run.log\"\n")?;
    let config = SwarmgateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let log = config.build_run_log().map_err(|err| err.to_string())?;
    log.record(&swarmgate_core::RunLogEvent::error("check", "there is no test data"));
    let written = std::fs::read_to_string(dir.path().join("run.log")).map_err(|err| err.to_string())?;
    if !written.contains("there is no test data") {
        return Err(format!("log file missing event: {written}"));
    }
    Ok(())
}

#[test]
fn blank_producer_address_is_rejected() -> TestResult {
    assert_invalid(
        config_from_toml("[testdata]\nproducer_address = \" \"\n"),
        "testdata.producer_address",
    )
}
