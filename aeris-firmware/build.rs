//! Build script for aeris-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates node.toml at compile time and exports it as `AERIS_*`
//!   environment variables for `src/config.rs`

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    let config = load_config();
    validate_config(&config);
    export_config(&config);
    export_wifi_password();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Read and parse node.toml
fn load_config() -> toml::Value {
    println!("cargo:rerun-if-changed=node.toml");

    let config_path = Path::new("node.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: node.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a node.toml configuration file.           ║\n\
            ║  Please create one in the aeris-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read node.toml                                 ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in node.toml                         ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fail(title: &str, errors: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// String keys that must be present and non-empty
const REQUIRED_STRINGS: &[(&str, &str)] = &[
    ("wifi", "ssid"),
    ("broker", "endpoint"),
    ("broker", "client_id"),
    ("broker", "publish_topic"),
    ("broker", "subscribe_topic"),
    ("node", "ntp_server"),
    ("display", "title"),
    ("display", "subtitle"),
];

/// Integer keys with their accepted ranges
const REQUIRED_INTEGERS: &[(&str, &str, i64, i64)] = &[
    ("wifi", "link_timeout_ms", 1, 600_000),
    ("wifi", "link_poll_ms", 1, 60_000),
    ("broker", "port", 1, 65_535),
    ("broker", "keep_alive_secs", 0, 65_535),
    ("node", "publish_interval_secs", 1, 86_400),
    ("node", "loop_delay_ms", 1, 60_000),
    ("node", "notice_pause_ms", 0, 60_000),
];

fn lookup<'a>(config: &'a toml::Value, section: &str, key: &str) -> Option<&'a toml::Value> {
    config.get(section).and_then(|s| s.get(key))
}

fn validate_config(config: &toml::Value) {
    let mut errors = Vec::new();

    for (section, key) in REQUIRED_STRINGS {
        match lookup(config, section, key) {
            Some(toml::Value::String(s)) if !s.trim().is_empty() => {}
            Some(toml::Value::String(_)) => errors.push(format!("[{}] '{}' is empty", section, key)),
            Some(_) => errors.push(format!("[{}] '{}' must be a string", section, key)),
            None => errors.push(format!("[{}] missing '{}'", section, key)),
        }
    }

    for (section, key, min, max) in REQUIRED_INTEGERS {
        match lookup(config, section, key) {
            Some(toml::Value::Integer(v)) if (*min..=*max).contains(v) => {}
            Some(toml::Value::Integer(_)) => {
                errors.push(format!("[{}] '{}' must be {}-{}", section, key, min, max))
            }
            Some(_) => errors.push(format!("[{}] '{}' must be an integer", section, key)),
            None => errors.push(format!("[{}] missing '{}'", section, key)),
        }
    }

    for key in ["publish_topic", "subscribe_topic"] {
        if let Some(toml::Value::String(topic)) = lookup(config, "broker", key) {
            if topic.contains(['+', '#']) {
                errors.push(format!("[broker] '{}' must not contain wildcards", key));
            }
        }
    }

    if let (Some(toml::Value::Integer(poll)), Some(toml::Value::Integer(timeout))) = (
        lookup(config, "wifi", "link_poll_ms"),
        lookup(config, "wifi", "link_timeout_ms"),
    ) {
        if poll > timeout {
            errors.push("[wifi] link_poll_ms must not exceed link_timeout_ms".to_string());
        }
    }

    if !errors.is_empty() {
        fail("Invalid node.toml configuration", &errors);
    }

    println!("cargo:warning=node.toml validated successfully");
}

/// `[broker] client_id` becomes `AERIS_BROKER_CLIENT_ID`
fn export_config(config: &toml::Value) {
    let strings = REQUIRED_STRINGS.iter().map(|(s, k)| (*s, *k));
    let integers = REQUIRED_INTEGERS.iter().map(|(s, k, _, _)| (*s, *k));

    for (section, key) in strings.chain(integers) {
        let value = match lookup(config, section, key) {
            Some(toml::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => continue,
        };
        println!(
            "cargo:rustc-env=AERIS_{}_{}={}",
            section.to_uppercase(),
            key.to_uppercase(),
            value
        );
    }
}

/// The WiFi password comes from the build environment, never from node.toml
fn export_wifi_password() {
    println!("cargo:rerun-if-env-changed=AERIS_WIFI_PASSWORD");

    let password = env::var("AERIS_WIFI_PASSWORD").unwrap_or_else(|_| {
        println!("cargo:warning=AERIS_WIFI_PASSWORD not set, joining as an open network");
        String::new()
    });
    println!("cargo:rustc-env=AERIS_WIFI_PASSWORD={}", password);
}
