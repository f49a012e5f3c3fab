use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use zk_election::{new_err, ElectionError};

/// Node settings read from a properties file (`key=value`, `#` and `!` comments).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub connection_string: String,
    pub message: String,
    pub candidates: u32,
    pub output: String,
    pub failover_period: Duration,
    pub failover_rounds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            connection_string: "localhost:2181".to_string(),
            message: "a Speaker msg, being written to file".to_string(),
            candidates: 3,
            output: "out.txt".to_string(),
            failover_period: Duration::from_millis(3000),
            failover_rounds: 5,
        }
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, ElectionError> {
    let path = path.as_ref();

    match fs::read_to_string(path) {
        Ok(content) => parse(&content),
        Err(ref err) if err.kind() == ErrorKind::NotFound => {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Settings::default())
        }
        Err(err) => new_err(
            format!("Couldn't read config file {}", path.display()),
            err.to_string(),
        ),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ElectionError> {
    match value.parse::<u64>() {
        Ok(number) => Ok(number),
        Err(err) => new_err(format!("Invalid value '{}' for {}", value, key), err.to_string()),
    }
}

pub fn parse(content: &str) -> Result<Settings, ElectionError> {
    let mut settings = Settings::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let separator = match line.find(|c: char| c == '=' || c == ':') {
            Some(position) => position,
            None => {
                warn!("Config line ignored: {}", line);
                continue;
            }
        };
        let key = line[..separator].trim();
        let value = line[separator + 1..].trim();

        match key {
            "connectionString" => settings.connection_string = value.to_string(),
            "message" => settings.message = value.to_string(),
            "output" => settings.output = value.to_string(),
            "candidates" => settings.candidates = parse_number(key, value)? as u32,
            "failoverPeriodMillis" => {
                settings.failover_period = Duration::from_millis(parse_number(key, value)?)
            }
            "failoverRounds" => settings.failover_rounds = parse_number(key, value)? as u32,
            _ => warn!("Unknown config key ignored: {}", key),
        }
    }

    if settings.connection_string.is_empty() {
        return new_err("Invalid config".to_string(), "empty connectionString".to_string());
    }
    if settings.candidates == 0 {
        return new_err("Invalid config".to_string(), "candidates must be positive".to_string());
    }

    Ok(settings)
}
