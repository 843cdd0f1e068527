// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use clap::parser::ValueSource;

use crate::prelude::*;

pub const ENV_PREFIX: &str = "GRAYLOG";

/// Configuration lookup over command line arguments, environment
/// variables and an optional YAML file, in that order of priority.
pub struct Config {
    config: serde_yaml::Value,
    args: Option<clap::ArgMatches>,
}

impl Config {
    /// Build from command line arguments. If `config_flag` names an
    /// argument holding a filename, or GRAYLOG_CONFIG is set, that file
    /// is loaded.
    pub fn from_args(args: clap::ArgMatches, config_flag: Option<&str>) -> Result<Self> {
        let mut filename = None;
        if let Some(config_flag) = config_flag {
            if let Ok(Some(value)) = args.try_get_one::<String>(config_flag) {
                filename = Some(value.clone());
            }
        }
        if filename.is_none() {
            filename = std::env::var(format!("{ENV_PREFIX}_CONFIG")).ok();
        }
        let config = match filename {
            Some(filename) => Self::load_file(&filename)?,
            None => serde_yaml::Value::Null,
        };
        Ok(Self {
            config,
            args: Some(args),
        })
    }

    pub fn from_file(filename: &str) -> Result<Self> {
        Ok(Self {
            config: Self::load_file(filename)?,
            args: None,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config = serde_yaml::from_str(yaml)
            .map_err(|err| GraylogError::Config(format!("invalid yaml: {err}")))?;
        Ok(Self { config, args: None })
    }

    fn load_file(filename: &str) -> Result<serde_yaml::Value> {
        debug!("Loading configuration from {}", filename);
        let file = std::fs::File::open(filename)
            .map_err(|err| GraylogError::Config(format!("{filename}: {err}")))?;
        serde_yaml::from_reader(file).map_err(|err| GraylogError::Config(format!("{filename}: {err}")))
    }

    pub fn env_key(&self, key: &str) -> String {
        let xform = key.replace(['.', '-'], "_");
        format!("{}_{}", ENV_PREFIX, xform.to_uppercase())
    }

    fn arg_string(&self, key: &str) -> Option<(String, bool)> {
        let args = self.args.as_ref()?;
        let value = args.try_get_one::<String>(key).ok().flatten()?;
        let explicit = args.value_source(key) == Some(ValueSource::CommandLine);
        Some((value.clone(), explicit))
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut default: Option<String> = None;

        // First check if an argument was explicitly provided.
        if let Some((value, explicit)) = self.arg_string(key) {
            if explicit {
                return Ok(Some(value));
            }
            // Save the default...
            default = Some(value);
        }

        // Ok, no argument provided, check env.
        if let Ok(val) = std::env::var(self.env_key(key)) {
            return Ok(Some(val));
        }

        // No argument or environment variable, check the configuration file.
        let config_value = match self.find_value(key) {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        if let Some(value) = config_value {
            return Ok(Some(value));
        }

        // Is there a default value configured with clap?
        Ok(default)
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get_string(key)? {
            Some(value) => value
                .parse::<u64>()
                .map(Some)
                .map_err(|_| GraylogError::Config(format!("{key}: not an integer: {value}"))),
            None => Ok(None),
        }
    }

    /// Get a duration in humantime form ("30s", "2m").
    pub fn get_duration(&self, key: &str) -> Result<Option<std::time::Duration>> {
        match self.get_string(key)? {
            Some(value) => humantime::parse_duration(&value)
                .map(Some)
                .map_err(|err| GraylogError::Config(format!("{key}: {err}"))),
            None => Ok(None),
        }
    }

    /// Get a value as a bool, returning false if the key does not exist.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        if let Some(args) = &self.args {
            if let Ok(Some(flag)) = args.try_get_one::<bool>(key) {
                if args.value_source(key) == Some(ValueSource::CommandLine) {
                    return Ok(*flag);
                }
            }
        }

        // If no argument provided, check environment.
        if let Ok(val) = std::env::var(self.env_key(key)) {
            return match val.to_lowercase().as_ref() {
                "true" | "yes" | "1" => Ok(true),
                _ => Ok(false),
            };
        }

        if let serde_yaml::Value::Bool(v) = self.find_value(key) {
            return Ok(*v);
        }

        Ok(false)
    }

    fn find_value(&self, key: &str) -> &serde_yaml::Value {
        let val = &self.config[key];
        match val {
            serde_yaml::Value::Null => {}
            _ => return val,
        }
        let mut value = &self.config;
        for part in key.split('.') {
            value = &value[part];
        }
        value
    }
}
