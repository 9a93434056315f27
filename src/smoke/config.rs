//! Smoke scenario definitions
//!
//! A scenario is one detector-server start: a single Karabo device
//! configuration passed as `init=` and the log line that proves the device
//! came up. Scenarios are built in or loaded from YAML:
//!
//! ```yaml
//! scenarios:
//!   - name: jf-control
//!     device:
//!       device_id: MyTestJfCtrl
//!       class_id: JungfrauControl
//!       properties:
//!         detectorHostName: ["jungfrau-det"]
//!     expect:
//!       contains: "got started on server"
//! ```

use std::borrow::Cow;
use std::path::Path;

use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::common::{Error, Result};

/// Configuration of the one device a server is started with
#[derive(Deserialize, Debug, Clone)]
pub struct DeviceConfig {
    pub device_id: String,
    pub class_id: String,
    /// Additional device properties, passed through verbatim
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl DeviceConfig {
    pub fn new(device_id: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            class_id: class_id.into(),
            properties: Map::new(),
        }
    }

    /// Add a property
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    /// The `{deviceId: {classId, ...}}` mapping the server expects
    pub fn to_json(&self) -> Value {
        let mut device = Map::new();
        device.insert("classId".to_string(), Value::String(self.class_id.clone()));
        for (key, value) in &self.properties {
            if key != "classId" {
                device.insert(key.clone(), value.clone());
            }
        }

        let mut root = Map::new();
        root.insert(self.device_id.clone(), Value::Object(device));
        Value::Object(root)
    }
}

/// `init=` argument carrying the shell-quoted JSON configuration
pub fn init_argument(config: &DeviceConfig) -> Result<String> {
    let json = serde_json::to_string(&config.to_json())?;
    Ok(format!("init={}", shell_escape::escape(Cow::Owned(json))))
}

/// Full shell command starting `server` with `config`
pub fn server_command(server: &str, config: &DeviceConfig) -> Result<String> {
    Ok(format!(
        "{} {}",
        shell_escape::escape(Cow::Borrowed(server)),
        init_argument(config)?
    ))
}

/// The log line a Karabo device of `class_id` prints once it is up
pub fn expected_startup_pattern(class_id: &str) -> String {
    format!(
        r"^.*\[info\] karabo\.core\.Device : '{}' \(version '.*'\) with deviceId: '.*' got started on server.*$",
        regex::escape(class_id)
    )
}

/// What the captured output must contain
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Expectation {
    /// Regular expression, multi-line mode; must match at least once
    pub pattern: Option<String>,
    /// Plain substring
    pub contains: Option<String>,
}

impl Expectation {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            contains: None,
        }
    }

    pub fn contains(text: impl Into<String>) -> Self {
        Self {
            pattern: None,
            contains: Some(text.into()),
        }
    }

    /// Check `output`, naming the first unmet condition on failure
    pub fn check(&self, output: &str) -> Result<()> {
        if let Some(pattern) = &self.pattern {
            let re = RegexBuilder::new(pattern)
                .multi_line(true)
                .build()
                .map_err(|e| Error::invalid_pattern(pattern, e))?;
            if !re.is_match(output) {
                return Err(Error::ExpectationFailed(format!("no line matches /{pattern}/")));
            }
        }

        if let Some(text) = &self.contains {
            if !output.contains(text.as_str()) {
                return Err(Error::ExpectationFailed(format!("'{text}' not in output")));
            }
        }

        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.contains.is_none()
    }
}

/// One smoke test
#[derive(Deserialize, Debug, Clone)]
pub struct SmokeScenario {
    pub name: String,
    pub description: Option<String>,
    pub device: DeviceConfig,
    /// Defaults to the startup line for the device class
    #[serde(default)]
    pub expect: Expectation,
}

impl SmokeScenario {
    /// The expectation actually checked for this scenario
    pub fn effective_expectation(&self) -> Expectation {
        if self.expect.is_empty() {
            Expectation::pattern(expected_startup_pattern(&self.device.class_id))
        } else {
            self.expect.clone()
        }
    }
}

/// Top level of a scenario file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    pub scenarios: Vec<SmokeScenario>,
}

impl ScenarioFile {
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ScenarioParse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }
}

/// The Gotthard2 control and receiver startup checks
pub fn builtin_scenarios() -> Vec<SmokeScenario> {
    let control = DeviceConfig::new("MyTestGh2Ctrl", "Gotthard2Control")
        .with("detectorHostName", json!(["scs-xox-gh22-det-gotthard2-control2"]))
        .with("udpSrcIp", json!(["10.253.15.102"]))
        .with("rxHostname", json!(["scs-rr-sys-con-jungf"]))
        .with("rxTcpPort", json!([3954]))
        .with("udpDstIp", json!(["10.253.15.101"]))
        .with("udpDstPort", json!([50001]));

    let receiver = DeviceConfig::new("MyTestGh2Recv", "Gotthard2Receiver");

    vec![
        SmokeScenario {
            name: "gh2-control".to_string(),
            description: Some("Gotthard2Control device starts".to_string()),
            expect: Expectation::pattern(expected_startup_pattern(&control.class_id)),
            device: control,
        },
        SmokeScenario {
            name: "gh2-receiver".to_string(),
            description: Some("Gotthard2Receiver device starts".to_string()),
            expect: Expectation::pattern(expected_startup_pattern(&receiver.class_id)),
            device: receiver,
        },
    ]
}
