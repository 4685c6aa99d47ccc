use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::definition::ToolOutput;
use super::error::ToolFailure;

/// A subprocess invocation with `{{key}}` placeholders filled from the tool
/// arguments.
///
/// A non-zero exit is an explicit failure; a spawn error is a raised one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Substitute placeholders in every argument.
    pub fn render_args(&self, arguments: &Value) -> Result<Vec<String>, ToolFailure> {
        self.args
            .iter()
            .map(|template| render(template, arguments, &self.program))
            .collect()
    }

    #[cfg(feature = "command-tools")]
    pub(crate) async fn run(&self, arguments: &Value) -> Result<ToolOutput, ToolFailure> {
        use tokio::process::Command;

        let rendered = self.render_args(arguments)?;
        let mut command = Command::new(&self.program);
        command.args(&rendered).kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(shellexpand::tilde(dir).as_ref());
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        debug!(program = %self.program, args = ?rendered, "Spawning command tool");
        let output = command.output().await.map_err(|source| ToolFailure::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(ToolOutput::ok(stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() { stdout } else { stderr };
        let code = output
            .status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Ok(ToolOutput::failed(format!(
            "command '{}' exited with {code}: {detail}",
            self.program
        )))
    }

    #[cfg(not(feature = "command-tools"))]
    pub(crate) async fn run(&self, _arguments: &Value) -> Result<ToolOutput, ToolFailure> {
        Err(ToolFailure::execution(format!(
            "command tool '{}' requires the `command-tools` feature",
            self.program
        )))
    }
}

fn render(template: &str, arguments: &Value, program: &str) -> Result<String, ToolFailure> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        rendered.push_str(&rest[..start]);
        let key = rest[start + 2..start + 2 + len].trim();
        let value = arguments
            .get(key)
            .ok_or_else(|| ToolFailure::MissingArgument {
                program: program.to_string(),
                key: key.to_string(),
            })?;
        match value {
            Value::String(text) => rendered.push_str(text),
            other => rendered.push_str(&other.to_string()),
        }
        rest = &rest[start + 2 + len + 2..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}
