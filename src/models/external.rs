use std::io::Write;
use std::process::{Command, Stdio};

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::{check_len, Regressor};
use crate::errors::ModelError;

/// A model evaluated by an external inference process.
///
/// Each prediction launches `command` with `args`, writes the features as a
/// JSON array followed by a newline to its standard input, and reads one JSON
/// value from its standard output. The value may be a bare number or a nested
/// array whose first element is the prediction, as batch-oriented inference
/// scripts usually print.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ExternalModel {
    /// Program to run.
    command: String,
    /// Arguments passed to the program.
    #[serde(default)]
    args: Vec<String>,
    /// Number of input features.
    #[serde(default = "default_input_len")]
    input_len: usize,
}

fn default_input_len() -> usize {
    crate::predictor::FEATURE_COUNT
}

impl ExternalModel {
    /// Describe an external model taking `input_len` features.
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>, input_len: usize) -> Self {
        Self {
            command: command.into(),
            args,
            input_len,
        }
    }

    /// Invoke the process once and return its raw standard output.
    fn run(&self, request: &str) -> Result<String, ModelError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                ModelError::External(format!("cannot start `{}`: {error}", self.command))
            })?;
        // Stdin is closed at the end of this block; the child is always
        // waited on, even when the write failed.
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(request.as_bytes()),
            None => Ok(()),
        };
        let output = child
            .wait_with_output()
            .map_err(|error| ModelError::External(format!("cannot read prediction: {error}")))?;
        sent.map_err(|error| {
            ModelError::External(format!("cannot send features to `{}`: {error}", self.command))
        })?;
        if !output.status.success() {
            return Err(ModelError::External(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract the first number from a bare number or nested array.
fn first_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Array(items) => items.first().and_then(first_number),
        _ => None,
    }
}

impl Regressor for ExternalModel {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.input_len, features)?;
        let mut request = serde_json::to_string(features)
            .map_err(|error| ModelError::External(format!("cannot encode features: {error}")))?;
        request.push('\n');
        trace!(command = %self.command, %request, "querying external model");
        let response = self.run(&request)?;
        let value: Value = serde_json::from_str(response.trim()).map_err(|error| {
            ModelError::External(format!("unparsable prediction {:?}: {error}", response.trim()))
        })?;
        first_number(&value).ok_or_else(|| {
            ModelError::External(format!("prediction {value} does not contain a number"))
        })
    }

    fn input_len(&self) -> usize {
        self.input_len
    }
}
