//! CPython bridge: parsing, materialization, and module reflection.
//!
//! Compiling and executing (possibly mutated) Python is fundamentally tied
//! to a live CPython runtime, so this module drives one as a subprocess:
//! an embedded driver script is materialized to a temp file once per
//! [`Interpreter`], and each operation spawns a fresh interpreter process,
//! sends one JSON request on stdin, and reads one JSON response line from
//! stdout.
//!
//! One process per request keeps materialization isolated — a mutant that
//! wedges or segfaults the interpreter takes down only its own process —
//! and makes concurrent materialization of distinct namespaces safe by
//! construction.
//!
//! This layer performs no retry and no suppression: a Python-side failure
//! (say, a mutant that no longer compiles, or crashes during execution)
//! surfaces verbatim as [`InterpreterError::Python`] and the caller decides
//! whether that means "mutant is invalid" or "trivial kill". Deadline
//! enforcement is opt-in via [`Interpreter::with_timeout`]; by default a
//! request runs to completion.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::analyse::ModuleReflection;
use crate::tree::SyntaxNode;

// ============================================================================
// Constants
// ============================================================================

/// Embedded driver script (the Python half of the bridge).
const DRIVER_SCRIPT: &str = include_str!("driver.py");

/// Interpreter names probed on `$PATH`, in order.
const PYTHON_NAMES: &[&str] = &["python3", "python"];

// ============================================================================
// Errors
// ============================================================================

/// Errors from the interpreter bridge.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// No Python interpreter could be found on `$PATH`.
    #[error("no Python interpreter found on $PATH (tried python3, python)")]
    PythonNotFound,

    /// The interpreter process failed to start.
    #[error("failed to spawn interpreter: {reason}")]
    SpawnFailed { reason: String },

    /// The Python side raised: a parse failure, a crashing mutant, an
    /// unimportable module. Carried verbatim for the caller to classify.
    #[error("{error_type}: {message}")]
    Python {
        error_type: String,
        message: String,
        traceback: String,
    },

    /// The request exceeded the configured deadline and the process was
    /// killed.
    #[error("interpreter did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The driver produced no response or an unparseable one.
    #[error("invalid driver response: {reason}")]
    InvalidResponse { reason: String },

    /// IO error while talking to the interpreter process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while encoding a request or decoding a response.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for interpreter operations.
pub type InterpreterResult<T> = Result<T, InterpreterError>;

// ============================================================================
// Protocol Types
// ============================================================================

/// Driver response envelope.
#[derive(Debug, Deserialize)]
struct DriverResponse {
    status: String,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    traceback: Option<String>,
    #[serde(flatten)]
    data: Value,
}

/// Top-level bindings of a unit; values that JSON cannot carry are rendered
/// as `{"_repr": ...}` by the driver.
pub type Namespace = BTreeMap<String, Value>;

/// The result of materializing a syntax tree into an executable unit.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterializedUnit {
    /// The unit (module) name the tree was compiled under.
    pub unit_name: String,
    /// Every top-level binding the unit defines, dunder names excluded,
    /// including bindings carried over from the initial namespace.
    pub namespace: Namespace,
    /// Anything the unit printed while executing.
    #[serde(default)]
    pub stdout: String,
}

// ============================================================================
// Interpreter
// ============================================================================

/// Handle to a Python interpreter usable for parse/materialize/reflect.
#[derive(Debug)]
pub struct Interpreter {
    python: PathBuf,
    driver: tempfile::NamedTempFile,
    timeout: Option<Duration>,
}

impl Interpreter {
    /// Discover an interpreter on `$PATH` (`python3`, then `python`).
    pub fn discover() -> InterpreterResult<Self> {
        for name in PYTHON_NAMES {
            if let Ok(path) = which::which(name) {
                return Interpreter::from_path(path);
            }
        }
        Err(InterpreterError::PythonNotFound)
    }

    /// Use the interpreter at an explicit path.
    pub fn from_path(python: impl Into<PathBuf>) -> InterpreterResult<Self> {
        let mut driver = tempfile::Builder::new()
            .prefix("auklet-driver-")
            .suffix(".py")
            .tempfile()?;
        driver.write_all(DRIVER_SCRIPT.as_bytes())?;
        driver.flush()?;
        Ok(Interpreter {
            python: python.into(),
            driver,
            timeout: None,
        })
    }

    /// Enforce a per-request deadline. On expiry the interpreter process
    /// is killed and the request fails with [`InterpreterError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The interpreter executable in use.
    pub fn python(&self) -> &Path {
        &self.python
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Parse Python source text into a syntax tree.
    pub fn parse(&self, source: &str) -> InterpreterResult<Arc<SyntaxNode>> {
        let data = self.request(json!({ "op": "parse", "source": source }))?;
        let wire = data
            .get("tree")
            .ok_or_else(|| InterpreterError::InvalidResponse {
                reason: "missing tree in parse response".to_string(),
            })?;
        SyntaxNode::from_wire(wire).map_err(|e| InterpreterError::InvalidResponse {
            reason: e.to_string(),
        })
    }

    /// Compile and execute a (possibly mutated) syntax tree as a module
    /// named `unit_name`, in a fresh namespace seeded with `namespace`.
    ///
    /// All top-level bindings the unit defines become visible in the
    /// returned namespace. Compilation and execution failures propagate
    /// verbatim; no error handling is performed here.
    pub fn materialize(
        &self,
        tree: &SyntaxNode,
        unit_name: &str,
        namespace: Option<&Namespace>,
    ) -> InterpreterResult<MaterializedUnit> {
        let empty = Namespace::new();
        let data = self.request(json!({
            "op": "materialize",
            "unit_name": unit_name,
            "tree": tree.to_wire(),
            "namespace": namespace.unwrap_or(&empty),
        }))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Import `module` and report its callables, classes, and fields.
    ///
    /// `search_path` is prepended to the interpreter's module search path,
    /// so modules outside the installed environment can be reflected.
    pub fn reflect(
        &self,
        module: &str,
        search_path: Option<&Path>,
    ) -> InterpreterResult<ModuleReflection> {
        let mut request = json!({ "op": "reflect", "module": module });
        if let Some(path) = search_path {
            request["search_path"] = json!(path.to_string_lossy());
        }
        let data = self.request(request)?;
        let reflection = data
            .get("reflection")
            .cloned()
            .ok_or_else(|| InterpreterError::InvalidResponse {
                reason: "missing reflection in reflect response".to_string(),
            })?;
        Ok(serde_json::from_value(reflection)?)
    }

    // ------------------------------------------------------------------------
    // Protocol
    // ------------------------------------------------------------------------

    fn request(&self, request: Value) -> InterpreterResult<Value> {
        debug!(op = request.get("op").and_then(|v| v.as_str()), "driver request");

        let mut child = Command::new(&self.python)
            .arg(self.driver.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| InterpreterError::SpawnFailed {
                reason: e.to_string(),
            })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| InterpreterError::SpawnFailed {
                    reason: "failed to capture stdin".to_string(),
                })?;
            let body = serde_json::to_vec(&request)?;
            // A broken pipe here means the interpreter died on startup; the
            // stderr we collect below is the better diagnostic, so press on.
            let _ = stdin.write_all(&body);
            let _ = stdin.write_all(b"\n");
            // Dropping stdin closes it, signalling end of request.
        }

        let (stdout, stderr) = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(_status) => {
                    let mut stdout = Vec::new();
                    if let Some(mut handle) = child.stdout.take() {
                        handle.read_to_end(&mut stdout)?;
                    }
                    let mut stderr = Vec::new();
                    if let Some(mut handle) = child.stderr.take() {
                        handle.read_to_end(&mut stderr)?;
                    }
                    (stdout, stderr)
                }
                None => {
                    warn!(timeout_secs = timeout.as_secs(), "interpreter timed out, killing");
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    return Err(InterpreterError::Timeout {
                        timeout_secs: timeout.as_secs(),
                    });
                }
            },
            None => {
                let output = child.wait_with_output()?;
                (output.stdout, output.stderr)
            }
        };

        self.decode_response(&stdout, &stderr)
    }

    fn decode_response(&self, stdout: &[u8], stderr: &[u8]) -> InterpreterResult<Value> {
        let text = String::from_utf8_lossy(stdout);
        // The response is the last non-empty stdout line; anything earlier
        // escaped the driver's capture and is noise.
        let line = text
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| InterpreterError::InvalidResponse {
                reason: format!(
                    "no response from driver (stderr: {})",
                    String::from_utf8_lossy(stderr).trim()
                ),
            })?;

        let response: DriverResponse =
            serde_json::from_str(line).map_err(|e| InterpreterError::InvalidResponse {
                reason: format!("JSON parse error: {e}: {line}"),
            })?;

        if response.status == "error" {
            return Err(InterpreterError::Python {
                error_type: response
                    .error_type
                    .unwrap_or_else(|| "Exception".to_string()),
                message: response.message.unwrap_or_default(),
                traceback: response.traceback.unwrap_or_default(),
            });
        }
        Ok(response.data)
    }
}

// ============================================================================
// Tests
// ============================================================================
