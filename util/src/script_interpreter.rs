//! # Input script interpreter module
//!
//! This module provides an interpreter for input scripts, allowing the trajectory generator to be
//! run without any live pose, path or traffic light source.
//!
//! A script is a text file made of timed entries, each one being the time in seconds since the
//! start of the script at which the message is delivered, followed by the JSON form of an
//! [`InputMsg`], terminated with a semicolon:
//!
//! ```text
//! 0.0: {"Lane": {...}};
//! 0.1: {"Pose": {"position_m": [0.0, 0.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}};
//! 2.5: {"TrafficWaypoint": 120};
//! ```
//!
//! Blank lines and lines starting with `//` or `#` are ignored. Anything else that is not part of
//! an entry is an error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::msg::InputMsg;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to be delivered at a specific time.
#[derive(Debug)]
struct Entry {
    /// The time the message is delivered at
    exec_time_s: f64,

    msg: InputMsg,
}

/// A script interpreter.
///
/// After initialising with the path to the script use `get_pending` to acquire the list of
/// messages that are due.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: PathBuf,
    entries: VecDeque<Entry>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Could not build the script parser: {0}")]
    RegexError(regex::Error),

    #[error("Script contains an invalid timestamp: {0}. Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains a line which is not an entry or a comment: {0:?}")]
    UnexpectedContent(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMsg(f64, serde_json::Error),

    #[error("Script entries must be in time order, found {1} s after {0} s")]
    OutOfOrder(f64, f64),
}

/// Messages returned by [`ScriptInterpreter::get_pending`].
#[derive(Debug)]
pub enum PendingMsgs {
    None,
    Some(Vec<InputMsg>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_str(&script)?;
        si.script_path = path;

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut entries: VecDeque<Entry> = VecDeque::new();

        // `<time>: <json>;` on each line. The JSON itself never contains a semicolon.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::RegexError)?;

        // End of the previous entry, text between entries must only be comments
        let mut last_end = 0;

        for cap in re.captures_iter(script) {
            if let Some(m) = cap.get(0) {
                check_between_entries(&script[last_end..m.start()])?;
                last_end = m.end();
            }

            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}: {}", time_str, e)))?;

            let msg_str = cap.get(3).map(|m| m.as_str()).unwrap_or_default();
            let msg: InputMsg = serde_json::from_str(msg_str)
                .map_err(|e| ScriptError::InvalidMsg(exec_time_s, e))?;

            if let Some(last) = entries.back() {
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::OutOfOrder(last.exec_time_s, exec_time_s));
                }
            }

            entries.push_back(Entry { exec_time_s, msg });
        }

        check_between_entries(&script[last_end..])?;

        if entries.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            script_path: PathBuf::new(),
            entries,
        })
    }

    /// Return the messages due at `current_time_s` (seconds since the script started).
    ///
    /// Once every message has been delivered `EndOfScript` is returned.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingMsgs {
        if self.entries.is_empty() {
            return PendingMsgs::EndOfScript;
        }

        let mut msgs = vec![];

        while let Some(entry) = self.entries.front() {
            if entry.exec_time_s > current_time_s {
                break;
            }
            if let Some(entry) = self.entries.pop_front() {
                msgs.push(entry.msg);
            }
        }

        if msgs.is_empty() {
            PendingMsgs::None
        } else {
            PendingMsgs::Some(msgs)
        }
    }

    /// Get the number of messages left in the script
    pub fn get_num_msgs(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.entries.back() {
            Some(e) => e.exec_time_s,
            None => 0f64,
        }
    }

    /// Path the script was loaded from, empty if it was built from a string.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that text outside of any entry is only whitespace and comment lines.
fn check_between_entries(text: &str) -> Result<(), ScriptError> {
    for line in text.lines().map(str::trim) {
        if !(line.is_empty() || line.starts_with("//") || line.starts_with('#')) {
            return Err(ScriptError::UnexpectedContent(line.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
        0.0: {"TrafficWaypoint": -1};
        0.5: {"TrafficWaypoint": 12};
        0.5: "Shutdown";
    "#;

    #[test]
    fn test_pending() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_msgs(), 3);
        assert_eq!(si.get_duration(), 0.5);

        match si.get_pending(0.1) {
            PendingMsgs::Some(m) => assert_eq!(m, vec![InputMsg::TrafficWaypoint(-1)]),
            p => panic!("Expected one message, got {:?}", p),
        }

        assert!(matches!(si.get_pending(0.2), PendingMsgs::None));

        match si.get_pending(1.0) {
            PendingMsgs::Some(m) => {
                assert_eq!(m, vec![InputMsg::TrafficWaypoint(12), InputMsg::Shutdown])
            }
            p => panic!("Expected two messages, got {:?}", p),
        }

        assert!(matches!(si.get_pending(2.0), PendingMsgs::EndOfScript));
    }

    #[test]
    fn test_empty_script() {
        assert!(matches!(
            ScriptInterpreter::from_str("// nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
    }

    #[test]
    fn test_comments_allowed() {
        let script = "# replay\n0.0: \"Shutdown\"; // stop at once\n\n// end\n";
        let si = ScriptInterpreter::from_str(script).unwrap();
        assert_eq!(si.get_num_msgs(), 1);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        // Each of these lines would otherwise be skipped, dropping the message
        for bad in &[
            "1.o: \"Shutdown\";",
            "-1.0: \"Shutdown\";",
            "t=2.0: \"Shutdown\";",
        ] {
            let script = format!("0.0: {{\"TrafficWaypoint\": 3}};\n{}\n", bad);
            match ScriptInterpreter::from_str(&script) {
                Err(ScriptError::UnexpectedContent(line)) => assert_eq!(line, *bad),
                r => panic!("Expected {:?} to be rejected, got {:?}", bad, r),
            }
        }
    }

    #[test]
    fn test_trailing_content_rejected() {
        assert!(matches!(
            ScriptInterpreter::from_str("0.0: \"Shutdown\";\n1.0: \"Shutdown\""),
            Err(ScriptError::UnexpectedContent(_))
        ));
    }

    #[test]
    fn test_semicolon_in_string_rejected() {
        let script = r#"0.0: {"Lane": {"header": {"seq": 1, "stamp": 0, "frame_id": "a;b"}, "waypoints": []}};"#;
        assert!(ScriptInterpreter::from_str(script).is_err());
    }

    #[test]
    fn test_invalid_msg() {
        assert!(matches!(
            ScriptInterpreter::from_str("1.0: {\"Teleport\": 3};"),
            Err(ScriptError::InvalidMsg(_, _))
        ));
    }

    #[test]
    fn test_out_of_order() {
        assert!(matches!(
            ScriptInterpreter::from_str("1.0: \"Shutdown\";\n0.5: \"Shutdown\";"),
            Err(ScriptError::OutOfOrder(_, _))
        ));
    }
}
