//! External SMT-LIB v2 solver driven over stdin/stdout
//!
//! One child process per backend. Every `check` runs inside `push`/`pop`,
//! declares the free variables, asserts, and reads `check-sat` plus a single
//! `get-value` answer. Stdout is drained by a reader thread so a stuck solver
//! turns into `Unknown` after the configured timeout instead of blocking.

use crate::features::smt::domain::{SmtError, SolverBackend, Verdict};
use crate::features::smt::infrastructure::ast::{AstEngine, SmtExpr, Sort};
use crate::features::smt::infrastructure::smtlib::{
    paren_balance, parse_get_value, symbol, to_smtlib,
};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub struct SmtLibBackend {
    engine: AstEngine,
    command: String,
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    timeout: Option<Duration>,
    /// Set once the solver stopped answering; later checks give `Unknown`
    stalled: bool,
}

impl SmtLibBackend {
    /// Spawn `command args...`; `timeout_ms == 0` waits forever
    pub fn spawn(command: &str, args: &[String], timeout_ms: u64) -> Result<Self, SmtError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SmtError::process(format!("{}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SmtError::process("failed to capture solver stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SmtError::process("failed to capture solver stdout"))?;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut backend = Self {
            engine: AstEngine::new(),
            command: command.to_string(),
            child,
            stdin,
            lines: rx,
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            stalled: false,
        };
        backend.send("(set-option :produce-models true)")?;
        backend.send("(set-logic ALL)")?;
        Ok(backend)
    }

    fn send(&mut self, cmd: &str) -> Result<(), SmtError> {
        trace!(solver = %self.command, "> {}", cmd);
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, SmtError> {
        let received = match self.timeout {
            Some(t) => self.lines.recv_timeout(t),
            None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(line) => Ok(Some(line)),
            Err(RecvTimeoutError::Timeout) => {
                self.stalled = true;
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => Err(SmtError::process(format!(
                "{} closed its output",
                self.command
            ))),
        }
    }

    /// One complete response (balanced parentheses); `None` on timeout
    fn read_response(&mut self) -> Result<Option<String>, SmtError> {
        let mut text = String::new();
        let mut depth = 0i64;
        loop {
            let Some(line) = self.next_line()? else {
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() && text.is_empty() {
                continue;
            }
            trace!(solver = %self.command, "< {}", line);
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(line);
            depth += paren_balance(line);
            if depth <= 0 {
                break;
            }
        }
        if text.starts_with("(error") {
            return Err(SmtError::process(text));
        }
        Ok(Some(text))
    }
}

impl SolverBackend for SmtLibBackend {
    type Engine = AstEngine;

    fn name(&self) -> &'static str {
        "smtlib"
    }

    fn engine(&mut self) -> &mut AstEngine {
        &mut self.engine
    }

    fn check(&mut self, assertions: &[SmtExpr], probes: &[SmtExpr]) -> Result<Verdict, SmtError> {
        if self.stalled {
            return Ok(Verdict::Unknown(format!("{} stopped responding", self.command)));
        }

        let mut vars: Vec<(Arc<str>, Sort)> = Vec::new();
        for e in assertions.iter().chain(probes) {
            e.free_vars(&mut vars);
        }

        self.send("(push 1)")?;
        for (name, sort) in &vars {
            self.send(&format!("(declare-const {} {})", symbol(name), sort))?;
        }
        for a in assertions {
            self.send(&format!("(assert {})", to_smtlib(a)))?;
        }
        self.send("(check-sat)")?;

        let Some(answer) = self.read_response()? else {
            warn!(solver = %self.command, "check-sat timed out");
            return Ok(Verdict::Unknown("solver timed out".into()));
        };
        let verdict = match answer.as_str() {
            "sat" if probes.is_empty() => Verdict::Sat(Vec::new()),
            "sat" => {
                let terms: Vec<String> = probes.iter().map(to_smtlib).collect();
                self.send(&format!("(get-value ({}))", terms.join(" ")))?;
                let Some(values) = self.read_response()? else {
                    return Ok(Verdict::Unknown("get-value timed out".into()));
                };
                let sorts: Vec<Sort> = probes.iter().map(|p| p.sort().clone()).collect();
                Verdict::Sat(parse_get_value(&values, &sorts)?)
            }
            "unsat" => Verdict::Unsat,
            "unknown" => Verdict::Unknown(format!("{} returned unknown", self.command)),
            other => return Err(SmtError::parse(format!("unexpected answer `{}`", other))),
        };
        self.send("(pop 1)")?;
        debug!(solver = %self.command, vars = vars.len(), "answered {}", answer);
        Ok(verdict)
    }
}

impl Drop for SmtLibBackend {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_process_error() {
        let result = SmtLibBackend::spawn("definitely-not-a-solver-binary", &[], 100);
        assert!(matches!(result, Err(SmtError::Process(_))));
    }
}
