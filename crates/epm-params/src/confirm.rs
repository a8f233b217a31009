//! Confirmation policies
//!
//! Every schema-altering or destructive action asks a [`Confirm`] first.
//! The policy is injected, so the reconciliation and deletion logic never
//! touches a terminal itself.

use std::io::{self, BufRead, Stdout, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

/// Yes/no decision source
pub trait Confirm: Send + Sync {
    /// Ask whether to proceed with the described action
    ///
    /// # Errors
    /// [`ParamsError::InvalidResponse`] when the answer is neither yes nor
    /// no; IO errors from interactive implementations.
    fn confirm(&self, prompt: &str) -> Result<bool, ParamsError>;
}

impl<C: Confirm + ?Sized> Confirm for Arc<C> {
    fn confirm(&self, prompt: &str) -> Result<bool, ParamsError> {
        (**self).confirm(prompt)
    }
}

/// Auto-confirm, for programmatic and test use
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysYes;

impl Confirm for AlwaysYes {
    fn confirm(&self, _prompt: &str) -> Result<bool, ParamsError> {
        Ok(true)
    }
}

/// Decline everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysNo;

impl Confirm for AlwaysNo {
    fn confirm(&self, _prompt: &str) -> Result<bool, ParamsError> {
        Ok(false)
    }
}

/// Callback-backed policy
pub struct ConfirmFn<F>(pub F);

impl<F> ConfirmFn<F>
where
    F: Fn(&str) -> Result<bool, ParamsError> + Send + Sync,
{
    /// Wrap a callback
    #[inline]
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Confirm for ConfirmFn<F>
where
    F: Fn(&str) -> Result<bool, ParamsError> + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> Result<bool, ParamsError> {
        (self.0)(prompt)
    }
}

impl<F> std::fmt::Debug for ConfirmFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConfirmFn(..)")
    }
}

/// Interpret a typed answer
///
/// # Errors
/// [`ParamsError::InvalidResponse`] for anything but Y/N (case-insensitive,
/// `yes`/`no` also accepted).
pub fn parse_response(line: &str) -> Result<bool, ParamsError> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => Err(ParamsError::InvalidResponse(line.trim().to_string())),
    }
}

/// Line-oriented source of answers
pub trait AnswerSource: Send {
    /// Append one line to `buf`; returns the bytes read, 0 at end of input
    ///
    /// # Errors
    /// IO errors from the underlying reader.
    fn read_answer(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl<R: BufRead + Send> AnswerSource for R {
    fn read_answer(&mut self, buf: &mut String) -> io::Result<usize> {
        self.read_line(buf)
    }
}

/// Process stdin, read through the handle's shared buffer
///
/// Input left unread after one answer stays available to the next reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedStdin;

impl AnswerSource for SharedStdin {
    fn read_answer(&mut self, buf: &mut String) -> io::Result<usize> {
        io::stdin().read_line(buf)
    }
}

/// Prompt on a line-oriented channel, one line per answer
#[derive(Debug)]
pub struct TerminalConfirm<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalConfirm<SharedStdin, Stdout> {
    /// Prompt on stdout, read answers from stdin
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(SharedStdin, io::stdout())
    }
}

impl<R, W> TerminalConfirm<R, W>
where
    R: AnswerSource,
    W: Write + Send,
{
    /// Prompt on arbitrary reader/writer
    #[must_use]
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Recover the writer, e.g. to inspect prompts in tests
    #[must_use]
    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R, W> Confirm for TerminalConfirm<R, W>
where
    R: AnswerSource,
    W: Write + Send,
{
    fn confirm(&self, prompt: &str) -> Result<bool, ParamsError> {
        {
            let mut out = self.output.lock();
            writeln!(out, "{prompt}")?;
            write!(out, "Proceed (Y/N): ")?;
            out.flush()?;
        }
        let mut line = String::new();
        if self.input.lock().read_answer(&mut line)? == 0 {
            return Err(ParamsError::InvalidResponse("<end of input>".to_string()));
        }
        parse_response(&line)
    }
}

/// Configurable choice of confirmation source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPolicy {
    /// Ask on the terminal
    #[default]
    Prompt,
    /// Auto-confirm
    Yes,
    /// Decline
    No,
}

impl ConfirmPolicy {
    /// Build the matching [`Confirm`] implementation
    #[must_use]
    pub fn into_confirm(self) -> Box<dyn Confirm> {
        match self {
            Self::Prompt => Box::new(TerminalConfirm::stdio()),
            Self::Yes => Box::new(AlwaysYes),
            Self::No => Box::new(AlwaysNo),
        }
    }
}

impl std::str::FromStr for ConfirmPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(Self::Prompt),
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            other => Err(format!("unknown confirm policy '{other}' (expected prompt, yes or no)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_response_accepts_yes_and_no() {
        assert!(parse_response("Y").unwrap());
        assert!(parse_response("y\n").unwrap());
        assert!(parse_response(" yes ").unwrap());
        assert!(!parse_response("N").unwrap());
        assert!(!parse_response("no").unwrap());
    }

    #[test]
    fn parse_response_rejects_anything_else() {
        assert!(matches!(
            parse_response("maybe"),
            Err(ParamsError::InvalidResponse(r)) if r == "maybe"
        ));
        assert!(parse_response("").is_err());
    }

    #[test]
    fn terminal_confirm_reads_one_line_per_question() {
        let confirm = TerminalConfirm::new(Cursor::new(b"Y\nN\n".to_vec()), Vec::new());
        assert!(confirm.confirm("first").unwrap());
        assert!(!confirm.confirm("second").unwrap());

        let out = String::from_utf8(confirm.into_output()).unwrap();
        assert!(out.contains("first"));
        assert!(out.contains("Proceed (Y/N): "));
    }

    #[test]
    fn shared_confirm_keeps_unread_answers() {
        let confirm: Arc<dyn Confirm> = Arc::new(TerminalConfirm::new(
            Cursor::new(b"Y\nN\n".to_vec()),
            io::sink(),
        ));
        let first = Arc::clone(&confirm);
        assert!(first.confirm("back-fill").unwrap());
        drop(first);
        assert!(!confirm.confirm("delete").unwrap());
    }

    #[test]
    fn terminal_confirm_fails_on_eof() {
        let confirm = TerminalConfirm::new(Cursor::new(Vec::new()), Vec::new());
        assert!(matches!(
            confirm.confirm("anything"),
            Err(ParamsError::InvalidResponse(_))
        ));
    }

    #[test]
    fn fixed_policies() {
        assert!(AlwaysYes.confirm("x").unwrap());
        assert!(!AlwaysNo.confirm("x").unwrap());
        let f = ConfirmFn::new(|prompt| Ok(prompt.contains("usertag")));
        assert!(f.confirm("deleting key usertag").unwrap());
        assert!(!f.confirm("deleting key lr").unwrap());
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("yes".parse::<ConfirmPolicy>().unwrap(), ConfirmPolicy::Yes);
        assert_eq!("Prompt".parse::<ConfirmPolicy>().unwrap(), ConfirmPolicy::Prompt);
        assert_eq!("n".parse::<ConfirmPolicy>().unwrap(), ConfirmPolicy::No);
        assert!("sometimes".parse::<ConfirmPolicy>().is_err());
    }
}
