//! Side-channel for diagnostics: a log file next to the downloads and/or mail.
//!
//! Notification is fire-and-forget. A notifier that cannot deliver logs a
//! warning and returns; the pipeline never fails because of it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Log filename written by `LogFileNotifier::in_directory`.
pub const NOTIFY_LOG_FILENAME: &str = "hltv.log";

/// Subject line of notification mails.
pub const MAIL_SUBJECT: &str = "HomeLoadTV error message";

/// Receiver of free-form diagnostics, optionally keyed by link id.
pub trait Notifier {
    fn notify(&self, link_id: Option<i64>, message: &str);
}

fn format_line(link_id: Option<i64>, message: &str) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    match link_id {
        Some(id) => format!("{} [link {}] {}", now, id, message),
        None => format!("{} {}", now, message),
    }
}

/// Appends timestamped lines to a log file.
#[derive(Debug, Clone)]
pub struct LogFileNotifier {
    path: PathBuf,
}

impl LogFileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/hltv.log`.
    pub fn in_directory(dir: &Path) -> Self {
        Self::new(dir.join(NOTIFY_LOG_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Notifier for LogFileNotifier {
    fn notify(&self, link_id: Option<i64>, message: &str) {
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{}", format_line(link_id, message)));
        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), "cannot write notification: {}", e);
        }
    }
}

/// Hands a mail to the local MTA via `sendmail -t`.
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    program: PathBuf,
    from: String,
    to: String,
}

impl SendmailNotifier {
    pub const DEFAULT_PROGRAM: &'static str = "/usr/sbin/sendmail";

    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from(Self::DEFAULT_PROGRAM),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn message(&self, link_id: Option<i64>, body: &str) -> String {
        format!(
            "To: {}\nFrom: {}\nSubject: {}\n\n{}\n",
            self.to,
            self.from,
            MAIL_SUBJECT,
            format_line(link_id, body)
        )
    }

    fn send(&self, mail: &str) -> std::io::Result<()> {
        let mut child = Command::new(&self.program)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(mail.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(std::io::Error::other(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }
        Ok(())
    }
}

impl Notifier for SendmailNotifier {
    fn notify(&self, link_id: Option<i64>, message: &str) {
        if let Err(e) = self.send(&self.message(link_id, message)) {
            tracing::warn!(to = %self.to, "cannot send notification mail: {}", e);
        }
    }
}

/// Fans a notification out to every configured channel.
#[derive(Default)]
pub struct Notifiers {
    channels: Vec<Box<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notifier: impl Notifier + 'static) {
        self.channels.push(Box::new(notifier));
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Notifier for Notifiers {
    fn notify(&self, link_id: Option<i64>, message: &str) {
        for channel in &self.channels {
            channel.notify(link_id, message);
        }
    }
}
