// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interactive review loop.
//!
//! Drives a [`SessionQueue`] from line input. Reaching the end of the queue
//! completes the session; end of input or `/quit` cancels it, still
//! committing every bout the reviewer touched. A failed commit can be retried
//! or turned into a cancel from the prompt.

use std::collections::VecDeque;
use std::io::Write;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::{SessionQueue, SessionService};
use crate::types::{ReviewSession, SessionStatus};

const SKIP_COMMAND: &str = "/skip";
const QUIT_COMMAND: &str = "/quit";

/// Source of reviewer input.
pub trait LineSource {
    /// Read one line. `None` means the reviewer asked to stop.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Line editor on the controlling terminal.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Canned input, ending when the lines run out.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Options for one interactive run.
#[derive(Debug, Clone, Copy)]
pub struct PromptOptions {
    pub show_notes: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self { show_notes: true }
    }
}

enum Step {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Complete,
    Cancel,
}

/// Run a review over `queue` and commit the result.
///
/// Returns the finalized session, `COMPLETE` or `CANCELLED`. If the commit
/// fails and the reviewer declines to retry, the error is returned and the
/// session stays `STARTED`; `queue` still holds every bout for another
/// attempt.
pub async fn run_review<L, W>(
    service: &SessionService,
    queue: &mut SessionQueue,
    input: &mut L,
    out: &mut W,
    options: PromptOptions,
) -> Result<ReviewSession>
where
    L: LineSource,
    W: Write,
{
    writeln!(
        out,
        "{}",
        format!(
            "Type the answer. {} to skip, {} or Ctrl-D to stop.",
            SKIP_COMMAND, QUIT_COMMAND
        )
        .dimmed()
    )?;

    let mut ending = Ending::Complete;
    while !queue.is_exhausted() {
        if let Step::Quit = present(queue, input, out, options)? {
            debug!(bouts = queue.bout_records().len(), "review stopped early");
            ending = Ending::Cancel;
            break;
        }
    }

    let session = commit(service, queue, ending, input, out).await?;
    if session.status == SessionStatus::Complete {
        writeln!(out, "{}", "Session complete.".green().bold())?;
    } else {
        writeln!(out, "{}", "Session cancelled.".yellow())?;
    }
    Ok(session)
}

/// Commit the queue's bouts, prompting after a retryable failure.
async fn commit<L, W>(
    service: &SessionService,
    queue: &SessionQueue,
    mut ending: Ending,
    input: &mut L,
    out: &mut W,
) -> Result<ReviewSession>
where
    L: LineSource,
    W: Write,
{
    let records = queue.bout_records();
    loop {
        let result = match ending {
            Ending::Complete => {
                service
                    .complete_session(queue.session_id(), None, &records)
                    .await
            }
            Ending::Cancel => {
                service
                    .cancel_session(queue.session_id(), None, &records)
                    .await
            }
        };

        let err = match result {
            Ok(session) => return Ok(session),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e.into()),
        };
        warn!(session_id = %queue.session_id(), error = %err, "review commit failed");
        writeln!(out, "{} {}", "Could not save the session:".red(), err)?;

        let choice = input.read_line("[r]etry, [c]ancel the session, or Enter to leave it open: ")?;
        match choice.as_deref().map(str::trim) {
            Some(c) if c.eq_ignore_ascii_case("r") => continue,
            Some(c) if c.eq_ignore_ascii_case("c") => ending = Ending::Cancel,
            _ => return Err(err.into()),
        }
    }
}

/// Present the current item until it has been answered or skipped and the
/// queue has moved on.
fn present<L, W>(
    queue: &mut SessionQueue,
    input: &mut L,
    out: &mut W,
    options: PromptOptions,
) -> Result<Step>
where
    L: LineSource,
    W: Write,
{
    let Some(bout) = queue.current() else {
        return Ok(Step::Continue);
    };
    let progress = queue.progress();
    writeln!(
        out,
        "\n{} {}",
        format!("[{}/{}]", progress.completed + 1, progress.total).dimmed(),
        bout.card.front.bold()
    )?;

    let guess = loop {
        let Some(line) = input.read_line("> ")? else {
            return Ok(Step::Quit);
        };
        let line = line.trim().to_string();
        match line.as_str() {
            "" => continue,
            QUIT_COMMAND => return Ok(Step::Quit),
            SKIP_COMMAND => {
                queue.skip()?;
                queue.proceed()?;
                writeln!(out, "{}", "Skipped.".dimmed())?;
                return Ok(Step::Continue);
            }
            _ => break line,
        }
    };

    let correct = queue.submit_guess(&guess)?;
    let Some(bout) = queue.current() else {
        return Ok(Step::Continue);
    };
    if correct {
        writeln!(out, "{}", "✓ Correct".green())?;
    } else {
        writeln!(out, "{} {}", "✗ Answer:".red(), bout.card.back)?;
    }
    if options.show_notes {
        if let Some(notes) = &bout.card.notes {
            writeln!(out, "  {}", notes.italic())?;
        }
    }

    if correct {
        queue.proceed()?;
        return Ok(Step::Continue);
    }

    match input.read_line("[r]etry or Enter to continue: ")? {
        None => Ok(Step::Quit),
        Some(line) if line.trim().eq_ignore_ascii_case("r") => {
            queue.retry()?;
            Ok(Step::Continue)
        }
        Some(line) if line.trim() == QUIT_COMMAND => Ok(Step::Quit),
        Some(_) => {
            queue.proceed()?;
            Ok(Step::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ReviewConfig;
    use crate::srs::{FixedClock, Scheduler, StageTable};
    use crate::store::{MemoryStore, RecordStore};
    use crate::types::Card;
    use chrono::Utc;
    use std::sync::Arc;

    async fn setup(backs: &[&str]) -> (SessionService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let scheduler = Scheduler::new(StageTable::new(vec![0, 4, 8]).unwrap(), clock);
        let service =
            SessionService::with_scheduler(store.clone(), scheduler, ReviewConfig::default());
        for (i, back) in backs.iter().enumerate() {
            let card = Card::new(format!("front {}", i), *back);
            store.create_card(&card).await.unwrap();
            service.add_item(&card.id, Some(1)).await.unwrap();
        }
        (service, store)
    }

    async fn run(service: &SessionService, lines: &[&str]) -> (ReviewSession, String) {
        let mut queue = due_queue(service).await;
        let mut input = ScriptedInput::new(lines.iter().copied());
        let mut out = Vec::new();
        let session = run_review(
            service,
            &mut queue,
            &mut input,
            &mut out,
            PromptOptions::default(),
        )
        .await
        .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    async fn due_queue(service: &SessionService) -> SessionQueue {
        let (_, queue) = service
            .start_due_session(Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap()
            .unwrap();
        queue
    }

    #[tokio::test]
    async fn test_all_correct_completes() {
        let (service, store) = setup(&["si", "si"]).await;
        let (session, out) = run(&service, &["si", " SI "]).await;

        assert_eq!(session.status, SessionStatus::Complete);
        assert!(out.contains("Correct"));
        let reviews = store.reviews_for_session(&session.id).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.ending_stage == 2));
    }

    #[tokio::test]
    async fn test_retry_after_miss() {
        let (service, store) = setup(&["si"]).await;
        let (session, _) = run(&service, &["no", "r", "si"]).await;

        assert_eq!(session.status, SessionStatus::Complete);
        let reviews = store.reviews_for_session(&session.id).await.unwrap();
        assert_eq!(reviews[0].times_incorrect, 1);
        assert_eq!(reviews[0].ending_stage, 0);
    }

    #[tokio::test]
    async fn test_skip_then_answer() {
        let (service, store) = setup(&["si"]).await;
        let (session, out) = run(&service, &["", "/skip", "si"]).await;

        assert_eq!(session.status, SessionStatus::Complete);
        assert!(out.contains("Skipped"));
        let reviews = store.reviews_for_session(&session.id).await.unwrap();
        assert_eq!(reviews[0].times_incorrect, 0);
    }

    #[tokio::test]
    async fn test_end_of_input_cancels_with_touched_bouts() {
        let (service, store) = setup(&["si", "si", "si"]).await;
        let (session, out) = run(&service, &["si"]).await;

        assert_eq!(session.status, SessionStatus::Cancelled);
        assert!(out.contains("cancelled"));
        let reviews = store.reviews_for_session(&session.id).await.unwrap();
        assert_eq!(reviews.len(), 1);
    }

    #[tokio::test]
    async fn test_quit_command_cancels() {
        let (service, store) = setup(&["si"]).await;
        let (session, _) = run(&service, &["/quit"]).await;

        assert_eq!(session.status, SessionStatus::Cancelled);
        assert!(store.reviews_for_session(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_retried_from_prompt() {
        let (service, store) = setup(&["si"]).await;
        store.inject_commit_fault(0);
        let (session, out) = run(&service, &["si", "r"]).await;

        assert!(out.contains("Could not save"));
        assert_eq!(session.status, SessionStatus::Complete);
        let reviews = store.reviews_for_session(&session.id).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].ending_stage, 2);
    }

    #[tokio::test]
    async fn test_failed_commit_cancelled_from_prompt() {
        let (service, store) = setup(&["si", "si"]).await;
        store.inject_commit_fault(0);
        let (session, _) = run(&service, &["si", "si", "c"]).await;

        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(store.reviews_for_session(&session.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_left_open_keeps_bouts() {
        let (service, store) = setup(&["si"]).await;
        let mut queue = due_queue(&service).await;
        store.inject_commit_fault(0);

        let mut input = ScriptedInput::new(["si"]);
        let mut out = Vec::new();
        let err = run_review(
            &service,
            &mut queue,
            &mut input,
            &mut out,
            PromptOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("commit failed"));

        let session_id = queue.session_id().to_string();
        assert_eq!(
            service.get_session(&session_id).await.unwrap().status,
            SessionStatus::Started
        );
        assert!(store.reviews_for_session(&session_id).await.unwrap().is_empty());

        // The bouts are still in hand and the session can be resumed
        let records = queue.bout_records();
        assert_eq!(records.len(), 1);
        assert!(service.start_queue(&session_id).await.is_ok());
        let done = service
            .complete_session(&session_id, None, &records)
            .await
            .unwrap();
        assert_eq!(done.status, SessionStatus::Complete);
        assert_eq!(store.reviews_for_session(&session_id).await.unwrap().len(), 1);
    }
}
