//! Line-oriented terminal front end for the talk list.

use std::fmt::Write as _;

use shared::domain::DraftField;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::controller::{events::ControllerError, orchestration::TalkController, reducer::TalkState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit { field: DraftField, value: String },
    Submit,
    Show,
    Quit,
}

/// Parses one input line. Blank lines yield `None`; a field name followed by
/// text edits that field, and a bare field name clears it.
pub fn parse_command(line: &str) -> Result<Option<Command>, ControllerError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let command = match word {
        "submit" => Command::Submit,
        "show" => Command::Show,
        "quit" | "exit" => Command::Quit,
        other => match other.parse::<DraftField>() {
            Ok(field) => Command::Edit {
                field,
                value: rest.trim().to_string(),
            },
            Err(_) => return Err(ControllerError::UnknownTransition(other.to_string())),
        },
    };
    Ok(Some(command))
}

fn placeholder(field: DraftField) -> &'static str {
    match field {
        DraftField::Name => "name",
        DraftField::Description => "description",
        DraftField::SpeakerName => "speaker name",
        DraftField::SpeakerBio => "speaker bio",
    }
}

pub fn render(state: &TalkState) -> String {
    let mut out = String::new();
    for field in DraftField::ALL {
        let value = state.draft.get(field);
        if value.is_empty() {
            let _ = writeln!(out, "[{field}] <{}>", placeholder(field));
        } else {
            let _ = writeln!(out, "[{field}] {value}");
        }
    }
    if state.error {
        out.push_str("! failed to load talks\n");
    }
    let _ = writeln!(out, "--- {} talk(s) ---", state.talks.len());
    for talk in &state.talks {
        let _ = writeln!(out, "{}", talk.name);
        let _ = writeln!(out, "  {}", talk.description);
        let _ = writeln!(out, "  {}", talk.speaker_name);
        let _ = writeln!(out, "  {}", talk.speaker_bio);
    }
    out
}

const HELP: &str = "commands: name|description|speakerName|speakerBio <text>, submit, show, quit\n";

/// Reads commands until `quit` or end of input, re-rendering whenever the
/// controller state changes.
pub async fn run_terminal<R, W>(
    controller: &TalkController,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut state_rx = controller.watch_state();
    let banner = format!("talks client {}\n{HELP}", controller.client_id());
    output.write_all(banner.as_bytes()).await?;
    output.flush().await?;

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = render(&state_rx.borrow_and_update());
                output.write_all(frame.as_bytes()).await?;
                output.flush().await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Edit { field, value })) => controller.update_field(field, value),
                    Ok(Some(Command::Submit)) => controller.submit(),
                    Ok(Some(Command::Show)) => {
                        let frame = render(&controller.state());
                        output.write_all(frame.as_bytes()).await?;
                        output.flush().await?;
                    }
                    Ok(Some(Command::Quit)) => break,
                    Err(err) => {
                        warn!(%err, "rejected input");
                        output.write_all(format!("{err}\n{HELP}").as_bytes()).await?;
                        output.flush().await?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use client_core::{TalkApi, TalkFeed};
    use shared::domain::{ClientId, Talk, TalkInput};
    use tokio::io::{duplex, AsyncWriteExt, BufReader};

    use super::*;
    use crate::controller::reducer::Draft;

    /// The initial fetch never resolves, so only local edits change the list.
    struct PendingListApi;

    #[async_trait]
    impl TalkApi for PendingListApi {
        async fn list_talks(&self) -> Result<Vec<Talk>> {
            std::future::pending().await
        }

        async fn create_talk(&self, input: TalkInput) -> Result<Talk> {
            Ok(Talk {
                name: input.name,
                description: input.description,
                speaker_name: input.speaker_name,
                speaker_bio: input.speaker_bio,
                client_id: input.client_id,
            })
        }

        async fn subscribe_on_create_talk(&self) -> Result<TalkFeed> {
            Err(anyhow!("subscriptions disabled"))
        }
    }

    #[test]
    fn parses_field_edits_and_commands() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("submit"), Ok(Some(Command::Submit)));
        assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
        assert_eq!(
            parse_command("speakerName  Grace Hopper "),
            Ok(Some(Command::Edit {
                field: DraftField::SpeakerName,
                value: "Grace Hopper".into(),
            }))
        );
        assert_eq!(
            parse_command("description"),
            Ok(Some(Command::Edit {
                field: DraftField::Description,
                value: String::new(),
            }))
        );
    }

    #[test]
    fn unknown_word_is_an_unknown_transition() {
        assert_eq!(
            parse_command("delete everything"),
            Err(ControllerError::UnknownTransition("delete".into()))
        );
    }

    #[test]
    fn render_shows_placeholders_error_and_talks() {
        let state = TalkState {
            error: true,
            talks: vec![Talk {
                name: "Async Rust".into(),
                description: "futures".into(),
                speaker_name: "Ferris".into(),
                speaker_bio: "crab".into(),
                client_id: "c".into(),
            }],
            draft: Draft {
                name: "Draft".into(),
                ..Draft::default()
            },
        };
        let frame = render(&state);
        assert!(frame.contains("[name] Draft"));
        assert!(frame.contains("[speakerBio] <speaker bio>"));
        assert!(frame.contains("! failed to load talks"));
        assert!(frame.contains("--- 1 talk(s) ---"));
        assert!(frame.contains("Async Rust\n  futures\n  Ferris\n  crab\n"));
    }

    #[tokio::test]
    async fn terminal_edits_submits_and_quits() {
        let controller = TalkController::mount(Arc::new(PendingListApi), ClientId::generate());
        let (mut input_tx, input_rx) = duplex(1024);
        let mut output = Vec::new();

        let driver = async {
            input_tx
                .write_all(b"name Rust\nbogus\nsubmit\n")
                .await
                .expect("write");
            let mut state_rx = controller.watch_state();
            tokio::time::timeout(Duration::from_secs(5), async {
                while state_rx.borrow_and_update().talks.is_empty() {
                    state_rx.changed().await.expect("alive");
                }
            })
            .await
            .expect("talk created");
            input_tx.write_all(b"show\nquit\n").await.expect("write");
        };
        let (result, ()) = tokio::join!(
            run_terminal(&controller, BufReader::new(input_rx), &mut output),
            driver
        );
        result.expect("terminal loop");

        let text = String::from_utf8(output).expect("utf8");
        assert!(text.contains("unknown transition: bogus"));
        assert!(text.contains("--- 1 talk(s) ---"));
        assert_eq!(controller.state().talks[0].name, "Rust");
        assert_eq!(controller.state().draft.name, "Rust");

        controller.shutdown().await;
    }
}
