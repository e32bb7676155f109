//! Subcommands of the `ocrfix` binary.
//!
//! | Command     | Output                                         |
//! |-------------|------------------------------------------------|
//! | `text`      | assembled page text                            |
//! | `normalize` | save body after load normalization             |
//! | `arrange`   | save body after re-ordering the given ids      |
//! | `groups`    | one line per group: label, color, id, members  |

use clap::{Parser, Subcommand};
use ocrfix_core::{
    AnnotationId, AnnotationStore, ArrangeDirection, EditorConfig, SaveBody, TextMode, WireError,
    arrange, assemble, decode_page, groups,
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("bad page: {0}")]
    Page(#[from] WireError),
}

#[derive(Debug, Parser)]
#[command(name = "ocrfix")]
#[command(about = "Offline tools for page annotation JSON read from stdin")]
pub struct Cli {
    /// Editor config JSON; absent fields take their defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the assembled page text.
    Text {
        #[arg(long, default_value_t = TextMode::GroupBreak)]
        mode: TextMode,
    },
    /// Print the save body after load normalization.
    Normalize,
    /// Re-order the given ids spatially and print the save body.
    Arrange {
        /// ltr, rtl or ttb.
        #[arg(long)]
        direction: ArrangeDirection,
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
    /// Print one line per group: label, color, group id, member count.
    Groups,
}

/// Run `command` on the page JSON in `input`, returning stdout.
pub fn execute(command: &Command, config: &EditorConfig, input: &str) -> Result<String, CliError> {
    let doc = decode_page(input)?;
    let mut store = AnnotationStore::new(config);
    store.load(doc.annotations);

    match command {
        Command::Text { mode } => Ok(assemble(&store, *mode)),
        Command::Normalize => save_body(&store),
        Command::Arrange { direction, ids } => {
            let ids: Vec<AnnotationId> = ids
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(AnnotationId::intern)
                .collect();
            if !arrange(&mut store, &ids, *direction) {
                log::warn!("nothing to arrange: fewer than two known ids");
            }
            save_body(&store)
        }
        Command::Groups => Ok(groups(&store, &config.palette)
            .iter()
            .map(|g| {
                format!(
                    "{}\t{}\t{}\t{}",
                    g.label,
                    g.color,
                    g.group_id,
                    g.members.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn save_body(store: &AnnotationStore) -> Result<String, CliError> {
    let body = SaveBody {
        annotations: store.snapshot(),
    };
    Ok(body.to_json_pretty()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(list: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("ocrfix").chain(list.iter().copied()))
    }

    const PAGE: &str = r#"{"annotations": [
        {"id": "cli_r", "text": "right", "x": 200, "y": 0, "width": 40, "height": 20, "order": 0, "group_id": 0},
        {"id": "cli_l", "text": "left", "x": 10, "y": 0, "width": 40, "height": 20, "order": 1, "group_id": 0},
        {"id": "cli_n", "text": "note", "x": 10, "y": 80, "width": 40, "height": 20, "order": 2, "group_id": 3}
    ]}"#;

    #[test]
    fn parse_text_with_mode_and_config() {
        let cli = parse(&["text", "--mode", "continuous", "--config", "c.json"]).unwrap();
        assert_eq!(cli.command, Command::Text { mode: TextMode::Continuous });
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn text_mode_defaults_to_group_break() {
        let cli = parse(&["text"]).unwrap();
        assert_eq!(cli.command, Command::Text { mode: TextMode::GroupBreak });
    }

    #[test]
    fn parse_arrange_requires_direction() {
        assert!(parse(&["arrange", "--ids", "a,b"]).is_err());
        assert!(parse(&["arrange", "--direction", "sideways", "--ids", "a,b"]).is_err());
    }

    #[test]
    fn parse_rejects_unknown_command() {
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn parse_arrange_ids() {
        let cli = parse(&["arrange", "--direction", "rtl", "--ids", "a,b,c"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Arrange {
                direction: ArrangeDirection::RightToLeft,
                ids: vec!["a".into(), "b".into(), "c".into()],
            }
        );
    }

    #[test]
    fn text_continuous() {
        let out = execute(
            &Command::Text { mode: TextMode::Continuous },
            &EditorConfig::default(),
            PAGE,
        ).unwrap();
        assert_eq!(out, "rightleftnote");
    }

    #[test]
    fn arrange_moves_left_box_first() {
        let cmd = Command::Arrange {
            direction: ArrangeDirection::LeftToRight,
            ids: vec!["cli_r".into(), "cli_l".into()],
        };
        let out = execute(&cmd, &EditorConfig::default(), PAGE).unwrap();
        let left = out.find("cli_l").unwrap();
        let right = out.find("cli_r").unwrap();
        assert!(left < right);
    }

    #[test]
    fn groups_report() {
        let out = execute(&Command::Groups, &EditorConfig::default(), PAGE).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["A\t#E4572E\t0\t2", "B\t#17BEBB\t3\t1"]);
    }

    #[test]
    fn malformed_page_is_an_error() {
        let err = execute(&Command::Normalize, &EditorConfig::default(), "not json").unwrap_err();
        assert!(matches!(err, CliError::Page(_)));
    }
}
