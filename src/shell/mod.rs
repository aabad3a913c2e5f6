//! Line-oriented shell that plays the presentation role from a terminal.

use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use schedule_grid::models::mode::{ModeId, ModeTable};
use schedule_grid::models::settings::{ScheduleConfig, Settings};
use schedule_grid::services::editor::{GridEditor, RenderFrame, RenderSink};
use schedule_grid::services::notice::Notice;
use schedule_grid::services::sync::RemoteHandle;
use schedule_grid::utils::date::{slot_label, weekday_for_index};

const HELP: &str =
    "commands: click D H | hover D H | cancel | mode ID | entities ID... | show | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Click(usize, usize),
    Hover(usize, usize),
    Cancel,
    Mode(String),
    Entities(Vec<String>),
    Show,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command");
        };

        let command = match verb {
            "click" => {
                let (day, half_hour) = parse_cell(&mut words)?;
                Command::Click(day, half_hour)
            }
            "hover" => {
                let (day, half_hour) = parse_cell(&mut words)?;
                Command::Hover(day, half_hour)
            }
            "cancel" => Command::Cancel,
            "mode" => Command::Mode(
                words
                    .next()
                    .ok_or_else(|| anyhow!("mode needs an id"))?
                    .to_string(),
            ),
            "entities" => return Ok(Command::Entities(words.map(str::to_string).collect())),
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{}'", other),
        };

        if let Some(extra) = words.next() {
            bail!("unexpected argument '{}'", extra);
        }
        Ok(command)
    }
}

fn parse_cell<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<(usize, usize)> {
    let mut next = |name: &str| -> Result<usize> {
        let word = words.next().ok_or_else(|| anyhow!("missing {}", name))?;
        word.parse::<usize>()
            .with_context(|| format!("{} must be a number, got '{}'", name, word))
    };
    let day = next("day")?;
    let half_hour = next("half hour")?;
    Ok((day, half_hour))
}

/// Prints frames as one letter per slot, upper-case while pending.
pub struct TerminalSink {
    modes: ModeTable,
}

impl TerminalSink {
    pub fn new(modes: ModeTable) -> Self {
        Self { modes }
    }

    fn letter(&self, mode: &ModeId, pending: bool) -> char {
        let letter = self
            .modes
            .get(mode)
            .and_then(|info| info.label.chars().next())
            .or_else(|| mode.as_str().chars().next())
            .unwrap_or('?');
        if pending {
            letter.to_ascii_uppercase()
        } else {
            letter.to_ascii_lowercase()
        }
    }

    pub fn format_frame(&self, frame: &RenderFrame) -> String {
        let mut out = format!("{} ({})\n", frame.title, frame.schedule_id);

        out.push_str("    ");
        for half_hour in (0..frame.grid.first().map_or(0, Vec::len)).step_by(4) {
            out.push_str(&format!("{:<4}", &slot_label(half_hour)[..2]));
        }
        out.push('\n');

        for (day, row) in frame.grid.iter().enumerate() {
            out.push_str(&format!("{} ", weekday_for_index(day)));
            out.extend(row.iter().map(|cell| self.letter(&cell.mode, cell.is_pending)));
            out.push('\n');
        }

        out.push_str(&format!("mode: {}", frame.current_mode));
        if let Some(anchor) = frame.anchor {
            out.push_str(&format!(
                "  anchor: {} {}",
                weekday_for_index(anchor.day()),
                slot_label(anchor.half_hour())
            ));
        }
        if !frame.entities.is_empty() {
            out.push_str(&format!("  entities: {}", frame.entities.join(", ")));
        }
        out
    }
}

impl RenderSink for TerminalSink {
    fn render(&self, frame: &RenderFrame) {
        println!("{}", self.format_frame(frame));
    }

    fn notify(&self, notice: &Notice) {
        eprintln!("{}", notice);
    }
}

pub async fn run<R>(remote: Rc<R>, settings: &Settings, schedule: ScheduleConfig) -> Result<()>
where
    R: RemoteHandle + 'static,
{
    let modes = settings.mode_table()?;
    let sink = Rc::new(TerminalSink::new(modes.clone()));
    let editor = GridEditor::new(remote, Rc::clone(&sink), modes, &settings.initial_mode)?;

    editor.on_attach(schedule)?;
    editor.settle().await;
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{:#}", err);
                continue;
            }
        };

        if let Err(err) = apply(&editor, &sink, command.clone()) {
            eprintln!("{:#}", err);
        }
        if command == Command::Quit {
            break;
        }
        editor.settle().await;
    }

    editor.on_detach();
    editor.settle().await;
    log::info!("Shell closed");
    Ok(())
}

fn apply<R>(
    editor: &GridEditor<R, TerminalSink>,
    sink: &TerminalSink,
    command: Command,
) -> Result<()>
where
    R: RemoteHandle + 'static,
{
    match command {
        Command::Click(day, half_hour) => editor.on_cell_click(day, half_hour)?,
        Command::Hover(day, half_hour) => editor.on_cell_hover(day, half_hour)?,
        Command::Cancel => {
            if !editor.on_cancel() {
                println!("nothing to cancel");
            }
        }
        Command::Mode(id) => editor.on_mode_selected(&id)?,
        Command::Entities(ids) => editor.set_entities(ids),
        Command::Show => match editor.render_frame() {
            Some(frame) => println!("{}", sink.format_frame(&frame)),
            None => println!("schedule not loaded"),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}
