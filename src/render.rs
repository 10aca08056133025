//! Terminal presentation of transcripts: narration in muted italics, scene
//! notes boxed and muted, thoughts in accented italics, dialogue emphasized.

use colored::Colorize;
use std::io::{ self, Write };

use crate::chat::ViewEvent;
use crate::markup::{ segment, MarkupSegment, SegmentKind };
use crate::models::chat::{ Role, TranscriptEntry };

pub fn render_segment(seg: &MarkupSegment) -> String {
    match seg.kind {
        SegmentKind::Dialogue => seg.content.bold().to_string(),
        SegmentKind::Narration => seg.content.italic().dimmed().to_string(),
        SegmentKind::Background => format!("[ {} ]", seg.content).dimmed().to_string(),
        SegmentKind::Thought => seg.content.italic().magenta().to_string(),
    }
}

pub fn render_entry(entry: &TranscriptEntry, speaker: &str) -> String {
    match entry.role {
        Role::User => format!("{} {}", "나 >".blue().bold(), entry.text),
        Role::SystemChoice => format!("{} {}", "▸".yellow(), entry.text.yellow()),
        Role::Assistant => {
            let body = segment(&entry.text)
                .iter()
                .map(render_segment)
                .collect::<Vec<_>>()
                .join(" ");
            format!("{} {}", format!("{}:", speaker).cyan().bold(), body)
        }
    }
}

/// Echoes a reply while it streams. Raw text is shown as fragments arrive;
/// the caller re-renders the finished entry with segment styling.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    current: Option<usize>,
    printed: usize,
    finished: Vec<usize>,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes of assistant entries that appeared since the last call.
    pub fn take_finished(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.finished)
    }

    pub fn handle(&mut self, event: &ViewEvent) -> io::Result<()> {
        let mut out = io::stdout();
        match event {
            ViewEvent::EntryAppended { index, entry } if entry.role == Role::Assistant => {
                self.close_line(&mut out)?;
                write!(out, "{}", entry.text.dimmed())?;
                self.current = Some(*index);
                self.printed = entry.text.len();
                self.finished.push(*index);
            }
            ViewEvent::EntryUpdated { index, text } if self.current == Some(*index) => {
                if let Some(delta) = text.get(self.printed..) {
                    write!(out, "{}", delta.dimmed())?;
                }
                self.printed = text.len();
            }
            ViewEvent::SessionFinished { .. } => {
                self.close_line(&mut out)?;
            }
            _ => {}
        }
        out.flush()
    }

    fn close_line(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.current.take().is_some() {
            writeln!(out)?;
        }
        self.printed = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::StreamOutcome;
    use uuid::Uuid;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn assistant_entries_render_segments_in_order() {
        plain();
        let entry = TranscriptEntry::assistant("*smiles* Hello [a quiet room] (I wonder...) how are you?");
        assert_eq!(
            render_entry(&entry, "Mina"),
            "Mina: smiles Hello [ a quiet room ] I wonder... how are you?"
        );
    }

    #[test]
    fn user_and_choice_entries_are_not_segmented() {
        plain();
        assert_eq!(render_entry(&TranscriptEntry::user("*not markup*"), "Mina"), "나 > *not markup*");
        assert_eq!(render_entry(&TranscriptEntry::choice("A"), "Mina"), "▸ A");
    }

    #[test]
    fn printer_tracks_streamed_entries() {
        plain();
        let mut printer = StreamPrinter::new();
        printer.handle(&ViewEvent::EntryAppended { index: 1, entry: TranscriptEntry::user("hi") }).unwrap();
        printer.handle(&ViewEvent::EntryAppended { index: 2, entry: TranscriptEntry::assistant("He") }).unwrap();
        printer.handle(&ViewEvent::EntryUpdated { index: 2, text: "Hello".into() }).unwrap();
        assert_eq!(printer.printed, 5);

        printer.handle(&ViewEvent::SessionFinished {
            session_id: Uuid::new_v4(),
            outcome: StreamOutcome::Completed,
        }).unwrap();

        assert_eq!(printer.current, None);
        assert_eq!(printer.take_finished(), vec![2]);
        assert!(printer.take_finished().is_empty());
    }
}
