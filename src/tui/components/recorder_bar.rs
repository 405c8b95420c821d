//! One-line voice note status shown above the composer while the recorder
//! is not idle.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::recorder::{RecorderState, VoiceRecorder, format_elapsed};
use crate::tui::component::Component;

pub struct RecorderBar<'a> {
    pub recorder: &'a VoiceRecorder,
}

impl<'a> RecorderBar<'a> {
    pub fn line(&self) -> Line<'static> {
        let clock = format_elapsed(self.recorder.elapsed_secs());
        match self.recorder.state() {
            RecorderState::Idle => Line::default(),
            RecorderState::Recording => Line::from(vec![
                Span::styled(
                    "● REC ",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::raw(clock),
                Span::styled("  /pause  /stop", Style::default().fg(Color::DarkGray)),
            ]),
            RecorderState::Paused => Line::from(vec![
                Span::styled("❚❚ PAUSED ", Style::default().fg(Color::Yellow)),
                Span::raw(clock),
                Span::styled("  /resume  /stop", Style::default().fg(Color::DarkGray)),
            ]),
            RecorderState::Stopped => {
                let secs = self.recorder.staged().map(|c| c.duration_secs).unwrap_or_default();
                let mut spans = vec![Span::styled(
                    format!("Voice note {secs:.1}s ready"),
                    Style::default().fg(Color::Green),
                )];
                if let Some(path) = self.recorder.preview_path() {
                    spans.push(Span::raw(format!(" ({})", path.display())));
                }
                spans.push(Span::styled(
                    "  /send-voice  /clear-voice",
                    Style::default().fg(Color::DarkGray),
                ));
                Line::from(spans)
            }
        }
    }
}

impl<'a> Component for RecorderBar<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.line(), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recorder::StopPolicy;
    use crate::test_support::{FAKE_SAMPLE_RATE, FakeCapture};

    fn text(bar: &RecorderBar) -> String {
        bar.line().spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bar_follows_recorder_state() {
        let dir = tempfile::tempdir().unwrap();
        let device = FakeCapture::granting(vec![0.1; FAKE_SAMPLE_RATE as usize * 2]);
        let mut recorder =
            VoiceRecorder::new(Box::new(device), StopPolicy::Stage).with_preview_dir(dir.path());
        assert_eq!(text(&RecorderBar { recorder: &recorder }), "");

        recorder.start().unwrap();
        recorder.tick();
        recorder.tick();
        let shown = text(&RecorderBar { recorder: &recorder });
        assert!(shown.contains("REC"));
        assert!(shown.contains("00:02"));

        recorder.pause().unwrap();
        assert!(text(&RecorderBar { recorder: &recorder }).contains("PAUSED"));

        recorder.stop().unwrap();
        let shown = text(&RecorderBar { recorder: &recorder });
        assert!(shown.contains("Voice note 2.0s ready"));
        assert!(shown.contains("/send-voice"));
    }
}
