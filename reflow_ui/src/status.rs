//! Status line text and a line-oriented display sink.

use std::io::Write;

use reflow_traits::{BoxError, Display, Frame, OvenPhase};

/// "Ready." with one to four dots, cycling on `tick`.
pub fn ready_banner(tick: u64) -> String {
    let dots = 1 + (tick % 4) as usize;
    format!("Ready{}", ".".repeat(dots))
}

fn reading(c: Option<f32>) -> String {
    c.map_or_else(|| "---.-".to_string(), |c| format!("{c:5.1}"))
}

/// One-line summary of a frame. `idle_tick` drives the ready animation.
pub fn status_line(frame: &Frame, idle_tick: u64) -> String {
    let heat = if frame.relay_on { "ON " } else { "off" };
    let mut line = match frame.phase {
        OvenPhase::Idle => ready_banner(idle_tick),
        OvenPhase::Preheating => format!(
            "Preheat  {} C -> {} C  heat {heat}",
            reading(frame.measured_c),
            reading(frame.target_c)
        ),
        OvenPhase::Running => format!(
            "Stage {}  t={:6.1}s  {} C -> {} C  heat {heat}",
            frame.stage.unwrap_or_default(),
            frame.elapsed_ms as f64 / 1000.0,
            reading(frame.measured_c),
            reading(frame.target_c)
        ),
        OvenPhase::Finished => format!(
            "Done.  t={:6.1}s  {} C",
            frame.elapsed_ms as f64 / 1000.0,
            reading(frame.measured_c)
        ),
        OvenPhase::Fault => format!("FAULT  heater off  {} C", reading(frame.measured_c)),
    };
    if frame.sensor_fault {
        line.push_str("  [sensor]");
    }
    line
}

/// Writes a status line whenever the phase, stage or relay changes, and
/// otherwise at most once per `interval_ms` of run time.
pub struct TextDisplay<W: Write> {
    out: W,
    interval_ms: u64,
    frames_per_dot: u64,
    idle_frames: u64,
    last_line: Option<String>,
    last_key: Option<(OvenPhase, Option<usize>, bool, bool)>,
    last_emit_ms: u64,
}

impl<W: Write> TextDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            interval_ms: 5_000,
            frames_per_dot: 4,
            idle_frames: 0,
            last_line: None,
            last_key: None,
            last_emit_ms: 0,
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Idle frames per banner animation step.
    pub fn with_frames_per_dot(mut self, frames: u64) -> Self {
        self.frames_per_dot = frames.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn should_emit(&self, frame: &Frame, line: &str) -> bool {
        let key = (frame.phase, frame.stage, frame.relay_on, frame.sensor_fault);
        if self.last_key != Some(key) {
            return true;
        }
        match frame.phase {
            OvenPhase::Idle => self.last_line.as_deref() != Some(line),
            OvenPhase::Finished | OvenPhase::Fault => false,
            OvenPhase::Preheating | OvenPhase::Running => {
                frame.elapsed_ms.saturating_sub(self.last_emit_ms) >= self.interval_ms
            }
        }
    }
}

impl<W: Write> Display for TextDisplay<W> {
    fn render(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let tick = self.idle_frames / self.frames_per_dot;
        if frame.phase == OvenPhase::Idle {
            self.idle_frames += 1;
        } else {
            self.idle_frames = 0;
        }
        let line = status_line(frame, tick);
        if !self.should_emit(frame, &line) {
            return Ok(());
        }
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        self.last_key = Some((frame.phase, frame.stage, frame.relay_on, frame.sensor_fault));
        self.last_emit_ms = frame.elapsed_ms;
        self.last_line = Some(line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn running(elapsed_ms: u64, stage: usize, relay_on: bool) -> Frame {
        Frame {
            phase: OvenPhase::Running,
            elapsed_ms,
            measured_c: Some(101.3),
            target_c: Some(150.0),
            relay_on,
            stage: Some(stage),
            sensor_fault: false,
        }
    }

    fn written(d: TextDisplay<Vec<u8>>) -> Vec<String> {
        String::from_utf8(d.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[rstest]
    #[case(0, "Ready.")]
    #[case(1, "Ready..")]
    #[case(2, "Ready...")]
    #[case(3, "Ready....")]
    #[case(4, "Ready.")]
    fn banner_cycles(#[case] tick: u64, #[case] expected: &str) {
        assert_eq!(ready_banner(tick), expected);
    }

    #[test]
    fn running_line_shows_stage_and_temperatures() {
        let line = status_line(&running(40_000, 2, true), 0);
        assert_eq!(line, "Stage 2  t=  40.0s  101.3 C -> 150.0 C  heat ON ");
    }

    #[test]
    fn sensor_fault_is_flagged() {
        let mut f = running(1_000, 1, false);
        f.sensor_fault = true;
        f.measured_c = None;
        let line = status_line(&f, 0);
        assert!(line.contains("---.-"));
        assert!(line.ends_with("[sensor]"));
    }

    #[test]
    fn lines_are_throttled_between_changes() {
        let mut d = TextDisplay::new(Vec::new()).with_interval_ms(5_000);
        for ms in (0..=10_000).step_by(250) {
            d.render(&running(ms, 1, true)).unwrap();
        }
        // t=0, t=5000, t=10000
        assert_eq!(written(d).len(), 3);
    }

    #[test]
    fn relay_change_is_written_immediately() {
        let mut d = TextDisplay::new(Vec::new());
        d.render(&running(0, 1, true)).unwrap();
        d.render(&running(250, 1, false)).unwrap();
        d.render(&running(500, 2, false)).unwrap();
        assert_eq!(written(d).len(), 3);
    }

    #[test]
    fn idle_banner_animates_per_dot_step() {
        let mut d = TextDisplay::new(Vec::new()).with_frames_per_dot(2);
        for _ in 0..8 {
            d.render(&Frame::default()).unwrap();
        }
        assert_eq!(
            written(d),
            vec!["Ready.", "Ready..", "Ready...", "Ready...."]
        );
    }

    #[test]
    fn finished_is_written_once() {
        let mut d = TextDisplay::new(Vec::new());
        let done = Frame {
            phase: OvenPhase::Finished,
            elapsed_ms: 280_000,
            measured_c: Some(117.0),
            ..Frame::default()
        };
        d.render(&done).unwrap();
        d.render(&done).unwrap();
        assert_eq!(written(d), vec!["Done.  t= 280.0s  117.0 C"]);
    }
}
