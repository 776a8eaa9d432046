use termcolor::{Color, ColorSpec, WriteColor};

use std::io::{self, Write};

use crate::snapshot::{FrameSnapshot, Snapshot, Tracer};

/// Prints each snapshot as a block of coloured text: the action, the call
/// stack from top to base, then the global scope.
pub struct Render<W> {
    writer: W,
}

impl<W: WriteColor> Render<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn rule(&mut self, title: &str) -> io::Result<()> {
        self.writer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(self.writer, "── {title} {}", "─".repeat(60_usize.saturating_sub(title.chars().count())))?;
        self.writer.reset()
    }

    fn frame(&mut self, frame: &FrameSnapshot) -> io::Result<()> {
        self.writer.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        write!(self.writer, "  {}", frame.name)?;
        self.writer.reset()?;
        writeln!(
            self.writer,
            " (type={}, lex={}, parent={})",
            frame.scope_type,
            frame.lex_parent.as_deref().unwrap_or("None"),
            frame.parent.as_deref().unwrap_or("None"),
        )?;
        if frame.locals.is_empty() {
            writeln!(self.writer, "    (empty)")?;
        }
        for (name, value) in &frame.locals {
            self.binding(name, &value.to_string())?;
        }
        Ok(())
    }

    fn binding(&mut self, name: &str, value: &str) -> io::Result<()> {
        write!(self.writer, "    ")?;
        self.writer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        write!(self.writer, "{name}")?;
        self.writer.reset()?;
        writeln!(self.writer, " = {value}")
    }

    fn heading(&mut self, heading: &str, color: Color) -> io::Result<()> {
        self.writer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        writeln!(self.writer, "{heading}")?;
        self.writer.reset()
    }
}

impl<W: WriteColor> Tracer for Render<W> {
    fn record(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.rule(&snapshot.action)?;

        self.heading("Call Stack (top to base)", Color::Cyan)?;
        if snapshot.call_stack.is_empty() {
            writeln!(self.writer, "  (empty)")?;
        }
        for frame in snapshot.call_stack.iter().rev() {
            self.frame(frame)?;
        }

        self.heading("Global Scope", Color::Blue)?;
        if snapshot.global_scope.is_empty() {
            writeln!(self.writer, "    (empty)")?;
        }
        for (name, value) in &snapshot.global_scope {
            self.binding(name, &value.to_string())?;
        }
        if let Some(output) = &snapshot.output {
            self.heading(&format!("Output: {output}"), Color::Green)?;
        }
        self.writer.flush()
    }
}
