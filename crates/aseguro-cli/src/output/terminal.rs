//! Terminal output formatter

use aseguro_core::{AssistantResponse, ComparisonOutcome, ComparisonResult};
use std::io::{IsTerminal, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

fn color_choice() -> ColorChoice {
    if std::io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

pub fn print_response(response: &AssistantResponse) -> std::io::Result<()> {
    let writer = BufferWriter::stdout(color_choice());
    let mut buffer = writer.buffer();
    write_response(&mut buffer, response)?;
    writer.print(&buffer)
}

pub fn write_response(out: &mut Buffer, response: &AssistantResponse) -> std::io::Result<()> {
    match response {
        AssistantResponse::Blocked { reply, reason } => {
            tag(out, "blocked", Color::Red)?;
            writeln!(out, " {}", reply)?;
            out.set_color(ColorSpec::new().set_dimmed(true))?;
            writeln!(out, "  trigger: {}", reason.trigger())?;
            out.reset()?;
        }
        AssistantResponse::Chitchat { reply, .. } => {
            writeln!(out, "{}", reply)?;
        }
        AssistantResponse::Answer { text, sources } => {
            writeln!(out, "{}", text.trim_end())?;
            if !sources.is_empty() {
                writeln!(out)?;
                tag(out, "sources", Color::Cyan)?;
                writeln!(out)?;
                for source in sources {
                    writeln!(
                        out,
                        "  {} (Pág {})",
                        source.insurer,
                        source.page.as_deref().unwrap_or("?")
                    )?;
                }
            }
        }
        AssistantResponse::NoInformation { text } => {
            tag(out, "no information", Color::Yellow)?;
            writeln!(out, " {}", text)?;
        }
        AssistantResponse::Comparison(ComparisonOutcome::Table(table)) => {
            write_table(out, table)?;
        }
        AssistantResponse::Comparison(ComparisonOutcome::Failed { error }) => {
            tag(out, "comparison failed", Color::Red)?;
            writeln!(out, " {}", error)?;
        }
        AssistantResponse::Failed { reason } => {
            tag(out, "failed", Color::Red)?;
            writeln!(out, " {}", reason)?;
        }
    }
    Ok(())
}

fn tag(out: &mut Buffer, label: &str, color: Color) -> std::io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "[{}]", label)?;
    out.reset()
}

fn write_table(out: &mut Buffer, table: &ComparisonResult) -> std::io::Result<()> {
    let width = table
        .comparison
        .iter()
        .map(|row| row.insurer.chars().count())
        .max()
        .unwrap_or(0)
        .max(11);

    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "{}", table.feature)?;
    out.reset()?;

    for row in &table.comparison {
        if !row.is_specified() {
            out.set_color(ColorSpec::new().set_dimmed(true))?;
        }
        write!(out, "  {:<width$}  {}", row.insurer, row.value, width = width)?;
        if !row.source.is_empty() {
            write!(out, " ({})", row.source)?;
        }
        writeln!(out)?;
        out.reset()?;
        if !row.details.is_empty() {
            writeln!(out, "  {:<width$}  {}", "", row.details, width = width)?;
        }
    }
    Ok(())
}
