//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::MEMORY_SIZE;
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ])
        .split(frame.area());

    // Left side: code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:03X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

fn flag_span(name: &'static str, set: bool) -> Span<'static> {
    let style = if set {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("{}={} ", name, set as u8), style)
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw("ACC: "),
            Span::styled(format!("{:04X}", regs.acc), value),
            Span::raw(format!(" ({:>6})   IR: ", regs.acc as i16)),
            Span::styled(format!("{:04X}", regs.ir), value),
            Span::raw("   DIN: "),
            Span::styled(format!("{:04X}", regs.din), value),
            Span::raw("   DOUT: "),
            Span::styled(format!("{:04X}", regs.dout), value),
        ]),
        Line::from(vec![
            Span::raw("PC:  "),
            Span::styled(format!("{:04X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   SP: "),
            Span::styled(format!("{:04X}", regs.sp), Style::default().fg(Color::Yellow)),
            Span::raw("   "),
            flag_span("Z", regs.flags.z),
            flag_span("N", regs.flags.n),
            flag_span("V", regs.flags.v),
            flag_span("C", regs.flags.c),
        ]),
        Line::from(vec![
            Span::raw("Phase: "),
            Span::styled(app.cpu.phase.name(), Style::default().fg(Color::Cyan)),
            Span::raw("   Steps: "),
            Span::styled(format!("{}", app.cpu.steps), Style::default().fg(Color::Cyan)),
            Span::raw("   Instr: "),
            Span::styled(format!("{}", app.cpu.instructions), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let pc = app.cpu.regs.pc as usize % MEMORY_SIZE;
    let sp = app.cpu.regs.sp as usize % MEMORY_SIZE;

    let items: Vec<ListItem> = app.cpu.mem.dump(app.mem_scroll, visible_rows)
        .into_iter()
        .map(|(addr, value)| {
            let marker = if addr == pc {
                "PC"
            } else if addr == sp {
                "SP"
            } else {
                "  "
            };
            let text = format!("{} {:03X}: {:04X} {:>6}", marker, addr, value, value as i16);

            let style = if addr == pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if addr == sp {
                Style::default().fg(Color::Magenta)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Micro-step  i: Instruction  r: Run  p: Pause"),
        Line::from("b: Breakpoint  x: Reset  ↑↓/PgUp/PgDn: Memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
