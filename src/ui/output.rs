//! Status lines for commands
//!
//! Every helper renders through cliclack on a terminal and as a tagged
//! plain line in CI logs and pipes.

use super::context::UiContext;
use console::{style, StyledObject};
use std::io;

#[derive(Debug, Clone, Copy)]
enum Mark {
    Ok,
    Warn,
    Info,
    Fail,
}

impl Mark {
    fn tag(self) -> StyledObject<&'static str> {
        match self {
            Mark::Ok => style("[OK]").green(),
            Mark::Warn => style("[WARN]").yellow(),
            Mark::Info => style("[INFO]").cyan(),
            Mark::Fail => style("[ERROR]").red(),
        }
    }

    fn log(self, line: &str) -> io::Result<()> {
        match self {
            Mark::Ok => cliclack::log::success(line),
            Mark::Warn => cliclack::log::warning(line),
            Mark::Info => cliclack::log::info(line),
            Mark::Fail => cliclack::log::error(line),
        }
    }
}

fn step(ctx: &UiContext, mark: Mark, line: &str) {
    if ctx.use_fancy_output() {
        let _ = mark.log(line);
    } else {
        println!("  {} {}", mark.tag(), line);
    }
}

/// Opening banner of a command
pub fn intro(ctx: &UiContext, title: &str) {
    let title = style(title).magenta().bold();
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(title);
    } else {
        println!("{}", title);
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::outro(style(message).green().bold());
    } else {
        println!("{} {}", Mark::Ok.tag(), message);
    }
}

pub fn outro_error(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::outro_cancel(style(message).red().bold());
    } else {
        println!("{} {}", Mark::Fail.tag(), message);
    }
}

pub fn section(ctx: &UiContext, title: &str) {
    let title = style(title).bold();
    if ctx.use_fancy_output() {
        let _ = cliclack::log::step(title);
    } else {
        println!("\n{}", title);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Ok, message);
}

/// Success line with a dimmed trailer, e.g. a path or a timing
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    let line = format!("{} {}", message, style(format!("({})", detail)).dim());
    step(ctx, Mark::Ok, &line);
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Warn, message);
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Info, message);
}

pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::remark(message);
    } else {
        println!("    {}", style(message).dim());
    }
}

/// One row of a summary table; keys are padded so values line up
pub fn key_value(_ctx: &UiContext, key: &str, value: &str) {
    let key = format!("{}:", key);
    println!("  {} {}", style(format!("{:<11}", key)).dim(), value);
}
