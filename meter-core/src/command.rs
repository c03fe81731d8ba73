// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Console commands.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Command {
    /// Zero the accumulators.
    Reset,
    Start,
    Stop,
    /// Samples per second.
    SampleRate(u16),
    /// Reports per second.
    ReportRate(u16),
    EeRead(u16),
    EeWrite(u16, u8),
    /// Restart through the watchdog.
    Shutdown,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ParseError {
    UnknownCommand,
    BadArgument,
}

fn is_delimiter(b: &u8) -> bool {
    matches!(*b, b' ' | b'\t' | b'\r' | b'\n')
}

fn number<T: core::str::FromStr>(token: Option<&[u8]>) -> Result<T, ParseError> {
    token
        .and_then(|t| core::str::from_utf8(t).ok())
        .and_then(|t| t.parse().ok())
        .ok_or(ParseError::BadArgument)
}

/// Parse one command line.
///
/// Returns `Ok(None)` for a blank line.
/// The command word is case insensitive.
/// Tokens after the arguments are ignored.
pub fn parse(line: &[u8]) -> Result<Option<Command>, ParseError> {
    let mut tokens = line.split(is_delimiter).filter(|t| !t.is_empty());
    let Some(cmd) = tokens.next() else {
        return Ok(None);
    };
    let is = |name: &str| cmd.eq_ignore_ascii_case(name.as_bytes());

    let cmd = if is("reset") {
        Command::Reset
    } else if is("start") {
        Command::Start
    } else if is("stop") {
        Command::Stop
    } else if is("sample") {
        Command::SampleRate(number(tokens.next())?)
    } else if is("report") {
        Command::ReportRate(number(tokens.next())?)
    } else if is("eeread") {
        Command::EeRead(number(tokens.next())?)
    } else if is("eewrite") {
        let addr = number(tokens.next())?;
        let value = number(tokens.next())?;
        Command::EeWrite(addr, value)
    } else if is("shutdown") {
        Command::Shutdown
    } else {
        return Err(ParseError::UnknownCommand);
    };
    Ok(Some(cmd))
}


// vim: ts=4 sw=4 expandtab
