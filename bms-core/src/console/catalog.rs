//! Command table for the service console.
//!
//! The decoder resolves a received line to a [`CommandSpec`] here and only
//! then applies the session gate, so global and privileged commands share one
//! lookup path.

/// Command identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandTag {
    TestOn,
    PrintContactorInfo,
    PrintDiagInfo,
    GetTime,
    TestOff,
    SetTime,
    Reset,
    WatchdogTest,
    Contactor,
}

impl CommandTag {
    /// Whether a successful dispatch restarts the test-mode timeout.
    #[must_use]
    pub const fn rearms_session(self) -> bool {
        !matches!(
            self,
            CommandTag::TestOff | CommandTag::Reset | CommandTag::WatchdogTest
        )
    }
}

/// Session requirement for a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Dispatched regardless of the test-mode session.
    Global,
    /// Dispatched only while the test-mode session is active.
    Privileged,
}

/// How a received line is matched against a command name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arguments {
    /// The whole line must equal the name.
    None,
    /// The line must start with the name; arguments follow directly.
    Prefix,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub access: Access,
    pub arguments: Arguments,
    pub usage: &'static str,
}

const COMMANDS: [CommandSpec; 9] = [
    CommandSpec {
        name: "teston",
        tag: CommandTag::TestOn,
        access: Access::Global,
        arguments: Arguments::None,
        usage: "teston                      - enable test mode",
    },
    CommandSpec {
        name: "printcontactorinfo",
        tag: CommandTag::PrintContactorInfo,
        access: Access::Global,
        arguments: Arguments::None,
        usage: "printcontactorinfo          - print contactor switching counters",
    },
    CommandSpec {
        name: "printdiaginfo",
        tag: CommandTag::PrintDiagInfo,
        access: Access::Global,
        arguments: Arguments::None,
        usage: "printdiaginfo               - print diagnostic error list",
    },
    CommandSpec {
        name: "gettime",
        tag: CommandTag::GetTime,
        access: Access::Global,
        arguments: Arguments::None,
        usage: "gettime                     - print RTC date and time",
    },
    CommandSpec {
        name: "testoff",
        tag: CommandTag::TestOff,
        access: Access::Privileged,
        arguments: Arguments::None,
        usage: "testoff                     - disable test mode",
    },
    CommandSpec {
        name: "settime",
        tag: CommandTag::SetTime,
        access: Access::Privileged,
        arguments: Arguments::Prefix,
        usage: "settime YY.MM.DD HH:MM:SS   - set RTC date and time",
    },
    CommandSpec {
        name: "reset",
        tag: CommandTag::Reset,
        access: Access::Privileged,
        arguments: Arguments::None,
        usage: "reset                       - software reset",
    },
    CommandSpec {
        name: "watchdogtest",
        tag: CommandTag::WatchdogTest,
        access: Access::Privileged,
        arguments: Arguments::None,
        usage: "watchdogtest                - halt and wait for watchdog reset",
    },
    CommandSpec {
        name: "c",
        tag: CommandTag::Contactor,
        access: Access::Privileged,
        arguments: Arguments::Prefix,
        usage: "c<e|d><n>                   - close (e) or open (d) contactor n",
    },
];

/// Returns the full command table in match order.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Looks up a command by its tag.
#[must_use]
pub fn command(tag: CommandTag) -> &'static CommandSpec {
    match tag {
        CommandTag::TestOn => &COMMANDS[0],
        CommandTag::PrintContactorInfo => &COMMANDS[1],
        CommandTag::PrintDiagInfo => &COMMANDS[2],
        CommandTag::GetTime => &COMMANDS[3],
        CommandTag::TestOff => &COMMANDS[4],
        CommandTag::SetTime => &COMMANDS[5],
        CommandTag::Reset => &COMMANDS[6],
        CommandTag::WatchdogTest => &COMMANDS[7],
        CommandTag::Contactor => &COMMANDS[8],
    }
}

/// Resolves a received line (terminator stripped) to its command.
///
/// Matching is case-sensitive.
#[must_use]
pub fn lookup(line: &[u8]) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| {
        let name = spec.name.as_bytes();
        match spec.arguments {
            Arguments::None => line == name,
            Arguments::Prefix => line.starts_with(name),
        }
    })
}
