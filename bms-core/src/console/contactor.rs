//! `c<action><index>` contactor switching command.

use core::fmt;

use crate::devices::{ContactorDriver, ContactorState};

const ACTION_OFFSET: usize = 1;
const INDEX_OFFSET: usize = 2;

/// Parsed contactor request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContactorCommand {
    pub index: u8,
    pub state: ContactorState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContactorError {
    /// Index missing, not a digit, or above the configured contactor count.
    InvalidIndex { count: u8 },
    /// Action selector was neither `e` nor `d`.
    InvalidAction,
}

impl fmt::Display for ContactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactorError::InvalidIndex { count } => {
                write!(f, "contactor index outside 0..={count}")
            }
            ContactorError::InvalidAction => f.write_str("contactor action must be `e` or `d`"),
        }
    }
}

/// Parses a contactor command. The index is checked before the action.
pub fn parse(line: &[u8], count: u8) -> Result<ContactorCommand, ContactorError> {
    let index = line
        .get(INDEX_OFFSET)
        .filter(|byte| byte.is_ascii_digit())
        .map(|byte| byte - b'0')
        .filter(|index| *index <= count)
        .ok_or(ContactorError::InvalidIndex { count })?;

    let state = match line.get(ACTION_OFFSET) {
        Some(b'e') => ContactorState::Closed,
        Some(b'd') => ContactorState::Open,
        _ => return Err(ContactorError::InvalidAction),
    };

    Ok(ContactorCommand { index, state })
}

/// Parses the command and drives the contactor on success.
pub fn execute<C>(line: &[u8], count: u8, driver: &mut C) -> Result<ContactorCommand, ContactorError>
where
    C: ContactorDriver + ?Sized,
{
    let command = parse(line, count)?;
    driver.set_state(command.index, command.state);
    Ok(command)
}
