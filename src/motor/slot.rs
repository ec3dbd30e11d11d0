//! The arbiter's two-slot command state.
//!
//! Every motor tracks exactly two things: the command currently in flight
//! (COM2) and how the previous one ended (COM1). A new command on a running
//! motor shifts COM2 into COM1 as `Interrupted`; natural expiry shifts it as
//! `Completed`; an explicit stop as `Stopped`.

/// How the last command ended (the COM1 value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompletionReason {
    /// Reached its end time naturally.
    Completed,
    /// Overridden by a newer command.
    Interrupted,
    /// Terminated by an explicit stop.
    Stopped,
}

/// State of the current command (the COM2 value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandState {
    /// No command in flight.
    Empty,
    /// A command runs until its end time.
    Running,
}

/// Wraparound-safe "has the counter passed t_end" comparison.
#[inline]
pub fn time_reached(now_us: u64, t_end_us: u64) -> bool {
    (now_us.wrapping_sub(t_end_us) as i64) >= 0
}

/// The COM1/COM2 pair for one motor.
///
/// Pure state: transitions never touch hardware. The arbiter stops or
/// starts backends around these calls.
#[derive(Debug, Clone, Copy)]
pub struct CommandSlot {
    com1_reason: CompletionReason,
    com2_state: CommandState,
    com2_t_end_us: u64,
}

impl Default for CommandSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSlot {
    /// Fresh slot: nothing running, last command counts as completed.
    pub fn new() -> Self {
        Self {
            com1_reason: CompletionReason::Completed,
            com2_state: CommandState::Empty,
            com2_t_end_us: 0,
        }
    }

    /// Settle natural completion: a running command whose end time has
    /// passed becomes COM1 = Completed, COM2 = Empty.
    pub fn update(&mut self, now_us: u64) {
        if self.com2_state != CommandState::Running {
            return;
        }
        if !time_reached(now_us, self.com2_t_end_us) {
            return;
        }

        self.com1_reason = CompletionReason::Completed;
        self.com2_state = CommandState::Empty;
    }

    /// Install a new running command ending at `t_end_us`.
    pub fn begin(&mut self, t_end_us: u64) {
        self.com2_t_end_us = t_end_us;
        self.com2_state = CommandState::Running;
    }

    /// Shift the running command out as interrupted.
    pub fn interrupt(&mut self) {
        self.com1_reason = CompletionReason::Interrupted;
        self.com2_state = CommandState::Empty;
    }

    /// Record a no-op command as instantly completed.
    pub fn complete_noop(&mut self) {
        self.com1_reason = CompletionReason::Completed;
        self.com2_state = CommandState::Empty;
    }

    /// Shift the running command out as stopped.
    pub fn stop(&mut self) {
        self.com1_reason = CompletionReason::Stopped;
        self.com2_state = CommandState::Empty;
    }

    /// Is a command in flight?
    #[inline]
    pub fn is_running(&self) -> bool {
        self.com2_state == CommandState::Running
    }

    /// The COM1 value.
    #[inline]
    pub fn last_completion(&self) -> CompletionReason {
        self.com1_reason
    }

    /// End time of the running command (meaningful while running).
    #[inline]
    pub fn t_end_us(&self) -> u64 {
        self.com2_t_end_us
    }
}
