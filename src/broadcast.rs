//! Remote-control message broadcast.
//!
//! The simulator listens for a registered window message posted to every
//! top-level window. Delivery is fire-and-forget: posting succeeds whether or
//! not the simulator is running, and nothing acknowledges receipt. The
//! command and its first argument ride in `wParam` (low and high 16 bits);
//! the remaining two arguments ride in `lParam` the same way.

/// Name of the registered window message the simulator listens for.
pub const BROADCAST_MESSAGE_NAME: &str = "IRSDK_BROADCASTMSG";

/// Remote-control command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BroadcastCommand {
    /// Switch camera by car position.
    CamSwitchPos = 0,
    /// Switch camera by driver number.
    CamSwitchNum,
    /// Set camera state.
    CamSetState,
    /// Set replay playback speed.
    ReplaySetPlaySpeed,
    /// Jump to a replay position.
    ReplaySetPlayPosition,
    /// Search the replay tape.
    ReplaySearch,
    /// Set replay state.
    ReplaySetState,
    /// Reload car textures.
    ReloadTextures,
    /// Issue a chat macro.
    ChatCommand,
    /// Issue a pit stop command.
    PitCommand,
    /// Control disk-based telemetry capture.
    TelemCommand,
}

/// Pack two 16-bit halves into one message word, low part first.
fn make_long(low: i16, high: i16) -> i32 {
    ((low as u16 as u32) | ((high as u16 as u32) << 16)) as i32
}

/// The `wParam` for a command: low 16 bits are the command, high 16 bits the
/// first argument.
pub fn command_wparam(command: BroadcastCommand, arg1: i32) -> i32 {
    make_long(command as i16, arg1 as i16)
}

/// The `lParam` for a command: low 16 bits are the second argument, high 16
/// bits the third.
pub fn command_lparam(arg2: i32, arg3: i32) -> i32 {
    make_long(arg2 as i16, arg3 as i16)
}

/// Posts remote-control commands to the simulator.
#[cfg(windows)]
#[derive(Debug, Default)]
pub struct BroadcastEmitter;

#[cfg(windows)]
impl BroadcastEmitter {
    pub fn new() -> Self {
        Self
    }

    /// Broadcast a command with up to three 16-bit arguments.
    pub fn send(&self, command: BroadcastCommand, arg1: i32, arg2: i32, arg3: i32) -> crate::Result<()> {
        self.send_raw(command, arg1, command_lparam(arg2, arg3))
    }

    /// Broadcast a command with a pre-packed 32-bit `lParam`.
    ///
    /// Some commands (replay position, telemetry capture) take a full 32-bit
    /// value rather than two packed halves.
    pub fn send_raw(&self, command: BroadcastCommand, arg1: i32, arg2: i32) -> crate::Result<()> {
        use crate::SdkError;
        use windows::Win32::Foundation::{LPARAM, WPARAM};
        use windows::Win32::UI::WindowsAndMessaging::{HWND_BROADCAST, PostMessageW};

        let message = registered_message_id()?;
        let wparam = WPARAM(command_wparam(command, arg1) as u32 as usize);
        let lparam = LPARAM(arg2 as isize);

        unsafe { PostMessageW(Some(HWND_BROADCAST), message, wparam, lparam) }
            .map_err(|e| SdkError::windows_api("PostMessageW", e))
    }
}

/// The registered broadcast message id, resolved once per process.
#[cfg(windows)]
fn registered_message_id() -> crate::Result<u32> {
    use crate::windows::wide_string;
    use std::sync::OnceLock;
    use windows::Win32::UI::WindowsAndMessaging::RegisterWindowMessageW;
    use windows::core::PCWSTR;

    static MESSAGE_ID: OnceLock<u32> = OnceLock::new();

    if let Some(&id) = MESSAGE_ID.get() {
        return Ok(id);
    }

    let wide_name = wide_string(BROADCAST_MESSAGE_NAME);
    let id = unsafe { RegisterWindowMessageW(PCWSTR::from_raw(wide_name.as_ptr())) };
    if id == 0 {
        let win_err = windows::core::Error::from_thread();
        return Err(crate::SdkError::windows_api("RegisterWindowMessageW", win_err));
    }

    let _ = MESSAGE_ID.set(id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_low_then_high() {
        assert_eq!(make_long(1, 2), 0x0002_0001);
        assert_eq!(make_long(0, 0), 0);
        assert_eq!(make_long(0x7FFF, 0x7FFF), 0x7FFF_7FFF);
    }

    #[test]
    fn negative_halves_are_truncated_not_sign_extended() {
        assert_eq!(make_long(-1, 0), 0x0000_FFFF);
        assert_eq!(make_long(0, -1), 0xFFFF_0000u32 as i32);
    }

    #[test]
    fn wparam_carries_command_in_low_half() {
        let wparam = command_wparam(BroadcastCommand::PitCommand, 3);
        assert_eq!(wparam & 0xFFFF, BroadcastCommand::PitCommand as i32);
        assert_eq!((wparam >> 16) & 0xFFFF, 3);
    }

    #[test]
    fn lparam_carries_second_and_third_arguments() {
        let lparam = command_lparam(7, -2);
        assert_eq!(lparam & 0xFFFF, 7);
        assert_eq!(((lparam as u32) >> 16) as u16, (-2i16) as u16);
    }

    #[test]
    fn command_vocabulary_is_stable() {
        assert_eq!(BroadcastCommand::CamSwitchPos as i32, 0);
        assert_eq!(BroadcastCommand::CamSwitchNum as i32, 1);
        assert_eq!(BroadcastCommand::ReplaySetPlaySpeed as i32, 3);
        assert_eq!(BroadcastCommand::ChatCommand as i32, 8);
        assert_eq!(BroadcastCommand::PitCommand as i32, 9);
        assert_eq!(BroadcastCommand::TelemCommand as i32, 10);
    }
}
