// ── Remote-control vocabulary ──
//
// The buttons of the physical remote and the channel-change form, each
// mapped onto a protocol command.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tivoctl_api::CommandRequest;

/// A button on the appliance's remote control.
///
/// Parsed from and displayed as kebab-case (`channel-up`, `action-a`).
/// Digits also parse from the bare digit (`7`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteButton {
    Tivo,
    LiveTv,
    TvInput,
    Info,
    Guide,
    // Navigation
    Up,
    Down,
    Left,
    Right,
    Select,
    // Volume and channel
    VolumeUp,
    VolumeDown,
    Mute,
    ChannelUp,
    ChannelDown,
    // Ratings
    ThumbsUp,
    ThumbsDown,
    // Transport
    Record,
    Play,
    Pause,
    Reverse,
    Forward,
    VideoOnDemand,
    // Colour keys
    ActionA,
    ActionB,
    ActionC,
    ActionD,
    // Keypad
    #[strum(to_string = "num0", serialize = "0")]
    Num0,
    #[strum(to_string = "num1", serialize = "1")]
    Num1,
    #[strum(to_string = "num2", serialize = "2")]
    Num2,
    #[strum(to_string = "num3", serialize = "3")]
    Num3,
    #[strum(to_string = "num4", serialize = "4")]
    Num4,
    #[strum(to_string = "num5", serialize = "5")]
    Num5,
    #[strum(to_string = "num6", serialize = "6")]
    Num6,
    #[strum(to_string = "num7", serialize = "7")]
    Num7,
    #[strum(to_string = "num8", serialize = "8")]
    Num8,
    #[strum(to_string = "num9", serialize = "9")]
    Num9,
    Clear,
    Enter,
}

impl RemoteButton {
    /// The code sent for this button.
    pub fn code(self) -> &'static str {
        match self {
            Self::Tivo => "TIVO",
            Self::LiveTv => "LIVETV",
            Self::TvInput => "TVINPUT",
            Self::Info => "INFO",
            Self::Guide => "GUIDE",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Select => "SELECT",
            Self::VolumeUp => "VOLUMEUP",
            Self::VolumeDown => "VOLUMEDOWN",
            Self::Mute => "MUTE",
            Self::ChannelUp => "CHANNELUP",
            Self::ChannelDown => "CHANNELDOWN",
            Self::ThumbsUp => "THUMBSUP",
            Self::ThumbsDown => "THUMBSDOWN",
            Self::Record => "RECORD",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Reverse => "REVERSE",
            Self::Forward => "FORWARD",
            Self::VideoOnDemand => "VIDEO_ON_DEMAND",
            Self::ActionA => "ACTION_A",
            Self::ActionB => "ACTION_B",
            Self::ActionC => "ACTION_C",
            Self::ActionD => "ACTION_D",
            Self::Num0 => "NUM0",
            Self::Num1 => "NUM1",
            Self::Num2 => "NUM2",
            Self::Num3 => "NUM3",
            Self::Num4 => "NUM4",
            Self::Num5 => "NUM5",
            Self::Num6 => "NUM6",
            Self::Num7 => "NUM7",
            Self::Num8 => "NUM8",
            Self::Num9 => "NUM9",
            Self::Clear => "CLEAR",
            Self::Enter => "ENTER",
        }
    }

    /// Video-on-demand has no IR code and goes out as a keyboard key.
    pub fn is_keyboard(self) -> bool {
        matches!(self, Self::VideoOnDemand)
    }

    /// The command a press of this button sends.
    pub fn request(self) -> CommandRequest {
        if self.is_keyboard() {
            CommandRequest::keyboard(self.code())
        } else {
            CommandRequest::ir_code(self.code())
        }
    }
}

impl From<RemoteButton> for CommandRequest {
    fn from(button: RemoteButton) -> Self {
        button.request()
    }
}

/// A channel change as collected from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelChange {
    pub channel: u32,
    /// `None` (or `Some(0)`) leaves the subchannel off the wire.
    pub subchannel: Option<u32>,
    /// Cancel a recording in progress if needed to change channel.
    pub stop_recording: bool,
}

impl ChannelChange {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            subchannel: None,
            stop_recording: false,
        }
    }

    /// `FORCECH` when the recording may be stopped, `SETCH` otherwise.
    pub fn into_request(self) -> CommandRequest {
        if self.stop_recording {
            CommandRequest::force_channel(self.channel, self.subchannel)
        } else {
            CommandRequest::set_channel(self.channel, self.subchannel)
        }
    }
}

impl From<ChannelChange> for CommandRequest {
    fn from(change: ChannelChange) -> Self {
        change.into_request()
    }
}
