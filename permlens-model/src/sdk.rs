//! Named platform API levels and the brackets the engine branches on.

/// First level with runtime permission prompts; older apps fold Ask into Deny.
pub const M: u32 = 23;
/// Scoped storage introduced; lower bound of the storage dialog table.
pub const Q: u32 = 29;
/// Split storage permissions; legacy full-storage overlay applies below this.
pub const R: u32 = 30;
/// Location accuracy selection available from this level on.
pub const S: u32 = 31;
/// Last level before the media split; supergroup expansion applies at or below.
pub const S_V2: u32 = 32;
/// Media split and photo picker; visual/aural media stand alone from here.
pub const T: u32 = 33;

/// Target-SDK bracket used by the storage supergroup dialog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkBracket {
    /// Target SDK below Q.
    PreQ,
    /// Target SDK in [Q, S_V2].
    QToS,
}

impl SdkBracket {
    /// Classify a target SDK, or `None` if it postdates the media split.
    pub fn for_target_sdk(target_sdk: u32) -> Option<Self> {
        if target_sdk < Q {
            Some(Self::PreQ)
        } else if target_sdk <= S_V2 {
            Some(Self::QToS)
        } else {
            None
        }
    }
}
