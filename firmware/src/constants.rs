// Board- and loop-level tuning values; everything protocol-facing lives in
// alarmdial-core.

/// Sized to vastly exceed any credible modem burst.
pub const RX_RING_CAPACITY: usize = 10 * 1024;
pub const RX_DMA_BUF_SIZE: usize = 256;

pub const WATCHDOG_TIMEOUT_US: u32 = 8_000_000;
/// Deadline used to force a reboot: re-arm, stop feeding, gone in ~1 ms.
pub const REBOOT_WATCHDOG_US: u32 = 1_000;

/// Grace for a modem that is itself still powering up before `AT+CRESET`.
pub const MODEM_FIRST_BOOT_DELAY_SECS: u64 = 10;
/// The modem re-enumerates the network after a reset; give it time.
pub const MODEM_RESET_DELAY_SECS: u64 = 30;

pub const LOOP_TICK_MS: u64 = 10;
pub const LED_PERIOD_SECS: u64 = 1;

/// Offset of the configuration record: the last 1K page of a 128K part.
pub const CONFIG_FLASH_OFFSET: u32 = 127 * 1024;
