// Configuration record IO on the reserved flash page.

use defmt::{info, warn};
use embassy_stm32::flash::{Blocking, Flash};

use alarmdial_core::config::{Config, RECORD_LEN};

use crate::constants::CONFIG_FLASH_OFFSET;

/// Reads the record at boot. The second value is the dirty flag: `true`
/// means the caller got defaults that still need to be written back.
pub fn load(flash: &mut Flash<'static, Blocking>) -> (Config, bool) {
    let mut record = [0u8; RECORD_LEN];
    if let Err(e) = flash.blocking_read(CONFIG_FLASH_OFFSET, &mut record) {
        warn!("settings read failed: {}", e);
        return (Config::default(), true);
    }
    match Config::decode(&record) {
        Ok(config) => {
            info!("Applying settings from flash");
            (config, false)
        }
        Err(e) => {
            warn!("Stored settings rejected ({}), using defaults", e);
            (Config::default(), true)
        }
    }
}

pub fn save(flash: &mut Flash<'static, Blocking>, config: &Config) {
    let record = config.encode();
    // erase + program must not race the UART interrupt: the flash controller
    // stalls the bus for the duration
    let result = critical_section::with(|_| {
        flash.blocking_erase(CONFIG_FLASH_OFFSET, CONFIG_FLASH_OFFSET + RECORD_LEN as u32)?;
        flash.blocking_write(CONFIG_FLASH_OFFSET, &record)
    });
    match result {
        Ok(()) => info!("Saved settings to flash"),
        Err(e) => warn!("settings write failed: {}", e),
    }
}
