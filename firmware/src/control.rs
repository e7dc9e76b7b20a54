// The 10 ms cooperative loop. The controller decides, this module does.

use defmt::{debug, warn};
use embassy_stm32::flash::{Blocking, Flash};
use embassy_stm32::gpio::{Input, Output};
use embassy_stm32::peripherals::IWDG;
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_time::{Duration, Instant, Timer};

use alarmdial_core::config::{Config, INPUT_COUNT};
use alarmdial_core::ringbuf::RingReader;
use alarmdial_core::{Controller, Effect, Effects, PinSample, MAX_LINE};

use crate::a7670::Modem;
use crate::constants::{LED_PERIOD_SECS, LOOP_TICK_MS, REBOOT_WATCHDOG_US, RX_RING_CAPACITY};
use crate::hardware::AlarmInputs;
use crate::store;

pub struct System {
    pub modem: Modem,
    pub reader: RingReader<RX_RING_CAPACITY>,
    pub flash: Flash<'static, Blocking>,
    pub watchdog: IndependentWatchdog<'static, IWDG>,
    pub alarm_inputs: AlarmInputs,
    pub reset_input: Input<'static>,
    pub led: Output<'static>,
}

pub async fn run(mut sys: System, config: Config, config_dirty: bool) -> ! {
    let mut controller = Controller::new(config, config_dirty, Instant::now());
    let mut scratch = [0u8; MAX_LINE];
    let mut fx = Effects::new();
    let mut led_last = Instant::now();

    loop {
        Timer::after_millis(LOOP_TICK_MS).await;
        let now = Instant::now();
        sys.watchdog.pet();

        let line = sys.reader.pop_line(&mut scratch);
        if let Some(line) = line {
            debug!("RX: {}", line);
        }

        let pins = PinSample {
            inputs: core::array::from_fn::<_, INPUT_COUNT, _>(|i| {
                sys.alarm_inputs.pins[i].is_high()
            }),
            reset: sys.reset_input.is_high(),
        };

        fx.clear();
        controller.tick(now, line, pins, &mut fx);
        for effect in fx.iter() {
            match effect {
                Effect::At(command) => sys.modem.write_command(command).await,
                Effect::SendSms { to, body } => sys.modem.send_sms(to, body).await,
                Effect::Persist => store::save(&mut sys.flash, controller.config()),
                Effect::Reboot => force_reboot(),
            }
        }

        if now - led_last >= Duration::from_secs(LED_PERIOD_SECS) {
            led_last = now;
            sys.led.toggle();
        }
    }
}

/// Collapses the watchdog deadline to ~1 ms and stops feeding; the reset
/// also power-cycles the modem through the boot sequence.
fn force_reboot() -> ! {
    warn!("Modem offline, rebooting");
    let p = unsafe { embassy_stm32::Peripherals::steal() };
    let mut watchdog = IndependentWatchdog::new(p.IWDG, REBOOT_WATCHDOG_US);
    watchdog.unleash();
    loop {
        cortex_m::asm::nop();
    }
}
