// Board bring-up: clocks, the modem UART, the panel inputs and the
// supervision peripherals. Everything leaves here named and typed.

use defmt::info;
use embassy_stm32::flash::{Blocking, Flash};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::mode::Async;
use embassy_stm32::peripherals;
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{Config as UartConfig, Uart};
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_stm32::{bind_interrupts, usart, Config};

use alarmdial_core::config::INPUT_COUNT;

use crate::constants::WATCHDOG_TIMEOUT_US;

bind_interrupts!(pub struct Irqs {
    USART2 => usart::InterruptHandler<peripherals::USART2>;
});

pub type ModemUart = Uart<'static, Async>;

pub struct AlarmInputs {
    pub pins: [Input<'static>; INPUT_COUNT],
}

pub struct Board {
    pub modem_uart: ModemUart,
    pub alarm_inputs: AlarmInputs,
    pub reset_input: Input<'static>,
    pub led: Output<'static>,
    pub watchdog: IndependentWatchdog<'static, peripherals::IWDG>,
    pub flash: Flash<'static, Blocking>,
}

pub fn init() -> Board {
    // 1. Clock configuration: 8 MHz crystal x6 = 48 MHz
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        config.rcc.hse = Some(Hse {
            freq: Hertz::mhz(8),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll = Some(Pll {
            src: PllSource::HSE,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL6,
        });
        config.rcc.sys = Sysclk::PLL1_P;
    }

    let p = embassy_stm32::init(config);
    info!("Hardware initialized! Clocked at 48MHz");

    // 2. Modem UART: 9600 8N1, no flow control, permanently
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = 9600;
    let modem_uart = Uart::new(
        p.USART2,
        p.PA3, p.PA2,
        Irqs,
        p.DMA1_CH7, p.DMA1_CH6,
        uart_config,
    )
    .unwrap();

    // 3. Panel contacts: pulled up, switched to ground by the panel
    let alarm_inputs = AlarmInputs {
        pins: [
            Input::new(p.PB12, Pull::Up),
            Input::new(p.PB13, Pull::Up),
            Input::new(p.PB14, Pull::Up),
        ],
    };
    let reset_input = Input::new(p.PB15, Pull::Up);

    // 4. Heartbeat LED
    let led = Output::new(p.PC13, Level::High, Speed::Low);

    // 5. Supervision: watchdog is created here but only unleashed once the
    //    modem bring-up is done
    let watchdog = IndependentWatchdog::new(p.IWDG, WATCHDOG_TIMEOUT_US);
    let flash = Flash::new_blocking(p.FLASH);

    Board {
        modem_uart,
        alarm_inputs,
        reset_input,
        led,
        watchdog,
        flash,
    }
}
