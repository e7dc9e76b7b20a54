// Link to the SIMCom A7670 modem: raw command writes, SMS submission and
// the blocking bring-up script that runs before the ingest task exists.

use core::fmt::Write as _;

use defmt::{debug, info, warn};
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{RingBufferedUartRx, UartTx};
use embassy_time::{with_timeout, Duration, Timer};
use heapless::String;

use alarmdial_core::MAX_LINE;

use crate::constants::{MODEM_FIRST_BOOT_DELAY_SECS, MODEM_RESET_DELAY_SECS};

/// 1.5 x character time at 9600 baud; the gap that ends a read.
const CHAR_GAP: Duration = Duration::from_micros(1500);
/// The CMGS prompt is not parsed; the body follows after a fixed pause.
const SMS_BODY_DELAY: Duration = Duration::from_millis(500);
const CTRL_Z: u8 = 0x1A;
const INIT_ATTEMPTS: usize = 3;

pub struct Modem {
    tx: UartTx<'static, Async>,
}

impl Modem {
    pub fn new(tx: UartTx<'static, Async>) -> Self {
        Self { tx }
    }

    async fn write_raw(&mut self, data: &[u8]) {
        if let Err(e) = self.tx.write(data).await {
            warn!("modem write failed: {}", e);
        }
    }

    /// Writes one command line; the caller includes the trailing CR.
    pub async fn write_command(&mut self, line: &str) {
        debug!("TX: {}", line.trim());
        self.write_raw(line.as_bytes()).await;
    }

    pub async fn send_sms(&mut self, number: &str, message: &str) {
        info!("Sending SMS to {}", number);
        let mut command: String<64> = String::new();
        let _ = write!(command, "AT+CMGS=\"{}\"\r", number);
        self.write_raw(command.as_bytes()).await;
        Timer::after(SMS_BODY_DELAY).await;
        self.write_raw(message.as_bytes()).await;
        self.write_raw(&[CTRL_Z]).await;
    }
}

/// Power-cycles and configures the modem. Runs with direct UART reads; the
/// ingest task must not be running yet. There is no error escalation — an
/// unconfigured modem shows up soon enough through the status probe.
pub async fn bring_up(modem: &mut Modem, rx: &mut RingBufferedUartRx<'static>) {
    info!("Rebooting the modem");
    Timer::after_secs(MODEM_FIRST_BOOT_DELAY_SECS).await;
    modem.write_command("AT+CRESET\r").await;
    Timer::after_secs(MODEM_RESET_DELAY_SECS).await;

    info!("Entering modem initialisation");
    // echo off first: it may take the modem a long while to come back
    send_expect_ok(modem, rx, "ATE0\r", Duration::from_secs(120)).await;
    send_expect_ok(modem, rx, "AT&D0\r", Duration::from_secs(9)).await;
    send_expect_ok(modem, rx, "ATV1\r", Duration::from_secs(9)).await;
    // event policy: no GPRS events, no hang-up control, calls via +CLCC only
    send_expect_ok(
        modem,
        rx,
        "AT+CGEREP=0,0;+CVHU=0;+CLIP=0;+CLCC=1\r",
        Duration::from_secs(36),
    )
    .await;
    // LTE only, IRA charset, text-mode SMS, new-SMS indications
    send_expect_ok(
        modem,
        rx,
        "AT+CNMP=2;+CSCS=\"IRA\";+CMGF=1;+CNMI=2,1\r",
        Duration::from_secs(36),
    )
    .await;
    // clear both SMS stores, then leave the module store selected
    send_expect_ok(modem, rx, "AT+CPMS=\"SM\",\"SM\",\"SM\"\r", Duration::from_secs(9)).await;
    send_expect_ok(modem, rx, "AT+CMGD=0,4\r", Duration::from_secs(9)).await;
    send_expect_ok(modem, rx, "AT+CPMS=\"ME\",\"ME\",\"ME\"\r", Duration::from_secs(9)).await;
    send_expect_ok(modem, rx, "AT+CMGD=0,4\r", Duration::from_secs(9)).await;
    info!("Modem initialisation complete");
}

async fn send_expect_ok(
    modem: &mut Modem,
    rx: &mut RingBufferedUartRx<'static>,
    command: &str,
    deadline: Duration,
) -> bool {
    for attempt in 1..=INIT_ATTEMPTS {
        drain(rx).await;
        modem.write_command(command).await;
        if wait_for_ok(rx, deadline).await {
            return true;
        }
        warn!("no OK for {} (attempt {})", command.trim(), attempt);
    }
    false
}

/// Throws away whatever the modem sent before the command we are about to
/// write.
async fn drain(rx: &mut RingBufferedUartRx<'static>) {
    let mut scratch = [0u8; 32];
    loop {
        match with_timeout(CHAR_GAP, rx.read(&mut scratch)).await {
            Ok(Ok(_)) => continue,
            _ => return,
        }
    }
}

/// Reads lines until one starts with `OK`; everything else is discarded.
async fn wait_for_ok(rx: &mut RingBufferedUartRx<'static>, deadline: Duration) -> bool {
    let mut scratch = [0u8; MAX_LINE];
    loop {
        match read_line(rx, deadline, &mut scratch).await {
            Some(line) if line.starts_with("OK") => return true,
            Some(line) => {
                if !line.is_empty() {
                    debug!("init RX: {}", line);
                }
            }
            None => return false,
        }
    }
}

/// One LF-terminated line, or `None` if the first byte misses `first_wait`
/// or the inter-character gap opens up mid-line.
async fn read_line<'b>(
    rx: &mut RingBufferedUartRx<'static>,
    first_wait: Duration,
    scratch: &'b mut [u8; MAX_LINE],
) -> Option<&'b str> {
    let mut len = 0;
    let mut wait = first_wait;
    loop {
        let mut byte = [0u8; 1];
        match with_timeout(wait, rx.read(&mut byte)).await {
            Ok(Ok(n)) if n > 0 => {
                wait = CHAR_GAP;
                match byte[0] {
                    b'\n' => return core::str::from_utf8(&scratch[..len]).ok(),
                    b'\r' => {}
                    other => {
                        if len < scratch.len() {
                            scratch[len] = other;
                            len += 1;
                        }
                    }
                }
            }
            _ => return None,
        }
    }
}
