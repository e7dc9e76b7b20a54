// /src/main.rs
#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_stm32::usart::RingBufferedUartRx;
use static_cell::StaticCell;

mod a7670;
mod constants;
mod control;
mod hardware;
mod store;

use alarmdial_core::ringbuf::{RingWriter, RxRing};

use crate::a7670::Modem;
use crate::constants::{RX_DMA_BUF_SIZE, RX_RING_CAPACITY};

// Byte path from the modem to the control loop: the ingest task is the only
// writer, the loop the only reader.
static RX_RING: RxRing<RX_RING_CAPACITY> = RxRing::new();
static RX_DMA_BUF: StaticCell<[u8; RX_DMA_BUF_SIZE]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let board = hardware::init();

    info!("Starting alarm dialler...");

    let mut flash = board.flash;
    let (config, config_dirty) = store::load(&mut flash);

    let (tx, rx) = board.modem_uart.split();
    let mut rx = rx.into_ring_buffered(RX_DMA_BUF.init([0; RX_DMA_BUF_SIZE]));
    let mut modem = Modem::new(tx);

    // blocking dialogue; no ingest task yet
    a7670::bring_up(&mut modem, &mut rx).await;

    let (writer, reader) = RX_RING.split();
    spawner.spawn(ingest_task(rx, writer)).unwrap();

    let mut watchdog = board.watchdog;
    watchdog.unleash();

    info!("Entering control loop");
    control::run(
        control::System {
            modem,
            reader,
            flash,
            watchdog,
            alarm_inputs: board.alarm_inputs,
            reset_input: board.reset_input,
            led: board.led,
        },
        config,
        config_dirty,
    )
    .await
}

#[embassy_executor::task]
async fn ingest_task(
    mut rx: RingBufferedUartRx<'static>,
    mut ring: RingWriter<RX_RING_CAPACITY>,
) {
    let mut buf = [0u8; 32];
    loop {
        match rx.read(&mut buf).await {
            Ok(n) => {
                for &byte in &buf[..n] {
                    ring.push(byte);
                }
            }
            Err(e) => defmt::warn!("modem rx error: {}", e),
        }
    }
}
