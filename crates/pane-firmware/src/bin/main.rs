#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use alloc::boxed::Box;

use embassy_executor::Spawner;
use embassy_futures::join::join4;
use embassy_net::StackResources;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::TcpClient;
use embassy_time::Timer;
use embedded_graphics::prelude::Point;
use embedded_graphics::text::Alignment;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::rng::Rng;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ST7735s};

use pane_core::config::{Config, Mode};
use pane_core::display::colors::{COLOR_BLACK, COLOR_STATUS_TEXT};
use pane_core::display::{
    Backlight, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplaySink, FontId, PinBacklight,
};
use pane_core::input::{ClassifierConfig, InputSignals, watch_button};
use pane_core::pages::{
    NoticePage, NowPlayingPage, PageContext, PageScheduler, PageWrapper, RemotePage,
    SchedulerConfig,
};
use pane_core::stream::{FrameStreamer, StreamIo};
use pane_core::transport::{Endpoint, Transport};
use pane_firmware::http::{HttpTransport, NetTcpClient, NetTcpState};
use pane_firmware::panel::PanelSink;
use pane_firmware::{settings, wifi};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

/// Raised by the button watcher, consumed by whichever mode is running.
static SIGNALS: InputSignals = InputSignals::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    // Frame and region buffers live in PSRAM.
    esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let device = settings::device_config().expect("Invalid build-time configuration");
    info!(
        "Mode {:?}, server {}/{}",
        device.mode, device.server.base_url, device.server.page
    );

    // Display: ST7735S over SPI2
    let spi_bus = Spi::new(
        peripherals.SPI2,
        SpiConfig::default().with_frequency(Rate::from_mhz(26)),
    )
    .expect("Failed to configure SPI")
    .with_sck(peripherals.GPIO36)
    .with_mosi(peripherals.GPIO37);
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).expect("Failed to claim SPI bus");
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO33, Level::High, OutputConfig::default());
    let spi_buffer = mk_static!([u8; 512], [0u8; 512]);
    let di = SpiInterface::new(spi_device, dc, spi_buffer);

    let panel = MipidsiBuilder::new(ST7735s, di)
        .display_size(DISPLAY_WIDTH_PX as u16, DISPLAY_HEIGHT_PX as u16)
        .reset_pin(rst)
        .init(&mut embassy_time::Delay)
        .expect("Failed to initialize display");
    let mut sink = PanelSink::new(panel);

    let mut backlight = PinBacklight::new(
        Output::new(peripherals.GPIO38, Level::High, OutputConfig::default()),
        true,
    );
    if let Err(e) = backlight.set_backlight(true) {
        warn!("{}", e);
    }

    info!("Display initialized!");
    show_status(&mut sink, "Connecting...");

    let button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );

    // Wi-Fi and network stack
    let radio = esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller");
    let (mut controller, interfaces) =
        esp_radio::wifi::new(&radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");
    wifi::configure(
        &mut controller,
        &device.internet.ssid,
        &device.internet.password,
    )
    .expect("Failed to configure Wi-Fi");

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, mut runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        seed,
    );

    let app = async {
        wifi::wait_for_ip(stack).await;

        let tcp_state = mk_static!(NetTcpState, NetTcpState::new());
        let tcp_client: NetTcpClient<'_> = TcpClient::new(stack, tcp_state);
        let dns = DnsSocket::new(stack);
        let mut transport = HttpTransport::new(&tcp_client, &dns, &device.server.base_url);

        match device.mode {
            Mode::Pager => run_pager(&device, &mut sink, &mut transport).await,
            Mode::Stream => run_stream(&device, &mut sink, &mut transport, &mut backlight).await,
        }
    };
    let buttons = watch_button(button, true, &SIGNALS, ClassifierConfig::default());

    let _ = join4(
        runner.run(),
        wifi::connection_loop(&mut controller, stack),
        buttons,
        app,
    )
    .await;
    unreachable!()
}

fn show_status<S: DisplaySink>(sink: &mut S, text: &str) {
    sink.set_font(FontId::Default);
    sink.set_foreground(COLOR_STATUS_TEXT);
    sink.set_background(COLOR_BLACK);
    let drawn = sink.fill_screen(COLOR_BLACK).and_then(|()| {
        sink.draw_text(
            text,
            Point::new(DISPLAY_WIDTH_PX as i32 / 2, DISPLAY_HEIGHT_PX as i32 / 2 - 5),
            Alignment::Center,
        )
    });
    if let Err(e) = drawn.and_then(|()| sink.present()) {
        warn!("Status screen failed: {}", e);
    }
}

async fn run_pager<S: DisplaySink, T: Transport>(config: &Config, sink: &mut S, transport: &mut T) -> ! {
    let endpoint = Endpoint::from_config(&config.server);
    let mut scheduler: PageScheduler<'_, PageWrapper> =
        PageScheduler::new(SchedulerConfig::from(&config.pager), &SIGNALS);
    let mut ctx = PageContext::new(sink, transport);

    let pages = [
        PageWrapper::NowPlaying(Box::new(NowPlayingPage::new(endpoint.clone()))),
        PageWrapper::Remote(Box::new(RemotePage::new(
            &config.server.page,
            endpoint,
            config.stream.regions,
        ))),
        PageWrapper::Notice(Box::new(NoticePage::placeholder())),
    ];
    for page in pages {
        if let Err(e) = scheduler.register(page, &mut ctx).await {
            error!("Page not registered: {}", e);
        }
    }

    scheduler.run(&mut ctx).await
}

async fn run_stream<S, T, B>(config: &Config, sink: &mut S, transport: &mut T, backlight: &mut B) -> !
where
    S: DisplaySink,
    T: Transport,
    B: Backlight,
{
    let mut streamer = FrameStreamer::from_config(config, &SIGNALS);
    let mut io = StreamIo::new(sink, transport, backlight);
    if let Err(e) = streamer.run(&mut io).await {
        error!("Stream stopped: {}", e);
    }

    loop {
        Timer::after_secs(1).await;
    }
}
