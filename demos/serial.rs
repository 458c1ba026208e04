use std::env;
use std::time::Duration;

use inquire::Select;
use volta_link::connection::Charger;
use volta_link::protocol::ProtocolVersion;
use volta_link::query::CycleDownload;
use volta_link::record::Record;
use volta_link::sink::Sink;
use volta_link::transport::{SerialTransport, available_ports};

// Configuration constants - adjust these for your setup
const STREAM_SECONDS: u64 = 5;
const POLL_INTERVAL_MS: u64 = 100;
const QUERY_TIMEOUT_MS: u64 = 3000;
const DEMO_BATTERY_ID: u16 = 1;
const DEMO_CYCLE_NUMBER: u16 = 1;

struct ConsoleSink;

impl Sink for ConsoleSink {
    fn on_record(&mut self, record: &Record) {
        let fields: Vec<String> = record
            .telemetry
            .fields()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("[{}] {}", record.kind, fields.join(" "));
    }

    fn on_cycle_download_complete(&mut self, download: &CycleDownload) {
        println!(
            "cycle download complete: battery {} cycle {} ({} rows)",
            download.battery_id,
            download.cycle_number,
            download.rows.len()
        );
    }

    fn on_disconnected(&mut self, reason: &str) {
        eprintln!("disconnected: {reason}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        Select::new("Select a serial port:", ports)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let transport = SerialTransport::open(&port_name).expect("Failed to open serial port");
    let mut charger = Charger::open(transport, ProtocolVersion::V1);
    let mut sink = ConsoleSink;

    // Stream live telemetry for a few seconds.
    charger.start_streaming(&mut sink).expect("start streaming");
    let deadline = std::time::Instant::now() + Duration::from_secs(STREAM_SECONDS);
    while std::time::Instant::now() < deadline {
        if charger.poll(&mut sink).is_err() {
            std::process::exit(1);
        }
        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
    charger.stop_streaming(&mut sink).expect("stop streaming");

    // Ask what the SD card holds.
    charger.request_recent_data(&mut sink).expect("recent data");
    charger.request_cycle_counts(&mut sink).expect("cycle counts");
    std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS * 3));
    charger.poll(&mut sink).expect("poll sd-card answers");

    // Download one cycle log.
    match charger.query_cycle(
        DEMO_BATTERY_ID,
        DEMO_CYCLE_NUMBER,
        Duration::from_millis(QUERY_TIMEOUT_MS),
        &mut sink,
    ) {
        Ok(download) => {
            for (i, row) in download.rows.iter().take(10).enumerate() {
                println!(
                    "row {i}: t={} V={:.2} A={:.2} faults=0x{:04X}",
                    row.rel_time,
                    row.charge_voltage,
                    row.charge_current,
                    row.faults.raw()
                );
            }
        }
        Err(e) => eprintln!("cycle download failed: {e}"),
    }

    charger.close();
}
