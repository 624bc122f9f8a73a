use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hubwire_hub::{ActivityEntry, HubStatus, Outcome};
use hubwire_proto::DeviceId;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Everything the address scheme derives from one id.
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub raw: u32,
    pub family: &'static str,
    pub unit: String,
    pub valve: String,
    pub debug: String,
    pub name_token: char,
    pub valve_count: u8,
    pub gauge_count: u8,
    pub has_verification: bool,
    pub long_range_type: Option<u32>,
    pub mesh_variant: Option<char>,
    /// Valve ids of the unit, for building actuation masks.
    pub siblings: Vec<u32>,
}

impl DeviceReport {
    pub fn new(id: DeviceId) -> Self {
        Self {
            raw: id.raw(),
            family: id.family().name(),
            unit: id.unit_string(),
            valve: id.valve_string(),
            debug: id.debug_string(),
            name_token: id.name_token(),
            valve_count: id.valve_count(),
            gauge_count: id.gauge_count(),
            has_verification: id.has_verification(),
            long_range_type: id.long_range_type(),
            mesh_variant: id.mesh_variant().map(|v| v.letter()),
            siblings: id.siblings().map(DeviceId::raw).collect(),
        }
    }
}

pub fn print_device(report: &DeviceReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in device_rows(report) {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (field, value) in device_rows(report) {
                println!("{field}: {value}");
            }
        }
    }
}

fn device_rows(report: &DeviceReport) -> Vec<(&'static str, String)> {
    let optional = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    vec![
        ("raw", report.raw.to_string()),
        ("family", report.family.to_string()),
        ("unit", report.unit.clone()),
        ("valve", report.valve.clone()),
        ("debug", report.debug.clone()),
        ("name_token", report.name_token.to_string()),
        ("valve_count", report.valve_count.to_string()),
        ("gauge_count", report.gauge_count.to_string()),
        ("has_verification", report.has_verification.to_string()),
        (
            "long_range_type",
            optional(report.long_range_type.map(|t| t.to_string())),
        ),
        (
            "mesh_variant",
            optional(report.mesh_variant.map(|v| v.to_string())),
        ),
        ("siblings", siblings_cell(&report.siblings)),
    ]
}

fn siblings_cell(siblings: &[u32]) -> String {
    if siblings.is_empty() {
        return "-".to_string();
    }
    siblings
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_activity(entry: &ActivityEntry, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(entry),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SEQ", "TIME (ms)", "MESSAGE"]);
            table.add_row(vec![
                entry.seq.to_string(),
                entry.timestamp_ms.to_string(),
                entry.message.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{entry}"),
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    status: &'a HubStatus,
    devices: Vec<DeviceReport>,
}

pub fn print_summary(status: &HubStatus, devices: &[DeviceId], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&Summary {
            status,
            devices: devices.iter().copied().map(DeviceReport::new).collect(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["DEVICE", "FAMILY", "UNIT", "VALVES", "GAUGES"]);
            for device in devices {
                table.add_row(vec![
                    device.raw().to_string(),
                    device.family().name().to_string(),
                    device.unit_string(),
                    device.valve_count().to_string(),
                    device.gauge_count().to_string(),
                ]);
            }
            println!("{}", status_line(status));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", status_line(status));
            for device in devices {
                println!("device {} ({})", device.raw(), device.debug_string());
            }
        }
    }
}

fn status_line(status: &HubStatus) -> String {
    let net_id = status
        .net_id
        .map_or_else(|| "unknown".to_string(), |id| id.raw().to_string());
    let build = status
        .versions
        .as_ref()
        .map_or("unknown", |v| v.build.as_str());
    let channel = status
        .channel
        .map_or_else(|| "unknown".to_string(), |c| c.current.to_string());
    format!(
        "hub net_id={net_id} long_range={} build={build} channel={channel}",
        status.long_range
    )
}

#[derive(Serialize)]
struct SubmissionOutput<'a> {
    command: &'a str,
    outcomes: Option<&'a [Outcome]>,
}

/// `outcomes` is `None` when the submission did not settle in time.
pub fn print_outcomes(command: &str, outcomes: Option<&[Outcome]>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SubmissionOutput { command, outcomes }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["COMMAND", "STEP", "OUTCOME"]);
            match outcomes {
                Some(outcomes) => {
                    for (step, outcome) in outcomes.iter().enumerate() {
                        table.add_row(vec![
                            command.to_string(),
                            (step + 1).to_string(),
                            outcome_name(*outcome).to_string(),
                        ]);
                    }
                }
                None => {
                    table.add_row(vec![command.to_string(), "-".to_string(), "pending".to_string()]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => match outcomes {
            Some(outcomes) => {
                let names: Vec<_> = outcomes.iter().map(|o| outcome_name(*o)).collect();
                println!("{command}: {}", names.join(", "));
            }
            None => println!("{command}: pending"),
        },
    }
}

fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Resolved => "resolved",
        Outcome::Unverified => "unverified",
        Outcome::TimedOut => "timed_out",
        Outcome::RetriesExhausted => "retries_exhausted",
        Outcome::Rejected => "rejected",
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
