use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use imgshm_packet::{CameraType, ClientStats, DecodedImage};
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

/// One received frame as reported by `watch`.
pub struct FrameReport<'a> {
    pub sequence: u64,
    pub camera_type: CameraType,
    pub timestamp: Option<u64>,
    pub images: Vec<(&'static str, &'a DecodedImage)>,
    pub stats: ClientStats,
}

#[derive(Serialize)]
struct ImageOutput {
    role: &'static str,
    rows: u32,
    columns: u32,
    stride: u32,
    pixel_format: i32,
    size: usize,
}

#[derive(Serialize)]
struct FrameOutput {
    event: &'static str,
    sequence: u64,
    camera_type: String,
    camera_tag: u32,
    timestamp: Option<u64>,
    images: Vec<ImageOutput>,
    discarded: u64,
}

#[derive(Serialize)]
struct PublishOutput<'a> {
    event: &'static str,
    path: &'a str,
    camera_type: String,
    frames: u64,
    packet_size: usize,
}

pub fn print_frame(report: &FrameReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                event: "frame",
                sequence: report.sequence,
                camera_type: report.camera_type.to_string(),
                camera_tag: report.camera_type.tag(),
                timestamp: report.timestamp,
                images: report
                    .images
                    .iter()
                    .map(|(role, image)| ImageOutput {
                        role: *role,
                        rows: image.rows(),
                        columns: image.columns(),
                        stride: image.stride(),
                        pixel_format: image.pixel_format().tag(),
                        size: image.data().len(),
                    })
                    .collect(),
                discarded: report.stats.frames_discarded,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "CAMERA", "IMAGE", "SIZE", "FORMAT", "BYTES"]);
            for (role, image) in &report.images {
                table.add_row(vec![
                    report.sequence.to_string(),
                    report.camera_type.to_string(),
                    role.to_string(),
                    format!("{}x{}", image.columns(), image.rows()),
                    image.pixel_format().to_string(),
                    image.data().len().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let images: Vec<String> = report
                .images
                .iter()
                .map(|(role, image)| {
                    format!(
                        "{role}={}x{} {} ({} bytes)",
                        image.columns(),
                        image.rows(),
                        image.pixel_format(),
                        image.data().len()
                    )
                })
                .collect();
            println!(
                "#{} {} {} discarded={}",
                report.sequence,
                report.camera_type,
                images.join(" "),
                report.stats.frames_discarded
            );
        }
    }
}

pub fn print_published(
    path: &str,
    camera_type: CameraType,
    frames: u64,
    packet_size: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&PublishOutput {
            event: "published",
            path,
            camera_type: camera_type.to_string(),
            frames,
            packet_size,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PATH", "CAMERA", "FRAMES", "PACKET SIZE"])
                .add_row(vec![
                    path.to_string(),
                    camera_type.to_string(),
                    frames.to_string(),
                    packet_size.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("published {frames} {camera_type} frame(s) to {path} ({packet_size} bytes each)");
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
