//! Replay recorded tracking frames through the retargeting pipeline.
//!
//! Reads one JSON `TrackingFrame` per line and writes one JSON pose per line.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use mirror_retarget::{
    calibration::{BoneTransform, SkeletonRestState},
    config::{Config, EXAMPLE_CONFIG},
    landmarks::TrackingFrame,
    pipeline::RetargetPipeline,
    pose::AvatarPose,
    skeleton::{BoneAliasTable, HumanoidBone},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines file of tracking frames ("-" or omitted for stdin)
    #[arg(short, long)]
    input: Option<String>,

    /// Output file for solved poses (stdout when omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Filter override (none, kalman[:q:r], exponential[:alpha], one_euro[:min_cutoff[:beta[:d_cutoff]]])
    #[arg(short, long)]
    filter: Option<String>,

    /// Blend factor override (0.01 to 1.0)
    #[arg(short, long)]
    blend: Option<f32>,

    /// Mirror mode override
    #[arg(long)]
    mirror: Option<bool>,

    /// Rig rest transforms as JSON (bone name -> {"offset": [x, y, z], "scale": [x, y, z]})
    #[arg(long)]
    rig: Option<String>,

    /// Write the rig's rest transforms, calibrated with the body scales, to this file
    #[arg(long, requires = "rig")]
    rig_output: Option<String>,

    /// Solve finger rotations from hand landmarks
    #[arg(long)]
    fingers: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

/// One output line
#[derive(Serialize)]
struct PoseRecord {
    timestamp: f64,
    confidence: f32,
    root_position: [f32; 3],
    /// Quaternions as `[x, y, z, w]`
    bones: BTreeMap<HumanoidBone, [f32; 4]>,
}

impl From<&AvatarPose> for PoseRecord {
    fn from(pose: &AvatarPose) -> Self {
        let bones = pose
            .rotations()
            .map(|r| {
                let q = r.rotation.quaternion();
                (r.bone, [q.i, q.j, q.k, q.w])
            })
            .collect();
        Self {
            timestamp: pose.timestamp,
            confidence: pose.confidence,
            root_position: pose.root_position.into(),
            bones,
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    if let Some(filter) = &args.filter {
        config.smoothing.filter = filter.clone();
    }
    if let Some(blend) = args.blend {
        config.blend.blend_factor = blend;
    }
    if let Some(mirror) = args.mirror {
        config.retarget.mirror_mode = mirror;
    }
    if args.fingers {
        config.retarget.enable_fingers = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load the rig, retarget onto it and write its calibrated rest transforms
fn load_rig(pipeline: &mut RetargetPipeline, path: &str, output: Option<&str>) -> Result<()> {
    info!("Loading rig from: {path}");
    let file = File::open(path).with_context(|| format!("Failed to open rig {path}"))?;
    let bones: BTreeMap<String, BoneTransform> =
        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse rig {path}"))?;
    let rest = SkeletonRestState::from_rig(bones, &BoneAliasTable::new())?;

    let calibrated: BTreeMap<HumanoidBone, BoneTransform> =
        pipeline.load_rig(rest).present().map(|(bone, t)| (bone, *t)).collect();
    if let Some(output) = output {
        let file = File::create(output).with_context(|| format!("Failed to create rig output {output}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &calibrated)?;
        writer.flush()?;
        info!("Wrote {} calibrated rest transforms to {output}", calibrated.len());
    }
    Ok(())
}

fn open_input(input: Option<&str>) -> Result<Box<dyn BufRead>> {
    match input {
        None | Some("-") => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open input {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn open_output(output: Option<&str>) -> Result<Box<dyn Write>> {
    match output {
        None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create output {path}"))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Mirror Retarget {} ({})", env!("CARGO_PKG_VERSION"), env!("BUILD_TARGET"));

    let config = load_config(&args)?;
    if args.print_config {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let mut pipeline = RetargetPipeline::new(&config)?;
    if let Some(rig) = &args.rig {
        load_rig(&mut pipeline, rig, args.rig_output.as_deref())?;
    }
    let reader = open_input(args.input.as_deref())?;
    let mut writer = open_output(args.output.as_deref())?;

    let mut emitted = 0usize;
    let mut skipped = 0usize;
    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let frame = match TrackingFrame::from_json(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping line {}: {e}", number + 1);
                skipped += 1;
                continue;
            }
        };

        if let Some(pose) = pipeline.process(&frame) {
            serde_json::to_writer(&mut writer, &PoseRecord::from(&pose))?;
            writeln!(writer)?;
            emitted += 1;
        }
    }
    writer.flush()?;

    info!(
        "Processed {} frames, emitted {emitted} poses, skipped {skipped} malformed lines",
        pipeline.frames_processed()
    );

    Ok(())
}
