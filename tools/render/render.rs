use anyhow::{bail, Context, Result};
use clap::Parser;
use ebur128::{EbuR128, Mode};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use solfeggio::dsp::NUM_BINS;
use solfeggio::{EngineParams, MixEngine, Settings, TONES};
use std::path::PathBuf;

/// Render a WAV file through the tone mixer offline.
#[derive(Parser, Debug)]
#[command(name = "solfeggio_render", about = "Offline render through the tone mixer")]
struct Cli {
    /// Input WAV file
    input: PathBuf,

    /// Output WAV file (32-bit float)
    #[arg(short, long, default_value = "rendered.wav")]
    output: PathBuf,

    /// JSON settings: `{ "engine": {...}, "params": {...} }`
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Host block size in samples
    #[arg(long, default_value_t = 512)]
    block_size: usize,
}

fn read_channels(path: &PathBuf) -> Result<(Vec<Vec<f32>>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open input WAV '{}'", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 || channels > solfeggio::MAX_CHANNELS {
        bail!(
            "unsupported channel count {} (1..={})",
            channels,
            solfeggio::MAX_CHANNELS
        );
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("failed to decode float samples")?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .context("failed to decode integer samples")?
        }
    };

    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &s) in out.iter_mut().zip(frame) {
            ch.push(s);
        }
    }
    Ok((out, spec.sample_rate))
}

fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * channels.len());
    for i in 0..frames {
        for ch in channels {
            out.push(ch[i]);
        }
    }
    out
}

fn integrated_loudness(channels: &[Vec<f32>], sample_rate: u32) -> Result<f64> {
    let mut meter = EbuR128::new(channels.len() as u32, sample_rate, Mode::I)
        .context("failed to create loudness meter")?;
    meter
        .add_frames_f32(&interleave(channels))
        .context("failed to feed loudness meter")?;
    meter
        .loudness_global()
        .context("failed to compute integrated loudness")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if cli.block_size == 0 {
        bail!("--block-size must be at least 1");
    }

    let settings = match &cli.settings {
        Some(path) => {
            let s = Settings::load(path)?;
            log::info!("Loaded settings from {}", path.display());
            s
        }
        None => Settings::default(),
    };

    let (mut channels, sample_rate) = read_channels(&cli.input)?;
    let frames = channels[0].len();
    log::info!(
        "Input '{}': {} ch, {} Hz, {} frames",
        cli.input.display(),
        channels.len(),
        sample_rate,
        frames
    );

    let loudness_in = integrated_loudness(&channels, sample_rate)?;

    #[cfg(feature = "debug")]
    solfeggio::debug::logger::init_logger();

    let mut engine = MixEngine::with_config(settings.engine);
    engine.prepare(sample_rate as f32, cli.block_size);
    let params = EngineParams::from_values(&settings.params);
    let spectrum = engine.spectrum();

    let mut start = 0;
    while start < frames {
        let end = (start + cli.block_size).min(frames);
        let mut block: Vec<&mut [f32]> = channels.iter_mut().map(|c| &mut c[start..end]).collect();
        engine.process_with_params(&mut block, &params);
        start = end;

        #[cfg(feature = "debug")]
        solfeggio::debug::logger::drain_to_log();
    }

    let loudness_out = integrated_loudness(&channels, sample_rate)?;

    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&cli.output, spec)
        .with_context(|| format!("failed to create output WAV '{}'", cli.output.display()))?;
    for s in interleave(&channels) {
        writer.write_sample(s)?;
    }
    writer.finalize().context("failed to finalize output WAV")?;

    let mut bins = vec![0.0f32; NUM_BINS];
    spectrum.read_into(&mut bins);
    let peak_bin = bins
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i);

    let auto = engine.auto_engine();
    let meters = engine.meters();
    println!("Render summary for '{}':", cli.input.display());
    println!("  frames processed   : {}", frames);
    println!("  loudness in        : {:.2} LUFS", loudness_in);
    println!("  loudness out       : {:.2} LUFS", loudness_out);
    println!("  final profile      : {}", engine.current_profile().name());
    println!(
        "  auto tone set      : {}",
        auto.active_set()
            .iter()
            .map(|&i| TONES[i].name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  gain reduction ch0 : {:.2} dB", meters.get_gain_reduction_db(0));
    println!(
        "  spectral peak      : {:.1} Hz",
        spectrum.bin_frequency(peak_bin)
    );
    println!("  output             : {}", cli.output.display());
    Ok(())
}
