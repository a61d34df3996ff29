//! Command-line front-end for the EDI-to-IQ pipeline.
//!
//! Wires together [`dabmod::edi::EdiReceiver`], [`dabmod::edi::EtiAssembler`]
//! and [`dabmod::phy::encoder::PhyEncoder`] into one [`dabmod::graph::Graph`]
//! reading an EDI byte stream from a file and writing baseband I/Q samples
//! (interleaved `f32` I/Q pairs) to another.
//!
//! The ZMQ/TCP remote-control surface, UDP socket transport and SDR front-end
//! output are out of scope for this crate (see `lib.rs`); this binary only
//! exercises the file-to-file path, with the gain/mute/frequency knobs a
//! control surface would otherwise mutate available as one-shot flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;

use dabmod::edi::{EdiReceiver, EtiAssembler};
use dabmod::file_sink::{self, FileSink};
use dabmod::file_source::FileSource;
use dabmod::graph::{Graph, GraphRunner};
use dabmod::phy::control::{ControlState, GainMode};
use dabmod::phy::encoder::PhyEncoder;
use dabmod::phy::mode::Mode;
use dabmod::rational_resampler::RationalResampler;

/// Gain control strategy, as a CLI-parseable mirror of [`GainMode`].
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum GainModeArg {
    /// Constant scale.
    Fix,
    /// Scale to a target peak magnitude.
    Max,
    /// Scale to a target RMS.
    Var,
}

#[derive(clap::Parser, Debug)]
#[command(version, about = "DAB EDI receiver and PHY-layer modulator")]
struct Opt {
    /// Verbosity (repeat for more, e.g. -vv).
    #[arg(short, long, default_value_t = 0)]
    verbose: usize,

    /// Input file containing an EDI byte stream (PFT fragments and/or bare
    /// AF packets).
    #[arg(long)]
    input: PathBuf,

    /// Output file for interleaved `f32` I/Q samples.
    #[arg(long)]
    output: PathBuf,

    /// Transmission mode (1-4).
    #[arg(long, default_value_t = 1)]
    mode: u8,

    /// Output sample rate, in Hz. The PHY encoder always synthesises at
    /// 2048000 Sa/s internally; this resamples the result.
    #[arg(long, default_value_t = 2_048_000)]
    output_rate: u32,

    /// Gain control strategy.
    #[arg(long, value_enum, default_value_t = GainModeArg::Fix)]
    gain_mode: GainModeArg,

    /// Gain factor: constant scale (`fix`), target peak (`max`), or target
    /// RMS (`var`).
    #[arg(long, default_value_t = 1.0)]
    gain_factor: f32,

    /// Clock rate of a downstream interpolating DAC, in Hz. When set,
    /// enables the CIC pre-equaliser to compensate its droop.
    #[arg(long)]
    clock_rate: Option<u32>,

    /// Number of transmission frames the PAPR accumulator averages over.
    #[arg(long, default_value_t = 8)]
    papr_window: usize,

    /// PFT reassembly lifetime, in AF packets, before a stalled packet is
    /// skipped.
    #[arg(long, default_value_t = 10)]
    max_delay: u32,

    /// Starting FCT phase to synchronise transmission-frame boundaries to.
    #[arg(long, default_value_t = 0)]
    fct_phase: usize,

    /// Mute the output (samples are still produced, but zeroed).
    #[arg(long)]
    mute: bool,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("dabmod")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let mode = Mode::from_number(opt.mode)?;
    info!("starting modulator: mode={} output_rate={}", opt.mode, opt.output_rate);

    let gain_mode = match opt.gain_mode {
        GainModeArg::Fix => GainMode::Fix { factor: opt.gain_factor },
        GainModeArg::Max => GainMode::Max { factor: opt.gain_factor },
        GainModeArg::Var => GainMode::Var { factor: opt.gain_factor },
    };
    let control = Arc::new(ControlState::new(gain_mode, 0));
    control.set_mute(opt.mute);

    let mut g = Graph::new();

    let (src, byte_stream) = FileSource::<u8>::new(
        opt.input.to_str().ok_or_else(|| anyhow::anyhow!("non-UTF8 input path"))?,
        false,
    )?;
    let (receiver, af_stream) = EdiReceiver::with_max_delay(byte_stream, opt.max_delay);
    let (assembler, eti_stream) = EtiAssembler::new(af_stream);
    let (encoder, iq_stream) = PhyEncoder::new(
        eti_stream,
        mode,
        opt.fct_phase,
        control,
        opt.clock_rate,
        opt.output_rate,
        opt.papr_window,
    );

    g.add(Box::new(src));
    g.add(Box::new(receiver));
    g.add(Box::new(assembler));
    g.add(Box::new(encoder));

    if opt.output_rate == 2_048_000 {
        let sink = FileSink::new(iq_stream, opt.output.clone(), file_sink::Mode::Overwrite)?;
        g.add(Box::new(sink));
    } else {
        let (resampler, resampled) =
            RationalResampler::new(iq_stream, opt.output_rate as usize, 2_048_000)?;
        let sink = FileSink::new(resampled, opt.output.clone(), file_sink::Mode::Overwrite)?;
        g.add(Box::new(resampler));
        g.add(Box::new(sink));
    }

    g.run()?;
    info!("done, wrote {}", opt.output.display());
    Ok(())
}
