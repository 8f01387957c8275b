mod settings;

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use parley_core::audio::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use parley_core::device::infrastructure::accelerator_gate::AcceleratorGate;
use parley_core::device::infrastructure::nvidia_smi_probe::NvidiaSmiProbe;
use parley_core::inference::domain::diarization_credential::DiarizationCredential;
use parley_core::inference::domain::model_size::ModelSize;
use parley_core::inference::domain::speaker_range::SpeakerRange;
use parley_core::inference::inference_adapter::InferenceAdapter;
use parley_core::inference::infrastructure::ctc_aligner::CtcAligner;
use parley_core::inference::infrastructure::onnx_diarizer::OnnxDiarizer;
use parley_core::inference::infrastructure::whisper_recognizer::WhisperRecognizer;
use parley_core::pipeline::pipeline_logger::LogPipelineLogger;
use parley_core::pipeline::transcribe_use_case::{TranscribeUseCase, TranscriptionOutcome};
use parley_core::pipeline::transcription_request::TranscriptionRequest;
use parley_core::render::domain::render_mode::RenderMode;
use parley_core::render::domain::unresolved_policy::UnresolvedSpeakerPolicy;
use parley_core::render::infrastructure::atomic_file_writer::AtomicFileWriter;

use settings::Settings;

/// Speaker-attributed transcription of audio and video files.
///
/// Writes `<input>.vtt` (cue mode) or `<input>.txt` (paragraph mode) next
/// to the input.
#[derive(Parser)]
#[command(name = "parley")]
struct Cli {
    /// Input audio or video file.
    input: PathBuf,

    /// Recognition model size: tiny, base, small, medium, large, large-v2, large-v3.
    #[arg(long)]
    model: Option<String>,

    /// Detect the spoken language instead of assuming English.
    #[arg(long)]
    all_languages: bool,

    /// Output mode: cue (WebVTT) or paragraph (plain text).
    #[arg(long)]
    mode: Option<String>,

    /// Fewest speakers to look for.
    #[arg(long)]
    min_speakers: Option<usize>,

    /// Most speakers to look for.
    #[arg(long)]
    max_speakers: Option<usize>,

    /// Access token for the diarization model host.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Directory searched for bundled models before the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Base URL models are downloaded from instead of the default hosts.
    #[arg(long)]
    model_mirror: Option<String>,

    /// Segments without a speaker: unknown (label them UNKNOWN) or skip.
    #[arg(long)]
    unresolved: Option<String>,

    /// Print the transcript after writing it.
    #[arg(long)]
    preview: bool,

    /// Store the effective options (except the token) as future defaults.
    #[arg(long)]
    save_defaults: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let settings = apply_flags(Settings::load(), &cli);
    let request = match build_request(&cli, &settings) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    if cli.save_defaults {
        match settings.save() {
            Ok(path) => log::info!("Saved defaults to {}", path.display()),
            Err(e) => log::warn!("Could not save defaults: {e}"),
        }
    }

    let mut use_case = build_use_case(&settings);
    match use_case.run(&request) {
        Ok(outcome) => report(&outcome, cli.preview),
        Err(e) => {
            log::error!("Transcription failed ({}): {e}", e.kind());
            eprintln!("{}", e.user_message());
            process::exit(1);
        }
    }
}

/// Flags given on the command line win over stored settings.
fn apply_flags(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if cli.all_languages {
        settings.english_only = false;
    }
    if let Some(mode) = &cli.mode {
        settings.mode = mode.clone();
    }
    if let Some(min) = cli.min_speakers {
        settings.min_speakers = min;
    }
    if let Some(max) = cli.max_speakers {
        settings.max_speakers = max;
    }
    if let Some(policy) = &cli.unresolved {
        settings.unresolved = policy.clone();
    }
    if cli.models_dir.is_some() {
        settings.models_dir = cli.models_dir.clone();
    }
    if cli.model_mirror.is_some() {
        settings.model_mirror = cli.model_mirror.clone();
    }
    settings
}

fn build_request(
    cli: &Cli,
    settings: &Settings,
) -> Result<TranscriptionRequest, Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    let speakers = SpeakerRange::new(settings.min_speakers, settings.max_speakers)?;
    let mut request = TranscriptionRequest::new(&cli.input, speakers);
    request.model = settings.model.parse::<ModelSize>()?;
    request.language_only = settings.english_only;
    request.mode = settings.mode.parse::<RenderMode>()?;
    request.unresolved_policy = settings.unresolved.parse::<UnresolvedSpeakerPolicy>()?;
    request.credential = cli.hf_token.as_deref().and_then(DiarizationCredential::new);
    if request.credential.is_none() {
        log::warn!("No diarization token given; the model must already be cached or mirrored");
    }
    Ok(request)
}

fn build_use_case(settings: &Settings) -> TranscribeUseCase {
    let models_dir = settings.models_dir.as_deref();
    let mirror = settings.model_mirror.as_deref();
    let inference = InferenceAdapter::new(
        Box::new(WhisperRecognizer::new(models_dir, mirror)),
        Box::new(CtcAligner::new(models_dir, mirror)),
        Box::new(OnnxDiarizer::new(models_dir, mirror)),
    );
    TranscribeUseCase::new(
        Box::new(FfmpegAudioReader),
        Box::new(NvidiaSmiProbe::new()),
        Arc::new(AcceleratorGate::new()),
        inference,
        Box::new(AtomicFileWriter),
        Box::new(LogPipelineLogger::new()),
    )
}

fn report(outcome: &TranscriptionOutcome, preview: bool) {
    eprintln!(
        "Transcribed {} segments ({}) to {}",
        outcome.segment_count,
        outcome.detected_language,
        outcome.path.display()
    );
    if outcome.unresolved_count > 0 {
        eprintln!(
            "{} segments could not be matched to a speaker",
            outcome.unresolved_count
        );
    }
    if preview {
        match fs::read_to_string(&outcome.path) {
            Ok(text) => print!("{text}"),
            Err(e) => log::warn!("Could not read {} for preview: {e}", outcome.path.display()),
        }
    }
}
