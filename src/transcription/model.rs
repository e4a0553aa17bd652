//! # Whisper Model Management
//!
//! Handles fetching, loading, and running Whisper checkpoints with
//! Candle. Checkpoints are resolved from a size alias or a full
//! HuggingFace repo id, downloaded through the hub API (cached locally
//! by hf-hub), and decoded greedily with the checkpoint's suppress-token
//! mask.
//!
//! ## Model Loading Process:
//! 1. Resolve the identifier to a hub repository
//! 2. Download config.json, tokenizer.json, and model.safetensors
//! 3. Generate the mel filterbank for the checkpoint's bin count
//! 4. Memory-map the weights onto the selected device

use crate::audio;
use crate::error::{AppError, AppResult};
use crate::transcription::timestamps::{self, TimedSpan};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use std::fs::File;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

/// Multilingual checkpoints carry the language tokens and a larger
/// vocabulary; English-only ones stop below this size.
const MULTILINGUAL_VOCAB_SIZE: usize = 51865;

/// Available Whisper model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// Get the HuggingFace model repository name.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }
}

impl std::str::FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(format!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// A resolved model identifier: either a size alias mapped to the
/// official checkpoints, or a full hub repo id taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSpec {
    Size(ModelSize),
    Repo(String),
}

impl ModelSpec {
    /// Parse an identifier. Never fails: anything that is not a known
    /// size alias is treated as a repo id (the hub decides whether it
    /// exists).
    pub fn parse(s: &str) -> Self {
        match s.parse::<ModelSize>() {
            Ok(size) => ModelSpec::Size(size),
            Err(_) => ModelSpec::Repo(s.to_string()),
        }
    }

    /// The hub repository this spec resolves to.
    pub fn repo_id(&self) -> String {
        match self {
            ModelSpec::Size(size) => size.repo_name().to_string(),
            ModelSpec::Repo(repo) => repo.clone(),
        }
    }
}

/// Options for a single transcription pass.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// ISO 639-1 language hint; None lets multilingual models default to English
    pub language: Option<String>,

    /// Emit timestamp tokens and parse them into segment records
    pub timestamps: bool,
}

/// Raw output of one transcription pass, before the engine assembles
/// the result record.
#[derive(Debug, Clone)]
pub struct RawTranscription {
    /// Full transcript text
    pub text: String,

    /// Segment-level records (empty unless timestamps were requested)
    pub segments: Vec<TimedSpan>,
}

/// The special token ids a decode pass needs.
#[derive(Debug, Clone, Copy)]
struct SpecialTokens {
    sot: u32,
    eot: u32,
    transcribe: u32,
    no_timestamps: u32,
    /// First timestamp token (`<|0.00|>`); ids at or above are timestamps
    timestamp_begin: u32,
}

impl SpecialTokens {
    fn from_tokenizer(tokenizer: &Tokenizer) -> AppResult<Self> {
        let tok = |s: &str| -> AppResult<u32> {
            tokenizer
                .token_to_id(s)
                .ok_or_else(|| AppError::Model(format!("Special token '{}' not found in tokenizer", s)))
        };

        let no_timestamps = tok("<|notimestamps|>")?;
        Ok(Self {
            sot: tok("<|startoftranscript|>")?,
            eot: tok("<|endoftext|>")?,
            transcribe: tok("<|transcribe|>")?,
            no_timestamps,
            timestamp_begin: no_timestamps + 1,
        })
    }
}

/// A loaded Whisper model ready for transcription.
pub struct WhisperModel {
    /// The actual Candle model
    model: m::model::Whisper,

    /// Model configuration
    config: Config,

    /// Tokenizer for text processing
    tokenizer: Tokenizer,

    /// Mel filters for audio preprocessing
    mel_filters: Vec<f32>,

    /// Device where the model is loaded (CPU/GPU)
    device: Device,

    /// Hub repository the weights came from
    repo_id: String,

    /// Special token ids resolved from the tokenizer
    special: SpecialTokens,

    /// Whether this checkpoint carries language tokens
    is_multilingual: bool,
}

impl WhisperModel {
    /// Fetch and load a Whisper model from the HuggingFace hub.
    ///
    /// Downloads are cached by hf-hub; repeated runs hit the local
    /// cache. Fetch failures, missing files, and malformed weights all
    /// propagate as errors.
    pub async fn load(spec: &ModelSpec, device: Device) -> AppResult<Self> {
        let repo_id = spec.repo_id();
        info!("Loading Whisper model from {}", repo_id);
        let start_time = Instant::now();

        let api = Self::hub_api()?;
        let repo = api.model(repo_id.clone());

        let config_path = repo.get("config.json").await?;
        let tokenizer_path = repo.get("tokenizer.json").await?;
        let weights_path = repo.get("model.safetensors").await?;

        let config_file = File::open(&config_path)
            .map_err(|e| AppError::Model(format!("Cannot read config.json: {}", e)))?;
        let config: Config = serde_json::from_reader(config_file)?;
        debug!("Model config: {:?}", config);

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| AppError::Model(format!("Cannot load tokenizer: {}", e)))?;
        let special = SpecialTokens::from_tokenizer(&tokenizer)?;
        let is_multilingual = config.vocab_size >= MULTILINGUAL_VOCAB_SIZE;

        let mel_filters = audio::mel::whisper_filters(config.num_mel_bins);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], m::DTYPE, &device)?
        };
        let model = m::model::Whisper::load(&vb, config.clone())
            .map_err(|e| AppError::Model(format!("Cannot load model weights: {}", e)))?;

        info!(
            "Whisper model {} loaded in {:.2}s (multilingual: {})",
            repo_id,
            start_time.elapsed().as_secs_f64(),
            is_multilingual,
        );

        Ok(Self {
            model,
            config,
            tokenizer,
            mel_filters,
            device,
            repo_id,
            special,
            is_multilingual,
        })
    }

    /// Build the hub API client, honoring the usual HF_* environment
    /// variables for authentication and cache placement.
    fn hub_api() -> AppResult<hf_hub::api::tokio::Api> {
        use hf_hub::api::tokio::ApiBuilder;

        let mut builder = ApiBuilder::new();

        builder = match std::env::var("HF_TOKEN") {
            Ok(token) => builder.with_token(Some(token)),
            Err(_) => builder.with_token(None),
        };

        if let Ok(cache_dir) = std::env::var("HF_HUB_CACHE") {
            builder = builder.with_cache_dir(cache_dir.into());
        }

        builder = builder.with_progress(false);
        Ok(builder.build()?)
    }

    /// Hub repository the weights were loaded from.
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Transcribe 16 kHz mono f32 samples.
    ///
    /// Inputs longer than one Whisper window are processed in 30 s
    /// chunks; chunk-local timestamps are shifted to absolute positions
    /// in the recording.
    pub fn transcribe(
        &mut self,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> AppResult<RawTranscription> {
        if samples.is_empty() {
            return Err(AppError::Audio("Audio data is empty".to_string()));
        }

        let language_token = self.resolve_language_token(options.language.as_deref())?;

        let chunk_samples = m::N_SAMPLES;
        let mut all_text = String::new();
        let mut all_segments = Vec::new();

        for (chunk_idx, chunk) in samples.chunks(chunk_samples).enumerate() {
            let chunk_offset = (chunk_idx * m::CHUNK_LENGTH) as f64;
            let chunk_duration = chunk.len() as f64 / m::SAMPLE_RATE as f64;

            let mel = self.compute_mel(chunk)?;

            self.model.reset_kv_cache();
            let audio_features = self.model.encoder.forward(&mel, true)?;

            let generated = self.decode_chunk(&audio_features, options.timestamps, language_token)?;

            // Timestamp tokens are stripped for the plain transcript;
            // skip_special_tokens drops the remaining markers.
            let text_tokens: Vec<u32> = generated
                .iter()
                .copied()
                .filter(|&t| t < self.special.timestamp_begin)
                .collect();
            let text = self
                .tokenizer
                .decode(&text_tokens, true)
                .map_err(|e| AppError::Inference(format!("Tokenizer decode error: {}", e)))?;
            let text = text.trim().to_string();

            if options.timestamps {
                let timestamp_begin = self.special.timestamp_begin;
                let tokenizer = &self.tokenizer;
                let mut segments = timestamps::parse_segments(
                    &generated,
                    timestamp_begin,
                    chunk_offset,
                    chunk_offset + chunk_duration,
                    |tokens| {
                        tokenizer
                            .decode(tokens, true)
                            .map_err(|e| AppError::Inference(format!("Tokenizer decode error: {}", e)))
                    },
                )?;
                all_segments.append(&mut segments);
            }

            if !text.is_empty() {
                if !all_text.is_empty() {
                    all_text.push(' ');
                }
                all_text.push_str(&text);
            }
        }

        Ok(RawTranscription {
            text: all_text,
            segments: all_segments,
        })
    }

    /// Mel spectrogram tensor for one audio chunk, padded to the full
    /// Whisper window and trimmed to the encoder's frame count.
    fn compute_mel(&self, chunk: &[f32]) -> AppResult<Tensor> {
        let mut padded = chunk.to_vec();
        padded.resize(m::N_SAMPLES, 0.0);

        let mel = m::audio::pcm_to_mel(&self.config, &padded, &self.mel_filters);
        let n_mels = self.config.num_mel_bins;
        let n_frames = mel.len() / n_mels;
        let mel = Tensor::from_vec(mel, (1, n_mels, n_frames), &self.device)?;

        let mel = if n_frames > m::N_FRAMES {
            mel.narrow(2, 0, m::N_FRAMES)?
        } else {
            mel
        };
        Ok(mel)
    }

    /// Greedy decode of one 30 s chunk. Returns the generated tokens
    /// with the prompt and EOT removed.
    fn decode_chunk(
        &mut self,
        audio_features: &Tensor,
        with_timestamps: bool,
        language_token: Option<u32>,
    ) -> AppResult<Vec<u32>> {
        let mut tokens = vec![self.special.sot];
        if let Some(language) = language_token {
            tokens.push(language);
        }
        tokens.push(self.special.transcribe);
        if !with_timestamps {
            tokens.push(self.special.no_timestamps);
        }
        let prompt_len = tokens.len();

        let sample_len = self.config.max_target_positions / 2;
        let suppress = Tensor::new(self.config.suppress_tokens.as_slice(), &self.device)?;
        let neg_inf = Tensor::new(&[f32::NEG_INFINITY], &self.device)?
            .broadcast_as(suppress.shape())?;

        for i in 0..sample_len {
            let tokens_t = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
            let hidden = self.model.decoder.forward(&tokens_t, audio_features, i == 0)?;
            let logits = self.model.decoder.final_linear(&hidden)?;

            let (_, seq_len, _) = logits.dims3()?;
            let logits = logits.i((0, seq_len - 1))?;

            // Mask the checkpoint's suppressed tokens before taking the argmax.
            let logits = logits.scatter_add(&suppress, &neg_inf, 0)?;
            let next_token = logits.argmax(0)?.to_scalar::<u32>()?;

            if next_token == self.special.eot {
                break;
            }

            if Self::is_repetitive(&tokens[prompt_len..], next_token) {
                warn!("Repetition detected after {} tokens, stopping decode", tokens.len() - prompt_len);
                break;
            }

            tokens.push(next_token);
        }

        Ok(tokens[prompt_len..].to_vec())
    }

    /// Pick the language token for this pass.
    ///
    /// English-only checkpoints take no language token at all. For
    /// multilingual checkpoints the prompt must carry one, so a missing
    /// hint falls back to English.
    fn resolve_language_token(&self, language: Option<&str>) -> AppResult<Option<u32>> {
        if !self.is_multilingual {
            return Ok(None);
        }

        let language = match language {
            Some(lang) => lang,
            None => {
                warn!("No language hint for a multilingual model, defaulting to English");
                "en"
            }
        };

        let token_str = format!("<|{}|>", language);
        self.tokenizer
            .token_to_id(&token_str)
            .map(Some)
            .ok_or_else(|| {
                AppError::Model(format!("Language '{}' is not supported by this model", language))
            })
    }

    /// Check if the token stream has started repeating.
    fn is_repetitive(tokens: &[u32], new_token: u32) -> bool {
        // Immediate repetition: the same token three times in a row
        if tokens.len() >= 2
            && tokens[tokens.len() - 1] == new_token
            && tokens[tokens.len() - 2] == new_token
        {
            return true;
        }

        // Pattern repetition: the last trigram repeats the one before it
        if tokens.len() >= 6 {
            let last_3 = &tokens[tokens.len() - 3..];
            let prev_3 = &tokens[tokens.len() - 6..tokens.len() - 3];
            if last_3 == prev_3 {
                return true;
            }
        }

        false
    }
}
