//! Sentence embeddings with a BERT-family encoder on Candle
//!
//! Mirrors a sentence-transformers model: encoder forward pass, the pooling
//! declared in `1_Pooling/config.json` (mean over the attention mask when the
//! file is absent), then L2 normalisation so every embedding has unit length.

use newscheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "ml-models")]
use crate::classifier::TextEmbedder;
#[cfg(feature = "ml-models")]
use candle_core::{DType, Device, Tensor};
#[cfg(feature = "ml-models")]
use candle_nn::VarBuilder;
#[cfg(feature = "ml-models")]
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
#[cfg(feature = "ml-models")]
use tokenizers::{Tokenizer, TruncationParams};

/// Organisation used for bare sentence-transformers model names
const SENTENCE_TRANSFORMERS_ORG: &str = "sentence-transformers";

#[cfg(feature = "ml-models")]
const DEFAULT_MAX_SEQ_LENGTH: usize = 128;

/// Embedding config record written next to the embedding classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSpec {
    /// Hugging Face model id, bare sentence-transformers name, or local directory
    pub encoder_name: String,

    /// Token limit applied before the forward pass
    #[serde(default)]
    pub max_seq_length: Option<usize>,
}

impl EncoderSpec {
    pub fn new(encoder_name: impl Into<String>) -> Self {
        Self {
            encoder_name: encoder_name.into(),
            max_seq_length: None,
        }
    }

    /// Parse the JSON record
    pub fn from_json(raw: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(raw)
            .map_err(|e| Error::artifact(format!("Malformed embedding config: {}", e)))?;
        if spec.encoder_name.trim().is_empty() {
            return Err(Error::artifact("Embedding config has an empty encoder_name"));
        }
        Ok(spec)
    }

    /// Hub repository for this encoder, `None` when it names a local directory
    pub fn hub_repo(&self) -> Option<String> {
        if Path::new(&self.encoder_name).is_dir() {
            None
        } else if self.encoder_name.contains('/') {
            Some(self.encoder_name.clone())
        } else {
            Some(format!("{}/{}", SENTENCE_TRANSFORMERS_ORG, self.encoder_name))
        }
    }
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl FromStr for DeviceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("Invalid device index in '{}'", s)))?;
                (kind, idx)
            }
            None => (s, 0),
        };

        match kind.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "mps" | "metal" => Ok(Self::Metal(index)),
            other => Err(Error::config(format!("Unknown device '{}'", other))),
        }
    }
}

/// How token states are reduced to one sentence vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingMode {
    /// Average over attended tokens
    #[default]
    Mean,
    /// First (`[CLS]`) token
    Cls,
    /// Element-wise maximum over attended tokens
    Max,
}

/// sentence-transformers `1_Pooling/config.json`
#[derive(Debug, Default, Deserialize)]
struct PoolingConfig {
    #[serde(default)]
    pooling_mode_cls_token: bool,
    #[serde(default)]
    pooling_mode_mean_tokens: bool,
    #[serde(default)]
    pooling_mode_max_tokens: bool,
    #[serde(default)]
    pooling_mode_mean_sqrt_len_tokens: bool,
    #[serde(default)]
    pooling_mode_weightedmean_tokens: bool,
    #[serde(default)]
    pooling_mode_lasttoken: bool,
}

impl PoolingMode {
    /// Parse a pooling config; exactly one supported mode must be enabled
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: PoolingConfig = serde_json::from_str(raw)
            .map_err(|e| Error::artifact(format!("Malformed pooling config: {}", e)))?;

        let enabled = [
            ("cls", cfg.pooling_mode_cls_token),
            ("mean", cfg.pooling_mode_mean_tokens),
            ("max", cfg.pooling_mode_max_tokens),
            ("mean_sqrt_len", cfg.pooling_mode_mean_sqrt_len_tokens),
            ("weightedmean", cfg.pooling_mode_weightedmean_tokens),
            ("lasttoken", cfg.pooling_mode_lasttoken),
        ]
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        match enabled.as_slice() {
            ["mean"] => Ok(Self::Mean),
            ["cls"] => Ok(Self::Cls),
            ["max"] => Ok(Self::Max),
            [] => Err(Error::artifact("Pooling config enables no pooling mode")),
            modes => Err(Error::artifact(format!(
                "Unsupported pooling mode {}",
                modes.join("+")
            ))),
        }
    }

    /// Mode declared at `path`, mean pooling when the encoder ships none
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| Error::artifact(format!("Failed to read pooling config: {}", e)))?;
                Self::from_json(&raw)
            }
        }
    }
}

/// Files making up a local encoder
#[derive(Debug, Clone)]
pub struct EncoderFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,

    /// Absent for plain transformer checkpoints
    pub pooling: Option<PathBuf>,
}

impl EncoderFiles {
    const CONFIG: &'static str = "config.json";
    const TOKENIZER: &'static str = "tokenizer.json";
    const WEIGHTS: &'static str = "model.safetensors";
    const POOLING: &'static str = "1_Pooling/config.json";

    /// Locate encoder files, downloading from the Hub when needed
    pub fn resolve(spec: &EncoderSpec) -> Result<Self> {
        match spec.hub_repo() {
            None => Self::from_dir(Path::new(&spec.encoder_name)),
            Some(repo) => Self::download(&repo),
        }
    }

    fn from_dir(dir: &Path) -> Result<Self> {
        let files = Self {
            config: dir.join(Self::CONFIG),
            tokenizer: dir.join(Self::TOKENIZER),
            weights: dir.join(Self::WEIGHTS),
            pooling: Some(dir.join(Self::POOLING)).filter(|p| p.exists()),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                return Err(Error::artifact(format!("Encoder file not found: {}", path.display())));
            }
        }
        Ok(files)
    }

    fn download(repo: &str) -> Result<Self> {
        tracing::info!("Fetching encoder '{}' from Hugging Face", repo);

        let cache_dir = encoder_cache_dir();
        std::fs::create_dir_all(&cache_dir).ok();

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(cache_dir)
            .build()
            .map_err(|e| Error::artifact(format!("Failed to initialize HF API: {}", e)))?;
        let repo_obj = api.repo(hf_hub::Repo::model(repo.to_string()));

        let fetch = |file: &str| {
            tracing::debug!("Fetching {}/{}", repo, file);
            repo_obj
                .get(file)
                .map_err(|e| Error::artifact(format!("Failed to download {} from {}: {}", file, repo, e)))
        };

        Ok(Self {
            config: fetch(Self::CONFIG)?,
            tokenizer: fetch(Self::TOKENIZER)?,
            weights: fetch(Self::WEIGHTS)?,
            pooling: repo_obj
                .get(Self::POOLING)
                .map_err(|e| tracing::debug!("No pooling config in {}: {}", repo, e))
                .ok(),
        })
    }
}

/// Download cache for Hub encoders, `~/.cache/newscheck/encoders`
pub fn encoder_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache/newscheck/encoders")
}

/// Sizes read from the encoder's `config.json`
#[cfg(feature = "ml-models")]
#[derive(Debug, Deserialize)]
struct EncoderDims {
    hidden_size: usize,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

/// BERT-family sentence encoder
#[cfg(feature = "ml-models")]
pub struct SentenceEncoder {
    name: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    pooling: PoolingMode,
}

#[cfg(feature = "ml-models")]
impl SentenceEncoder {
    /// Load the encoder described by `spec` onto `device`
    pub fn load(spec: &EncoderSpec, device: DeviceType) -> Result<Self> {
        let files = EncoderFiles::resolve(spec)?;
        let device = create_device(device)?;

        let raw_config = std::fs::read_to_string(&files.config)
            .map_err(|e| Error::artifact(format!("Failed to read encoder config: {}", e)))?;
        let bert_config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| Error::artifact(format!("Failed to parse encoder config: {}", e)))?;
        let pooling = PoolingMode::from_file(files.pooling.as_deref())?;
        let dims: EncoderDims = serde_json::from_str(&raw_config)
            .map_err(|e| Error::artifact(format!("Encoder config lacks hidden_size: {}", e)))?;

        let max_length = spec
            .max_seq_length
            .unwrap_or(DEFAULT_MAX_SEQ_LENGTH)
            .min(dims.max_position_embeddings.unwrap_or(usize::MAX));

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::artifact(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::artifact(format!("Failed to configure truncation: {}", e)))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)
                .map_err(|e| Error::artifact(format!("Failed to load encoder weights: {}", e)))?
        };
        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| Error::artifact(format!("Failed to build encoder: {}", e)))?;

        tracing::info!(
            "Loaded encoder '{}' ({} dims, max {} tokens, {:?} pooling)",
            spec.encoder_name,
            dims.hidden_size,
            max_length,
            pooling
        );

        Ok(Self {
            name: spec.encoder_name.clone(),
            model,
            tokenizer,
            device,
            dimension: dims.hidden_size,
            pooling,
        })
    }

    fn forward_pooled(&self, text: &str) -> candle_core::Result<Tensor> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        // [1, seq, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // [1, hidden] for every mode
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let pooled = match self.pooling {
            PoolingMode::Mean => {
                let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
                summed.broadcast_div(&mask.sum(1)?)?
            }
            PoolingMode::Cls => hidden.narrow(1, 0, 1)?.squeeze(1)?,
            PoolingMode::Max => {
                // padded positions drop to -1e9
                let offset = mask.affine(1e9, -1e9)?;
                hidden.broadcast_add(&offset)?.max(1)?
            }
        };

        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        pooled.broadcast_div(&norm)?.squeeze(0)
    }
}

#[cfg(feature = "ml-models")]
impl TextEmbedder for SentenceEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let pooled = self
            .forward_pooled(text)
            .map_err(|e| Error::inference(format!("Encoder forward pass failed: {}", e)))?;
        pooled
            .to_vec1::<f32>()
            .map_err(|e| Error::inference(format!("Failed to read embedding: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Create Candle device from device type
#[cfg(feature = "ml-models")]
fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::artifact(format!("Failed to create CUDA device: {}", e))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::artifact(format!("Failed to create Metal device: {}", e))),
    }
}

/// Scale a vector to unit L2 norm; zero vectors are returned unchanged
pub fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}
