//! MiniLM sentence embedder using Candle.
//!
//! This module is only available when the `candle` feature is enabled.
//!
//! Uses `sentence-transformers/all-MiniLM-L6-v2`:
//! - 384 dimensions
//! - 256 max tokens (longer input is truncated, keeping `[CLS]` and `[SEP]`)
//! - BERT architecture, attention-masked mean pooling, L2 normalisation

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::tokio::Api;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Model identifier on the Hugging Face Hub.
const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

const EMBEDDING_DIM: usize = 384;

const MAX_TOKENS: usize = 256;

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// An [`EmbeddingProvider`] running all-MiniLM-L6-v2 locally.
///
/// Model files are downloaded (or read from the Hugging Face cache) on the
/// first call to [`embed`](EmbeddingProvider::embed), or eagerly via
/// [`init`](MiniLmEmbedder::init).
///
/// # Example
///
/// ```rust,ignore
/// use assist_rag::MiniLmEmbedder;
///
/// let embedder = MiniLmEmbedder::new();
/// embedder.init().await?;
/// let vector = embedder.embed("feline pets").await?;
/// ```
pub struct MiniLmEmbedder {
    device: Device,
    loaded: OnceCell<LoadedModel>,
}

impl MiniLmEmbedder {
    /// Create an embedder on CUDA device 0 when available, otherwise the CPU.
    pub fn new() -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        info!(?device, "MiniLmEmbedder using device");
        Self::with_device(device)
    }

    /// Create an embedder on a specific device.
    pub fn with_device(device: Device) -> Self {
        Self { device, loaded: OnceCell::new() }
    }

    /// Download (if needed) and load the model.
    pub async fn init(&self) -> Result<()> {
        self.loaded().await.map(|_| ())
    }

    async fn loaded(&self) -> Result<&LoadedModel> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<LoadedModel> {
        info!(model = MODEL_ID, "loading embedding model");

        let api = Api::new().map_err(|e| embed_error(format!("failed to create HF API: {e}")))?;
        let repo = api.model(MODEL_ID.to_string());

        debug!("fetching tokenizer, config and weights");
        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| embed_error(format!("failed to download tokenizer: {e}")))?;
        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| embed_error(format!("failed to download config: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .await
            .map_err(|e| embed_error(format!("failed to download weights: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embed_error(format!("failed to load tokenizer: {e}")))?;
        configure_tokenizer(&mut tokenizer)?;

        let config_json = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| embed_error(format!("failed to read config: {e}")))?;
        let config: Config = serde_json::from_str(&config_json)
            .map_err(|e| embed_error(format!("failed to parse config: {e}")))?;

        // SAFETY: the weights file comes from the local Hugging Face cache and
        // is only mapped for reading.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &self.device)
                .map_err(|e| embed_error(format!("failed to map weights: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| embed_error(format!("failed to build BERT model: {e}")))?;

        info!(model = MODEL_ID, "embedding model ready");
        Ok(LoadedModel { model, tokenizer })
    }

    fn encode(&self, loaded: &LoadedModel, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = loaded
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| embed_error(format!("tokenization failed: {e}")))?;

        let (input_ids, attention_mask, max_len) = pack_batch(&encodings);
        self.forward(&loaded.model, input_ids, attention_mask, texts.len(), max_len)
            .map_err(|e| embed_error(format!("inference failed: {e}")))
    }

    fn forward(
        &self,
        model: &BertModel,
        input_ids: Vec<u32>,
        attention_mask: Vec<u32>,
        batch_size: usize,
        seq_len: usize,
    ) -> candle_core::Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::from_vec(input_ids, (batch_size, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only: (batch, seq, hidden) * (batch, seq, 1).
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = summed.broadcast_div(&counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        pooled.broadcast_div(&norms)?.to_vec2::<f32>()
    }
}

impl Default for MiniLmEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MiniLmEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let loaded = self.loaded().await?;
        self.encode(loaded, &[text])?
            .into_iter()
            .next()
            .ok_or_else(|| embed_error("model returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let loaded = self.loaded().await?;
        self.encode(loaded, texts)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    fn model_id(&self) -> &str {
        MODEL_ID
    }
}

/// Truncate inside the tokenizer so the special tokens survive, and leave
/// padding to [`pack_batch`].
fn configure_tokenizer(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: MAX_TOKENS, ..Default::default() }))
        .map_err(|e| embed_error(format!("failed to configure truncation: {e}")))?;
    tokenizer.with_padding(None);
    Ok(())
}

/// Flatten a batch into row-major ids and attention mask, right-padded with
/// zeros to the longest encoding. Returns the padded sequence length.
fn pack_batch(encodings: &[Encoding]) -> (Vec<u32>, Vec<u32>, usize) {
    let max_len = encodings.iter().map(Encoding::len).max().unwrap_or(0);
    let mut input_ids = Vec::with_capacity(encodings.len() * max_len);
    let mut attention_mask = Vec::with_capacity(encodings.len() * max_len);
    for encoding in encodings {
        let pad = max_len - encoding.len();
        input_ids.extend_from_slice(encoding.get_ids());
        input_ids.extend(std::iter::repeat_n(0u32, pad));
        attention_mask.extend_from_slice(encoding.get_attention_mask());
        attention_mask.extend(std::iter::repeat_n(0u32, pad));
    }
    (input_ids, attention_mask, max_len)
}

fn embed_error(message: String) -> RagError {
    RagError::EmbeddingError { provider: "MiniLM".to_string(), message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const CLS: u32 = 1;
    const SEP: u32 = 2;

    /// A word-level BERT-style tokenizer small enough to define inline.
    fn word_tokenizer() -> Tokenizer {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", 2],
                "cls": ["[CLS]", 1]
            },
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": { "[UNK]": 0, "[CLS]": 1, "[SEP]": 2, "cat": 3, "dog": 4 },
                "unk_token": "[UNK]"
            }
        }"#;
        let mut tokenizer = Tokenizer::from_str(json).unwrap();
        configure_tokenizer(&mut tokenizer).unwrap();
        tokenizer
    }

    #[test]
    fn long_input_keeps_special_tokens() {
        let tokenizer = word_tokenizer();
        let long = "cat ".repeat(MAX_TOKENS * 2);
        let encoding = tokenizer.encode(long.as_str(), true).unwrap();

        let ids = encoding.get_ids();
        assert_eq!(ids.len(), MAX_TOKENS);
        assert_eq!(ids[0], CLS);
        assert_eq!(ids[MAX_TOKENS - 1], SEP);
    }

    #[test]
    fn batch_is_right_padded_with_masked_zeros() {
        let tokenizer = word_tokenizer();
        let encodings = tokenizer.encode_batch(vec!["cat dog cat", "dog"], true).unwrap();
        let (ids, mask, seq_len) = pack_batch(&encodings);

        assert_eq!(seq_len, 5);
        assert_eq!(ids, vec![CLS, 3, 4, 3, SEP, CLS, 4, SEP, 0, 0]);
        assert_eq!(mask, vec![1, 1, 1, 1, 1, 1, 1, 1, 0, 0]);
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn embeds_unit_vectors_and_ranks_synonyms() {
        let embedder = MiniLmEmbedder::with_device(Device::Cpu);
        embedder.init().await.unwrap();

        let query = embedder.embed("feline pets").await.unwrap();
        assert_eq!(query.len(), 384);
        let norm: f32 = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);

        let docs = embedder.embed_batch(&["cats are great", "Paris is a city"]).await.unwrap();
        let cats = crate::index::squared_l2(&query, &docs[0]);
        let paris = crate::index::squared_l2(&query, &docs[1]);
        assert!(cats < paris, "cats={cats} paris={paris}");
    }
}
