//! Minimal Qwen2-architecture forward pass that stops at the final hidden states instead of
//! projecting to vocabulary logits, since all this crate needs from a local GGUF checkpoint is
//! a per-token embedding, never next-token prediction.

use std::sync::Arc;

use candle_core::quantized::{QMatMul, gguf_file};
use candle_core::{D, Device, Module, Result, Tensor};
use candle_nn::RmsNorm;

/// Shape and hyperparameters read out of a GGUF file's `qwen2.*` metadata keys.
#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub num_attention_heads: usize,
    pub num_kv_heads: usize,
    pub head_dim: usize,
    #[allow(dead_code)]
    pub intermediate_size: usize,
    pub rms_norm_eps: f64,
    pub rope_theta: f64,
    pub max_seq_len: usize,
    #[allow(dead_code)]
    pub vocab_size: usize,
}

impl LocalModelConfig {
    pub fn from_gguf(content: &gguf_file::Content) -> Result<Self> {
        let u64_field = |key: &str, default: u64| -> u64 {
            content.metadata.get(key).and_then(|v| v.to_u64().ok()).unwrap_or(default)
        };
        let f64_field = |key: &str, default: f64| -> f64 {
            content.metadata.get(key).and_then(|v| v.to_f64().ok()).unwrap_or(default)
        };

        let hidden_size = u64_field("qwen2.embedding_length", 4096) as usize;
        let num_attention_heads = u64_field("qwen2.attention.head_count", 32) as usize;

        Ok(Self {
            hidden_size,
            num_layers: u64_field("qwen2.block_count", 36) as usize,
            num_attention_heads,
            num_kv_heads: u64_field("qwen2.attention.head_count_kv", 8) as usize,
            head_dim: hidden_size / num_attention_heads,
            intermediate_size: u64_field("qwen2.feed_forward_length", 12288) as usize,
            rms_norm_eps: f64_field("qwen2.attention.layer_norm_rms_epsilon", 1e-6),
            rope_theta: f64_field("qwen2.rope.freq_base", 1_000_000.0),
            max_seq_len: u64_field("qwen2.context_length", 32768) as usize,
            vocab_size: u64_field("qwen2.vocab_size", 152064) as usize,
        })
    }
}

/// Precomputed `cos`/`sin` tables for rotary position embeddings, shared across layers.
pub(crate) struct RotaryEmbedding {
    cos: Tensor,
    sin: Tensor,
}

impl RotaryEmbedding {
    pub(crate) fn new(config: &LocalModelConfig, max_seq_len: usize, device: &Device) -> Result<Self> {
        let half_dim = config.head_dim / 2;
        let inv_freq: Vec<f32> = (0..half_dim)
            .map(|i| 1.0 / (config.rope_theta as f32).powf((2 * i) as f32 / config.head_dim as f32))
            .collect();
        let inv_freq = Tensor::new(inv_freq, device)?;

        let positions: Vec<f32> = (0..max_seq_len).map(|p| p as f32).collect();
        let positions = Tensor::new(positions, device)?;

        let freqs = positions.unsqueeze(1)?.matmul(&inv_freq.unsqueeze(0)?)?;
        let freqs = Tensor::cat(&[&freqs, &freqs], D::Minus1)?;

        Ok(Self { cos: freqs.cos()?, sin: freqs.sin()? })
    }

    /// Rotates `x`'s last two quarters against each other, the standard RoPE half-split trick.
    pub(crate) fn apply(&self, x: &Tensor, seq_start: usize) -> Result<Tensor> {
        let (_batch, _heads, seq_len, head_dim) = x.dims4()?;

        let cos = self.cos.narrow(0, seq_start, seq_len)?.unsqueeze(0)?.unsqueeze(0)?;
        let sin = self.sin.narrow(0, seq_start, seq_len)?.unsqueeze(0)?.unsqueeze(0)?;

        let half = head_dim / 2;
        let lo = x.narrow(D::Minus1, 0, half)?;
        let hi = x.narrow(D::Minus1, half, half)?;
        let swapped = Tensor::cat(&[&hi.neg()?, &lo], D::Minus1)?;

        (x.broadcast_mul(&cos)? + swapped.broadcast_mul(&sin)?)
    }
}

/// Weights for one attention+MLP block. Quantized matmuls are used directly rather than
/// dequantized up front, since the GGUF checkpoint stores them quantized and `QMatMul` runs
/// the quantized kernel without materializing a full-precision copy.
struct TransformerBlock {
    attn_q: QMatMul,
    attn_k: QMatMul,
    attn_v: QMatMul,
    attn_o: QMatMul,
    attn_q_bias: Option<Tensor>,
    attn_k_bias: Option<Tensor>,
    attn_v_bias: Option<Tensor>,
    attn_norm: RmsNorm,
    ffn_norm: RmsNorm,
    ffn_gate: QMatMul,
    ffn_up: QMatMul,
    ffn_down: QMatMul,
    num_heads: usize,
    num_kv_heads: usize,
    head_dim: usize,
}

impl TransformerBlock {
    fn load(content: &gguf_file::Content, file: &mut std::fs::File, device: &Device, config: &LocalModelConfig, layer_idx: usize) -> Result<Self> {
        let prefix = format!("blk.{layer_idx}");
        let named = |suffix: &str| format!("{prefix}.{suffix}");

        let attn_norm = load_rms_norm(content, file, &named("attn_norm.weight"), device, config.rms_norm_eps)?;
        let ffn_norm = load_rms_norm(content, file, &named("ffn_norm.weight"), device, config.rms_norm_eps)?;

        Ok(Self {
            attn_q: load_qmatmul(content, file, &named("attn_q.weight"), device)?,
            attn_k: load_qmatmul(content, file, &named("attn_k.weight"), device)?,
            attn_v: load_qmatmul(content, file, &named("attn_v.weight"), device)?,
            attn_o: load_qmatmul(content, file, &named("attn_output.weight"), device)?,
            attn_q_bias: load_bias(content, file, &named("attn_q.bias"), device),
            attn_k_bias: load_bias(content, file, &named("attn_k.bias"), device),
            attn_v_bias: load_bias(content, file, &named("attn_v.bias"), device),
            attn_norm,
            ffn_norm,
            ffn_gate: load_qmatmul(content, file, &named("ffn_gate.weight"), device)?,
            ffn_up: load_qmatmul(content, file, &named("ffn_up.weight"), device)?,
            ffn_down: load_qmatmul(content, file, &named("ffn_down.weight"), device)?,
            num_heads: config.num_attention_heads,
            num_kv_heads: config.num_kv_heads,
            head_dim: config.head_dim,
        })
    }

    fn forward(&self, x: &Tensor, mask: &Tensor, rope: &RotaryEmbedding) -> Result<Tensor> {
        let residual = x;
        let attn_out = self.attend(&self.attn_norm.forward(x)?, mask, rope)?;
        let x = (residual + attn_out)?;

        let residual = &x;
        let hidden = self.ffn_norm.forward(&x)?;
        let gate = candle_nn::ops::silu(&self.ffn_gate.forward(&hidden)?)?;
        let up = self.ffn_up.forward(&hidden)?;
        let mlp_out = self.ffn_down.forward(&(gate * up)?)?;

        residual + mlp_out
    }

    fn attend(&self, x: &Tensor, mask: &Tensor, rope: &RotaryEmbedding) -> Result<Tensor> {
        let (batch, seq_len, _hidden) = x.dims3()?;

        let project = |proj: &QMatMul, bias: &Option<Tensor>, num_heads: usize| -> Result<Tensor> {
            let mut out = proj.forward(x)?;
            if let Some(b) = bias {
                out = out.broadcast_add(b)?;
            }
            out.reshape((batch, seq_len, num_heads, self.head_dim))?.transpose(1, 2)
        };

        let q = rope.apply(&project(&self.attn_q, &self.attn_q_bias, self.num_heads)?, 0)?;
        let k = rope.apply(&project(&self.attn_k, &self.attn_k_bias, self.num_kv_heads)?, 0)?;
        let v = project(&self.attn_v, &self.attn_v_bias, self.num_kv_heads)?;

        let k = self.repeat_kv(k)?;
        let v = self.repeat_kv(v)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.transpose(D::Minus2, D::Minus1)?)? * scale)?;
        let scores = candle_nn::ops::softmax_last_dim(&scores.broadcast_add(mask)?)?;
        let out = scores.matmul(&v)?.transpose(1, 2)?.reshape((batch, seq_len, self.num_heads * self.head_dim))?;

        self.attn_o.forward(&out)
    }

    /// Grouped-query attention: broadcasts each KV head across `num_heads / num_kv_heads`
    /// query heads so attention scores can be computed against a matching head count.
    fn repeat_kv(&self, x: Tensor) -> Result<Tensor> {
        let n_rep = self.num_heads / self.num_kv_heads;
        if n_rep == 1 {
            return Ok(x);
        }
        let (batch, num_kv_heads, seq_len, head_dim) = x.dims4()?;
        x.unsqueeze(2)?
            .expand((batch, num_kv_heads, n_rep, seq_len, head_dim))?
            .reshape((batch, num_kv_heads * n_rep, seq_len, head_dim))
    }
}

fn load_qmatmul(content: &gguf_file::Content, file: &mut std::fs::File, name: &str, device: &Device) -> Result<QMatMul> {
    QMatMul::from_arc(Arc::new(content.tensor(file, name, device)?))
}

fn load_bias(content: &gguf_file::Content, file: &mut std::fs::File, name: &str, device: &Device) -> Option<Tensor> {
    content.tensor(file, name, device).ok().and_then(|qt| qt.dequantize(device).ok())
}

fn load_rms_norm(content: &gguf_file::Content, file: &mut std::fs::File, name: &str, device: &Device, eps: f64) -> Result<RmsNorm> {
    Ok(RmsNorm::new(content.tensor(file, name, device)?.dequantize(device)?, eps))
}

/// A GGUF-loaded Qwen2 stack truncated at the final hidden states: no LM head, no sampling,
/// just the per-token representation the embedding pooling step consumes.
pub struct LocalEmbeddingModel {
    tok_embeddings: Tensor,
    blocks: Vec<TransformerBlock>,
    final_norm: RmsNorm,
    rope: RotaryEmbedding,
    config: LocalModelConfig,
    device: Device,
}

impl LocalEmbeddingModel {
    pub fn from_gguf(content: gguf_file::Content, file: &mut std::fs::File, device: &Device, max_seq_len: usize) -> Result<Self> {
        let config = LocalModelConfig::from_gguf(&content)?;

        let tok_embeddings = content.tensor(file, "token_embd.weight", device)?.dequantize(device)?;

        let blocks = (0..config.num_layers)
            .map(|layer_idx| TransformerBlock::load(&content, file, device, &config, layer_idx))
            .collect::<Result<Vec<_>>>()?;

        let final_norm_weight = content.tensor(file, "output_norm.weight", device)?.dequantize(device)?;
        let final_norm = RmsNorm::new(final_norm_weight, config.rms_norm_eps);
        let rope = RotaryEmbedding::new(&config, max_seq_len.min(config.max_seq_len), device)?;

        Ok(Self { tok_embeddings, blocks, final_norm, rope, config, device: device.clone() })
    }

    /// Returns hidden states of shape `[batch, seq_len, hidden_size]` — never logits.
    pub fn forward(&self, input_ids: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = input_ids.dims2()?;
        let flat_ids = input_ids.flatten_all()?;
        let mut hidden = self.tok_embeddings.index_select(&flat_ids, 0)?.reshape((batch, seq_len, self.config.hidden_size))?;

        let mask = self.causal_mask(seq_len)?;
        for block in &self.blocks {
            hidden = block.forward(&hidden, &mask, &self.rope)?;
        }

        self.final_norm.forward(&hidden)
    }

    fn causal_mask(&self, seq_len: usize) -> Result<Tensor> {
        let mask: Vec<f32> = (0..seq_len)
            .flat_map(|i| (0..seq_len).map(move |j| if j <= i { 0.0 } else { f32::NEG_INFINITY }))
            .collect();
        Tensor::from_vec(mask, (1, 1, seq_len, seq_len), &self.device)
    }

    pub fn config(&self) -> &LocalModelConfig {
        &self.config
    }
}
